//! Reduced result shapes served from the aggregate cache.

use super::entities::QuestionRecord;
use super::types::Difficulty;

/// Exact difficulty tallies for one chapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterCounts {
    pub category: String,
    pub chapter: String,
    pub easy: u64,
    pub medium: u64,
    pub hard: u64,
    pub unrated: u64,
    pub total: u64,
}

impl ChapterCounts {
    pub fn new(category: impl Into<String>, chapter: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            chapter: chapter.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, difficulty: Option<Difficulty>) {
        match difficulty {
            Some(Difficulty::Easy) => self.easy += 1,
            Some(Difficulty::Medium) => self.medium += 1,
            Some(Difficulty::Hard) => self.hard += 1,
            None => self.unrated += 1,
        }
        self.total += 1;
    }

    pub fn get(&self, difficulty: Difficulty) -> u64 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTally {
    pub topic: String,
    pub questions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectGroup {
    pub subject: String,
    pub topics: Vec<TopicTally>,
}

/// Subject → topic catalogue of a category, deduplicated by normalized name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectTopics {
    pub category: String,
    pub subjects: Vec<SubjectGroup>,
}

/// One page of the chapter question listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionPage {
    pub items: Vec<QuestionRecord>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterTally {
    pub chapter: String,
    pub questions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryChapters {
    pub category: String,
    pub chapters: Vec<ChapterTally>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_total_in_step_with_buckets() {
        let mut counts = ChapterCounts::new("gate", "Graphs");
        counts.record(Some(Difficulty::Easy));
        counts.record(Some(Difficulty::Hard));
        counts.record(None);

        assert_eq!(counts.get(Difficulty::Easy), 1);
        assert_eq!(counts.get(Difficulty::Medium), 0);
        assert_eq!(counts.unrated, 1);
        assert_eq!(counts.total, 3);
    }
}
