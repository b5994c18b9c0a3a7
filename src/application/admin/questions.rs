use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{QuestionsWriteRepo, RepoError};
use crate::cache::{CacheTag, CacheTrigger};
use crate::domain::entities::{NewQuestion, QuestionRecord};
use crate::domain::types::Difficulty;

#[derive(Debug, Error)]
pub enum AdminQuestionError {
    #[error("`{field}` must not be empty")]
    MissingField { field: &'static str },
    #[error("unknown difficulty `{0}`")]
    UnknownDifficulty(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateQuestionCommand {
    pub category: String,
    pub subject: String,
    pub topic: String,
    pub chapter: String,
    pub difficulty: Option<String>,
    pub prompt: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct CreatedQuestion {
    pub record: QuestionRecord,
    pub revalidated: Vec<CacheTag>,
}

#[derive(Clone)]
pub struct AdminQuestionService {
    writer: Arc<dyn QuestionsWriteRepo>,
    trigger: Arc<CacheTrigger>,
}

impl AdminQuestionService {
    pub fn new(writer: Arc<dyn QuestionsWriteRepo>, trigger: Arc<CacheTrigger>) -> Self {
        Self { writer, trigger }
    }

    /// Insert a question and revalidate the aggregates it feeds into.
    pub async fn create(
        &self,
        command: CreateQuestionCommand,
    ) -> Result<CreatedQuestion, AdminQuestionError> {
        let question = validate(command)?;
        let record = self.writer.insert_question(question).await?;

        let revalidated = self
            .trigger
            .questions_changed(&record.category, &record.chapter);
        info!(
            question_id = %record.id,
            category = %record.category,
            chapter = %record.chapter,
            tags = revalidated.len(),
            "Question created"
        );

        Ok(CreatedQuestion {
            record,
            revalidated,
        })
    }
}

fn validate(command: CreateQuestionCommand) -> Result<NewQuestion, AdminQuestionError> {
    fn non_empty(field: &'static str, value: String) -> Result<String, AdminQuestionError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AdminQuestionError::MissingField { field });
        }
        Ok(trimmed.to_string())
    }

    let difficulty = match command.difficulty.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            Difficulty::parse(raw)
                .ok_or_else(|| AdminQuestionError::UnknownDifficulty(raw.to_string()))?,
        ),
    };

    Ok(NewQuestion {
        category: non_empty("category", command.category)?.to_lowercase(),
        subject: non_empty("subject", command.subject)?,
        topic: non_empty("topic", command.topic)?,
        chapter: non_empty("chapter", command.chapter)?,
        difficulty,
        prompt: non_empty("prompt", command.prompt)?,
        answer: non_empty("answer", command.answer)?,
    })
}
