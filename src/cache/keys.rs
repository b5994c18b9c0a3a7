//! Cache key derivation and invalidation tags.
//!
//! A key is built from a namespace plus named parameters. Parameters are kept
//! sorted by name so the order in which a caller adds them never matters, and
//! values are normalized before they are encoded.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::normalize::{normalize_code, normalize_name};

/// Sentinel written for a parameter the caller left unspecified.
pub const UNSPECIFIED: &str = "all";

/// Logical query families sharing one key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    ChapterCounts,
    ChapterQuestions,
    Subtopics,
    CategoryChapters,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::ChapterCounts => "chapter_counts",
            Namespace::ChapterQuestions => "chapter_questions",
            Namespace::Subtopics => "subtopics",
            Namespace::CategoryChapters => "category_chapters",
        }
    }
}

/// Opaque identifier of one logical query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn builder(namespace: Namespace) -> KeyBuilder {
        KeyBuilder {
            namespace,
            params: BTreeMap::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct KeyBuilder {
    namespace: Namespace,
    params: BTreeMap<&'static str, Option<String>>,
}

impl KeyBuilder {
    /// Add a category-style code (trimmed, lower-cased).
    pub fn code(self, name: &'static str, value: Option<&str>) -> Self {
        self.insert(name, value.map(normalize_code))
    }

    /// Add a free-text name (chapter, topic, subject).
    pub fn name(self, name: &'static str, value: Option<&str>) -> Self {
        self.insert(name, value.map(normalize_name))
    }

    pub fn number(self, name: &'static str, value: Option<u32>) -> Self {
        self.insert(name, value.map(|v| v.to_string()))
    }

    fn insert(mut self, name: &'static str, value: Option<String>) -> Self {
        self.params.insert(name, value);
        self
    }

    pub fn build(self) -> CacheKey {
        let mut out = String::from(self.namespace.as_str());
        for (index, (name, value)) in self.params.iter().enumerate() {
            out.push(if index == 0 { '?' } else { '&' });
            out.push_str(name);
            out.push('=');
            match value {
                Some(value) => push_quoted(&mut out, value),
                None => out.push_str(UNSPECIFIED),
            }
        }
        CacheKey(out)
    }
}

// Present values are always quoted so they never collide with the bare sentinel.
fn push_quoted(out: &mut String, value: &str) {
    out.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
}

/// Label shared by many keys, used for broadcast invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheTag(String);

impl CacheTag {
    /// Wrap an externally supplied tag such as one posted to the admin API.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    /// Read an externally supplied tag, normalizing the parts of the
    /// `category:`, `chapter:` and `catalog:` forms so they match the tags
    /// queries register. Anything else is kept as trimmed text.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let Some((kind, rest)) = raw.split_once(':') else {
            return Self::new(raw);
        };
        match kind.trim().to_ascii_lowercase().as_str() {
            "category" if !rest.trim().is_empty() => Self::category(rest),
            "catalog" if !rest.trim().is_empty() => Self::catalog(rest),
            "chapter" => match rest.split_once(':') {
                Some((code, chapter))
                    if !code.trim().is_empty() && !normalize_name(chapter).is_empty() =>
                {
                    Self::chapter(code, chapter)
                }
                _ => Self::new(raw),
            },
            _ => Self::new(raw),
        }
    }

    /// Every key derived from the category.
    pub fn category(code: &str) -> Self {
        Self(format!("category:{}", normalize_code(code)))
    }

    /// Keys scoped to one chapter of a category.
    pub fn chapter(code: &str, chapter: &str) -> Self {
        Self(format!(
            "chapter:{}:{}",
            normalize_code(code),
            normalize_name(chapter)
        ))
    }

    /// Category-wide listings (subject/topic catalogue, chapter list).
    pub fn catalog(code: &str) -> Self {
        Self(format!("catalog:{}", normalize_code(code)))
    }

    pub fn namespace(namespace: Namespace) -> Self {
        Self(format!("namespace:{}", namespace.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
