//! Retrieved context documents

use serde::{Deserialize, Serialize};

/// A ranked chunk returned by the retrieval collaborator
///
/// Two documents are the same document iff their `id`s are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub location_tag: String,
    /// Relevance in [0, 1], absent when the backend does not score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

impl RetrievedDocument {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
        location_tag: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            category: category.into(),
            location_tag: location_tag.into(),
            relevance_score: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.relevance_score = Some(score);
        self
    }

    /// Case-insensitive substring test against the category
    pub fn category_contains(&self, needle: &str) -> bool {
        self.category.to_lowercase().contains(&needle.to_lowercase())
    }

    /// Content cut to at most `max_chars` characters, on a char boundary
    pub fn excerpt(&self, max_chars: usize) -> &str {
        match self.content.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.content[..idx],
            None => &self.content,
        }
    }
}
