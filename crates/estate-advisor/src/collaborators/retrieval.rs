//! In-memory keyword retrieval over a JSON document corpus
//!
//! Documents are split into overlapping paragraph chunks and scored against
//! the query by cosine similarity of term-frequency vectors. Chunk ids are
//! `{doc_id}_chunk_{n}` and are the identity the merger deduplicates on.

use async_trait::async_trait;
use estate_core::RetrievedDocument;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

use super::DocumentRetriever;
use crate::error::{AdvisorError, Result};

/// Maximum words per chunk
pub const CHUNK_MAX_WORDS: usize = 400;
/// Words carried over from the previous chunk
pub const CHUNK_OVERLAP_WORDS: usize = 50;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "is", "it", "of", "on",
    "or", "that", "the", "this", "to", "with",
];

fn default_category() -> String {
    "general".to_string()
}

fn default_city() -> String {
    "All".to_string()
}

/// One entry of the corpus file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusDocument {
    pub doc_id: String,
    pub title: String,
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    /// Location tag; `All` or `Multiple` for documents not tied to one city
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default, alias = "effective_date")]
    pub date: String,
}

/// Restricts which chunks a search may return
///
/// The default filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Exact category match
    pub category: Option<String>,
    /// Location tag must be one of these (ASCII case-insensitive)
    pub locations: Option<Vec<String>>,
}

impl SearchFilter {
    /// Filter that matches every chunk
    pub fn none() -> Self {
        Self::default()
    }

    /// Filter on a single category
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            locations: None,
        }
    }

    /// Restrict to the given location tags
    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locations = Some(locations.into_iter().map(Into::into).collect());
        self
    }

    /// Location tags relevant to a city: the city itself plus the
    /// corpus-wide `All` and `Multiple` tags
    pub fn city_scope(city: &str) -> Vec<String> {
        vec![city.to_string(), "All".to_string(), "Multiple".to_string()]
    }

    pub fn matches(&self, category: &str, location_tag: &str) -> bool {
        let category_ok = self.category.as_deref().is_none_or(|c| c == category);
        let location_ok = self
            .locations
            .as_ref()
            .is_none_or(|allowed| allowed.iter().any(|l| l.eq_ignore_ascii_case(location_tag)));
        category_ok && location_ok
    }
}

/// Corpus statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
    /// Chunk count per category
    pub categories: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
struct Chunk {
    id: String,
    title: String,
    content: String,
    category: String,
    location_tag: String,
    terms: HashMap<String, f64>,
    norm: f64,
}

/// Keyword index implementing [`DocumentRetriever`]
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    chunks: Vec<Chunk>,
    documents: usize,
}

impl KeywordIndex {
    /// Index already-loaded documents
    pub fn from_documents(documents: Vec<CorpusDocument>) -> Self {
        let document_count = documents.len();
        let mut chunks = Vec::new();

        for doc in documents {
            for (i, text) in chunk_by_paragraph(&doc.content, CHUNK_MAX_WORDS, CHUNK_OVERLAP_WORDS)
                .into_iter()
                .enumerate()
            {
                let terms = term_frequencies(&format!("{} {}", doc.title, text));
                let norm = vector_norm(&terms);
                chunks.push(Chunk {
                    id: format!("{}_chunk_{i}", doc.doc_id),
                    title: doc.title.clone(),
                    content: text,
                    category: doc.category.clone(),
                    location_tag: doc.city.clone(),
                    terms,
                    norm,
                });
            }
        }

        info!("Indexed {} documents into {} chunks", document_count, chunks.len());
        Self {
            chunks,
            documents: document_count,
        }
    }

    /// Load and index a JSON array of [`CorpusDocument`]s
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AdvisorError::Retrieval(format!("cannot read corpus {}: {e}", path.display()))
        })?;
        let documents: Vec<CorpusDocument> = serde_json::from_str(&raw)?;
        Ok(Self::from_documents(documents))
    }

    pub fn stats(&self) -> IndexStats {
        let mut categories = BTreeMap::new();
        for chunk in &self.chunks {
            *categories.entry(chunk.category.clone()).or_insert(0) += 1;
        }
        IndexStats {
            documents: self.documents,
            chunks: self.chunks.len(),
            categories,
        }
    }

    /// Rank chunks against `query`
    ///
    /// Zero-score chunks are never returned; equal scores are ordered by id.
    pub fn rank(&self, query: &str, top_k: usize, filter: &SearchFilter) -> Vec<RetrievedDocument> {
        let query_terms = term_frequencies(query);
        let query_norm = vector_norm(&query_terms);
        if query_norm == 0.0 {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &Chunk)> = self
            .chunks
            .iter()
            .filter(|c| filter.matches(&c.category, &c.location_tag))
            .filter_map(|chunk| {
                let dot: f64 = query_terms
                    .iter()
                    .filter_map(|(term, weight)| chunk.terms.get(term).map(|w| w * weight))
                    .sum();
                let score = if chunk.norm == 0.0 {
                    0.0
                } else {
                    (dot / (query_norm * chunk.norm)).clamp(0.0, 1.0)
                };
                (score > 0.0).then_some((score, chunk))
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        scored.truncate(top_k);

        debug!("Query matched {} chunks (top_k={})", scored.len(), top_k);

        scored
            .into_iter()
            .map(|(score, chunk)| {
                RetrievedDocument::new(
                    chunk.id.clone(),
                    chunk.title.clone(),
                    chunk.content.clone(),
                    chunk.category.clone(),
                    chunk.location_tag.clone(),
                )
                .with_score(score)
            })
            .collect()
    }
}

#[async_trait]
impl DocumentRetriever for KeywordIndex {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievedDocument>> {
        Ok(self.rank(query, top_k, filter))
    }
}

/// Split text on blank lines into chunks of at most `max_words` words
///
/// When a paragraph would overflow the current chunk, the chunk is closed
/// and the next one starts with the last `overlap` words of it. A single
/// paragraph longer than `max_words` is kept whole.
pub fn chunk_by_paragraph(text: &str, max_words: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let words: Vec<&str> = paragraph.split_whitespace().collect();

        if current.len() + words.len() > max_words && !current.is_empty() {
            chunks.push(current.join(" "));
            let keep_from = current.len().saturating_sub(overlap);
            current.drain(..keep_from);
        }
        current.extend(words);
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut terms = HashMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
    {
        *terms.entry(token).or_insert(0.0) += 1.0;
    }
    terms
}

fn vector_norm(terms: &HashMap<String, f64>) -> f64 {
    terms.values().map(|w| w * w).sum::<f64>().sqrt()
}
