//! Retrieval merger

use estate_core::RetrievedDocument;
use std::collections::HashSet;

/// Concatenate ranked document sets in priority order, keeping the first
/// document seen for each id, and truncate to `cap` when given
///
/// No re-ranking happens here; each input keeps the order its retrieval
/// call produced.
pub fn merge_documents<I>(sets: I, cap: Option<usize>) -> Vec<RetrievedDocument>
where
    I: IntoIterator<Item = Vec<RetrievedDocument>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for doc in sets.into_iter().flatten() {
        if cap.is_some_and(|c| merged.len() >= c) {
            break;
        }
        if seen.insert(doc.id.clone()) {
            merged.push(doc);
        }
    }

    merged
}
