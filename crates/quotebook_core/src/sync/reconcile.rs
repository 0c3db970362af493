//! Pure merge of remote candidates into local quotes.
//!
//! # Responsibility
//! - Partition remote records into accepted (new text) and rejected (text
//!   already present locally).
//! - Produce the merged sequence `local ++ accepted`.
//!
//! # Invariants
//! - Strictly additive: local records are never removed, reordered or mutated.
//! - Identity is exact `text` equality; a remote record whose text exists
//!   locally is dropped even when its category differs.
//! - Accepted records keep the order in which the remote returned them.

use crate::model::quote::Quote;
use std::collections::HashSet;

/// Outcome of one merge pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Local records followed by accepted remote records.
    pub merged: Vec<Quote>,
    /// Number of remote records appended.
    pub accepted_count: usize,
    /// Number of remote records dropped as duplicates by text.
    pub rejected_count: usize,
    /// `true` when at least one remote record was appended.
    pub changed: bool,
}

impl MergeResult {
    /// Returns the appended remote records, in received order.
    pub fn accepted(&self) -> &[Quote] {
        let start = self.merged.len().saturating_sub(self.accepted_count);
        &self.merged[start..]
    }
}

/// Merges `remote` into `local` using text-only identity.
pub fn reconcile(local: &[Quote], remote: &[Quote]) -> MergeResult {
    let local_texts: HashSet<&str> = local.iter().map(|quote| quote.text.as_str()).collect();

    let (accepted, rejected): (Vec<&Quote>, Vec<&Quote>) = remote
        .iter()
        .partition(|candidate| !local_texts.contains(candidate.text.as_str()));

    let mut merged = Vec::with_capacity(local.len() + accepted.len());
    merged.extend_from_slice(local);
    merged.extend(accepted.iter().map(|quote| (*quote).clone()));

    MergeResult {
        merged,
        accepted_count: accepted.len(),
        rejected_count: rejected.len(),
        changed: !accepted.is_empty(),
    }
}
