//! Diff extraction
//!
//! Turns one compare-endpoint response into the text a revision added and
//! removed, plus its byte-size change. Rows are walked in document order:
//!
//! - a row with both an added-line and a deleted-line cell is a one-line
//!   replacement; every `<ins>` span of the added cell and every `<del>`
//!   span of the deleted cell becomes one fragment
//! - a row with only one of the cells contributes the whole text of the
//!   cell's first `<div>` as a single fragment
//! - context rows are ignored
//!
//! Extraction is deterministic: the same response always yields the same
//! fragments and delta.

mod markup;

use crate::wiki::{CompareResponse, WikiError, WikiResult};
use serde::{Deserialize, Serialize};

/// Structured content of one revision diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffExtract {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub new_size: i64,
    pub size_delta: i64,
}

impl DiffExtract {
    /// Diff of a page creation: nothing to compare against.
    pub fn creation(size: i64) -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            new_size: size,
            size_delta: size,
        }
    }
}

/// Extract added/removed fragments and the size delta from a compare response.
///
/// A missing `fromsize` counts as an empty previous revision.
pub fn extract_diff(response: &CompareResponse) -> WikiResult<DiffExtract> {
    let fragments = markup::collect_fragments(&response.body).map_err(WikiError::Decode)?;
    Ok(DiffExtract {
        added: fragments.added,
        removed: fragments.removed,
        new_size: response.tosize,
        size_delta: response.tosize - response.fromsize.unwrap_or(0),
    })
}
