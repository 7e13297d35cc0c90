//! Context Assembler - joins retrieved passages into one prompt block
//!
//! Passages are kept in rank order and separated by a blank line. No
//! deduplication, trimming or re-ranking happens here; the amount of text is
//! bounded by how many passages retrieval returns.

use crate::index::ScoredDocument;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator placed between passages
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// Assembled retrieval context for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(String);

impl Context {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Context {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl From<String> for Context {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds a `Context` from ranked documents
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextAssembler;

impl ContextAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Concatenate document texts in the given order
    pub fn assemble(&self, documents: &[ScoredDocument]) -> Context {
        let texts: Vec<&str> = documents.iter().map(|d| d.document.text.as_str()).collect();
        Context(texts.join(PASSAGE_SEPARATOR))
    }
}
