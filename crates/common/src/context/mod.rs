//! Context assembly
//!
//! Turns ranked retrieval results into the text block handed to the generator.

mod assembler;

pub use assembler::{Context, ContextAssembler, PASSAGE_SEPARATOR};
