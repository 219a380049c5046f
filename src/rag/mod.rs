//! Retrieval Augmented Generation components: chunking and the
//! index/search/answer pipeline.

pub mod chunker;
pub mod retrieval;

pub use chunker::{Chunker, ChunkingMethod};
pub use retrieval::{AnswerOutcome, RetrievalService};
