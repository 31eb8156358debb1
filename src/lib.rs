//! Distills stored recruitment-announcement email bodies into structured
//! analytics: per-block technology keyword frequencies, per-block
//! classifications, and the semantic boundary of the job-description region
//! within each body.
//!
//! The crate is a configurable, composable pipeline of text-analysis stages
//! (see [`pipeline::Pipeline`]) driven by a runtime-reconfigurable
//! [`config::types::PipelineConfig`] snapshot. Message-file decoding, the
//! HTTP surface, spreadsheet export, persistent configuration storage, and
//! the embedding model's weights are external collaborators — this crate
//! depends on them only through narrow trait boundaries
//! ([`embedding::EmbeddingProvider`]) or plain data ([`model::EmailMessage`]).

pub mod aggregator;
pub mod classifier;
pub mod cleaner;
pub mod config;
pub mod embedding;
pub mod error;
pub mod keyword;
pub mod line_filter;
pub mod model;
pub mod pipeline;
pub mod semantic;
pub mod splitter;
