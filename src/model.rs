//! Data model shared across all pipeline stages.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An email message as handed to the pipeline by an external decoder.
///
/// `parser` and `error` are opaque passthrough tags set by the decoder that
/// produced this message; the pipeline never branches on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub source_path: String,
    pub subject: String,
    pub sender: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    pub received_at: Option<String>,
    /// Populated only by decoders that distinguish "received" from "created"
    /// (e.g. PST archives). Unset otherwise.
    #[serde(default)]
    pub created_at: Option<String>,
    pub body: String,
    #[serde(default)]
    pub parser: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// One opportunity block carved out of a message body by the splitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitBlock {
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// A single technology keyword found in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordMatch {
    pub keyword: String,
    pub category: String,
}

/// Result of localizing the job-description segment within a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticResult {
    pub text: String,
    pub score: f32,
    pub start_line: Option<usize>,
    pub end_line: Option<usize>,
    pub matched: bool,
    pub line_scores: Vec<f32>,
}

impl SemanticResult {
    /// A result representing "nothing matched" (empty input, or scores below
    /// threshold).
    pub fn unmatched(line_scores: Vec<f32>) -> Self {
        Self {
            text: String::new(),
            score: 0.0,
            start_line: None,
            end_line: None,
            matched: false,
            line_scores,
        }
    }
}

/// One block enriched with keyword matches and classification labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedBlock {
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
    pub keywords: Vec<KeywordMatch>,
    pub classes: Vec<String>,
}

/// One keyword's rollup within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
    pub ratio: f64,
}

/// One class's rollup across a set of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassCount {
    pub count: usize,
    pub ratio: f64,
}

/// `category -> keyword rollups` and `class -> class rollup`, plus the block
/// count they were computed over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub blocks: Vec<AggregatedBlock>,
    pub keyword_summary: IndexMap<String, Vec<KeywordCount>>,
    pub class_summary: IndexMap<String, ClassCount>,
}

/// The full output for one input message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub source_path: String,
    pub subject: String,
    pub semantic: Option<SemanticResult>,
    /// Convenience mirror of `aggregation.blocks`, matching this crate's
    /// external per-message output shape.
    pub blocks: Vec<AggregatedBlock>,
    pub aggregation: Aggregation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run-level summary across every processed message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub message_count: usize,
    pub block_count: usize,
    pub keyword_summary: IndexMap<String, Vec<KeywordCount>>,
    pub class_summary: IndexMap<String, ClassCount>,
}

/// Output of a full run over a batch of messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub results: Vec<PipelineResult>,
    pub summary: Summary,
}
