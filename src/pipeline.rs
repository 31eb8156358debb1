//! Orchestrator: constructs enabled stages from a [`PipelineConfig`] snapshot
//! and drives per-message and batched execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use crate::aggregator;
use crate::classifier::CompiledClassifier;
use crate::cleaner;
use crate::config::types::{PipelineConfig, Step};
use crate::embedding::EmbeddingProvider;
use crate::error::{ConfigError, PipelineError};
use crate::keyword::CompiledTaxonomy;
use crate::line_filter::CompiledLineFilter;
use crate::model::{Aggregation, EmailMessage, PipelineResult, RunResult, SemanticResult, SplitBlock};
use crate::splitter;

/// A constructed pipeline: a configuration snapshot plus the compiled,
/// immutable forms of each enabled stage's rule set. Cheap to clone (every
/// field is an `Arc` or a small owned compiled structure built once per
/// snapshot); safe to share across concurrent message-processing calls,
/// since nothing here is mutated after construction.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    line_filter: Option<CompiledLineFilter>,
    taxonomy: Option<CompiledTaxonomy>,
    classifier: Option<CompiledClassifier>,
    embedding: Option<Arc<dyn EmbeddingProvider>>,
}

impl Pipeline {
    /// Build a pipeline from a configuration snapshot and an optional
    /// embedding provider. The provider may be absent even when `semantic`
    /// is an enabled step — in that case every semantic result degrades to
    /// [`SemanticResult::unmatched`], per the `EmbeddingUnavailable` failure
    /// mode in the error taxonomy.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails step-order or identifier
    /// validation.
    pub fn new(
        config: Arc<PipelineConfig>,
        embedding: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Self, ConfigError> {
        crate::config::validate(&config)?;
        let line_filter = config
            .steps
            .contains(&Step::LineFilter)
            .then(|| CompiledLineFilter::new(&config.line_filter));
        let taxonomy = config
            .steps
            .contains(&Step::Extractor)
            .then(|| CompiledTaxonomy::new(&config.keywords_tech));
        let classifier = config
            .steps
            .contains(&Step::Classifier)
            .then(|| CompiledClassifier::new(&config.classifier_foreigner));
        Ok(Self {
            config,
            line_filter,
            taxonomy,
            classifier,
            embedding,
        })
    }

    fn has(&self, step: Step) -> bool {
        self.config.steps.contains(&step)
    }

    /// Clean and line-filter `raw_body` per the enabled steps, without
    /// running semantic extraction, splitting, or aggregation. Shared by
    /// both the per-message and batched paths so the two stay equivalent.
    fn prepare_body(&self, raw_body: &str) -> String {
        let cleaned = if self.has(Step::Cleaner) {
            cleaner::clean(raw_body)
        } else {
            raw_body.to_string()
        };
        match &self.line_filter {
            Some(lf) => lf.filter_text(&cleaned),
            None => cleaned,
        }
    }

    fn run_semantic_one(&self, body: &str) -> SemanticResult {
        let Some(provider) = &self.embedding else {
            warn!("semantic: embedding provider unavailable, returning unmatched result");
            return SemanticResult::unmatched(Vec::new());
        };
        match crate::semantic::extract(body, &self.config.semantic_templates, provider.as_ref()) {
            Ok(result) => result,
            Err(e) => {
                warn!("semantic: embedding request failed, downgrading to unmatched: {e}");
                SemanticResult::unmatched(Vec::new())
            }
        }
    }

    fn split_blocks(&self, body: &str) -> Vec<SplitBlock> {
        if self.has(Step::Splitter) {
            splitter::split(body, &self.config.split_markers, self.config.skip_lines)
        } else {
            single_block(body)
        }
    }

    fn aggregate_blocks(&self, blocks: &[SplitBlock]) -> Aggregation {
        if !self.has(Step::Aggregator) {
            return Aggregation::default();
        }
        let keywords = self
            .taxonomy
            .as_ref()
            .map(|t| crate::keyword::extract_for_blocks(blocks, t));
        let classes = self
            .classifier
            .as_ref()
            .map(|c| blocks.iter().map(|b| c.classify(&b.text)).collect::<Vec<_>>());
        aggregator::aggregate(blocks, keywords.as_deref(), classes.as_deref())
    }

    fn finish(&self, msg: &EmailMessage, semantic: Option<SemanticResult>, blocks: &[SplitBlock]) -> PipelineResult {
        let aggregation = self.aggregate_blocks(blocks);
        PipelineResult {
            source_path: msg.source_path.clone(),
            subject: msg.subject.clone(),
            semantic,
            blocks: aggregation.blocks.clone(),
            aggregation,
            error: None,
        }
    }

    /// Process a single message through every enabled stage in order.
    ///
    /// Cleaner and line-filter in this crate are infallible (their regexes
    /// are precompiled once per snapshot and never rejected at this point,
    /// since [`Pipeline::new`] already validated the configuration), so the
    /// only stage that can fail at message time is the semantic extractor —
    /// and that failure is caught and downgraded here rather than aborting
    /// the message, per §7's `EmbeddingUnavailable` handling.
    pub fn process_message(&self, msg: &EmailMessage) -> PipelineResult {
        info!(
            "pipeline running for {} with steps={:?}",
            msg.source_path, self.config.steps
        );
        if let Some(err) = &msg.error {
            warn!("message {} arrived with decoder error tag: {err}", msg.source_path);
        }

        let body = self.prepare_body(&msg.body);
        let semantic = self.has(Step::Semantic).then(|| self.run_semantic_one(&body));
        let blocks = self.split_blocks(&body);

        self.finish(msg, semantic, &blocks)
    }

    /// Process a batch of messages, coalescing semantic-extraction embedding
    /// calls across the whole batch while preserving each stage's per-
    /// message equivalence with [`Pipeline::process_message`].
    ///
    /// `cancel`, when supplied, is polled between each message's splitting/
    /// aggregation step and once before the batched semantic call; if it is
    /// observed set, processing stops and any partial results are discarded,
    /// per §5's cancellation contract.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Dependency`] if `cancel` is observed set
    /// before the run completes.
    pub fn process_messages(
        &self,
        messages: &[EmailMessage],
        cancel: Option<&AtomicBool>,
    ) -> Result<RunResult, PipelineError> {
        let is_cancelled = || cancel.is_some_and(|c| c.load(Ordering::SeqCst));

        let prepared: Vec<String> = messages.iter().map(|m| self.prepare_body(&m.body)).collect();

        if is_cancelled() {
            return Err(PipelineError::Dependency("cancelled before semantic stage".to_string()));
        }

        let semantics: Vec<Option<SemanticResult>> = if self.has(Step::Semantic) {
            self.run_semantic_batch(&prepared)
        } else {
            vec![None; messages.len()]
        };

        let mut results = Vec::with_capacity(messages.len());
        for ((msg, body), semantic) in messages.iter().zip(&prepared).zip(semantics) {
            if is_cancelled() {
                return Err(PipelineError::Dependency("cancelled mid-batch".to_string()));
            }
            if let Some(err) = &msg.error {
                warn!("message {} arrived with decoder error tag: {err}", msg.source_path);
            }
            let blocks = self.split_blocks(body);
            results.push(self.finish(msg, semantic, &blocks));
        }

        let summary = aggregator::summarize_run(&results);
        Ok(RunResult { results, summary })
    }

    fn run_semantic_batch(&self, bodies: &[String]) -> Vec<Option<SemanticResult>> {
        let Some(provider) = &self.embedding else {
            warn!("semantic: embedding provider unavailable, returning unmatched results for batch");
            return bodies.iter().map(|_| Some(SemanticResult::unmatched(Vec::new()))).collect();
        };
        match crate::semantic::extract_batch(bodies, &self.config.semantic_templates, provider.as_ref()) {
            Ok(results) => results.into_iter().map(Some).collect(),
            Err(e) => {
                warn!("semantic: batched embedding request failed, downgrading whole batch: {e}");
                bodies.iter().map(|_| Some(SemanticResult::unmatched(Vec::new()))).collect()
            }
        }
    }
}

fn single_block(body: &str) -> Vec<SplitBlock> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let total = body.lines().count();
    vec![SplitBlock {
        text: trimmed.to_string(),
        start_line: 0,
        end_line: total.saturating_sub(1),
    }]
}
