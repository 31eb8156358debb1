//! Literal-substring regex classification of blocks.

use indexmap::IndexMap;
use regex::Regex;

use crate::config::types::ClassifierConfig;
use crate::model::ClassCount;

struct CompiledClass {
    name: String,
    patterns: Vec<Regex>,
}

/// Once-per-snapshot compiled form of a [`ClassifierConfig`]: each pattern
/// compiled as an escaped literal, preserving the configuration's class
/// iteration order.
pub struct CompiledClassifier {
    classes: Vec<CompiledClass>,
    dedupe: bool,
}

impl CompiledClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        let classes = config
            .classes
            .iter()
            .map(|(name, patterns)| CompiledClass {
                name: name.clone(),
                patterns: patterns
                    .iter()
                    .filter_map(|p| Regex::new(&regex::escape(p)).ok())
                    .collect(),
            })
            .collect();
        Self {
            classes,
            dedupe: config.dedupe,
        }
    }

    /// Return the class labels that match any line of `text`, in
    /// configuration order. When `dedupe` is false, a class is pushed once
    /// per matching line rather than once per block.
    pub fn classify(&self, text: &str) -> Vec<String> {
        let lines: Vec<&str> = text.lines().collect();
        let mut labels = Vec::new();
        for class in &self.classes {
            for line in &lines {
                if class.patterns.iter().any(|re| re.is_match(line)) {
                    labels.push(class.name.clone());
                    if self.dedupe {
                        break;
                    }
                }
            }
        }
        labels
    }
}

/// Build the `class -> {count, ratio}` summary across `blocks` (each block's
/// classification list as produced by [`CompiledClassifier::classify`]).
pub fn summarize(blocks: &[Vec<String>]) -> IndexMap<String, ClassCount> {
    let total = blocks.len();
    if total == 0 {
        return IndexMap::new();
    }
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for labels in blocks {
        for label in labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .map(|(class, count)| {
            (
                class,
                ClassCount {
                    count,
                    ratio: count as f64 / total as f64,
                },
            )
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn foreigner_config() -> ClassifierConfig {
        ClassifierConfig::default_foreigner()
    }

    #[test]
    fn classifies_foreigner_ok_block() {
        let compiled = CompiledClassifier::new(&foreigner_config());
        let labels = compiled.classify("募集要項\n国籍不問\n経験者優遇");
        assert_eq!(labels, vec!["foreigner_ok"]);
    }

    #[test]
    fn classifies_foreigner_ng_block() {
        let compiled = CompiledClassifier::new(&foreigner_config());
        let labels = compiled.classify("応募条件\n日本国籍のみ");
        assert_eq!(labels, vec!["foreigner_ng"]);
    }

    #[test]
    fn no_match_yields_no_labels() {
        let compiled = CompiledClassifier::new(&foreigner_config());
        assert!(compiled.classify("特に条件の記載なし").is_empty());
    }

    #[test]
    fn preserves_configured_class_order() {
        let mut cfg = foreigner_config();
        // classify text matching both classes; output order must follow config order
        let labels = CompiledClassifier::new(&cfg).classify("国籍不問\n日本国籍のみ");
        assert_eq!(labels, vec!["foreigner_ok", "foreigner_ng"]);

        cfg.classes.reverse();
        let labels_reversed = CompiledClassifier::new(&cfg).classify("国籍不問\n日本国籍のみ");
        assert_eq!(labels_reversed, vec!["foreigner_ng", "foreigner_ok"]);
    }

    #[test]
    fn dedupe_stops_scanning_after_first_hit() {
        let compiled = CompiledClassifier::new(&foreigner_config());
        // Two lines both matching foreigner_ok; classify should still report it once.
        let labels = compiled.classify("国籍不問\n外国籍可");
        assert_eq!(labels, vec!["foreigner_ok"]);
    }

    #[test]
    fn without_dedupe_each_matching_line_contributes_a_label() {
        let mut cfg = foreigner_config();
        cfg.dedupe = false;
        let compiled = CompiledClassifier::new(&cfg);
        let labels = compiled.classify("国籍不問\n外国籍可");
        assert_eq!(labels, vec!["foreigner_ok", "foreigner_ok"]);
    }

    #[test]
    fn summarize_computes_count_and_ratio() {
        let blocks = vec![
            vec!["foreigner_ok".to_string()],
            vec!["foreigner_ok".to_string()],
            vec![],
        ];
        let summary = summarize(&blocks);
        let row = &summary["foreigner_ok"];
        assert_eq!(row.count, 2);
        assert!((row.ratio - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn summarize_empty_blocks_returns_empty_map() {
        assert!(summarize(&[]).is_empty());
    }
}
