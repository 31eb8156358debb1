//! Combines per-block keyword and classification output into block-level
//! enrichments and cross-block summary rollups.

use crate::classifier;
use crate::keyword;
use crate::model::{Aggregation, AggregatedBlock, ClassCount, KeywordCount, KeywordMatch, SplitBlock, PipelineResult, Summary};
use indexmap::IndexMap;

/// Build an [`Aggregation`] from `blocks` plus the optional per-block
/// keyword-match and classification outputs. A `None` extractor/classifier
/// input yields an empty summary for that dimension, per §4.7.
pub fn aggregate(
    blocks: &[SplitBlock],
    keywords: Option<&[Vec<KeywordMatch>]>,
    classes: Option<&[Vec<String>]>,
) -> Aggregation {
    let empty_keywords: Vec<Vec<KeywordMatch>> = vec![Vec::new(); blocks.len()];
    let empty_classes: Vec<Vec<String>> = vec![Vec::new(); blocks.len()];
    let keywords = keywords.unwrap_or(&empty_keywords);
    let classes = classes.unwrap_or(&empty_classes);

    let aggregated_blocks: Vec<AggregatedBlock> = blocks
        .iter()
        .enumerate()
        .map(|(i, b)| AggregatedBlock {
            text: b.text.clone(),
            start_line: b.start_line,
            end_line: b.end_line,
            keywords: keywords.get(i).cloned().unwrap_or_default(),
            classes: classes.get(i).cloned().unwrap_or_default(),
        })
        .collect();

    let keyword_summary = keyword::summarize(keywords);
    let class_summary = classifier::summarize(classes);

    Aggregation {
        blocks: aggregated_blocks,
        keyword_summary,
        class_summary,
    }
}

/// Recompute the cross-message rollup over every [`AggregatedBlock`] produced
/// across a full run, plus `message_count`.
pub fn summarize_run(results: &[PipelineResult]) -> Summary {
    let all_blocks: Vec<&AggregatedBlock> = results
        .iter()
        .flat_map(|r| r.aggregation.blocks.iter())
        .collect();

    let keyword_lists: Vec<Vec<KeywordMatch>> =
        all_blocks.iter().map(|b| b.keywords.clone()).collect();
    let class_lists: Vec<Vec<String>> = all_blocks.iter().map(|b| b.classes.clone()).collect();

    let keyword_summary: IndexMap<String, Vec<KeywordCount>> = keyword::summarize(&keyword_lists);
    let class_summary: IndexMap<String, ClassCount> = classifier::summarize(&class_lists);

    Summary {
        message_count: results.len(),
        block_count: all_blocks.len(),
        keyword_summary,
        class_summary,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn block(text: &str, start: usize, end: usize) -> SplitBlock {
        SplitBlock {
            text: text.to_string(),
            start_line: start,
            end_line: end,
        }
    }

    #[test]
    fn aggregate_with_no_extractor_or_classifier_yields_empty_summaries() {
        let blocks = vec![block("案件A", 0, 2), block("案件B", 3, 5)];
        let agg = aggregate(&blocks, None, None);
        assert_eq!(agg.blocks.len(), 2);
        assert!(agg.keyword_summary.is_empty());
        assert!(agg.class_summary.is_empty());
        assert!(agg.blocks[0].keywords.is_empty());
        assert!(agg.blocks[0].classes.is_empty());
    }

    #[test]
    fn aggregate_attaches_keywords_and_classes_per_block() {
        let blocks = vec![block("案件A", 0, 2)];
        let keywords = vec![vec![KeywordMatch {
            keyword: "Java".to_string(),
            category: "programming_languages".to_string(),
        }]];
        let classes = vec![vec!["foreigner_ok".to_string()]];
        let agg = aggregate(&blocks, Some(&keywords), Some(&classes));
        assert_eq!(agg.blocks[0].keywords.len(), 1);
        assert_eq!(agg.blocks[0].classes, vec!["foreigner_ok".to_string()]);
        assert_eq!(agg.keyword_summary["programming_languages"][0].count, 1);
        assert_eq!(agg.class_summary["foreigner_ok"].count, 1);
    }

    #[test]
    fn summarize_run_combines_blocks_across_messages() {
        let mk = |kw: &str| PipelineResult {
            source_path: "x".to_string(),
            subject: "s".to_string(),
            semantic: None,
            blocks: vec![AggregatedBlock {
                text: "t".to_string(),
                start_line: 0,
                end_line: 0,
                keywords: vec![KeywordMatch {
                    keyword: kw.to_string(),
                    category: "programming_languages".to_string(),
                }],
                classes: vec![],
            }],
            aggregation: Aggregation {
                blocks: vec![AggregatedBlock {
                    text: "t".to_string(),
                    start_line: 0,
                    end_line: 0,
                    keywords: vec![KeywordMatch {
                        keyword: kw.to_string(),
                        category: "programming_languages".to_string(),
                    }],
                    classes: vec![],
                }],
                keyword_summary: IndexMap::new(),
                class_summary: IndexMap::new(),
            },
            error: None,
        };
        let results = vec![mk("Java"), mk("Java"), mk("Rust")];
        let summary = summarize_run(&results);
        assert_eq!(summary.message_count, 3);
        assert_eq!(summary.block_count, 3);
        let java_row = summary.keyword_summary["programming_languages"]
            .iter()
            .find(|r| r.keyword == "Java")
            .unwrap();
        assert_eq!(java_row.count, 2);
    }
}
