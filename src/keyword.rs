//! Category-aware, longest-match, once-per-block keyword extraction.

use std::collections::HashMap;

use indexmap::IndexMap;
use regex::Regex;

use crate::config::types::KeywordTaxonomy;
use crate::model::{KeywordCount, KeywordMatch, SplitBlock};

/// ASCII-scoped so a keyword like "Java" or "C++" still counts as
/// word-bounded when directly butted against Japanese text with no
/// separating space or punctuation (e.g. "Java案件です", "Pythonエンジニア").
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// True iff neither the char immediately before byte offset `start` nor the
/// char immediately after byte offset `end` in `text` is a word character.
/// `regex` has no lookaround assertions, so this replaces what would
/// otherwise be a `(?<!\w)...(?!\w)` pattern.
fn has_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before_ok = text[..start].chars().next_back().is_none_or(|c| !is_word_char(c));
    let after_ok = text[end..].chars().next().is_none_or(|c| !is_word_char(c));
    before_ok && after_ok
}

struct CompiledKeyword {
    original: String,
    category: String,
    pattern: Regex,
}

/// Once-per-snapshot compiled form of a [`KeywordTaxonomy`]: a length-sorted
/// (longest first) list of word-boundary-sensitive, case-insensitive regexes,
/// plus a lowercase category lookup.
pub struct CompiledTaxonomy {
    keywords: Vec<CompiledKeyword>,
    category_by_lower: HashMap<String, String>,
}

impl CompiledTaxonomy {
    pub fn new(taxonomy: &KeywordTaxonomy) -> Self {
        let mut seen = std::collections::HashSet::new();
        let mut entries: Vec<(String, String)> = Vec::new();
        for (category, keywords) in &taxonomy.0 {
            for kw in keywords {
                if seen.insert(kw.clone()) {
                    entries.push((kw.clone(), category.clone()));
                }
            }
        }
        entries.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));

        let mut category_by_lower = HashMap::new();
        let mut keywords = Vec::with_capacity(entries.len());
        for (kw, category) in entries {
            category_by_lower.insert(kw.to_lowercase(), category.clone());
            let escaped = regex::escape(&kw);
            // `regex` has no lookaround, so the literal is matched plain and
            // word-boundary adjacency is checked manually in `extract`.
            let Ok(pattern) = Regex::new(&format!(r"(?i){escaped}")) else {
                continue;
            };
            keywords.push(CompiledKeyword {
                original: kw,
                category,
                pattern,
            });
        }
        Self {
            keywords,
            category_by_lower,
        }
    }

    fn category_for(&self, keyword: &str) -> String {
        self.category_by_lower
            .get(&keyword.to_lowercase())
            .cloned()
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Find all distinct keyword matches in `text`, longest keyword wins on
    /// span overlap, each keyword counted at most once.
    pub fn extract(&self, text: &str) -> Vec<KeywordMatch> {
        let mut taken: Vec<(usize, usize)> = Vec::new();
        let mut matches = Vec::new();

        for kw in &self.keywords {
            let found = kw.pattern.find_iter(text).find(|m| {
                has_word_boundary(text, m.start(), m.end())
                    && !taken.iter().any(|&(s, e)| m.start() < e && s < m.end())
            });
            let Some(found) = found else {
                continue;
            };
            taken.push((found.start(), found.end()));
            matches.push(KeywordMatch {
                keyword: kw.original.clone(),
                category: kw.category.clone(),
            });
        }
        matches
    }
}

/// Count each keyword at most once per block.
pub fn count_by_keyword(blocks: &[Vec<KeywordMatch>]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for matches in blocks {
        let mut seen = std::collections::HashSet::new();
        for m in matches {
            if seen.insert(&m.keyword) {
                *counts.entry(m.keyword.clone()).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Count each keyword at most once per block, grouped by category.
pub fn count_by_category(blocks: &[Vec<KeywordMatch>]) -> HashMap<String, HashMap<String, usize>> {
    let mut counts: HashMap<String, HashMap<String, usize>> = HashMap::new();
    for matches in blocks {
        let mut seen = std::collections::HashSet::new();
        for m in matches {
            if seen.insert(&m.keyword) {
                *counts
                    .entry(m.category.clone())
                    .or_default()
                    .entry(m.keyword.clone())
                    .or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Build the `category -> [{keyword, count, ratio}]` summary across `blocks`,
/// ordered by descending count within each category.
pub fn summarize(blocks: &[Vec<KeywordMatch>]) -> IndexMap<String, Vec<KeywordCount>> {
    let total = blocks.len();
    if total == 0 {
        return IndexMap::new();
    }

    let mut counts: IndexMap<String, HashMap<String, usize>> = IndexMap::new();
    for matches in blocks {
        let mut seen = std::collections::HashSet::new();
        for m in matches {
            if seen.insert(&m.keyword) {
                *counts
                    .entry(m.category.clone())
                    .or_default()
                    .entry(m.keyword.clone())
                    .or_insert(0) += 1;
            }
        }
    }

    let mut out = IndexMap::new();
    for (category, kw_counts) in counts {
        let mut rows: Vec<KeywordCount> = kw_counts
            .into_iter()
            .map(|(keyword, count)| KeywordCount {
                keyword,
                ratio: count as f64 / total as f64,
                count,
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.keyword.cmp(&b.keyword)));
        out.insert(category, rows);
    }
    out
}

pub fn extract_for_blocks(blocks: &[SplitBlock], taxonomy: &CompiledTaxonomy) -> Vec<Vec<KeywordMatch>> {
    blocks.iter().map(|b| taxonomy.extract(&b.text)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn taxonomy() -> KeywordTaxonomy {
        let mut map = IndexMap::new();
        map.insert(
            "programming_languages".to_string(),
            vec!["C++".to_string(), "C#".to_string(), "C".to_string(), "Java".to_string()],
        );
        map.insert(
            "frontend_frameworks".to_string(),
            vec!["Tailwind CSS".to_string(), "React".to_string()],
        );
        KeywordTaxonomy(map)
    }

    #[test]
    fn longest_match_wins_over_shorter_substring() {
        let compiled = CompiledTaxonomy::new(&taxonomy());
        let matches = compiled.extract("このプロジェクトはC++で書かれています");
        let keywords: Vec<&str> = matches.iter().map(|m| m.keyword.as_str()).collect();
        assert!(keywords.contains(&"C++"));
        assert!(!keywords.contains(&"C"));
    }

    #[test]
    fn counts_once_per_block_even_with_repeats() {
        let compiled = CompiledTaxonomy::new(&taxonomy());
        let matches = compiled.extract("Java案件です。Javaエンジニア募集。Java経験者歓迎。");
        let java_count = matches.iter().filter(|m| m.keyword == "Java").count();
        assert_eq!(java_count, 1);
    }

    #[test]
    fn unknown_keyword_falls_back_to_unknown_category() {
        let compiled = CompiledTaxonomy::new(&taxonomy());
        assert_eq!(compiled.category_for("Rust"), "unknown");
        assert_eq!(compiled.category_for("java"), "programming_languages");
    }

    #[test]
    fn multi_word_keyword_matches_with_space() {
        let compiled = CompiledTaxonomy::new(&taxonomy());
        let matches = compiled.extract("フロントエンドはTailwind CSSを使用");
        assert!(matches.iter().any(|m| m.keyword == "Tailwind CSS"));
    }

    #[test]
    fn summarize_computes_ratio_over_blocks() {
        let compiled = CompiledTaxonomy::new(&taxonomy());
        let blocks = vec![
            compiled.extract("Java案件"),
            compiled.extract("React案件"),
            compiled.extract("Javaエンジニア"),
        ];
        let summary = summarize(&blocks);
        let java_row = summary["programming_languages"]
            .iter()
            .find(|r| r.keyword == "Java")
            .unwrap();
        assert_eq!(java_row.count, 2);
        assert!((java_row.ratio - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn summarize_empty_blocks_returns_empty_map() {
        let summary = summarize(&[]);
        assert!(summary.is_empty());
    }

    #[test]
    fn count_by_keyword_counts_once_per_block() {
        let compiled = CompiledTaxonomy::new(&taxonomy());
        let blocks = vec![
            compiled.extract("JavaとReactの案件"),
            compiled.extract("Java単独の案件"),
        ];
        let counts = count_by_keyword(&blocks);
        assert_eq!(counts["Java"], 2);
        assert_eq!(counts["React"], 1);
    }

    #[test]
    fn count_by_category_groups_correctly() {
        let compiled = CompiledTaxonomy::new(&taxonomy());
        let blocks = vec![compiled.extract("JavaとReactの案件")];
        let counts = count_by_category(&blocks);
        assert_eq!(counts["programming_languages"]["Java"], 1);
        assert_eq!(counts["frontend_frameworks"]["React"], 1);
    }

    #[test]
    fn overlapping_spans_prevented_within_block() {
        let compiled = CompiledTaxonomy::new(&taxonomy());
        // "C#" should not also register a spurious "C" match at the same span.
        let matches = compiled.extract("言語はC#を使用");
        let c_sharp = matches.iter().filter(|m| m.keyword == "C#").count();
        let c_plain = matches.iter().filter(|m| m.keyword == "C").count();
        assert_eq!(c_sharp, 1);
        assert_eq!(c_plain, 0);
    }
}
