use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A pipeline stage name, as it appears in the `steps` config list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Cleaner,
    LineFilter,
    Semantic,
    Splitter,
    Extractor,
    Classifier,
    Aggregator,
}

impl Step {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cleaner => "cleaner",
            Self::LineFilter => "line_filter",
            Self::Semantic => "semantic",
            Self::Splitter => "splitter",
            Self::Extractor => "extractor",
            Self::Classifier => "classifier",
            Self::Aggregator => "aggregator",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cleaner" => Some(Self::Cleaner),
            "line_filter" => Some(Self::LineFilter),
            "semantic" => Some(Self::Semantic),
            "splitter" => Some(Self::Splitter),
            "extractor" => Some(Self::Extractor),
            "classifier" => Some(Self::Classifier),
            "aggregator" => Some(Self::Aggregator),
            _ => None,
        }
    }
}

/// Line-filtering rule set. See the line filter module for the evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineFilterConfig {
    pub decoration_chars: String,
    pub greeting_patterns: Vec<String>,
    pub closing_patterns: Vec<String>,
    pub signature_company_prefix: Vec<String>,
    pub signature_keywords: Vec<String>,
    pub footer_patterns: Vec<String>,
    pub job_keywords: Vec<String>,
    pub force_delete_patterns: Vec<String>,
}

impl Default for LineFilterConfig {
    fn default() -> Self {
        Self {
            decoration_chars: "=-*#＝－＊♦◆■□○●・".to_string(),
            greeting_patterns: vec![
                r"^(いつも)?お世話になっております".to_string(),
                r"^お疲れ様です".to_string(),
                r"^お忙しいところ".to_string(),
            ],
            closing_patterns: vec![
                r"^よろしくお願い(いた)?します".to_string(),
                r"^以上、?よろしくお願いします".to_string(),
                r"^何卒よろしくお願い申し上げます".to_string(),
            ],
            signature_company_prefix: vec![
                "株式会社".to_string(),
                "有限会社".to_string(),
                "合同会社".to_string(),
            ],
            signature_keywords: vec![
                "TEL".to_string(),
                "FAX".to_string(),
                "Email".to_string(),
                "E-mail".to_string(),
                "担当".to_string(),
                "Mobile".to_string(),
            ],
            footer_patterns: vec![
                r"^このメールは.*送信されています".to_string(),
                r"^配信停止.*はこちら".to_string(),
            ],
            job_keywords: vec![
                "案件".to_string(),
                "求人".to_string(),
                "募集".to_string(),
                "エンジニア".to_string(),
                "案件名".to_string(),
                "業務内容".to_string(),
                "勤務地".to_string(),
                "単価".to_string(),
                "稼働".to_string(),
                "スキル".to_string(),
            ],
            force_delete_patterns: vec![r"^\[広告\]".to_string(), r"^※このメールは".to_string()],
        }
    }
}

/// Embedding-based job-description segment templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    pub global: Vec<String>,
    pub fields: IndexMap<String, Vec<String>>,
    pub context_radius: usize,
    pub global_threshold: f32,
    pub field_threshold: f32,
    pub batch_size: usize,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            global: vec![
                "案件の募集内容".to_string(),
                "業務内容とスキル要件".to_string(),
            ],
            fields: IndexMap::new(),
            context_radius: 1,
            global_threshold: 0.55,
            field_threshold: 0.4,
            batch_size: 32,
        }
    }
}

/// `category -> keywords` taxonomy for the keyword extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordTaxonomy(pub IndexMap<String, Vec<String>>);

/// Passthrough validation rules for the (external) index-rule store.
/// `table_name` is validated locally even though the store itself lives
/// outside this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexRulesConfig {
    pub table_name: Option<String>,
}

/// Matching strategy for classifier patterns. Currently only one is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierStrategy {
    LineLevelDirectMatch,
}

impl Default for ClassifierStrategy {
    fn default() -> Self {
        Self::LineLevelDirectMatch
    }
}

/// `class -> literal patterns` taxonomy for the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub classes: IndexMap<String, Vec<String>>,
    pub dedupe: bool,
    pub strategy: ClassifierStrategy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            classes: IndexMap::new(),
            dedupe: true,
            strategy: ClassifierStrategy::LineLevelDirectMatch,
        }
    }
}

impl ClassifierConfig {
    /// The default taxonomy this crate ships for the "foreign nationals
    /// accepted" classification, grounded in the original's `classifier.py`
    /// foreigner-acceptance test fixtures.
    pub fn default_foreigner() -> Self {
        let mut classes = IndexMap::new();
        classes.insert(
            "foreigner_ok".to_string(),
            vec!["外国籍可".to_string(), "外国人可".to_string(), "国籍不問".to_string()],
        );
        classes.insert(
            "foreigner_ng".to_string(),
            vec!["外国籍不可".to_string(), "日本国籍のみ".to_string()],
        );
        Self {
            classes,
            dedupe: true,
            strategy: ClassifierStrategy::LineLevelDirectMatch,
        }
    }
}

/// The full, runtime-reconfigurable pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub steps: Vec<Step>,
    pub line_filter: LineFilterConfig,
    pub semantic_templates: SemanticConfig,
    pub keywords_tech: KeywordTaxonomy,
    pub index_rules: IndexRulesConfig,
    pub classifier_foreigner: ClassifierConfig,
    /// Marker regexes that partition a body into blocks; see the splitter module.
    pub split_markers: Vec<String>,
    /// Lines within this distance of either body edge can never be markers.
    pub skip_lines: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            steps: vec![
                Step::Cleaner,
                Step::LineFilter,
                Step::Semantic,
                Step::Splitter,
                Step::Extractor,
                Step::Classifier,
                Step::Aggregator,
            ],
            line_filter: LineFilterConfig::default(),
            semantic_templates: SemanticConfig::default(),
            keywords_tech: KeywordTaxonomy::default(),
            index_rules: IndexRulesConfig::default(),
            classifier_foreigner: ClassifierConfig::default_foreigner(),
            split_markers: vec![r"^■?案件\d*".to_string(), r"^\[案件\d+\]".to_string()],
            skip_lines: 5,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn step_name_round_trip() {
        for step in [
            Step::Cleaner,
            Step::LineFilter,
            Step::Semantic,
            Step::Splitter,
            Step::Extractor,
            Step::Classifier,
            Step::Aggregator,
        ] {
            assert_eq!(Step::from_name(step.name()), Some(step));
        }
    }

    #[test]
    fn unknown_step_name_returns_none() {
        assert_eq!(Step::from_name("not-a-step"), None);
    }

    #[test]
    fn default_config_has_all_steps_in_order() {
        let cfg = PipelineConfig::default();
        assert_eq!(
            cfg.steps,
            vec![
                Step::Cleaner,
                Step::LineFilter,
                Step::Semantic,
                Step::Splitter,
                Step::Extractor,
                Step::Classifier,
                Step::Aggregator,
            ]
        );
    }

    #[test]
    fn default_classifier_preserves_class_order() {
        let cfg = ClassifierConfig::default_foreigner();
        let names: Vec<&String> = cfg.classes.keys().collect();
        assert_eq!(names, vec!["foreigner_ok", "foreigner_ng"]);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = PipelineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn minimal_json_uses_defaults() {
        let cfg: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.skip_lines, 5);
        assert!(!cfg.line_filter.job_keywords.is_empty());
    }
}
