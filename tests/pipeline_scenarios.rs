use std::sync::Arc;

use indexmap::IndexMap;

use job_signal::config::types::{KeywordTaxonomy, PipelineConfig};
use job_signal::embedding::{EmbeddingProvider, FakeEmbeddingProvider};
use job_signal::model::EmailMessage;
use job_signal::pipeline::Pipeline;

fn message(body: &str) -> EmailMessage {
    EmailMessage {
        source_path: "inbox/msg-1.eml".to_string(),
        subject: "案件のご紹介".to_string(),
        sender: "recruiter@example.com".to_string(),
        recipients: vec!["candidate@example.com".to_string()],
        received_at: Some("2026-07-01T09:00:00Z".to_string()),
        created_at: None,
        body: body.to_string(),
        parser: "eml".to_string(),
        error: None,
    }
}

fn taxonomy() -> KeywordTaxonomy {
    let mut map = IndexMap::new();
    map.insert(
        "programming_languages".to_string(),
        vec!["C++".to_string(), "C".to_string(), "Java".to_string(), "Python".to_string()],
    );
    map.insert(
        "frontend_frameworks".to_string(),
        vec!["Tailwind CSS".to_string(), "React".to_string()],
    );
    KeywordTaxonomy(map)
}

fn config() -> PipelineConfig {
    let mut cfg = PipelineConfig::default();
    cfg.keywords_tech = taxonomy();
    cfg
}

#[test]
fn html_body_is_cleaned_filtered_split_and_classified_end_to_end() {
    // skip_lines=0 so both "■案件N" markers register despite the short body;
    // the default skip_lines=5 is tuned for full-length email bodies.
    let mut cfg = config();
    cfg.skip_lines = 0;
    let cfg = Arc::new(cfg);
    let provider: Arc<dyn EmbeddingProvider> =
        Arc::new(FakeEmbeddingProvider::new(vec!["案件".to_string()], 8));
    let pipeline = Pipeline::new(cfg, Some(provider)).unwrap();

    let body = "<div>積極採用中のエンジニア募集です。</div>\
                <div>■案件1</div><div>C++エンジニア募集。国籍不問です。</div>\
                <div>■案件2</div><div>Python案件のご紹介。外国籍可。</div>\
                <div>よろしくお願いします。</div>";
    let result = pipeline.process_message(&message(body));

    assert_eq!(result.blocks.len(), 2);
    let first = &result.blocks[0];
    assert!(first.keywords.iter().any(|k| k.keyword == "C++"));
    assert!(!first.keywords.iter().any(|k| k.keyword == "C"));
    assert!(first.classes.contains(&"foreigner_ok".to_string()));

    let second = &result.blocks[1];
    assert!(second.keywords.iter().any(|k| k.keyword == "Python"));
    assert!(second.classes.contains(&"foreigner_ok".to_string()));
}

#[test]
fn keyword_is_counted_once_per_block_even_when_repeated() {
    let cfg = Arc::new(config());
    let pipeline = Pipeline::new(cfg, None).unwrap();

    let body = "Python Pythonエンジニア募集。Python経験者歓迎。Pythonでの開発経験必須。";
    let result = pipeline.process_message(&message(body));

    assert_eq!(result.blocks.len(), 1);
    let python_hits = result.blocks[0]
        .keywords
        .iter()
        .filter(|k| k.keyword == "Python")
        .count();
    assert_eq!(python_hits, 1);
}

#[test]
fn run_without_embedding_provider_downgrades_semantic_but_keeps_other_stages() {
    let cfg = Arc::new(config());
    let pipeline = Pipeline::new(cfg, None).unwrap();

    let body = "■案件1\nJavaエンジニア募集。日本国籍のみ。";
    let result = pipeline.process_message(&message(body));

    let semantic = result.semantic.as_ref().unwrap();
    assert!(!semantic.matched);
    assert_eq!(result.blocks.len(), 1);
    assert!(result.blocks[0].classes.contains(&"foreigner_ng".to_string()));
}

#[test]
fn batch_run_rolls_up_keyword_and_class_summaries_across_messages() {
    let cfg = Arc::new(config());
    let pipeline = Pipeline::new(cfg, None).unwrap();

    let messages = vec![
        message("■案件1\nJavaエンジニア募集。国籍不問。"),
        message("■案件1\nJavaエンジニア募集。国籍不問。"),
        message("■案件1\nReactエンジニア募集。"),
    ];
    let run = pipeline.process_messages(&messages, None).unwrap();

    assert_eq!(run.summary.message_count, 3);
    let java_row = run.summary.keyword_summary["programming_languages"]
        .iter()
        .find(|r| r.keyword == "Java")
        .unwrap();
    assert_eq!(java_row.count, 2);
    let foreigner_ok = &run.summary.class_summary["foreigner_ok"];
    assert_eq!(foreigner_ok.count, 2);
}

#[test]
fn disabling_the_classifier_step_leaves_blocks_unclassified() {
    let mut cfg = config();
    cfg.steps.retain(|s| s.name() != "classifier");
    let pipeline = Pipeline::new(Arc::new(cfg), None).unwrap();

    let body = "■案件1\n国籍不問のJavaエンジニア募集です。";
    let result = pipeline.process_message(&message(body));

    assert!(result.blocks[0].classes.is_empty());
    assert!(result.blocks[0].keywords.iter().any(|k| k.keyword == "Java"));
}
