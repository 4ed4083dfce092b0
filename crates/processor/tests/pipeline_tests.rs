//! Pipelines driven by runtime configuration

use feedpipe_config::RuntimeConfig;
use feedpipe_processor::pipeline::PipelineBuilder;
use feedpipe_processor::{CancelHandle, Context, ProcessorError};
use feedpipe_types::{json, Record};
use futures::stream::{self, StreamExt};

const CONFIG: &str = r#"
context:
  verbose: true
  inputs:
    keep: 2
    feed_title: "Latest"
execution:
  strict_resolution: false
  yield_every: 4
observability:
  log_level: debug
"#;

fn items() -> Vec<Record> {
    vec![
        json!({"id": "a", "heading": "first", "when": "2024-01-01"}),
        json!({"id": "b", "heading": "second", "when": "2024-01-02"}),
        json!({"id": "a", "heading": "first again", "when": "2024-01-03"}),
        json!({"id": "c", "heading": "third", "when": "2024-01-04"}),
    ]
    .into_iter()
    .map(|v| Record::from_value(v).unwrap())
    .collect()
}

fn feed_pipeline() -> feedpipe_processor::Pipeline {
    PipelineBuilder::new()
        .with_name("feed")
        .with_stage("uniq", json!({"field": "id"}))
        .with_stage("datebuilder", json!({"date": {"subkey": "when"}}))
        .with_stage(
            "rssitembuilder",
            json!({
                "guid": "id",
                "title": "heading",
                "pubDate": "date",
                "author": {"terminal": "feed_title"}
            }),
        )
        .with_stage("tail", json!({"count": {"terminal": "keep"}}))
        .build()
        .unwrap()
}

#[test]
fn test_context_from_runtime_config() {
    let config = RuntimeConfig::from_yaml_str(CONFIG).unwrap();
    let ctx = Context::from_config(&config);
    assert!(ctx.is_verbose());
    assert_eq!(ctx.yield_every(), 4);
    assert_eq!(ctx.input("keep"), Some(&json!(2)));
}

#[test]
fn test_feed_pipeline_sync() {
    let config = RuntimeConfig::from_yaml_str(CONFIG).unwrap();
    let ctx = Context::from_config(&config);

    let out = feed_pipeline().list(items(), &ctx).unwrap();
    assert_eq!(
        out,
        vec![
            Record::from_value(json!({
                "y:id": "b",
                "y:title": "second",
                "pubDate": "2024-01-02T00:00:00Z",
                "author": "Latest"
            }))
            .unwrap(),
            Record::from_value(json!({
                "y:id": "c",
                "y:title": "third",
                "pubDate": "2024-01-04T00:00:00Z",
                "author": "Latest"
            }))
            .unwrap(),
        ]
    );
}

#[tokio::test]
async fn test_feed_pipeline_async_matches_sync() {
    let config = RuntimeConfig::from_yaml_str(CONFIG).unwrap();
    let ctx = Context::from_config(&config);
    let pipeline = feed_pipeline();

    let sync = pipeline.list(items(), &ctx).unwrap();
    let input = stream::iter(items()).map(Ok).boxed();
    let outcome = pipeline
        .execute_async(Some(input), &ctx, &CancelHandle::new())
        .await
        .unwrap();

    assert!(!outcome.cancelled);
    assert_eq!(outcome.records, sync);
    assert_eq!(outcome.stages.len(), 4);
    assert_eq!(outcome.stages[0].items_in, 4);
    assert_eq!(outcome.stages[0].items_out, 3);
}

#[test]
fn test_missing_input_with_strict_resolution() {
    let yaml = "execution:\n  strict_resolution: true\n";
    let config = RuntimeConfig::from_yaml_str(yaml).unwrap();
    let ctx = Context::from_config(&config);

    let err = feed_pipeline().run(items(), &ctx).err().unwrap();
    assert!(matches!(err, ProcessorError::Resolution { ref pipe, .. } if pipe == "tail"));
}
