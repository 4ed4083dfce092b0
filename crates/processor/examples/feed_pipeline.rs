//! Example of building and running a feed pipeline in both execution forms
//!
//! This example demonstrates:
//! - Loading runtime configuration (file and `FEEDPIPE_*` environment)
//! - Initializing logging
//! - Chaining registered pipes with the fluent builder
//! - Running the same pipeline lazily and as a future
//!
//! Run with: cargo run --package feedpipe-processor --example feed_pipeline [config.yaml]

use feedpipe_config::RuntimeConfig;
use feedpipe_processor::pipeline::PipelineBuilder;
use feedpipe_processor::{telemetry, Context, Record};
use feedpipe_types::json;
use futures::stream;
use std::path::PathBuf;

fn items() -> Vec<Record> {
    [
        json!({"id": "a1", "heading": "Release notes", "thumb": "a1.png", "when": "yesterday"}),
        json!({"id": "b2", "heading": "Roadmap", "thumb": "b2.png", "when": "today"}),
        json!({"id": "a1", "heading": "Release notes (dup)", "thumb": "a1.png", "when": "today"}),
        json!({"id": "c3", "heading": "Changelog", "thumb": "c3.png", "when": "2 days"}),
    ]
    .into_iter()
    .filter_map(|value| Record::from_value(value).ok())
    .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RuntimeConfig::load(std::env::args().nth(1).map(PathBuf::from))?;
    telemetry::init_tracing(&config.observability)?;

    let ctx = Context::from_config(&config).with_input("limit", json!(2));

    let pipeline = PipelineBuilder::new()
        .with_name("latest-posts")
        .with_stage("uniq", json!({"field": "id"}))
        .with_stage("datebuilder", json!({"date": {"subkey": "when"}}))
        .with_stage(
            "rssitembuilder",
            json!({"guid": "id", "title": "heading", "mediaThumbURL": "thumb", "pubDate": "date"}),
        )
        .with_stage("tail", json!({"count": {"terminal": "limit", "default": 10}}))
        .build()?;

    println!("=== Sync ===");
    for item in pipeline.run(items(), &ctx)? {
        println!("{}", item?);
    }

    println!("=== Async ===");
    for item in pipeline.run_async(stream::iter(items()), &ctx).await? {
        println!("{}", item);
    }

    Ok(())
}
