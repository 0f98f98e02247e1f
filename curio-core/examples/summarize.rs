//! Summarize a passage with the invocation engine
//!
//! Reads the passage from stdin (or uses a built-in one), asks for a JSON
//! summary and prints the output together with usage, cost and duration.
//!
//! Run with: OPENAI_API_KEY=sk-... cargo run --example summarize [model] [config.yaml|config.json]

use anyhow::Context;
use curio_core::config;
use curio_core::{EngineConfig, InvocationRequest, ModelRouter};
use std::io::{IsTerminal, Read};
use tracing_subscriber::EnvFilter;

const SAMPLE: &str = "Rust 1.0 shipped in May 2015 after years of design work. \
It promised memory safety without garbage collection, enforced by the borrow checker.";

const SYSTEM: &str = "You summarize articles for a reading app. \
Return JSON with keys \"summary\" (two sentences) and \"topics\" (up to three strings).";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let model = args.next().unwrap_or_else(|| "gpt-4o-mini".to_string());
    let config = match args.next() {
        Some(path) => config::load(&path).with_context(|| format!("loading {}", path))?,
        None => EngineConfig::from_env().context("building config from environment")?,
    };

    let mut passage = String::new();
    if !std::io::stdin().is_terminal() {
        std::io::stdin().read_to_string(&mut passage)?;
    }
    if passage.trim().is_empty() {
        passage = SAMPLE.to_string();
    }

    let router = ModelRouter::from_config(config)?;
    let request = InvocationRequest::new(&model, SYSTEM, passage).with_structured_output();

    let result = router
        .invoke(&request)
        .await
        .with_context(|| format!("invoking {}", model))?;

    println!("{}", serde_json::to_string_pretty(&result.output)?);
    println!(
        "tokens: {} in / {} out / {} total | cost: ${:.6} | {} ms",
        result.token_usage.input,
        result.token_usage.output,
        result.token_usage.total,
        result.cost,
        result.duration_ms
    );
    if result.output.is_degraded() {
        eprintln!("note: the model did not return parseable JSON");
    }

    Ok(())
}
