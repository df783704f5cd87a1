//! CLI `doctor` command: check the vector store and model setup and print a report.

use std::sync::Arc;

use anyhow::{Context, Result};
use cairn::config::CairnConfig;
use cairn::memory::types::{GLOBAL_COLLECTION, WORKSPACE_COLLECTION};
use cairn::memory::MemoryService;

/// Check connectivity, provision missing collections, and print a health report.
pub async fn doctor(config: CairnConfig) -> Result<()> {
    let cache_dir = config.resolved_cache_dir();
    let model_present = cache_dir.join("model.onnx").exists();
    let tokenizer_present = cache_dir.join("tokenizer.json").exists();
    let url = config.store.url.clone();
    let authenticated = config.store.api_key.is_some();

    let memory = MemoryService::new(Arc::new(config));

    println!("Cairn Health Report");
    println!("===================");
    println!();
    println!("Vector store:      {url}");
    println!("Credential:        {}", if authenticated { "set" } else { "(none)" });

    let before = memory
        .health()
        .await
        .context("vector store unreachable")?;
    println!("Status:            reachable ({} collections)", before.collections.len());

    memory
        .ensure_collections()
        .await
        .context("failed to provision collections")?;
    let after = memory.health().await?;

    println!();
    println!("Collections:");
    print_collection(GLOBAL_COLLECTION, before.global_present, after.global_present);
    print_collection(WORKSPACE_COLLECTION, before.workspace_present, after.workspace_present);
    println!();
    println!("Embedding model:");
    println!("  Configured:      {}", memory.config().embedding.model);
    println!("  Cache dir:       {}", cache_dir.display());
    println!("  model.onnx:      {}", if model_present { "present" } else { "MISSING" });
    println!("  tokenizer.json:  {}", if tokenizer_present { "present" } else { "MISSING" });
    if !model_present || !tokenizer_present {
        println!();
        println!("Run `cairn model download` to fetch the model.");
    }

    Ok(())
}

fn print_collection(name: &str, before: bool, after: bool) {
    let status = match (before, after) {
        (true, _) => "present",
        (false, true) => "created",
        (false, false) => "MISSING",
    };
    println!("  {name:<16} {status}");
}
