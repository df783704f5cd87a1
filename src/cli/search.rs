use std::sync::Arc;

use anyhow::Result;
use cairn::config::CairnConfig;
use cairn::memory::MemoryService;

/// Run a search from the terminal.
pub async fn search(
    config: CairnConfig,
    query: &str,
    scope: Option<&str>,
    global: bool,
    limit: Option<usize>,
) -> Result<()> {
    let memory = MemoryService::new(Arc::new(config));

    let hits = if global {
        memory.semantic_search_global(query, limit).await?
    } else {
        memory.semantic_search(query, scope, None, limit).await?
    };

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", hits.len());

    for (i, hit) in hits.iter().enumerate() {
        let text = hit.text().unwrap_or("");
        let preview = match text.char_indices().nth(120) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.to_string(),
        };
        let memory_type = hit
            .payload
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("?");

        println!(
            "  {}. [{}] {} (scope: {}, score: {:.4})",
            i + 1,
            memory_type,
            hit.id,
            hit.scope().unwrap_or("?"),
            hit.score,
        );
        println!("     {}", preview);
        println!();
    }

    Ok(())
}
