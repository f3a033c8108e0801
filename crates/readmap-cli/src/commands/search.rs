use anyhow::{Context, Result};
use readmap_etl::{Config, EmbeddingProvider, GeminiClient};
use readmap_search::VectorIndex;

use super::open_store;

pub async fn run_search(config: &Config, query: &str, limit: usize) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("Search query is empty");
    }

    let client = GeminiClient::from_config(config)?;
    let db = open_store(config)?;

    let index = VectorIndex::from_books(db.list_embedded_books()?);
    if index.is_empty() {
        println!("No embedded books yet; run `readmap backfill` first");
        return Ok(());
    }

    let vectors = client
        .embed(query)
        .await
        .context("Failed to embed the search query")?;
    let query_vector = vectors
        .into_iter()
        .find(|v| !v.is_empty())
        .ok_or_else(|| anyhow::anyhow!("The embedding API returned no vector for the query"))?;

    let hits = index.search(&query_vector, limit)?;
    if hits.is_empty() {
        println!("No books matched (embeddings may come from a different model)");
        return Ok(());
    }

    println!("\nTop {} matches for \"{}\":\n", hits.len(), query);
    for (rank, hit) in hits.iter().enumerate() {
        let record = &hit.book.record;
        println!("{:>3}. {} ({:.3})", rank + 1, record.title, hit.score);
        if !record.authors.is_empty() {
            println!("     by {}", record.authors.join(", "));
        }
    }

    Ok(())
}
