//! Calls a running embedding service.
//!
//! Start one with `cargo run -p embedding-service -- local`, then:
//! `cargo run -p embedding-service --example api_client`

use reqwest::Client;
use serde_json::{json, Value};

const SERVER_URL: &str = "http://localhost:8000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let api_key =
        std::env::var("EMBEDDING_API_KEY").unwrap_or_else(|_| "dev-key-local-only".to_string());
    let client = Client::new();

    println!("1. Health Check:");
    let resp = client.get(format!("{SERVER_URL}/health")).send().await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);
    println!();

    println!("2. Embed Single Text:");
    let resp = client
        .post(format!("{SERVER_URL}/embed"))
        .header("X-API-Key", &api_key)
        .json(&json!({ "text": "hello world" }))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    let body: Value = resp.json().await?;
    let dim = body["embedding"].as_array().map(Vec::len).unwrap_or_default();
    println!("Dimension: {dim}");
    println!();

    println!("3. Embed Batch:");
    let resp = client
        .post(format!("{SERVER_URL}/embed_batch"))
        .header("X-API-Key", &api_key)
        .json(&json!({ "texts": ["first", "second", "third"] }))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    let body: Value = resp.json().await?;
    let count = body["embeddings"].as_array().map(Vec::len).unwrap_or_default();
    println!("Vectors returned: {count}");
    println!();

    println!("4. Missing API Key:");
    let resp = client
        .post(format!("{SERVER_URL}/embed"))
        .json(&json!({ "text": "no key" }))
        .send()
        .await?;
    println!("Status: {}", resp.status());
    println!("Body: {}", resp.text().await?);

    Ok(())
}
