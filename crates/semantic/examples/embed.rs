//! Embed one or more texts from the command line.
//!
//! ```text
//! cargo run -p embedding-semantic --example embed -- "first text" "second text"
//! MODEL_BACKEND=stub cargo run -p embedding-semantic --example embed -- offline
//! ```

use std::{env, error::Error, path::PathBuf};

use semantic::{load_embedder, Backend, ModelConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut texts: Vec<String> = env::args().skip(1).collect();
    if texts.is_empty() {
        texts.push("Hello world from the embedding service.".into());
    }

    let backend = match env::var("MODEL_BACKEND") {
        Ok(name) => name.parse::<Backend>()?,
        Err(_) => Backend::Onnx,
    };
    let cache_dir = env::var_os("MODEL_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("embedding-models"));

    let cfg = ModelConfig {
        backend,
        ..ModelConfig::with_cache_dir(cache_dir)
    };
    println!("Loading {} ({:?}) from {}", cfg.model_name, cfg.backend, cfg.cache_dir.display());

    let embedder = load_embedder(&cfg).await?;
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let vectors = embedder.embed_batch(&refs)?;

    for (text, vector) in texts.iter().zip(&vectors) {
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        println!("{text:?}");
        println!("  dim: {}, norm: {norm:.4}", vector.len());
        println!("  first values: {:?}", &vector[..vector.len().min(8)]);
    }

    Ok(())
}
