use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{ModelConfig, SemanticError};

/// Repository-relative location of the ONNX export.
const MODEL_FILE: &str = "onnx/model.onnx";
/// Repository-relative location of the tokenizer definition.
const TOKENIZER_FILE: &str = "tokenizer.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ModelAssets {
    pub(crate) model_path: PathBuf,
    pub(crate) tokenizer_path: PathBuf,
}

impl ModelAssets {
    pub(crate) fn locate(cfg: &ModelConfig) -> Self {
        let dir = cfg.model_dir();
        Self {
            model_path: dir.join(MODEL_FILE),
            tokenizer_path: dir.join(TOKENIZER_FILE),
        }
    }
}

/// Ensures the model and tokenizer exist under the cache directory, downloading
/// whatever is missing from the configured hub.
pub(crate) async fn resolve_model_assets(cfg: &ModelConfig) -> Result<ModelAssets, SemanticError> {
    fs::create_dir_all(&cfg.cache_dir)?;

    let assets = ModelAssets::locate(cfg);
    ensure_local_file(&assets.model_path, &remote_url(cfg, MODEL_FILE)).await?;
    ensure_local_file(&assets.tokenizer_path, &remote_url(cfg, TOKENIZER_FILE)).await?;
    Ok(assets)
}

fn remote_url(cfg: &ModelConfig, file: &str) -> String {
    format!(
        "{}/{}/resolve/main/{}",
        cfg.hub_url.trim_end_matches('/'),
        cfg.model_name,
        file
    )
}

/// Returns early if `target` already exists, otherwise downloads `url` into it.
async fn ensure_local_file(target: &Path, url: &str) -> Result<(), SemanticError> {
    if target.exists() {
        tracing::debug!(path = %target.display(), "model asset cached");
        return Ok(());
    }

    tracing::info!(url, path = %target.display(), "downloading model asset");
    download_to_path(target, url).await
}

/// Downloads `url` into `target`, creating parent directories as needed.
/// Bytes land in a sibling `.part` file first so an interrupted download is
/// never mistaken for a cached asset.
async fn download_to_path(target: &Path, url: &str) -> Result<(), SemanticError> {
    if let Some(parent) = target.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let response = reqwest::get(url)
        .await
        .map_err(|e| SemanticError::Download(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SemanticError::Download(format!(
            "unexpected status {} while fetching {}",
            status, url
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SemanticError::Download(e.to_string()))?;

    let partial = partial_path(target);
    fs::write(&partial, &bytes)?;
    fs::rename(&partial, target)?;
    Ok(())
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_places_files_under_model_dir() {
        let cfg = ModelConfig::with_cache_dir("/cache");
        let assets = ModelAssets::locate(&cfg);
        assert_eq!(
            assets.model_path,
            PathBuf::from("/cache/all-MiniLM-L6-v2/onnx/model.onnx")
        );
        assert_eq!(
            assets.tokenizer_path,
            PathBuf::from("/cache/all-MiniLM-L6-v2/tokenizer.json")
        );
    }

    #[test]
    fn remote_url_tolerates_trailing_slash() {
        let cfg = ModelConfig {
            hub_url: "https://example.com/org/".into(),
            ..Default::default()
        };
        assert_eq!(
            remote_url(&cfg, TOKENIZER_FILE),
            "https://example.com/org/all-MiniLM-L6-v2/resolve/main/tokenizer.json"
        );
    }

    #[test]
    fn partial_path_is_sibling() {
        let p = partial_path(Path::new("/cache/m/onnx/model.onnx"));
        assert_eq!(p, PathBuf::from("/cache/m/onnx/model.onnx.part"));
    }

    #[tokio::test]
    async fn cached_assets_skip_download() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ModelConfig {
            cache_dir: dir.path().join("nested"),
            // unroutable; any download attempt would fail
            hub_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        };
        let expected = ModelAssets::locate(&cfg);
        fs::create_dir_all(expected.model_path.parent().unwrap()).unwrap();
        fs::write(&expected.model_path, b"onnx").unwrap();
        fs::write(&expected.tokenizer_path, b"{}").unwrap();

        let resolved = resolve_model_assets(&cfg).await.unwrap();
        assert_eq!(resolved, expected);
    }

    #[tokio::test]
    async fn missing_assets_fail_with_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ModelConfig {
            cache_dir: dir.path().to_path_buf(),
            hub_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        };

        let err = resolve_model_assets(&cfg).await.unwrap_err();
        assert!(matches!(err, SemanticError::Download(_)), "{err}");
        assert!(!ModelAssets::locate(&cfg).model_path.exists());
    }
}
