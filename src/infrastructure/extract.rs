//! Text extraction from stored documents

use crate::domain::models::file_extension;
use crate::domain::ports::TextExtractor;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::Path;

/// Extracts text from PDF and plain-text documents
#[derive(Debug, Default, Clone, Copy)]
pub struct FileTextExtractor;

impl FileTextExtractor {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for FileTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let text = match file_extension(&name).as_deref() {
            Some("pdf") => {
                parse_blocking(&name, move || {
                    pdf_extract::extract_text_from_mem(&bytes)
                        .map_err(|e| anyhow!("Failed to extract text from PDF: {}", e))
                })
                .await?
            }
            _ => String::from_utf8_lossy(&bytes).into_owned(),
        };

        Ok(text)
    }
}

/// Run a CPU-bound parser on the blocking pool.
///
/// A panic inside the parser unwinds into the `JoinError` and comes back as
/// an ordinary error for `name`; the process keeps serving.
async fn parse_blocking<T, F>(name: &str, parse: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(parse)
        .await
        .with_context(|| format!("Parser panicked on {name}"))?
        .with_context(|| format!("Failed to parse {name}"))
}
