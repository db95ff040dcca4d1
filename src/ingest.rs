use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use crate::models::RawRow;

/// CSV files directly inside `dir`, sorted by name.
pub async fn list_csv_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to read input directory {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

pub fn parse_rows(contents: &[u8]) -> anyhow::Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(contents);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Every row of every CSV file in `dir`, files in name order.
pub async fn load_rows(dir: &Path) -> anyhow::Result<Vec<RawRow>> {
    let files = list_csv_files(dir).await?;
    if files.is_empty() {
        warn!(dir = %dir.display(), "no CSV files found");
    }

    let mut rows = Vec::new();
    for path in files {
        let contents = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let parsed =
            parse_rows(&contents).with_context(|| format!("malformed CSV in {}", path.display()))?;
        debug!(file = %path.display(), rows = parsed.len(), "loaded attempt records");
        rows.extend(parsed);
    }

    Ok(rows)
}
