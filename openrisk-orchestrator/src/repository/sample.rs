//! Candidate List Repository
//!
//! Streams the candidate repository list (`id,platform,repo_name` with a
//! header row). The file can be large; it is read line by line and the handle
//! is released as soon as enough rows have been collected.

use openrisk_core::domain::sample::SampleRow;
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to read candidate list {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Parses one data line into a row
///
/// Lines with fewer than three non-empty fields yield `None`.
pub fn parse_row(line: &str) -> Option<SampleRow> {
    let mut fields = line.split(',').map(str::trim);
    let id = fields.next().filter(|f| !f.is_empty())?;
    let platform = fields.next().filter(|f| !f.is_empty())?;
    let repo_name = fields.next().filter(|f| !f.is_empty())?;

    Some(SampleRow {
        id: id.to_string(),
        platform: platform.to_string(),
        repo_name: repo_name.to_string(),
    })
}

/// Collects up to `limit` rows from `reader`, skipping the header line
///
/// Stops reading as soon as the limit is reached; nothing past the last
/// returned row is consumed.
pub async fn read_rows<R>(reader: R, limit: usize) -> std::io::Result<Vec<SampleRow>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut items = Vec::new();

    if limit == 0 || lines.next_line().await?.is_none() {
        return Ok(items);
    }

    while let Some(line) = lines.next_line().await? {
        if let Some(row) = parse_row(&line) {
            items.push(row);
            if items.len() >= limit {
                break;
            }
        }
    }

    Ok(items)
}

/// Reads up to `limit` rows from the list at `path`
///
/// A missing file yields no rows.
pub async fn read_sample(path: &Path, limit: usize) -> Result<Vec<SampleRow>, SampleError> {
    let io_err = |source| SampleError::Io {
        path: path.display().to_string(),
        source,
    };

    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Candidate list {} not found", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(io_err(e)),
    };

    // The file handle is dropped with the reader when this returns
    let items = read_rows(BufReader::new(file), limit).await.map_err(io_err)?;

    debug!("Read {} candidate row(s) from {}", items.len(), path.display());
    Ok(items)
}
