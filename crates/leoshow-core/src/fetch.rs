use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_LENGTH;
use tracing::{debug, warn};
use url::Url;

use crate::config::ShowConfig;
use crate::error::IngestError;

const USER_AGENT: &str = concat!("leoshow/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Where the source document comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// An already-staged local upload. The stage path is synthetic, so no
    /// extension check applies.
    Staged(PathBuf),
    /// A remote locator; must end in the configured document extension.
    Remote(String),
}

/// Validated source content, split into lines with their terminators
/// preserved. Lines are raw bytes: the source encoding is not interpreted,
/// so rejoining the lines reproduces the source exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub lines: Vec<Vec<u8>>,
    pub size: u64,
}

impl SourceDocument {
    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            lines: bytes
                .split_inclusive(|&byte| byte == b'\n')
                .map(<[u8]>::to_vec)
                .collect(),
            size: bytes.len() as u64,
        }
    }
}

/// Resolve and validate the source, enforcing the single-document size cap
/// and, for remote locators, the required extension.
///
/// # Errors
///
/// `SourceEmpty` for unreadable or empty content, `SourceTooLarge` when the
/// size cap is exceeded or a remote size cannot be established,
/// `InvalidExtension` for a remote locator not ending in the document
/// extension (checked before any network I/O).
pub fn fetch(source: &Source, config: &ShowConfig) -> Result<SourceDocument, IngestError> {
    match source {
        Source::Staged(path) => fetch_staged(path, config),
        Source::Remote(locator) => fetch_remote(locator, config),
    }
}

fn fetch_staged(path: &Path, config: &ShowConfig) -> Result<SourceDocument, IngestError> {
    let meta = fs::metadata(path).map_err(|err| {
        warn!(path = %path.display(), %err, "cannot stat staged upload");
        IngestError::SourceEmpty
    })?;
    if meta.len() == 0 {
        return Err(IngestError::SourceEmpty);
    }
    if meta.len() > config.max_source_size {
        return Err(IngestError::SourceTooLarge {
            size: meta.len(),
            limit: config.max_source_size,
        });
    }
    let bytes = fs::read(path).map_err(|err| {
        warn!(path = %path.display(), %err, "cannot read staged upload");
        IngestError::SourceEmpty
    })?;
    if bytes.is_empty() {
        return Err(IngestError::SourceEmpty);
    }
    debug!(path = %path.display(), size = bytes.len(), "staged upload read");
    Ok(SourceDocument::from_bytes(&bytes))
}

fn fetch_remote(locator: &str, config: &ShowConfig) -> Result<SourceDocument, IngestError> {
    // The extension gate runs before anything touches the network.
    let url = Url::parse(locator).map_err(|_| IngestError::InvalidExtension {
        expected: config.document_ext,
    })?;
    let extension = Path::new(url.path())
        .extension()
        .and_then(|ext| ext.to_str());
    if extension != Some(config.document_ext) {
        return Err(IngestError::InvalidExtension {
            expected: config.document_ext,
        });
    }

    let client = http_client()?;
    let size = probe_remote_size(&client, &url).unwrap_or(0);
    if size == 0 || size > config.max_source_size {
        return Err(IngestError::SourceTooLarge {
            size,
            limit: config.max_source_size,
        });
    }

    let response = client
        .get(url.clone())
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|err| {
            warn!(%url, %err, "remote fetch failed");
            IngestError::SourceEmpty
        })?;

    let mut bytes = Vec::new();
    response
        .take(config.max_source_size + 1)
        .read_to_end(&mut bytes)
        .map_err(|err| {
            warn!(%url, %err, "remote read failed");
            IngestError::SourceEmpty
        })?;
    if bytes.is_empty() {
        return Err(IngestError::SourceEmpty);
    }
    if bytes.len() as u64 > config.max_source_size {
        // The metadata probe lied; refuse the stream rather than trust it.
        return Err(IngestError::SourceTooLarge {
            size: bytes.len() as u64,
            limit: config.max_source_size,
        });
    }
    debug!(%url, size = bytes.len(), "remote document fetched");
    Ok(SourceDocument::from_bytes(&bytes))
}

/// Resolve the remote size from a `HEAD` probe. A failed probe or a missing
/// or unparseable length header reads as zero, which the caller rejects as
/// non-positive.
fn probe_remote_size(client: &Client, url: &Url) -> Option<u64> {
    let response = client
        .head(url.clone())
        .send()
        .map_err(|err| warn!(%url, %err, "metadata probe failed"))
        .ok()?;
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn http_client() -> Result<Client, IngestError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|err| {
            warn!(%err, "failed to build http client");
            IngestError::SourceEmpty
        })
}
