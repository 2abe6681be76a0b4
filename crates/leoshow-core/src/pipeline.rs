use std::io::Write;

use tracing::debug;

use crate::config::ShowConfig;
use crate::error::IngestError;
use crate::fetch::{self, Source};
use crate::gc::{self, GcSummary};
use crate::naming;
use crate::store::Store;
use crate::transform;

/// Single-pass ingestion: `GC -> fetch -> allocate -> transform -> write`.
///
/// Any stage failure aborts the request with a typed error; nothing is
/// compensated (an age sweep that already ran stays run, a reserved name
/// whose write failed is left for the next sweep to collect).
pub struct IngestionPipeline<S: Store> {
    store: S,
    config: ShowConfig,
}

impl<S: Store> IngestionPipeline<S> {
    #[must_use]
    pub fn new(store: S, config: ShowConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn config(&self) -> &ShowConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ingest one document and return the allocated artifact name.
    ///
    /// # Errors
    ///
    /// Any [`IngestError`]; all are terminal for this request.
    pub fn ingest(&self, source: &Source) -> Result<String, IngestError> {
        let summary = gc::collect(&self.store, &self.config)?;
        debug!(
            reclaimed = summary.reclaimed,
            reclaimed_bytes = summary.reclaimed_bytes,
            "pre-ingest sweep done"
        );

        let document = fetch::fetch(source, &self.config)?;
        let mut allocation = naming::allocate(&self.store, &self.config)?;
        let lines = transform::transform(&document.lines, self.config.stylesheet);

        for line in &lines {
            allocation
                .handle
                .write_all(line)
                .map_err(IngestError::WriteFailure)?;
        }
        allocation.handle.flush().map_err(IngestError::WriteFailure)?;

        debug!(name = %allocation.name, lines = lines.len(), "artifact written");
        Ok(allocation.name)
    }

    /// Run the two-phase sweep without ingesting anything.
    ///
    /// # Errors
    ///
    /// [`IngestError::DirectoryUnreadable`] if the store cannot be listed.
    pub fn sweep(&self) -> Result<GcSummary, IngestError> {
        gc::collect(&self.store, &self.config)
    }
}
