//! Core of the "show a Leo file in the browser" service: a bounded,
//! self-cleaning temp store plus the single-pass pipeline that fills it.
//!
//! Each ingestion request runs `GC -> fetch -> allocate -> transform ->
//! write` against a shared store directory and returns either the freshly
//! allocated artifact name or a typed [`IngestError`]. The store is the only
//! shared mutable resource; every mutation goes through the [`Store`] trait.

pub mod config;
pub mod error;
pub mod fetch;
pub mod gc;
pub mod naming;
pub mod pipeline;
pub mod store;
pub mod transform;

pub use config::{NamingStrategy, ShowConfig, StylesheetRef};
pub use error::{ErrorKind, IngestError};
pub use fetch::{Source, SourceDocument};
pub use gc::GcSummary;
pub use pipeline::IngestionPipeline;
pub use store::{EntryStat, FsStore, Store};
