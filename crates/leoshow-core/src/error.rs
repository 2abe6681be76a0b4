use std::io;

/// Machine-readable classification of an ingestion failure. The display
/// string of the matching [`IngestError`] variant is the fixed message a
/// caller may show verbatim; the kind is what callers should match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SourceEmpty,
    SourceTooLarge,
    InvalidExtension,
    AllocationExhausted,
    WriteFailure,
    DirectoryUnreadable,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceEmpty => "source-empty",
            Self::SourceTooLarge => "source-too-large",
            Self::InvalidExtension => "invalid-extension",
            Self::AllocationExhausted => "allocation-exhausted",
            Self::WriteFailure => "write-failure",
            Self::DirectoryUnreadable => "directory-unreadable",
        }
    }

    /// Whether the failure is the caller's fault (bad or missing source)
    /// rather than a store-side problem.
    #[must_use]
    pub fn is_user_error(self) -> bool {
        matches!(
            self,
            Self::SourceEmpty | Self::SourceTooLarge | Self::InvalidExtension
        )
    }
}

/// Terminal failure of one ingestion request. None of these are retried by
/// the pipeline itself; only name allocation retries internally, within its
/// own bounded attempt budget.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("can't read this file")]
    SourceEmpty,
    #[error("file is too large")]
    SourceTooLarge { size: u64, limit: u64 },
    #[error("the file must end in .{expected}")]
    InvalidExtension { expected: &'static str },
    #[error("cannot create the temporary file on the web site")]
    AllocationExhausted,
    #[error("cannot create the temporary file on the web site")]
    WriteFailure(#[source] io::Error),
    #[error("cannot read the storage directory")]
    DirectoryUnreadable(#[source] io::Error),
}

impl IngestError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceEmpty => ErrorKind::SourceEmpty,
            Self::SourceTooLarge { .. } => ErrorKind::SourceTooLarge,
            Self::InvalidExtension { .. } => ErrorKind::InvalidExtension,
            Self::AllocationExhausted => ErrorKind::AllocationExhausted,
            Self::WriteFailure(_) => ErrorKind::WriteFailure,
            Self::DirectoryUnreadable(_) => ErrorKind::DirectoryUnreadable,
        }
    }
}
