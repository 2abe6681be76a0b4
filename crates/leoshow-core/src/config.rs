use std::path::PathBuf;
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

/// How the injected stylesheet processing instruction refers to the
/// transform resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StylesheetRef {
    /// `href="/leo_to_html.xsl"` — served from the site root.
    #[default]
    RootRelative,
    /// `href="http://www.leoeditor.com/leo_to_html.xsl"`.
    Absolute,
}

impl StylesheetRef {
    #[must_use]
    pub fn href(self) -> &'static str {
        match self {
            Self::RootRelative => "/leo_to_html.xsl",
            Self::Absolute => "http://www.leoeditor.com/leo_to_html.xsl",
        }
    }

    /// The canonical stylesheet processing instruction, without a line
    /// terminator.
    #[must_use]
    pub fn pi_line(self) -> String {
        format!(r#"<?xml-stylesheet type="text/xsl" href="{}"?>"#, self.href())
    }
}

/// Name allocation strategy. Both produce names under the same prefix and
/// extension; "free" is always decided by an exclusive create on the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingStrategy {
    /// Zero-padded counter probed from 0 upward.
    Sequential { width: usize, max: u32 },
    /// Fixed-length random hex token, bounded attempts, no backoff.
    RandomToken { length: usize, attempts: u32 },
}

/// One explicit configuration value, built once and passed into the
/// pipeline at construction. The size and time constants are
/// compatibility-sensitive; do not change them casually.
#[derive(Debug, Clone)]
pub struct ShowConfig {
    /// Root directory of the artifact store.
    pub store_root: PathBuf,
    /// Maximum size of a single source document.
    pub max_source_size: u64,
    /// Soft cap on the total size of the store.
    pub max_storage_size: u64,
    /// How far below `max_storage_size` a shrink pass must land.
    pub shrink_margin: u64,
    /// Age past which an artifact is eligible for deletion.
    pub ttl: Duration,
    /// Listing cap for the shrink-phase size scan.
    pub size_scan_cap: usize,
    /// Listing cap for the age sweep.
    pub age_scan_cap: usize,
    /// Maximum deletions in one shrink pass.
    pub delete_cap: usize,
    /// Required extension for remote locators, also used for artifact names.
    pub document_ext: &'static str,
    /// Artifact name prefix.
    pub name_prefix: &'static str,
    pub naming: NamingStrategy,
    pub stylesheet: StylesheetRef,
}

impl ShowConfig {
    #[must_use]
    pub fn new(store_root: PathBuf) -> Self {
        Self {
            store_root,
            max_source_size: 10 * MIB,
            max_storage_size: 500 * MIB,
            shrink_margin: 100 * MIB,
            ttl: Duration::from_secs(8 * 60 * 60),
            size_scan_cap: 500,
            age_scan_cap: 10_000,
            delete_cap: 10_000,
            document_ext: "leo",
            name_prefix: "show-leo-",
            naming: NamingStrategy::RandomToken {
                length: 16,
                attempts: 33,
            },
            stylesheet: StylesheetRef::RootRelative,
        }
    }

    /// Total-size threshold a shrink pass must bring the store down to.
    #[must_use]
    pub fn shrink_target(&self) -> u64 {
        self.max_storage_size.saturating_sub(self.shrink_margin)
    }
}
