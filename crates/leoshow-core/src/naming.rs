use rand::Rng;
use tracing::debug;

use crate::config::{NamingStrategy, ShowConfig};
use crate::error::IngestError;
use crate::store::Store;

const HEX: &[u8] = b"0123456789abcdef";

/// A freshly reserved artifact name together with the exclusively created
/// handle backing it. Holding the handle is what makes the reservation
/// stick; there is no separate existence check to race against.
#[derive(Debug)]
pub struct Allocation<H> {
    pub name: String,
    pub handle: H,
}

/// Reserve a currently-unused artifact name.
///
/// Collisions (the exclusive create losing to a concurrent writer) are
/// retried immediately within the strategy's own bounded budget; there is
/// no backoff.
///
/// # Errors
///
/// [`IngestError::AllocationExhausted`] when every candidate in the budget
/// is taken, [`IngestError::WriteFailure`] when the store cannot open a
/// fresh name for exclusive writing.
pub fn allocate<S: Store>(
    store: &S,
    config: &ShowConfig,
) -> Result<Allocation<S::Handle>, IngestError> {
    match config.naming {
        NamingStrategy::Sequential { width, max } => {
            for counter in 0..max {
                let name = format!(
                    "{}{counter:0width$}.{}",
                    config.name_prefix, config.document_ext
                );
                if let Some(allocation) = reserve(store, name)? {
                    return Ok(allocation);
                }
            }
            Err(IngestError::AllocationExhausted)
        }
        NamingStrategy::RandomToken { length, attempts } => {
            let mut rng = rand::thread_rng();
            for _ in 0..attempts {
                let token: String = (0..length)
                    .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
                    .collect();
                let name = format!("{}{token}.{}", config.name_prefix, config.document_ext);
                if let Some(allocation) = reserve(store, name)? {
                    return Ok(allocation);
                }
            }
            Err(IngestError::AllocationExhausted)
        }
    }
}

fn reserve<S: Store>(
    store: &S,
    name: String,
) -> Result<Option<Allocation<S::Handle>>, IngestError> {
    match store.try_create(&name) {
        Ok(Some(handle)) => {
            debug!(%name, "artifact name allocated");
            Ok(Some(Allocation { name, handle }))
        }
        Ok(None) => Ok(None),
        Err(err) => Err(IngestError::WriteFailure(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::testing::MemStore;
    use crate::store::EntryStat;
    use std::io;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn sequential_config() -> ShowConfig {
        let mut config = ShowConfig::new(PathBuf::from("unused"));
        config.naming = NamingStrategy::Sequential {
            width: 4,
            max: 1000,
        };
        config
    }

    #[test]
    fn sequential_probe_starts_at_zero() {
        let store = MemStore::new();
        let allocation = allocate(&store, &sequential_config()).unwrap();
        assert_eq!(allocation.name, "show-leo-0000.leo");
    }

    #[test]
    fn sequential_probe_skips_taken_names() {
        let store = MemStore::new();
        store.seed("show-leo-0000.leo", 1, SystemTime::now());
        let allocation = allocate(&store, &sequential_config()).unwrap();
        assert_eq!(allocation.name, "show-leo-0001.leo");
    }

    #[test]
    fn sequential_probe_exhausts_after_the_counter_space() {
        let store = MemStore::new();
        let mut config = sequential_config();
        config.naming = NamingStrategy::Sequential { width: 4, max: 3 };
        for n in 0..3 {
            store.seed(&format!("show-leo-000{n}.leo"), 1, SystemTime::now());
        }
        let err = allocate(&store, &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AllocationExhausted);
    }

    #[test]
    fn random_tokens_are_sixteen_hex_chars() {
        let store = MemStore::new();
        let config = ShowConfig::new(PathBuf::from("unused"));
        let allocation = allocate(&store, &config).unwrap();

        let token = allocation
            .name
            .strip_prefix("show-leo-")
            .and_then(|rest| rest.strip_suffix(".leo"))
            .expect("name follows the show-leo pattern");
        assert_eq!(token.len(), 16);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    /// Store whose every exclusive create loses, as if all tokens collide.
    struct SaturatedStore;

    impl Store for SaturatedStore {
        type Handle = Vec<u8>;

        fn stat(&self, _name: &str) -> io::Result<EntryStat> {
            Ok(EntryStat {
                size: 1,
                mtime: SystemTime::now(),
            })
        }

        fn try_create(&self, _name: &str) -> io::Result<Option<Vec<u8>>> {
            Ok(None)
        }

        fn delete(&self, _name: &str) -> io::Result<()> {
            Ok(())
        }

        fn entries(&self, _cap: usize) -> io::Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn random_allocation_gives_up_after_the_attempt_budget() {
        let config = ShowConfig::new(PathBuf::from("unused"));
        let err = allocate(&SaturatedStore, &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AllocationExhausted);
    }
}
