use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A Custom Search API key together with the search engine id (`cx`) it is
/// allowed to query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub key: String,
    pub scope_id: String,
}

impl Credential {
    pub fn new(key: impl Into<String>, scope_id: impl Into<String>) -> Self {
        Credential {
            key: key.into(),
            scope_id: scope_id.into(),
        }
    }

    /// Parse a `"<api-key>:<search-engine-id>"` config entry.
    pub fn parse(entry: &str) -> Option<Self> {
        let parts: Vec<&str> = entry.split(':').collect();
        match parts.as_slice() {
            [key, scope_id] => Some(Credential::new(*key, *scope_id)),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Cursor {
    index: usize,
    exhausted: bool,
}

/// Ordered set of credentials with a forward-only rotation cursor.
///
/// The cursor is shared by every in-flight search, so all reads and rotations
/// go through one mutex. It never moves backward and never wraps: once the last
/// credential has been rotated away from, the pool stays exhausted.
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Arc<Credential>>,
    cursor: Mutex<Cursor>,
}

impl CredentialPool {
    /// Build a pool from an ordered list. An empty list is a configuration error.
    pub fn new(credentials: Vec<Credential>) -> Result<Self> {
        if credentials.is_empty() {
            return Err(Error::NoCredentials);
        }
        Ok(CredentialPool {
            credentials: credentials.into_iter().map(Arc::new).collect(),
            cursor: Mutex::new(Cursor {
                index: 0,
                exhausted: false,
            }),
        })
    }

    /// Build a pool from raw `key:cx` entries, skipping malformed ones.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut credentials = Vec::new();
        for entry in entries {
            match Credential::parse(entry) {
                Some(credential) => {
                    debug!("Adding API key for search engine {}", credential.scope_id);
                    credentials.push(credential);
                }
                None => warn!("Invalid google dork credential: {}", entry),
            }
        }
        CredentialPool::new(credentials)
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always false: construction rejects an empty list. Kept alongside `len`.
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// The credential the cursor currently points at. After exhaustion this is
    /// still the last credential.
    pub fn current(&self) -> Arc<Credential> {
        let cursor = self.lock();
        self.credentials[cursor.index].clone()
    }

    /// Current credential and its position, or `None` once the pool is spent.
    pub fn checkout(&self) -> Option<(usize, Arc<Credential>)> {
        let cursor = self.lock();
        if cursor.exhausted {
            return None;
        }
        Some((cursor.index, self.credentials[cursor.index].clone()))
    }

    /// Advance to the next credential. Returns `false` when there is none, and
    /// keeps returning `false` from then on.
    pub fn rotate(&self) -> bool {
        let mut cursor = self.lock();
        let index = cursor.index;
        Self::advance(&mut cursor, index, self.credentials.len())
    }

    /// Rotate away from the credential at `failed`.
    ///
    /// If another caller already moved past it, nothing is advanced and `true`
    /// is returned so the caller retries with whatever is current now.
    pub fn rotate_from(&self, failed: usize) -> bool {
        let mut cursor = self.lock();
        Self::advance(&mut cursor, failed, self.credentials.len())
    }

    pub fn is_exhausted(&self) -> bool {
        self.lock().exhausted
    }

    fn advance(cursor: &mut Cursor, failed: usize, len: usize) -> bool {
        if cursor.exhausted {
            return false;
        }
        if cursor.index != failed {
            return true;
        }
        if cursor.index + 1 < len {
            cursor.index += 1;
            true
        } else {
            cursor.exhausted = true;
            false
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cursor> {
        // Cursor updates can't panic halfway, so a poisoned value is still valid.
        self.cursor.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> CredentialPool {
        CredentialPool::new(
            (0..n)
                .map(|i| Credential::new(format!("key{i}"), format!("cx{i}")))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn parse_requires_exactly_two_parts() {
        assert_eq!(Credential::parse("abc:123"), Some(Credential::new("abc", "123")));
        assert_eq!(Credential::parse("abc"), None);
        assert_eq!(Credential::parse("a:b:c"), None);
    }

    #[test]
    fn empty_pool_is_a_config_error() {
        assert!(matches!(CredentialPool::new(vec![]), Err(Error::NoCredentials)));
    }

    #[test]
    fn from_entries_skips_malformed() {
        let pool = CredentialPool::from_entries(["bad", "k1:cx1", "x:y:z", "k2:cx2"]).unwrap();
        assert_eq!(pool.len(), 2);
        assert!(!pool.is_empty());
        assert_eq!(pool.current().key, "k1");
    }

    #[test]
    fn from_entries_with_nothing_valid_fails() {
        assert!(matches!(
            CredentialPool::from_entries(["nope", "a:b:c"]),
            Err(Error::NoCredentials)
        ));
    }

    #[test]
    fn rotation_walks_forward_then_stays_exhausted() {
        for n in 1..=5 {
            let pool = pool(n);
            for step in 1..n {
                assert!(pool.rotate());
                assert_eq!(pool.current().key, format!("key{step}"));
            }
            assert_eq!(pool.current().key, format!("key{}", n - 1));
            assert!(!pool.rotate());
            assert!(pool.is_exhausted());
            assert!(!pool.rotate());
            assert!(pool.checkout().is_none());
            assert_eq!(pool.current().key, format!("key{}", n - 1));
        }
    }

    #[test]
    fn stale_rotation_does_not_skip_a_credential() {
        let pool = pool(3);
        let (seen, _) = pool.checkout().unwrap();

        // Two searches fail on key0 at the same time.
        assert!(pool.rotate_from(seen));
        assert!(pool.rotate_from(seen));

        let (index, credential) = pool.checkout().unwrap();
        assert_eq!(index, 1);
        assert_eq!(credential.key, "key1");
    }

    #[test]
    fn concurrent_rotation_ends_on_last_credential() {
        let pool = Arc::new(pool(4));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    while let Some((index, _)) = pool.checkout() {
                        if !pool.rotate_from(index) {
                            break;
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pool.is_exhausted());
        assert_eq!(pool.current().key, "key3");
    }
}
