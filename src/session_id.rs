//! Session identifiers.
//!
//! The server keys conversation history by an opaque id the client picks. The
//! id is created lazily on the first send and then reused for as long as the
//! backing session storage lives.

use uuid::Uuid;

use crate::storage::Storage;

/// Session-storage key the identifier is kept under.
pub const SESSION_ID_KEY: &str = "chatSessionId";

/// Generate a fresh random (version 4) identifier.
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Returns true if `id` has the `xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx` shape,
/// with lowercase hex digits and `y` one of `8`, `9`, `a`, `b`.
pub fn is_valid_session_id(id: &str) -> bool {
    let bytes = id.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    for (idx, &byte) in bytes.iter().enumerate() {
        let ok = match idx {
            8 | 13 | 18 | 23 => byte == b'-',
            14 => byte == b'4',
            19 => matches!(byte, b'8' | b'9' | b'a' | b'b'),
            _ => byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte),
        };
        if !ok {
            return false;
        }
    }
    true
}

/// Create-or-reuse provider for the session identifier.
pub struct SessionIdProvider<S: Storage> {
    storage: S,
}

impl<S: Storage> SessionIdProvider<S> {
    /// Creates a provider over `storage`.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Returns the stored identifier, creating and storing one if absent.
    ///
    /// Storage failures are logged and otherwise ignored, so a broken store
    /// yields a fresh identifier on every call.
    pub fn get_session_id(&self) -> String {
        if let Some(id) = self.current() {
            return id;
        }
        let id = generate_session_id();
        if let Err(err) = self.storage.set_item(SESSION_ID_KEY, &id) {
            tracing::warn!(error = %err, "could not store session id");
        }
        id
    }

    /// Returns the stored identifier without creating one.
    pub fn current(&self) -> Option<String> {
        match self.storage.get_item(SESSION_ID_KEY) {
            Ok(Some(id)) if !id.is_empty() => Some(id),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "could not read session id");
                None
            }
        }
    }

    /// Forgets the stored identifier; the next send starts a new session.
    pub fn reset(&self) {
        if let Err(err) = self.storage.remove_item(SESSION_ID_KEY) {
            tracing::warn!(error = %err, "could not clear session id");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::{Error, Result};

    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn get_item(&self, _: &str) -> Result<Option<String>> {
            Err(Error::validation("unavailable", None))
        }

        fn set_item(&self, _: &str, _: &str) -> Result<()> {
            Err(Error::validation("unavailable", None))
        }

        fn remove_item(&self, _: &str) -> Result<()> {
            Err(Error::validation("unavailable", None))
        }
    }

    #[test]
    fn generated_ids_have_v4_shape() {
        for _ in 0..64 {
            let id = generate_session_id();
            assert!(is_valid_session_id(&id), "bad id {id}");
        }
    }

    #[test]
    fn validator_rejects_wrong_shapes() {
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("0b4f3a2e-1c2d-3e4f-8a9b-0c1d2e3f4a5b"));
        assert!(!is_valid_session_id("0b4f3a2e-1c2d-4e4f-7a9b-0c1d2e3f4a5b"));
        assert!(!is_valid_session_id("0b4f3a2e1c2d-4e4f-8a9b-0c1d2e3f4a5b-"));
        assert!(!is_valid_session_id("0B4F3A2E-1C2D-4E4F-8A9B-0C1D2E3F4A5B"));
        assert!(is_valid_session_id("0b4f3a2e-1c2d-4e4f-8a9b-0c1d2e3f4a5b"));
    }

    #[test]
    fn same_session_reuses_id() {
        let provider = SessionIdProvider::new(MemoryStorage::new());
        assert!(provider.current().is_none());
        let first = provider.get_session_id();
        let second = provider.get_session_id();
        assert_eq!(first, second);
        assert_eq!(provider.current(), Some(first));
    }

    #[test]
    fn fresh_session_gets_new_id() {
        let first = SessionIdProvider::new(MemoryStorage::new()).get_session_id();
        let second = SessionIdProvider::new(MemoryStorage::new()).get_session_id();
        assert_ne!(first, second);
        assert!(is_valid_session_id(&second));
    }

    #[test]
    fn reset_forgets_id() {
        let provider = SessionIdProvider::new(MemoryStorage::new());
        let first = provider.get_session_id();
        provider.reset();
        assert!(provider.current().is_none());
        assert_ne!(provider.get_session_id(), first);
    }

    #[test]
    fn broken_storage_regenerates_every_call() {
        let provider = SessionIdProvider::new(BrokenStorage);
        let first = provider.get_session_id();
        let second = provider.get_session_id();
        assert!(is_valid_session_id(&first));
        assert_ne!(first, second);
    }
}
