//! Local persistence seams.
//!
//! The session needs exactly two things from the device: somewhere safe for
//! the bearer token and a general key-value cache for the serialized user
//! profile. Both are synchronous and owned by the session worker, so they only
//! need to be `Send`.

use crate::domain::error::Result;

/// Secure slot for a single bearer token.
///
/// # Implementations
///
/// - [`FileCredentialStore`](crate::storage::FileCredentialStore): owner-only file in the data directory
/// - [`MemoryCredentialStore`](crate::storage::MemoryCredentialStore): process-local, for tests and ephemeral runs
pub trait CredentialStore: Send {
    /// Stores `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the token could not be written.
    fn save_token(&mut self, token: &str) -> Result<()>;

    /// Returns the stored token, or `Ok(None)` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the store exists but cannot be read.
    fn read_token(&self) -> Result<Option<String>>;

    /// Removes the token. Deleting a missing token is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing token could not be removed.
    fn delete_token(&mut self) -> Result<()>;
}

/// String key-value cache for non-secret local state.
///
/// # Implementations
///
/// - [`JsonStore`](crate::storage::JsonStore): JSON file with atomic writes
/// - [`MemoryCache`](crate::storage::MemoryCache): process-local map
pub trait KeyValueCache: Send {
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// # Errors
    ///
    /// Returns an error if the value could not be persisted.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`; a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal could not be persisted.
    fn remove(&mut self, key: &str) -> Result<()>;
}
