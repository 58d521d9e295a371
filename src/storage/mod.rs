//! Storage layer for the session token and cached profile.
//!
//! # Modules
//!
//! - `backend`: the [`CredentialStore`] and [`KeyValueCache`] seams
//! - `json`: JSON file cache with atomic writes
//! - `credentials`: file and in-memory token stores, in-memory cache

pub mod backend;
pub mod credentials;
pub mod json;

pub use backend::{CredentialStore, KeyValueCache};
pub use credentials::{FileCredentialStore, MemoryCache, MemoryCredentialStore};
pub use json::JsonStore;
