//! Domain layer for the MIHF client.
//!
//! Core types shared by every other layer, independent of HTTP or storage
//! details: the error taxonomy, the signed-in user, and the records the
//! backend returns.
//!
//! # Organization
//!
//! - [`error`]: Error types and result aliases
//! - [`user`]: User profile and roles
//! - [`models`]: Wire records and the [`Keyed`] identity trait
//!
//! # Examples
//!
//! ```
//! use mihf::domain::{ApiError, Result};
//!
//! fn refuse() -> Result<()> {
//!     Err(ApiError::NoConnection.into())
//! }
//! assert!(refuse().is_err());
//! ```

pub mod error;
pub mod models;
pub mod user;

pub use error::{ApiError, MihfError, PasswordChangeError, Result};
pub use models::Keyed;
pub use user::{Role, User, UserDto};
