//! Session manager.
//!
//! Owns the bearer token, the cached user profile and the current route.
//! A single worker thread applies every change in arrival order; the rest of
//! the crate holds a [`SessionHandle`] and reads published snapshots.
//!
//! # Architecture
//!
//! ```text
//!  SessionHandle ──┐                 ┌─► CredentialStore
//!  (many clones)   ├─► command queue ─► SessionWorker ─┤
//!  AuthSignal ─────┘    (FIFO)       │    (one thread) └─► KeyValueCache
//!  (gateway)                         │
//!                                    └─► watch: SessionSnapshot ─► readers
//! ```
//!
//! - `messages`: command protocol, [`Route`], [`SessionSnapshot`]
//! - `worker`: the state owner
//! - `handle`: [`SessionHandle`] and [`AuthSignal`]

pub mod handle;
pub mod messages;
pub mod worker;

pub use handle::{AuthSignal, SessionHandle};
pub use messages::{LoginOutcome, Route, SessionSnapshot};
pub use worker::CURRENT_USER_KEY;
