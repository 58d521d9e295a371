//! Cloneable front door to the session worker.

use tokio::sync::{mpsc, oneshot, watch};

use super::messages::{LoginOutcome, Route, SessionCommand, SessionSnapshot};
use super::worker::SessionWorker;
use crate::domain::error::{MihfError, Result};
use crate::domain::User;
use crate::storage::{CredentialStore, KeyValueCache};

fn worker_gone() -> MihfError {
    MihfError::Worker("session worker is not running".to_string())
}

/// Handle shared by every component that needs the session.
///
/// Reads are served from the latest published [`SessionSnapshot`] without a
/// round trip. Mutations are queued to the worker and awaited.
///
/// # Examples
///
/// ```no_run
/// use mihf::session::{Route, SessionHandle};
/// use mihf::storage::{MemoryCache, MemoryCredentialStore};
///
/// # async fn demo() -> mihf::Result<()> {
/// let session = SessionHandle::spawn(
///     Box::new(MemoryCredentialStore::default()),
///     Box::new(MemoryCache::default()),
/// )?;
/// let snapshot = session.bootstrap().await?;
/// assert_eq!(snapshot.route, Route::Auth);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("snapshot", &*self.snapshots.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionHandle {
    /// Starts the session worker on a dedicated thread.
    ///
    /// The worker stops once every handle and [`AuthSignal`] is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(
        credentials: Box<dyn CredentialStore>,
        cache: Box<dyn KeyValueCache>,
    ) -> Result<Self> {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (publisher, snapshots) = watch::channel(SessionSnapshot::default());
        let worker = SessionWorker::new(credentials, cache, publisher);

        std::thread::Builder::new()
            .name("mihf-session".to_string())
            .spawn(move || worker.run(receiver))?;

        Ok(Self {
            commands,
            snapshots,
        })
    }

    async fn ask<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand) -> Result<T> {
        let (reply, answer) = oneshot::channel();
        self.commands.send(build(reply)).map_err(|_| worker_gone())?;
        answer.await.map_err(|_| worker_gone())
    }

    /// Rehydrates the session from disk and decides the first route.
    ///
    /// Only the first call does any work; later calls return the current state.
    ///
    /// # Errors
    ///
    /// Fails only if the worker has stopped.
    pub async fn bootstrap(&self) -> Result<SessionSnapshot> {
        self.ask(SessionCommand::bootstrap).await
    }

    /// # Errors
    ///
    /// Fails only if the worker has stopped; store failures are reported in
    /// the returned [`LoginOutcome`].
    pub async fn login(&self, token: String, user: User) -> Result<LoginOutcome> {
        self.ask(|reply| SessionCommand::login(token, user, reply))
            .await
    }

    /// # Errors
    ///
    /// Fails only if the worker has stopped.
    pub async fn logout(&self) -> Result<()> {
        self.ask(|reply| SessionCommand::logout(Some(reply))).await
    }

    /// Replaces the cached profile with one fetched under `issued_for`.
    ///
    /// Returns `false` when nobody is signed in or the session has moved on
    /// to another token since the profile was requested.
    ///
    /// # Errors
    ///
    /// Fails only if the worker has stopped.
    pub async fn update_user(&self, issued_for: &str, user: User) -> Result<bool> {
        let issued_for = issued_for.to_string();
        self.ask(|reply| SessionCommand::update_user(issued_for, user, reply))
            .await
    }

    /// Waits until every command queued before this call has been handled,
    /// including forced logouts raised by the gateway.
    ///
    /// # Errors
    ///
    /// Fails only if the worker has stopped.
    pub async fn barrier(&self) -> Result<()> {
        self.ask(SessionCommand::barrier).await
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Current bearer token. Re-read after every await; never hold it across one.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.snapshots.borrow().token.clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.snapshots.borrow().current_user.clone()
    }

    #[must_use]
    pub fn route(&self) -> Route {
        self.snapshots.borrow().route
    }

    /// Receiver that wakes on every published change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Signal for the gateway to request a forced logout.
    #[must_use]
    pub fn auth_signal(&self) -> AuthSignal {
        AuthSignal {
            commands: self.commands.clone(),
        }
    }
}

/// Forced-logout channel handed to the API gateway.
///
/// Sending never blocks; the request lands in the same queue as login and
/// logout and is handled in order.
#[derive(Debug, Clone)]
pub struct AuthSignal {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl AuthSignal {
    /// Asks the session to sign out if `rejected_token` is still the current one.
    pub fn force_logout(&self, rejected_token: String) {
        if self
            .commands
            .send(SessionCommand::forced_logout(rejected_token))
            .is_err()
        {
            tracing::debug!("session worker gone, forced logout dropped");
        }
    }
}
