//! Session worker: the single owner of authentication state.
//!
//! Runs on its own thread (store I/O is blocking) and drains the command
//! queue in order. Every change is published through a `watch` channel;
//! readers only ever see whole snapshots.

use tokio::sync::{mpsc, watch};

use super::messages::{LoginOutcome, Route, SessionCommand, SessionSnapshot};
use crate::domain::error::Result;
use crate::domain::User;
use crate::storage::{CredentialStore, KeyValueCache};

/// Cache key of the serialized signed-in user.
pub const CURRENT_USER_KEY: &str = "current_user";

pub struct SessionWorker {
    state: SessionSnapshot,
    credentials: Box<dyn CredentialStore>,
    cache: Box<dyn KeyValueCache>,
    bootstrapped: bool,
    publisher: watch::Sender<SessionSnapshot>,
}

impl SessionWorker {
    pub(crate) fn new(
        credentials: Box<dyn CredentialStore>,
        cache: Box<dyn KeyValueCache>,
        publisher: watch::Sender<SessionSnapshot>,
    ) -> Self {
        Self {
            state: SessionSnapshot::default(),
            credentials,
            cache,
            bootstrapped: false,
            publisher,
        }
    }

    /// Processes commands until every sender is dropped.
    pub(crate) fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        tracing::debug!("session worker started");
        while let Some(command) = commands.blocking_recv() {
            self.handle_command(command);
        }
        tracing::debug!("session worker stopped");
    }

    /// Logs a failed best-effort store operation and reports whether it worked.
    fn best_effort(operation: &str, result: Result<()>) -> bool {
        match result {
            Ok(()) => {
                tracing::debug!(operation = operation, "store operation successful");
                true
            }
            Err(e) => {
                tracing::warn!(operation = operation, error = %e, "store operation failed");
                false
            }
        }
    }

    fn publish(&self) {
        let next = self.state.clone();
        self.publisher.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn read_token(&self) -> Option<String> {
        match self.credentials.read_token() {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "token could not be read, treating as absent");
                None
            }
        }
    }

    fn read_cached_user(&self) -> Option<User> {
        let raw = match self.cache.get(CURRENT_USER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "cached user could not be read");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| tracing::warn!(error = %e, "cached user is corrupt, ignoring"))
            .ok()
    }

    fn write_cached_user(&mut self, user: &User) -> bool {
        let result = serde_json::to_string(user)
            .map_err(Into::into)
            .and_then(|json| self.cache.set(CURRENT_USER_KEY, &json));
        Self::best_effort("cache user", result)
    }

    fn handle_bootstrap(&mut self) -> SessionSnapshot {
        if self.bootstrapped {
            tracing::debug!("already bootstrapped");
            return self.state.clone();
        }
        self.bootstrapped = true;

        let token = self.read_token();
        let user = self.read_cached_user();

        self.state = match (token, user) {
            (Some(token), Some(user)) => SessionSnapshot {
                route: Route::Home,
                token: Some(token),
                current_user: Some(user),
            },
            (token, user) => {
                tracing::debug!(
                    has_token = token.is_some(),
                    has_user = user.is_some(),
                    "incomplete session on disk"
                );
                SessionSnapshot {
                    route: Route::Auth,
                    token: None,
                    current_user: None,
                }
            }
        };

        tracing::debug!(route = ?self.state.route, "bootstrap complete");
        self.publish();
        self.state.clone()
    }

    fn handle_login(&mut self, token: String, user: User) -> LoginOutcome {
        let token_persisted = Self::best_effort("save token", self.credentials.save_token(&token));
        if !token_persisted {
            tracing::warn!("token kept in memory only; the session will not survive a restart");
        }

        self.write_cached_user(&user);
        tracing::debug!(user_id = %user.id, "signed in");

        self.bootstrapped = true;
        self.state = SessionSnapshot {
            route: Route::Home,
            token: Some(token),
            current_user: Some(user),
        };
        self.publish();

        LoginOutcome { token_persisted }
    }

    fn handle_logout(&mut self) {
        Self::best_effort("delete token", self.credentials.delete_token());
        Self::best_effort("remove cached user", self.cache.remove(CURRENT_USER_KEY));

        self.state = SessionSnapshot {
            route: Route::Auth,
            token: None,
            current_user: None,
        };
        self.publish();
    }

    fn handle_update_user(&mut self, issued_for: &str, user: User) -> bool {
        match self.state.token.as_deref() {
            None => {
                tracing::debug!("profile update ignored, not signed in");
                return false;
            }
            Some(current) if current != issued_for => {
                tracing::debug!("profile update ignored, issued for a previous session");
                return false;
            }
            Some(_) => {}
        }
        self.write_cached_user(&user);
        self.state.current_user = Some(user);
        self.publish();
        true
    }

    fn handle_forced_logout(&mut self, rejected_token: &str) {
        if self.state.token.as_deref() == Some(rejected_token) {
            tracing::info!("backend rejected the session token, signing out");
            self.handle_logout();
        } else {
            tracing::debug!("stale rejection for a token that is no longer current");
        }
    }

    /// Handles one command and answers its reply channel.
    pub(crate) fn handle_command(&mut self, command: SessionCommand) {
        let span = tracing::debug_span!(
            parent: command.origin(),
            "session_command",
            kind = command.kind()
        );
        let _guard = span.enter();

        match command {
            SessionCommand::Bootstrap { reply, .. } => {
                let _ = reply.send(self.handle_bootstrap());
            }
            SessionCommand::Login {
                token, user, reply, ..
            } => {
                let _ = reply.send(self.handle_login(token, user));
            }
            SessionCommand::Logout { reply, .. } => {
                self.handle_logout();
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
            SessionCommand::UpdateUser {
                issued_for,
                user,
                reply,
                ..
            } => {
                let _ = reply.send(self.handle_update_user(&issued_for, user));
            }
            SessionCommand::ForcedLogout { rejected_token, .. } => {
                self.handle_forced_logout(&rejected_token);
            }
            SessionCommand::Barrier { reply, .. } => {
                let _ = reply.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MihfError;
    use crate::storage::{MemoryCache, MemoryCredentialStore};
    use rstest::rstest;
    use tokio::sync::oneshot;

    struct BrokenCredentials;

    impl CredentialStore for BrokenCredentials {
        fn save_token(&mut self, _token: &str) -> Result<()> {
            Err(MihfError::Storage("keychain locked".into()))
        }

        fn read_token(&self) -> Result<Option<String>> {
            Err(MihfError::Storage("keychain locked".into()))
        }

        fn delete_token(&mut self) -> Result<()> {
            Err(MihfError::Storage("keychain locked".into()))
        }
    }

    fn user() -> User {
        User {
            id: "1".into(),
            first_name: "Ivan".into(),
            last_name: "Petrov".into(),
            middle_name: None,
            date_of_birth: None,
            email: None,
            phone: "79101234567".into(),
            roles: vec![],
        }
    }

    fn worker(
        credentials: Box<dyn CredentialStore>,
        cache: Box<dyn KeyValueCache>,
    ) -> (SessionWorker, watch::Receiver<SessionSnapshot>) {
        let (tx, rx) = watch::channel(SessionSnapshot::default());
        (SessionWorker::new(credentials, cache, tx), rx)
    }

    fn bootstrap(worker: &mut SessionWorker) -> SessionSnapshot {
        let (reply, mut rx) = oneshot::channel();
        worker.handle_command(SessionCommand::bootstrap(reply));
        rx.try_recv().expect("bootstrap replies synchronously")
    }

    fn login(worker: &mut SessionWorker, token: &str) -> LoginOutcome {
        let (reply, mut rx) = oneshot::channel();
        worker.handle_command(SessionCommand::login(token.into(), user(), reply));
        rx.try_recv().expect("login replies synchronously")
    }

    #[derive(Clone, Copy, Debug)]
    enum Cached {
        Valid,
        Absent,
        Corrupt,
    }

    #[rstest]
    fn bootstrap_route_matrix(
        #[values(true, false)] token_present: bool,
        #[values(Cached::Valid, Cached::Absent, Cached::Corrupt)] cached: Cached,
    ) {
        let credentials = if token_present {
            MemoryCredentialStore::with_token("abc")
        } else {
            MemoryCredentialStore::default()
        };
        let mut cache = MemoryCache::default();
        match cached {
            Cached::Valid => cache
                .set(CURRENT_USER_KEY, &serde_json::to_string(&user()).expect("json"))
                .expect("set"),
            Cached::Corrupt => cache.set(CURRENT_USER_KEY, "{\"id\":").expect("set"),
            Cached::Absent => {}
        }

        let (mut worker, _rx) = worker(Box::new(credentials), Box::new(cache));
        let snapshot = bootstrap(&mut worker);

        let expect_home = token_present && matches!(cached, Cached::Valid);
        assert_eq!(snapshot.route == Route::Home, expect_home, "{token_present} {cached:?}");
        if !expect_home {
            assert_eq!(snapshot.route, Route::Auth);
            assert!(snapshot.token.is_none());
        }
    }

    #[test]
    fn bootstrap_survives_unreadable_credentials() {
        let (mut worker, _rx) = worker(Box::new(BrokenCredentials), Box::new(MemoryCache::default()));
        assert_eq!(bootstrap(&mut worker).route, Route::Auth);
    }

    #[test]
    fn bootstrap_runs_once() {
        let creds = MemoryCredentialStore::with_token("abc");
        let cache = MemoryCache::default();
        let (mut worker, _rx) = worker(Box::new(creds.clone()), Box::new(cache));
        assert_eq!(bootstrap(&mut worker).route, Route::Auth);

        // A token appearing later must not flip the already decided route.
        let mut writer = creds;
        writer.save_token("zzz").expect("save");
        assert_eq!(bootstrap(&mut worker).route, Route::Auth);
    }

    #[test]
    fn login_persists_and_publishes() {
        let creds = MemoryCredentialStore::default();
        let cache = MemoryCache::default();
        let (mut worker, rx) = worker(Box::new(creds.clone()), Box::new(cache.clone()));

        let outcome = login(&mut worker, "abc");

        assert!(outcome.token_persisted);
        assert_eq!(creds.read_token().expect("read").as_deref(), Some("abc"));
        assert!(cache.get(CURRENT_USER_KEY).expect("get").is_some());
        let published = rx.borrow().clone();
        assert_eq!(published.route, Route::Home);
        assert_eq!(published.current_user.map(|u| u.id), Some("1".into()));
    }

    #[test]
    fn login_proceeds_when_token_cannot_be_stored() {
        let (mut worker, rx) = worker(Box::new(BrokenCredentials), Box::new(MemoryCache::default()));
        let outcome = login(&mut worker, "abc");
        assert!(!outcome.token_persisted);
        assert_eq!(rx.borrow().route, Route::Home);
    }

    #[test]
    fn logout_twice_is_quiet() {
        let creds = MemoryCredentialStore::default();
        let cache = MemoryCache::default();
        let (mut worker, rx) = worker(Box::new(creds.clone()), Box::new(cache.clone()));
        login(&mut worker, "abc");

        worker.handle_command(SessionCommand::logout(None));
        let once = rx.borrow().clone();
        worker.handle_command(SessionCommand::logout(None));
        let twice = rx.borrow().clone();

        assert_eq!(once, twice);
        assert_eq!(twice.route, Route::Auth);
        assert!(twice.token.is_none() && twice.current_user.is_none());
        assert_eq!(creds.read_token().expect("read"), None);
        assert_eq!(cache.get(CURRENT_USER_KEY).expect("get"), None);
    }

    #[test]
    fn stale_rejection_does_not_end_new_session() {
        let (mut worker, rx) = worker(
            Box::new(MemoryCredentialStore::default()),
            Box::new(MemoryCache::default()),
        );
        login(&mut worker, "new-token");

        worker.handle_command(SessionCommand::forced_logout("old-token".into()));
        assert_eq!(rx.borrow().route, Route::Home);

        worker.handle_command(SessionCommand::forced_logout("new-token".into()));
        assert_eq!(rx.borrow().route, Route::Auth);
    }

    #[test]
    fn profile_update_requires_session() {
        let cache = MemoryCache::default();
        let (mut worker, rx) = worker(Box::new(MemoryCredentialStore::default()), Box::new(cache.clone()));

        let (reply, mut answer) = oneshot::channel();
        worker.handle_command(SessionCommand::update_user("abc".into(), user(), reply));
        assert!(!answer.try_recv().expect("reply"));

        login(&mut worker, "abc");
        let mut changed = user();
        changed.email = Some("ivan@example.org".into());
        let (reply, mut answer) = oneshot::channel();
        worker.handle_command(SessionCommand::update_user("abc".into(), changed, reply));
        assert!(answer.try_recv().expect("reply"));

        let email = rx.borrow().current_user.as_ref().and_then(|u| u.email.clone());
        assert_eq!(email.as_deref(), Some("ivan@example.org"));
        let cached = cache.get(CURRENT_USER_KEY).expect("get").expect("cached");
        assert!(cached.contains("ivan@example.org"));
    }

    #[test]
    fn profile_from_previous_session_is_dropped() {
        let cache = MemoryCache::default();
        let (mut worker, rx) = worker(Box::new(MemoryCredentialStore::default()), Box::new(cache.clone()));
        login(&mut worker, "a");
        worker.handle_command(SessionCommand::logout(None));
        login(&mut worker, "b");

        let mut stale = user();
        stale.id = "stale".into();
        let (reply, mut answer) = oneshot::channel();
        worker.handle_command(SessionCommand::update_user("a".into(), stale, reply));

        assert!(!answer.try_recv().expect("reply"));
        assert_eq!(rx.borrow().current_user.as_ref().map(|u| u.id.as_str()), Some("1"));
        let cached = cache.get(CURRENT_USER_KEY).expect("get").expect("cached");
        assert!(!cached.contains("stale"));
    }
}
