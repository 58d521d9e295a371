//! Commands processed by the session worker.
//!
//! Every mutation of the session travels through one FIFO queue, so a forced
//! logout raised by the network layer and an explicit login can never
//! interleave. Each command remembers the tracing span it was issued from; the
//! worker enters a child of that span while handling it, so worker logs nest
//! under the operation that caused them.

use tokio::sync::oneshot;

use crate::domain::User;

/// Initial screen decided by bootstrap and moved by login/logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    /// Before bootstrap has run.
    #[default]
    Splash,
    /// Sign-in screen: no token, or the stored session was incomplete.
    Auth,
    /// Signed in with both a token and a cached profile.
    Home,
}

/// Read-only view of the session published after every change.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub route: Route,
    pub token: Option<String>,
    pub current_user: Option<User>,
}

impl SessionSnapshot {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.current_user.is_some()
    }
}

impl std::fmt::Debug for SessionSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSnapshot")
            .field("route", &self.route)
            .field("has_token", &self.token.is_some())
            .field("user_id", &self.current_user.as_ref().map(|u| u.id.as_str()))
            .finish()
    }
}

/// Result of [`login`](crate::session::SessionHandle::login).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginOutcome {
    /// `false` if the token only lives in memory and will not survive a restart.
    pub token_persisted: bool,
}

/// Macro to generate constructors for `SessionCommand` variants.
///
/// Every constructor captures the caller's current span as `origin`.
macro_rules! session_command_builders {
    (
        $(
            $builder_name:ident($variant:ident { $($field:ident: $ty:ty),* $(,)? })
        ),* $(,)?
    ) => {
        impl SessionCommand {
            $(
                #[doc = concat!("Create a ", stringify!($variant), " command bound to the current span")]
                pub(crate) fn $builder_name($($field: $ty),*) -> Self {
                    Self::$variant {
                        $($field,)*
                        origin: tracing::Span::current(),
                    }
                }
            )*
        }
    };
}

session_command_builders! {
    bootstrap(Bootstrap { reply: oneshot::Sender<SessionSnapshot> }),
    login(Login { token: String, user: User, reply: oneshot::Sender<LoginOutcome> }),
    logout(Logout { reply: Option<oneshot::Sender<()>> }),
    update_user(UpdateUser { issued_for: String, user: User, reply: oneshot::Sender<bool> }),
    forced_logout(ForcedLogout { rejected_token: String }),
    barrier(Barrier { reply: oneshot::Sender<()> }),
}

/// Messages sent from handles and the gateway to the session worker.
pub enum SessionCommand {
    /// Rehydrate token and cached user, decide the initial route. Runs once.
    Bootstrap {
        reply: oneshot::Sender<SessionSnapshot>,
        origin: tracing::Span,
    },

    /// Store a freshly issued token and profile, move to `Home`.
    Login {
        token: String,
        user: User,
        reply: oneshot::Sender<LoginOutcome>,
        origin: tracing::Span,
    },

    /// Drop token and profile, move to `Auth`. Idempotent.
    Logout {
        reply: Option<oneshot::Sender<()>>,
        origin: tracing::Span,
    },

    /// Replace the cached profile, provided `issued_for` is still the
    /// current token.
    UpdateUser {
        issued_for: String,
        user: User,
        reply: oneshot::Sender<bool>,
        origin: tracing::Span,
    },

    /// The backend rejected `rejected_token`; log out if it is still current.
    ForcedLogout {
        rejected_token: String,
        origin: tracing::Span,
    },

    /// Completes once every earlier command has been handled.
    Barrier {
        reply: oneshot::Sender<()>,
        origin: tracing::Span,
    },
}

impl std::fmt::Debug for SessionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionCommand").field(&self.kind()).finish()
    }
}

impl SessionCommand {
    pub(crate) const fn kind(&self) -> &'static str {
        match self {
            Self::Bootstrap { .. } => "bootstrap",
            Self::Login { .. } => "login",
            Self::Logout { .. } => "logout",
            Self::UpdateUser { .. } => "update_user",
            Self::ForcedLogout { .. } => "forced_logout",
            Self::Barrier { .. } => "barrier",
        }
    }

    pub(crate) const fn origin(&self) -> &tracing::Span {
        match self {
            Self::Bootstrap { origin, .. }
            | Self::Login { origin, .. }
            | Self::Logout { origin, .. }
            | Self::UpdateUser { origin, .. }
            | Self::ForcedLogout { origin, .. }
            | Self::Barrier { origin, .. } => origin,
        }
    }
}
