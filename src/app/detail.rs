//! Single-record screens.
//!
//! A [`DetailLoader`] fetches one record on demand and keeps the last value,
//! a loading flag and a displayable error. The [`DetailSource`] decides the
//! endpoint and whether a failed refresh hides the previous value.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::Instrument;

use crate::api::MihfApi;
use crate::domain::models::{
    ClubDetail, GameDetail, GameEvent, GameLineups, PlayerDetail, RefereeRow, RosterPlayer,
    Season, TeamDetail, TournamentDetail,
};
use crate::domain::ApiError;
use crate::session::SessionHandle;

/// Shown when a detail screen is opened without a signed-in session.
pub const SESSION_EXPIRED: &str = "Session expired";

/// Position heading for roster players without one.
pub const NO_POSITION: &str = "—";

/// Event types the timeline does not show.
pub const HIDDEN_EVENT_TYPES: [i32; 5] = [1, 3, 5, 6, 7];

/// Endpoint behind one detail screen.
#[async_trait]
pub trait DetailSource: Send + Sync + 'static {
    type Value: Clone + Send + Sync + 'static;

    /// Short label used in log fields.
    fn name(&self) -> &'static str;

    /// Requests the record with `token`.
    ///
    /// # Errors
    ///
    /// Returns the gateway classification of a failed request.
    async fn fetch(&self, token: &str) -> Result<Self::Value, ApiError>;

    /// Whether a failed load leaves the previously loaded value visible.
    fn keep_stale_on_error(&self) -> bool {
        true
    }

    /// Message shown for a failed load.
    fn failure_message(&self, error: &ApiError) -> String {
        error.to_string()
    }
}

/// What a detail screen renders.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailState<V> {
    /// Last successfully loaded record.
    pub value: Option<V>,
    pub is_loading: bool,
    /// Message of the last failed load, cleared by the next success.
    pub error: Option<String>,
}

impl<V> Default for DetailState<V> {
    fn default() -> Self {
        Self {
            value: None,
            is_loading: false,
            error: None,
        }
    }
}

/// Clears `is_loading` if a load future is dropped before it completes.
struct Loading<'a, S: DetailSource> {
    loader: &'a DetailLoader<S>,
    armed: bool,
}

impl<S: DetailSource> Drop for Loading<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(detail = self.loader.source.name(), "load abandoned");
            self.loader.lock().is_loading = false;
        }
    }
}

/// Controller of a single-record screen.
pub struct DetailLoader<S: DetailSource> {
    source: S,
    session: SessionHandle,
    state: Mutex<DetailState<S::Value>>,
}

impl<S: DetailSource> std::fmt::Debug for DetailLoader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("DetailLoader")
            .field("source", &self.source.name())
            .field("loaded", &state.value.is_some())
            .field("is_loading", &state.is_loading)
            .field("error", &state.error)
            .finish()
    }
}

impl<S: DetailSource> DetailLoader<S> {
    #[must_use]
    pub fn new(source: S, session: SessionHandle) -> Self {
        Self {
            source,
            session,
            state: Mutex::new(DetailState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DetailState<S::Value>> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Fetches the record. Returns `false` if a load was already running.
    ///
    /// A result that arrives after the session token changed is discarded.
    pub async fn load(&self) -> bool {
        let token = {
            let mut state = self.lock();
            if state.is_loading {
                return false;
            }
            let Some(token) = self.session.token() else {
                state.error = Some(SESSION_EXPIRED.to_string());
                return false;
            };
            state.is_loading = true;
            token
        };

        let mut loading = Loading {
            loader: self,
            armed: true,
        };
        let span = tracing::debug_span!("detail_load", detail = self.source.name());
        let result = self.source.fetch(&token).instrument(span).await;
        loading.armed = false;

        let mut state = self.lock();
        state.is_loading = false;
        if self.session.token().as_deref() != Some(token.as_str()) {
            tracing::debug!(
                detail = self.source.name(),
                "session changed during load, discarding result"
            );
            return true;
        }
        match result {
            Ok(value) => {
                state.value = Some(value);
                state.error = None;
            }
            Err(e) => {
                tracing::debug!(detail = self.source.name(), error = %e, "load failed");
                if !self.source.keep_stale_on_error() {
                    state.value = None;
                }
                state.error = Some(self.source.failure_message(&e));
            }
        }
        true
    }

    #[must_use]
    pub fn state(&self) -> DetailState<S::Value> {
        self.lock().clone()
    }

    #[must_use]
    pub fn value(&self) -> Option<S::Value> {
        self.lock().value.clone()
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().is_loading
    }
}

macro_rules! detail_source {
    ($(#[$doc:meta])* $source:ident, $name:literal, $value:ty, $endpoint:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $source {
            api: MihfApi,
            id: i64,
        }

        impl $source {
            #[must_use]
            pub const fn new(api: MihfApi, id: i64) -> Self {
                Self { api, id }
            }
        }

        #[async_trait]
        impl DetailSource for $source {
            type Value = $value;

            fn name(&self) -> &'static str {
                $name
            }

            async fn fetch(&self, token: &str) -> Result<$value, ApiError> {
                self.api.$endpoint(token, self.id).await
            }
        }
    };
}

detail_source!(ClubSource, "club", ClubDetail, club);
detail_source!(
    /// Game card with score, events and embedded lineups.
    GameSource, "game", GameDetail, game
);
detail_source!(GameLineupsSource, "game_lineups", GameLineups, game_lineups);
detail_source!(
    /// Player card including per-team statistics.
    PlayerSource, "player", PlayerDetail, player
);
detail_source!(
    /// Officials assigned to one game.
    GameRefereesSource, "game_referees", Vec<RefereeRow>, game_referees
);

#[derive(Debug, Clone)]
pub struct TeamSource {
    api: MihfApi,
    id: i64,
}

impl TeamSource {
    #[must_use]
    pub const fn new(api: MihfApi, id: i64) -> Self {
        Self { api, id }
    }
}

#[async_trait]
impl DetailSource for TeamSource {
    type Value = TeamDetail;

    fn name(&self) -> &'static str {
        "team"
    }

    async fn fetch(&self, token: &str) -> Result<TeamDetail, ApiError> {
        self.api.team(token, self.id).await
    }

    fn failure_message(&self, _error: &ApiError) -> String {
        "Could not load team data".to_string()
    }
}

/// Tournament card. A failed refresh clears the previous value.
#[derive(Debug, Clone)]
pub struct TournamentSource {
    api: MihfApi,
    id: i64,
}

impl TournamentSource {
    #[must_use]
    pub const fn new(api: MihfApi, id: i64) -> Self {
        Self { api, id }
    }
}

#[async_trait]
impl DetailSource for TournamentSource {
    type Value = TournamentDetail;

    fn name(&self) -> &'static str {
        "tournament"
    }

    async fn fetch(&self, token: &str) -> Result<TournamentDetail, ApiError> {
        self.api.tournament(token, self.id).await
    }

    fn keep_stale_on_error(&self) -> bool {
        false
    }
}

/// Season directory used by tournament filters.
#[derive(Debug, Clone)]
pub struct SeasonsSource {
    api: MihfApi,
}

impl SeasonsSource {
    #[must_use]
    pub const fn new(api: MihfApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DetailSource for SeasonsSource {
    type Value = Vec<Season>;

    fn name(&self) -> &'static str {
        "seasons"
    }

    async fn fetch(&self, token: &str) -> Result<Vec<Season>, ApiError> {
        self.api.seasons(token).await
    }
}

pub type ClubDetailLoader = DetailLoader<ClubSource>;
pub type TeamDetailLoader = DetailLoader<TeamSource>;
pub type GameDetailLoader = DetailLoader<GameSource>;
pub type GameLineupsLoader = DetailLoader<GameLineupsSource>;
pub type PlayerDetailLoader = DetailLoader<PlayerSource>;
pub type TournamentDetailLoader = DetailLoader<TournamentSource>;
pub type GameRefereesLoader = DetailLoader<GameRefereesSource>;
pub type SeasonsLoader = DetailLoader<SeasonsSource>;

/// Roster ordered by jersey number; players without a number go last.
#[must_use]
pub fn players_sorted(players: &[RosterPlayer]) -> Vec<RosterPlayer> {
    let mut sorted = players.to_vec();
    sorted.sort_by_key(|p| p.number.unwrap_or(i32::MAX));
    sorted
}

/// Roster split by position, each group ordered by number.
#[must_use]
pub fn players_by_position(players: &[RosterPlayer]) -> BTreeMap<String, Vec<RosterPlayer>> {
    let mut groups: BTreeMap<String, Vec<RosterPlayer>> = BTreeMap::new();
    for player in players_sorted(players) {
        let position = player
            .position
            .clone()
            .unwrap_or_else(|| NO_POSITION.to_string());
        groups.entry(position).or_default().push(player);
    }
    groups
}

/// Visible game events in match order.
#[must_use]
pub fn game_timeline(game: &GameDetail) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = game
        .events
        .iter()
        .filter(|e| !HIDDEN_EVENT_TYPES.contains(&e.type_id))
        .cloned()
        .collect();
    events.sort_by_key(|e| (e.minute.unwrap_or(0), e.second.unwrap_or(0)));
    events
}

#[must_use]
pub fn referees_by_role(referees: &[RefereeRow]) -> BTreeMap<String, Vec<RefereeRow>> {
    let mut groups: BTreeMap<String, Vec<RefereeRow>> = BTreeMap::new();
    for referee in referees {
        groups
            .entry(referee.role.clone())
            .or_default()
            .push(referee.clone());
    }
    groups
}
