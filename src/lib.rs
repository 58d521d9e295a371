//! MIHF: client core for the hockey federation backend.
//!
//! Provides everything a front end needs to talk to the federation REST API:
//! - Sign-in, persisted session and forced sign-out on rejected tokens
//! - Paginated catalogues of players, clubs, teams, tournaments and games
//! - Record detail screens with derived views (rosters, game timelines)
//! - Referee assignment confirmation and document metadata editing
//! - Profile e-mail and password changes

#![allow(clippy::multiple_crate_versions)]

//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  CLI shell (main.rs)                                │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  View-model layer (app/)                            │
//! │  - PaginatedList<S>, DetailLoader<S>                │
//! │  - Auth, profile, referee and documents desks       │
//! └─────────────────────────────────────────────────────┘
//!         │                    │                    │
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ API (api/)    │   │ Session       │   │ Storage       │
//! │ - Gateway     │──►│ (session/)    │──►│ (storage/)    │
//! │ - Endpoints   │   │ - One worker  │   │ - Token file  │
//! │ - Transport   │   │ - Snapshots   │   │ - JSON cache  │
//! └───────────────┘   └───────────────┘   └───────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain (domain/), infrastructure, observability    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`app`]: View-models
//! - [`api`]: Request building, classification and typed endpoints
//! - [`session`]: Session worker and handle
//! - [`storage`]: Token and cache persistence
//! - [`domain`]: Errors, user and wire records
//! - [`infrastructure`]: Data directory resolution
//! - [`observability`]: Rotating log file
//!
//! # Configuration
//!
//! ```toml
//! base_url = "http://127.0.0.1:3000"
//! data_dir = "~/.local/share/mihf"
//! page_size = 20
//! request_timeout_secs = 30
//! log_level = "info"
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use mihf::app::LoginForm;
//! use mihf::{initialize, Config};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let app = initialize(&Config::default())?;
//! app.session().bootstrap().await?;
//! app.auth().login(&LoginForm::new("+7 910 123-45-67", "secret1")).await?;
//!
//! let players = app.players();
//! players.reload().await;
//! for player in players.items() {
//!     println!("{}", player.full_name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod app;
pub mod domain;
pub mod infrastructure;
pub mod observability;
pub mod session;
pub mod storage;

pub use domain::{ApiError, MihfError, Result};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::api::{ApiGateway, MihfApi, ReqwestTransport, Transport};
use crate::app::{
    AuthFlow, ClubDetailLoader, ClubSource, ClubsList, ClubsSource, DocumentsDesk,
    GameDetailLoader, GameLineupsLoader, GameLineupsSource, GameRefereesLoader,
    GameRefereesSource, GameSource, GamesList, GamesSource, GroupsList, GroupsSource,
    PlayerDetailLoader, PlayerGamesList, PlayerGamesSource, PlayerSource, PlayersList,
    PlayersSource, ProfileActions, RefereeDesk, SeasonsLoader, SeasonsSource, StandingsList,
    StandingsSource, TeamDetailLoader, TeamSource, TeamsList, TeamsSource,
    TournamentDetailLoader, TournamentSource, TournamentsList, TournamentsSource,
};
use crate::app::{DetailLoader, PaginatedList};
use crate::session::SessionHandle;
use crate::storage::{CredentialStore, FileCredentialStore, JsonStore, KeyValueCache};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
pub use crate::app::paginated::DEFAULT_PAGE_SIZE;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// File names inside the data directory.
pub const TOKEN_FILE: &str = "token";
pub const CACHE_FILE: &str = "cache.json";

/// Client configuration.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend root. Default: `http://127.0.0.1:3000`
    pub base_url: String,

    /// Token, cache and log location. Default: see [`infrastructure::data_dir`].
    pub data_dir: PathBuf,

    /// Rows per list page. Default: 20
    pub page_size: u32,

    /// Per-request timeout. Default: 30
    pub request_timeout_secs: u64,

    /// `trace`, `debug`, `info`, `warn` or `error`. Default: `"info"`
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: infrastructure::data_dir(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Parses configuration from a string map.
    ///
    /// Unknown keys are ignored; unparsable or empty values fall back to
    /// defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use mihf::Config;
    ///
    /// let mut map = BTreeMap::new();
    /// map.insert("base_url".to_string(), "https://api.example.org".to_string());
    /// map.insert("page_size".to_string(), "many".to_string());
    ///
    /// let config = Config::from_map(&map);
    /// assert_eq!(config.base_url, "https://api.example.org");
    /// assert_eq!(config.page_size, 20);
    /// ```
    #[must_use]
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| {
            map.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        Self {
            base_url: get("base_url").map_or(defaults.base_url, String::from),
            data_dir: get("data_dir").map_or(defaults.data_dir, |dir| {
                let home = std::env::var("HOME").ok();
                PathBuf::from(infrastructure::expand_tilde(dir, home.as_deref()))
            }),
            page_size: get("page_size")
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.page_size),
            request_timeout_secs: get("request_timeout_secs")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.request_timeout_secs),
            log_level: get("log_level").map_or(defaults.log_level, String::from),
        }
    }

    /// Reads a TOML file.
    ///
    /// # Errors
    ///
    /// I/O failures and malformed TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&raw)?;
        if let Some(dir) = config.data_dir.to_str() {
            let home = std::env::var("HOME").ok();
            config.data_dir = PathBuf::from(infrastructure::expand_tilde(dir, home.as_deref()));
        }
        Ok(config)
    }

    /// Parsed [`Config::base_url`].
    ///
    /// # Errors
    ///
    /// [`MihfError::Config`] if it is not an absolute http(s) URL.
    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| MihfError::Config(format!("invalid base_url {:?}: {e}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(MihfError::Config(format!(
                "unsupported base_url scheme {other:?}"
            ))),
        }
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Wired client: configuration, session and API, plus view-model factories.
#[derive(Debug, Clone)]
pub struct App {
    config: Config,
    session: SessionHandle,
    api: MihfApi,
}

/// Builds the production client: token file and JSON cache in the data
/// directory, reqwest transport.
///
/// Logging is not started here; call
/// [`observability::init_tracing`] first if wanted.
///
/// # Errors
///
/// Fails if the data directory cannot be created, the base URL is invalid,
/// the HTTP client cannot be built, or the session worker cannot start.
pub fn initialize(config: &Config) -> Result<App> {
    let span = tracing::debug_span!("initialize", data_dir = %config.data_dir.display());
    let _guard = span.entered();

    std::fs::create_dir_all(&config.data_dir)?;

    let credentials = FileCredentialStore::new(config.data_dir.join(TOKEN_FILE));
    let cache = JsonStore::new(config.data_dir.join(CACHE_FILE))?;
    let transport = ReqwestTransport::new(config.request_timeout())
        .map_err(|e| MihfError::Config(format!("cannot build HTTP client: {e}")))?;

    App::with_parts(
        config.clone(),
        Arc::new(transport),
        Box::new(credentials),
        Box::new(cache),
    )
}

impl App {
    /// Wires a client from explicit parts. Tests use this with fakes.
    ///
    /// # Errors
    ///
    /// Invalid base URL or a session worker that cannot start.
    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        credentials: Box<dyn CredentialStore>,
        cache: Box<dyn KeyValueCache>,
    ) -> Result<Self> {
        let session = SessionHandle::spawn(credentials, cache)?;
        let gateway =
            ApiGateway::new(config.base_url()?, transport).with_auth_signal(session.auth_signal());
        tracing::debug!(base_url = %gateway.base_url(), "client wired");

        Ok(Self {
            config,
            session,
            api: MihfApi::new(gateway),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn session(&self) -> &SessionHandle {
        &self.session
    }

    #[must_use]
    pub const fn api(&self) -> &MihfApi {
        &self.api
    }

    /// Waits until queued session commands have reached the stores.
    ///
    /// A 401/403 on the last request only queues the forced logout; call this
    /// before the process exits so the rejected token is removed from disk.
    pub async fn shutdown(&self) {
        if let Err(e) = self.session.barrier().await {
            tracing::warn!(error = %e, "session queue not drained before exit");
        }
    }

    fn list<S: app::PageSource>(&self, source: S) -> PaginatedList<S> {
        PaginatedList::new(source, self.session.clone()).with_page_size(self.config.page_size)
    }

    fn detail<S: app::DetailSource>(&self, source: S) -> DetailLoader<S> {
        DetailLoader::new(source, self.session.clone())
    }

    // ------------------------------------------------------------ flows

    #[must_use]
    pub fn auth(&self) -> AuthFlow {
        AuthFlow::new(self.api.clone(), self.session.clone())
    }

    #[must_use]
    pub fn profile(&self) -> ProfileActions {
        ProfileActions::new(self.api.clone(), self.session.clone())
    }

    #[must_use]
    pub fn referee_desk(&self) -> RefereeDesk {
        RefereeDesk::new(self.api.clone(), self.session.clone())
            .with_page_size(self.config.page_size)
    }

    #[must_use]
    pub fn documents_desk(&self) -> DocumentsDesk {
        DocumentsDesk::new(self.api.clone(), self.session.clone())
            .with_page_size(self.config.page_size)
    }

    // ------------------------------------------------------------ lists

    #[must_use]
    pub fn players(&self) -> PlayersList {
        self.list(PlayersSource::new(self.api.clone()))
    }

    #[must_use]
    pub fn clubs(&self) -> ClubsList {
        self.list(ClubsSource::new(self.api.clone()))
    }

    #[must_use]
    pub fn teams(&self) -> TeamsList {
        self.list(TeamsSource::new(self.api.clone()))
    }

    #[must_use]
    pub fn tournaments(&self) -> TournamentsList {
        self.list(TournamentsSource::new(self.api.clone()))
    }

    /// Groups keep their own larger page size.
    #[must_use]
    pub fn groups(&self, stage_id: i64) -> GroupsList {
        PaginatedList::new(
            GroupsSource::new(self.api.clone(), stage_id),
            self.session.clone(),
        )
    }

    #[must_use]
    pub fn standings(&self, group_id: i64) -> StandingsList {
        self.list(StandingsSource::new(self.api.clone(), group_id))
    }

    #[must_use]
    pub fn games(&self) -> GamesList {
        self.list(GamesSource::new(self.api.clone()))
    }

    #[must_use]
    pub fn player_games(&self, player_id: i64) -> PlayerGamesList {
        self.list(PlayerGamesSource::new(self.api.clone(), player_id))
    }

    // ------------------------------------------------------------ details

    #[must_use]
    pub fn club(&self, id: i64) -> ClubDetailLoader {
        self.detail(ClubSource::new(self.api.clone(), id))
    }

    #[must_use]
    pub fn team(&self, id: i64) -> TeamDetailLoader {
        self.detail(TeamSource::new(self.api.clone(), id))
    }

    #[must_use]
    pub fn game(&self, id: i64) -> GameDetailLoader {
        self.detail(GameSource::new(self.api.clone(), id))
    }

    #[must_use]
    pub fn game_lineups(&self, id: i64) -> GameLineupsLoader {
        self.detail(GameLineupsSource::new(self.api.clone(), id))
    }

    #[must_use]
    pub fn game_referees(&self, id: i64) -> GameRefereesLoader {
        self.detail(GameRefereesSource::new(self.api.clone(), id))
    }

    #[must_use]
    pub fn player(&self, id: i64) -> PlayerDetailLoader {
        self.detail(PlayerSource::new(self.api.clone(), id))
    }

    #[must_use]
    pub fn tournament(&self, id: i64) -> TournamentDetailLoader {
        self.detail(TournamentSource::new(self.api.clone(), id))
    }

    #[must_use]
    pub fn seasons(&self) -> SeasonsLoader {
        self.detail(SeasonsSource::new(self.api.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.page_size, 20);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.log_level, "info");
    }

    #[rstest]
    #[case::zero("page_size", "0")]
    #[case::negative("page_size", "-3")]
    #[case::blank("request_timeout_secs", "  ")]
    fn lenient_map_values_fall_back(#[case] key: &str, #[case] value: &str) {
        let map = BTreeMap::from([(key.to_string(), value.to_string())]);
        let config = Config::from_map(&map);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn toml_file_overrides_only_given_keys() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("mihf.toml");
        std::fs::write(&path, "page_size = 50\nlog_level = \"debug\"\n").expect("write");

        let config = Config::from_file(&path).expect("parse");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("mihf.toml");
        std::fs::write(&path, "page_size = [").expect("write");

        assert!(matches!(
            Config::from_file(&path),
            Err(MihfError::ConfigParse(_))
        ));
    }

    #[rstest]
    #[case::garbage("not a url")]
    #[case::scheme("ftp://example.org")]
    fn bad_base_url_is_rejected(#[case] base_url: &str) {
        let config = Config {
            base_url: base_url.to_string(),
            ..Config::default()
        };
        assert!(matches!(config.base_url(), Err(MihfError::Config(_))));
    }
}
