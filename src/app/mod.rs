//! View-model layer.
//!
//! Screen state a front end reads and the intents it triggers. Nothing here
//! renders; the CLI in `main.rs` is one consumer, a GUI would be another.
//!
//! # Architecture
//!
//! ```text
//!  screen intent ──► view-model ──► MihfApi ──► ApiGateway ──► Transport
//!                        │                          │
//!                        └── SessionHandle ◄────────┘ (forced logout)
//! ```
//!
//! # Modules
//!
//! - [`paginated`]: the generic [`PaginatedList`] controller and [`PageSource`] seam
//! - [`lists`]: one page source per catalogue screen
//! - [`detail`]: the generic [`DetailLoader`] and per-record sources
//! - [`auth`]: sign-in form validation and flow
//! - [`profile`]: e-mail and password changes
//! - [`referee`]: referee assignments and confirmation
//! - [`documents`]: document library with metadata editing

pub mod auth;
pub mod detail;
pub mod documents;
pub mod lists;
pub mod paginated;
pub mod profile;
pub mod referee;

pub use auth::{AuthError, AuthFlow, LoginForm};
pub use detail::{
    game_timeline, players_by_position, players_sorted, referees_by_role, ClubDetailLoader,
    ClubSource, DetailLoader, DetailSource, DetailState, GameDetailLoader, GameLineupsLoader,
    GameLineupsSource, GameRefereesLoader, GameRefereesSource, GameSource, PlayerDetailLoader,
    PlayerSource, SeasonsLoader, SeasonsSource, TeamDetailLoader, TeamSource,
    TournamentDetailLoader, TournamentSource,
};
pub use documents::DocumentsDesk;
pub use lists::{
    ClubsList, ClubsSource, DocumentsList, DocumentsSource, GamesList, GamesSource, GroupsList,
    GroupsSource, PlayerGamesList, PlayerGamesSource, PlayersList, PlayersSource,
    RefereeGamesList, RefereeGamesSource, StandingsList, StandingsSource, TeamsList,
    TeamsSource, TournamentsList, TournamentsSource,
};
pub use paginated::{ListSnapshot, PageSource, PaginatedList};
pub use profile::{EmailUpdateError, PasswordStrength, ProfileActions};
pub use referee::RefereeDesk;
