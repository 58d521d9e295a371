//! Wire records for the federation backend.
//!
//! These mirror the JSON the backend sends; field names follow its snake_case
//! keys. Optional fields are `Option` with `#[serde(default)]` so a missing key
//! and an explicit `null` decode the same way.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::user::UserDto;

/// Stable identity of a list item.
///
/// The paginated list controller uses the key to locate the item a screen is
/// currently rendering and to patch single rows in place.
pub trait Keyed {
    type Key: Clone + Eq + std::fmt::Debug + Send + Sync;

    fn key(&self) -> Self::Key;
}

/// One page of a list endpoint.
///
/// Some endpoints omit `page` and `limit`, so only `data` and `total` are
/// required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    pub data: Vec<T>,
    pub total: u64,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Single-object payload wrapped in `{ "data": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserDto,
}

/// `{id, name}` reference used for stadiums, tournaments, groups, seasons,
/// people in game events and document metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: i64,
    pub name: String,
}

fn join_name(parts: [Option<&str>; 3]) -> String {
    parts
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------- players

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRow {
    pub id: i64,
    pub surname: String,
    pub name: String,
    #[serde(default)]
    pub patronymic: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
}

impl PlayerRow {
    #[must_use]
    pub fn full_name(&self) -> String {
        join_name([
            Some(self.surname.as_str()),
            Some(self.name.as_str()),
            self.patronymic.as_deref(),
        ])
    }
}

impl Keyed for PlayerRow {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

/// Per-team career statistics attached to a player profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTeamStat {
    pub team_id: i64,
    pub team_name: String,
    #[serde(default)]
    pub club_id: Option<i64>,
    #[serde(default)]
    pub club_name: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    pub games: u32,
    pub goals: u32,
    pub assists: u32,
    pub penalties: u32,
    pub missed: u32,
    #[serde(default)]
    pub reliability_factor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDetail {
    pub id: i64,
    #[serde(default)]
    pub grip: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub weight: Option<u32>,
    pub surname: String,
    pub name: String,
    #[serde(default)]
    pub patronymic: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub statistics: Vec<PlayerTeamStat>,
}

impl PlayerDetail {
    #[must_use]
    pub fn full_name(&self) -> String {
        join_name([
            Some(self.surname.as_str()),
            Some(self.name.as_str()),
            self.patronymic.as_deref(),
        ])
    }
}

// ---------------------------------------------------------------- clubs & teams

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubRow {
    pub id: i64,
    pub short_name: String,
    #[serde(default)]
    pub logo: Option<String>,
}

impl Keyed for ClubRow {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubTeam {
    pub id: i64,
    pub short_name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubDetail {
    pub id: i64,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub is_moscow: bool,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub teams: Vec<ClubTeam>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRow {
    pub id: i64,
    pub short_name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl Keyed for TeamRow {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

/// Player entry in a team or game roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub id: i64,
    pub full_name: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub number: Option<i32>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: i64,
    pub full_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamDetail {
    pub id: i64,
    #[serde(default)]
    pub club_id: Option<i64>,
    pub full_name: String,
    pub short_name: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub players: Vec<RosterPlayer>,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
}

// ---------------------------------------------------------------- tournaments

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentRow {
    pub id: i64,
    pub full_name: String,
    pub short_name: String,
    #[serde(default)]
    pub logo: Option<String>,
    pub year_of_birth: i32,
    #[serde(rename = "type")]
    pub kind: String,
    pub season: String,
}

impl Keyed for TournamentRow {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

/// Tournament card. The endpoint wraps it in [`Envelope`] and has been seen
/// sending both camelCase and snake_case keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentDetail {
    pub id: i64,
    #[serde(alias = "fullName")]
    pub full_name: String,
    #[serde(alias = "shortName")]
    pub short_name: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default, alias = "yearOfBirth")]
    pub year_of_birth: Option<i32>,
}

pub type Season = NamedRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub stage_id: i64,
    pub tournament_id: i64,
}

impl Keyed for Group {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

/// One team's line in a group standing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub team_id: i64,
    pub short_name: String,
    #[serde(default)]
    pub logo: Option<String>,
    pub game_count: u32,
    pub win_count: u32,
    pub tie_count: u32,
    pub loss_count: u32,
    pub win_overtime_count: u32,
    pub lose_overtime_count: u32,
    pub pucks_scored: u32,
    pub pucks_missed: u32,
    pub pucks_difference: f64,
    pub score: i32,
    pub position: i32,
}

impl Keyed for TableRow {
    type Key = i64;

    fn key(&self) -> i64 {
        self.team_id
    }
}

// ---------------------------------------------------------------- games

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    #[serde(default)]
    pub team1: Option<i32>,
    #[serde(default)]
    pub team2: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamShort {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// Game as listed in schedules and referee assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRow {
    pub id: i64,
    pub date_start: String,
    pub status: i32,
    #[serde(default)]
    pub score: Option<Score>,
    pub team1: TeamShort,
    pub team2: TeamShort,
    #[serde(default)]
    pub stadium: Option<NamedRef>,
    #[serde(default)]
    pub tournament: Option<NamedRef>,
    #[serde(default)]
    pub group: Option<NamedRef>,
}

impl GameRow {
    /// Kick-off time, if `date_start` is a valid RFC 3339 timestamp.
    #[must_use]
    pub fn start_time(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.date_start).ok()
    }
}

impl Keyed for GameRow {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameScore {
    #[serde(default)]
    pub team1: Option<i32>,
    #[serde(default)]
    pub team2: Option<i32>,
    #[serde(default)]
    pub shootout: Option<Score>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalty {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub minutes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// A protocol entry of a game: goal, penalty, shootout attempt, etc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: i64,
    pub type_id: i32,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub minute: Option<i32>,
    #[serde(default)]
    pub second: Option<i32>,
    #[serde(default)]
    pub period: Option<i32>,
    pub team: TeamShort,
    #[serde(default)]
    pub goal_author: Option<NamedRef>,
    #[serde(default)]
    pub assist1: Option<NamedRef>,
    #[serde(default)]
    pub assist2: Option<NamedRef>,
    #[serde(default)]
    pub shootout_player: Option<NamedRef>,
    #[serde(default)]
    pub penalty_player: Option<NamedRef>,
    #[serde(default)]
    pub penalty: Option<Penalty>,
    #[serde(default)]
    pub violation: Option<Violation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLineup {
    pub short_name: String,
    #[serde(default)]
    pub players: Vec<RosterPlayer>,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLineups {
    pub team1: GameLineup,
    pub team2: GameLineup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameDetail {
    pub id: i64,
    pub date_start: String,
    pub status: i32,
    #[serde(default)]
    pub score: GameScore,
    #[serde(default)]
    pub technical_defeat: bool,
    #[serde(default)]
    pub broadcast: Option<String>,
    #[serde(default)]
    pub broadcast_alt: Option<String>,
    pub team1: TeamShort,
    pub team2: TeamShort,
    #[serde(default)]
    pub stadium: Option<NamedRef>,
    #[serde(default)]
    pub events: Vec<GameEvent>,
    #[serde(default)]
    pub lineup_team1: Option<GameLineup>,
    #[serde(default)]
    pub lineup_team2: Option<GameLineup>,
}

// ---------------------------------------------------------------- referees

/// Official assigned to a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefereeRow {
    pub id: i64,
    pub full_name: String,
    pub role: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

// ---------------------------------------------------------------- documents

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
    #[serde(default)]
    pub category: Option<NamedRef>,
    #[serde(default)]
    pub season: Option<NamedRef>,
    #[serde(default)]
    pub tournament: Option<NamedRef>,
}

impl Keyed for Document {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }
}
