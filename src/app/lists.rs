//! Concrete list screens.
//!
//! Each source binds one list endpoint to [`PaginatedList`]. Sources that
//! belong to a parent record (groups of a stage, standings of a group, games
//! of a player) carry the parent id.

use std::cmp::Ordering;

use async_trait::async_trait;

use super::paginated::{PageSource, PaginatedList};
use crate::api::{
    ClubsFilter, DocumentsFilter, GamesFilter, MihfApi, PlayersFilter, StandingsFilter,
    TeamsFilter, TournamentsFilter,
};
use crate::domain::models::{
    ClubRow, Document, GameRow, Group, Paged, PlayerRow, TableRow, TeamRow, TournamentRow,
};
use crate::domain::ApiError;

/// Groups of a stage are few; fetch them in large pages.
pub const GROUPS_PAGE_SIZE: u32 = 50;

macro_rules! filtered_source {
    ($(#[$doc:meta])* $source:ident, $name:literal, $item:ty, $filter:ty, $endpoint:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $source {
            api: MihfApi,
        }

        impl $source {
            #[must_use]
            pub const fn new(api: MihfApi) -> Self {
                Self { api }
            }
        }

        #[async_trait]
        impl PageSource for $source {
            type Item = $item;
            type Filter = $filter;

            fn name(&self) -> &'static str {
                $name
            }

            async fn fetch(
                &self,
                token: &str,
                page: u32,
                limit: u32,
                filter: &$filter,
            ) -> Result<Paged<$item>, ApiError> {
                self.api.$endpoint(token, page, limit, filter).await
            }
        }
    };
}

filtered_source!(
    /// Player registry, searchable by name.
    PlayersSource, "players", PlayerRow, PlayersFilter, players
);
filtered_source!(ClubsSource, "clubs", ClubRow, ClubsFilter, clubs);
filtered_source!(TeamsSource, "teams", TeamRow, TeamsFilter, teams);
filtered_source!(
    TournamentsSource,
    "tournaments",
    TournamentRow,
    TournamentsFilter,
    tournaments
);
filtered_source!(
    /// Federation-wide schedule.
    GamesSource, "games", GameRow, GamesFilter, games
);
filtered_source!(
    DocumentsSource,
    "documents",
    Document,
    DocumentsFilter,
    documents
);

/// Groups of one tournament stage, ordered by name ignoring case.
#[derive(Debug, Clone)]
pub struct GroupsSource {
    api: MihfApi,
    stage_id: i64,
}

impl GroupsSource {
    #[must_use]
    pub const fn new(api: MihfApi, stage_id: i64) -> Self {
        Self { api, stage_id }
    }
}

#[async_trait]
impl PageSource for GroupsSource {
    type Item = Group;
    type Filter = ();

    fn name(&self) -> &'static str {
        "groups"
    }

    fn page_size(&self) -> u32 {
        GROUPS_PAGE_SIZE
    }

    async fn fetch(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        _filter: &(),
    ) -> Result<Paged<Group>, ApiError> {
        self.api.groups(token, self.stage_id, page, limit).await
    }

    fn arrange(&self, items: &mut Vec<Group>) {
        sort_groups(items);
    }
}

pub(crate) fn sort_groups(groups: &mut [Group]) {
    groups.sort_by_cached_key(|group| group.name.to_lowercase());
}

/// Table of one group: points descending, ties by listed position.
#[derive(Debug, Clone)]
pub struct StandingsSource {
    api: MihfApi,
    group_id: i64,
}

impl StandingsSource {
    #[must_use]
    pub const fn new(api: MihfApi, group_id: i64) -> Self {
        Self { api, group_id }
    }
}

#[async_trait]
impl PageSource for StandingsSource {
    type Item = TableRow;
    type Filter = StandingsFilter;

    fn name(&self) -> &'static str {
        "standings"
    }

    async fn fetch(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        filter: &StandingsFilter,
    ) -> Result<Paged<TableRow>, ApiError> {
        self.api
            .standings(token, self.group_id, page, limit, filter)
            .await
    }

    fn arrange(&self, items: &mut Vec<TableRow>) {
        sort_standings(items);
    }
}

pub(crate) fn sort_standings(rows: &mut [TableRow]) {
    rows.sort_by(|a, b| b.score.cmp(&a.score).then(a.position.cmp(&b.position)));
}

/// Games one player took part in.
#[derive(Debug, Clone)]
pub struct PlayerGamesSource {
    api: MihfApi,
    player_id: i64,
}

impl PlayerGamesSource {
    #[must_use]
    pub const fn new(api: MihfApi, player_id: i64) -> Self {
        Self { api, player_id }
    }
}

#[async_trait]
impl PageSource for PlayerGamesSource {
    type Item = GameRow;
    type Filter = ();

    fn name(&self) -> &'static str {
        "player_games"
    }

    async fn fetch(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        _filter: &(),
    ) -> Result<Paged<GameRow>, ApiError> {
        self.api
            .player_games(token, self.player_id, page, limit)
            .await
    }
}

/// Assignments of the signed-in referee, newest first.
#[derive(Debug, Clone)]
pub struct RefereeGamesSource {
    api: MihfApi,
}

impl RefereeGamesSource {
    #[must_use]
    pub const fn new(api: MihfApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PageSource for RefereeGamesSource {
    type Item = GameRow;
    type Filter = ();

    fn name(&self) -> &'static str {
        "referee_games"
    }

    async fn fetch(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        _filter: &(),
    ) -> Result<Paged<GameRow>, ApiError> {
        self.api.referee_games(token, page, limit).await
    }

    fn arrange(&self, items: &mut Vec<GameRow>) {
        sort_newest_first(items);
    }
}

/// Orders by parsed start time, newest first. Unparseable timestamps fall
/// back to comparing the raw strings and sort after parsed ones.
pub(crate) fn sort_newest_first(games: &mut [GameRow]) {
    games.sort_by(|a, b| match (a.start_time(), b.start_time()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.date_start.cmp(&a.date_start),
    });
}

pub type PlayersList = PaginatedList<PlayersSource>;
pub type ClubsList = PaginatedList<ClubsSource>;
pub type TeamsList = PaginatedList<TeamsSource>;
pub type TournamentsList = PaginatedList<TournamentsSource>;
pub type GroupsList = PaginatedList<GroupsSource>;
pub type StandingsList = PaginatedList<StandingsSource>;
pub type GamesList = PaginatedList<GamesSource>;
pub type PlayerGamesList = PaginatedList<PlayerGamesSource>;
pub type RefereeGamesList = PaginatedList<RefereeGamesSource>;
pub type DocumentsList = PaginatedList<DocumentsSource>;
