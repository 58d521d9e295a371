//! Typed surface of the federation REST backend.
//!
//! One method per endpoint. List methods take the 1-based `page`, the page
//! `limit`, and the screen's filter; optional filter fields are omitted from
//! the query when unset.

use chrono::NaiveDate;
use serde_json::json;

use super::gateway::{ApiGateway, ApiRequest};
use crate::domain::models::{
    ClubDetail, ClubRow, Document, Envelope, GameDetail, GameLineups, GameRow, Group,
    LoginResponse, Paged, PlayerDetail, PlayerRow, RefereeRow, Season, TableRow, TeamDetail,
    TeamRow, TournamentDetail, TournamentRow,
};
use crate::domain::{ApiError, UserDto};

type ApiResult<T> = Result<T, ApiError>;

/// Player search. An empty string lists everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayersFilter {
    pub search: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClubsFilter {
    pub search: String,
    /// Restrict to Moscow clubs. `false` means no restriction, not "non-Moscow".
    pub moscow_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamsFilter {
    pub search: String,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TournamentsFilter {
    pub season_id: Option<i64>,
    pub year_of_birth: Option<i32>,
}

/// Schedule filter; dates are sent as `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamesFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub stadium_id: Option<i64>,
    pub team_id: Option<i64>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentsFilter {
    pub category_id: Option<i64>,
    pub season_id: Option<i64>,
    pub tournament_id: Option<i64>,
}

/// Which ranking of a group to show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandingsFilter {
    pub moscow: bool,
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn paged(path: &str, token: &str, page: u32, limit: u32) -> ApiRequest {
    ApiRequest::get(path)
        .query("page", page)
        .query("limit", limit)
        .bearer(token)
}

/// Endpoint methods on top of an [`ApiGateway`].
#[derive(Debug, Clone)]
pub struct MihfApi {
    gateway: ApiGateway,
}

impl MihfApi {
    #[must_use]
    pub const fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }

    #[must_use]
    pub const fn gateway(&self) -> &ApiGateway {
        &self.gateway
    }

    /// `POST /auth/login`. The only unauthenticated call.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` for a wrong phone/password pair, otherwise the
    /// usual classification.
    pub async fn login(&self, phone: &str, password: &str) -> ApiResult<LoginResponse> {
        let request = ApiRequest::post("/auth/login").json(json!({
            "phone": phone,
            "password": password,
        }));
        self.gateway.request(request).await
    }

    // ------------------------------------------------------------ players

    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn players(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        filter: &PlayersFilter,
    ) -> ApiResult<Paged<PlayerRow>> {
        let request = paged("/players", token, page, limit)
            .query_opt("search", non_empty(&filter.search));
        self.gateway.request(request).await
    }

    /// `GET /players/{id}?withStats=true`
    ///
    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn player(&self, token: &str, id: i64) -> ApiResult<PlayerDetail> {
        let request = ApiRequest::get(format!("/players/{id}"))
            .query("withStats", true)
            .bearer(token);
        self.gateway.request(request).await
    }

    /// Games a player took part in: `GET /games?playerId=`.
    ///
    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn player_games(
        &self,
        token: &str,
        player_id: i64,
        page: u32,
        limit: u32,
    ) -> ApiResult<Paged<GameRow>> {
        let request = ApiRequest::get("/games")
            .query("playerId", player_id)
            .query("page", page)
            .query("limit", limit)
            .bearer(token);
        self.gateway.request(request).await
    }

    // ------------------------------------------------------------ clubs & teams

    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn clubs(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        filter: &ClubsFilter,
    ) -> ApiResult<Paged<ClubRow>> {
        let request = paged("/clubs", token, page, limit)
            .query_opt("search", non_empty(&filter.search))
            .query_opt("isMoscow", filter.moscow_only.then_some(true));
        self.gateway.request(request).await
    }

    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn club(&self, token: &str, id: i64) -> ApiResult<ClubDetail> {
        self.gateway
            .request(ApiRequest::get(format!("/clubs/{id}")).bearer(token))
            .await
    }

    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn teams(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        filter: &TeamsFilter,
    ) -> ApiResult<Paged<TeamRow>> {
        let request = paged("/teams", token, page, limit)
            .query_opt("search", non_empty(&filter.search))
            .query_opt("year", filter.year);
        self.gateway.request(request).await
    }

    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn team(&self, token: &str, id: i64) -> ApiResult<TeamDetail> {
        self.gateway
            .request(ApiRequest::get(format!("/teams/{id}")).bearer(token))
            .await
    }

    // ------------------------------------------------------------ tournaments

    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn tournaments(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        filter: &TournamentsFilter,
    ) -> ApiResult<Paged<TournamentRow>> {
        let request = paged("/tournaments", token, page, limit)
            .query_opt("season", filter.season_id)
            .query_opt("year", filter.year_of_birth);
        self.gateway.request(request).await
    }

    /// `GET /tournaments/{id}`, unwrapping the `{data}` envelope.
    ///
    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn tournament(&self, token: &str, id: i64) -> ApiResult<TournamentDetail> {
        let envelope: Envelope<TournamentDetail> = self
            .gateway
            .request(ApiRequest::get(format!("/tournaments/{id}")).bearer(token))
            .await?;
        Ok(envelope.data)
    }

    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn groups(
        &self,
        token: &str,
        stage_id: i64,
        page: u32,
        limit: u32,
    ) -> ApiResult<Paged<Group>> {
        let request = ApiRequest::get("/groups")
            .query("stageId", stage_id)
            .query("page", page)
            .query("limit", limit)
            .bearer(token);
        self.gateway.request(request).await
    }

    /// `GET /tournamentTables?groupId=&moscowStanding=`
    ///
    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn standings(
        &self,
        token: &str,
        group_id: i64,
        page: u32,
        limit: u32,
        filter: &StandingsFilter,
    ) -> ApiResult<Paged<TableRow>> {
        let request = ApiRequest::get("/tournamentTables")
            .query("groupId", group_id)
            .query("moscowStanding", filter.moscow)
            .query("page", page)
            .query("limit", limit)
            .bearer(token);
        self.gateway.request(request).await
    }

    /// `GET /seasons`, a bare array.
    ///
    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn seasons(&self, token: &str) -> ApiResult<Vec<Season>> {
        self.gateway
            .request(ApiRequest::get("/seasons").bearer(token))
            .await
    }

    // ------------------------------------------------------------ games

    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn games(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        filter: &GamesFilter,
    ) -> ApiResult<Paged<GameRow>> {
        let day = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
        let request = paged("/games", token, page, limit)
            .query_opt("dateFrom", filter.date_from.map(day))
            .query_opt("dateTo", filter.date_to.map(day))
            .query_opt("stadiumId", filter.stadium_id)
            .query_opt("teamId", filter.team_id)
            .query_opt("status", filter.status);
        self.gateway.request(request).await
    }

    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn game(&self, token: &str, id: i64) -> ApiResult<GameDetail> {
        self.gateway
            .request(ApiRequest::get(format!("/games/{id}")).bearer(token))
            .await
    }

    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn game_lineups(&self, token: &str, id: i64) -> ApiResult<GameLineups> {
        self.gateway
            .request(ApiRequest::get(format!("/games/{id}/lineups")).bearer(token))
            .await
    }

    // ------------------------------------------------------------ referees

    /// Games assigned to the signed-in referee.
    ///
    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn referee_games(
        &self,
        token: &str,
        page: u32,
        limit: u32,
    ) -> ApiResult<Paged<GameRow>> {
        self.gateway
            .request(paged("/referees/games", token, page, limit))
            .await
    }

    /// `PATCH /referees/games/{id}/confirm`, answered with no content.
    ///
    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn confirm_game(&self, token: &str, game_id: i64) -> ApiResult<()> {
        let request = ApiRequest::patch(format!("/referees/games/{game_id}/confirm")).bearer(token);
        self.gateway.request_empty(request).await
    }

    /// `PATCH /referees/games/{id}/unconfirm`, answered with no content.
    ///
    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn unconfirm_game(&self, token: &str, game_id: i64) -> ApiResult<()> {
        let request =
            ApiRequest::patch(format!("/referees/games/{game_id}/unconfirm")).bearer(token);
        self.gateway.request_empty(request).await
    }

    /// Officials assigned to a game.
    ///
    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn game_referees(&self, token: &str, game_id: i64) -> ApiResult<Vec<RefereeRow>> {
        let request = ApiRequest::get(format!("/referees/games/{game_id}/referees")).bearer(token);
        self.gateway.request(request).await
    }

    // ------------------------------------------------------------ documents

    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn documents(
        &self,
        token: &str,
        page: u32,
        limit: u32,
        filter: &DocumentsFilter,
    ) -> ApiResult<Paged<Document>> {
        let request = paged("/documents", token, page, limit)
            .query_opt("categoryId", filter.category_id)
            .query_opt("seasonId", filter.season_id)
            .query_opt("tournamentId", filter.tournament_id);
        self.gateway.request(request).await
    }

    /// `PATCH /documents/{id}` with only the keys that are set.
    ///
    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn update_document(
        &self,
        token: &str,
        id: i64,
        category_id: Option<i64>,
        season_id: Option<i64>,
    ) -> ApiResult<()> {
        let mut body = serde_json::Map::new();
        if let Some(category_id) = category_id {
            body.insert("categoryId".into(), json!(category_id));
        }
        if let Some(season_id) = season_id {
            body.insert("seasonId".into(), json!(season_id));
        }
        let request = ApiRequest::patch(format!("/documents/{id}"))
            .json(serde_json::Value::Object(body))
            .bearer(token);
        self.gateway.request_empty(request).await
    }

    // ------------------------------------------------------------ profile

    /// `PUT /users/profile/me {email}`; answers with the updated profile.
    ///
    /// # Errors
    ///
    /// Propagates the gateway classification.
    pub async fn update_email(&self, token: &str, email: &str) -> ApiResult<UserDto> {
        let request = ApiRequest::put("/users/profile/me")
            .json(json!({ "email": email }))
            .bearer(token);
        self.gateway.request(request).await
    }

    /// `PATCH /users/profile/me/password`, answered with no content.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` when the old password is wrong.
    pub async fn change_password(
        &self,
        token: &str,
        old_password: &str,
        new_password: &str,
    ) -> ApiResult<()> {
        let request = ApiRequest::patch("/users/profile/me/password")
            .json(json!({
                "old_password": old_password,
                "new_password": new_password,
            }))
            .bearer(token);
        self.gateway.request_empty(request).await
    }
}
