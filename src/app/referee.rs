//! Referee assignments and their confirmation.

use std::sync::Mutex;

use super::lists::{RefereeGamesList, RefereeGamesSource};
use crate::api::MihfApi;
use crate::domain::models::GameRow;
use crate::session::SessionHandle;

pub const LOAD_FAILED: &str = "Could not load the game list";
pub const CONFIRM_FAILED: &str = "Could not confirm the game";
pub const UNCONFIRM_FAILED: &str = "Could not withdraw the confirmation";

/// Assignment list of the signed-in referee with confirm/unconfirm actions.
#[derive(Debug)]
pub struct RefereeDesk {
    api: MihfApi,
    session: SessionHandle,
    games: RefereeGamesList,
    alert: Mutex<Option<String>>,
}

impl RefereeDesk {
    #[must_use]
    pub fn new(api: MihfApi, session: SessionHandle) -> Self {
        let games = RefereeGamesList::new(RefereeGamesSource::new(api.clone()), session.clone());
        Self {
            api,
            session,
            games,
            alert: Mutex::new(None),
        }
    }

    /// Whether the signed-in user holds the referee role.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.session
            .current_user()
            .is_some_and(|user| user.is_referee())
    }

    /// Overrides the list page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.games = self.games.with_page_size(page_size);
        self
    }

    #[must_use]
    pub const fn games(&self) -> &RefereeGamesList {
        &self.games
    }

    pub async fn reload(&self) {
        self.games.reload().await;
        self.raise_on_load_error();
    }

    pub async fn load_more_if_needed(&self, current: Option<&GameRow>) {
        self.games
            .load_more_if_needed(current.map(|game| &game.id))
            .await;
        self.raise_on_load_error();
    }

    fn raise_on_load_error(&self) {
        if self.games.last_error().is_some() {
            self.set_alert(LOAD_FAILED);
        }
    }

    /// Confirms participation in a game and reloads the list.
    pub async fn confirm(&self, game_id: i64) -> bool {
        self.set_confirmation(game_id, true).await
    }

    pub async fn unconfirm(&self, game_id: i64) -> bool {
        self.set_confirmation(game_id, false).await
    }

    async fn set_confirmation(&self, game_id: i64, confirm: bool) -> bool {
        let Some(token) = self.session.token() else {
            return false;
        };

        let result = if confirm {
            self.api.confirm_game(&token, game_id).await
        } else {
            self.api.unconfirm_game(&token, game_id).await
        };

        match result {
            Ok(()) => {
                tracing::info!(game_id, confirm, "assignment updated");
                self.reload().await;
                true
            }
            Err(e) => {
                tracing::warn!(game_id, confirm, error = %e, "assignment update failed");
                self.set_alert(if confirm { CONFIRM_FAILED } else { UNCONFIRM_FAILED });
                false
            }
        }
    }

    fn set_alert(&self, message: &str) {
        *self
            .alert
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(message.to_string());
    }

    #[must_use]
    pub fn alert(&self) -> Option<String> {
        self.alert
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Dismisses the alert, returning it.
    pub fn take_alert(&self) -> Option<String> {
        self.alert
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }
}
