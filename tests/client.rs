//! End-to-end behaviour of the wired client against a scripted backend.

mod common;

use common::{harness, harness_with, login_ok, players_total, query, signed_in, user_json};
use mihf::api::{Method, RawResponse, TransportError};
use mihf::app::{AuthError, LoginForm};
use mihf::domain::{PasswordChangeError, User, UserDto};
use mihf::session::{Route, CURRENT_USER_KEY};
use mihf::storage::{CredentialStore, KeyValueCache, MemoryCache, MemoryCredentialStore};
use mihf::ApiError;
use serde_json::json;

fn cached_user_json(id: &str) -> String {
    let dto: UserDto = serde_json::from_value(user_json(id, &[])).expect("valid user");
    serde_json::to_string(&User::from(dto)).expect("serialize user")
}

// ---------------------------------------------------------------- auth

#[tokio::test]
async fn login_persists_token_and_profile() {
    let h = harness();
    login_ok(&h.backend, "abc", &[]);
    assert_eq!(h.app.session().bootstrap().await.expect("bootstrap").route, Route::Auth);

    let outcome = h
        .app
        .auth()
        .login(&LoginForm::new("+7 (910) 123-45-67", "secret1"))
        .await
        .expect("login");

    assert!(outcome.token_persisted);
    let snapshot = h.app.session().snapshot();
    assert_eq!(snapshot.route, Route::Home);
    assert_eq!(snapshot.token.as_deref(), Some("abc"));
    assert_eq!(snapshot.current_user.map(|u| u.id), Some("1".to_string()));
    assert_eq!(h.credentials.read_token().expect("read").as_deref(), Some("abc"));
    assert!(h.cache.get(CURRENT_USER_KEY).expect("get").is_some());

    let requests = h.backend.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].bearer.is_none());
    assert_eq!(
        requests[0].body,
        Some(json!({ "phone": "79101234567", "password": "secret1" }))
    );
}

#[tokio::test]
async fn invalid_form_never_reaches_backend() {
    let h = harness();
    login_ok(&h.backend, "abc", &[]);

    let err = h
        .app
        .auth()
        .login(&LoginForm::new("12345", "secret1"))
        .await
        .expect_err("short phone");

    assert!(matches!(err, AuthError::InvalidForm));
    assert!(h.backend.requests().is_empty());
}

#[tokio::test]
async fn rejected_login_keeps_auth_route() {
    let h = harness();
    h.backend
        .json(Method::Post, "/auth/login", 400, json!({ "message": "bad" }));
    h.app.session().bootstrap().await.expect("bootstrap");

    let err = h
        .app
        .auth()
        .login(&LoginForm::new("79101234567", "secret1"))
        .await
        .expect_err("rejected");

    assert_eq!(err.to_string(), "Wrong phone or password");
    assert_eq!(h.app.session().route(), Route::Auth);
}

// ---------------------------------------------------------------- bootstrap

#[tokio::test]
async fn bootstrap_restores_a_complete_session() {
    let mut cache = MemoryCache::default();
    cache
        .set(CURRENT_USER_KEY, &cached_user_json("7"))
        .expect("seed cache");
    let h = harness_with(MemoryCredentialStore::with_token("abc"), cache);

    let snapshot = h.app.session().bootstrap().await.expect("bootstrap");

    assert_eq!(snapshot.route, Route::Home);
    assert_eq!(snapshot.token.as_deref(), Some("abc"));
    assert_eq!(snapshot.current_user.map(|u| u.id), Some("7".to_string()));
}

#[tokio::test]
async fn bootstrap_with_token_only_lands_on_auth() {
    let h = harness_with(MemoryCredentialStore::with_token("abc"), MemoryCache::default());

    let snapshot = h.app.session().bootstrap().await.expect("bootstrap");

    assert_eq!(snapshot.route, Route::Auth);
    assert!(snapshot.token.is_none());
    assert!(snapshot.current_user.is_none());
}

// ---------------------------------------------------------------- lists

#[tokio::test]
async fn players_paginate_to_the_total() {
    let h = signed_in(&[]).await;
    players_total(&h.backend, 45);
    let players = h.app.players();

    let mut observed = Vec::new();
    for _ in 0..3 {
        players.load_next().await;
        observed.push((players.len(), players.can_load_more()));
    }
    assert!(!players.load_next().await);

    assert_eq!(observed, vec![(20, true), (40, true), (45, false)]);
    let pages: Vec<String> = h
        .backend
        .requests()
        .iter()
        .filter(|r| r.url.path() == "/players")
        .filter_map(|r| query(r, "page"))
        .collect();
    assert_eq!(pages, vec!["1", "2", "3"]);
    assert!(h
        .backend
        .requests()
        .iter()
        .filter(|r| r.url.path() == "/players")
        .all(|r| r.bearer.as_deref() == Some("abc")));
}

#[tokio::test]
async fn empty_search_is_not_sent() {
    let h = signed_in(&[]).await;
    players_total(&h.backend, 3);

    h.app.players().reload().await;

    let request = h.backend.requests().pop().expect("players request");
    assert_eq!(query(&request, "search"), None);
    assert_eq!(query(&request, "limit").as_deref(), Some("20"));
}

#[tokio::test]
async fn rejected_token_forces_logout() {
    let h = signed_in(&[]).await;
    h.backend.json(Method::Get, "/players", 403, json!({}));
    let players = h.app.players();

    players.reload().await;
    h.app.session().barrier().await.expect("barrier");

    assert_eq!(players.last_error(), Some(ApiError::InvalidCredentials));
    assert!(!players.can_load_more());
    assert_eq!(h.app.session().route(), Route::Auth);
    assert!(h.app.session().token().is_none());
    assert!(h.credentials.read_token().expect("read").is_none());
    assert!(h.cache.get(CURRENT_USER_KEY).expect("get").is_none());
}

#[tokio::test]
async fn shutdown_flushes_pending_forced_logout() {
    let h = signed_in(&[]).await;
    h.backend.json(Method::Get, "/players", 401, json!({}));

    h.app.players().reload().await;
    h.app.shutdown().await;

    assert!(h.credentials.read_token().expect("read").is_none());
    assert!(h.cache.get(CURRENT_USER_KEY).expect("get").is_none());
}

#[tokio::test]
async fn offline_and_garbage_are_classified() {
    let h = signed_in(&[]).await;
    h.backend.on(Method::Get, "/clubs", |_| {
        Err(TransportError::Connectivity("connection refused".into()))
    });
    h.backend.on(Method::Get, "/teams", |_| {
        Ok(RawResponse::new(200, "<html>oops</html>"))
    });

    let clubs = h.app.clubs();
    clubs.reload().await;
    let teams = h.app.teams();
    teams.reload().await;

    assert_eq!(clubs.last_error(), Some(ApiError::NoConnection));
    assert_eq!(teams.last_error(), Some(ApiError::DecodingFailure));
    assert_eq!(h.app.session().route(), Route::Home);
}

// ---------------------------------------------------------------- details

#[tokio::test]
async fn game_detail_exposes_visible_timeline() {
    let h = signed_in(&[]).await;
    let event = |id: i64, type_id: i32, minute: i32| {
        json!({
            "id": id, "type_id": type_id, "type": "goal",
            "minute": minute, "second": 0,
            "team": { "id": 1, "name": "Spartak" },
        })
    };
    h.backend.json(
        Method::Get,
        "/games/42",
        200,
        json!({
            "id": 42,
            "date_start": "2024-02-01T18:30:00+03:00",
            "status": 2,
            "team1": { "id": 1, "name": "Spartak" },
            "team2": { "id": 2, "name": "Dynamo" },
            "events": [event(1, 2, 30), event(2, 5, 10), event(3, 2, 5)],
        }),
    );

    let game = h.app.game(42);
    assert!(game.load().await);

    let detail = game.value().expect("loaded");
    let timeline: Vec<i64> = mihf::app::game_timeline(&detail)
        .iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(timeline, vec![3, 1]);
}

#[tokio::test]
async fn tournament_unwraps_envelope_and_clears_on_failure() {
    let h = signed_in(&[]).await;
    h.backend.json(
        Method::Get,
        "/tournaments/4",
        200,
        json!({ "data": { "id": 4, "fullName": "Moscow Cup", "shortName": "MC", "yearOfBirth": 2012 } }),
    );
    let tournament = h.app.tournament(4);

    tournament.load().await;
    assert_eq!(
        tournament.value().map(|t| t.full_name),
        Some("Moscow Cup".to_string())
    );

    h.backend.json(Method::Get, "/tournaments/4", 500, json!({}));
    tournament.load().await;
    assert!(tournament.value().is_none());
    assert_eq!(tournament.error().as_deref(), Some("Server error (code: 500)"));
}

// ---------------------------------------------------------------- profile

#[tokio::test]
async fn email_change_refreshes_cached_profile() {
    let h = signed_in(&[]).await;
    let mut updated = user_json("1", &[]);
    updated["email"] = json!("new@example.org");
    h.backend
        .json(Method::Put, "/users/profile/me", 200, updated);

    let user = h
        .app
        .profile()
        .update_email("new@example.org")
        .await
        .expect("update");

    assert_eq!(user.email.as_deref(), Some("new@example.org"));
    assert_eq!(
        h.app.session().current_user().and_then(|u| u.email),
        Some("new@example.org".to_string())
    );
    let cached = h.cache.get(CURRENT_USER_KEY).expect("get").expect("cached");
    assert!(cached.contains("new@example.org"));
}

#[tokio::test]
async fn wrong_old_password_keeps_session() {
    let h = signed_in(&[]).await;
    h.backend
        .json(Method::Patch, "/users/profile/me/password", 400, json!({}));

    let err = h
        .app
        .profile()
        .change_password("old-secret", "NewPassw0rd!", "NewPassw0rd!")
        .await
        .expect_err("rejected");

    assert_eq!(err, PasswordChangeError::WrongOldPassword);
    assert_eq!(h.app.session().route(), Route::Home);
    let request = h.backend.requests().pop().expect("request");
    assert_eq!(
        request.body,
        Some(json!({ "old_password": "old-secret", "new_password": "NewPassw0rd!" }))
    );
}

#[tokio::test]
async fn password_change_signs_out() {
    let h = signed_in(&[]).await;
    h.backend.on(Method::Patch, "/users/profile/me/password", |_| {
        Ok(RawResponse::new(204, Vec::new()))
    });

    h.app
        .profile()
        .change_password("old-secret", "NewPassw0rd!", "NewPassw0rd!")
        .await
        .expect("changed");

    assert_eq!(h.app.session().route(), Route::Auth);
    assert!(h.credentials.read_token().expect("read").is_none());
}

#[tokio::test]
async fn weak_password_is_rejected_locally() {
    let h = signed_in(&[]).await;
    let before = h.backend.requests().len();

    let err = h
        .app
        .profile()
        .change_password("old-secret", "abc", "abc")
        .await
        .expect_err("weak");

    assert!(matches!(err, PasswordChangeError::Validation(_)));
    assert_eq!(h.backend.requests().len(), before);
}

// ---------------------------------------------------------------- referee

fn assignments(backend: &common::FakeBackend) {
    backend.json(
        Method::Get,
        "/referees/games",
        200,
        json!({
            "data": [
                { "id": 1, "date_start": "2024-01-05T10:00:00Z", "status": 0,
                  "team1": { "id": 1, "name": "A" }, "team2": { "id": 2, "name": "B" } },
                { "id": 2, "date_start": "2024-03-05T10:00:00Z", "status": 0,
                  "team1": { "id": 3, "name": "C" }, "team2": { "id": 4, "name": "D" } },
            ],
            "total": 2,
        }),
    );
}

#[tokio::test]
async fn referee_confirmation_reloads_assignments() {
    let h = signed_in(&["REFEREE"]).await;
    assignments(&h.backend);
    h.backend.on(Method::Patch, "/referees/games/2/confirm", |_| {
        Ok(RawResponse::new(204, Vec::new()))
    });
    let desk = h.app.referee_desk();
    assert!(desk.is_available());

    desk.reload().await;
    let ids: Vec<i64> = desk.games().items().iter().map(|g| g.id).collect();
    assert_eq!(ids, vec![2, 1]);

    assert!(desk.confirm(2).await);
    assert_eq!(h.backend.count("/referees/games"), 2);
    assert!(desk.alert().is_none());
}

#[tokio::test]
async fn failed_unconfirm_raises_alert() {
    let h = signed_in(&["REFEREE"]).await;
    assignments(&h.backend);
    h.backend
        .json(Method::Patch, "/referees/games/1/unconfirm", 500, json!({}));
    let desk = h.app.referee_desk();

    assert!(!desk.unconfirm(1).await);
    assert_eq!(
        desk.take_alert().as_deref(),
        Some(mihf::app::referee::UNCONFIRM_FAILED)
    );
    assert_eq!(h.backend.count("/referees/games"), 0);
}

#[tokio::test]
async fn failed_assignment_load_raises_alert() {
    let h = signed_in(&["REFEREE"]).await;
    h.backend
        .json(Method::Get, "/referees/games", 500, json!({}));
    let desk = h.app.referee_desk();

    desk.reload().await;

    assert!(desk.games().is_empty());
    assert_eq!(desk.alert().as_deref(), Some(mihf::app::referee::LOAD_FAILED));
}

#[tokio::test]
async fn non_referee_desk_is_unavailable() {
    let h = signed_in(&["PLAYER"]).await;
    assert!(!h.app.referee_desk().is_available());
}

// ---------------------------------------------------------------- documents

#[tokio::test]
async fn document_meta_update_patches_loaded_row() {
    let h = signed_in(&[]).await;
    h.backend.json(
        Method::Get,
        "/documents",
        200,
        json!({
            "data": [{
                "id": 5, "name": "Rules", "url": "https://example.org/r.pdf",
                "category": { "id": 1, "name": "Regulations" },
                "season": { "id": 2023, "name": "2023/24" },
            }],
            "total": 1,
        }),
    );
    h.backend.on(Method::Patch, "/documents/5", |_| {
        Ok(RawResponse::new(200, "{}"))
    });
    let desk = h.app.documents_desk();
    desk.reload().await;

    assert!(desk.update_meta(5, Some(9), None).await);

    let request = h.backend.requests().pop().expect("patch");
    assert_eq!(request.body, Some(json!({ "categoryId": 9 })));
    let doc = desk.documents().items().pop().expect("row");
    assert_eq!(doc.category.map(|c| (c.id, c.name)), Some((9, "Regulations".to_string())));
    assert!(doc.season.is_none());
    assert!(desk.error().is_none());
}

#[tokio::test]
async fn failed_documents_load_sets_error() {
    let h = signed_in(&[]).await;
    h.backend.on(Method::Get, "/documents", |_| {
        Err(TransportError::Connectivity("timed out".into()))
    });
    let desk = h.app.documents_desk();
    assert!(desk.error().is_none());

    desk.reload().await;

    assert_eq!(desk.documents().last_error(), Some(ApiError::NoConnection));
    assert_eq!(desk.error().as_deref(), Some(mihf::app::documents::LOAD_FAILED));
}
