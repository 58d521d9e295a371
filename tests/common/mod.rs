//! Scripted in-process backend for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mihf::api::{Method, RawRequest, RawResponse, Transport, TransportError};
use mihf::storage::{MemoryCache, MemoryCredentialStore};
use mihf::{App, Config};
use serde_json::{json, Value};

type Responder = Arc<dyn Fn(&RawRequest) -> Result<RawResponse, TransportError> + Send + Sync>;

/// Answers requests by `(method, path)` and records every request it saw.
#[derive(Default)]
pub struct FakeBackend {
    routes: Mutex<HashMap<(&'static str, String), Responder>>,
    seen: Mutex<Vec<RawRequest>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(
        &self,
        method: Method,
        path: &str,
        responder: impl Fn(&RawRequest) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    ) {
        self.routes
            .lock()
            .expect("routes")
            .insert((method.as_str(), path.to_string()), Arc::new(responder));
    }

    pub fn json(&self, method: Method, path: &str, status: u16, body: Value) {
        self.on(method, path, move |_| {
            Ok(RawResponse::new(status, body.to_string()))
        });
    }

    pub fn requests(&self) -> Vec<RawRequest> {
        self.seen.lock().expect("seen").clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.path() == path)
            .count()
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: RawRequest) -> Result<RawResponse, TransportError> {
        self.seen.lock().expect("seen").push(request.clone());
        let key = (request.method.as_str(), request.url.path().to_string());
        let responder = self.routes.lock().expect("routes").get(&key).cloned();
        match responder {
            Some(responder) => responder(&request),
            None => Ok(RawResponse::new(404, "{}")),
        }
    }
}

/// Value of query parameter `key`.
pub fn query(request: &RawRequest, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub fn user_json(id: &str, roles: &[&str]) -> Value {
    let roles: Vec<Value> = roles
        .iter()
        .map(|alias| json!({ "name": alias.to_lowercase(), "alias": alias }))
        .collect();
    json!({
        "id": id,
        "first_name": "Ivan",
        "last_name": "Petrov",
        "middle_name": "Sergeevich",
        "date_of_birth": "1990-05-17T00:00:00.000Z",
        "email": "ivan@example.org",
        "phone": "79101234567",
        "roles": roles,
    })
}

pub fn login_ok(backend: &FakeBackend, token: &str, roles: &[&str]) {
    backend.json(
        Method::Post,
        "/auth/login",
        200,
        json!({ "token": token, "user": user_json("1", roles) }),
    );
}

/// Serves `total` players page by page from the `page`/`limit` query.
pub fn players_total(backend: &FakeBackend, total: u64) {
    backend.on(Method::Get, "/players", move |request| {
        let page: u64 = query(request, "page").and_then(|v| v.parse().ok()).unwrap_or(1);
        let limit: u64 = query(request, "limit").and_then(|v| v.parse().ok()).unwrap_or(20);
        let start = (page - 1) * limit;
        let end = (start + limit).min(total);
        let data: Vec<Value> = (start..end)
            .map(|n| json!({ "id": n + 1, "surname": "Player", "name": format!("N{}", n + 1) }))
            .collect();
        Ok(RawResponse::new(
            200,
            json!({ "data": data, "total": total, "page": page, "limit": limit }).to_string(),
        ))
    });
}

pub struct Harness {
    pub app: App,
    pub backend: Arc<FakeBackend>,
    pub credentials: MemoryCredentialStore,
    pub cache: MemoryCache,
}

pub fn harness() -> Harness {
    harness_with(MemoryCredentialStore::default(), MemoryCache::default())
}

pub fn harness_with(credentials: MemoryCredentialStore, cache: MemoryCache) -> Harness {
    let backend = FakeBackend::new();
    let config = Config {
        base_url: "http://backend.test".to_string(),
        ..Config::default()
    };
    let app = App::with_parts(
        config,
        backend.clone(),
        Box::new(credentials.clone()),
        Box::new(cache.clone()),
    )
    .expect("wire app");
    Harness {
        app,
        backend,
        credentials,
        cache,
    }
}

pub async fn signed_in(roles: &[&str]) -> Harness {
    let h = harness();
    login_ok(&h.backend, "abc", roles);
    h.app.session().bootstrap().await.expect("bootstrap");
    h.app
        .auth()
        .login(&mihf::app::LoginForm::new("79101234567", "secret1"))
        .await
        .expect("login");
    h
}
