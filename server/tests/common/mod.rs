#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use hyper::{Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use server::database::utils::{generate_admin_id, get_timestamp, hash_password};
use server::database::{AdminStore, StoreError};
use server::security::ClientAddr;
use server::{AppState, service_stack};
use shared::types::server_config::{AppConfig, FallbackAdminConfig};
use shared::types::{AdminRecord, AdminRole, AdminUpdate, NewAdmin};

pub const ACCESS_SECRET: &str = "integration-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &str = "integration-refresh-secret-0123456789abcdef";
pub const FALLBACK_EMAIL: &str = "dev@chapel.local";
pub const FALLBACK_PASSWORD: &str = "dev-fallback-pass1";
pub const PEER: &str = "203.0.113.10:55000";

// ---------------------------------------------------------------------------
// In-memory identity store
// ---------------------------------------------------------------------------

/// Identity store kept in a `HashMap`. `set_available(false)` makes every
/// call fail as if the database were unreachable.
#[derive(Default)]
pub struct MemoryStore {
    admins: Mutex<HashMap<String, AdminRecord>>,
    down: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_available(&self, available: bool) {
        self.down.store(!available, Ordering::SeqCst);
    }

    pub fn get(&self, id: &str) -> Option<AdminRecord> {
        self.admins.lock().unwrap().get(id).cloned()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<AdminRecord>, StoreError> {
        self.check()?;
        Ok(self.admins.lock().unwrap().get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<AdminRecord>, StoreError> {
        self.check()?;
        Ok(self
            .admins
            .lock()
            .unwrap()
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn create(&self, admin: NewAdmin) -> Result<AdminRecord, StoreError> {
        self.check()?;
        let mut admins = self.admins.lock().unwrap();
        if admins.values().any(|a| a.email == admin.email) {
            return Err(StoreError::Conflict);
        }
        let now = get_timestamp();
        let record = AdminRecord {
            id: generate_admin_id(),
            email: admin.email,
            password_hash: admin.password_hash,
            name: admin.name,
            role: admin.role,
            permissions: admin.permissions,
            is_active: true,
            login_count: 0,
            failed_login_count: 0,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        admins.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: &str,
        update: AdminUpdate,
    ) -> Result<Option<AdminRecord>, StoreError> {
        self.check()?;
        let mut admins = self.admins.lock().unwrap();
        if let Some(email) = &update.email {
            if admins.values().any(|a| &a.email == email && a.id != id) {
                return Err(StoreError::Conflict);
            }
        }
        let Some(record) = admins.get_mut(id) else {
            return Ok(None);
        };
        if let Some(v) = update.email {
            record.email = v;
        }
        if let Some(v) = update.password_hash {
            record.password_hash = v;
        }
        if let Some(v) = update.name {
            record.name = v;
        }
        if let Some(v) = update.role {
            record.role = v;
        }
        if let Some(v) = update.permissions {
            record.permissions = v;
        }
        if let Some(v) = update.is_active {
            record.is_active = v;
        }
        record.updated_at = get_timestamp();
        Ok(Some(record.clone()))
    }

    async fn record_login(&self, id: &str, succeeded: bool) -> Result<(), StoreError> {
        self.check()?;
        if let Some(record) = self.admins.lock().unwrap().get_mut(id) {
            if succeeded {
                record.login_count += 1;
                record.failed_login_count = 0;
                record.last_login_at = Some(get_timestamp());
            } else {
                record.failed_login_count += 1;
            }
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        self.check()?;
        Ok(self.admins.lock().unwrap().len() as i64)
    }
}

// ---------------------------------------------------------------------------
// App wiring
// ---------------------------------------------------------------------------

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.access_token_secret = Some(ACCESS_SECRET.to_string());
    config.auth.refresh_token_secret = Some(REFRESH_SECRET.to_string());
    config.auth.fallback_admin = Some(FallbackAdminConfig {
        email: FALLBACK_EMAIL.to_string(),
        password: FALLBACK_PASSWORD.to_string(),
        name: "Development Admin".to_string(),
        role: AdminRole::SuperAdmin,
    });
    config.cors.allowed_origins = vec!["https://admin.chapel.org".to_string()];
    config
}

pub fn app_state(config: AppConfig, store: Arc<MemoryStore>) -> AppState {
    AppState::new(config, store).unwrap()
}

pub async fn seed_admin(
    store: &MemoryStore,
    email: &str,
    password: &str,
    role: AdminRole,
) -> AdminRecord {
    store
        .create(NewAdmin {
            email: email.to_string(),
            password_hash: hash_password(password).unwrap(),
            name: format!("{} user", role),
            role,
            permissions: role.default_permissions(),
        })
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn set_cookie(&self) -> &str {
        self.header("set-cookie").expect("set-cookie header")
    }
}

pub struct TestRequest {
    inner: Request<Full<Bytes>>,
}

impl TestRequest {
    pub fn new(method: Method, uri: &str) -> Self {
        let mut inner = Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap();
        inner
            .extensions_mut()
            .insert(ClientAddr(PEER.parse::<SocketAddr>().unwrap()));
        Self { inner }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn put(uri: &str) -> Self {
        Self::new(Method::PUT, uri)
    }

    pub fn json(mut self, body: Value) -> Self {
        *self.inner.body_mut() = Full::new(Bytes::from(body.to_string()));
        self.inner
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self
    }

    pub fn raw_body(mut self, body: impl Into<Bytes>, content_type: &'static str) -> Self {
        *self.inner.body_mut() = Full::new(body.into());
        self.inner
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.inner
            .headers_mut()
            .insert(name, HeaderValue::from_str(value).unwrap());
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("authorization", &format!("Bearer {}", token))
    }

    pub fn peer(mut self, addr: &str) -> Self {
        self.inner
            .extensions_mut()
            .insert(ClientAddr(addr.parse::<SocketAddr>().unwrap()));
        self
    }

    pub async fn send(self, state: &AppState) -> TestResponse {
        let response = service_stack(state.clone())
            .oneshot(self.inner)
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }
}

pub async fn login(state: &AppState, email: &str, password: &str) -> TestResponse {
    TestRequest::post("/api/auth/login")
        .json(serde_json::json!({ "email": email, "password": password }))
        .send(state)
        .await
}

/// Value part of the `refreshToken` cookie in a `Set-Cookie` header.
pub fn cookie_value(set_cookie: &str) -> &str {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("refreshToken="))
        .unwrap_or("")
}
