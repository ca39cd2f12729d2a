use crate::domain::models::{AuthSession, AuthUser};
use crate::infrastructure::auth_client::{AuthClient, SignUpOutcome};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::rest_client::{RestClient, SelectQuery};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

const OWNER_COLUMN: &str = "user_id";
const SESSION_LIFETIME_SECONDS: i64 = 3600;

#[derive(Debug, Clone)]
struct Account {
    user: AuthUser,
    password: String,
    confirmed: bool,
}

#[derive(Debug, Default)]
struct BackendState {
    accounts: Vec<Account>,
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
    tables: HashMap<String, Vec<Value>>,
}

/// Process-local stand-in for the hosted backend.
///
/// Rows are scoped to the user owning the access token, the same way the
/// hosted tables enforce row-level security.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
    next_sequence: AtomicU64,
    request_count: AtomicUsize,
    offline: AtomicBool,
    confirmation_required: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn require_email_confirmation(&self, required: bool) {
        self.confirmation_required.store(required, Ordering::SeqCst);
    }

    /// Creates a confirmed account without counting a request.
    pub fn register_user(&self, email: &str, password: &str) -> Result<AuthUser, InfraError> {
        let mut state = self.lock()?;
        if state.accounts.iter().any(|account| account.user.email.as_deref() == Some(email)) {
            return Err(InfraError::Auth("User already registered".to_string()));
        }
        let user = AuthUser {
            id: self.next_id("user"),
            email: Some(email.to_string()),
        };
        state.accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
            confirmed: true,
        });
        Ok(user)
    }

    /// Issues a session for an existing account without counting a request.
    pub fn issue_session(&self, user: &AuthUser, expires_at: DateTime<Utc>) -> Result<AuthSession, InfraError> {
        let mut state = self.lock()?;
        Ok(self.open_session(&mut state, user.clone(), expires_at))
    }

    pub fn revoke_access_token(&self, access_token: &str) -> Result<(), InfraError> {
        self.lock()?.access_tokens.remove(access_token);
        Ok(())
    }

    /// Stores a raw row as-is, bypassing ownership checks.
    pub fn seed_row(&self, table: &str, row: Value) -> Result<(), InfraError> {
        self.lock()?.tables.entry(table.to_string()).or_default().push(row);
        Ok(())
    }

    pub fn rows(&self, table: &str) -> Result<Vec<Value>, InfraError> {
        Ok(self.lock()?.tables.get(table).cloned().unwrap_or_default())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BackendState>, InfraError> {
        self.state
            .lock()
            .map_err(|error| InfraError::Network(format!("in-memory backend lock poisoned: {error}")))
    }

    fn next_id(&self, prefix: &str) -> String {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{sequence}")
    }

    fn open_session(
        &self,
        state: &mut BackendState,
        user: AuthUser,
        expires_at: DateTime<Utc>,
    ) -> AuthSession {
        let access_token = self.next_id("access");
        let refresh_token = self.next_id("refresh");
        state.access_tokens.insert(access_token.clone(), user.id.clone());
        state.refresh_tokens.insert(refresh_token.clone(), user.id.clone());
        AuthSession {
            access_token,
            refresh_token: Some(refresh_token),
            token_type: "bearer".to_string(),
            expires_at,
            user,
        }
    }

    /// Counts the request and fails when the backend is switched offline.
    fn begin_request(&self) -> Result<MutexGuard<'_, BackendState>, InfraError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(InfraError::Network("backend unreachable".to_string()));
        }
        self.lock()
    }

    fn authorize(state: &BackendState, access_token: &str) -> Result<String, InfraError> {
        state.access_tokens.get(access_token).cloned().ok_or_else(|| InfraError::Backend {
            status: 401,
            code: Some("PGRST301".to_string()),
            message: "JWT expired".to_string(),
        })
    }

    fn find_user(state: &BackendState, user_id: &str) -> Option<AuthUser> {
        state
            .accounts
            .iter()
            .find(|account| account.user.id == user_id)
            .map(|account| account.user.clone())
    }
}

fn owned_by(row: &Value, user_id: &str) -> bool {
    row.get(OWNER_COLUMN).and_then(Value::as_str) == Some(user_id)
}

fn row_level_violation(table: &str) -> InfraError {
    InfraError::Backend {
        status: 403,
        code: Some("42501".to_string()),
        message: format!("new row violates row-level security policy for table \"{table}\""),
    }
}

fn merge_into(target: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl RestClient for InMemoryBackend {
    async fn select(
        &self,
        access_token: &str,
        table: &str,
        query: &SelectQuery,
    ) -> Result<Vec<Value>, InfraError> {
        let state = self.begin_request()?;
        let user_id = Self::authorize(&state, access_token)?;
        let mut rows = state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| owned_by(row, &user_id) && query.matches(row))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        query.sort_rows(&mut rows);
        Ok(rows.into_iter().map(|row| query.project(row)).collect())
    }

    async fn insert(&self, access_token: &str, table: &str, mut row: Value) -> Result<Value, InfraError> {
        let mut state = self.begin_request()?;
        let user_id = Self::authorize(&state, access_token)?;
        if !owned_by(&row, &user_id) {
            return Err(row_level_violation(table));
        }
        let Value::Object(fields) = &mut row else {
            return Err(InfraError::Backend {
                status: 400,
                code: Some("PGRST102".to_string()),
                message: "Empty or invalid json".to_string(),
            });
        };
        if !fields.contains_key("id") {
            fields.insert("id".to_string(), Value::String(self.next_id(table)));
        }
        state.tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        access_token: &str,
        table: &str,
        filter: &SelectQuery,
        patch: Value,
    ) -> Result<Vec<Value>, InfraError> {
        let mut state = self.begin_request()?;
        let user_id = Self::authorize(&state, access_token)?;
        let mut updated = Vec::new();
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows
                .iter_mut()
                .filter(|row| owned_by(row, &user_id) && filter.matches(row))
            {
                merge_into(row, &patch);
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn upsert(
        &self,
        access_token: &str,
        table: &str,
        row: Value,
        on_conflict: &str,
    ) -> Result<Value, InfraError> {
        let mut state = self.begin_request()?;
        let user_id = Self::authorize(&state, access_token)?;
        if !owned_by(&row, &user_id) {
            return Err(row_level_violation(table));
        }
        let key = row.get(on_conflict).cloned();
        let rows = state.tables.entry(table.to_string()).or_default();
        if let Some(existing) = rows
            .iter_mut()
            .find(|existing| key.is_some() && existing.get(on_conflict) == key.as_ref())
        {
            merge_into(existing, &row);
            return Ok(existing.clone());
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn delete(
        &self,
        access_token: &str,
        table: &str,
        filter: &SelectQuery,
    ) -> Result<(), InfraError> {
        let mut state = self.begin_request()?;
        let user_id = Self::authorize(&state, access_token)?;
        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|row| !(owned_by(row, &user_id) && filter.matches(row)));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthClient for InMemoryBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _redirect_to: &str,
    ) -> Result<SignUpOutcome, InfraError> {
        let mut state = self.begin_request()?;
        if state.accounts.iter().any(|account| account.user.email.as_deref() == Some(email)) {
            return Err(InfraError::Auth("User already registered".to_string()));
        }
        let confirmed = !self.confirmation_required.load(Ordering::SeqCst);
        let user = AuthUser {
            id: self.next_id("user"),
            email: Some(email.to_string()),
        };
        state.accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
            confirmed,
        });
        if !confirmed {
            return Ok(SignUpOutcome::ConfirmationRequired(user));
        }
        let expires_at = Utc::now() + Duration::seconds(SESSION_LIFETIME_SECONDS);
        Ok(SignUpOutcome::SessionStarted(self.open_session(&mut state, user, expires_at)))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, InfraError> {
        let mut state = self.begin_request()?;
        let account = state
            .accounts
            .iter()
            .find(|account| account.user.email.as_deref() == Some(email) && account.password == password)
            .cloned()
            .ok_or_else(|| InfraError::Auth("Invalid login credentials".to_string()))?;
        if !account.confirmed {
            return Err(InfraError::Auth("Email not confirmed".to_string()));
        }
        let expires_at = Utc::now() + Duration::seconds(SESSION_LIFETIME_SECONDS);
        Ok(self.open_session(&mut state, account.user, expires_at))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, InfraError> {
        let mut state = self.begin_request()?;
        let user_id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| InfraError::Auth("Invalid Refresh Token: Refresh Token Not Found".to_string()))?;
        let user = Self::find_user(&state, &user_id)
            .ok_or_else(|| InfraError::Auth("User not found".to_string()))?;
        let expires_at = Utc::now() + Duration::seconds(SESSION_LIFETIME_SECONDS);
        Ok(self.open_session(&mut state, user, expires_at))
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, InfraError> {
        let state = self.begin_request()?;
        state
            .access_tokens
            .get(access_token)
            .and_then(|user_id| Self::find_user(&state, user_id))
            .ok_or_else(|| InfraError::Auth("invalid JWT".to_string()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), InfraError> {
        let mut state = self.begin_request()?;
        state.access_tokens.remove(access_token);
        Ok(())
    }
}
