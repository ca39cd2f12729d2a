use crate::domain::models::{AuthSession, AuthUser};
use crate::infrastructure::config::BackendEndpoint;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SessionStarted(AuthSession),
    ConfirmationRequired(AuthUser),
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
    ) -> Result<SignUpOutcome, InfraError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, InfraError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, InfraError>;

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, InfraError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestAuthClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, serde::Deserialize)]
struct SessionPayload {
    access_token: String,
    refresh_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: AuthUser,
}

impl SessionPayload {
    fn into_session(self, now: DateTime<Utc>) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in.unwrap_or(0).max(0)));
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            expires_at,
            user: self.user,
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
struct AuthErrorPayload {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ReqwestAuthClient {
    pub fn new(endpoint: &BackendEndpoint) -> Self {
        Self {
            client: Client::new(),
            base_url: endpoint.url.trim_end_matches('/').to_string(),
            anon_key: endpoint.anon_key.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<String, InfraError> {
        let response = request
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|error| InfraError::Network(format!("{action} request failed: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Network(format!("failed reading {action} response: {error}")))?;

        if !status.is_success() {
            return Err(auth_error(status.as_u16(), &body));
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<T, InfraError> {
        let body = self.send(request, action).await?;
        serde_json::from_str::<T>(&body)
            .map_err(|error| InfraError::Auth(format!("invalid {action} payload: {error}")))
    }
}

fn auth_error(status: u16, body: &str) -> InfraError {
    let payload = serde_json::from_str::<AuthErrorPayload>(body).unwrap_or_default();
    let message = payload
        .msg
        .or(payload.error_description)
        .or(payload.message)
        .or(payload.error)
        .unwrap_or_else(|| format!("auth endpoint error: http {status}"));
    InfraError::Auth(message)
}

#[async_trait]
impl AuthClient for ReqwestAuthClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
    ) -> Result<SignUpOutcome, InfraError> {
        let request = self
            .client
            .post(self.endpoint("signup"))
            .query(&[("redirect_to", redirect_to)])
            .json(&serde_json::json!({ "email": email, "password": password }));
        let body = self.send(request, "sign up").await?;
        let value: serde_json::Value = serde_json::from_str(&body)?;

        // Projects with email confirmation answer with the bare user object.
        if value.get("access_token").is_some() {
            let payload: SessionPayload = serde_json::from_value(value)?;
            return Ok(SignUpOutcome::SessionStarted(payload.into_session(Utc::now())));
        }
        let user: AuthUser = serde_json::from_value(value.get("user").cloned().unwrap_or(value))?;
        Ok(SignUpOutcome::ConfirmationRequired(user))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, InfraError> {
        let request = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }));
        let payload: SessionPayload = self.send_json(request, "sign in").await?;
        Ok(payload.into_session(Utc::now()))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, InfraError> {
        let request = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }));
        let payload: SessionPayload = self.send_json(request, "token refresh").await?;
        Ok(payload.into_session(Utc::now()))
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, InfraError> {
        let request = self.client.get(self.endpoint("user")).bearer_auth(access_token);
        self.send_json(request, "get user").await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), InfraError> {
        let request = self.client.post(self.endpoint("logout")).bearer_auth(access_token);
        self.send(request, "sign out").await.map(|_| ())
    }
}

/// URL the webview opens for third-party sign-in.
pub fn authorize_url(base_url: &str, provider: &str, redirect_to: &str) -> Result<String, InfraError> {
    let provider = provider.trim();
    if provider.is_empty() {
        return Err(InfraError::Validation("sign-in provider must not be empty".to_string()));
    }
    let mut url = Url::parse(&format!("{}/auth/v1/authorize", base_url.trim_end_matches('/')))
        .map_err(|error| InfraError::InvalidConfig(format!("invalid backend url: {error}")))?;
    url.query_pairs_mut()
        .append_pair("provider", provider)
        .append_pair("redirect_to", redirect_to);
    Ok(url.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub token_type: String,
}

impl RedirectTokens {
    pub fn into_session(self, user: AuthUser, now: DateTime<Utc>) -> AuthSession {
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_at: now + Duration::seconds(self.expires_in.max(0)),
            user,
        }
    }
}

/// Reads the session tokens the auth server appends to the redirect URL fragment.
pub fn parse_redirect_tokens(callback_url: &str) -> Result<RedirectTokens, InfraError> {
    let url = Url::parse(callback_url.trim())
        .map_err(|error| InfraError::Auth(format!("invalid sign-in callback url: {error}")))?;

    let mut pairs = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect::<Vec<_>>();
    if let Some(fragment) = url.fragment() {
        pairs.extend(
            url::form_urlencoded::parse(fragment.as_bytes())
                .map(|(key, value)| (key.into_owned(), value.into_owned())),
        );
    }
    let value_of = |name: &str| {
        pairs
            .iter()
            .find(|(key, value)| key == name && !value.trim().is_empty())
            .map(|(_, value)| value.clone())
    };

    if let Some(description) = value_of("error_description").or_else(|| value_of("error")) {
        return Err(InfraError::Auth(description));
    }
    let access_token = value_of("access_token")
        .ok_or_else(|| InfraError::Auth("sign-in callback is missing an access token".to_string()))?;
    let expires_in = match value_of("expires_in") {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| InfraError::Auth(format!("invalid expires_in in sign-in callback: {raw}")))?,
        None => 3600,
    };

    Ok(RedirectTokens {
        access_token,
        refresh_token: value_of("refresh_token"),
        expires_in,
        token_type: value_of("token_type").unwrap_or_else(|| "bearer".to_string()),
    })
}
