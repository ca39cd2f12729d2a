use crate::application::session::{SessionContext, SessionEvent};
use crate::domain::forms::CredentialsForm;
use crate::domain::models::AuthSession;
use crate::infrastructure::auth_client::{
    authorize_url, parse_redirect_tokens, AuthClient, SignUpOutcome,
};
use crate::infrastructure::credential_store::SessionStore;
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Sessions closer than this to expiry are refreshed before use.
pub const REFRESH_LEEWAY_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub backend_url: String,
    pub site_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreResult {
    Existing(AuthSession),
    Refreshed(AuthSession),
    SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpResult {
    SignedIn(AuthSession),
    ConfirmationSent,
}

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct AuthService<S, A>
where
    S: SessionStore,
    A: AuthClient,
{
    settings: AuthSettings,
    session_store: Arc<S>,
    auth_client: Arc<A>,
    context: SessionContext,
    now_provider: NowProvider,
    refresh_lock: AsyncMutex<()>,
}

impl<S, A> AuthService<S, A>
where
    S: SessionStore,
    A: AuthClient,
{
    pub fn new(
        settings: AuthSettings,
        session_store: Arc<S>,
        auth_client: Arc<A>,
        context: SessionContext,
    ) -> Self {
        Self {
            settings,
            session_store,
            auth_client,
            context,
            now_provider: Arc::new(Utc::now),
            refresh_lock: AsyncMutex::new(()),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn is_session_valid(&self, session: &AuthSession) -> bool {
        session.is_valid_at((self.now_provider)(), REFRESH_LEEWAY_SECONDS)
    }

    /// Loads the persisted session at startup and publishes it as the initial session.
    pub async fn restore_session(&self) -> Result<RestoreResult, InfraError> {
        let Some(stored) = self.session_store.load_session()? else {
            self.context.set(SessionEvent::InitialSession, None);
            return Ok(RestoreResult::SignedOut);
        };

        if self.is_session_valid(&stored) {
            self.context.set(SessionEvent::InitialSession, Some(stored.clone()));
            return Ok(RestoreResult::Existing(stored));
        }

        let _refreshing = self.refresh_lock.lock().await;
        match self.refresh(&stored).await? {
            Some(refreshed) => {
                self.context.set(SessionEvent::InitialSession, Some(refreshed.clone()));
                Ok(RestoreResult::Refreshed(refreshed))
            }
            None => {
                self.context.set(SessionEvent::InitialSession, None);
                Ok(RestoreResult::SignedOut)
            }
        }
    }

    /// The current session, refreshed first when it is about to expire.
    ///
    /// Refreshes are serialized: refresh tokens rotate, so a second caller
    /// waits and reuses whatever the first one stored.
    pub async fn active_session(&self) -> Result<Option<AuthSession>, InfraError> {
        let Some(current) = self.context.current() else {
            return Ok(None);
        };
        if self.is_session_valid(&current) {
            return Ok(Some(current));
        }

        let _refreshing = self.refresh_lock.lock().await;
        let Some(current) = self.context.current() else {
            return Ok(None);
        };
        if self.is_session_valid(&current) {
            return Ok(Some(current));
        }

        match self.refresh(&current).await? {
            Some(refreshed) => {
                self.context.set(SessionEvent::TokenRefreshed, Some(refreshed.clone()));
                Ok(Some(refreshed))
            }
            None => {
                self.context.set(SessionEvent::SignedOut, None);
                Ok(None)
            }
        }
    }

    pub async fn sign_up(&self, form: &CredentialsForm) -> Result<SignUpResult, InfraError> {
        form.validate()?;
        let outcome = self
            .auth_client
            .sign_up(form.email.trim(), &form.password, &self.settings.site_url)
            .await?;
        match outcome {
            SignUpOutcome::SessionStarted(session) => {
                self.start_session(session.clone())?;
                Ok(SignUpResult::SignedIn(session))
            }
            SignUpOutcome::ConfirmationRequired(user) => {
                tracing::info!(user_id = %user.id, "sign-up awaiting email confirmation");
                Ok(SignUpResult::ConfirmationSent)
            }
        }
    }

    pub async fn sign_in(&self, form: &CredentialsForm) -> Result<AuthSession, InfraError> {
        form.validate()?;
        let session = self
            .auth_client
            .sign_in_with_password(form.email.trim(), &form.password)
            .await?;
        self.start_session(session.clone())?;
        Ok(session)
    }

    pub fn provider_sign_in_url(&self, provider: &str) -> Result<String, InfraError> {
        authorize_url(&self.settings.backend_url, provider, &self.settings.site_url)
    }

    /// Finishes a third-party sign-in from the URL the auth server redirected to.
    pub async fn complete_provider_sign_in(&self, callback_url: &str) -> Result<AuthSession, InfraError> {
        let tokens = parse_redirect_tokens(callback_url)?;
        let user = self.auth_client.get_user(&tokens.access_token).await?;
        let session = tokens.into_session(user, (self.now_provider)());
        self.start_session(session.clone())?;
        Ok(session)
    }

    /// Always ends the local session; a failed remote sign-out is only logged.
    pub async fn sign_out(&self) -> Result<(), InfraError> {
        if let Some(current) = self.context.current() {
            if let Err(error) = self.auth_client.sign_out(&current.access_token).await {
                tracing::warn!(%error, "remote sign-out failed; clearing local session");
            }
        }
        self.session_store.delete_session()?;
        self.context.set(SessionEvent::SignedOut, None);
        Ok(())
    }

    fn start_session(&self, session: AuthSession) -> Result<(), InfraError> {
        self.session_store.save_session(&session)?;
        self.context.set(SessionEvent::SignedIn, Some(session));
        Ok(())
    }

    /// `Ok(None)` when the session cannot be renewed; the stored copy is then removed.
    async fn refresh(&self, stale: &AuthSession) -> Result<Option<AuthSession>, InfraError> {
        let Some(refresh_token) = stale.refresh_token.as_deref() else {
            self.session_store.delete_session()?;
            return Ok(None);
        };

        match self.auth_client.refresh_session(refresh_token).await {
            Ok(mut refreshed) => {
                if refreshed.refresh_token.is_none() {
                    refreshed.refresh_token = stale.refresh_token.clone();
                }
                self.session_store.save_session(&refreshed)?;
                Ok(Some(refreshed))
            }
            Err(error) => {
                tracing::warn!(%error, user_id = %stale.user_id(), "session refresh failed; signing out");
                self.session_store.delete_session()?;
                Ok(None)
            }
        }
    }
}
