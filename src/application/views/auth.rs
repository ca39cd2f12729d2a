use crate::application::auth::{AuthService, SignUpResult};
use crate::application::views::{Notice, Route, ViewOutcome, ViewPhase, ViewStatus};
use crate::domain::forms::CredentialsForm;
use crate::infrastructure::auth_client::AuthClient;
use crate::infrastructure::credential_store::SessionStore;
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};

const GENERIC_FAILURE: &str = "An error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuthModel {
    pub phase: ViewPhase,
    pub mode: AuthMode,
    pub notices: Vec<Notice>,
}

/// Email/password form plus third-party sign-in.
#[derive(Debug, Clone, Default)]
pub struct AuthView {
    mode: AuthMode,
    status: ViewStatus,
}

impl AuthView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn open<S: SessionStore, A: AuthClient>(&mut self, service: &AuthService<S, A>) -> ViewOutcome<AuthModel> {
        if service.context().is_signed_in() {
            return ViewOutcome::Redirect(Route::Dashboard);
        }
        self.status.finish();
        ViewOutcome::Ready(self.model())
    }

    pub fn set_mode(&mut self, mode: AuthMode) -> AuthModel {
        self.mode = mode;
        self.model()
    }

    /// Signs in or up depending on the current mode.
    pub async fn submit<S: SessionStore, A: AuthClient>(
        &mut self,
        service: &AuthService<S, A>,
        form: CredentialsForm,
    ) -> ViewOutcome<AuthModel> {
        self.status.begin_mutation();
        let outcome = match self.mode {
            AuthMode::SignIn => service.sign_in(&form).await.map(|_| Some(Route::Dashboard)),
            AuthMode::SignUp => service.sign_up(&form).await.map(|result| match result {
                SignUpResult::SignedIn(_) => Some(Route::Dashboard),
                SignUpResult::ConfirmationSent => None,
            }),
        };
        self.status.finish();
        match outcome {
            Ok(Some(route)) => {
                if self.mode == AuthMode::SignIn {
                    self.status.succeed("Welcome back!");
                }
                ViewOutcome::Redirect(route)
            }
            Ok(None) => {
                self.status.succeed("Check your email to confirm your account!");
                ViewOutcome::Ready(self.model())
            }
            Err(error) => {
                self.status.fail_with_detail("authenticate", &error, GENERIC_FAILURE);
                ViewOutcome::Ready(self.model())
            }
        }
    }

    /// URL to open in the system browser for a third-party provider.
    pub fn provider_url<S: SessionStore, A: AuthClient>(
        &mut self,
        service: &AuthService<S, A>,
        provider: &str,
    ) -> Result<String, InfraError> {
        service.provider_sign_in_url(provider).inspect_err(|error| {
            self.status.fail("provider_url", error, GENERIC_FAILURE);
        })
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.status.take_notices()
    }

    pub fn model(&mut self) -> AuthModel {
        AuthModel {
            phase: self.status.phase(),
            mode: self.mode,
            notices: self.status.take_notices(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::auth::AuthSettings;
    use crate::application::session::SessionContext;
    use crate::infrastructure::credential_store::InMemorySessionStore;
    use crate::infrastructure::memory_backend::InMemoryBackend;
    use std::sync::Arc;

    fn service(backend: &Arc<InMemoryBackend>) -> AuthService<InMemorySessionStore, InMemoryBackend> {
        AuthService::new(
            AuthSettings {
                backend_url: "https://demo.supabase.co".to_string(),
                site_url: "tauri://localhost".to_string(),
            },
            Arc::new(InMemorySessionStore::default()),
            Arc::clone(backend),
            SessionContext::new(),
        )
    }

    fn credentials(email: &str, password: &str) -> CredentialsForm {
        CredentialsForm {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn sign_in_redirects_to_dashboard_and_welcomes_back() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.register_user("a@example.com", "secret1").expect("register");
        let service = service(&backend);
        let mut view = AuthView::new();

        let outcome = view.submit(&service, credentials("a@example.com", "secret1")).await;
        assert_eq!(outcome.redirect(), Some(Route::Dashboard));
        assert_eq!(view.take_notices(), vec![Notice::success("Welcome back!")]);
        assert_eq!(view.open(&service).redirect(), Some(Route::Dashboard));
    }

    #[tokio::test]
    async fn wrong_password_shows_server_message() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.register_user("a@example.com", "secret1").expect("register");
        let service = service(&backend);
        let mut view = AuthView::new();

        let model = view
            .submit(&service, credentials("a@example.com", "wrong-password"))
            .await
            .ready()
            .expect("ready");
        assert_eq!(model.notices, vec![Notice::error("Invalid login credentials")]);
    }

    #[tokio::test]
    async fn sign_up_needing_confirmation_stays_on_page() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.require_email_confirmation(true);
        let service = service(&backend);
        let mut view = AuthView::new();
        view.set_mode(AuthMode::SignUp);

        let model = view
            .submit(&service, credentials("new@example.com", "secret1"))
            .await
            .ready()
            .expect("ready");
        assert_eq!(
            model.notices,
            vec![Notice::success("Check your email to confirm your account!")]
        );
        assert!(!service.context().is_signed_in());
    }

    #[tokio::test]
    async fn short_password_is_rejected_before_any_request() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = service(&backend);
        let mut view = AuthView::new();
        let model = view
            .submit(&service, credentials("a@example.com", "123"))
            .await
            .ready()
            .expect("ready");
        assert_eq!(
            model.notices,
            vec![Notice::error("Password must be at least 6 characters")]
        );
        assert_eq!(backend.request_count(), 0);
    }

    #[test]
    fn provider_url_points_at_authorize_endpoint() {
        let backend = Arc::new(InMemoryBackend::new());
        let service = service(&backend);
        let mut view = AuthView::new();
        let url = view.provider_url(&service, "github").expect("url");
        assert!(url.contains("/auth/v1/authorize?provider=github"));
    }
}
