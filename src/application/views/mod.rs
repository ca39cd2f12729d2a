pub mod analytics;
pub mod auth;
pub mod calendar;
pub mod events;
pub mod landing;
pub mod reminders;
pub mod settings;
pub mod sidebar;

use crate::domain::models::AuthSession;
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    #[serde(rename = "/")]
    Landing,
    #[serde(rename = "/auth")]
    Auth,
    #[serde(rename = "/dashboard")]
    Dashboard,
    #[serde(rename = "/events")]
    Events,
    #[serde(rename = "/reminders")]
    Reminders,
    #[serde(rename = "/analytics")]
    Analytics,
    #[serde(rename = "/settings")]
    Settings,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::Landing,
        Route::Auth,
        Route::Dashboard,
        Route::Events,
        Route::Reminders,
        Route::Analytics,
        Route::Settings,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::Auth => "/auth",
            Self::Dashboard => "/dashboard",
            Self::Events => "/events",
            Self::Reminders => "/reminders",
            Self::Analytics => "/analytics",
            Self::Settings => "/settings",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim();
        let normalized = match trimmed.trim_end_matches('/') {
            "" => "/",
            other => other,
        };
        Self::ALL.into_iter().find(|route| route.path() == normalized)
    }

    /// Everything except the landing and auth pages needs a signed-in user.
    pub fn requires_session(self) -> bool {
        !matches!(self, Self::Landing | Self::Auth)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewPhase {
    #[default]
    Loading,
    Loaded,
    Mutating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient message shown to the user after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome<T> {
    Ready(T),
    Redirect(Route),
}

impl<T> ViewOutcome<T> {
    pub fn redirect(&self) -> Option<Route> {
        match self {
            Self::Redirect(route) => Some(*route),
            Self::Ready(_) => None,
        }
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Redirect(_) => None,
        }
    }
}

/// Guard for session-gated views: no session means redirect, before any query.
pub fn require_session(session: Option<&AuthSession>) -> Result<&AuthSession, Route> {
    session.ok_or(Route::Auth)
}

/// Phase and pending notices shared by every view.
#[derive(Debug, Clone, Default)]
pub struct ViewStatus {
    phase: ViewPhase,
    notices: Vec<Notice>,
}

impl ViewStatus {
    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    pub fn begin_load(&mut self) {
        if self.phase != ViewPhase::Mutating {
            self.phase = ViewPhase::Loading;
        }
    }

    pub fn begin_mutation(&mut self) {
        self.phase = ViewPhase::Mutating;
    }

    pub fn finish(&mut self) {
        self.phase = ViewPhase::Loaded;
    }

    pub fn succeed(&mut self, message: impl Into<String>) {
        self.notices.push(Notice::success(message));
    }

    pub fn notify_error(&mut self, message: impl Into<String>) {
        self.notices.push(Notice::error(message));
    }

    /// Validation errors keep their own text; other failures show `fallback`.
    pub fn fail(&mut self, action: &str, error: &InfraError, fallback: &str) {
        let message = match error {
            InfraError::Validation(message) => message.clone(),
            _ => fallback.to_string(),
        };
        self.report(action, error, message);
    }

    /// Like [`ViewStatus::fail`] but surfaces the backend's own message when it has one.
    pub fn fail_with_detail(&mut self, action: &str, error: &InfraError, fallback: &str) {
        let message = match error {
            InfraError::Validation(message) | InfraError::Auth(message) => message.clone(),
            InfraError::Backend { message, .. } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        };
        self.report(action, error, message);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    fn report(&mut self, action: &str, error: &InfraError, message: String) {
        if matches!(error, InfraError::Validation(_)) {
            tracing::debug!(action, %error, "rejected input");
        } else {
            tracing::error!(action, %error, "view action failed");
        }
        self.notices.push(Notice::error(message));
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::application::facade::DataFacade;
    use crate::domain::models::AuthSession;
    use crate::infrastructure::memory_backend::InMemoryBackend;
    use chrono::{Duration, NaiveDate, Utc};
    use std::sync::Arc;

    pub struct Harness {
        pub backend: Arc<InMemoryBackend>,
        pub facade: DataFacade<InMemoryBackend>,
        pub session: AuthSession,
    }

    pub fn harness() -> Harness {
        let backend = Arc::new(InMemoryBackend::new());
        let user = backend.register_user("a@example.com", "secret1").expect("register");
        let session = backend
            .issue_session(&user, Utc::now() + Duration::hours(1))
            .expect("session");
        Harness {
            facade: DataFacade::new(Arc::clone(&backend)),
            backend,
            session,
        }
    }

    pub fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }
}
