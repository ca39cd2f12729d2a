use crate::application::auth::AuthService;
use crate::application::views::{Notice, Route};
use crate::domain::models::AuthSession;
use crate::infrastructure::auth_client::AuthClient;
use crate::infrastructure::credential_store::SessionStore;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NavItem {
    pub key: &'static str,
    pub label: &'static str,
    pub route: Route,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SidebarModel {
    pub items: Vec<NavItem>,
    pub email: Option<String>,
}

// Dashboard and Calendar share a route; the key tells them apart.
const NAV_ITEMS: [(&str, &str, Route); 6] = [
    ("dashboard", "Dashboard", Route::Dashboard),
    ("calendar", "Calendar", Route::Dashboard),
    ("events", "Events", Route::Events),
    ("reminders", "Reminders", Route::Reminders),
    ("analytics", "Analytics", Route::Analytics),
    ("settings", "Settings", Route::Settings),
];

pub fn sidebar(current: Route, session: Option<&AuthSession>) -> SidebarModel {
    SidebarModel {
        items: NAV_ITEMS
            .into_iter()
            .map(|(key, label, route)| NavItem {
                key,
                label,
                route,
                active: route == current,
            })
            .collect(),
        email: session.and_then(|session| session.user.email.clone()),
    }
}

/// Logs out and always lands on the landing page.
pub async fn logout<S: SessionStore, A: AuthClient>(service: &AuthService<S, A>) -> (Route, Notice) {
    match service.sign_out().await {
        Ok(()) => (Route::Landing, Notice::success("Logged out successfully")),
        Err(error) => {
            tracing::error!(%error, "logout failed");
            (Route::Landing, Notice::error("Error logging out"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::auth::AuthSettings;
    use crate::application::session::{SessionContext, SessionEvent};
    use crate::application::views::test_support::harness;
    use crate::infrastructure::credential_store::InMemorySessionStore;
    use std::sync::Arc;

    #[test]
    fn current_route_is_highlighted_and_email_shown() {
        let harness = harness();
        let model = sidebar(Route::Events, Some(&harness.session));
        let active = model
            .items
            .iter()
            .filter(|item| item.active)
            .map(|item| item.key)
            .collect::<Vec<_>>();
        assert_eq!(active, vec!["events"]);
        assert_eq!(model.email.as_deref(), Some("a@example.com"));
    }

    #[tokio::test]
    async fn logout_clears_session_context() {
        let harness = harness();
        let context = SessionContext::new();
        context.set(SessionEvent::SignedIn, Some(harness.session.clone()));
        let service = AuthService::new(
            AuthSettings {
                backend_url: "https://demo.supabase.co".to_string(),
                site_url: "tauri://localhost".to_string(),
            },
            Arc::new(InMemorySessionStore::with_session(harness.session.clone())),
            Arc::clone(&harness.backend),
            context.clone(),
        );

        let (route, notice) = logout(&service).await;
        assert_eq!(route, Route::Landing);
        assert_eq!(notice, Notice::success("Logged out successfully"));
        assert!(!context.is_signed_in());
    }
}
