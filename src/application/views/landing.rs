use crate::application::views::{Route, ViewOutcome};
use crate::domain::models::AuthSession;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CallToAction {
    pub label: &'static str,
    pub target: Route,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LandingModel {
    pub app_name: String,
    pub actions: Vec<CallToAction>,
}

/// Marketing page; signed-in users go straight to the dashboard.
pub fn landing(session: Option<&AuthSession>, app_name: &str) -> ViewOutcome<LandingModel> {
    if session.is_some() {
        return ViewOutcome::Redirect(Route::Dashboard);
    }
    ViewOutcome::Ready(LandingModel {
        app_name: app_name.to_string(),
        actions: ["Get Started", "Start Free", "Sign In"]
            .into_iter()
            .map(|label| CallToAction {
                label,
                target: Route::Auth,
            })
            .collect(),
    })
}
