use crate::application::facade::DataFacade;
use crate::application::views::{require_session, Notice, ViewOutcome, ViewPhase, ViewStatus};
use crate::domain::forms::{CategoryForm, DEFAULT_CATEGORY_COLOR};
use crate::domain::models::{AuthSession, CustomCategory, UserPreferences};
use crate::infrastructure::rest_client::RestClient;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SettingsModel {
    pub phase: ViewPhase,
    pub email: Option<String>,
    pub preferences: UserPreferences,
    pub categories: Vec<CustomCategory>,
    pub categories_empty_message: Option<&'static str>,
    pub default_new_color: &'static str,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsView {
    preferences: Option<UserPreferences>,
    categories: Vec<CustomCategory>,
    status: ViewStatus,
}

impl SettingsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refresh<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
    ) -> ViewOutcome<SettingsModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        self.status.begin_load();
        match facade.get_preferences(session).await {
            Ok(preferences) => self.preferences = preferences,
            Err(error) => tracing::error!(%error, "failed to load preferences"),
        }
        self.load_categories(facade, session).await;
        self.status.finish();
        ViewOutcome::Ready(self.model(session))
    }

    pub async fn save_preferences<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
        preferences: UserPreferences,
    ) -> ViewOutcome<SettingsModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        self.status.begin_mutation();
        match facade.upsert_preferences(session, preferences).await {
            Ok(saved) => {
                self.preferences = Some(saved);
                self.status.succeed("Preferences saved");
            }
            Err(error) => self.status.fail("save_preferences", &error, "Failed to save preferences"),
        }
        self.status.finish();
        ViewOutcome::Ready(self.model(session))
    }

    pub async fn add_category<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
        form: CategoryForm,
    ) -> ViewOutcome<SettingsModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        self.status.begin_mutation();
        match facade.insert_custom_category(session, form).await {
            Ok(_) => {
                self.status.succeed("Category added");
                self.load_categories(facade, session).await;
            }
            Err(error) => self.status.fail("add_category", &error, "Failed to add category"),
        }
        self.status.finish();
        ViewOutcome::Ready(self.model(session))
    }

    pub async fn delete_category<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
        category_id: &str,
    ) -> ViewOutcome<SettingsModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        self.status.begin_mutation();
        match facade.delete_custom_category(session, category_id).await {
            Ok(()) => {
                self.status.succeed("Category deleted");
                self.load_categories(facade, session).await;
            }
            Err(error) => self.status.fail("delete_category", &error, "Failed to delete category"),
        }
        self.status.finish();
        ViewOutcome::Ready(self.model(session))
    }

    async fn load_categories<R: RestClient>(&mut self, facade: &DataFacade<R>, session: &AuthSession) {
        match facade.list_custom_categories(session).await {
            Ok(categories) => self.categories = categories,
            Err(error) => self.status.fail("load_categories", &error, "Failed to load categories"),
        }
    }

    /// Defaults stand in until the user saves preferences for the first time.
    pub fn model(&mut self, session: &AuthSession) -> SettingsModel {
        SettingsModel {
            phase: self.status.phase(),
            email: session.user.email.clone(),
            preferences: self
                .preferences
                .clone()
                .unwrap_or_else(|| UserPreferences::defaults_for(session.user_id())),
            categories_empty_message: self
                .categories
                .is_empty()
                .then_some("No custom categories yet"),
            categories: self.categories.clone(),
            default_new_color: DEFAULT_CATEGORY_COLOR,
            notices: self.status.take_notices(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::views::test_support::harness;
    use crate::application::views::Route;
    use crate::domain::models::{DefaultView, Theme};

    #[tokio::test]
    async fn first_visit_shows_defaults_and_profile_email() {
        let harness = harness();
        let mut view = SettingsView::new();
        let model = view
            .refresh(&harness.facade, Some(&harness.session))
            .await
            .ready()
            .expect("ready");
        assert_eq!(model.email.as_deref(), Some("a@example.com"));
        assert_eq!(model.preferences, UserPreferences::defaults_for(harness.session.user_id()));
        assert_eq!(model.categories_empty_message, Some("No custom categories yet"));
        assert_eq!(model.default_new_color, "#3b82f6");
    }

    #[tokio::test]
    async fn saved_preferences_survive_a_fresh_view() {
        let harness = harness();
        let session = Some(&harness.session);
        let mut view = SettingsView::new();
        view.refresh(&harness.facade, session).await;

        let mut preferences = UserPreferences::defaults_for(harness.session.user_id());
        preferences.theme = Theme::Dark;
        preferences.default_view = DefaultView::Reminders;
        let saved = view
            .save_preferences(&harness.facade, session, preferences.clone())
            .await
            .ready()
            .expect("ready");
        assert_eq!(saved.notices, vec![Notice::success("Preferences saved")]);

        let mut fresh = SettingsView::new();
        let reloaded = fresh.refresh(&harness.facade, session).await.ready().expect("ready");
        assert_eq!(reloaded.preferences, preferences);
    }

    #[tokio::test]
    async fn categories_can_be_added_with_default_color_and_deleted() {
        let harness = harness();
        let session = Some(&harness.session);
        let mut view = SettingsView::new();
        let added = view
            .add_category(
                &harness.facade,
                session,
                CategoryForm {
                    name: "Study".to_string(),
                    color: None,
                },
            )
            .await
            .ready()
            .expect("ready");
        assert_eq!(added.notices, vec![Notice::success("Category added")]);
        assert_eq!(added.categories[0].color, DEFAULT_CATEGORY_COLOR);

        let id = added.categories[0].id.clone();
        let deleted = view
            .delete_category(&harness.facade, session, &id)
            .await
            .ready()
            .expect("ready");
        assert_eq!(deleted.notices, vec![Notice::success("Category deleted")]);
        assert!(deleted.categories.is_empty());
    }

    #[tokio::test]
    async fn save_failure_is_reported() {
        let harness = harness();
        harness.backend.set_offline(true);
        let mut view = SettingsView::new();
        let model = view
            .save_preferences(
                &harness.facade,
                Some(&harness.session),
                UserPreferences::defaults_for("someone"),
            )
            .await
            .ready()
            .expect("ready");
        assert_eq!(model.notices, vec![Notice::error("Failed to save preferences")]);
    }

    #[tokio::test]
    async fn signed_out_is_redirected() {
        let harness = harness();
        let mut view = SettingsView::new();
        let outcome = view
            .add_category(&harness.facade, None, CategoryForm::default())
            .await;
        assert_eq!(outcome.redirect(), Some(Route::Auth));
        assert_eq!(harness.backend.request_count(), 0);
    }
}
