use crate::application::auth::{AuthService, AuthSettings, RestoreResult};
use crate::application::bootstrap::{bootstrap_workspace_with_lookup, BootstrapResult};
use crate::application::clock::{
    parse_timezone, spawn_locality_lookup, wall_clock, ClockReading, ClockTicker, CLOCK_PERIOD,
};
use crate::application::facade::DataFacade;
use crate::application::session::SessionContext;
use crate::application::views::analytics::{AnalyticsModel, AnalyticsView};
use crate::application::views::auth::{AuthMode, AuthModel, AuthView};
use crate::application::views::calendar::{CalendarModel, CalendarView};
use crate::application::views::events::{EventFilter, EventsModel, EventsView};
use crate::application::views::landing::{landing, LandingModel};
use crate::application::views::reminders::{RemindersModel, RemindersView};
use crate::application::views::settings::{SettingsModel, SettingsView};
use crate::application::views::sidebar::{logout, sidebar, SidebarModel};
use crate::application::views::{Notice, Route, ViewOutcome};
use crate::domain::forms::{CategoryForm, CredentialsForm, EventForm, ReminderForm};
use crate::domain::models::{AuthSession, UserPreferences};
use crate::infrastructure::auth_client::{AuthClient, ReqwestAuthClient};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::credential_store::{KeyringSessionStore, SessionStore};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::geocoding_client::{Coordinates, OpenCageGeocoder, ReverseGeocoder};
use crate::infrastructure::rest_client::{ReqwestRestClient, RestClient};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// State used by the desktop shell: keyring sessions and the HTTP backend.
pub type DesktopState = AppState<KeyringSessionStore, ReqwestAuthClient, ReqwestRestClient>;

#[derive(Debug)]
struct Views {
    auth: AuthView,
    calendar: CalendarView,
    events: EventsView,
    reminders: RemindersView,
    analytics: AnalyticsView,
    settings: SettingsView,
}

impl Views {
    fn new(today: NaiveDate) -> Self {
        Self {
            auth: AuthView::new(),
            calendar: CalendarView::new(today),
            events: EventsView::new(),
            reminders: RemindersView::new(),
            analytics: AnalyticsView::new(),
            settings: SettingsView::new(),
        }
    }
}

pub struct AppState<S, A, R>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    workspace_root: PathBuf,
    config: AppConfig,
    timezone: Option<Tz>,
    auth: AuthService<S, A>,
    facade: DataFacade<R>,
    geocoder: Option<Arc<dyn ReverseGeocoder>>,
    views: tokio::sync::Mutex<Views>,
    clock: Mutex<Option<ClockTicker>>,
}

impl DesktopState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        Self::new_with_lookup(workspace_root, |key| std::env::var(key).ok())
    }

    pub fn new_with_lookup<F>(workspace_root: PathBuf, lookup: F) -> Result<Self, InfraError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bootstrap = bootstrap_workspace_with_lookup(&workspace_root, lookup)?;
        let endpoint = bootstrap.config.backend_endpoint()?;
        let geocoder = bootstrap.config.geocoding_api_key().map(|api_key| {
            Arc::new(OpenCageGeocoder::new(
                bootstrap.config.geocoding.endpoint.clone(),
                api_key,
            )) as Arc<dyn ReverseGeocoder>
        });

        Self::with_services(
            bootstrap,
            Arc::new(KeyringSessionStore::default()),
            Arc::new(ReqwestAuthClient::new(&endpoint)),
            Arc::new(ReqwestRestClient::new(&endpoint)),
            geocoder,
        )
    }
}

/// Reported to the window on start; `error` is set when the shell came up without a backend.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StartupStatus {
    pub error: Option<String>,
}

/// Builds the desktop state without aborting: a configuration problem is
/// logged and surfaced through [`StartupStatus`] instead.
pub fn initialize_desktop_state<F>(
    workspace_root: PathBuf,
    lookup: F,
) -> (Option<DesktopState>, StartupStatus)
where
    F: Fn(&str) -> Option<String>,
{
    match DesktopState::new_with_lookup(workspace_root, lookup) {
        Ok(state) => (Some(state), StartupStatus::default()),
        Err(error) => {
            tracing::error!(%error, "app state unavailable");
            (
                None,
                StartupStatus {
                    error: Some(error.user_message()),
                },
            )
        }
    }
}

impl<S, A, R> AppState<S, A, R>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    pub fn with_services(
        bootstrap: BootstrapResult,
        session_store: Arc<S>,
        auth_client: Arc<A>,
        rest_client: Arc<R>,
        geocoder: Option<Arc<dyn ReverseGeocoder>>,
    ) -> Result<Self, InfraError> {
        let config = bootstrap.config;
        let timezone = config.timezone.as_deref().map(parse_timezone).transpose()?;
        let backend_url = config
            .backend
            .url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .unwrap_or_default();
        let auth = AuthService::new(
            AuthSettings {
                backend_url,
                site_url: config.site_url.clone(),
            },
            session_store,
            auth_client,
            SessionContext::new(),
        );
        let today = wall_clock(timezone).date();

        Ok(Self {
            workspace_root: bootstrap.workspace_root,
            config,
            timezone,
            auth,
            facade: DataFacade::new(rest_client),
            geocoder,
            views: tokio::sync::Mutex::new(Views::new(today)),
            clock: Mutex::new(None),
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session_context(&self) -> &SessionContext {
        self.auth.context()
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.user_message()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        tracing::info!(command, "{message}");
    }

    pub fn log_error(&self, command: &str, message: &str) {
        tracing::error!(command, "{message}");
    }

    async fn session(&self) -> Result<Option<AuthSession>, InfraError> {
        self.auth.active_session().await
    }

    fn today(&self) -> NaiveDate {
        wall_clock(self.timezone).date()
    }

    fn clock_slot(&self) -> MutexGuard<'_, Option<ClockTicker>> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What every page command returns: either a model to render or a route to go to.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ViewResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Route>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

impl<T> ViewResponse<T> {
    fn with_notices(mut self, notices: Vec<Notice>) -> Self {
        self.notices.extend(notices);
        self
    }
}

impl<T> From<ViewOutcome<T>> for ViewResponse<T> {
    fn from(outcome: ViewOutcome<T>) -> Self {
        match outcome {
            ViewOutcome::Ready(model) => Self {
                redirect: None,
                model: Some(model),
                notices: Vec::new(),
            },
            ViewOutcome::Redirect(route) => Self {
                redirect: Some(route),
                model: None,
                notices: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionStatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl SessionStatusResponse {
    fn from_session(status: &str, session: Option<&AuthSession>) -> Self {
        Self {
            status: status.to_string(),
            email: session.and_then(|session| session.user.email.clone()),
            expires_at: session.map(|session| session.expires_at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NavigationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Route>,
    pub sidebar: SidebarModel,
}

pub async fn restore_session_impl<S, A, R>(
    state: &AppState<S, A, R>,
) -> Result<SessionStatusResponse, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let response = match state.auth.restore_session().await? {
        RestoreResult::Existing(session) => SessionStatusResponse::from_session("existing", Some(&session)),
        RestoreResult::Refreshed(session) => SessionStatusResponse::from_session("refreshed", Some(&session)),
        RestoreResult::SignedOut => SessionStatusResponse::from_session("signed_out", None),
    };
    state.log_info("restore_session", &format!("status={}", response.status));
    Ok(response)
}

/// Resolves a front-end path to a route, applying the session guard.
pub async fn navigate_impl<S, A, R>(
    state: &AppState<S, A, R>,
    path: String,
) -> Result<NavigationResponse, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let requested = Route::from_path(&path)
        .ok_or_else(|| InfraError::Validation(format!("unknown page: {path}")))?;
    let redirect = match (requested, session.is_some()) {
        (route, false) if route.requires_session() => Some(Route::Auth),
        (Route::Landing | Route::Auth, true) => Some(Route::Dashboard),
        _ => None,
    };
    let current = redirect.unwrap_or(requested);
    Ok(NavigationResponse {
        redirect,
        sidebar: sidebar(current, session.as_ref()),
    })
}

pub async fn landing_impl<S, A, R>(state: &AppState<S, A, R>) -> Result<ViewResponse<LandingModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    Ok(landing(session.as_ref(), &state.config.app_name).into())
}

pub async fn auth_open_impl<S, A, R>(
    state: &AppState<S, A, R>,
    mode: Option<AuthMode>,
) -> Result<ViewResponse<AuthModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    state.session().await?;
    let mut views = state.views.lock().await;
    if let Some(mode) = mode {
        views.auth.set_mode(mode);
    }
    Ok(views.auth.open(&state.auth).into())
}

pub async fn auth_submit_impl<S, A, R>(
    state: &AppState<S, A, R>,
    form: CredentialsForm,
) -> Result<ViewResponse<AuthModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let mut views = state.views.lock().await;
    let mode = views.auth.mode();
    let outcome = views.auth.submit(&state.auth, form).await;
    let notices = views.auth.take_notices();
    if outcome.redirect().is_some() {
        state.log_info("auth_submit", &format!("signed in via {mode:?}"));
    }
    Ok(ViewResponse::from(outcome).with_notices(notices))
}

pub async fn provider_sign_in_url_impl<S, A, R>(
    state: &AppState<S, A, R>,
    provider: String,
) -> Result<String, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let provider = provider.trim();
    if provider.is_empty() {
        return Err(InfraError::Validation("provider must not be empty".to_string()));
    }
    let mut views = state.views.lock().await;
    views.auth.provider_url(&state.auth, provider)
}

pub async fn complete_provider_sign_in_impl<S, A, R>(
    state: &AppState<S, A, R>,
    callback_url: String,
) -> Result<SessionStatusResponse, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.auth.complete_provider_sign_in(&callback_url).await?;
    state.log_info(
        "complete_provider_sign_in",
        &format!("signed in user_id={}", session.user_id()),
    );
    Ok(SessionStatusResponse::from_session("signed_in", Some(&session)))
}

pub async fn logout_impl<S, A, R>(state: &AppState<S, A, R>) -> Result<ViewResponse<()>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let (route, notice) = logout(&state.auth).await;
    state.log_info("logout", "session cleared");
    Ok(ViewResponse {
        redirect: Some(route),
        model: None,
        notices: vec![notice],
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthStep {
    Previous,
    Next,
}

pub async fn calendar_load_impl<S, A, R>(
    state: &AppState<S, A, R>,
    step: Option<MonthStep>,
) -> Result<ViewResponse<CalendarModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    views.calendar.set_today(state.today());
    let outcome = match step {
        Some(MonthStep::Previous) => views.calendar.previous_month(&state.facade, session.as_ref()).await,
        Some(MonthStep::Next) => views.calendar.next_month(&state.facade, session.as_ref()).await,
        None => views.calendar.refresh(&state.facade, session.as_ref()).await,
    };
    Ok(outcome.into())
}

pub async fn calendar_select_day_impl<S, A, R>(
    state: &AppState<S, A, R>,
    date: Option<NaiveDate>,
) -> Result<ViewResponse<CalendarModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    if state.session().await?.is_none() {
        return Ok(ViewOutcome::<CalendarModel>::Redirect(Route::Auth).into());
    }
    let mut views = state.views.lock().await;
    let model = match date {
        Some(date) => views.calendar.select_day(date),
        None => views.calendar.clear_selection(),
    };
    Ok(ViewOutcome::Ready(model).into())
}

pub async fn calendar_add_event_impl<S, A, R>(
    state: &AppState<S, A, R>,
    form: EventForm,
) -> Result<ViewResponse<CalendarModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views.calendar.add_event(&state.facade, session.as_ref(), form).await.into())
}

pub async fn calendar_delete_event_impl<S, A, R>(
    state: &AppState<S, A, R>,
    event_id: String,
) -> Result<ViewResponse<CalendarModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views
        .calendar
        .delete_event(&state.facade, session.as_ref(), event_id.trim())
        .await
        .into())
}

pub async fn calendar_toggle_event_impl<S, A, R>(
    state: &AppState<S, A, R>,
    event_id: String,
) -> Result<ViewResponse<CalendarModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views
        .calendar
        .toggle_complete(&state.facade, session.as_ref(), event_id.trim())
        .await
        .into())
}

pub async fn events_load_impl<S, A, R>(state: &AppState<S, A, R>) -> Result<ViewResponse<EventsModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views.events.refresh(&state.facade, session.as_ref()).await.into())
}

pub async fn events_filter_impl<S, A, R>(
    state: &AppState<S, A, R>,
    filter: EventFilter,
) -> Result<ViewResponse<EventsModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    if state.session().await?.is_none() {
        return Ok(ViewOutcome::<EventsModel>::Redirect(Route::Auth).into());
    }
    let mut views = state.views.lock().await;
    Ok(ViewOutcome::Ready(views.events.set_filter(filter)).into())
}

pub async fn events_add_impl<S, A, R>(
    state: &AppState<S, A, R>,
    form: EventForm,
) -> Result<ViewResponse<EventsModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views.events.add_event(&state.facade, session.as_ref(), form).await.into())
}

pub async fn events_update_impl<S, A, R>(
    state: &AppState<S, A, R>,
    event_id: String,
    form: EventForm,
) -> Result<ViewResponse<EventsModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views
        .events
        .update_event(&state.facade, session.as_ref(), event_id.trim(), form)
        .await
        .into())
}

pub async fn events_delete_impl<S, A, R>(
    state: &AppState<S, A, R>,
    event_id: String,
) -> Result<ViewResponse<EventsModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views
        .events
        .delete_event(&state.facade, session.as_ref(), event_id.trim())
        .await
        .into())
}

pub async fn reminders_load_impl<S, A, R>(
    state: &AppState<S, A, R>,
) -> Result<ViewResponse<RemindersModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views.reminders.refresh(&state.facade, session.as_ref()).await.into())
}

pub async fn reminders_add_impl<S, A, R>(
    state: &AppState<S, A, R>,
    form: ReminderForm,
) -> Result<ViewResponse<RemindersModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views
        .reminders
        .add_reminder(&state.facade, session.as_ref(), form)
        .await
        .into())
}

pub async fn reminders_toggle_impl<S, A, R>(
    state: &AppState<S, A, R>,
    reminder_id: String,
) -> Result<ViewResponse<RemindersModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views
        .reminders
        .toggle_complete(&state.facade, session.as_ref(), reminder_id.trim())
        .await
        .into())
}

pub async fn reminders_delete_impl<S, A, R>(
    state: &AppState<S, A, R>,
    reminder_id: String,
) -> Result<ViewResponse<RemindersModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views
        .reminders
        .delete_reminder(&state.facade, session.as_ref(), reminder_id.trim())
        .await
        .into())
}

pub async fn analytics_load_impl<S, A, R>(
    state: &AppState<S, A, R>,
) -> Result<ViewResponse<AnalyticsModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views.analytics.refresh(&state.facade, session.as_ref()).await.into())
}

pub async fn settings_load_impl<S, A, R>(
    state: &AppState<S, A, R>,
) -> Result<ViewResponse<SettingsModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views.settings.refresh(&state.facade, session.as_ref()).await.into())
}

pub async fn settings_save_preferences_impl<S, A, R>(
    state: &AppState<S, A, R>,
    preferences: UserPreferences,
) -> Result<ViewResponse<SettingsModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views
        .settings
        .save_preferences(&state.facade, session.as_ref(), preferences)
        .await
        .into())
}

pub async fn settings_add_category_impl<S, A, R>(
    state: &AppState<S, A, R>,
    form: CategoryForm,
) -> Result<ViewResponse<SettingsModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views
        .settings
        .add_category(&state.facade, session.as_ref(), form)
        .await
        .into())
}

pub async fn settings_delete_category_impl<S, A, R>(
    state: &AppState<S, A, R>,
    category_id: String,
) -> Result<ViewResponse<SettingsModel>, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    let session = state.session().await?;
    let mut views = state.views.lock().await;
    Ok(views
        .settings
        .delete_category(&state.facade, session.as_ref(), category_id.trim())
        .await
        .into())
}

/// Starts (or restarts) the header clock; returns the first reading synchronously.
pub fn start_clock_impl<S, A, R, F>(state: &AppState<S, A, R>, on_tick: F) -> ClockReading
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
    F: Fn(ClockReading) + Send + Sync + 'static,
{
    let ticker = ClockTicker::start(CLOCK_PERIOD, state.timezone, on_tick);
    if let Some(mut previous) = state.clock_slot().replace(ticker) {
        previous.stop();
    }
    state.log_info("start_clock", "clock ticker running");
    ClockReading::at(wall_clock(state.timezone))
}

pub fn stop_clock_impl<S, A, R>(state: &AppState<S, A, R>) -> bool
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
{
    state.clock_slot().take().is_some()
}

/// Starts a locality lookup; `false` when geocoding is not configured.
pub fn lookup_locality_impl<S, A, R, F>(
    state: &AppState<S, A, R>,
    coordinates: Coordinates,
    on_found: F,
) -> Result<bool, InfraError>
where
    S: SessionStore,
    A: AuthClient,
    R: RestClient,
    F: FnOnce(String) + Send + 'static,
{
    coordinates.validate()?;
    let Some(geocoder) = state.geocoder.as_ref() else {
        return Ok(false);
    };
    spawn_locality_lookup(
        Arc::clone(geocoder),
        coordinates,
        Duration::from_secs(state.config.geocoding.timeout_seconds),
        on_found,
    );
    Ok(true)
}
