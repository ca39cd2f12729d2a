pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
mod desktop {
    use crate::application::bootstrap::bootstrap_workspace;
    use crate::application::clock::ClockReading;
    use crate::application::commands::{
        analytics_load_impl, auth_open_impl, auth_submit_impl, calendar_add_event_impl,
        calendar_delete_event_impl, calendar_load_impl, calendar_select_day_impl,
        calendar_toggle_event_impl, complete_provider_sign_in_impl, events_add_impl,
        events_delete_impl, events_filter_impl, events_load_impl, events_update_impl,
        landing_impl, logout_impl, lookup_locality_impl, navigate_impl,
        provider_sign_in_url_impl, reminders_add_impl, reminders_delete_impl,
        reminders_load_impl, reminders_toggle_impl, restore_session_impl,
        settings_add_category_impl, settings_delete_category_impl, settings_load_impl,
        initialize_desktop_state, settings_save_preferences_impl, start_clock_impl,
        stop_clock_impl, DesktopState, MonthStep, NavigationResponse, SessionStatusResponse,
        StartupStatus, ViewResponse,
    };
    use crate::application::views::analytics::AnalyticsModel;
    use crate::application::views::auth::{AuthMode, AuthModel};
    use crate::application::views::calendar::CalendarModel;
    use crate::application::views::events::{EventFilter, EventsModel};
    use crate::application::views::landing::LandingModel;
    use crate::application::views::reminders::RemindersModel;
    use crate::application::views::settings::SettingsModel;
    use crate::domain::forms::{CategoryForm, CredentialsForm, EventForm, ReminderForm};
    use crate::domain::models::UserPreferences;
    use crate::infrastructure::geocoding_client::Coordinates;
    use crate::infrastructure::logging::init_command_log;
    use chrono::NaiveDate;
    use serde::Serialize;
    use std::path::PathBuf;
    use tauri::{AppHandle, Emitter};

    const CLOCK_TICK_EVENT: &str = "clock-tick";
    const LOCALITY_RESOLVED_EVENT: &str = "locality-resolved";

    type State<'a> = tauri::State<'a, DesktopState>;

    #[derive(Debug, Serialize)]
    struct BootstrapResponse {
        workspace_root: String,
        log_path: String,
    }

    #[tauri::command]
    fn bootstrap(root: Option<String>) -> Result<BootstrapResponse, String> {
        let workspace_root = match root {
            Some(path) => PathBuf::from(path),
            None => std::env::current_dir().map_err(|error| error.to_string())?,
        };

        let result = bootstrap_workspace(&workspace_root).map_err(|error| error.to_string())?;
        Ok(BootstrapResponse {
            workspace_root: result.workspace_root.display().to_string(),
            log_path: result.log_path.display().to_string(),
        })
    }

    #[tauri::command]
    fn startup_status(status: tauri::State<'_, StartupStatus>) -> StartupStatus {
        status.inner().clone()
    }

    #[tauri::command]
    fn ping() -> &'static str {
        "pong"
    }

    #[tauri::command]
    async fn restore_session(state: State<'_>) -> Result<SessionStatusResponse, String> {
        restore_session_impl(state.inner())
            .await
            .map_err(|error| state.command_error("restore_session", &error))
    }

    #[tauri::command]
    async fn navigate(state: State<'_>, path: String) -> Result<NavigationResponse, String> {
        navigate_impl(state.inner(), path)
            .await
            .map_err(|error| state.command_error("navigate", &error))
    }

    #[tauri::command]
    async fn load_landing(state: State<'_>) -> Result<ViewResponse<LandingModel>, String> {
        landing_impl(state.inner())
            .await
            .map_err(|error| state.command_error("load_landing", &error))
    }

    #[tauri::command]
    async fn open_auth(state: State<'_>, mode: Option<AuthMode>) -> Result<ViewResponse<AuthModel>, String> {
        auth_open_impl(state.inner(), mode)
            .await
            .map_err(|error| state.command_error("open_auth", &error))
    }

    #[tauri::command]
    async fn submit_credentials(
        state: State<'_>,
        form: CredentialsForm,
    ) -> Result<ViewResponse<AuthModel>, String> {
        auth_submit_impl(state.inner(), form)
            .await
            .map_err(|error| state.command_error("submit_credentials", &error))
    }

    #[tauri::command]
    async fn provider_sign_in_url(state: State<'_>, provider: String) -> Result<String, String> {
        provider_sign_in_url_impl(state.inner(), provider)
            .await
            .map_err(|error| state.command_error("provider_sign_in_url", &error))
    }

    #[tauri::command]
    async fn complete_provider_sign_in(
        state: State<'_>,
        callback_url: String,
    ) -> Result<SessionStatusResponse, String> {
        complete_provider_sign_in_impl(state.inner(), callback_url)
            .await
            .map_err(|error| state.command_error("complete_provider_sign_in", &error))
    }

    #[tauri::command]
    async fn logout(state: State<'_>) -> Result<ViewResponse<()>, String> {
        logout_impl(state.inner())
            .await
            .map_err(|error| state.command_error("logout", &error))
    }

    #[tauri::command]
    async fn load_calendar(
        state: State<'_>,
        step: Option<MonthStep>,
    ) -> Result<ViewResponse<CalendarModel>, String> {
        calendar_load_impl(state.inner(), step)
            .await
            .map_err(|error| state.command_error("load_calendar", &error))
    }

    #[tauri::command]
    async fn select_calendar_day(
        state: State<'_>,
        date: Option<NaiveDate>,
    ) -> Result<ViewResponse<CalendarModel>, String> {
        calendar_select_day_impl(state.inner(), date)
            .await
            .map_err(|error| state.command_error("select_calendar_day", &error))
    }

    #[tauri::command]
    async fn add_calendar_event(
        state: State<'_>,
        form: EventForm,
    ) -> Result<ViewResponse<CalendarModel>, String> {
        calendar_add_event_impl(state.inner(), form)
            .await
            .map_err(|error| state.command_error("add_calendar_event", &error))
    }

    #[tauri::command]
    async fn delete_calendar_event(
        state: State<'_>,
        event_id: String,
    ) -> Result<ViewResponse<CalendarModel>, String> {
        calendar_delete_event_impl(state.inner(), event_id)
            .await
            .map_err(|error| state.command_error("delete_calendar_event", &error))
    }

    #[tauri::command]
    async fn toggle_calendar_event(
        state: State<'_>,
        event_id: String,
    ) -> Result<ViewResponse<CalendarModel>, String> {
        calendar_toggle_event_impl(state.inner(), event_id)
            .await
            .map_err(|error| state.command_error("toggle_calendar_event", &error))
    }

    #[tauri::command]
    async fn load_events(state: State<'_>) -> Result<ViewResponse<EventsModel>, String> {
        events_load_impl(state.inner())
            .await
            .map_err(|error| state.command_error("load_events", &error))
    }

    #[tauri::command]
    async fn filter_events(
        state: State<'_>,
        filter: EventFilter,
    ) -> Result<ViewResponse<EventsModel>, String> {
        events_filter_impl(state.inner(), filter)
            .await
            .map_err(|error| state.command_error("filter_events", &error))
    }

    #[tauri::command]
    async fn add_event(state: State<'_>, form: EventForm) -> Result<ViewResponse<EventsModel>, String> {
        events_add_impl(state.inner(), form)
            .await
            .map_err(|error| state.command_error("add_event", &error))
    }

    #[tauri::command]
    async fn update_event(
        state: State<'_>,
        event_id: String,
        form: EventForm,
    ) -> Result<ViewResponse<EventsModel>, String> {
        events_update_impl(state.inner(), event_id, form)
            .await
            .map_err(|error| state.command_error("update_event", &error))
    }

    #[tauri::command]
    async fn delete_event(state: State<'_>, event_id: String) -> Result<ViewResponse<EventsModel>, String> {
        events_delete_impl(state.inner(), event_id)
            .await
            .map_err(|error| state.command_error("delete_event", &error))
    }

    #[tauri::command]
    async fn load_reminders(state: State<'_>) -> Result<ViewResponse<RemindersModel>, String> {
        reminders_load_impl(state.inner())
            .await
            .map_err(|error| state.command_error("load_reminders", &error))
    }

    #[tauri::command]
    async fn add_reminder(
        state: State<'_>,
        form: ReminderForm,
    ) -> Result<ViewResponse<RemindersModel>, String> {
        reminders_add_impl(state.inner(), form)
            .await
            .map_err(|error| state.command_error("add_reminder", &error))
    }

    #[tauri::command]
    async fn toggle_reminder(
        state: State<'_>,
        reminder_id: String,
    ) -> Result<ViewResponse<RemindersModel>, String> {
        reminders_toggle_impl(state.inner(), reminder_id)
            .await
            .map_err(|error| state.command_error("toggle_reminder", &error))
    }

    #[tauri::command]
    async fn delete_reminder(
        state: State<'_>,
        reminder_id: String,
    ) -> Result<ViewResponse<RemindersModel>, String> {
        reminders_delete_impl(state.inner(), reminder_id)
            .await
            .map_err(|error| state.command_error("delete_reminder", &error))
    }

    #[tauri::command]
    async fn load_analytics(state: State<'_>) -> Result<ViewResponse<AnalyticsModel>, String> {
        analytics_load_impl(state.inner())
            .await
            .map_err(|error| state.command_error("load_analytics", &error))
    }

    #[tauri::command]
    async fn load_settings(state: State<'_>) -> Result<ViewResponse<SettingsModel>, String> {
        settings_load_impl(state.inner())
            .await
            .map_err(|error| state.command_error("load_settings", &error))
    }

    #[tauri::command]
    async fn save_preferences(
        state: State<'_>,
        preferences: UserPreferences,
    ) -> Result<ViewResponse<SettingsModel>, String> {
        settings_save_preferences_impl(state.inner(), preferences)
            .await
            .map_err(|error| state.command_error("save_preferences", &error))
    }

    #[tauri::command]
    async fn add_category(
        state: State<'_>,
        form: CategoryForm,
    ) -> Result<ViewResponse<SettingsModel>, String> {
        settings_add_category_impl(state.inner(), form)
            .await
            .map_err(|error| state.command_error("add_category", &error))
    }

    #[tauri::command]
    async fn delete_category(
        state: State<'_>,
        category_id: String,
    ) -> Result<ViewResponse<SettingsModel>, String> {
        settings_delete_category_impl(state.inner(), category_id)
            .await
            .map_err(|error| state.command_error("delete_category", &error))
    }

    #[tauri::command]
    async fn start_clock(app: AppHandle, state: State<'_>) -> Result<ClockReading, String> {
        Ok(start_clock_impl(state.inner(), move |reading| {
            if let Err(error) = app.emit(CLOCK_TICK_EVENT, reading) {
                tracing::warn!(%error, "failed to emit clock tick");
            }
        }))
    }

    #[tauri::command]
    fn stop_clock(state: State<'_>) -> bool {
        stop_clock_impl(state.inner())
    }

    // Async so the lookup task is spawned on the runtime.
    #[tauri::command]
    async fn lookup_locality(
        app: AppHandle,
        state: State<'_>,
        coordinates: Coordinates,
    ) -> Result<bool, String> {
        lookup_locality_impl(state.inner(), coordinates, move |locality| {
            if let Err(error) = app.emit(LOCALITY_RESOLVED_EVENT, locality) {
                tracing::warn!(%error, "failed to emit locality");
            }
        })
        .map_err(|error| state.command_error("lookup_locality", &error))
    }

    pub fn run() {
        let workspace_root = std::env::current_dir().expect("failed to resolve current directory");
        match init_command_log(&workspace_root.join("logs")) {
            Ok(true) => tracing::info!("command log initialized"),
            Ok(false) => {}
            Err(error) => eprintln!("command log unavailable: {error}"),
        }

        // Without a backend the window still opens and shows the startup error.
        let (app_state, startup) = initialize_desktop_state(workspace_root, |key| std::env::var(key).ok());
        if let Some(message) = &startup.error {
            eprintln!("TimeScape started without a backend: {message}");
        }
        let mut builder = tauri::Builder::default().manage(startup);
        if let Some(app_state) = app_state {
            builder = builder.manage(app_state);
        }

        builder
            .invoke_handler(tauri::generate_handler![
                startup_status,
                ping,
                bootstrap,
                restore_session,
                navigate,
                load_landing,
                open_auth,
                submit_credentials,
                provider_sign_in_url,
                complete_provider_sign_in,
                logout,
                load_calendar,
                select_calendar_day,
                add_calendar_event,
                delete_calendar_event,
                toggle_calendar_event,
                load_events,
                filter_events,
                add_event,
                update_event,
                delete_event,
                load_reminders,
                add_reminder,
                toggle_reminder,
                delete_reminder,
                load_analytics,
                load_settings,
                save_preferences,
                add_category,
                delete_category,
                start_clock,
                stop_clock,
                lookup_locality
            ])
            .run(tauri::generate_context!())
            .expect("failed to run tauri app");
    }
}
