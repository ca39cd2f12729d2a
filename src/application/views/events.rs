use crate::application::facade::DataFacade;
use crate::application::views::{require_session, Notice, ViewOutcome, ViewPhase, ViewStatus};
use crate::domain::formatting::{date_time_label, format_full_date};
use crate::domain::forms::EventForm;
use crate::domain::models::{AuthSession, Event};
use crate::infrastructure::rest_client::RestClient;
use serde::{Deserialize, Serialize};

pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl EventFilter {
    /// Title contains the search term, ignoring case, and the category matches exactly
    /// unless the filter is `all`.
    pub fn matches(&self, event: &Event) -> bool {
        let needle = self.search.trim().to_lowercase();
        let title_matches = needle.is_empty() || event.title.to_lowercase().contains(&needle);
        let category_matches = match self.category.as_deref() {
            None | Some(ALL_CATEGORIES) => true,
            Some(wanted) => event.category.as_deref() == Some(wanted),
        };
        title_matches && category_matches
    }
}

/// Distinct non-empty categories in first-seen order.
pub fn distinct_categories(events: &[Event]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for category in events.iter().filter_map(|event| event.category.as_deref()) {
        if !category.is_empty() && !seen.iter().any(|known| known == category) {
            seen.push(category.to_string());
        }
    }
    seen
}

pub fn count_label(count: usize) -> String {
    if count == 1 {
        "1 Event".to_string()
    } else {
        format!("{count} Events")
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    pub when: String,
    pub category: Option<String>,
    pub reminder: bool,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventsModel {
    pub phase: ViewPhase,
    pub rows: Vec<EventRow>,
    pub count_label: String,
    pub category_options: Vec<String>,
    pub search: String,
    pub category_filter: String,
    pub notices: Vec<Notice>,
}

/// Every event of the user with a locally applied filter.
#[derive(Debug, Clone, Default)]
pub struct EventsView {
    events: Vec<Event>,
    filter: EventFilter,
    status: ViewStatus,
}

impl EventsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub async fn refresh<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
    ) -> ViewOutcome<EventsModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        self.load(facade, session).await;
        ViewOutcome::Ready(self.model())
    }

    /// Filtering is local; it never hits the backend.
    pub fn set_filter(&mut self, filter: EventFilter) -> EventsModel {
        self.filter = filter;
        self.model()
    }

    pub async fn add_event<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
        form: EventForm,
    ) -> ViewOutcome<EventsModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        self.status.begin_mutation();
        match facade.insert_event(session, form).await {
            Ok(_) => {
                self.status.succeed("Event added successfully!");
                self.load(facade, session).await;
            }
            Err(error) => {
                self.status.fail_with_detail("add_event", &error, "Failed to add event");
                self.status.finish();
            }
        }
        ViewOutcome::Ready(self.model())
    }

    pub async fn update_event<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
        event_id: &str,
        form: EventForm,
    ) -> ViewOutcome<EventsModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        self.status.begin_mutation();
        match facade.update_event(session, event_id, form).await {
            Ok(Some(_)) => {
                self.status.succeed("Event updated successfully!");
                self.load(facade, session).await;
            }
            Ok(None) => {
                tracing::warn!(event_id, "update matched no event");
                self.status.notify_error("Failed to update event");
                self.load(facade, session).await;
            }
            Err(error) => {
                self.status.fail_with_detail("update_event", &error, "Failed to update event");
                self.status.finish();
            }
        }
        ViewOutcome::Ready(self.model())
    }

    pub async fn delete_event<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
        event_id: &str,
    ) -> ViewOutcome<EventsModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        self.status.begin_mutation();
        match facade.delete_event(session, event_id).await {
            Ok(()) => {
                self.status.succeed("Event deleted");
                self.load(facade, session).await;
            }
            Err(error) => {
                self.status.fail("delete_event", &error, "Failed to delete event");
                self.status.finish();
            }
        }
        ViewOutcome::Ready(self.model())
    }

    async fn load<R: RestClient>(&mut self, facade: &DataFacade<R>, session: &AuthSession) {
        self.status.begin_load();
        match facade.list_events(session).await {
            Ok(events) => self.events = events,
            Err(error) => self.status.fail("load_events", &error, "Failed to load events"),
        }
        self.status.finish();
    }

    pub fn model(&mut self) -> EventsModel {
        let rows = self
            .events
            .iter()
            .filter(|event| self.filter.matches(event))
            .map(|event| EventRow {
                id: event.id.clone(),
                title: event.title.clone(),
                when: date_time_label(format_full_date(event.date), event.time.as_deref()),
                category: event.category.clone(),
                reminder: event.reminder,
                completed: event.completed,
            })
            .collect::<Vec<_>>();
        EventsModel {
            phase: self.status.phase(),
            count_label: count_label(rows.len()),
            rows,
            category_options: distinct_categories(&self.events),
            search: self.filter.search.clone(),
            category_filter: self
                .filter
                .category
                .clone()
                .unwrap_or_else(|| ALL_CATEGORIES.to_string()),
            notices: self.status.take_notices(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::views::test_support::{date, harness, Harness};
    use crate::application::views::Route;

    fn form(title: &str, day: &str, category: Option<&str>) -> EventForm {
        EventForm {
            title: title.to_string(),
            date: Some(date(day)),
            category: category.map(str::to_string),
            ..EventForm::default()
        }
    }

    async fn seeded() -> (Harness, EventsView) {
        let harness = harness();
        for (title, day, category) in [
            ("Team Sync", "2024-03-05", Some("Work")),
            ("dentist", "2024-03-01", Some("Appointment")),
            ("Sync notes", "2024-03-09", None),
            ("Quarterly sync", "2024-03-07", Some("Work")),
        ] {
            harness
                .facade
                .insert_event(&harness.session, form(title, day, category))
                .await
                .expect("insert");
        }
        let mut view = EventsView::new();
        view.refresh(&harness.facade, Some(&harness.session)).await;
        (harness, view)
    }

    #[test]
    fn count_label_is_singular_only_for_one() {
        assert_eq!(count_label(0), "0 Events");
        assert_eq!(count_label(1), "1 Event");
        assert_eq!(count_label(12), "12 Events");
    }

    #[tokio::test]
    async fn rows_are_date_ordered_with_full_date_labels() {
        let (_harness, mut view) = seeded().await;
        let model = view.model();
        let titles = model.rows.iter().map(|row| row.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, vec!["dentist", "Team Sync", "Quarterly sync", "Sync notes"]);
        assert_eq!(model.rows[0].when, "Fri, Mar 1, 2024");
        assert_eq!(model.count_label, "4 Events");
        assert_eq!(model.category_options, vec!["Appointment", "Work"]);
    }

    #[tokio::test]
    async fn search_and_category_filter_combine() {
        let (harness, mut view) = seeded().await;
        let requests = harness.backend.request_count();

        let by_title = view.set_filter(EventFilter {
            search: "SYNC".to_string(),
            category: None,
        });
        assert_eq!(by_title.count_label, "3 Events");

        let narrowed = view.set_filter(EventFilter {
            search: "sync".to_string(),
            category: Some("Work".to_string()),
        });
        assert_eq!(narrowed.count_label, "2 Events");

        let all = view.set_filter(EventFilter {
            search: String::new(),
            category: Some(ALL_CATEGORIES.to_string()),
        });
        assert_eq!(all.rows.len(), 4);
        assert_eq!(harness.backend.request_count(), requests);
    }

    #[tokio::test]
    async fn edit_then_delete_refreshes_rows() {
        let (harness, mut view) = seeded().await;
        let target = view.events()[0].id.clone();

        let edited = view
            .update_event(
                &harness.facade,
                Some(&harness.session),
                &target,
                form("Dentist (moved)", "2024-03-20", Some("Appointment")),
            )
            .await
            .ready()
            .expect("ready");
        assert_eq!(edited.notices, vec![Notice::success("Event updated successfully!")]);
        assert_eq!(edited.rows.last().map(|row| row.title.as_str()), Some("Dentist (moved)"));

        let deleted = view
            .delete_event(&harness.facade, Some(&harness.session), &target)
            .await
            .ready()
            .expect("ready");
        assert_eq!(deleted.notices, vec![Notice::success("Event deleted")]);
        assert_eq!(deleted.count_label, "3 Events");
    }

    #[tokio::test]
    async fn backend_error_on_add_surfaces_its_message() {
        let (harness, mut view) = seeded().await;
        harness.backend.set_offline(true);
        let model = view
            .add_event(&harness.facade, Some(&harness.session), form("Offline", "2024-03-02", None))
            .await
            .ready()
            .expect("ready");
        assert_eq!(model.notices, vec![Notice::error("Failed to add event")]);
        assert_eq!(model.rows.len(), 4);
    }

    #[tokio::test]
    async fn signed_out_user_is_redirected() {
        let Harness { backend, facade, .. } = harness();
        let mut view = EventsView::new();
        let outcome = view.delete_event(&facade, None, "evt-1").await;
        assert_eq!(outcome.redirect(), Some(Route::Auth));
        assert_eq!(backend.request_count(), 0);
    }
}
