use crate::application::facade::DataFacade;
use crate::application::views::{require_session, Notice, ViewOutcome, ViewPhase, ViewStatus};
use crate::domain::aggregation::{count_by_category, UNCATEGORIZED};
use crate::domain::category_colors::{category_options, resolve_category_color, CategoryOption};
use crate::domain::formatting::{
    date_time_label, format_dialog_date, format_long_date, format_month_year,
};
use crate::domain::forms::EventForm;
use crate::domain::models::{AuthSession, CustomCategory, Event};
use crate::domain::month_grid::{build_month_grid, first_of_month, last_of_month, shift_month, WEEKDAY_LABELS};
use crate::infrastructure::rest_client::RestClient;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

pub const MAX_CHIPS_PER_DAY: usize = 2;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventChip {
    pub id: String,
    pub title: String,
    pub color: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub day: u32,
    pub is_today: bool,
    pub is_selected: bool,
    pub chips: Vec<EventChip>,
    /// Label such as "+3 more" when the day has more events than chips.
    pub more_label: Option<String>,
    pub indicator_color: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UpcomingEvent {
    pub id: String,
    pub title: String,
    pub when: String,
    pub category: Option<String>,
    pub color: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryStat {
    pub name: String,
    pub count: usize,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarModel {
    pub phase: ViewPhase,
    pub month_label: String,
    pub weekday_labels: [&'static str; 7],
    pub cells: Vec<Option<DayCell>>,
    pub upcoming: Vec<UpcomingEvent>,
    pub category_stats: Vec<CategoryStat>,
    pub empty_message: Option<&'static str>,
    pub selected_date_label: Option<String>,
    pub category_options: Vec<CategoryOption>,
    pub notices: Vec<Notice>,
}

/// Month calendar shown on the dashboard.
#[derive(Debug, Clone)]
pub struct CalendarView {
    month: NaiveDate,
    today: NaiveDate,
    selected_date: Option<NaiveDate>,
    events: Vec<Event>,
    categories: Vec<CustomCategory>,
    status: ViewStatus,
}

impl CalendarView {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            month: first_of_month(today),
            today,
            selected_date: None,
            events: Vec::new(),
            categories: Vec::new(),
            status: ViewStatus::default(),
        }
    }

    pub fn month(&self) -> NaiveDate {
        self.month
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    pub async fn refresh<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
    ) -> ViewOutcome<CalendarModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        self.load(facade, session).await;
        ViewOutcome::Ready(self.model())
    }

    pub async fn previous_month<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
    ) -> ViewOutcome<CalendarModel> {
        self.month = shift_month(self.month, -1);
        self.refresh(facade, session).await
    }

    pub async fn next_month<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
    ) -> ViewOutcome<CalendarModel> {
        self.month = shift_month(self.month, 1);
        self.refresh(facade, session).await
    }

    /// Opens the add-event dialog for `date`; no query is issued.
    pub fn select_day(&mut self, date: NaiveDate) -> CalendarModel {
        self.selected_date = Some(date);
        self.model()
    }

    pub fn clear_selection(&mut self) -> CalendarModel {
        self.selected_date = None;
        self.model()
    }

    /// A form without a date falls back to the clicked day.
    pub async fn add_event<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
        mut form: EventForm,
    ) -> ViewOutcome<CalendarModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        if form.date.is_none() {
            form.date = self.selected_date;
        }
        self.status.begin_mutation();
        match facade.insert_event(session, form).await {
            Ok(_) => {
                self.status.succeed("Event added successfully!");
                self.selected_date = None;
                self.load(facade, session).await;
            }
            Err(error) => {
                self.status.fail_with_detail("add_event", &error, "Failed to add event");
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
    ) -> ViewOutcome<CalendarModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        self.status.begin_mutation();
        match facade.delete_event(session, event_id).await {
            Ok(()) => {
                self.status.succeed("Event deleted successfully");
                self.load(facade, session).await;
            }
            Err(error) => {
                self.status.fail("delete_event", &error, "Failed to delete event");
                self.status.finish();
            }
        }
        ViewOutcome::Ready(self.model())
    }

    pub async fn toggle_complete<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
        event_id: &str,
    ) -> ViewOutcome<CalendarModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        let Some(currently_completed) = self
            .events
            .iter()
            .find(|event| event.id == event_id)
            .map(|event| event.completed)
        else {
            tracing::warn!(event_id, "toggle requested for an event outside the loaded month");
            self.status.notify_error("Failed to update event");
            return ViewOutcome::Ready(self.model());
        };
        self.status.begin_mutation();
        match facade.set_event_completion(session, event_id, currently_completed).await {
            Ok(None) => {
                tracing::warn!(event_id, "completion toggle matched no event");
                self.status.notify_error("Failed to update event");
                self.load(facade, session).await;
            }
            Ok(Some(_)) => {
                self.status.succeed(if currently_completed {
                    "Event marked as incomplete"
                } else {
                    "Event marked as complete"
                });
                self.load(facade, session).await;
            }
            Err(error) => {
                self.status.fail("toggle_event", &error, "Failed to update event");
                self.status.finish();
            }
        }
        ViewOutcome::Ready(self.model())
    }

    // Stale events stay on screen when either fetch fails.
    async fn load<R: RestClient>(&mut self, facade: &DataFacade<R>, session: &AuthSession) {
        self.status.begin_load();
        let first = first_of_month(self.month);
        let last = last_of_month(self.month);
        match facade.list_events_between(session, first, last).await {
            Ok(events) => self.events = events,
            Err(error) => self.status.fail("load_events", &error, "Failed to load events"),
        }
        match facade.list_custom_categories(session).await {
            Ok(categories) => self.categories = categories,
            Err(error) => self.status.fail("load_categories", &error, "Failed to load custom categories"),
        }
        self.status.finish();
    }

    pub fn model(&mut self) -> CalendarModel {
        let cells = build_month_grid(self.month)
            .into_iter()
            .map(|cell| cell.map(|date| self.day_cell(date)))
            .collect();
        let upcoming = self
            .events
            .iter()
            .map(|event| UpcomingEvent {
                id: event.id.clone(),
                title: event.title.clone(),
                when: date_time_label(format_long_date(event.date), event.time.as_deref()),
                category: event.category.clone(),
                color: self.color_of(event.category.as_deref()),
                completed: event.completed,
            })
            .collect::<Vec<_>>();
        let category_stats = count_by_category(self.events.iter().map(|event| event.category.as_deref()))
            .into_iter()
            .map(|bucket| {
                let color = if bucket.name == UNCATEGORIZED {
                    self.color_of(None)
                } else {
                    self.color_of(Some(&bucket.name))
                };
                CategoryStat {
                    name: bucket.name,
                    count: bucket.count,
                    color,
                }
            })
            .collect();

        CalendarModel {
            phase: self.status.phase(),
            month_label: format_month_year(self.month),
            weekday_labels: WEEKDAY_LABELS,
            cells,
            empty_message: upcoming.is_empty().then_some("No events this month"),
            upcoming,
            category_stats,
            selected_date_label: self.selected_date.map(format_dialog_date),
            category_options: category_options(&self.categories),
            notices: self.status.take_notices(),
        }
    }

    fn day_cell(&self, date: NaiveDate) -> DayCell {
        let day_events = self
            .events
            .iter()
            .filter(|event| event.date == date)
            .collect::<Vec<_>>();
        let hidden = day_events.len().saturating_sub(MAX_CHIPS_PER_DAY);
        DayCell {
            date,
            day: date.day(),
            is_today: date == self.today,
            is_selected: self.selected_date == Some(date),
            chips: day_events
                .iter()
                .take(MAX_CHIPS_PER_DAY)
                .map(|event| EventChip {
                    id: event.id.clone(),
                    title: event.title.clone(),
                    color: self.color_of(event.category.as_deref()),
                    completed: event.completed,
                })
                .collect(),
            more_label: (hidden > 0).then(|| format!("+{hidden} more")),
            indicator_color: day_events
                .first()
                .map(|event| self.color_of(event.category.as_deref())),
        }
    }

    fn color_of(&self, category: Option<&str>) -> String {
        resolve_category_color(category, &self.categories).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::views::test_support::{date, harness, Harness};
    use crate::application::views::{NoticeKind, Route};
    use crate::domain::forms::CategoryForm;

    fn form(title: &str, day: &str, category: Option<&str>) -> EventForm {
        EventForm {
            title: title.to_string(),
            date: Some(date(day)),
            category: category.map(str::to_string),
            ..EventForm::default()
        }
    }

    fn cell_for(model: &CalendarModel, day: u32) -> DayCell {
        model
            .cells
            .iter()
            .flatten()
            .find(|cell| cell.day == day)
            .cloned()
            .expect("day present in grid")
    }

    #[tokio::test]
    async fn unauthenticated_refresh_redirects_without_querying() {
        let Harness { backend, facade, .. } = harness();
        let mut view = CalendarView::new(date("2024-02-10"));

        let outcome = view.refresh(&facade, None).await;

        assert_eq!(outcome.redirect(), Some(Route::Auth));
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn february_grid_shows_chips_overflow_and_custom_colors() {
        let Harness { facade, session, .. } = harness();
        facade
            .insert_custom_category(
                &session,
                CategoryForm {
                    name: "Gym".to_string(),
                    color: Some("#10b981".to_string()),
                },
            )
            .await
            .expect("category");
        for (title, category) in [("Run", Some("Gym")), ("Call", Some("Work")), ("Read", None)] {
            facade
                .insert_event(&session, form(title, "2024-02-14", category))
                .await
                .expect("insert");
        }
        facade
            .insert_event(&session, form("March thing", "2024-03-01", None))
            .await
            .expect("insert");

        let mut view = CalendarView::new(date("2024-02-14"));
        let model = view.refresh(&facade, Some(&session)).await.ready().expect("ready");

        assert_eq!(model.month_label, "February 2024");
        assert_eq!(model.cells.len(), 4 + 29);
        assert!(model.cells[..4].iter().all(Option::is_none));
        let cell = cell_for(&model, 14);
        assert!(cell.is_today);
        assert_eq!(cell.chips.len(), 2);
        assert_eq!(cell.more_label.as_deref(), Some("+1 more"));
        assert_eq!(cell.indicator_color.as_deref(), Some("#10b981"));
        assert_eq!(model.upcoming.len(), 3);
        assert_eq!(model.empty_message, None);
        let gray = model
            .category_stats
            .iter()
            .find(|stat| stat.name == UNCATEGORIZED)
            .expect("uncategorized bucket");
        assert_eq!(gray.color, "#6b7280");
    }

    #[tokio::test]
    async fn navigating_months_refetches_only_that_month() {
        let Harness { facade, session, .. } = harness();
        facade
            .insert_event(&session, form("New year", "2024-01-01", None))
            .await
            .expect("insert");
        let mut view = CalendarView::new(date("2024-02-14"));

        let february = view.refresh(&facade, Some(&session)).await.ready().expect("ready");
        assert_eq!(february.empty_message, Some("No events this month"));

        let january = view.previous_month(&facade, Some(&session)).await.ready().expect("ready");
        assert_eq!(january.month_label, "January 2024");
        assert_eq!(january.upcoming.len(), 1);
        assert!(!cell_for(&january, 14).is_today);
    }

    #[tokio::test]
    async fn add_on_selected_day_then_toggle_and_delete() {
        let Harness { facade, session, .. } = harness();
        let mut view = CalendarView::new(date("2024-02-14"));
        view.refresh(&facade, Some(&session)).await;

        let selected = view.select_day(date("2024-02-20"));
        assert_eq!(selected.selected_date_label.as_deref(), Some("February 20, 2024"));
        let added = view
            .add_event(
                &facade,
                Some(&session),
                EventForm {
                    title: "Review".to_string(),
                    ..EventForm::default()
                },
            )
            .await
            .ready()
            .expect("ready");
        assert_eq!(added.notices, vec![Notice::success("Event added successfully!")]);
        assert_eq!(cell_for(&added, 20).chips.len(), 1);
        assert_eq!(added.selected_date_label, None);

        let event_id = view.events()[0].id.clone();
        let toggled = view
            .toggle_complete(&facade, Some(&session), &event_id)
            .await
            .ready()
            .expect("ready");
        assert_eq!(toggled.notices, vec![Notice::success("Event marked as complete")]);
        assert!(toggled.upcoming[0].completed);

        let deleted = view
            .delete_event(&facade, Some(&session), &event_id)
            .await
            .ready()
            .expect("ready");
        assert_eq!(deleted.notices, vec![Notice::success("Event deleted successfully")]);
        assert!(deleted.upcoming.is_empty());
        assert!(deleted.category_stats.is_empty());
    }

    #[tokio::test]
    async fn toggling_a_vanished_event_reports_failure() {
        let Harness { backend, facade, session } = harness();
        let gone = facade
            .insert_event(&session, form("Gone", "2024-02-05", None))
            .await
            .expect("insert");
        let mut view = CalendarView::new(date("2024-02-14"));
        view.refresh(&facade, Some(&session)).await;
        facade.delete_event(&session, &gone.id).await.expect("delete elsewhere");

        let model = view
            .toggle_complete(&facade, Some(&session), &gone.id)
            .await
            .ready()
            .expect("ready");
        assert_eq!(model.notices, vec![Notice::error("Failed to update event")]);
        assert!(model.upcoming.is_empty());

        let requests = backend.request_count();
        let unknown = view
            .toggle_complete(&facade, Some(&session), "evt-missing")
            .await
            .ready()
            .expect("ready");
        assert_eq!(unknown.notices, vec![Notice::error("Failed to update event")]);
        assert_eq!(backend.request_count(), requests);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_events_and_reports() {
        let Harness { backend, facade, session } = harness();
        facade
            .insert_event(&session, form("Kept", "2024-02-02", None))
            .await
            .expect("insert");
        let mut view = CalendarView::new(date("2024-02-14"));
        view.refresh(&facade, Some(&session)).await;

        backend.set_offline(true);
        let model = view.refresh(&facade, Some(&session)).await.ready().expect("ready");

        assert_eq!(model.upcoming.len(), 1);
        assert_eq!(model.phase, ViewPhase::Loaded);
        assert_eq!(model.notices[0].kind, NoticeKind::Error);
        assert_eq!(model.notices[0].message, "Failed to load events");
    }

    #[tokio::test]
    async fn invalid_add_reports_validation_message() {
        let Harness { backend, facade, session } = harness();
        let mut view = CalendarView::new(date("2024-02-14"));
        let model = view
            .add_event(&facade, Some(&session), EventForm::default())
            .await
            .ready()
            .expect("ready");
        assert_eq!(model.notices, vec![Notice::error("Please enter an event title")]);
        assert_eq!(backend.request_count(), 0);
    }
}
