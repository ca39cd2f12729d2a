use crate::application::facade::DataFacade;
use crate::application::views::{require_session, Notice, ViewOutcome, ViewPhase, ViewStatus};
use crate::domain::formatting::{date_time_label, format_short_date};
use crate::domain::forms::ReminderForm;
use crate::domain::models::{AuthSession, Reminder};
use crate::infrastructure::rest_client::RestClient;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReminderRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub due: String,
    pub priority: &'static str,
    pub badge_variant: &'static str,
    pub completed: bool,
}

impl From<&Reminder> for ReminderRow {
    fn from(reminder: &Reminder) -> Self {
        Self {
            id: reminder.id.clone(),
            title: reminder.title.clone(),
            description: reminder.description.clone(),
            due: date_time_label(format_short_date(reminder.due_date), reminder.due_time.as_deref()),
            priority: reminder.priority.as_str(),
            badge_variant: reminder.priority.badge_variant(),
            completed: reminder.completed,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RemindersModel {
    pub phase: ViewPhase,
    pub active: Vec<ReminderRow>,
    pub completed: Vec<ReminderRow>,
    pub active_empty_message: Option<&'static str>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Default)]
pub struct RemindersView {
    reminders: Vec<Reminder>,
    status: ViewStatus,
}

impl RemindersView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    pub async fn refresh<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
    ) -> ViewOutcome<RemindersModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        self.load(facade, session).await;
        ViewOutcome::Ready(self.model())
    }

    pub async fn add_reminder<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
        form: ReminderForm,
    ) -> ViewOutcome<RemindersModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        self.status.begin_mutation();
        match facade.insert_reminder(session, form).await {
            Ok(_) => {
                self.status.succeed("Reminder added!");
                self.load(facade, session).await;
            }
            Err(error) => {
                self.status.fail_with_detail("add_reminder", &error, "Failed to add reminder");
                self.status.finish();
            }
        }
        ViewOutcome::Ready(self.model())
    }

    pub async fn toggle_complete<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
        reminder_id: &str,
    ) -> ViewOutcome<RemindersModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        let currently_completed = self
            .reminders
            .iter()
            .find(|reminder| reminder.id == reminder_id)
            .is_some_and(|reminder| reminder.completed);
        self.status.begin_mutation();
        match facade
            .set_reminder_completion(session, reminder_id, currently_completed)
            .await
        {
            Ok(_) => {
                self.status.succeed(if currently_completed {
                    "Reminder marked incomplete"
                } else {
                    "Reminder completed!"
                });
                self.load(facade, session).await;
            }
            Err(error) => {
                self.status.fail("toggle_reminder", &error, "Failed to update reminder");
                self.status.finish();
            }
        }
        ViewOutcome::Ready(self.model())
    }

    pub async fn delete_reminder<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
        reminder_id: &str,
    ) -> ViewOutcome<RemindersModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        self.status.begin_mutation();
        match facade.delete_reminder(session, reminder_id).await {
            Ok(()) => {
                self.status.succeed("Reminder deleted");
                self.load(facade, session).await;
            }
            Err(error) => {
                self.status.fail("delete_reminder", &error, "Failed to delete reminder");
                self.status.finish();
            }
        }
        ViewOutcome::Ready(self.model())
    }

    async fn load<R: RestClient>(&mut self, facade: &DataFacade<R>, session: &AuthSession) {
        self.status.begin_load();
        match facade.list_reminders(session).await {
            Ok(reminders) => self.reminders = reminders,
            Err(error) => self.status.fail("load_reminders", &error, "Failed to load reminders"),
        }
        self.status.finish();
    }

    pub fn model(&mut self) -> RemindersModel {
        let (completed, active): (Vec<&Reminder>, Vec<&Reminder>) =
            self.reminders.iter().partition(|reminder| reminder.completed);
        RemindersModel {
            phase: self.status.phase(),
            active_empty_message: active.is_empty().then_some("No active reminders"),
            active: active.into_iter().map(ReminderRow::from).collect(),
            completed: completed.into_iter().map(ReminderRow::from).collect(),
            notices: self.status.take_notices(),
        }
    }
}
