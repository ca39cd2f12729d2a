use crate::domain::forms::{CategoryForm, EventForm, ReminderForm};
use crate::domain::models::{
    AuthSession, CompletionPatch, CustomCategory, Event, EventSummary, Record, Reminder,
    UserPreferences,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::rest_client::{RestClient, SelectQuery};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const PREFERENCES_CONFLICT_COLUMN: &str = "user_id";

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Typed per-table operations over the backend.
///
/// Every call takes the caller's session explicitly. Forms are validated
/// before any request is made, and rows coming back are decoded and checked
/// against their record type. There is no retry and no local cache.
pub struct DataFacade<R: RestClient> {
    rest: Arc<R>,
    now_provider: NowProvider,
}

impl<R: RestClient> Clone for DataFacade<R> {
    fn clone(&self) -> Self {
        Self {
            rest: Arc::clone(&self.rest),
            now_provider: Arc::clone(&self.now_provider),
        }
    }
}

impl<R: RestClient> DataFacade<R> {
    pub fn new(rest: Arc<R>) -> Self {
        Self {
            rest,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub async fn list_events_between(
        &self,
        session: &AuthSession,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<Event>, InfraError> {
        let query = SelectQuery::new()
            .gte("date", first)
            .lte("date", last)
            .order_asc("date");
        self.select(session, &query).await
    }

    pub async fn list_events(&self, session: &AuthSession) -> Result<Vec<Event>, InfraError> {
        self.select(session, &SelectQuery::new().order_asc("date")).await
    }

    pub async fn list_event_summaries(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<EventSummary>, InfraError> {
        let query = SelectQuery::new().columns(&EventSummary::COLUMNS);
        self.select(session, &query).await
    }

    pub async fn insert_event(&self, session: &AuthSession, form: EventForm) -> Result<Event, InfraError> {
        let new_event = form.into_new_event(session.user_id())?;
        self.insert(session, &new_event).await
    }

    pub async fn update_event(
        &self,
        session: &AuthSession,
        event_id: &str,
        form: EventForm,
    ) -> Result<Option<Event>, InfraError> {
        let patch = form.into_patch()?;
        self.update_by_id(session, event_id, &patch).await
    }

    /// Flips completion; `completed_at` is set on completion and cleared otherwise.
    pub async fn set_event_completion(
        &self,
        session: &AuthSession,
        event_id: &str,
        currently_completed: bool,
    ) -> Result<Option<Event>, InfraError> {
        let patch = CompletionPatch::toggled(currently_completed, (self.now_provider)());
        self.update_by_id(session, event_id, &patch).await
    }

    pub async fn delete_event(&self, session: &AuthSession, event_id: &str) -> Result<(), InfraError> {
        self.delete_by_id::<Event>(session, event_id).await
    }

    pub async fn list_reminders(&self, session: &AuthSession) -> Result<Vec<Reminder>, InfraError> {
        self.select(session, &SelectQuery::new().order_asc("due_date")).await
    }

    pub async fn insert_reminder(
        &self,
        session: &AuthSession,
        form: ReminderForm,
    ) -> Result<Reminder, InfraError> {
        let new_reminder = form.into_new_reminder(session.user_id())?;
        self.insert(session, &new_reminder).await
    }

    pub async fn set_reminder_completion(
        &self,
        session: &AuthSession,
        reminder_id: &str,
        currently_completed: bool,
    ) -> Result<Option<Reminder>, InfraError> {
        let patch = CompletionPatch::toggled(currently_completed, (self.now_provider)());
        self.update_by_id(session, reminder_id, &patch).await
    }

    pub async fn delete_reminder(&self, session: &AuthSession, reminder_id: &str) -> Result<(), InfraError> {
        self.delete_by_id::<Reminder>(session, reminder_id).await
    }

    pub async fn list_custom_categories(
        &self,
        session: &AuthSession,
    ) -> Result<Vec<CustomCategory>, InfraError> {
        self.select(session, &SelectQuery::new().order_asc("name")).await
    }

    pub async fn insert_custom_category(
        &self,
        session: &AuthSession,
        form: CategoryForm,
    ) -> Result<CustomCategory, InfraError> {
        let new_category = form.into_new_category(session.user_id())?;
        self.insert(session, &new_category).await
    }

    pub async fn delete_custom_category(
        &self,
        session: &AuthSession,
        category_id: &str,
    ) -> Result<(), InfraError> {
        self.delete_by_id::<CustomCategory>(session, category_id).await
    }

    /// `None` when the user has never saved preferences.
    pub async fn get_preferences(
        &self,
        session: &AuthSession,
    ) -> Result<Option<UserPreferences>, InfraError> {
        let query = SelectQuery::new().eq(PREFERENCES_CONFLICT_COLUMN, session.user_id());
        let rows: Vec<UserPreferences> = self.select(session, &query).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn upsert_preferences(
        &self,
        session: &AuthSession,
        mut preferences: UserPreferences,
    ) -> Result<UserPreferences, InfraError> {
        preferences.user_id = session.user_id().to_string();
        let row = self
            .rest
            .upsert(
                &session.access_token,
                UserPreferences::TABLE,
                serde_json::to_value(&preferences)?,
                PREFERENCES_CONFLICT_COLUMN,
            )
            .await?;
        decode_row(row)
    }

    async fn select<T>(&self, session: &AuthSession, query: &SelectQuery) -> Result<Vec<T>, InfraError>
    where
        T: Record + DeserializeOwned,
    {
        let rows = self.rest.select(&session.access_token, T::TABLE, query).await?;
        rows.into_iter().map(decode_row::<T>).collect()
    }

    async fn insert<T, P>(&self, session: &AuthSession, payload: &P) -> Result<T, InfraError>
    where
        T: Record + DeserializeOwned,
        P: Serialize,
    {
        let row = self
            .rest
            .insert(&session.access_token, T::TABLE, serde_json::to_value(payload)?)
            .await?;
        decode_row(row)
    }

    async fn update_by_id<T, P>(
        &self,
        session: &AuthSession,
        id: &str,
        patch: &P,
    ) -> Result<Option<T>, InfraError>
    where
        T: Record + DeserializeOwned,
        P: Serialize,
    {
        let rows = self
            .rest
            .update(
                &session.access_token,
                T::TABLE,
                &SelectQuery::new().eq("id", id),
                serde_json::to_value(patch)?,
            )
            .await?;
        rows.into_iter().next().map(decode_row::<T>).transpose()
    }

    async fn delete_by_id<T: Record>(&self, session: &AuthSession, id: &str) -> Result<(), InfraError> {
        self.rest
            .delete(&session.access_token, T::TABLE, &SelectQuery::new().eq("id", id))
            .await
    }
}

fn decode_row<T>(row: Value) -> Result<T, InfraError>
where
    T: Record + DeserializeOwned,
{
    let record = serde_json::from_value::<T>(row).map_err(|error| InfraError::InvalidRecord {
        table: T::TABLE.to_string(),
        reason: error.to_string(),
    })?;
    record.validate().map_err(|reason| InfraError::InvalidRecord {
        table: T::TABLE.to_string(),
        reason,
    })?;
    Ok(record)
}
