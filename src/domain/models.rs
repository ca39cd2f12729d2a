use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A row type stored in one backend table.
pub trait Record {
    const TABLE: &'static str;

    fn validate(&self) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn badge_variant(self) -> &'static str {
        match self {
            Self::High => "destructive",
            Self::Medium => "default",
            Self::Low => "secondary",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DefaultView {
    #[default]
    Calendar,
    Events,
    Reminders,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub reminder: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Record for Event {
    const TABLE: &'static str = "events";

    fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "event.id")?;
        validate_non_empty(&self.user_id, "event.user_id")?;
        validate_non_empty(&self.title, "event.title")?;
        if let Some(time) = self.time.as_deref() {
            validate_time_of_day(time, "event.time")?;
        }
        Ok(())
    }
}

/// Projection of an event used by the analytics view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventSummary {
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub category: Option<String>,
}

impl EventSummary {
    pub const COLUMNS: [&'static str; 3] = ["id", "date", "category"];
}

impl Record for EventSummary {
    const TABLE: &'static str = "events";

    fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "event.id")
    }
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            date: event.date,
            category: event.category.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reminder {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub due_time: Option<String>,
    #[serde(default, deserialize_with = "priority_or_default")]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Record for Reminder {
    const TABLE: &'static str = "reminders";

    fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "reminder.id")?;
        validate_non_empty(&self.user_id, "reminder.user_id")?;
        validate_non_empty(&self.title, "reminder.title")?;
        if let Some(time) = self.due_time.as_deref() {
            validate_time_of_day(time, "reminder.due_time")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomCategory {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
}

impl Record for CustomCategory {
    const TABLE: &'static str = "custom_categories";

    fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "custom_category.id")?;
        validate_non_empty(&self.name, "custom_category.name")?;
        validate_hex_color(&self.color, "custom_category.color")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPreferences {
    pub user_id: String,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default)]
    pub default_view: DefaultView,
}

impl UserPreferences {
    pub fn defaults_for(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            theme: Theme::default(),
            notifications_enabled: true,
            default_view: DefaultView::default(),
        }
    }
}

impl Record for UserPreferences {
    const TABLE: &'static str = "user_preferences";

    fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.user_id, "user_preferences.user_id")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewEvent {
    pub user_id: String,
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub category: Option<String>,
    pub reminder: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventPatch {
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub category: Option<String>,
    pub reminder: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewReminder {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub due_time: Option<String>,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewCustomCategory {
    pub user_id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionPatch {
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompletionPatch {
    pub fn toggled(currently_completed: bool, now: DateTime<Utc>) -> Self {
        let completed = !currently_completed;
        Self {
            completed,
            completed_at: completed.then_some(now),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl AuthSession {
    pub fn is_valid_at(&self, now: DateTime<Utc>, leeway_seconds: i64) -> bool {
        self.expires_at > now + chrono::Duration::seconds(leeway_seconds)
            && !self.access_token.trim().is_empty()
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

fn default_true() -> bool {
    true
}

fn priority_or_default<'de, D>(deserializer: D) -> Result<Priority, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Priority>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

/// Accepts `HH:MM` and the `HH:MM:SS` form the backend returns for time columns.
pub(crate) fn parse_time_of_day(value: &str) -> Option<(u8, u8)> {
    let mut split = value.trim().split(':');
    let hour = split.next()?.parse::<u8>().ok()?;
    let minute_str = split.next()?;
    if minute_str.len() != 2 {
        return None;
    }
    let minute = minute_str.parse::<u8>().ok()?;
    if let Some(second) = split.next() {
        let second = second.split('.').next()?.parse::<u8>().ok()?;
        if second > 59 {
            return None;
        }
    }
    if split.next().is_some() || hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}

pub(crate) fn validate_time_of_day(value: &str, field_name: &str) -> Result<(), String> {
    parse_time_of_day(value)
        .map(|_| ())
        .ok_or_else(|| format!("{field_name} must be HH:MM"))
}

pub(crate) fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

fn validate_hex_color(value: &str, field_name: &str) -> Result<(), String> {
    if !is_hex_color(value) {
        return Err(format!("{field_name} must be a #rrggbb color"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn sample_event() -> Event {
        Event {
            id: "evt-1".to_string(),
            user_id: "user-1".to_string(),
            title: "Dentist".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 4).expect("valid date"),
            time: Some("14:30:00".to_string()),
            category: Some("Appointment".to_string()),
            reminder: true,
            completed: false,
            completed_at: None,
        }
    }

    #[test]
    fn event_validate_accepts_backend_row() {
        assert!(sample_event().validate().is_ok());
    }

    #[test]
    fn event_validate_rejects_blank_title_and_bad_time() {
        let mut event = sample_event();
        event.title = "  ".to_string();
        assert!(event.validate().is_err());

        let mut event = sample_event();
        event.time = Some("25:00".to_string());
        assert!(event.validate().is_err());
    }

    #[test]
    fn event_decodes_from_postgrest_row() {
        let row = serde_json::json!({
            "id": "evt-9",
            "user_id": "user-1",
            "title": "Standup",
            "date": "2024-02-29",
            "time": null,
            "category": null,
            "reminder": false,
            "completed": true,
            "completed_at": "2024-02-29T10:15:00.123456+00:00",
            "created_at": "2024-02-01T00:00:00+00:00"
        });
        let event: Event = serde_json::from_value(row).expect("decode event");
        assert_eq!(event.date, NaiveDate::from_ymd_opt(2024, 2, 29).expect("leap day"));
        assert!(event.completed);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn reminder_null_priority_defaults_to_medium() {
        let row = serde_json::json!({
            "id": "rem-1",
            "user_id": "user-1",
            "title": "Pay rent",
            "description": null,
            "due_date": "2024-03-01",
            "due_time": "09:00",
            "priority": null,
            "completed": false
        });
        let reminder: Reminder = serde_json::from_value(row).expect("decode reminder");
        assert_eq!(reminder.priority, Priority::Medium);
        assert_eq!(reminder.priority.badge_variant(), "default");
    }

    #[test]
    fn custom_category_requires_hex_color() {
        let mut category = CustomCategory {
            id: "cat-1".to_string(),
            user_id: "user-1".to_string(),
            name: "Gym".to_string(),
            color: "#10b981".to_string(),
        };
        assert!(category.validate().is_ok());
        category.color = "green".to_string();
        assert!(category.validate().is_err());
    }

    #[test]
    fn preferences_fill_missing_fields_with_defaults() {
        let prefs: UserPreferences =
            serde_json::from_value(serde_json::json!({ "user_id": "user-1" })).expect("decode");
        assert_eq!(prefs, UserPreferences::defaults_for("user-1"));
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.default_view, DefaultView::Calendar);
    }

    #[test]
    fn toggling_completion_twice_restores_original_state() {
        let now = fixed_time("2024-03-04T12:00:00Z");
        let first = CompletionPatch::toggled(false, now);
        assert!(first.completed);
        assert_eq!(first.completed_at, Some(now));

        let second = CompletionPatch::toggled(first.completed, now);
        assert!(!second.completed);
        assert_eq!(second.completed_at, None);
    }

    #[test]
    fn session_validity_honors_leeway() {
        let now = fixed_time("2024-03-04T12:00:00Z");
        let session = AuthSession {
            access_token: "token".to_string(),
            refresh_token: Some("refresh".to_string()),
            token_type: "bearer".to_string(),
            expires_at: now + chrono::Duration::seconds(30),
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some("a@example.com".to_string()),
            },
        };
        assert!(session.is_valid_at(now, 0));
        assert!(!session.is_valid_at(now, 60));
    }

    proptest! {
        #[test]
        fn completion_toggle_is_an_involution(start in any::<bool>(), secs in 0i64..4_000_000_000i64) {
            let now = DateTime::<Utc>::from_timestamp(secs, 0).expect("timestamp in range");
            let once = CompletionPatch::toggled(start, now);
            let twice = CompletionPatch::toggled(once.completed, now);
            prop_assert_eq!(twice.completed, start);
            prop_assert_eq!(twice.completed_at.is_some(), start);
        }

        #[test]
        fn parse_time_of_day_accepts_all_valid_clock_values(hour in 0u8..24, minute in 0u8..60) {
            let short = format!("{hour:02}:{minute:02}");
            let long = format!("{hour:02}:{minute:02}:00");
            prop_assert_eq!(parse_time_of_day(&short), Some((hour, minute)));
            prop_assert_eq!(parse_time_of_day(&long), Some((hour, minute)));
        }
    }
}
