use crate::domain::models::{
    is_hex_color, parse_time_of_day, EventPatch, NewCustomCategory, NewEvent, NewReminder,
    Priority,
};
use chrono::NaiveDate;
use serde::Deserialize;

pub const DEFAULT_CATEGORY_COLOR: &str = "#3b82f6";
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// User-facing reason a form was rejected before any request was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormError(pub String);

impl FormError {
    fn new(message: &str) -> Self {
        Self(message.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct EventForm {
    pub title: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub reminder: bool,
}

impl EventForm {
    pub fn into_new_event(self, user_id: &str) -> Result<NewEvent, FormError> {
        let patch = self.into_patch()?;
        Ok(NewEvent {
            user_id: user_id.to_string(),
            title: patch.title,
            date: patch.date,
            time: patch.time,
            category: patch.category,
            reminder: patch.reminder,
        })
    }

    pub fn into_patch(self) -> Result<EventPatch, FormError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(FormError::new("Please enter an event title"));
        }
        let Some(date) = self.date else {
            return Err(FormError::new("Please select a date"));
        };
        Ok(EventPatch {
            title: title.to_string(),
            date,
            time: normalize_time(self.time)?,
            category: normalize_optional(self.category),
            reminder: self.reminder,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ReminderForm {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_time: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl ReminderForm {
    pub fn into_new_reminder(self, user_id: &str) -> Result<NewReminder, FormError> {
        let title = self.title.trim();
        let (false, Some(due_date)) = (title.is_empty(), self.due_date) else {
            return Err(FormError::new("Please fill in required fields"));
        };
        Ok(NewReminder {
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: normalize_optional(self.description),
            due_date,
            due_time: normalize_time(self.due_time)?,
            priority: self.priority.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CategoryForm {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl CategoryForm {
    pub fn into_new_category(self, user_id: &str) -> Result<NewCustomCategory, FormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormError::new("Please enter a category name"));
        }
        let color = normalize_optional(self.color).unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string());
        if !is_hex_color(&color) {
            return Err(FormError::new("Please choose a valid color"));
        }
        Ok(NewCustomCategory {
            user_id: user_id.to_string(),
            name: name.to_string(),
            color: color.to_ascii_lowercase(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

impl CredentialsForm {
    pub fn validate(&self) -> Result<(), FormError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(FormError::new("Please fill in all fields"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(FormError::new("Password must be at least 6 characters"));
        }
        Ok(())
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn normalize_time(value: Option<String>) -> Result<Option<String>, FormError> {
    let Some(time) = normalize_optional(value) else {
        return Ok(None);
    };
    if parse_time_of_day(&time).is_none() {
        return Err(FormError::new("Please enter a valid time"));
    }
    Ok(Some(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    #[test]
    fn event_form_requires_title_then_date() {
        let blank = EventForm {
            title: "   ".to_string(),
            ..EventForm::default()
        };
        assert_eq!(
            blank.into_patch(),
            Err(FormError("Please enter an event title".to_string()))
        );

        let undated = EventForm {
            title: "Review".to_string(),
            ..EventForm::default()
        };
        assert_eq!(
            undated.into_patch(),
            Err(FormError("Please select a date".to_string()))
        );
    }

    #[test]
    fn event_form_trims_and_nulls_empty_fields() {
        let form = EventForm {
            title: "  Lunch  ".to_string(),
            date: Some(date("2024-03-04")),
            time: Some(String::new()),
            category: Some("".to_string()),
            reminder: true,
        };
        let event = form.into_new_event("user-1").expect("valid form");
        assert_eq!(event.title, "Lunch");
        assert_eq!(event.user_id, "user-1");
        assert_eq!(event.time, None);
        assert_eq!(event.category, None);
        assert!(event.reminder);
    }

    #[test]
    fn event_form_rejects_malformed_time() {
        let form = EventForm {
            title: "Lunch".to_string(),
            date: Some(date("2024-03-04")),
            time: Some("lunchtime".to_string()),
            ..EventForm::default()
        };
        assert!(form.into_patch().is_err());
    }

    #[test]
    fn reminder_form_defaults_priority_to_medium() {
        let form = ReminderForm {
            title: "Renew passport".to_string(),
            description: Some("  ".to_string()),
            due_date: Some(date("2024-05-01")),
            ..ReminderForm::default()
        };
        let reminder = form.into_new_reminder("user-1").expect("valid form");
        assert_eq!(reminder.priority, Priority::Medium);
        assert_eq!(reminder.description, None);
    }

    #[test]
    fn reminder_form_requires_title_and_due_date() {
        let missing_date = ReminderForm {
            title: "Renew passport".to_string(),
            ..ReminderForm::default()
        };
        assert_eq!(
            missing_date.into_new_reminder("user-1"),
            Err(FormError("Please fill in required fields".to_string()))
        );
    }

    #[test]
    fn category_form_defaults_color_and_checks_hex() {
        let form = CategoryForm {
            name: " Gym ".to_string(),
            color: None,
        };
        let category = form.into_new_category("user-1").expect("valid form");
        assert_eq!(category.name, "Gym");
        assert_eq!(category.color, DEFAULT_CATEGORY_COLOR);

        let bad = CategoryForm {
            name: "Gym".to_string(),
            color: Some("#12345".to_string()),
        };
        assert!(bad.into_new_category("user-1").is_err());
    }

    #[test]
    fn credentials_require_both_fields_and_six_characters() {
        let empty = CredentialsForm::default();
        assert_eq!(empty.validate(), Err(FormError("Please fill in all fields".to_string())));

        let short = CredentialsForm {
            email: "a@example.com".to_string(),
            password: "12345".to_string(),
        };
        assert_eq!(
            short.validate(),
            Err(FormError("Password must be at least 6 characters".to_string()))
        );

        let ok = CredentialsForm {
            email: "a@example.com".to_string(),
            password: "123456".to_string(),
        };
        assert!(ok.validate().is_ok());
    }
}
