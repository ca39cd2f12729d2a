use crate::domain::models::CustomCategory;
use serde::Serialize;

pub const NEUTRAL_GRAY: &str = "#6b7280";

pub const DEFAULT_CATEGORY_COLORS: [(&str, &str); 5] = [
    ("Work", "#22c55e"),
    ("Personal", "#3b82f6"),
    ("Meeting", "#f59e0b"),
    ("Appointment", "#8b5cf6"),
    ("Other", "#6b7280"),
];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryOption {
    pub name: String,
    pub color: String,
}

/// Custom categories shadow the built-in palette; unknown or absent names are gray.
pub fn resolve_category_color<'a>(category: Option<&str>, custom: &'a [CustomCategory]) -> &'a str {
    let Some(name) = category.filter(|name| !name.is_empty()) else {
        return NEUTRAL_GRAY;
    };

    if let Some(found) = custom.iter().find(|candidate| candidate.name == name) {
        return &found.color;
    }

    DEFAULT_CATEGORY_COLORS
        .iter()
        .find(|(default_name, _)| *default_name == name)
        .map(|(_, color)| *color)
        .unwrap_or(NEUTRAL_GRAY)
}

/// Options offered when adding an event: built-ins first, then the user's own.
pub fn category_options(custom: &[CustomCategory]) -> Vec<CategoryOption> {
    DEFAULT_CATEGORY_COLORS
        .iter()
        .map(|(name, _)| *name)
        .chain(custom.iter().map(|category| category.name.as_str()))
        .map(|name| CategoryOption {
            name: name.to_string(),
            color: resolve_category_color(Some(name), custom).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn custom(name: &str, color: &str) -> CustomCategory {
        CustomCategory {
            id: format!("cat-{name}"),
            user_id: "user-1".to_string(),
            name: name.to_string(),
            color: color.to_string(),
        }
    }

    #[test]
    fn absent_or_empty_category_is_neutral_gray() {
        let list = vec![custom("", "#ffffff")];
        assert_eq!(resolve_category_color(None, &list), NEUTRAL_GRAY);
        assert_eq!(resolve_category_color(Some(""), &list), NEUTRAL_GRAY);
    }

    #[test]
    fn builtin_names_resolve_to_fixed_palette() {
        assert_eq!(resolve_category_color(Some("Work"), &[]), "#22c55e");
        assert_eq!(resolve_category_color(Some("Meeting"), &[]), "#f59e0b");
        assert_eq!(resolve_category_color(Some("work"), &[]), NEUTRAL_GRAY);
        assert_eq!(resolve_category_color(Some("Gym"), &[]), NEUTRAL_GRAY);
    }

    #[test]
    fn custom_category_overrides_builtin_and_first_match_wins() {
        let list = vec![custom("Work", "#000000"), custom("Work", "#111111")];
        assert_eq!(resolve_category_color(Some("Work"), &list), "#000000");
    }

    #[test]
    fn category_options_list_builtins_then_custom() {
        let list = vec![custom("Gym", "#10b981")];
        let options = category_options(&list);
        let names = options.iter().map(|option| option.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Work", "Personal", "Meeting", "Appointment", "Other", "Gym"]);
        assert_eq!(options[5].color, "#10b981");
        assert_eq!(options[1].color, "#3b82f6");
    }

    proptest! {
        #[test]
        fn custom_entry_always_wins(name in "[A-Za-z]{1,12}", digits in "[0-9a-f]{6}") {
            let color = format!("#{digits}");
            let list = vec![custom(&name, &color)];
            prop_assert_eq!(resolve_category_color(Some(name.as_str()), &list), color.as_str());
        }

        #[test]
        fn unknown_names_fall_back_to_gray(name in "[a-z]{1,12}") {
            // Built-in names are capitalized, so lowercase names never match them.
            prop_assert_eq!(resolve_category_color(Some(name.as_str()), &[]), NEUTRAL_GRAY);
        }
    }
}
