use crate::domain::month_grid::WEEKDAY_LABELS;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WeekdayCount {
    pub day: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

/// Always seven buckets in Sun..Sat order.
pub fn count_by_weekday<I>(dates: I) -> Vec<WeekdayCount>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut counts = [0usize; 7];
    for date in dates {
        counts[date.weekday().num_days_from_sunday() as usize] += 1;
    }
    WEEKDAY_LABELS
        .iter()
        .zip(counts)
        .map(|(day, count)| WeekdayCount { day: *day, count })
        .collect()
}

/// Buckets in first-seen order; absent or empty categories count as "Uncategorized".
pub fn count_by_category<'a, I>(categories: I) -> Vec<CategoryCount>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut buckets: Vec<CategoryCount> = Vec::new();
    for category in categories {
        let name = category.filter(|name| !name.is_empty()).unwrap_or(UNCATEGORIZED);
        match buckets.iter_mut().find(|bucket| bucket.name == name) {
            Some(bucket) => bucket.count += 1,
            None => buckets.push(CategoryCount {
                name: name.to_string(),
                count: 1,
            }),
        }
    }
    buckets
}

pub fn busiest_day(counts: &[WeekdayCount]) -> Option<&WeekdayCount> {
    first_maximum(counts, |entry| entry.count)
}

pub fn top_category(counts: &[CategoryCount]) -> Option<&CategoryCount> {
    first_maximum(counts, |entry| entry.count)
}

// Strict greater-than: on ties the earliest entry is kept.
fn first_maximum<T, F>(items: &[T], key: F) -> Option<&T>
where
    F: Fn(&T) -> usize,
{
    let mut iter = items.iter();
    let first = iter.next()?;
    Some(iter.fold(first, |best, candidate| {
        if key(candidate) > key(best) {
            candidate
        } else {
            best
        }
    }))
}
