use chrono::{Datelike, Months, NaiveDate};

pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn first_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

/// Last day of the month, found by stepping back one day from the first of the next month.
pub fn last_of_month(day: NaiveDate) -> NaiveDate {
    let first = first_of_month(day);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

pub fn days_in_month(day: NaiveDate) -> u32 {
    last_of_month(day).day()
}

/// Number of empty cells before day 1 in a Sunday-first week.
pub fn leading_blanks(day: NaiveDate) -> u32 {
    first_of_month(day).weekday().num_days_from_sunday()
}

/// First day of the month `delta` months away from `day`.
pub fn shift_month(day: NaiveDate, delta: i32) -> NaiveDate {
    let first = first_of_month(day);
    let months = Months::new(delta.unsigned_abs());
    let shifted = if delta >= 0 {
        first.checked_add_months(months)
    } else {
        first.checked_sub_months(months)
    };
    shifted.unwrap_or(first)
}

/// Cells for a seven-column month view: leading `None`s, then every day of the month.
pub fn build_month_grid(day: NaiveDate) -> Vec<Option<NaiveDate>> {
    let first = first_of_month(day);
    let blanks = leading_blanks(first) as usize;
    let mut cells = Vec::with_capacity(blanks + days_in_month(first) as usize);
    cells.extend(std::iter::repeat_n(None, blanks));
    cells.extend(first.iter_days().take_while(|d| d.month() == first.month()).map(Some));
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn february_2024_has_four_blanks_and_29_days() {
        let grid = build_month_grid(date(2024, 2, 17));
        assert_eq!(grid.len(), 33);
        assert!(grid[..4].iter().all(Option::is_none));
        let days = grid[4..]
            .iter()
            .map(|cell| cell.expect("day cell").day())
            .collect::<Vec<_>>();
        assert_eq!(days, (1..=29).collect::<Vec<_>>());
    }

    #[test]
    fn month_starting_on_sunday_has_no_blanks() {
        // September 2024 starts on a Sunday.
        let grid = build_month_grid(date(2024, 9, 30));
        assert_eq!(grid.len(), 30);
        assert_eq!(grid[0], Some(date(2024, 9, 1)));
    }

    #[test]
    fn last_of_month_handles_year_end_and_non_leap_february() {
        assert_eq!(last_of_month(date(2023, 12, 5)), date(2023, 12, 31));
        assert_eq!(last_of_month(date(2023, 2, 1)), date(2023, 2, 28));
        assert_eq!(days_in_month(date(2024, 2, 1)), 29);
    }

    #[test]
    fn shift_month_crosses_year_boundaries() {
        assert_eq!(shift_month(date(2024, 1, 31), -1), date(2023, 12, 1));
        assert_eq!(shift_month(date(2024, 12, 15), 1), date(2025, 1, 1));
        assert_eq!(shift_month(date(2024, 3, 9), 0), date(2024, 3, 1));
    }

    proptest! {
        #[test]
        fn grid_shape_matches_month(year in 1900i32..2200, month in 1u32..=12, day in 1u32..=28) {
            let anchor = date(year, month, day);
            let grid = build_month_grid(anchor);
            let blanks = leading_blanks(anchor) as usize;
            let total_days = days_in_month(anchor) as usize;

            prop_assert_eq!(grid.len(), blanks + total_days);
            prop_assert!(grid[..blanks].iter().all(Option::is_none));
            let days = grid[blanks..].iter().map(|cell| cell.map(|d| d.day())).collect::<Vec<_>>();
            let expected = (1..=total_days as u32).map(Some).collect::<Vec<_>>();
            prop_assert_eq!(days, expected);
        }
    }
}
