use crate::application::facade::DataFacade;
use crate::application::views::{require_session, Notice, ViewOutcome, ViewPhase, ViewStatus};
use crate::domain::aggregation::{
    busiest_day, count_by_category, count_by_weekday, top_category, CategoryCount, WeekdayCount,
};
use crate::domain::models::{AuthSession, EventSummary};
use crate::infrastructure::rest_client::RestClient;
use serde::Serialize;

pub const EMPTY_MESSAGE: &str = "No data available yet. Start adding events to see insights!";
const NONE_LABEL: &str = "None";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Highlight {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AnalyticsModel {
    pub phase: ViewPhase,
    pub total_events: usize,
    pub busiest_day: Highlight,
    pub top_category: Highlight,
    pub by_weekday: Vec<WeekdayCount>,
    pub by_category: Vec<CategoryCount>,
    pub empty_message: Option<&'static str>,
    pub notices: Vec<Notice>,
}

/// Insights over every event of the user.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsView {
    summaries: Vec<EventSummary>,
    status: ViewStatus,
}

impl AnalyticsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refresh<R: RestClient>(
        &mut self,
        facade: &DataFacade<R>,
        session: Option<&AuthSession>,
    ) -> ViewOutcome<AnalyticsModel> {
        let session = match require_session(session) {
            Ok(session) => session,
            Err(route) => return ViewOutcome::Redirect(route),
        };
        self.status.begin_load();
        match facade.list_event_summaries(session).await {
            Ok(summaries) => self.summaries = summaries,
            Err(error) => self.status.fail("load_analytics", &error, "Failed to load analytics"),
        }
        self.status.finish();
        ViewOutcome::Ready(self.model())
    }

    pub fn model(&mut self) -> AnalyticsModel {
        let by_weekday = count_by_weekday(self.summaries.iter().map(|summary| summary.date));
        let by_category = count_by_category(self.summaries.iter().map(|summary| summary.category.as_deref()));
        let busiest_day = busiest_day(&by_weekday)
            .map(|entry| Highlight {
                label: entry.day.to_string(),
                count: entry.count,
            })
            .unwrap_or_else(|| Highlight {
                label: NONE_LABEL.to_string(),
                count: 0,
            });
        let top_category = top_category(&by_category)
            .map(|entry| Highlight {
                label: entry.name.clone(),
                count: entry.count,
            })
            .unwrap_or_else(|| Highlight {
                label: NONE_LABEL.to_string(),
                count: 0,
            });

        AnalyticsModel {
            phase: self.status.phase(),
            total_events: self.summaries.len(),
            busiest_day,
            top_category,
            by_weekday,
            by_category,
            empty_message: self.summaries.is_empty().then_some(EMPTY_MESSAGE),
            notices: self.status.take_notices(),
        }
    }
}
