use crate::domain::formatting::format_clock;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::geocoding_client::{Coordinates, ReverseGeocoder};
use chrono::{Local, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const CLOCK_PERIOD: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClockReading {
    pub time: String,
    pub date: String,
}

impl ClockReading {
    pub fn at(now: NaiveDateTime) -> Self {
        let (time, date) = format_clock(now);
        Self { time, date }
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, InfraError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| InfraError::InvalidConfig(format!("unknown timezone: {name}")))
}

/// Wall-clock time in `timezone`, or the machine's local time.
pub fn wall_clock(timezone: Option<Tz>) -> NaiveDateTime {
    match timezone {
        Some(timezone) => Utc::now().with_timezone(&timezone).naive_local(),
        None => Local::now().naive_local(),
    }
}

/// Background task that reports the header clock once per period.
///
/// The first reading is delivered immediately. The task ends on [`ClockTicker::stop`]
/// or when the ticker is dropped.
#[derive(Debug)]
pub struct ClockTicker {
    handle: Option<JoinHandle<()>>,
}

impl ClockTicker {
    pub fn start<F>(period: Duration, timezone: Option<Tz>, on_tick: F) -> Self
    where
        F: Fn(ClockReading) + Send + Sync + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                on_tick(ClockReading::at(wall_clock(timezone)));
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for ClockTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Resolves the locality shown next to the clock in a detached task.
///
/// One attempt bounded by `limit`; failures are logged and `on_found` is not called.
pub fn spawn_locality_lookup<G, F>(
    geocoder: Arc<G>,
    coordinates: Coordinates,
    limit: Duration,
    on_found: F,
) -> JoinHandle<()>
where
    G: ReverseGeocoder + ?Sized + 'static,
    F: FnOnce(String) + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(error) = coordinates.validate() {
            tracing::warn!(%error, "skipping locality lookup");
            return;
        }
        match tokio::time::timeout(limit, geocoder.locality(coordinates)).await {
            Ok(Ok(Some(locality))) => on_found(locality),
            Ok(Ok(None)) => tracing::info!("no locality for current position"),
            Ok(Err(error)) => tracing::warn!(%error, "locality lookup failed"),
            Err(_) => tracing::warn!(timeout_ms = limit.as_millis() as u64, "locality lookup timed out"),
        }
    })
}
