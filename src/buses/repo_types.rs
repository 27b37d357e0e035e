use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime, Time};

time::serde::format_description!(date_format, Date, "[year]-[month]-[day]");
time::serde::format_description!(clock_format, Time, "[hour]:[minute]:[second]");

/// A route. Origin and destination are exposed as `from` / `to`.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub id: i64,
    pub name: String,
    pub bus_number: String,
    #[serde(rename = "from")]
    pub origin: String,
    #[serde(rename = "to")]
    pub destination: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub is_active: bool, // stored and returned, never filtered on
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A timed trip of one bus. No `date` means the trip recurs daily.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: i64,
    pub bus_id: i64,
    #[serde(with = "date_format::option")]
    pub date: Option<Date>,
    #[serde(with = "clock_format")]
    pub departure_time: Time,
    #[serde(with = "clock_format")]
    pub arrival_time: Time,
    pub source_stop: Option<String>,
    pub dest_stop: Option<String>,
    pub extra_info: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewBus {
    pub name: String,
    pub bus_number: String,
    pub origin: String,
    pub destination: String,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub bus_id: i64,
    pub date: Option<Date>,
    pub departure_time: Time,
    pub arrival_time: Time,
    pub source_stop: Option<String>,
    pub dest_stop: Option<String>,
    pub extra_info: Option<String>,
}

/// Exact-match route filter; `None` matches everything.
#[derive(Debug, Clone, Default)]
pub struct RouteFilter {
    pub origin: Option<String>,
    pub destination: Option<String>,
}

impl RouteFilter {
    pub fn matches(&self, bus: &Bus) -> bool {
        self.origin.as_deref().map_or(true, |o| o == bus.origin)
            && self
                .destination
                .as_deref()
                .map_or(true, |d| d == bus.destination)
    }
}
