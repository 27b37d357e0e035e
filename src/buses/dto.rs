use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::buses::repo_types::{Bus, Schedule};

#[derive(Debug, Default, Deserialize)]
pub struct ListBusesQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusRequest {
    pub name: Option<String>,
    pub bus_number: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    /// Anything but a JSON boolean counts as `true`.
    pub is_active: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleRequest {
    pub date: Option<String>,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub source_stop: Option<String>,
    pub dest_stop: Option<String>,
    pub extra_info: Option<String>,
}

/// A bus with its attached schedules flattened into one JSON object.
#[derive(Debug, Serialize)]
pub struct BusDetails {
    #[serde(flatten)]
    pub bus: Bus,
    pub schedules: Vec<Schedule>,
}

#[derive(Debug, Serialize)]
pub struct BusListResponse {
    pub buses: Vec<BusDetails>,
}

#[derive(Debug, Serialize)]
pub struct BusDetailsResponse {
    pub bus: BusDetails,
}

#[derive(Debug, Serialize)]
pub struct BusResponse {
    pub bus: Bus,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub schedule: Schedule,
}
