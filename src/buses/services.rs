use std::collections::HashMap;

use serde_json::Value;
use time::{macros::format_description, Date, Time};
use tracing::info;

use crate::{
    buses::{
        dto::{BusDetails, CreateBusRequest, CreateScheduleRequest, ListBusesQuery},
        repo_types::{Bus, NewBus, NewSchedule, RouteFilter, Schedule},
    },
    error::{present, AppError},
    state::AppState,
};

pub fn parse_date(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::Validation(format!("Invalid date {raw:?}, expected YYYY-MM-DD")))
}

/// Accepts `HH:MM:SS` and the `HH:MM` that browser time inputs send, with
/// or without a leading zero on the hour.
pub fn parse_clock(field: &str, raw: &str) -> Result<Time, AppError> {
    Time::parse(raw, format_description!("[hour]:[minute]:[second]"))
        .or_else(|_| Time::parse(raw, format_description!("[hour]:[minute]")))
        .or_else(|_| Time::parse(raw, format_description!("[hour padding:none]:[minute]:[second]")))
        .or_else(|_| Time::parse(raw, format_description!("[hour padding:none]:[minute]")))
        .map_err(|_| AppError::Validation(format!("Invalid {field} {raw:?}, expected HH:MM[:SS]")))
}

fn attach(buses: Vec<Bus>, schedules: Vec<Schedule>) -> Vec<BusDetails> {
    let mut by_bus: HashMap<i64, Vec<Schedule>> = HashMap::new();
    for s in schedules {
        by_bus.entry(s.bus_id).or_default().push(s);
    }
    buses
        .into_iter()
        .map(|bus| {
            let schedules = by_bus.remove(&bus.id).unwrap_or_default();
            BusDetails { bus, schedules }
        })
        .collect()
}

/// Lists route-matching buses. With a date, each bus carries only the
/// schedules dated that day; buses without one are still listed.
pub async fn list_buses(state: &AppState, query: ListBusesQuery) -> Result<Vec<BusDetails>, AppError> {
    let date = present(query.date).map(|d| parse_date(&d)).transpose()?;
    let filter = RouteFilter {
        origin: present(query.from),
        destination: present(query.to),
    };

    let buses = state.buses.list(&filter).await?;
    if buses.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = buses.iter().map(|b| b.id).collect();
    let schedules = state.buses.schedules_for(&ids, date).await?;
    Ok(attach(buses, schedules))
}

pub async fn get_bus(state: &AppState, id: i64) -> Result<BusDetails, AppError> {
    let bus = state
        .buses
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Bus not found".into()))?;
    let schedules = state.buses.schedules_for(&[bus.id], None).await?;
    Ok(BusDetails { bus, schedules })
}

pub async fn create_bus(state: &AppState, req: CreateBusRequest) -> Result<Bus, AppError> {
    let (Some(name), Some(bus_number), Some(origin), Some(destination)) = (
        present(req.name),
        present(req.bus_number),
        present(req.from),
        present(req.to),
    ) else {
        return Err(AppError::Validation(
            "name, busNumber, from and to are required".into(),
        ));
    };

    let bus = state
        .buses
        .create(NewBus {
            name,
            bus_number,
            origin,
            destination,
            image_url: present(req.image_url),
            description: present(req.description),
            is_active: match req.is_active {
                Some(Value::Bool(active)) => active,
                _ => true,
            },
        })
        .await?;
    info!(bus_id = bus.id, bus_number = %bus.bus_number, "bus created");
    Ok(bus)
}

/// Adds a schedule to an existing bus. The bus is looked up before the
/// body is validated, so an unknown bus is always a 404.
pub async fn add_schedule(
    state: &AppState,
    bus_id: i64,
    req: CreateScheduleRequest,
) -> Result<Schedule, AppError> {
    let bus = state
        .buses
        .find(bus_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Bus not found".into()))?;

    let (Some(departure), Some(arrival)) = (present(req.departure_time), present(req.arrival_time))
    else {
        return Err(AppError::Validation(
            "departureTime and arrivalTime are required".into(),
        ));
    };

    let schedule = state
        .buses
        .add_schedule(NewSchedule {
            bus_id: bus.id,
            date: present(req.date).map(|d| parse_date(&d)).transpose()?,
            departure_time: parse_clock("departureTime", &departure)?,
            arrival_time: parse_clock("arrivalTime", &arrival)?,
            source_stop: present(req.source_stop),
            dest_stop: present(req.dest_stop),
            extra_info: present(req.extra_info),
        })
        .await?;
    info!(bus_id = bus.id, schedule_id = schedule.id, "schedule added");
    Ok(schedule)
}
