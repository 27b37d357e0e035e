use anyhow::Context;
use sqlx::PgPool;
use time::{macros::time, Date, Duration, OffsetDateTime};
use tracing::info;

use crate::{
    auth::{
        password::hash_password,
        repo::{PgUserRepo, UserRepo},
        repo_types::{NewUser, Role},
    },
    buses::{
        repo::{BusRepo, PgBusRepo},
        repo_types::{NewBus, NewSchedule},
    },
};

fn verified(name: &str, email: &str, password: &str, role: Role) -> anyhow::Result<NewUser> {
    Ok(NewUser {
        name: name.into(),
        email: email.into(),
        password_hash: hash_password(password)?,
        role,
        is_verified: true,
        otp: None,
        otp_expires: None,
    })
}

fn sample_users() -> anyhow::Result<[NewUser; 2]> {
    Ok([
        verified("Admin Authority", "admin@smartbus.com", "admin123", Role::Authority)?,
        verified("Test Passenger", "user@smartbus.com", "pass1234", Role::Passenger)?,
    ])
}

fn sample_buses() -> [NewBus; 2] {
    [
        NewBus {
            name: "Blue Express".into(),
            bus_number: "BLU-101".into(),
            origin: "Central Station".into(),
            destination: "North Park".into(),
            image_url: None,
            description: Some("Fast service between Central Station and North Park.".into()),
            is_active: true,
        },
        NewBus {
            name: "Black Line".into(),
            bus_number: "BLK-202".into(),
            origin: "Central Station".into(),
            destination: "East Mall".into(),
            image_url: None,
            description: Some("Frequent stops, economical ride.".into()),
            is_active: true,
        },
    ]
}

/// Two runs dated `tomorrow` and one recurring evening run.
fn sample_schedules(blue: i64, black: i64, tomorrow: Date) -> Vec<NewSchedule> {
    vec![
        NewSchedule {
            bus_id: blue,
            date: Some(tomorrow),
            departure_time: time!(9:00),
            arrival_time: time!(9:45),
            source_stop: Some("Central Station".into()),
            dest_stop: Some("North Park".into()),
            extra_info: Some("Two stops only".into()),
        },
        NewSchedule {
            bus_id: blue,
            date: None,
            departure_time: time!(17:00),
            arrival_time: time!(17:45),
            source_stop: Some("Central Station".into()),
            dest_stop: Some("North Park".into()),
            extra_info: Some("Evening run".into()),
        },
        NewSchedule {
            bus_id: black,
            date: Some(tomorrow),
            departure_time: time!(8:30),
            arrival_time: time!(9:30),
            source_stop: Some("Central Station".into()),
            dest_stop: Some("East Mall".into()),
            extra_info: Some("Via Market Street".into()),
        },
    ]
}

/// Wipes all tables and loads the demo accounts, buses and schedules.
pub async fn run(db: &PgPool) -> anyhow::Result<()> {
    sqlx::query("TRUNCATE schedules, buses, users RESTART IDENTITY CASCADE")
        .execute(db)
        .await
        .context("truncate tables")?;

    let users = PgUserRepo::new(db.clone());
    for user in sample_users()? {
        let email = user.email.clone();
        users
            .create(user)
            .await?
            .with_context(|| format!("seed user {email} already exists"))?;
    }

    let buses = PgBusRepo::new(db.clone());
    let [blue, black] = sample_buses();
    let blue = buses.create(blue).await?;
    let black = buses.create(black).await?;

    let tomorrow = OffsetDateTime::now_utc().date() + Duration::days(1);
    let inserted = buses
        .add_schedules(sample_schedules(blue.id, black.id, tomorrow))
        .await?;

    info!(users = 2, buses = 2, schedules = inserted, "seed complete");
    Ok(())
}
