use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::Date;

use crate::buses::repo_types::{Bus, NewBus, NewSchedule, RouteFilter, Schedule};

const BUS_COLUMNS: &str = "id, name, bus_number, origin, destination, image_url, description, is_active, created_at, updated_at";
const SCHEDULE_COLUMNS: &str = "id, bus_id, date, departure_time, arrival_time, source_stop, dest_stop, extra_info, created_at, updated_at";

#[async_trait]
pub trait BusRepo: Send + Sync {
    /// Buses matching `filter`, in storage order.
    async fn list(&self, filter: &RouteFilter) -> anyhow::Result<Vec<Bus>>;
    async fn find(&self, id: i64) -> anyhow::Result<Option<Bus>>;
    async fn create(&self, bus: NewBus) -> anyhow::Result<Bus>;
    /// Schedules of the given buses, optionally restricted to one date.
    async fn schedules_for(&self, bus_ids: &[i64], date: Option<Date>) -> anyhow::Result<Vec<Schedule>>;
    async fn add_schedule(&self, schedule: NewSchedule) -> anyhow::Result<Schedule>;
    async fn add_schedules(&self, schedules: Vec<NewSchedule>) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgBusRepo {
    db: PgPool,
}

impl PgBusRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BusRepo for PgBusRepo {
    async fn list(&self, filter: &RouteFilter) -> anyhow::Result<Vec<Bus>> {
        let rows = sqlx::query_as::<_, Bus>(&format!(
            r#"
            SELECT {BUS_COLUMNS}
              FROM buses
             WHERE ($1::text IS NULL OR origin = $1)
               AND ($2::text IS NULL OR destination = $2)
             ORDER BY id
            "#
        ))
        .bind(&filter.origin)
        .bind(&filter.destination)
        .fetch_all(&self.db)
        .await
        .context("list buses")?;
        Ok(rows)
    }

    async fn find(&self, id: i64) -> anyhow::Result<Option<Bus>> {
        let bus = sqlx::query_as::<_, Bus>(&format!("SELECT {BUS_COLUMNS} FROM buses WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find bus")?;
        Ok(bus)
    }

    async fn create(&self, bus: NewBus) -> anyhow::Result<Bus> {
        let created = sqlx::query_as::<_, Bus>(&format!(
            r#"
            INSERT INTO buses (name, bus_number, origin, destination, image_url, description, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {BUS_COLUMNS}
            "#
        ))
        .bind(&bus.name)
        .bind(&bus.bus_number)
        .bind(&bus.origin)
        .bind(&bus.destination)
        .bind(&bus.image_url)
        .bind(&bus.description)
        .bind(bus.is_active)
        .fetch_one(&self.db)
        .await
        .context("insert bus")?;
        Ok(created)
    }

    async fn schedules_for(&self, bus_ids: &[i64], date: Option<Date>) -> anyhow::Result<Vec<Schedule>> {
        let rows = sqlx::query_as::<_, Schedule>(&format!(
            r#"
            SELECT {SCHEDULE_COLUMNS}
              FROM schedules
             WHERE bus_id = ANY($1)
               AND ($2::date IS NULL OR date = $2)
             ORDER BY bus_id, id
            "#
        ))
        .bind(bus_ids)
        .bind(date)
        .fetch_all(&self.db)
        .await
        .context("list schedules")?;
        Ok(rows)
    }

    async fn add_schedule(&self, schedule: NewSchedule) -> anyhow::Result<Schedule> {
        let created = sqlx::query_as::<_, Schedule>(&format!(
            r#"
            INSERT INTO schedules (bus_id, date, departure_time, arrival_time, source_stop, dest_stop, extra_info)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SCHEDULE_COLUMNS}
            "#
        ))
        .bind(schedule.bus_id)
        .bind(schedule.date)
        .bind(schedule.departure_time)
        .bind(schedule.arrival_time)
        .bind(&schedule.source_stop)
        .bind(&schedule.dest_stop)
        .bind(&schedule.extra_info)
        .fetch_one(&self.db)
        .await
        .context("insert schedule")?;
        Ok(created)
    }

    async fn add_schedules(&self, schedules: Vec<NewSchedule>) -> anyhow::Result<u64> {
        if schedules.is_empty() {
            return Ok(0);
        }
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO schedules (bus_id, date, departure_time, arrival_time, source_stop, dest_stop, extra_info) ",
        );
        qb.push_values(schedules, |mut row, s| {
            row.push_bind(s.bus_id)
                .push_bind(s.date)
                .push_bind(s.departure_time)
                .push_bind(s.arrival_time)
                .push_bind(s.source_stop)
                .push_bind(s.dest_stop)
                .push_bind(s.extra_info);
        });
        let done = qb
            .build()
            .execute(&self.db)
            .await
            .context("bulk insert schedules")?;
        Ok(done.rows_affected())
    }
}
