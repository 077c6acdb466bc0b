use bon::Builder;
use chrono::NaiveDateTime;
use guzo_api_types::vehicle::VehicleType;
use guzo_db::pool::PgConnection;
use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::Result;
use sea_query::{Asterisk, Expr, ExprTrait, Func, Iden, Order, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use thiserror::Error;

use crate::id::{UserId, VehicleId};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Vehicle {
    pub id: VehicleId,
    pub created: NaiveDateTime,
    pub updated: Option<NaiveDateTime>,

    pub driver_id: UserId,

    pub plate_number: String,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub vehicle_type: VehicleType,
    pub capacity: i32,

    pub active: bool,
    pub verified: bool,
}

#[derive(Debug, Clone, Iden)]
pub enum VehicleIdent {
    Vehicles,
    Id,
    Created,
    Updated,
    DriverId,
    PlateNumber,
    Make,
    Model,
    Year,
    Color,
    VehicleType,
    Capacity,
    Active,
    Verified,
}

impl Vehicle {
    #[tracing::instrument(skip_all, name = "db.vehicles.find")]
    pub async fn find(conn: &mut PgConnection, id: VehicleId) -> Result<Option<Vehicle>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(VehicleIdent::Vehicles)
            .and_where(Expr::col(VehicleIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Vehicle, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not find vehicle by id")
    }

    #[tracing::instrument(skip_all, name = "db.vehicles.check_plate_taken")]
    pub async fn check_plate_taken(conn: &mut PgConnection, plate_number: &str) -> Result<bool> {
        let (sql, values) = Query::select()
            .expr(Expr::exists(
                Query::select()
                    .column(Asterisk)
                    .from(VehicleIdent::Vehicles)
                    .and_where(
                        Func::lower(Expr::col(VehicleIdent::PlateNumber))
                            .eq(plate_number.to_lowercase()),
                    )
                    .take(),
            ))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_scalar_with::<_, bool, _>(&sql, values)
            .fetch_one(conn)
            .await
            .erase_context()
    }

    #[tracing::instrument(skip_all, name = "db.vehicles.list_by_driver")]
    pub async fn list_by_driver(
        conn: &mut PgConnection,
        driver_id: UserId,
    ) -> Result<Vec<Vehicle>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(VehicleIdent::Vehicles)
            .and_where(Expr::col(VehicleIdent::DriverId).eq(driver_id.0))
            .order_by(VehicleIdent::Created, Order::Desc)
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Vehicle, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list vehicles of a driver")
    }

    #[tracing::instrument(skip_all, name = "db.vehicles.delete")]
    pub async fn delete(conn: &mut PgConnection, id: VehicleId) -> Result<bool> {
        let (sql, values) = Query::delete()
            .from_table(VehicleIdent::Vehicles)
            .and_where(Expr::col(VehicleIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        let result = sqlx::query_with(&sql, values)
            .execute(conn)
            .await
            .erase_context()
            .attach_printable("could not delete vehicle")?;

        Ok(result.rows_affected() > 0)
    }

    /// Admin action after checking the registration papers.
    #[tracing::instrument(skip_all, name = "db.vehicles.verify")]
    pub async fn verify(conn: &mut PgConnection, id: VehicleId) -> Result<Option<Vehicle>> {
        let (sql, values) = Query::update()
            .table(VehicleIdent::Vehicles)
            .value(VehicleIdent::Verified, true)
            .value(VehicleIdent::Updated, Expr::current_timestamp())
            .and_where(Expr::col(VehicleIdent::Id).eq(id.0))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Vehicle, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not verify vehicle")
    }
}

#[derive(Debug, Error)]
#[error("Could not insert vehicle")]
pub struct InsertVehicleError;

#[derive(Builder)]
pub struct InsertVehicle<'a> {
    #[builder(into)]
    pub driver_id: UserId,
    pub plate_number: &'a str,
    pub make: &'a str,
    pub model: &'a str,
    pub year: Option<i32>,
    pub color: Option<&'a str>,
    #[builder(default = VehicleType::Sedan)]
    pub vehicle_type: VehicleType,
    pub capacity: i32,
}

impl InsertVehicle<'_> {
    #[tracing::instrument(skip_all, name = "db.vehicles.insert")]
    pub async fn insert(&self, conn: &mut PgConnection) -> Result<Vehicle, InsertVehicleError> {
        let (sql, values) = Query::insert()
            .into_table(VehicleIdent::Vehicles)
            .columns([
                VehicleIdent::DriverId,
                VehicleIdent::PlateNumber,
                VehicleIdent::Make,
                VehicleIdent::Model,
                VehicleIdent::Year,
                VehicleIdent::Color,
                VehicleIdent::VehicleType,
                VehicleIdent::Capacity,
            ])
            .values_panic([
                self.driver_id.0.into(),
                self.plate_number.into(),
                self.make.into(),
                self.model.into(),
                self.year.into(),
                self.color.into(),
                self.vehicle_type.as_ref().into(),
                self.capacity.into(),
            ])
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Vehicle, _>(&sql, values)
            .fetch_one(conn)
            .await
            .change_context(InsertVehicleError)
    }
}

#[derive(Debug, Error)]
#[error("Could not update vehicle")]
pub struct UpdateVehicleError;

#[derive(Builder)]
pub struct UpdateVehicle<'a> {
    #[builder(into)]
    pub id: VehicleId,
    pub plate_number: Option<&'a str>,
    pub make: Option<&'a str>,
    pub model: Option<&'a str>,
    pub year: Option<i32>,
    pub color: Option<&'a str>,
    pub vehicle_type: Option<VehicleType>,
    pub capacity: Option<i32>,
    pub active: Option<bool>,
}

impl UpdateVehicle<'_> {
    #[tracing::instrument(skip_all, name = "db.vehicles.update")]
    pub async fn update(&self, conn: &mut PgConnection) -> Result<Vehicle, UpdateVehicleError> {
        let mut query = Query::update();
        query.table(VehicleIdent::Vehicles);

        if let Some(plate_number) = self.plate_number {
            query.value(VehicleIdent::PlateNumber, plate_number);
        }
        if let Some(make) = self.make {
            query.value(VehicleIdent::Make, make);
        }
        if let Some(model) = self.model {
            query.value(VehicleIdent::Model, model);
        }
        if let Some(year) = self.year {
            query.value(VehicleIdent::Year, year);
        }
        if let Some(color) = self.color {
            query.value(VehicleIdent::Color, color);
        }
        if let Some(vehicle_type) = self.vehicle_type {
            query.value(VehicleIdent::VehicleType, vehicle_type.as_ref());
        }
        if let Some(capacity) = self.capacity {
            query.value(VehicleIdent::Capacity, capacity);
        }
        if let Some(active) = self.active {
            query.value(VehicleIdent::Active, active);
        }

        let (sql, values) = query
            .value(VehicleIdent::Updated, Expr::current_timestamp())
            .and_where(Expr::col(VehicleIdent::Id).eq(self.id.0))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, Vehicle, _>(&sql, values)
            .fetch_one(conn)
            .await
            .change_context(UpdateVehicleError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::test_fixtures::make_user;
    use guzo_api_types::user::UserRole;

    async fn make_hiace(conn: &mut PgConnection, driver_id: UserId) -> Vehicle {
        InsertVehicle::builder()
            .driver_id(driver_id)
            .plate_number("AA-12345")
            .make("Toyota")
            .model("HiAce")
            .vehicle_type(VehicleType::Minibus)
            .capacity(12)
            .build()
            .insert(conn)
            .await
            .unwrap()
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn plate_lookup_is_case_insensitive(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let driver = make_user(&mut conn, "driver-plate", UserRole::Driver).await;

        assert!(!Vehicle::check_plate_taken(&mut conn, "AA-12345").await.unwrap());
        make_hiace(&mut conn, driver.id).await;
        assert!(Vehicle::check_plate_taken(&mut conn, "aa-12345").await.unwrap());
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn verify_flips_the_flag(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let driver = make_user(&mut conn, "driver-verify", UserRole::Driver).await;
        let vehicle = make_hiace(&mut conn, driver.id).await;
        assert!(!vehicle.verified);

        let verified = Vehicle::verify(&mut conn, vehicle.id).await.unwrap().unwrap();
        assert!(verified.verified);
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn update_touches_only_given_fields(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let driver = make_user(&mut conn, "driver-update", UserRole::Driver).await;
        let vehicle = make_hiace(&mut conn, driver.id).await;

        let updated = UpdateVehicle::builder()
            .id(vehicle.id)
            .color("white")
            .capacity(14)
            .build()
            .update(&mut conn)
            .await
            .unwrap();

        assert_eq!(updated.color.as_deref(), Some("white"));
        assert_eq!(updated.capacity, 14);
        assert_eq!(updated.plate_number, vehicle.plate_number);
    }
}
