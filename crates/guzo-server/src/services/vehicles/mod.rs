use guzo_api_types::error::category::RegisterVehicleFailed;
use guzo_api_types::vehicle::VehicleType;
use guzo_error::{ApiError, ApiErrorCategory};
use guzo_model::id::VehicleId;
use guzo_model::vehicle::{InsertVehicle, UpdateVehicle as UpdateVehicleChangeset};
use guzo_model::Vehicle;

use crate::extract::{SessionAdmin, SessionDriver};
use crate::App;

const CAPACITY_RANGE: std::ops::RangeInclusive<i32> = 1..=50;

#[derive(Debug)]
pub struct RegisterVehicle<'a> {
    pub plate_number: &'a str,
    pub make: &'a str,
    pub model: &'a str,
    pub year: Option<i32>,
    pub color: Option<&'a str>,
    pub vehicle_type: VehicleType,
    pub capacity: i32,
}

impl RegisterVehicle<'_> {
    #[tracing::instrument(skip(self, app, driver), name = "services.vehicles.register")]
    pub async fn perform(self, app: &App, driver: &SessionDriver) -> Result<Vehicle, ApiError> {
        if self.plate_number.trim().len() < 4 {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Invalid plate number."));
        }

        if !CAPACITY_RANGE.contains(&self.capacity) {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Capacity must be between 1 and 50."));
        }

        if let Some(year) = self.year {
            if !(1990..=2030).contains(&year) {
                return Err(
                    ApiError::new(ApiErrorCategory::InvalidRequest).message("Invalid year.")
                );
            }
        }

        let mut conn = app.db_write().await?;
        if Vehicle::check_plate_taken(&mut conn, self.plate_number).await? {
            return Err(ApiError::new(ApiErrorCategory::RegisterVehicleFailed(
                RegisterVehicleFailed::PlateNumberTaken,
            )));
        }

        let vehicle = InsertVehicle::builder()
            .driver_id(driver.id)
            .plate_number(self.plate_number)
            .make(self.make)
            .model(self.model)
            .maybe_year(self.year)
            .maybe_color(self.color)
            .vehicle_type(self.vehicle_type)
            .capacity(self.capacity)
            .build()
            .insert(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(vehicle)
    }
}

#[derive(Debug)]
pub struct UpdateVehicle<'a> {
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
    #[tracing::instrument(skip(self, app, driver), name = "services.vehicles.update")]
    pub async fn perform(self, app: &App, driver: &SessionDriver) -> Result<Vehicle, ApiError> {
        if let Some(capacity) = self.capacity {
            if !CAPACITY_RANGE.contains(&capacity) {
                return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                    .message("Capacity must be between 1 and 50."));
            }
        }

        let mut conn = app.db_write().await?;
        let Some(vehicle) = Vehicle::find(&mut conn, self.id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        if vehicle.driver_id != driver.id && !driver.is_admin() {
            return Err(ApiError::new(ApiErrorCategory::AccessDenied));
        }

        if let Some(plate_number) = self.plate_number {
            let changed = !plate_number.eq_ignore_ascii_case(&vehicle.plate_number);
            if changed && Vehicle::check_plate_taken(&mut conn, plate_number).await? {
                return Err(ApiError::new(ApiErrorCategory::RegisterVehicleFailed(
                    RegisterVehicleFailed::PlateNumberTaken,
                )));
            }
        }

        let vehicle = UpdateVehicleChangeset::builder()
            .id(self.id)
            .maybe_plate_number(self.plate_number)
            .maybe_make(self.make)
            .maybe_model(self.model)
            .maybe_year(self.year)
            .maybe_color(self.color)
            .maybe_vehicle_type(self.vehicle_type)
            .maybe_capacity(self.capacity)
            .maybe_active(self.active)
            .build()
            .update(&mut conn)
            .await?;

        conn.commit().await?;
        Ok(vehicle)
    }
}

#[derive(Debug)]
pub struct DeleteVehicle {
    pub id: VehicleId,
}

impl DeleteVehicle {
    #[tracing::instrument(skip(app, driver), name = "services.vehicles.delete")]
    pub async fn perform(self, app: &App, driver: &SessionDriver) -> Result<(), ApiError> {
        let mut conn = app.db_write().await?;
        let Some(vehicle) = Vehicle::find(&mut conn, self.id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        if vehicle.driver_id != driver.id && !driver.is_admin() {
            return Err(ApiError::new(ApiErrorCategory::AccessDenied));
        }

        Vehicle::delete(&mut conn, self.id).await?;
        conn.commit().await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct ListMyVehicles;

impl ListMyVehicles {
    #[tracing::instrument(skip_all, name = "services.vehicles.list_mine")]
    pub async fn perform(self, app: &App, driver: &SessionDriver) -> Result<Vec<Vehicle>, ApiError> {
        let mut conn = app.db_read().await?;
        let vehicles = Vehicle::list_by_driver(&mut conn, driver.id).await?;
        Ok(vehicles)
    }
}

#[derive(Debug)]
pub struct VerifyVehicle {
    pub id: VehicleId,
}

impl VerifyVehicle {
    #[tracing::instrument(skip(app), name = "services.vehicles.verify")]
    pub async fn perform(self, app: &App, _admin: &SessionAdmin) -> Result<Vehicle, ApiError> {
        let mut conn = app.db_write().await?;
        let Some(vehicle) = Vehicle::verify(&mut conn, self.id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        };

        conn.commit().await?;
        Ok(vehicle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn rejects_duplicate_plates(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let driver = test_utils::users::driver_session(&app, "veh-driver").await;

        let request = || RegisterVehicle {
            plate_number: "AA-12345",
            make: "Toyota",
            model: "HiAce",
            year: Some(2018),
            color: None,
            vehicle_type: VehicleType::Minibus,
            capacity: 12,
        };

        request().perform(&app, &driver).await.unwrap();

        let error = RegisterVehicle {
            plate_number: "aa-12345",
            ..request()
        }
        .perform(&app, &driver)
        .await
        .unwrap_err();

        assert_eq!(
            error.category,
            ApiErrorCategory::RegisterVehicleFailed(RegisterVehicleFailed::PlateNumberTaken)
        );
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn owners_keep_their_plate_on_update(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let driver = test_utils::users::driver_session(&app, "veh-owner").await;

        let vehicle = RegisterVehicle {
            plate_number: "AA-77777",
            make: "Toyota",
            model: "Corolla",
            year: None,
            color: None,
            vehicle_type: VehicleType::Sedan,
            capacity: 4,
        }
        .perform(&app, &driver)
        .await
        .unwrap();

        // re-submitting the same plate with different casing is fine
        let updated = UpdateVehicle {
            id: vehicle.id,
            plate_number: Some("aa-77777"),
            make: None,
            model: None,
            year: None,
            color: Some("silver"),
            vehicle_type: None,
            capacity: None,
            active: None,
        }
        .perform(&app, &driver)
        .await
        .unwrap();

        assert_eq!(updated.color.as_deref(), Some("silver"));
    }
}
