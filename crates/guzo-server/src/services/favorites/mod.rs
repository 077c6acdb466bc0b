use guzo_error::{ApiError, ApiErrorCategory};
use guzo_model::favorite::{
    FavoriteDriver, FavoriteDriverView, FavoriteRoute, InsertFavoriteDriver,
};
use guzo_model::id::{FavoriteDriverId, FavoriteRouteId, UserId};
use guzo_model::User;

use crate::extract::SessionUser;
use crate::App;

#[derive(Debug)]
pub struct AddFavoriteRoute<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
}

impl AddFavoriteRoute<'_> {
    #[tracing::instrument(skip(self, app, session_user), name = "services.favorites.add_route")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<FavoriteRoute, ApiError> {
        if self.origin.trim().len() < 2 || self.destination.trim().len() < 2 {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Origin and destination are required."));
        }

        let mut conn = app.db_write().await?;
        let inserted =
            FavoriteRoute::insert(&mut conn, session_user.id, self.origin, self.destination)
                .await?;

        conn.commit().await?;

        match inserted {
            Some(route) => Ok(route),
            // already saved; return the existing entry
            None => {
                let mut conn = app.db_read().await?;
                FavoriteRoute::list_by_user(&mut conn, session_user.id)
                    .await?
                    .into_iter()
                    .find(|route| {
                        route.origin.eq_ignore_ascii_case(self.origin)
                            && route.destination.eq_ignore_ascii_case(self.destination)
                    })
                    .ok_or_else(|| ApiError::new(ApiErrorCategory::NotFound))
            }
        }
    }
}

#[derive(Debug)]
pub struct ListFavoriteRoutes;

impl ListFavoriteRoutes {
    #[tracing::instrument(skip_all, name = "services.favorites.list_routes")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<Vec<FavoriteRoute>, ApiError> {
        let mut conn = app.db_read().await?;
        let routes = FavoriteRoute::list_by_user(&mut conn, session_user.id).await?;
        Ok(routes)
    }
}

#[derive(Debug)]
pub struct RemoveFavoriteRoute {
    pub id: FavoriteRouteId,
}

impl RemoveFavoriteRoute {
    #[tracing::instrument(skip(app, session_user), name = "services.favorites.remove_route")]
    pub async fn perform(self, app: &App, session_user: &SessionUser) -> Result<(), ApiError> {
        let mut conn = app.db_write().await?;
        if !FavoriteRoute::delete(&mut conn, self.id, session_user.id).await? {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        }

        conn.commit().await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct AddFavoriteDriver<'a> {
    pub driver_id: UserId,
    pub note: Option<&'a str>,
}

impl AddFavoriteDriver<'_> {
    const MAX_NOTE_LEN: usize = 200;

    #[tracing::instrument(skip(self, app, session_user), name = "services.favorites.add_driver")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<FavoriteDriver, ApiError> {
        if self.note.is_some_and(|note| note.len() > Self::MAX_NOTE_LEN) {
            return Err(
                ApiError::new(ApiErrorCategory::InvalidRequest).message("Note is too long.")
            );
        }

        let mut conn = app.db_write().await?;

        let Some(driver) = User::find(&mut conn, self.driver_id).await? else {
            return Err(ApiError::new(ApiErrorCategory::NotFound).message("No such driver."));
        };

        if !driver.is_driver() {
            return Err(ApiError::new(ApiErrorCategory::InvalidRequest)
                .message("Only drivers can be favorited."));
        }

        let inserted = InsertFavoriteDriver::builder()
            .user_id(session_user.id)
            .driver_id(self.driver_id)
            .maybe_note(self.note)
            .build()
            .insert(&mut conn)
            .await?;

        conn.commit().await?;

        match inserted {
            Some(favorite) => Ok(favorite),
            None => {
                let mut conn = app.db_read().await?;
                FavoriteDriver::list_by_user(&mut conn, session_user.id)
                    .await?
                    .into_iter()
                    .map(|view| view.favorite)
                    .find(|favorite| favorite.driver_id == self.driver_id)
                    .ok_or_else(|| ApiError::new(ApiErrorCategory::NotFound))
            }
        }
    }
}

#[derive(Debug)]
pub struct ListFavoriteDrivers;

impl ListFavoriteDrivers {
    #[tracing::instrument(skip_all, name = "services.favorites.list_drivers")]
    pub async fn perform(
        self,
        app: &App,
        session_user: &SessionUser,
    ) -> Result<Vec<FavoriteDriverView>, ApiError> {
        let mut conn = app.db_read().await?;
        let drivers = FavoriteDriver::list_by_user(&mut conn, session_user.id).await?;
        Ok(drivers)
    }
}

#[derive(Debug)]
pub struct RemoveFavoriteDriver {
    pub id: FavoriteDriverId,
}

impl RemoveFavoriteDriver {
    #[tracing::instrument(skip(app, session_user), name = "services.favorites.remove_driver")]
    pub async fn perform(self, app: &App, session_user: &SessionUser) -> Result<(), ApiError> {
        let mut conn = app.db_write().await?;
        if !FavoriteDriver::delete(&mut conn, self.id, session_user.id).await? {
            return Err(ApiError::new(ApiErrorCategory::NotFound));
        }

        conn.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn only_drivers_can_be_favorited(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let rider = test_utils::users::rider_session(&app, "fav-rider").await;
        let other_rider = test_utils::users::rider_session(&app, "fav-other").await;

        let error = AddFavoriteDriver {
            driver_id: other_rider.id,
            note: None,
        }
        .perform(&app, &rider)
        .await
        .unwrap_err();

        assert_eq!(error.category, ApiErrorCategory::InvalidRequest);
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn re_adding_a_route_returns_the_existing_entry(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let rider = test_utils::users::rider_session(&app, "fav-route").await;

        let first = AddFavoriteRoute {
            origin: "Addis Ababa",
            destination: "Hawassa",
        }
        .perform(&app, &rider)
        .await
        .unwrap();

        let second = AddFavoriteRoute {
            origin: "Addis Ababa",
            destination: "Hawassa",
        }
        .perform(&app, &rider)
        .await
        .unwrap();

        assert_eq!(first.id, second.id);
    }

    #[sqlx::test(migrator = "guzo_model::DB_MIGRATIONS")]
    async fn removing_someone_elses_favorite_is_not_found(pool: sqlx::PgPool) {
        let app = test_utils::build_app(pool);
        let rider = test_utils::users::rider_session(&app, "fav-owner").await;
        let sneaky = test_utils::users::rider_session(&app, "fav-sneaky").await;

        let route = AddFavoriteRoute {
            origin: "Addis Ababa",
            destination: "Gondar",
        }
        .perform(&app, &rider)
        .await
        .unwrap();

        let error = RemoveFavoriteRoute { id: route.id }
            .perform(&app, &sneaky)
            .await
            .unwrap_err();
        assert_eq!(error.category, ApiErrorCategory::NotFound);
    }
}
