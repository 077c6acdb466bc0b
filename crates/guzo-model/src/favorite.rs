use bon::Builder;
use chrono::NaiveDateTime;
use guzo_db::pool::PgConnection;
use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::Result;
use sea_query::{
    Alias, Asterisk, Expr, ExprTrait, Func, Iden, OnConflict, Order, PostgresQueryBuilder, Query,
};
use sea_query_binder::SqlxBinder;
use thiserror::Error;

use crate::id::{FavoriteDriverId, FavoriteRouteId, UserId};
use crate::user::UserIdent;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FavoriteRoute {
    pub id: FavoriteRouteId,
    pub created: NaiveDateTime,

    pub user_id: UserId,
    pub origin: String,
    pub destination: String,

    pub use_count: i32,
    pub last_used: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FavoriteDriver {
    pub id: FavoriteDriverId,
    pub created: NaiveDateTime,

    pub user_id: UserId,
    pub driver_id: UserId,
    pub note: Option<String>,
}

/// A favorite driver joined with the driver's public contact columns.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FavoriteDriverView {
    #[sqlx(flatten)]
    pub favorite: FavoriteDriver,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub driver_rating: Option<f64>,
}

#[derive(Debug, Clone, Iden)]
pub enum FavoriteRouteIdent {
    FavoriteRoutes,
    Id,
    Created,
    UserId,
    Origin,
    Destination,
    UseCount,
    LastUsed,
}

#[derive(Debug, Clone, Iden)]
pub enum FavoriteDriverIdent {
    FavoriteDrivers,
    Id,
    Created,
    UserId,
    DriverId,
    Note,
}

impl FavoriteRoute {
    #[tracing::instrument(skip_all, name = "db.favorite_routes.list_by_user")]
    pub async fn list_by_user(
        conn: &mut PgConnection,
        user_id: UserId,
    ) -> Result<Vec<FavoriteRoute>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(FavoriteRouteIdent::FavoriteRoutes)
            .and_where(Expr::col(FavoriteRouteIdent::UserId).eq(user_id.0))
            .order_by(FavoriteRouteIdent::UseCount, Order::Desc)
            .order_by(FavoriteRouteIdent::Created, Order::Desc)
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, FavoriteRoute, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list favorite routes")
    }

    /// Saves a route once per user; re-adding is a no-op.
    #[tracing::instrument(skip_all, name = "db.favorite_routes.insert")]
    pub async fn insert(
        conn: &mut PgConnection,
        user_id: UserId,
        origin: &str,
        destination: &str,
    ) -> Result<Option<FavoriteRoute>> {
        let (sql, values) = Query::insert()
            .into_table(FavoriteRouteIdent::FavoriteRoutes)
            .columns([
                FavoriteRouteIdent::UserId,
                FavoriteRouteIdent::Origin,
                FavoriteRouteIdent::Destination,
            ])
            .values_panic([user_id.0.into(), origin.into(), destination.into()])
            .on_conflict(
                OnConflict::columns([
                    FavoriteRouteIdent::UserId,
                    FavoriteRouteIdent::Origin,
                    FavoriteRouteIdent::Destination,
                ])
                .do_nothing()
                .to_owned(),
            )
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, FavoriteRoute, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not save favorite route")
    }

    #[tracing::instrument(skip_all, name = "db.favorite_routes.delete")]
    pub async fn delete(
        conn: &mut PgConnection,
        id: FavoriteRouteId,
        user_id: UserId,
    ) -> Result<bool> {
        let (sql, values) = Query::delete()
            .from_table(FavoriteRouteIdent::FavoriteRoutes)
            .and_where(Expr::col(FavoriteRouteIdent::Id).eq(id.0))
            .and_where(Expr::col(FavoriteRouteIdent::UserId).eq(user_id.0))
            .build_sqlx(PostgresQueryBuilder);

        let result = sqlx::query_with(&sql, values)
            .execute(conn)
            .await
            .erase_context()
            .attach_printable("could not delete favorite route")?;

        Ok(result.rows_affected() > 0)
    }

    /// Bumps the usage counters when a favorited route gets booked.
    #[tracing::instrument(skip_all, name = "db.favorite_routes.touch")]
    pub async fn touch(
        conn: &mut PgConnection,
        user_id: UserId,
        origin: &str,
        destination: &str,
    ) -> Result<()> {
        let (sql, values) = Query::update()
            .table(FavoriteRouteIdent::FavoriteRoutes)
            .value(
                FavoriteRouteIdent::UseCount,
                Expr::col(FavoriteRouteIdent::UseCount).add(1),
            )
            .value(FavoriteRouteIdent::LastUsed, Expr::current_timestamp())
            .and_where(Expr::col(FavoriteRouteIdent::UserId).eq(user_id.0))
            .and_where(
                Func::lower(Expr::col(FavoriteRouteIdent::Origin)).eq(origin.to_lowercase()),
            )
            .and_where(
                Func::lower(Expr::col(FavoriteRouteIdent::Destination))
                    .eq(destination.to_lowercase()),
            )
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_with(&sql, values)
            .execute(conn)
            .await
            .erase_context()
            .attach_printable("could not bump favorite route usage")?;

        Ok(())
    }
}

#[derive(Debug, Error)]
#[error("Could not save favorite driver")]
pub struct InsertFavoriteDriverError;

#[derive(Builder)]
pub struct InsertFavoriteDriver<'a> {
    #[builder(into)]
    pub user_id: UserId,
    #[builder(into)]
    pub driver_id: UserId,
    pub note: Option<&'a str>,
}

impl InsertFavoriteDriver<'_> {
    /// Saves a driver once per user; re-adding is a no-op.
    #[tracing::instrument(skip_all, name = "db.favorite_drivers.insert")]
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
    ) -> Result<Option<FavoriteDriver>, InsertFavoriteDriverError> {
        let (sql, values) = Query::insert()
            .into_table(FavoriteDriverIdent::FavoriteDrivers)
            .columns([
                FavoriteDriverIdent::UserId,
                FavoriteDriverIdent::DriverId,
                FavoriteDriverIdent::Note,
            ])
            .values_panic([self.user_id.0.into(), self.driver_id.0.into(), self.note.into()])
            .on_conflict(
                OnConflict::columns([
                    FavoriteDriverIdent::UserId,
                    FavoriteDriverIdent::DriverId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, FavoriteDriver, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .change_context(InsertFavoriteDriverError)
    }
}

impl FavoriteDriver {
    #[tracing::instrument(skip_all, name = "db.favorite_drivers.list_by_user")]
    pub async fn list_by_user(
        conn: &mut PgConnection,
        user_id: UserId,
    ) -> Result<Vec<FavoriteDriverView>> {
        let (sql, values) = Query::select()
            .column((FavoriteDriverIdent::FavoriteDrivers, Asterisk))
            .expr_as(
                Expr::col((UserIdent::Users, UserIdent::FullName)),
                Alias::new("driver_name"),
            )
            .expr_as(
                Expr::col((UserIdent::Users, UserIdent::Phone)),
                Alias::new("driver_phone"),
            )
            .expr_as(
                Expr::col((UserIdent::Users, UserIdent::Rating)),
                Alias::new("driver_rating"),
            )
            .from(FavoriteDriverIdent::FavoriteDrivers)
            .left_join(
                UserIdent::Users,
                Expr::col((UserIdent::Users, UserIdent::Id)).equals((
                    FavoriteDriverIdent::FavoriteDrivers,
                    FavoriteDriverIdent::DriverId,
                )),
            )
            .and_where(
                Expr::col((
                    FavoriteDriverIdent::FavoriteDrivers,
                    FavoriteDriverIdent::UserId,
                ))
                .eq(user_id.0),
            )
            .order_by(
                (FavoriteDriverIdent::FavoriteDrivers, FavoriteDriverIdent::Created),
                Order::Desc,
            )
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, FavoriteDriverView, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list favorite drivers")
    }

    #[tracing::instrument(skip_all, name = "db.favorite_drivers.delete")]
    pub async fn delete(
        conn: &mut PgConnection,
        id: FavoriteDriverId,
        user_id: UserId,
    ) -> Result<bool> {
        let (sql, values) = Query::delete()
            .from_table(FavoriteDriverIdent::FavoriteDrivers)
            .and_where(Expr::col(FavoriteDriverIdent::Id).eq(id.0))
            .and_where(Expr::col(FavoriteDriverIdent::UserId).eq(user_id.0))
            .build_sqlx(PostgresQueryBuilder);

        let result = sqlx::query_with(&sql, values)
            .execute(conn)
            .await
            .erase_context()
            .attach_printable("could not delete favorite driver")?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::test_fixtures::make_user;
    use guzo_api_types::user::UserRole;

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn saving_a_route_twice_is_a_noop(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let rider = make_user(&mut conn, "rider-fav", UserRole::Rider).await;

        let saved = FavoriteRoute::insert(&mut conn, rider.id, "Addis Ababa", "Hawassa")
            .await
            .unwrap();
        assert!(saved.is_some());

        let repeated = FavoriteRoute::insert(&mut conn, rider.id, "Addis Ababa", "Hawassa")
            .await
            .unwrap();
        assert!(repeated.is_none());

        let all = FavoriteRoute::list_by_user(&mut conn, rider.id).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn touch_bumps_usage(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let rider = make_user(&mut conn, "rider-touch", UserRole::Rider).await;

        FavoriteRoute::insert(&mut conn, rider.id, "Addis Ababa", "Hawassa")
            .await
            .unwrap();
        FavoriteRoute::touch(&mut conn, rider.id, "addis ababa", "HAWASSA")
            .await
            .unwrap();

        let all = FavoriteRoute::list_by_user(&mut conn, rider.id).await.unwrap();
        assert_eq!(all[0].use_count, 1);
        assert!(all[0].last_used.is_some());
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn favorite_drivers_join_contact_info(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let rider = make_user(&mut conn, "rider-favd", UserRole::Rider).await;
        let driver = make_user(&mut conn, "driver-favd", UserRole::Driver).await;

        InsertFavoriteDriver::builder()
            .user_id(rider.id)
            .driver_id(driver.id)
            .note("always on time")
            .build()
            .insert(&mut conn)
            .await
            .unwrap()
            .unwrap();

        let all = FavoriteDriver::list_by_user(&mut conn, rider.id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].driver_name.as_deref(), Some("driver-favd"));
        assert_eq!(all[0].favorite.note.as_deref(), Some("always on time"));
    }
}
