use bon::Builder;
use chrono::NaiveDateTime;
use guzo_api_types::user::UserRole;
use guzo_db::pool::PgConnection;
use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::Result;
use sea_query::{Asterisk, Expr, ExprTrait, Func, Iden, Order, PostgresQueryBuilder, Query};
use sea_query_binder::SqlxBinder;
use thiserror::Error;

use crate::id::UserId;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub created: NaiveDateTime,
    pub updated: Option<NaiveDateTime>,

    pub email: String,
    pub phone: String,
    pub full_name: String,
    pub role: UserRole,
    pub password_hash: String,

    pub active: bool,
    pub verified: bool,
    pub online: bool,

    pub rating: f64,
    pub total_ratings: i32,
    pub language: String,
    pub profile_image: Option<String>,

    pub schedule: serde_json::Value,
    pub last_login: Option<NaiveDateTime>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }

    #[must_use]
    pub fn is_driver(&self) -> bool {
        matches!(self.role, UserRole::Driver)
    }
}

#[derive(Debug, Clone, Iden)]
pub enum UserIdent {
    Users,
    Id,
    Created,
    Updated,
    Email,
    Phone,
    FullName,
    Role,
    PasswordHash,
    Active,
    Verified,
    Online,
    Rating,
    TotalRatings,
    Language,
    ProfileImage,
    Schedule,
    LastLogin,
}

impl User {
    #[tracing::instrument(skip_all, name = "db.users.find")]
    pub async fn find(conn: &mut PgConnection, id: UserId) -> Result<Option<User>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(UserIdent::Users)
            .and_where(Expr::col(UserIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, User, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not find user by id")
    }

    #[tracing::instrument(skip_all, name = "db.users.find_by_email")]
    pub async fn find_by_email(conn: &mut PgConnection, email: &str) -> Result<Option<User>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(UserIdent::Users)
            .and_where(Func::lower(Expr::col(UserIdent::Email)).eq(email.to_lowercase()))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, User, _>(&sql, values)
            .fetch_optional(conn)
            .await
            .erase_context()
            .attach_printable("could not find user by email")
    }

    #[tracing::instrument(skip_all, name = "db.users.check_email_taken")]
    pub async fn check_email_taken(conn: &mut PgConnection, email: &str) -> Result<bool> {
        let (sql, values) = Query::select()
            .expr(Expr::exists(
                Query::select()
                    .column(Asterisk)
                    .from(UserIdent::Users)
                    .and_where(Func::lower(Expr::col(UserIdent::Email)).eq(email.to_lowercase()))
                    .take(),
            ))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_scalar_with::<_, bool, _>(&sql, values)
            .fetch_one(conn)
            .await
            .erase_context()
    }

    #[tracing::instrument(skip_all, name = "db.users.check_phone_taken")]
    pub async fn check_phone_taken(conn: &mut PgConnection, phone: &str) -> Result<bool> {
        let (sql, values) = Query::select()
            .expr(Expr::exists(
                Query::select()
                    .column(Asterisk)
                    .from(UserIdent::Users)
                    .and_where(Expr::col(UserIdent::Phone).eq(phone))
                    .take(),
            ))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_scalar_with::<_, bool, _>(&sql, values)
            .fetch_one(conn)
            .await
            .erase_context()
    }

    #[tracing::instrument(skip_all, name = "db.users.list")]
    pub async fn list(
        conn: &mut PgConnection,
        role: Option<UserRole>,
        limit: u64,
    ) -> Result<Vec<User>> {
        let mut query = Query::select();
        query
            .column(Asterisk)
            .from(UserIdent::Users)
            .order_by(UserIdent::Created, Order::Desc)
            .limit(limit);

        if let Some(role) = role {
            query.and_where(Expr::col(UserIdent::Role).eq(role.as_ref()));
        }

        let (sql, values) = query.build_sqlx(PostgresQueryBuilder);
        sqlx::query_as_with::<_, User, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list users")
    }

    #[tracing::instrument(skip_all, name = "db.users.count")]
    pub async fn count(conn: &mut PgConnection, role: Option<UserRole>) -> Result<i64> {
        let mut query = Query::select();
        query
            .expr(Func::count(Expr::col(UserIdent::Id)))
            .from(UserIdent::Users);

        if let Some(role) = role {
            query.and_where(Expr::col(UserIdent::Role).eq(role.as_ref()));
        }

        let (sql, values) = query.build_sqlx(PostgresQueryBuilder);
        sqlx::query_scalar_with::<_, i64, _>(&sql, values)
            .fetch_one(conn)
            .await
            .erase_context()
    }

    /// Drivers currently flagged available for charter work.
    #[tracing::instrument(skip_all, name = "db.users.list_online_drivers")]
    pub async fn list_online_drivers(conn: &mut PgConnection) -> Result<Vec<User>> {
        let (sql, values) = Query::select()
            .column(Asterisk)
            .from(UserIdent::Users)
            .and_where(Expr::col(UserIdent::Role).eq(UserRole::Driver.as_ref()))
            .and_where(Expr::col(UserIdent::Online).eq(true))
            .and_where(Expr::col(UserIdent::Active).eq(true))
            .order_by(UserIdent::Rating, Order::Desc)
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, User, _>(&sql, values)
            .fetch_all(conn)
            .await
            .erase_context()
            .attach_printable("could not list online drivers")
    }

    #[tracing::instrument(skip_all, name = "db.users.record_login")]
    pub async fn record_login(conn: &mut PgConnection, id: UserId) -> Result<()> {
        let (sql, values) = Query::update()
            .table(UserIdent::Users)
            .value(UserIdent::LastLogin, Expr::current_timestamp())
            .and_where(Expr::col(UserIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_with(&sql, values)
            .execute(conn)
            .await
            .erase_context()
            .attach_printable("could not record login time")?;

        Ok(())
    }

    /// Recomputes the cached rating columns. Runs in the same
    /// transaction as the review insert that triggered it.
    #[tracing::instrument(skip_all, name = "db.users.update_rating")]
    pub async fn update_rating(
        conn: &mut PgConnection,
        id: UserId,
        rating: f64,
        total_ratings: i64,
    ) -> Result<()> {
        let (sql, values) = Query::update()
            .table(UserIdent::Users)
            .value(UserIdent::Rating, rating)
            .value(UserIdent::TotalRatings, total_ratings as i32)
            .value(UserIdent::Updated, Expr::current_timestamp())
            .and_where(Expr::col(UserIdent::Id).eq(id.0))
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_with(&sql, values)
            .execute(conn)
            .await
            .erase_context()
            .attach_printable("could not update cached user rating")?;

        Ok(())
    }
}

#[derive(Debug, Error)]
#[error("Could not insert user")]
pub struct InsertUserError;

#[derive(Builder)]
pub struct InsertUser<'a> {
    pub email: &'a str,
    pub phone: &'a str,
    pub full_name: &'a str,
    #[builder(default = UserRole::Rider)]
    pub role: UserRole,
    pub password_hash: &'a str,
    pub language: Option<&'a str>,
}

impl InsertUser<'_> {
    #[tracing::instrument(skip_all, name = "db.users.insert")]
    pub async fn insert(&self, conn: &mut PgConnection) -> Result<User, InsertUserError> {
        let (sql, values) = Query::insert()
            .into_table(UserIdent::Users)
            .columns([
                UserIdent::Email,
                UserIdent::Phone,
                UserIdent::FullName,
                UserIdent::Role,
                UserIdent::PasswordHash,
                UserIdent::Language,
            ])
            .values_panic([
                self.email.into(),
                self.phone.into(),
                self.full_name.into(),
                self.role.as_ref().into(),
                self.password_hash.into(),
                self.language.unwrap_or("en").into(),
            ])
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, User, _>(&sql, values)
            .fetch_one(conn)
            .await
            .change_context(InsertUserError)
    }
}

#[derive(Debug, Error)]
#[error("Could not update user")]
pub struct UpdateUserError;

#[derive(Builder)]
pub struct UpdateUser<'a> {
    #[builder(into)]
    pub id: UserId,
    pub full_name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub language: Option<&'a str>,
    pub profile_image: Option<&'a str>,
    pub schedule: Option<serde_json::Value>,
    pub online: Option<bool>,
    pub active: Option<bool>,
    pub verified: Option<bool>,
}

impl UpdateUser<'_> {
    #[tracing::instrument(skip_all, name = "db.users.update")]
    pub async fn update(&self, conn: &mut PgConnection) -> Result<User, UpdateUserError> {
        let mut query = Query::update();
        query.table(UserIdent::Users);

        if let Some(full_name) = self.full_name {
            query.value(UserIdent::FullName, full_name);
        }
        if let Some(phone) = self.phone {
            query.value(UserIdent::Phone, phone);
        }
        if let Some(language) = self.language {
            query.value(UserIdent::Language, language);
        }
        if let Some(profile_image) = self.profile_image {
            query.value(UserIdent::ProfileImage, profile_image);
        }
        if let Some(schedule) = &self.schedule {
            query.value(UserIdent::Schedule, schedule.clone());
        }
        if let Some(online) = self.online {
            query.value(UserIdent::Online, online);
        }
        if let Some(active) = self.active {
            query.value(UserIdent::Active, active);
        }
        if let Some(verified) = self.verified {
            query.value(UserIdent::Verified, verified);
        }

        let (sql, values) = query
            .value(UserIdent::Updated, Expr::current_timestamp())
            .and_where(Expr::col(UserIdent::Id).eq(self.id.0))
            .returning_all()
            .build_sqlx(PostgresQueryBuilder);

        sqlx::query_as_with::<_, User, _>(&sql, values)
            .fetch_one(conn)
            .await
            .change_context(UpdateUserError)
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    pub async fn make_user(conn: &mut PgConnection, name: &str, role: UserRole) -> User {
        let email = format!("{name}@example.com");
        let digest = name
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
        let phone = format!("+2519{:08}", digest % 100_000_000);

        InsertUser::builder()
            .email(&email)
            .phone(&phone)
            .full_name(name)
            .role(role)
            .password_hash("$argon2id$fake$fake")
            .build()
            .insert(conn)
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn generate_abebe(conn: &mut PgConnection) -> Result<User> {
        let user = InsertUser::builder()
            .email("abebe@example.com")
            .phone("+251911234567")
            .full_name("Abebe Kebede")
            .password_hash("$argon2id$fake$fake")
            .build()
            .insert(conn)
            .await?;

        Ok(user)
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn should_insert_with_defaults(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = generate_abebe(&mut conn).await.unwrap();

        assert_eq!(user.email, "abebe@example.com");
        assert_eq!(user.role, UserRole::Rider);
        assert_eq!(user.language, "en");
        assert!(user.active);
        assert!(!user.verified);
        assert_eq!(user.rating, 5.0);
        assert_eq!(user.total_ratings, 0);
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn check_email_taken_is_case_insensitive(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        assert!(!User::check_email_taken(&mut conn, "abebe@example.com")
            .await
            .unwrap());

        generate_abebe(&mut conn).await.unwrap();
        assert!(User::check_email_taken(&mut conn, "Abebe@Example.COM")
            .await
            .unwrap());
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn should_find_by_email(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        generate_abebe(&mut conn).await.unwrap();

        let found = User::find_by_email(&mut conn, "ABEBE@example.com")
            .await
            .unwrap();
        assert!(found.is_some());

        let missing = User::find_by_email(&mut conn, "nobody@example.com")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn should_update_only_given_fields(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let old = generate_abebe(&mut conn).await.unwrap();

        let new = UpdateUser::builder()
            .id(old.id)
            .full_name("Abebe K.")
            .online(true)
            .build()
            .update(&mut conn)
            .await
            .unwrap();

        assert_eq!(new.full_name, "Abebe K.");
        assert!(new.online);
        assert_eq!(new.email, old.email);
        assert_eq!(new.phone, old.phone);
        assert!(new.updated.is_some());
    }

    #[sqlx::test(migrator = "crate::DB_MIGRATIONS")]
    async fn counts_by_role(pool: sqlx::PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        test_fixtures::make_user(&mut conn, "rider-one", UserRole::Rider).await;
        test_fixtures::make_user(&mut conn, "driver-one", UserRole::Driver).await;
        test_fixtures::make_user(&mut conn, "driver-two", UserRole::Driver).await;

        assert_eq!(User::count(&mut conn, None).await.unwrap(), 3);
        assert_eq!(
            User::count(&mut conn, Some(UserRole::Driver)).await.unwrap(),
            2
        );
    }
}
