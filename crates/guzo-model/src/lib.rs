//! Domain rows and every SQL statement of the Guzo marketplace.
//!
//! Each module owns one table: the row struct, `Insert*`/`Update*`
//! changesets and the query functions, all taking `&mut PgConnection`
//! so callers decide whether they run standalone or inside a
//! transaction.
pub mod analytics;
pub mod booking;
pub mod favorite;
pub mod id;
pub mod payment;
pub mod pricing;
pub mod review;
pub mod trip;
pub mod user;
pub mod vehicle;
pub mod verification;

pub use self::booking::Booking;
pub use self::payment::Payment;
pub use self::review::Review;
pub use self::trip::DriverTrip;
pub use self::user::User;
pub use self::vehicle::Vehicle;
pub use self::verification::DriverVerification;

/// Embedded migrations; also referenced by `#[sqlx::test]` suites.
pub static DB_MIGRATIONS: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
