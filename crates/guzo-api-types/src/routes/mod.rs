//! Request and response shapes, grouped by route family.
pub mod admin;
pub mod bookings;
pub mod favorites;
pub mod payments;
pub mod pricing;
pub mod reviews;
pub mod trips;
pub mod users;
pub mod vehicles;
pub mod verification;
