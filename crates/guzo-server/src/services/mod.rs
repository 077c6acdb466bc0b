//! Business logic, one request struct per operation.
//!
//! Handlers build the request from the wire form and call
//! `perform()`; everything touching more than one row runs inside a
//! single transaction.
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
