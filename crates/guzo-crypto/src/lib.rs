//! Password hashing for Guzo accounts.
pub mod argon2;
