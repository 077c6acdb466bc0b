//! Configuration for the Guzo server.
//!
//! Values are merged, in increasing precedence, from `guzo.toml`,
//! `GUZO_*` environment variables and a couple of conventional
//! aliases (`DATABASE_URL`). A `.env` file is honored when present.
use thiserror::Error;

mod auth;
mod database;
mod logging;
mod server;

pub(crate) mod figment_ext;

pub use self::auth::Auth;
pub use self::database::{Database, DbPoolConfig};
pub use self::logging::Logging;
pub use self::server::Server;

#[derive(Debug, Error)]
#[error("Failed to load configuration")]
pub struct ParseError;
