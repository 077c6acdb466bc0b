use guzo_error::{Error, Result};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};

use crate::figment_ext::FigmentErrorAttachable;
use crate::{Auth, Database, Logging, ParseError};

#[derive(Debug, Deserialize)]
pub struct Server {
    #[serde(alias = "db")]
    pub database: Database,
    pub auth: Auth,
    #[serde(default)]
    pub logging: Logging,
    /// **Environment variable**: `GUZO_IP`
    #[serde(default = "Server::default_ip")]
    pub ip: IpAddr,
    /// **Environment variable**: `GUZO_PORT`
    #[serde(default = "Server::default_port")]
    pub port: u16,
    /// **Environment variable**: `GUZO_WORKERS`
    #[serde(default = "Server::default_workers")]
    pub workers: usize,
}

impl Server {
    const DEFAULT_CONFIG_FILE: &'static str = "guzo.toml";

    /// Loads and validates the server configuration from the config
    /// file and the process environment.
    pub fn load() -> Result<Self, ParseError> {
        dotenvy::dotenv().ok();

        let config = Self::figment()
            .extract::<Self>()
            .map_err(|e| Error::unknown(ParseError).attach_figment_error(e))?;

        config.validate()?;
        Ok(config)
    }

    /// Creates a default [`Figment`](figment::Figment) object to load
    /// server configuration. This function is there for implementing
    /// [`Server::load`] and testing.
    pub(crate) fn figment() -> figment::Figment {
        use figment::providers::{Env, Format, Toml};
        use figment::Figment;

        Figment::new()
            .merge(Toml::file(Self::DEFAULT_CONFIG_FILE))
            // One big con about figment (env provider to be specific)
            // especially these fields with underscore in it.
            .merge(Env::prefixed("GUZO_").map(|v| match v.as_str() {
                "DB_PRIMARY_MIN_IDLE" => "db.primary.min_idle".into(),
                "DB_PRIMARY_POOL_SIZE" => "db.primary.pool_size".into(),
                "DB_PRIMARY_READONLY" => "db.primary.readonly".into(),

                "DB_REPLICA_MIN_IDLE" => "db.replica.min_idle".into(),
                "DB_REPLICA_POOL_SIZE" => "db.replica.pool_size".into(),
                "DB_REPLICA_READONLY" => "db.replica.readonly".into(),

                "DB_ENFORCE_TLS" => "db.enforce_tls".into(),
                "DB_TIMEOUT_SECS" => "db.timeout_secs".into(),

                "AUTH_JWT_SECRET" => "auth.jwt_secret".into(),
                "AUTH_TOKEN_EXPIRY_HOURS" => "auth.token_expiry_hours".into(),

                "LOGGING_TARGETS" => "logging.targets".into(),
                "LOGGING_FILE_DIR" => "logging.file_dir".into(),

                _ => v.as_str().replace('_', ".").into(),
            }))
            // Environment variable aliases
            .merge(Env::raw().map(|v| match v.as_str() {
                "DATABASE_URL" => "db.primary.url".into(),
                _ => v.into(),
            }))
    }

    /// Loads the server test configuration. The database section is a
    /// placeholder; tests receive their pools from the test harness.
    #[must_use]
    pub fn for_tests() -> Self {
        let figment = figment::Figment::new()
            .merge(("db.primary.url", "postgres://localhost/guzo_test"))
            .merge(("auth.jwt_secret", "guzo-test-secret-guzo-test-secret"));

        figment
            .extract::<Self>()
            .expect("unable to load test server configuration")
    }

    fn validate(&self) -> Result<(), ParseError> {
        if self.auth.jwt_secret.as_str().len() < Auth::MIN_SECRET_LEN {
            return Err(Error::unknown(ParseError).attach_printable(format!(
                "`auth.jwt_secret` must be at least {} characters long",
                Auth::MIN_SECRET_LEN
            )));
        }

        if self.database.primary.url.as_str().is_empty() {
            return Err(
                Error::unknown(ParseError).attach_printable("`db.primary.url` must not be empty")
            );
        }

        if let Some(replica) = &self.database.replica {
            if replica.url.as_str().is_empty() {
                return Err(Error::unknown(ParseError)
                    .attach_printable("`db.replica.url` must not be empty"));
            }
        }

        Ok(())
    }

    fn default_ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    }

    const fn default_port() -> u16 {
        8080
    }

    fn default_workers() -> usize {
        let cores = num_cpus::get();
        if cores > 4 {
            4
        } else {
            (cores / 2).max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::num::NonZeroU32;

    #[test]
    fn env_aliases() {
        Jail::expect_with(|jail| {
            jail.set_env("DATABASE_URL", "postgres://primary/guzo");

            jail.set_env("GUZO_DB_PRIMARY_MIN_IDLE", "100");
            jail.set_env("GUZO_DB_PRIMARY_POOL_SIZE", "100");

            jail.set_env("GUZO_DB_REPLICA_URL", "postgres://replica/guzo");
            jail.set_env("GUZO_DB_REPLICA_POOL_SIZE", "589");

            jail.set_env("GUZO_DB_ENFORCE_TLS", "false");
            jail.set_env("GUZO_AUTH_JWT_SECRET", "jail-secret-jail-secret");
            jail.set_env("GUZO_AUTH_TOKEN_EXPIRY_HOURS", "48");

            let config: Server = Server::figment().extract()?;
            assert_eq!(config.database.primary.url.as_str(), "postgres://primary/guzo");
            assert_eq!(
                config.database.primary.min_idle,
                Some(NonZeroU32::new(100).unwrap())
            );
            assert_eq!(
                config.database.primary.pool_size,
                NonZeroU32::new(100).unwrap()
            );
            assert_eq!(
                config.database.replica.as_ref().unwrap().pool_size,
                NonZeroU32::new(589).unwrap()
            );

            assert!(!config.database.enforce_tls);
            assert_eq!(config.auth.token_expiry_hours, 48);
            assert_eq!(config.port, 8080);

            Ok(())
        });
    }

    #[test]
    fn rejects_short_jwt_secrets() {
        Jail::expect_with(|jail| {
            jail.set_env("DATABASE_URL", "postgres://primary/guzo");
            jail.set_env("GUZO_AUTH_JWT_SECRET", "short");

            let config: Server = Server::figment().extract()?;
            assert!(config.validate().is_err());

            Ok(())
        });
    }
}
