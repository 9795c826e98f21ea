use std::env;
use std::net::{IpAddr, SocketAddr};

/// Runtime stage of the deployment, selected via `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be a valid u16")]
    InvalidPort(&'static str),
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost(#[source] std::net::AddrParseError),
    #[error("{0} must be a positive integer")]
    InvalidWindow(&'static str),
    #[error("scheduling window {window_days} must be non-zero and at most {max_window_days}")]
    WindowOutOfRange {
        window_days: u32,
        max_window_days: u32,
    },
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Top-level configuration, assembled from the environment. A `.env` file is
/// honored when present.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::parse(&var_or("APP_ENV", "development"));

        let server = ServerConfig {
            host: var_or("APP_HOST", "127.0.0.1"),
            port: var_or("APP_PORT", "3000")
                .parse()
                .map_err(|_| ConfigError::InvalidPort("APP_PORT"))?,
        };

        let telemetry = TelemetryConfig {
            log_level: var_or("APP_LOG_LEVEL", "info"),
        };

        let scheduling = SchedulingConfig::load()?;

        Ok(Self {
            environment,
            server,
            telemetry,
            scheduling,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        // "localhost" is the one name we resolve ourselves.
        let ip: IpAddr = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::from([127, 0, 0, 1])
        } else {
            self.host.parse().map_err(ConfigError::InvalidHost)?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Bounds on the availability window served to date pickers.
#[derive(Debug, Clone, Copy)]
pub struct SchedulingConfig {
    /// Default number of days returned by the public availability endpoint.
    pub window_days: u32,
    /// Hard cap on the requested window, keeping range scans bounded.
    pub max_window_days: u32,
}

impl SchedulingConfig {
    fn load() -> Result<Self, ConfigError> {
        let window_days = var_or("SCHEDULING_WINDOW_DAYS", "28")
            .parse()
            .map_err(|_| ConfigError::InvalidWindow("SCHEDULING_WINDOW_DAYS"))?;
        let max_window_days = var_or("SCHEDULING_MAX_WINDOW_DAYS", "90")
            .parse()
            .map_err(|_| ConfigError::InvalidWindow("SCHEDULING_MAX_WINDOW_DAYS"))?;

        if window_days == 0 || max_window_days < window_days {
            return Err(ConfigError::WindowOutOfRange {
                window_days,
                max_window_days,
            });
        }

        Ok(Self {
            window_days,
            max_window_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    // Env vars are process-global; tests touching them take this lock.
    fn lock_env() -> MutexGuard<'static, ()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD
            .get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env mutex poisoned")
    }

    fn clear_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "SCHEDULING_WINDOW_DAYS",
            "SCHEDULING_MAX_WINDOW_DAYS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let _guard = lock_env();
        clear_env();

        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.scheduling.window_days, 28);
        assert_eq!(config.scheduling.max_window_days, 90);
    }

    #[test]
    fn window_larger_than_the_cap_is_rejected() {
        let _guard = lock_env();
        clear_env();
        env::set_var("SCHEDULING_WINDOW_DAYS", "120");

        let result = AppConfig::load();
        assert!(matches!(result, Err(ConfigError::WindowOutOfRange { .. })));
        clear_env();
    }

    #[test]
    fn localhost_binds_to_the_loopback_address() {
        let _guard = lock_env();
        clear_env();
        env::set_var("APP_HOST", "localhost");

        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        clear_env();
    }
}
