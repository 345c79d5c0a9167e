use std::env;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote banking service.
    pub bank_service_url: String,
    /// Interval between notification polls.
    pub poll_interval: Duration,
    /// Timeout for every outbound call to the banking service.
    pub request_timeout: Duration,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Config {
            bank_service_url: env::var("BANK_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8082/cloudbank".to_string()),
            poll_interval: Duration::from_secs(secs_var("POLL_INTERVAL_SECS", 15)),
            request_timeout: Duration::from_secs(secs_var("REQUEST_TIMEOUT_SECS", 10)),
            port: parsed_var("PORT", 5000),
        }
    }
}

fn secs_var(name: &str, default: u64) -> u64 {
    parsed_var(name, default)
}

fn parsed_var<T: std::str::FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("invalid {name}={raw}, using default {default}");
            default
        }),
        Err(_) => default,
    }
}
