//! Configuration loader for the `airwatch-nowcast` monitor.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::session::SessionConfig;

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u64 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<u64>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

/// Connection settings for the InfluxDB v2 write API.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub org: String,
    pub token: String,
    pub pm_bucket: String,
    pub aqi_bucket: String,
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the monitoring session.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Sensor source specs, one per sensor; index 0 is the reference sensor.
    pub sensor_sources: Vec<String>,

    /// Cadence of the AQI updater.
    pub update_interval: Duration,

    /// Pacing of simulated sensors.
    pub sim_interval: Duration,

    /// Capacity of the per-sensor presentation buffers.
    pub display_buffer_len: usize,

    /// Capacity of the AQI history buffer.
    pub aqi_history_len: usize,

    /// Number of aligned readings used for sensor comparison.
    pub accuracy_window: usize,

    /// Bind address of the status endpoint.
    pub status_addr: SocketAddr,

    /// `None` disables persistence.
    pub influx: Option<InfluxConfig>,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `SENSOR_SOURCES` – comma-separated list of `sim`, `sim:<seed>`, or paths
///
/// Optional:
/// - `UPDATE_INTERVAL_MS` – AQI updater cadence (default: 1000)
/// - `SIM_INTERVAL_MS` – simulated sensor cadence (default: 1000)
/// - `DISPLAY_BUFFER_LEN` – presentation buffer length (default: 100)
/// - `AQI_HISTORY_LEN` – AQI history length (default: 10000)
/// - `ACCURACY_WINDOW` – sensor comparison length (default: 20)
/// - `STATUS_ADDR` – status endpoint address (default: 0.0.0.0:8080)
/// - `INFLUXDB_TOKEN` – enables persistence when set
/// - `INFLUXDB_URL`, `INFLUXDB_ORG`, `INFLUXDB_PM_BUCKET`, `INFLUXDB_AQI_BUCKET`
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let sensor_sources = parse_sources(&require_env!("SENSOR_SOURCES"))?;
    let update_interval_ms = parse_env_u64!("UPDATE_INTERVAL_MS", 1000);
    let sim_interval_ms = parse_env_u64!("SIM_INTERVAL_MS", 1000);
    let display_buffer_len = parse_env_u64!("DISPLAY_BUFFER_LEN", 100);
    let aqi_history_len = parse_env_u64!("AQI_HISTORY_LEN", 10_000);
    let accuracy_window = parse_env_u64!("ACCURACY_WINDOW", 20);
    let status_addr = env_or!("STATUS_ADDR", "0.0.0.0:8080")
        .parse::<SocketAddr>()
        .map_err(|e| anyhow!("Invalid STATUS_ADDR: {}", e))?;

    for (name, value) in [
        ("UPDATE_INTERVAL_MS", update_interval_ms),
        ("DISPLAY_BUFFER_LEN", display_buffer_len),
        ("AQI_HISTORY_LEN", aqi_history_len),
        ("ACCURACY_WINDOW", accuracy_window),
    ] {
        if value == 0 {
            return Err(anyhow!("{} must be greater than zero", name));
        }
    }

    let influx = env::var("INFLUXDB_TOKEN")
        .ok()
        .filter(|t| !t.is_empty())
        .map(|token| InfluxConfig {
            url: env_or!("INFLUXDB_URL", "http://localhost:8086"),
            org: env_or!("INFLUXDB_ORG", "home"),
            token,
            pm_bucket: env_or!("INFLUXDB_PM_BUCKET", "pm"),
            aqi_bucket: env_or!("INFLUXDB_AQI_BUCKET", "aqi"),
        });

    Ok(Config {
        sensor_sources,
        update_interval: Duration::from_millis(update_interval_ms),
        sim_interval: Duration::from_millis(sim_interval_ms),
        display_buffer_len: display_buffer_len as usize,
        aqi_history_len: aqi_history_len as usize,
        accuracy_window: accuracy_window as usize,
        status_addr,
        influx,
    })
}

/// Split a comma-separated source list, ignoring empty entries.
pub fn parse_sources(raw: &str) -> Result<Vec<String>> {
    let sources: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if sources.is_empty() {
        return Err(anyhow!("SENSOR_SOURCES must name at least one sensor"));
    }
    Ok(sources)
}

impl Config {
    /// Session sizing for `sensor_count` sources that actually opened.
    pub fn session_config(&self, sensor_count: usize) -> SessionConfig {
        SessionConfig {
            sensor_count,
            display_buffer_len: self.display_buffer_len,
            aqi_history_len: self.aqi_history_len,
            accuracy_window: self.accuracy_window,
        }
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the InfluxDB token while showing all other values that were loaded.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  SENSOR_SOURCES     : {}", self.sensor_sources.join(","));
        tracing::info!("  UPDATE_INTERVAL_MS : {}", self.update_interval.as_millis());
        tracing::info!("  SIM_INTERVAL_MS    : {}", self.sim_interval.as_millis());
        tracing::info!("  DISPLAY_BUFFER_LEN : {}", self.display_buffer_len);
        tracing::info!("  AQI_HISTORY_LEN    : {}", self.aqi_history_len);
        tracing::info!("  ACCURACY_WINDOW    : {}", self.accuracy_window);
        tracing::info!("  STATUS_ADDR        : {}", self.status_addr);
        match &self.influx {
            Some(influx) => {
                tracing::info!("  INFLUXDB_URL       : {}", influx.url);
                tracing::info!("  INFLUXDB_ORG       : {}", influx.org);
                tracing::info!("  INFLUXDB_TOKEN     : {}", mask_secret(&influx.token));
                tracing::info!("  INFLUXDB_PM_BUCKET : {}", influx.pm_bucket);
                tracing::info!("  INFLUXDB_AQI_BUCKET: {}", influx.aqi_bucket);
            }
            None => tracing::info!("  INFLUXDB_TOKEN     : (unset, persistence disabled)"),
        }
    }
}

/// Keep the first four characters of a secret and hide the rest.
fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}****", visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sources() {
        assert_eq!(
            parse_sources(" sim , /dev/ttyACM0.jsonl,,sim:4 ").unwrap(),
            vec!["sim", "/dev/ttyACM0.jsonl", "sim:4"]
        );
        assert!(parse_sources("").is_err());
        assert!(parse_sources(" , ").is_err());
    }

    #[test]
    fn test_session_config_uses_opened_sensor_count() {
        let cfg = Config {
            sensor_sources: vec!["sim".into(), "/dev/missing".into(), "sim:2".into()],
            update_interval: Duration::from_secs(1),
            sim_interval: Duration::from_secs(1),
            display_buffer_len: 50,
            aqi_history_len: 500,
            accuracy_window: 10,
            status_addr: "127.0.0.1:8080".parse().unwrap(),
            influx: None,
        };
        let session = cfg.session_config(2);
        assert_eq!(session.sensor_count, 2);
        assert_eq!(session.display_buffer_len, 50);
        assert_eq!(session.accuracy_window, 10);
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdefgh"), "abcd****");
        assert_eq!(mask_secret("ab"), "ab****");
    }
}
