//! Rolling NowCast AQI monitoring for serial-attached PM2.5 sensors.
//!
//! The library is organised leaf-first:
//! - `breakpoints` – PM2.5 breakpoint table, AQI interpolation, categories
//! - `window` – time-bounded sliding window and count-bounded ring buffers
//! - `nowcast` – EPA NowCast weighted estimate over a window snapshot
//! - `accuracy` – reference-vs-other sensor comparison
//! - `session` – the single owner of all shared monitoring state
//! - `acquisition` / `updater` – the two concurrently running loops
//! - `persistence` – queued InfluxDB writes
//! - `routes` – pull endpoints for display collaborators
//!
//! `main.rs` only wires these together; every module is reachable from here
//! so integration tests can drive a full session without hardware.

pub mod accuracy;
pub mod acquisition;
pub mod breakpoints;
pub mod config;
pub mod error;
pub mod models;
pub mod nowcast;
pub mod persistence;
pub mod routes;
pub mod sensor;
pub mod session;
pub mod shutdown;
pub mod updater;
pub mod window;

pub use config::Config;
pub use error::{PersistenceError, SensorError};
pub use models::{Reading, Sample};
pub use session::{PublishedAqi, Session, SessionConfig};
pub use shutdown::{StopListener, StopSignal};
