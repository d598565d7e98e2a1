//! Routine Pool Runtime - cooperative routine scheduling on dedicated threads
//!
//! A [`RoutinePool`] owns a fixed set of worker threads. Callers register
//! [`Routine`]s on one worker, a range of workers, or all of them; each
//! routine runs one step at a time and says how long to wait before the
//! next one. A routine visible to several workers is still stepped by only
//! one of them at a time.

mod config;
mod error;
mod pool;
mod registry;
pub mod routine;
mod task;
mod time_unit;
mod worker;

// Re-export public API
pub use self::config::{load_toml_config, load_yaml_config, resolve_config_value, PoolConfig};
pub use error::{PoolError, RoutineError};
pub use linkme;
pub use pool::{PoolBuilder, RoutinePool};
pub use registry::{parse_workers, RoutineEntry, ROUTINES};
pub use routine::{Routine, Step};
pub use task::{TaskHandle, TaskId};
pub use time_unit::{parse_interval, TimeUnit};
pub use tokio_util::sync::CancellationToken;
pub use worker::{wait_duration, DEFAULT_MIN_WAIT, DEFAULT_WAIT};
