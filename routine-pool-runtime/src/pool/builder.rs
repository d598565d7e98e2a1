use super::{default_worker_count, RoutinePool};
use crate::config::{load_toml_config, load_yaml_config, resolve_config_value, PoolConfig};
use crate::error::PoolError;
use crate::registry::{parse_workers, EntryRoutine, RoutineEntry, ROUTINES};
use crate::time_unit::parse_interval;
use config::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Builder for a [`RoutinePool`]
///
/// Explicit setters win over the `[pool]` config section, which wins over
/// the built-in defaults.
pub struct PoolBuilder {
    config: Arc<Config>,
    worker_count: Option<usize>,
    default_wait: Option<Duration>,
    min_wait: Option<Duration>,
    cancel: Option<CancellationToken>,
    register_all: bool,
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolBuilder {
    /// Create a new builder with default config (empty)
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create with TOML config file
    pub fn with_toml(path: &str) -> Result<Self, PoolError> {
        Ok(Self::with_config(load_toml_config(path)?))
    }

    /// Create with YAML config file
    pub fn with_yaml(path: &str) -> Result<Self, PoolError> {
        Ok(Self::with_config(load_yaml_config(path)?))
    }

    /// Create with custom config
    pub fn with_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            worker_count: None,
            default_wait: None,
            min_wait: None,
            cancel: None,
            register_all: false,
        }
    }

    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    pub fn default_wait(mut self, wait: Duration) -> Self {
        self.default_wait = Some(wait);
        self
    }

    pub fn min_wait(mut self, wait: Duration) -> Self {
        self.min_wait = Some(wait);
        self
    }

    /// Stop the pool when `token` is cancelled.
    ///
    /// Workers are woken as soon as the token fires and stop after their
    /// current iteration; [`RoutinePool::shutdown`] is still needed to join
    /// their threads.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Start every function annotated with `#[routine]` once the pool is built
    pub fn register_all(mut self) -> Self {
        self.register_all = true;
        self
    }

    /// Spawn the worker threads and start auto-registered routines.
    ///
    /// A routine entry that fails to resolve is logged and skipped; it does
    /// not fail the build.
    pub fn build(self) -> Result<RoutinePool, PoolError> {
        let file = PoolConfig::from_config(&self.config)?;

        let worker_count = self
            .worker_count
            .or(file.worker_count)
            .unwrap_or_else(default_worker_count);
        let default_wait = self.default_wait.unwrap_or_else(|| file.default_wait());
        let min_wait = self.min_wait.unwrap_or_else(|| file.min_wait());
        let shutdown = match &self.cancel {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };

        let pool = RoutinePool::spawn(worker_count, default_wait, min_wait, shutdown, self.cancel.is_some())?;

        if self.register_all {
            info!(routines = ROUTINES.len(), "Registering annotated routines");
            for entry_fn in ROUTINES {
                let entry = entry_fn();
                if let Err(e) = self.start_entry(&pool, entry) {
                    error!(routine = entry.name, error = %e, "Failed to register routine");
                }
            }
        }

        Ok(pool)
    }

    fn start_entry(&self, pool: &RoutinePool, entry: RoutineEntry) -> Result<(), PoolError> {
        let enabled = resolve_config_value(entry.enabled, &self.config)?;
        if enabled.eq_ignore_ascii_case("false") {
            info!(routine = entry.name, "Routine disabled");
            return Ok(());
        }

        let every = resolve_config_value(entry.every, &self.config)?;
        let interval = parse_interval(&every).ok_or(PoolError::InvalidDuration(every))?;

        let initial_delay = resolve_config_value(entry.initial_delay, &self.config)?;
        let initial_delay = parse_interval(&initial_delay).ok_or(PoolError::InvalidDuration(initial_delay))?;

        let workers = resolve_config_value(entry.workers, &self.config)?;
        let range = parse_workers(&workers, pool.worker_count())?;

        info!(
            routine = entry.name,
            interval_ms = interval.as_millis() as u64,
            initial_delay_ms = initial_delay.as_millis() as u64,
            workers = %workers,
            "Registering routine"
        );

        pool.start_boxed(
            range,
            entry.name.to_string(),
            Box::new(EntryRoutine::new(entry.handler, interval, initial_delay)),
            CancellationToken::new(),
        )?;
        Ok(())
    }
}
