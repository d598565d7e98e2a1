//! # Routine Pool - cooperative routines on dedicated threads
//!
//! Run many small, long-lived units of work ("routines") on a fixed set of
//! worker threads. Each routine runs one step at a time and tells the pool
//! how long to wait before its next step; workers sleep in between.
//!
//! ## Features
//!
//! - **Fixed pool**: one dedicated OS thread per worker, created up front
//! - **Targeted registration**: run a routine on one worker, a range, or all
//! - **Shared routines**: a routine registered on several workers is picked up
//!   by whichever is free, and never stepped twice at once
//! - **Cancellation**: per-routine `CancellationToken`s and handles
//! - **Adaptive sleep**: workers wake for the next due step, capped by
//!   `default_wait`
//! - **Config support**: pool settings and `#[routine]` attributes read from
//!   TOML/YAML, with `${key:default}` placeholders
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use routine_pool::{routine, RoutinePool, Step};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = RoutinePool::new(2)?;
//!
//!     // steps: wait 100ms, wait 50ms, done
//!     pool.spawn_on(0, routine::from_iter([Duration::from_millis(100), Duration::from_millis(50)]));
//!
//!     let mut ticks = 0;
//!     pool.spawn_all(routine::from_fn(move || {
//!         ticks += 1;
//!         Ok(if ticks < 10 { Step::after_millis(20) } else { Step::Done })
//!     }));
//!
//!     std::thread::sleep(Duration::from_secs(1));
//!     pool.shutdown()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Annotated routines
//!
//! ```rust,ignore
//! use routine_pool::{routine, PoolBuilder};
//!
//! #[routine(every = "${app.flush_interval:500ms}", workers = "0")]
//! fn flush() {
//!     println!("flush");
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = PoolBuilder::with_toml("config/application.toml")?
//!         .register_all()
//!         .build()?;
//!     // ...
//!     pool.shutdown()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Create `config/application.toml`:
//!
//! ```toml
//! [pool]
//! worker_count = 4
//! default_wait_ms = 33
//! min_wait_ms = 1
//!
//! [app]
//! flush_interval = "2s"
//! ```
//!
//! Environment variables with the `ROUTINE_POOL_` prefix override file
//! values, using `__` between key segments:
//!
//! ```bash
//! export ROUTINE_POOL_POOL__WORKER_COUNT=8
//! ```

// Re-export macros
pub use routine_pool_macro::routine;

// Re-export core types
pub use routine_pool_runtime::{
    load_toml_config, load_yaml_config, routine, PoolBuilder, PoolConfig, PoolError, Routine,
    RoutineError, RoutinePool, Step, TaskHandle, TaskId, TimeUnit,
};

// Make routine_pool_runtime available for macro expansion
pub use routine_pool_runtime;

// Re-export commonly used types
pub use tokio_util::sync::CancellationToken;
