//! # db-backuper
//!
//! Dumps a list of databases with an external dump utility, compresses each
//! dump and keeps only the most recent backups of every database.
//!
//! ## Features
//!
//! - **Dump pipeline**: `mysqldump | gzip` by default, both programs configurable
//! - **Retention Management**: keeps the newest `number_of_backups` files per database
//! - **Failure isolation**: a broken database is logged and the run carries on
//!
//! ## Quick Start
//!
//! ```no_run
//! use db_backuper::backup::connection_config::load_connection_configs;
//! use db_backuper::backup::dump::DumpPipeline;
//! use db_backuper::backup::orchestrator::run_backups;
//!
//! let configs = load_connection_configs("access.json")?;
//! let outcomes = run_backups(&configs, &DumpPipeline::default(), std::env::current_dir()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
