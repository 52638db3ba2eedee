//! Mentor Core - shared configuration for all mentor crates.
//!
//! - **config**: state directory layout, file locations, and `.env` loading

pub mod config;

pub use config::{
    config_dir, data_dir, dataset_file, db_dir, ensure_all_dirs, env_file, journal_file,
    load_env, memory_log_file, runtime_state_dir, state_dir, vector_dir,
};
