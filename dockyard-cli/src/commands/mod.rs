mod backup;
mod buildpack;
mod config;

// Backup commands
pub use backup::{list_executions, prune_backups, run_all_backups, run_backup};

// Buildpack commands
pub use buildpack::generate_dockerfile;

// Config commands
pub use config::check_config;
