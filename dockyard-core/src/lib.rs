pub mod backup;
pub mod buildpack;
pub mod config;
pub mod constants;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod lock;
pub mod models;
pub mod notification;
pub mod store;

pub use error::{DockyardError, Result};
