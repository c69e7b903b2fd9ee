pub mod config;
pub mod error;
pub mod ingest;
pub mod serve;
pub mod watch;

pub use config::Config;
pub use error::{FikiError, Result};
pub use ingest::{IndexSet, IngestionCoordinator, LiveIndex};
