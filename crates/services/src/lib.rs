#![forbid(unsafe_code)]

pub mod app_services;
pub mod discovery;
pub mod error;
pub mod progress;
pub mod scope;
pub mod session;
pub mod stats;

pub use italo_core::Clock;

pub use app_services::AppServices;
pub use discovery::{
    ContainerSummary, DiscoveryService, KNOWN_LEVELS, MAX_CONTAINER_PROBE, MAX_GROUP_PROBE,
};
pub use error::{AppServicesError, DiscoveryError, ProgressError, SessionError, StatsError};
pub use progress::ProgressService;
pub use scope::ProgressScope;
pub use session::{GroupSession, SessionService, SessionState};
pub use stats::{OverallProgress, StatsService};
