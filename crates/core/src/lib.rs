pub mod clock;
pub mod error;
pub mod filing;
pub mod services;

pub use clock::{ClockError, MarketClock};
pub use error::JobError;
pub use filing::Filing;
pub use services::{
    AlertSink, CoverageProbe, FilingsFeed, MaintenanceOps, StreamControl, WorkerSupervisor,
};
