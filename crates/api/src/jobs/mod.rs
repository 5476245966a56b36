//! Background job scheduler and job implementations.

mod pool_metrics;
mod reconcile_tallies;
mod scheduler;

pub use pool_metrics::PoolMetricsJob;
pub use reconcile_tallies::ReconcileTalliesJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
