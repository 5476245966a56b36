//! Background job that heals drifted vote tallies.
//!
//! Cached counts lag the vote ledger when a tally update fails after its vote
//! committed. This job rewrites them from the ledger.

use domain::services::TallyEngine;

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::record_polls_reconciled;

pub struct ReconcileTalliesJob {
    tally: TallyEngine,
    interval_secs: u64,
    batch_size: i64,
}

impl ReconcileTalliesJob {
    pub fn new(tally: TallyEngine, interval_secs: u64, batch_size: i64) -> Self {
        Self {
            tally,
            interval_secs,
            batch_size,
        }
    }
}

#[async_trait::async_trait]
impl Job for ReconcileTalliesJob {
    fn name(&self) -> &'static str {
        "reconcile_tallies"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> Result<(), String> {
        let reports = self
            .tally
            .reconcile_drifted(self.batch_size)
            .await
            .map_err(|e| format!("Failed to list drifted polls: {}", e))?;

        let healed = reports.iter().filter(|r| r.changed()).count();
        if healed > 0 {
            tracing::info!(polls = healed, "Reconciled drifted tallies");
        }
        record_polls_reconciled(healed);

        Ok(())
    }
}
