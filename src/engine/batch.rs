//! Batch generation: run until every motor reaches its cycle target.
//!
//! The clock restarts at 0 and all motors begin fresh cycles on the shared
//! global timeline. Each motor counts completed cycles through its
//! automatic maintenances and drops out of the iteration set once done.
//! Records accumulate in a chunk buffer flushed periodically into the
//! history store; a memory guard aborts cleanly with the records produced
//! so far. Motors that fail to finish within the tick ceiling have their
//! remaining cycles force-closed so every motor still shows exactly the
//! target number of automatic maintenance records.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::GenerationMode;
use crate::error::EngineError;
use crate::types::Observation;

use super::Engine;

/// Chunk size at which batched records are flushed into the history store.
const FLUSH_THRESHOLD: usize = 25_000;
/// Record-count ceiling for one batch run.
const MAX_BATCH_RECORDS: usize = 2_000_000;
/// Estimated resident-size ceiling for the batch buffer.
const MAX_RESIDENT_BYTES: usize = 12 * 1024 * 1024 * 1024;
/// Ticks between memory-guard evaluations.
const MEMORY_CHECK_INTERVAL: u64 = 5_000;
/// Ticks between progress log lines.
const PROGRESS_INTERVAL: u64 = 10_000;

/// Why a batch run stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Every motor reached its cycle target naturally.
    Completed,
    /// The tick ceiling was reached first; remaining cycles were
    /// force-closed.
    MaxTicks,
    /// The memory guard tripped; remaining cycles were force-closed.
    MemoryGuard,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Completed => write!(f, "completed"),
            StopReason::MaxTicks => write!(f, "max_ticks"),
            StopReason::MemoryGuard => write!(f, "memory_guard"),
        }
    }
}

/// Result of one batch run. Partial output under exhaustion is still a
/// result, not an error.
#[derive(Debug)]
pub struct BatchOutcome {
    pub records: Vec<Observation>,
    pub reason: StopReason,
    /// Global ticks executed by the generation loop.
    pub ticks: u64,
}

impl Engine {
    /// Generate records until every motor has completed the configured
    /// number of maintenance cycles, or `max_ticks` / the memory guard
    /// stops the run early.
    pub fn generate_batch(&mut self, max_ticks: u64) -> Result<BatchOutcome, EngineError> {
        self.ensure_ready()?;
        self.ensure_mode(GenerationMode::Batch, "generate_batch")?;

        let target = self.factory.run().target_maintenance_cycles;
        info!(
            motors = self.factory.run().num_motors,
            target_cycles = target,
            max_ticks,
            "starting batch generation"
        );

        self.history.clear();
        self.factory.restart_cycles();

        let mut chunk: Vec<Observation> = Vec::new();
        let mut ticks = 0u64;
        let mut reason = StopReason::Completed;

        while !self.factory.all_cycles_complete(target) {
            if ticks >= max_ticks {
                reason = StopReason::MaxTicks;
                break;
            }
            if ticks % MEMORY_CHECK_INTERVAL == 0
                && memory_guard_tripped(self.history.len() + chunk.len())
            {
                reason = StopReason::MemoryGuard;
                break;
            }

            let records = match self.factory.step() {
                Ok(records) => records,
                Err(err) => return Err(self.halt_with(err)),
            };
            chunk.extend(records);
            self.factory.suspend_completed(target);

            if chunk.len() >= FLUSH_THRESHOLD {
                self.history.append(&mut chunk);
            }

            ticks += 1;
            if ticks % PROGRESS_INTERVAL == 0 {
                info!(
                    tick = ticks,
                    active_motors = self.factory.active_motors(),
                    records = self.history.len() + chunk.len(),
                    "batch generation progress"
                );
            }
        }

        self.history.append(&mut chunk);

        if reason != StopReason::Completed {
            warn!(%reason, ticks, "batch generation stopped early");
            self.force_close_remaining(target)?;
        }

        info!(
            ticks,
            records = self.history.len(),
            %reason,
            "batch generation finished"
        );

        Ok(BatchOutcome {
            records: std::mem::take(&mut self.history),
            reason,
            ticks,
        })
    }

    /// Synthesise the missing Critical + maintenance record pairs for
    /// motors that did not complete naturally, so the cycle-count
    /// invariant holds on the emitted dataset.
    fn force_close_remaining(&mut self, target: u32) -> Result<(), EngineError> {
        let incomplete: Vec<u32> = self
            .factory
            .motors()
            .iter()
            .filter(|m| m.cycle_id < target)
            .map(|m| m.state.motor_id)
            .collect();

        for motor_id in incomplete {
            while self.factory.motor(motor_id)?.cycle_id < target {
                warn!(motor_id, "force-closing an unfinished cycle");
                let (critical, maintenance) = match self.factory.force_close_cycle(motor_id) {
                    Ok(pair) => pair,
                    Err(err) => return Err(self.halt_with(err)),
                };
                self.history.push(critical);
                self.history.push(maintenance);
            }
        }
        Ok(())
    }
}

/// Soft limits on the batch buffer: record count and an estimated
/// resident size.
fn memory_guard_tripped(record_count: usize) -> bool {
    let estimated_bytes = record_count.saturating_mul(std::mem::size_of::<Observation>());
    record_count >= MAX_BATCH_RECORDS || estimated_bytes >= MAX_RESIDENT_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_guard_trips_on_record_ceiling() {
        assert!(!memory_guard_tripped(0));
        assert!(!memory_guard_tripped(MAX_BATCH_RECORDS - 1));
        assert!(memory_guard_tripped(MAX_BATCH_RECORDS));
    }

    #[test]
    fn stop_reason_display_names() {
        assert_eq!(StopReason::Completed.to_string(), "completed");
        assert_eq!(StopReason::MaxTicks.to_string(), "max_ticks");
        assert_eq!(StopReason::MemoryGuard.to_string(), "memory_guard");
    }
}
