//! Fatal fault definitions.
//!
//! This module defines the unrecoverable fault conditions of the engine. It provides:
//! 1. **Fault Representation:** Resource exhaustion, deadlock, and invariant violations.
//! 2. **Escalation:** A single helper that logs the fault and aborts the simulation.
//!
//! None of these are locally recoverable: each indicates either a bug in the
//! surrounding system (admission performed without `would_accept`, a dangling
//! instruction id) or a configuration that cannot make progress. Continuing
//! past any of them would produce invalid timing, so the policy is to dump
//! diagnostic context and abort. "Not ready yet" — a full ROB, a waiting
//! consumer — is normal state and is represented by polled timestamps and
//! counters, never by these faults.

use thiserror::Error;

/// Unrecoverable simulation faults.
#[derive(Debug, Error)]
pub enum Fault {
    /// No free physical register at rename time.
    ///
    /// The upstream dispatcher admitted an instruction the register pool
    /// cannot rename. The allocator dumps its live records before raising
    /// this.
    #[error("physical register file exhausted: all {pool_size} registers live at rename of arch r{arch_reg}")]
    ResourceExhaustion {
        /// Total physical register pool size.
        pool_size: usize,
        /// Architectural register whose rename failed.
        arch_reg: usize,
    },

    /// The ROB head made no progress for the configured cycle threshold.
    ///
    /// Detected, not prevented: the ROB dumps its head instruction and the
    /// full LQ/SQ wait-on graph before raising this.
    #[error("pipeline deadlock at cycle {cycle}: ROB head {head_id} stalled for {threshold} cycles")]
    Deadlock {
        /// Cycle at which the deadlock was declared.
        cycle: u64,
        /// Instruction id at the ROB head.
        head_id: u64,
        /// Configured no-progress threshold.
        threshold: u64,
    },

    /// A structural invariant of the engine was broken.
    ///
    /// Examples: retiring a register that still has pending consumers, or an
    /// instruction id that does not resolve to a live ROB entry.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Logs a fatal fault and aborts the simulation.
///
/// The abort is a `panic!` carrying the fault's display text, so harnesses
/// and tests can observe the failure mode while the simulation itself never
/// continues past it.
pub(crate) fn fatal(fault: Fault) -> ! {
    tracing::error!(%fault, "fatal simulation fault");
    panic!("{fault}");
}
