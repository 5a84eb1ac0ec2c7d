//! Simulation statistics collection and reporting.
//!
//! This module tracks performance metrics for the pipeline engine. It provides:
//! 1. **Cycle and IPC:** Total cycles, retired instructions, and derived metrics (IPC, CPI).
//! 2. **Pipeline activity:** Per-stage counts (dispatched, scheduled, executed, completed).
//! 3. **Memory system:** Issued reads/writes, forwarded loads, drained completions.
//! 4. **Stalls:** Misprediction stall cycles.

use std::time::Instant;

/// Simulation statistics structure tracking all performance metrics.
///
/// Collects counters about instruction flow through the pipeline stages,
/// load/store queue behavior, and wall-clock simulation speed.
#[derive(Clone, Debug)]
pub struct SimStats {
    start_time: Instant,
    /// Total simulated cycles elapsed.
    pub cycles: u64,
    /// Number of instructions retired from the ROB head.
    pub retired: u64,

    /// Instructions inserted into the ROB.
    pub dispatched: u64,
    /// Instructions that passed the scheduling stage.
    pub scheduled: u64,
    /// Instructions that began execution.
    pub executed: u64,
    /// Instructions that completed.
    pub completed: u64,

    /// Read requests issued to the memory channel.
    pub reads_issued: u64,
    /// Write requests issued to the memory channel.
    pub writes_issued: u64,
    /// Loads satisfied by store-to-load forwarding (no memory read issued).
    pub loads_forwarded: u64,
    /// Read completions drained from the memory channel.
    pub mem_returns: u64,

    /// Mispredicted branches observed at completion.
    pub mispredictions: u64,
    /// Cycles during which scheduling/dispatch was stalled by a misprediction.
    pub stall_cycles: u64,
}

impl Default for SimStats {
    /// Returns a zeroed statistics block stamped with the current time.
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            retired: 0,
            dispatched: 0,
            scheduled: 0,
            executed: 0,
            completed: 0,
            reads_issued: 0,
            writes_issued: 0,
            loads_forwarded: 0,
            mem_returns: 0,
            mispredictions: 0,
            stall_cycles: 0,
        }
    }
}

impl SimStats {
    /// Creates a new, zeroed statistics block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Instructions retired per cycle.
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.retired as f64 / self.cycles as f64
        }
    }

    /// Cycles per retired instruction.
    pub fn cpi(&self) -> f64 {
        if self.retired == 0 {
            0.0
        } else {
            self.cycles as f64 / self.retired as f64
        }
    }

    /// Simulated cycles per wall-clock second since construction.
    pub fn cycles_per_second(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            0.0
        } else {
            self.cycles as f64 / elapsed
        }
    }

    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("==== simulation summary ====");
        println!("cycles            : {}", self.cycles);
        println!("retired           : {}", self.retired);
        println!("IPC               : {:.4}", self.ipc());
        println!("reads issued      : {}", self.reads_issued);
        println!("writes issued     : {}", self.writes_issued);
        println!("loads forwarded   : {}", self.loads_forwarded);
        println!("mispredictions    : {}", self.mispredictions);
        println!("stall cycles      : {}", self.stall_cycles);
        println!("sim speed         : {:.0} cycles/s", self.cycles_per_second());
    }
}
