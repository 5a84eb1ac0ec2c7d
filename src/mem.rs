//! Memory channel interface and fixed-latency model.
//!
//! This module defines the contract between the pipeline engine and the
//! memory-system collaborator. It provides:
//! 1. **`MemoryChannel` trait:** Accepts read/write requests, returns read completions asynchronously.
//! 2. **`FixedLatencyMemory`:** A simple channel with fixed latency and per-cycle accept bandwidth.
//!
//! Completions are matched back to load-queue entries by address-block
//! equality, so the channel reports finished reads as block addresses rather
//! than request handles. Writes are fire-and-forget: an accepted write needs
//! no completion.

use std::collections::VecDeque;

use crate::config::MemoryConfig;
use crate::core::instruction::InstrId;

/// A read or write request issued by the load/store queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemRequest {
    /// Instruction the operand belongs to (diagnostics only).
    pub instr_id: InstrId,
    /// Virtual address of the operand.
    pub addr: u64,
}

/// Contract for the external memory system.
///
/// `issue_read`/`issue_write` return whether the request was accepted this
/// cycle; a rejected request is simply retried by the caller on a later
/// cycle. `drain_completions` is called once per simulated cycle and returns
/// the block addresses of reads that finished since the previous drain.
pub trait MemoryChannel {
    /// Offers a read request. Returns `true` if accepted.
    fn issue_read(&mut self, req: MemRequest) -> bool;
    /// Offers a write request. Returns `true` if accepted.
    fn issue_write(&mut self, req: MemRequest) -> bool;
    /// Drains finished reads as block addresses. Called once per cycle.
    fn drain_completions(&mut self) -> Vec<u64>;
}

/// Fixed-latency memory channel.
///
/// Every accepted read completes exactly `latency` cycles later. At most
/// `channel_width` requests (reads plus writes) are accepted per cycle; the
/// internal cycle counter advances on each `drain_completions` call, which
/// the engine makes once per tick.
#[derive(Debug)]
pub struct FixedLatencyMemory {
    latency: u64,
    channel_width: usize,
    block_bits: u32,
    cycle: u64,
    accepted_this_cycle: usize,
    /// Pending reads: (ready cycle, block address), in issue order.
    pending: VecDeque<(u64, u64)>,
}

impl FixedLatencyMemory {
    /// Creates a channel from memory config plus the core's block size.
    pub fn new(config: &MemoryConfig, block_bits: u32) -> Self {
        Self {
            latency: config.latency,
            channel_width: config.channel_width,
            block_bits,
            cycle: 0,
            accepted_this_cycle: 0,
            pending: VecDeque::new(),
        }
    }

    /// Number of reads still in flight.
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    fn block_of(&self, addr: u64) -> u64 {
        addr >> self.block_bits
    }
}

impl MemoryChannel for FixedLatencyMemory {
    fn issue_read(&mut self, req: MemRequest) -> bool {
        if self.accepted_this_cycle >= self.channel_width {
            return false;
        }
        self.accepted_this_cycle += 1;
        let block = self.block_of(req.addr);
        self.pending.push_back((self.cycle + self.latency, block));
        true
    }

    fn issue_write(&mut self, req: MemRequest) -> bool {
        if self.accepted_this_cycle >= self.channel_width {
            return false;
        }
        self.accepted_this_cycle += 1;
        let _ = req;
        true
    }

    fn drain_completions(&mut self) -> Vec<u64> {
        self.cycle += 1;
        self.accepted_this_cycle = 0;

        let mut done = Vec::new();
        // Fixed latency keeps `pending` sorted by ready cycle.
        while let Some(&(ready, block)) = self.pending.front() {
            if ready > self.cycle {
                break;
            }
            done.push(block);
            let _ = self.pending.pop_front();
        }
        done
    }
}
