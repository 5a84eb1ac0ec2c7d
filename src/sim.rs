//! Top-level simulation driver.
//!
//! Owns the dispatcher, the ROB, and the memory channel, and advances them in
//! lockstep: each step dispatches at the front end, then ticks the pipeline.
//! The driver loop runs until the program has fully retired or a cycle limit
//! is reached.

use tracing::warn;

use crate::config::Config;
use crate::core::dispatch::Dispatcher;
use crate::core::instruction::Instruction;
use crate::core::rob::ReorderBuffer;
use crate::mem::{FixedLatencyMemory, MemoryChannel};
use crate::stats::SimStats;

/// A complete simulated core attached to a memory channel.
#[derive(Debug)]
pub struct Simulator<M: MemoryChannel> {
    dispatcher: Dispatcher,
    rob: ReorderBuffer,
    mem: M,
}

impl Simulator<FixedLatencyMemory> {
    /// Builds a simulator with the fixed-latency memory model from config.
    pub fn from_config(config: &Config, program: Vec<Instruction>) -> Self {
        let mem = FixedLatencyMemory::new(&config.memory, config.core.block_bits);
        Self::new(config, mem, program)
    }
}

impl<M: MemoryChannel> Simulator<M> {
    /// Builds a simulator around an arbitrary memory channel.
    pub fn new(config: &Config, mem: M, program: Vec<Instruction>) -> Self {
        Self {
            dispatcher: Dispatcher::from_program(&config.core, program),
            rob: ReorderBuffer::new(&config.core),
            mem,
        }
    }

    /// Advances the simulation by one cycle: dispatch, then pipeline tick.
    pub fn step(&mut self) {
        let _ = self.dispatcher.dispatch(&mut self.rob);
        self.rob.tick(&mut self.mem);
    }

    /// Runs until the program is fully retired or `max_cycles` elapse.
    ///
    /// Returns the number of cycles simulated by this call. A run that hits
    /// the limit without draining logs a warning; fatal faults (deadlock,
    /// register exhaustion) abort inside the tick instead.
    pub fn run(&mut self, max_cycles: u64) -> u64 {
        let start = self.rob.cycle();
        while !self.is_drained() && self.rob.cycle() - start < max_cycles {
            self.step();
        }
        if !self.is_drained() {
            warn!(
                cycles = max_cycles,
                in_flight = self.rob.occupancy(),
                pending = self.dispatcher.pending(),
                "cycle limit reached before drain"
            );
        }
        self.rob.cycle() - start
    }

    /// True once every fed instruction has dispatched and retired.
    #[inline]
    pub fn is_drained(&self) -> bool {
        self.dispatcher.is_done() && self.rob.is_empty()
    }

    /// The pipeline state.
    #[inline]
    pub fn rob(&self) -> &ReorderBuffer {
        &self.rob
    }

    /// The front-end dispatcher, for feeding or squashing the stream.
    #[inline]
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// The attached memory channel.
    #[inline]
    pub fn memory(&self) -> &M {
        &self.mem
    }

    /// Statistics collected so far.
    #[inline]
    pub fn stats(&self) -> &SimStats {
        self.rob.stats()
    }

    /// Current simulated cycle.
    #[inline]
    pub fn cycle(&self) -> u64 {
        self.rob.cycle()
    }
}
