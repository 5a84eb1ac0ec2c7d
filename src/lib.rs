//! Cycle-level model of a superscalar out-of-order core.
//!
//! `o3sim` simulates the back end of a modern core at cycle granularity:
//! instructions are renamed onto a physical register pool, scheduled out of
//! order behind explicit dependency edges, disambiguated through a combined
//! load/store queue with store-to-load forwarding, and retired strictly in
//! program order from a reorder buffer. Timing, not values: the model tracks
//! when results exist, never what they are.
//!
//! The crate is organized as:
//! - [`config`]: serde-backed core and memory parameters with defaults.
//! - [`core`]: the pipeline — dispatcher, ROB, LSQ, register allocator.
//! - [`mem`]: the memory-channel contract and a fixed-latency model.
//! - [`sim`]: the lockstep driver tying front end, pipeline, and memory together.
//! - [`stats`]: counters and end-of-run summary.
//! - [`error`]: the fatal fault conditions.
//!
//! # Example
//!
//! ```
//! use o3sim::{Config, Instruction, InstrId, Simulator};
//!
//! let config = Config::default();
//! let program = vec![
//!     Instruction::with_operands(InstrId(1), 0x1000, vec![], vec![1], vec![0x80], vec![]),
//!     Instruction::with_operands(InstrId(2), 0x1004, vec![1], vec![2], vec![], vec![]),
//! ];
//! let mut sim = Simulator::from_config(&config, program);
//! sim.run(1_000_000);
//! assert_eq!(sim.stats().retired, 2);
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod mem;
pub mod sim;
pub mod stats;

pub use config::{Config, CoreConfig, MemoryConfig};
pub use core::dispatch::Dispatcher;
pub use core::instruction::{InstrId, Instruction, PhysReg};
pub use core::lsq::LoadStoreQueue;
pub use core::regalloc::RegisterAllocator;
pub use core::rob::ReorderBuffer;
pub use error::Fault;
pub use mem::{FixedLatencyMemory, MemRequest, MemoryChannel};
pub use sim::Simulator;
pub use stats::SimStats;
