//! Configuration system for the simulator.
//!
//! This module defines all configuration structures used to parameterize the
//! pipeline engine. It provides:
//! 1. **Defaults:** Baseline core constants (queue sizes, stage widths, latencies).
//! 2. **Structures:** Hierarchical config for the core pipeline and the memory channel.
//!
//! Configuration is supplied as JSON (`serde_json`) by an outer driver, or use
//! `Config::default()` for a baseline big-core model. All values are plain
//! numbers: instructions per cycle, cycles, or entries.

use serde::Deserialize;

/// Default configuration constants for the simulated core.
///
/// These values define the baseline core when not explicitly overridden.
mod defaults {
    /// Reorder buffer capacity in entries.
    pub const ROB_SIZE: usize = 352;

    /// Load queue capacity in entries (one per in-flight load operand).
    pub const LQ_SIZE: usize = 128;

    /// Store queue capacity in entries (one per in-flight store operand).
    pub const SQ_SIZE: usize = 72;

    /// Physical register pool size shared by all in-flight instructions.
    pub const NUM_PHYS_REGS: usize = 512;

    /// Number of architectural register names the frontend may reference.
    pub const NUM_ARCH_REGS: usize = 64;

    /// Instructions the upstream dispatcher may insert per cycle.
    pub const DISPATCH_WIDTH: usize = 6;

    /// Instructions entering the scheduler per cycle.
    pub const SCHEDULE_WIDTH: usize = 128;

    /// Instructions beginning execution per cycle.
    pub const EXECUTE_WIDTH: usize = 4;

    /// Instructions completing per cycle.
    pub const COMPLETE_WIDTH: usize = 128;

    /// Instructions retiring from the ROB head per cycle.
    pub const RETIRE_WIDTH: usize = 5;

    /// Load-queue read issues per cycle.
    pub const LQ_WIDTH: usize = 2;

    /// Store-queue write issues per cycle.
    pub const SQ_WIDTH: usize = 2;

    /// Cycles between scheduling and becoming executable.
    pub const SCHEDULE_LATENCY: u64 = 1;

    /// Cycles between executing and becoming completable.
    pub const EXECUTE_LATENCY: u64 = 1;

    /// Cycles of frontend stall charged when a mispredicted branch completes.
    pub const MISPREDICT_PENALTY: u64 = 1;

    /// Cycles of zero ROB-head progress before the deadlock dump fires.
    pub const DEADLOCK_CYCLES: u64 = 1_000_000;

    /// log2 of the memory block size used to match read completions (64 B).
    pub const BLOCK_BITS: u32 = 6;

    /// Fixed read latency of the default memory channel, in cycles.
    pub const MEM_LATENCY: u64 = 200;

    /// Requests the default memory channel accepts per cycle.
    pub const MEM_CHANNEL_WIDTH: usize = 16;
}

/// Root configuration structure containing all engine settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use o3sim::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.core.rob_size, 352);
/// assert_eq!(config.core.retire_width, 5);
/// ```
///
/// Deserializing from JSON (typical outer-driver usage):
///
/// ```
/// use o3sim::config::Config;
///
/// let json = r#"{
///     "core": { "rob_size": 64, "lq_size": 16, "sq_size": 8 },
///     "memory": { "latency": 50 }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.core.rob_size, 64);
/// assert_eq!(config.core.execute_width, 4);
/// assert_eq!(config.memory.latency, 50);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Core pipeline parameters (queue sizes, widths, latencies).
    #[serde(default)]
    pub core: CoreConfig,
    /// Memory channel parameters.
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Core pipeline parameters: capacities, per-stage bandwidth, and latencies.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Reorder buffer capacity in entries.
    #[serde(default = "CoreConfig::default_rob_size")]
    pub rob_size: usize,

    /// Load queue capacity in entries.
    #[serde(default = "CoreConfig::default_lq_size")]
    pub lq_size: usize,

    /// Store queue capacity in entries.
    #[serde(default = "CoreConfig::default_sq_size")]
    pub sq_size: usize,

    /// Physical register pool size.
    #[serde(default = "CoreConfig::default_num_phys_regs")]
    pub num_phys_regs: usize,

    /// Number of architectural register names.
    #[serde(default = "CoreConfig::default_num_arch_regs")]
    pub num_arch_regs: usize,

    /// Instructions dispatched into the ROB per cycle.
    #[serde(default = "CoreConfig::default_dispatch_width")]
    pub dispatch_width: usize,

    /// Instructions scheduled per cycle.
    #[serde(default = "CoreConfig::default_schedule_width")]
    pub schedule_width: usize,

    /// Instructions beginning execution per cycle.
    #[serde(default = "CoreConfig::default_execute_width")]
    pub execute_width: usize,

    /// Instructions completing per cycle.
    #[serde(default = "CoreConfig::default_complete_width")]
    pub complete_width: usize,

    /// Instructions retiring per cycle.
    #[serde(default = "CoreConfig::default_retire_width")]
    pub retire_width: usize,

    /// Load read issues per cycle.
    #[serde(default = "CoreConfig::default_lq_width")]
    pub lq_width: usize,

    /// Store write issues per cycle.
    #[serde(default = "CoreConfig::default_sq_width")]
    pub sq_width: usize,

    /// Cycles from scheduling until an instruction may execute.
    #[serde(default = "CoreConfig::default_schedule_latency")]
    pub schedule_latency: u64,

    /// Cycles from execution until an instruction may complete.
    #[serde(default = "CoreConfig::default_execute_latency")]
    pub execute_latency: u64,

    /// Scheduling/dispatch stall charged by a completing mispredicted branch.
    #[serde(default = "CoreConfig::default_mispredict_penalty")]
    pub mispredict_penalty: u64,

    /// Cycles of zero head progress before the deadlock dump fires.
    #[serde(default = "CoreConfig::default_deadlock_cycles")]
    pub deadlock_cycles: u64,

    /// log2 of the block size used to match memory read completions.
    #[serde(default = "CoreConfig::default_block_bits")]
    pub block_bits: u32,
}

impl CoreConfig {
    fn default_rob_size() -> usize {
        defaults::ROB_SIZE
    }
    fn default_lq_size() -> usize {
        defaults::LQ_SIZE
    }
    fn default_sq_size() -> usize {
        defaults::SQ_SIZE
    }
    fn default_num_phys_regs() -> usize {
        defaults::NUM_PHYS_REGS
    }
    fn default_num_arch_regs() -> usize {
        defaults::NUM_ARCH_REGS
    }
    fn default_dispatch_width() -> usize {
        defaults::DISPATCH_WIDTH
    }
    fn default_schedule_width() -> usize {
        defaults::SCHEDULE_WIDTH
    }
    fn default_execute_width() -> usize {
        defaults::EXECUTE_WIDTH
    }
    fn default_complete_width() -> usize {
        defaults::COMPLETE_WIDTH
    }
    fn default_retire_width() -> usize {
        defaults::RETIRE_WIDTH
    }
    fn default_lq_width() -> usize {
        defaults::LQ_WIDTH
    }
    fn default_sq_width() -> usize {
        defaults::SQ_WIDTH
    }
    fn default_schedule_latency() -> u64 {
        defaults::SCHEDULE_LATENCY
    }
    fn default_execute_latency() -> u64 {
        defaults::EXECUTE_LATENCY
    }
    fn default_mispredict_penalty() -> u64 {
        defaults::MISPREDICT_PENALTY
    }
    fn default_deadlock_cycles() -> u64 {
        defaults::DEADLOCK_CYCLES
    }
    fn default_block_bits() -> u32 {
        defaults::BLOCK_BITS
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            rob_size: defaults::ROB_SIZE,
            lq_size: defaults::LQ_SIZE,
            sq_size: defaults::SQ_SIZE,
            num_phys_regs: defaults::NUM_PHYS_REGS,
            num_arch_regs: defaults::NUM_ARCH_REGS,
            dispatch_width: defaults::DISPATCH_WIDTH,
            schedule_width: defaults::SCHEDULE_WIDTH,
            execute_width: defaults::EXECUTE_WIDTH,
            complete_width: defaults::COMPLETE_WIDTH,
            retire_width: defaults::RETIRE_WIDTH,
            lq_width: defaults::LQ_WIDTH,
            sq_width: defaults::SQ_WIDTH,
            schedule_latency: defaults::SCHEDULE_LATENCY,
            execute_latency: defaults::EXECUTE_LATENCY,
            mispredict_penalty: defaults::MISPREDICT_PENALTY,
            deadlock_cycles: defaults::DEADLOCK_CYCLES,
            block_bits: defaults::BLOCK_BITS,
        }
    }
}

/// Memory channel parameters for the provided fixed-latency model.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Fixed read latency in cycles.
    #[serde(default = "MemoryConfig::default_latency")]
    pub latency: u64,

    /// Requests accepted per cycle before the channel reports busy.
    #[serde(default = "MemoryConfig::default_channel_width")]
    pub channel_width: usize,
}

impl MemoryConfig {
    fn default_latency() -> u64 {
        defaults::MEM_LATENCY
    }
    fn default_channel_width() -> usize {
        defaults::MEM_CHANNEL_WIDTH
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            latency: defaults::MEM_LATENCY,
            channel_width: defaults::MEM_CHANNEL_WIDTH,
        }
    }
}
