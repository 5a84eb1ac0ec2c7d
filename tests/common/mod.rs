//! Shared helpers for the integration tests: a fluent instruction builder
//! and program-level run harnesses.

use o3sim::{Config, FixedLatencyMemory, InstrId, Instruction, Simulator};

/// Fluent builder for test instructions.
#[derive(Debug)]
pub struct InstrBuilder {
    instr: Instruction,
}

impl InstrBuilder {
    pub fn new(id: u64) -> Self {
        Self {
            instr: Instruction::new(InstrId(id), 0x1000 + id * 4),
        }
    }

    #[allow(dead_code)]
    pub fn pc(mut self, pc: u64) -> Self {
        self.instr.pc = pc;
        self
    }

    pub fn reads(mut self, regs: &[usize]) -> Self {
        self.instr.src_regs.extend_from_slice(regs);
        self
    }

    pub fn writes(mut self, regs: &[usize]) -> Self {
        self.instr.dst_regs.extend_from_slice(regs);
        self
    }

    pub fn loads(mut self, addrs: &[u64]) -> Self {
        self.instr.src_mem.extend_from_slice(addrs);
        self.instr.num_mem_ops += addrs.len();
        self
    }

    pub fn stores(mut self, addrs: &[u64]) -> Self {
        self.instr.dst_mem.extend_from_slice(addrs);
        self.instr.num_mem_ops += addrs.len();
        self
    }

    pub fn mispredicted(mut self) -> Self {
        self.instr.branch_mispredict = true;
        self
    }

    pub fn build(self) -> Instruction {
        self.instr
    }
}

/// Shorthand for a register-only instruction.
pub fn alu(id: u64, reads: &[usize], writes: &[usize]) -> Instruction {
    InstrBuilder::new(id).reads(reads).writes(writes).build()
}

/// Installs a test-writer tracing subscriber, honoring `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Runs a program on the default fixed-latency memory until it drains,
/// asserting that it does.
pub fn run_to_drain(config: &Config, program: Vec<Instruction>) -> Simulator<FixedLatencyMemory> {
    init_tracing();
    let expected = program.len() as u64;
    let mut sim = Simulator::from_config(config, program);
    sim.run(10_000_000);
    assert!(sim.is_drained(), "program failed to drain");
    assert_eq!(sim.stats().retired, expected);
    sim
}

/// A fast-memory config for tests where memory latency is not the subject.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.memory.latency = 2;
    config
}
