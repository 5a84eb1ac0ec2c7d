//! In-flight instruction data model.
//!
//! This module defines the record the ROB owns for every instruction between
//! dispatch and retirement. It provides:
//! 1. **Identity:** A monotonically increasing [`InstrId`] used as the program-order tiebreak.
//! 2. **Operands:** Ordered architectural source/destination registers and virtual addresses.
//! 3. **Lifecycle:** Scheduled/executed/completed flags plus a polled ready-cycle timestamp.
//! 4. **Bookkeeping:** Pending register dependencies and completed memory-operation counts.

/// Unique, monotonically increasing id of a dispatched instruction.
///
/// Program order is total over ids: an instruction with a smaller id is
/// older. Ids are assigned by the upstream dispatcher and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct InstrId(pub u64);

impl std::fmt::Display for InstrId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Physical register id handed out by the register allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PhysReg(pub u16);

impl std::fmt::Display for PhysReg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// An instruction in flight between dispatch and retirement.
///
/// Exclusively owned by the ROB; created by the upstream dispatcher (which
/// fills the operand lists and, via the register allocator, the physical
/// register lists) and destroyed on retirement. Readiness is polled: the
/// stage code compares `ready_cycle` against the current cycle every tick.
#[derive(Clone, Debug, Default)]
pub struct Instruction {
    /// Unique program-order id.
    pub id: InstrId,
    /// Program counter of the instruction.
    pub pc: u64,
    /// Architectural source registers, in operand order.
    pub src_regs: Vec<usize>,
    /// Architectural destination registers, in operand order.
    pub dst_regs: Vec<usize>,
    /// Virtual addresses read by this instruction (loads).
    pub src_mem: Vec<u64>,
    /// Virtual addresses written by this instruction (stores).
    pub dst_mem: Vec<u64>,
    /// Renamed physical registers for the sources, filled at dispatch.
    pub src_phys: Vec<PhysReg>,
    /// Renamed physical registers for the destinations, filled at dispatch.
    pub dst_phys: Vec<PhysReg>,
    /// Marked by the frontend when this branch was mispredicted.
    pub branch_mispredict: bool,

    /// Passed the scheduling stage.
    pub scheduled: bool,
    /// Passed the execution stage.
    pub executed: bool,
    /// Passed the completion stage.
    pub completed: bool,
    /// Cycle at which the next lifecycle step becomes possible.
    pub ready_cycle: u64,
    /// Register dependencies not yet resolved by a producer's completion.
    pub pending_regs: usize,
    /// Memory operations satisfied so far (forwarded, returned, or issued writes).
    pub completed_mem_ops: usize,
    /// Total memory operations (`src_mem.len() + dst_mem.len()`).
    pub num_mem_ops: usize,
}

impl Instruction {
    /// Creates an instruction record with the given id and program counter.
    ///
    /// Operand lists start empty; `num_mem_ops` must be kept consistent with
    /// the address lists (use [`Instruction::with_operands`] or the test
    /// builder).
    pub fn new(id: InstrId, pc: u64) -> Self {
        Self {
            id,
            pc,
            ..Self::default()
        }
    }

    /// Creates an instruction with full operand lists.
    pub fn with_operands(
        id: InstrId,
        pc: u64,
        src_regs: Vec<usize>,
        dst_regs: Vec<usize>,
        src_mem: Vec<u64>,
        dst_mem: Vec<u64>,
    ) -> Self {
        let num_mem_ops = src_mem.len() + dst_mem.len();
        Self {
            id,
            pc,
            src_regs,
            dst_regs,
            src_mem,
            dst_mem,
            num_mem_ops,
            ..Self::default()
        }
    }

    /// True once every memory operand has been satisfied.
    #[inline]
    pub fn mem_ops_done(&self) -> bool {
        self.completed_mem_ops == self.num_mem_ops
    }
}
