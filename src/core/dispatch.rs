//! Dispatcher: in-order rename and admission front end.
//!
//! Feeds a program-order stream of instructions into the ROB. It provides:
//! 1. **Admission control:** At most `dispatch_width` instructions per cycle, each
//!    gated on [`ReorderBuffer::would_accept`] and on the misprediction stall.
//! 2. **Renaming:** Source then destination registers are renamed through the
//!    ROB's register allocator before insertion.
//! 3. **Squash:** Drops the undispatched remainder of the stream and restores
//!    the front-end rename table from committed state.
//!
//! Dispatch stops at the first instruction the ROB refuses; program order is
//! never reordered at this stage.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::config::CoreConfig;
use crate::core::instruction::Instruction;
use crate::core::rob::ReorderBuffer;

/// In-order instruction dispatcher.
#[derive(Debug)]
pub struct Dispatcher {
    /// Instructions not yet dispatched, in program order.
    program: VecDeque<Instruction>,
    dispatch_width: usize,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            program: VecDeque::new(),
            dispatch_width: config.dispatch_width,
        }
    }

    /// Creates a dispatcher preloaded with a program.
    ///
    /// Instruction ids must be strictly increasing in `program` order; the
    /// ROB rejects out-of-order dispatch as an invariant violation.
    pub fn from_program(config: &CoreConfig, program: Vec<Instruction>) -> Self {
        Self {
            program: program.into(),
            dispatch_width: config.dispatch_width,
        }
    }

    /// Appends one instruction to the pending stream.
    pub fn feed(&mut self, instr: Instruction) {
        self.program.push_back(instr);
    }

    /// Instructions still waiting to dispatch.
    #[inline]
    pub fn pending(&self) -> usize {
        self.program.len()
    }

    /// True once the whole stream has been dispatched.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.program.is_empty()
    }

    /// Dispatches up to `dispatch_width` instructions into the ROB.
    ///
    /// Stops early when the ROB is stalled on a misprediction or refuses the
    /// next instruction for capacity. Returns the number dispatched.
    pub fn dispatch(&mut self, rob: &mut ReorderBuffer) -> usize {
        let mut dispatched = 0usize;
        while dispatched < self.dispatch_width {
            if rob.stalled() {
                break;
            }
            match self.program.front() {
                Some(front) if rob.would_accept(front) => {}
                _ => break,
            }
            let mut instr = match self.program.pop_front() {
                Some(instr) => instr,
                None => break,
            };

            // Sources first: a register both read and written resolves the
            // read to the previous mapping.
            let srcs = instr.src_regs.clone();
            for arch in srcs {
                let preg = rob.registers_mut().rename_src_register(arch);
                instr.src_phys.push(preg);
            }
            let dsts = instr.dst_regs.clone();
            for arch in dsts {
                let preg = rob.registers_mut().rename_dest_register(arch, instr.id);
                instr.dst_phys.push(preg);
            }

            trace!(instr = %instr.id, "renamed");
            let accepted = rob.push_back(instr);
            debug_assert!(accepted);
            dispatched += 1;
        }
        dispatched
    }

    /// Drops the undispatched remainder of the stream and restores the
    /// front-end rename table from the committed back-end state.
    pub fn squash(&mut self, rob: &mut ReorderBuffer) {
        let dropped = self.program.len();
        self.program.clear();
        rob.registers_mut().reset_frontend_rat();
        debug!(dropped, "squashed pending stream");
    }
}
