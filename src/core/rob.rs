//! Reorder buffer: the per-cycle pipeline driver.
//!
//! The ROB owns every in-flight instruction and the load/store queue, and
//! consults the register allocator at retirement. It provides:
//! 1. **Dispatch:** `push_back` admission with synchronous memory-operand scheduling.
//! 2. **Scheduling:** Producer lists per architectural register and dependency edges.
//! 3. **Execution/Completion:** Bandwidth-limited, latency-timed lifecycle advance.
//! 4. **In-order Retirement:** A strictly contiguous completed prefix retires from the head.
//! 5. **Deadlock Detection:** A no-progress watchdog that dumps state and aborts.
//!
//! Each instruction advances monotonically through Dispatched → Scheduled →
//! Executed → Completed → Retired; no state ever regresses. Within one tick
//! the stages run in a fixed order — retire, complete, execute, schedule,
//! memory-return drain, LSQ operation — so a dependency released by an early
//! stage is visible to the stages that run later in the same cycle. That
//! ordering is load-bearing; do not rearrange it.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, error, trace};

use crate::config::CoreConfig;
use crate::core::instruction::{InstrId, Instruction};
use crate::core::lsq::{LoadDispatch, LoadStoreQueue};
use crate::core::regalloc::RegisterAllocator;
use crate::error::{fatal, Fault};
use crate::mem::MemoryChannel;
use crate::stats::SimStats;

/// Reorder buffer and pipeline driver.
#[derive(Debug)]
pub struct ReorderBuffer {
    /// In-flight instructions, sorted by id (ids strictly increase at dispatch).
    entries: VecDeque<Instruction>,
    capacity: usize,
    /// Combined load/store queue, owned by the ROB.
    lsq: LoadStoreQueue,
    /// Physical register pool, consulted at rename (upstream) and retirement.
    regs: RegisterAllocator,
    /// Per-architectural-register list of live producer ids, oldest first.
    reg_producers: Vec<Vec<InstrId>>,
    /// Dependency edges: producer id → consumers that recorded a pending
    /// dependency on it. Updated together with each consumer's pending count.
    consumers: HashMap<InstrId, Vec<InstrId>>,

    schedule_width: usize,
    execute_width: usize,
    complete_width: usize,
    retire_width: usize,
    schedule_latency: u64,
    execute_latency: u64,
    mispredict_penalty: u64,
    deadlock_cycles: u64,

    cycle: u64,
    /// Scheduling and dispatch are suppressed while `cycle < stall_until`.
    stall_until: u64,
    /// Id of the most recently retired instruction, for register reclamation
    /// once the ROB drains empty.
    last_retired: u64,
    /// Deadlock watchdog: last observed (head id, head ready cycle).
    head_watch: Option<(InstrId, u64)>,
    head_stalled: u64,

    stats: SimStats,
}

impl ReorderBuffer {
    /// Creates a ROB (plus its LSQ and register allocator) from config.
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.rob_size),
            capacity: config.rob_size,
            lsq: LoadStoreQueue::new(config),
            regs: RegisterAllocator::new(config),
            reg_producers: vec![Vec::new(); config.num_arch_regs],
            consumers: HashMap::new(),
            schedule_width: config.schedule_width,
            execute_width: config.execute_width,
            complete_width: config.complete_width,
            retire_width: config.retire_width,
            schedule_latency: config.schedule_latency,
            execute_latency: config.execute_latency,
            mispredict_penalty: config.mispredict_penalty,
            deadlock_cycles: config.deadlock_cycles,
            cycle: 0,
            stall_until: 0,
            last_retired: 0,
            head_watch: None,
            head_stalled: 0,
            stats: SimStats::new(),
        }
    }

    // --- capacity introspection for upstream flow control ---

    /// ROB capacity in entries.
    #[inline]
    pub fn size(&self) -> usize {
        self.capacity
    }

    /// Occupied ROB slots.
    #[inline]
    pub fn occupancy(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no instruction is in flight.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if no free slot remains.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    /// Load queue capacity.
    #[inline]
    pub fn lq_size(&self) -> usize {
        self.lsq.lq_size()
    }

    /// Occupied load-queue slots.
    #[inline]
    pub fn lq_occupancy(&self) -> usize {
        self.lsq.lq_occupancy()
    }

    /// Store queue capacity.
    #[inline]
    pub fn sq_size(&self) -> usize {
        self.lsq.sq_size()
    }

    /// Occupied store-queue slots.
    #[inline]
    pub fn sq_occupancy(&self) -> usize {
        self.lsq.sq_occupancy()
    }

    /// Monotonically increasing count of retired instructions.
    #[inline]
    pub fn retired_count(&self) -> u64 {
        self.stats.retired
    }

    /// Current simulated cycle.
    #[inline]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// True while a completed misprediction suppresses scheduling/dispatch.
    #[inline]
    pub fn stalled(&self) -> bool {
        self.cycle < self.stall_until
    }

    /// Statistics collected so far.
    #[inline]
    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    /// Register allocator access for the upstream rename contract.
    #[inline]
    pub fn registers(&self) -> &RegisterAllocator {
        &self.regs
    }

    /// Mutable register allocator access for the upstream rename contract.
    #[inline]
    pub fn registers_mut(&mut self) -> &mut RegisterAllocator {
        &mut self.regs
    }

    // --- admission ---

    /// True iff a free ROB slot exists and enough free LQ/SQ slots exist for
    /// every memory operand of `instr`.
    pub fn would_accept(&self, instr: &Instruction) -> bool {
        !self.is_full()
            && self.lsq.lq_free() >= instr.src_mem.len()
            && self.lsq.sq_free() >= instr.dst_mem.len()
    }

    /// Enqueues a renamed instruction, synchronously scheduling its memory
    /// operands. Returns `false` (refusing the insertion, never blocking) if
    /// capacity is insufficient — callers are expected to have checked
    /// [`ReorderBuffer::would_accept`].
    pub fn push_back(&mut self, mut instr: Instruction) -> bool {
        if !self.would_accept(&instr) {
            return false;
        }
        if let Some(last) = self.entries.back() {
            if instr.id <= last.id {
                fatal(Fault::InvariantViolation(format!(
                    "dispatch of {} out of program order (last {})",
                    instr.id, last.id
                )));
            }
        }

        for idx in 0..instr.src_mem.len() {
            let addr = instr.src_mem[idx];
            match self.lsq.add_load(instr.id, addr) {
                Some(LoadDispatch::Forwarded) => {
                    instr.completed_mem_ops += 1;
                    self.stats.loads_forwarded += 1;
                }
                Some(LoadDispatch::Queued) => {}
                None => fatal(Fault::InvariantViolation(format!(
                    "load queue full at admitted dispatch of {}",
                    instr.id
                ))),
            }
        }
        for idx in 0..instr.dst_mem.len() {
            let addr = instr.dst_mem[idx];
            if !self.lsq.add_store(instr.id, addr) {
                fatal(Fault::InvariantViolation(format!(
                    "store queue full at admitted dispatch of {}",
                    instr.id
                )));
            }
        }

        trace!(instr = %instr.id, pc = format_args!("{:#x}", instr.pc), "dispatched");
        self.stats.dispatched += 1;
        self.entries.push_back(instr);
        true
    }

    /// Resolves an instruction id to its live ROB entry, if still in flight.
    pub fn find_in_rob(&self, id: InstrId) -> Option<&Instruction> {
        self.entries
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    // --- the per-cycle driver ---

    /// Advances the pipeline by one cycle.
    ///
    /// Stage order within the tick is fixed (see module docs): retire,
    /// complete, execute, schedule, drain memory returns, operate the LSQ,
    /// then the deadlock watchdog.
    pub fn tick(&mut self, mem: &mut dyn MemoryChannel) {
        self.cycle += 1;
        self.stats.cycles += 1;
        if self.stalled() {
            self.stats.stall_cycles += 1;
        }

        self.retire();
        self.complete();
        self.execute();
        self.schedule();

        for block in mem.drain_completions() {
            for id in self.lsq.handle_mem_return(block) {
                self.stats.mem_returns += 1;
                self.record_mem_op_done(id);
            }
        }
        self.operate_lsq(mem);

        self.check_deadlock();
    }

    /// Pops the bandwidth-limited, strictly contiguous completed prefix at
    /// the head, releasing registers and LSQ resources.
    fn retire(&mut self) {
        let mut popped = 0usize;
        while popped < self.retire_width {
            match self.entries.front() {
                Some(head) if head.completed => {}
                _ => break,
            }
            let instr = match self.entries.pop_front() {
                Some(instr) => instr,
                None => break,
            };
            for &preg in &instr.dst_phys {
                self.regs.retire_dest_register(preg);
            }
            for &preg in &instr.src_phys {
                self.regs.retire_src_register(preg);
            }
            self.lsq.release(instr.id);
            trace!(instr = %instr.id, cycle = self.cycle, "retired");
            self.last_retired = instr.id.0;
            self.stats.retired += 1;
            popped += 1;
        }

        if popped > 0 {
            let head = self
                .entries
                .front()
                .map_or(InstrId(self.last_retired + 1), |e| e.id);
            self.regs.free_retired_registers(head);
        }
    }

    /// True once an instruction may complete: executed, timing reached, and
    /// every memory operand satisfied by the LSQ.
    fn is_ready_to_complete(&self, instr: &Instruction) -> bool {
        instr.executed
            && !instr.completed
            && instr.ready_cycle <= self.cycle
            && instr.mem_ops_done()
    }

    /// Completes eligible instructions, releasing their dependents.
    ///
    /// A completing instruction is removed from every producer list it heads,
    /// and every consumer that recorded an edge on it has its pending count
    /// decremented. A completing mispredicted branch charges the frontend
    /// stall.
    fn complete(&mut self) {
        let mut done: Vec<(InstrId, Vec<usize>, bool)> = Vec::new();
        for idx in 0..self.entries.len() {
            if done.len() >= self.complete_width {
                break;
            }
            if self.is_ready_to_complete(&self.entries[idx]) {
                let entry = &mut self.entries[idx];
                entry.completed = true;
                done.push((entry.id, entry.dst_regs.clone(), entry.branch_mispredict));
            }
        }

        for (id, dst_regs, mispredicted) in done {
            for reg in dst_regs {
                self.reg_producers[reg].retain(|&p| p != id);
            }
            for consumer in self.consumers.remove(&id).unwrap_or_default() {
                match self.entries.binary_search_by_key(&consumer, |e| e.id) {
                    Ok(idx) => {
                        let entry = &mut self.entries[idx];
                        if entry.pending_regs == 0 {
                            fatal(Fault::InvariantViolation(format!(
                                "completion of {id} found consumer {consumer} with no pending deps"
                            )));
                        }
                        entry.pending_regs -= 1;
                    }
                    Err(_) => fatal(Fault::InvariantViolation(format!(
                        "consumer {consumer} of {id} is not a live ROB entry"
                    ))),
                }
            }
            if mispredicted {
                self.stall_until = self.stall_until.max(self.cycle + self.mispredict_penalty);
                self.stats.mispredictions += 1;
                debug!(instr = %id, until = self.stall_until, "misprediction stall");
            }
            trace!(instr = %id, cycle = self.cycle, "completed");
            self.stats.completed += 1;
        }
    }

    /// Begins execution of eligible instructions and propagates the resulting
    /// completion timing to their LSQ entries.
    fn execute(&mut self) {
        let mut started = 0usize;
        for idx in 0..self.entries.len() {
            if started >= self.execute_width {
                break;
            }
            let entry = &self.entries[idx];
            let eligible = entry.scheduled
                && !entry.executed
                && entry.pending_regs == 0
                && entry.ready_cycle <= self.cycle;
            if !eligible {
                continue;
            }
            let (id, ready) = {
                let entry = &mut self.entries[idx];
                entry.executed = true;
                entry.ready_cycle = self.cycle + self.execute_latency;
                (entry.id, entry.ready_cycle)
            };
            self.lsq.set_ready(id, ready);
            trace!(instr = %id, ready, "executing");
            self.stats.executed += 1;
            started += 1;
        }
    }

    /// Schedules dispatched instructions: records one dependency edge per
    /// source register (to the closest older live producer) and registers the
    /// instruction as producer for each destination register.
    ///
    /// Suppressed entirely while a misprediction stall is pending.
    fn schedule(&mut self) {
        if self.stalled() {
            return;
        }
        let mut scheduled = 0usize;
        for idx in 0..self.entries.len() {
            if scheduled >= self.schedule_width {
                break;
            }
            if self.entries[idx].scheduled {
                continue;
            }
            let id = self.entries[idx].id;

            let mut pending = 0usize;
            for pos in 0..self.entries[idx].src_regs.len() {
                let reg = self.entries[idx].src_regs[pos];
                // Closest preceding live producer, if any, by program order.
                if let Some(&producer) = self.reg_producers[reg].iter().rev().find(|&&p| p < id) {
                    self.consumers.entry(producer).or_default().push(id);
                    pending += 1;
                }
            }
            for pos in 0..self.entries[idx].dst_regs.len() {
                let reg = self.entries[idx].dst_regs[pos];
                // Scheduling runs in program order, so pushing keeps the
                // producer list sorted by id.
                self.reg_producers[reg].push(id);
            }

            let entry = &mut self.entries[idx];
            entry.pending_regs += pending;
            entry.scheduled = true;
            entry.ready_cycle = self.cycle + self.schedule_latency;
            trace!(instr = %id, pending, "scheduled");
            self.stats.scheduled += 1;
            scheduled += 1;
        }
    }

    /// Drives the LSQ for one cycle and applies its completions.
    fn operate_lsq(&mut self, mem: &mut dyn MemoryChannel) {
        // Oldest unexecuted instruction; stores older than this are
        // non-speculative (every older branch has resolved).
        let fence = self.entries.iter().find(|e| !e.executed).map(|e| e.id);
        let out = self.lsq.operate(self.cycle, fence, mem);
        self.stats.reads_issued += out.reads_issued;
        self.stats.writes_issued += out.writes_issued;
        for id in out.stores {
            self.record_mem_op_done(id);
        }
        for id in out.forwarded_loads {
            self.stats.loads_forwarded += 1;
            self.record_mem_op_done(id);
        }
    }

    /// Credits one satisfied memory operand to a live instruction.
    fn record_mem_op_done(&mut self, id: InstrId) {
        match self.entries.binary_search_by_key(&id, |e| e.id) {
            Ok(idx) => {
                let entry = &mut self.entries[idx];
                if entry.completed_mem_ops >= entry.num_mem_ops {
                    fatal(Fault::InvariantViolation(format!(
                        "{id} credited with more memory ops than it has"
                    )));
                }
                entry.completed_mem_ops += 1;
            }
            Err(_) => fatal(Fault::InvariantViolation(format!(
                "memory completion for {id}, which is not a live ROB entry"
            ))),
        }
    }

    /// No-progress watchdog on the ROB head.
    fn check_deadlock(&mut self) {
        let Some(head) = self.entries.front() else {
            self.head_watch = None;
            self.head_stalled = 0;
            return;
        };
        let key = (head.id, head.ready_cycle);
        if self.head_watch == Some(key) {
            self.head_stalled += 1;
        } else {
            self.head_watch = Some(key);
            self.head_stalled = 0;
        }
        if self.head_stalled >= self.deadlock_cycles {
            let head_id = key.0;
            self.print_deadlock();
            fatal(Fault::Deadlock {
                cycle: self.cycle,
                head_id: head_id.0,
                threshold: self.deadlock_cycles,
            });
        }
    }

    /// Dumps the head instruction and the full LQ/SQ wait-on graph.
    ///
    /// Invoked internally by the watchdog, and available to the outer driver
    /// when it detects stalled global progress on its own.
    pub fn print_deadlock(&self) {
        if let Some(head) = self.entries.front() {
            error!(
                "ROB head {} pc {:#x} scheduled {} executed {} completed {} pending_regs {} mem {}/{} ready {}",
                head.id,
                head.pc,
                head.scheduled,
                head.executed,
                head.completed,
                head.pending_regs,
                head.completed_mem_ops,
                head.num_mem_ops,
                head.ready_cycle
            );
        } else {
            error!("ROB empty");
        }
        error!(
            "occupancy {}/{} lq {}/{} sq {}/{} cycle {}",
            self.occupancy(),
            self.size(),
            self.lq_occupancy(),
            self.lq_size(),
            self.sq_occupancy(),
            self.sq_size(),
            self.cycle
        );
        self.lsq.dump();
    }
}
