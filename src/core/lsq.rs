//! Load/store queue: memory-operand tracking, forwarding, and issue.
//!
//! One entry is allocated per memory source (load) or destination (store)
//! operand at dispatch. The queue provides:
//! 1. **Disambiguation:** A dispatching load is matched against the closest
//!    preceding store to the same virtual address.
//! 2. **Forwarding:** A matched load either forwards immediately (store already
//!    issued) or parks on the store's wakeup list.
//! 3. **Issue:** Bandwidth-capped reads and writes offered to the memory channel;
//!    store issue is additionally gated until the store is non-speculative.
//!
//! Entries reference instructions by id only; the ROB resolves ids back to
//! live entries, so no pointers cross the component boundary.

use tracing::{error, trace};

use crate::config::CoreConfig;
use crate::core::instruction::InstrId;
use crate::mem::{MemRequest, MemoryChannel};

/// A single load- or store-queue entry: one memory operand in flight.
#[derive(Clone, Debug)]
pub struct LsqEntry {
    /// Owning instruction.
    pub instr_id: InstrId,
    /// Virtual address of the operand.
    pub vaddr: u64,
    /// Cycle from which the operand may issue; `u64::MAX` until the owning
    /// instruction executes.
    pub ready_cycle: u64,
    /// The request was accepted by the memory channel.
    pub issued: bool,
    /// Loads: store this entry forwards from, set at dispatch.
    pub forward_from: Option<InstrId>,
    /// Stores: loads parked on this entry, woken when the store issues.
    pub waiting_loads: Vec<InstrId>,
}

impl LsqEntry {
    fn new(instr_id: InstrId, vaddr: u64) -> Self {
        Self {
            instr_id,
            vaddr,
            ready_cycle: u64::MAX,
            issued: false,
            forward_from: None,
            waiting_loads: Vec::new(),
        }
    }
}

/// Outcome of dispatching one load operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadDispatch {
    /// Satisfied immediately from an already-issued store; no entry remains.
    Forwarded,
    /// Entry allocated; it will issue independently or wake on its store.
    Queued,
}

/// Memory-operand completions produced by one cycle of queue operation.
#[derive(Debug, Default)]
pub struct LsqCompletions {
    /// Stores whose write was accepted this cycle.
    pub stores: Vec<InstrId>,
    /// Loads satisfied by store wakeup this cycle.
    pub forwarded_loads: Vec<InstrId>,
    /// Reads offered to and accepted by the channel.
    pub reads_issued: u64,
    /// Writes offered to and accepted by the channel.
    pub writes_issued: u64,
}

/// Combined load queue and store queue with fixed slot capacity.
#[derive(Debug)]
pub struct LoadStoreQueue {
    lq: Vec<Option<LsqEntry>>,
    sq: Vec<Option<LsqEntry>>,
    lq_width: usize,
    sq_width: usize,
    block_bits: u32,
}

impl LoadStoreQueue {
    /// Creates a queue pair sized from the core configuration.
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            lq: vec![None; config.lq_size],
            sq: vec![None; config.sq_size],
            lq_width: config.lq_width,
            sq_width: config.sq_width,
            block_bits: config.block_bits,
        }
    }

    /// Load queue capacity.
    #[inline]
    pub fn lq_size(&self) -> usize {
        self.lq.len()
    }

    /// Store queue capacity.
    #[inline]
    pub fn sq_size(&self) -> usize {
        self.sq.len()
    }

    /// Occupied load-queue slots.
    pub fn lq_occupancy(&self) -> usize {
        self.lq.iter().filter(|slot| slot.is_some()).count()
    }

    /// Occupied store-queue slots.
    pub fn sq_occupancy(&self) -> usize {
        self.sq.iter().filter(|slot| slot.is_some()).count()
    }

    /// Free load-queue slots.
    #[inline]
    pub fn lq_free(&self) -> usize {
        self.lq_size() - self.lq_occupancy()
    }

    /// Free store-queue slots.
    #[inline]
    pub fn sq_free(&self) -> usize {
        self.sq_size() - self.sq_occupancy()
    }

    /// Allocates a store entry at dispatch. The caller has already checked
    /// capacity via `would_accept`.
    pub fn add_store(&mut self, instr_id: InstrId, vaddr: u64) -> bool {
        match self.sq.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(LsqEntry::new(instr_id, vaddr));
                true
            }
            None => false,
        }
    }

    /// Allocates a load entry at dispatch and performs the forwarding check.
    ///
    /// The forwarding source is the store entry with the same virtual address
    /// and the greatest instruction id smaller than the load's:
    /// - already issued: the load is satisfied on the spot, nothing is queued;
    /// - not yet issued: the load parks on the store's wakeup list;
    /// - absent: the load will issue a read on its own once ready.
    pub fn add_load(&mut self, instr_id: InstrId, vaddr: u64) -> Option<LoadDispatch> {
        let producer = self
            .sq
            .iter()
            .flatten()
            .filter(|store| store.vaddr == vaddr && store.instr_id < instr_id)
            .max_by_key(|store| store.instr_id)
            .map(|store| (store.instr_id, store.issued));

        if let Some((sid, true)) = producer {
            trace!(load = %instr_id, store = %sid, "load forwarded at dispatch");
            return Some(LoadDispatch::Forwarded);
        }

        let slot = self.lq.iter_mut().position(|slot| slot.is_none())?;
        let mut entry = LsqEntry::new(instr_id, vaddr);
        if let Some((sid, false)) = producer {
            entry.forward_from = Some(sid);
            if let Some(store) = self
                .sq
                .iter_mut()
                .flatten()
                .find(|store| store.instr_id == sid && store.vaddr == vaddr)
            {
                store.waiting_loads.push(instr_id);
            }
            trace!(load = %instr_id, store = %sid, "load waiting on store");
        }
        self.lq[slot] = Some(entry);
        Some(LoadDispatch::Queued)
    }

    /// Propagates an instruction's execution timing to its entries: its
    /// memory operands become issue-eligible at `ready_cycle`.
    pub fn set_ready(&mut self, instr_id: InstrId, ready_cycle: u64) {
        for entry in self.lq.iter_mut().chain(self.sq.iter_mut()).flatten() {
            if entry.instr_id == instr_id {
                entry.ready_cycle = ready_cycle;
            }
        }
    }

    /// Matches a drained read completion (block address) against issued load
    /// entries, removing each satisfied entry. Returns the owning ids.
    pub fn handle_mem_return(&mut self, block: u64) -> Vec<InstrId> {
        let block_bits = self.block_bits;
        let mut satisfied = Vec::new();
        for slot in &mut self.lq {
            let hit = slot
                .as_ref()
                .is_some_and(|e| e.issued && (e.vaddr >> block_bits) == block);
            if hit {
                if let Some(entry) = slot.take() {
                    satisfied.push(entry.instr_id);
                }
            }
        }
        satisfied
    }

    /// Runs one cycle of queue operation: issues eligible stores (waking
    /// their parked loads), then eligible loads, each within its bandwidth
    /// cap.
    ///
    /// `speculation_fence` is the id of the oldest unexecuted instruction in
    /// the ROB; a store may issue only if it is older than the fence, i.e.
    /// every older instruction has executed and no older branch can still
    /// redirect the machine.
    pub fn operate(
        &mut self,
        cycle: u64,
        speculation_fence: Option<InstrId>,
        mem: &mut dyn MemoryChannel,
    ) -> LsqCompletions {
        let mut out = LsqCompletions::default();

        // Stores first: a woken load never issues a redundant read.
        for idx in self.eligible_stores(cycle, speculation_fence) {
            if out.writes_issued as usize >= self.sq_width {
                break;
            }
            let (instr_id, vaddr) = {
                let entry = self.sq[idx].as_ref().unwrap_or_else(|| unreachable!());
                (entry.instr_id, entry.vaddr)
            };
            if !mem.issue_write(MemRequest {
                instr_id,
                addr: vaddr,
            }) {
                break; // channel busy, retry next cycle
            }
            out.writes_issued += 1;
            out.stores.push(instr_id);

            let waiting = {
                let entry = self.sq[idx].as_mut().unwrap_or_else(|| unreachable!());
                entry.issued = true;
                std::mem::take(&mut entry.waiting_loads)
            };
            for load_id in waiting {
                if self.wake_load(load_id, instr_id) {
                    out.forwarded_loads.push(load_id);
                }
            }
            trace!(store = %instr_id, addr = format_args!("{vaddr:#x}"), "store issued");
        }

        // Independent loads: ready, not forwarding, not yet issued.
        let mut reads = 0usize;
        for slot in &mut self.lq {
            if reads >= self.lq_width {
                break;
            }
            let Some(entry) = slot.as_mut() else { continue };
            if entry.issued || entry.forward_from.is_some() || entry.ready_cycle > cycle {
                continue;
            }
            if !mem.issue_read(MemRequest {
                instr_id: entry.instr_id,
                addr: entry.vaddr,
            }) {
                break;
            }
            entry.issued = true;
            reads += 1;
            trace!(load = %entry.instr_id, addr = format_args!("{:#x}", entry.vaddr), "read issued");
        }
        out.reads_issued = reads as u64;
        out
    }

    /// Removes any remaining entries of a retiring instruction (issued store
    /// entries persist until retirement so that younger loads can still
    /// forward from them).
    pub fn release(&mut self, instr_id: InstrId) {
        for slot in self.lq.iter_mut().chain(self.sq.iter_mut()) {
            if slot.as_ref().is_some_and(|e| e.instr_id == instr_id) {
                *slot = None;
            }
        }
    }

    /// Dumps every entry and its wait-on edge, as part of a deadlock report.
    pub fn dump(&self) {
        for entry in self.lq.iter().flatten() {
            error!(
                "  LQ {} addr {:#x} ready {} issued {} waits_on {:?}",
                entry.instr_id, entry.vaddr, entry.ready_cycle, entry.issued, entry.forward_from
            );
        }
        for entry in self.sq.iter().flatten() {
            error!(
                "  SQ {} addr {:#x} ready {} issued {} wakes {:?}",
                entry.instr_id, entry.vaddr, entry.ready_cycle, entry.issued, entry.waiting_loads
            );
        }
    }

    /// Store slots eligible to issue this cycle, oldest first.
    fn eligible_stores(&self, cycle: u64, fence: Option<InstrId>) -> Vec<usize> {
        let mut idxs: Vec<usize> = self
            .sq
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                let entry = slot.as_ref()?;
                let non_speculative = fence.is_none_or(|f| entry.instr_id < f);
                (!entry.issued && entry.ready_cycle <= cycle && non_speculative).then_some(idx)
            })
            .collect();
        idxs.sort_by_key(|&idx| {
            self.sq[idx]
                .as_ref()
                .map(|e| e.instr_id)
                .unwrap_or_default()
        });
        idxs
    }

    /// Removes the parked load entry woken by `store_id`. Returns false if
    /// the entry is gone (the owning instruction already released it).
    fn wake_load(&mut self, load_id: InstrId, store_id: InstrId) -> bool {
        for slot in &mut self.lq {
            let hit = slot
                .as_ref()
                .is_some_and(|e| e.instr_id == load_id && e.forward_from == Some(store_id));
            if hit {
                *slot = None;
                return true;
            }
        }
        false
    }
}
