//! Register allocator: physical register pool and rename tables.
//!
//! Maps architectural register names onto a finite pool of physical
//! registers, enforcing RAW/WAW ordering through explicit bookkeeping. It
//! provides:
//! 1. **Renaming:** Destination renames pop the free list; source renames resolve
//!    through the front-end table and count themselves as pending consumers.
//! 2. **Rename tables:** A speculative front-end table updated at rename and an
//!    architectural back-end table committed at retirement.
//! 3. **Reclamation:** Batched, lazy freeing — a register returns to the pool only
//!    once it is superseded, has zero pending consumers, and its producer retired.
//!
//! Exhausting the free list is fatal: admission control upstream should have
//! prevented the rename, so the allocator dumps its live records and aborts.

use std::collections::VecDeque;

use tracing::error;

use crate::config::CoreConfig;
use crate::core::instruction::{InstrId, PhysReg};
use crate::error::{fatal, Fault};

/// Bookkeeping for one live physical register.
#[derive(Clone, Debug)]
pub struct RegRecord {
    /// Architectural register this physical register renames.
    pub arch_reg: usize,
    /// Instruction that will produce (or produced) the value; cleared at retirement.
    pub producer: Option<InstrId>,
    /// In-flight readers that have not yet retired their source reference.
    pub pending_consumers: u32,
    /// True while this is the latest rename of `arch_reg`; cleared when superseded.
    pub most_current: bool,
}

/// Physical register allocator with front-end and back-end rename tables.
#[derive(Debug)]
pub struct RegisterAllocator {
    /// Registers available for rename.
    free_list: VecDeque<PhysReg>,
    /// Live records, indexed by physical register id. `None` slots are free.
    records: Vec<Option<RegRecord>>,
    /// Speculative rename table updated by the frontend at rename time.
    frontend_rat: Vec<Option<PhysReg>>,
    /// Architecturally committed rename table updated at retirement.
    backend_rat: Vec<Option<PhysReg>>,
}

impl RegisterAllocator {
    /// Creates an allocator sized from the core configuration.
    ///
    /// The pool size must fit the physical register id space; an oversized
    /// pool would alias ids.
    pub fn new(config: &CoreConfig) -> Self {
        if config.num_phys_regs > usize::from(u16::MAX) + 1 {
            fatal(Fault::InvariantViolation(format!(
                "physical register pool of {} exceeds the {} representable ids",
                config.num_phys_regs,
                usize::from(u16::MAX) + 1
            )));
        }
        Self {
            free_list: (0..config.num_phys_regs)
                .map(|i| PhysReg(i as u16))
                .collect(),
            records: vec![None; config.num_phys_regs],
            frontend_rat: vec![None; config.num_arch_regs],
            backend_rat: vec![None; config.num_arch_regs],
        }
    }

    /// Number of registers currently on the free list.
    #[inline]
    pub fn count_free_registers(&self) -> usize {
        self.free_list.len()
    }

    /// Total pool size.
    #[inline]
    pub fn pool_size(&self) -> usize {
        self.records.len()
    }

    /// Renames a destination register for `producer`.
    ///
    /// Pops a register from the free list, marks any existing most-current
    /// mapping of `arch_reg` as superseded, and points the front-end table at
    /// the new register. Aborts on free-list exhaustion.
    pub fn rename_dest_register(&mut self, arch_reg: usize, producer: InstrId) -> PhysReg {
        let preg = self.pop_free(arch_reg);

        if let Some(old) = self.frontend_rat[arch_reg] {
            if let Some(rec) = self.records[old.0 as usize].as_mut() {
                rec.most_current = false;
            }
        }

        self.records[preg.0 as usize] = Some(RegRecord {
            arch_reg,
            producer: Some(producer),
            pending_consumers: 0,
            most_current: true,
        });
        self.frontend_rat[arch_reg] = Some(preg);
        preg
    }

    /// Renames a source register, registering the caller as a pending consumer.
    ///
    /// Resolves through the front-end table. If `arch_reg` has never been
    /// written, a producer-less "already ready" record is allocated lazily so
    /// unwritten registers never block a reader.
    pub fn rename_src_register(&mut self, arch_reg: usize) -> PhysReg {
        if let Some(preg) = self.frontend_rat[arch_reg] {
            self.record_mut(preg).pending_consumers += 1;
            return preg;
        }

        let preg = self.pop_free(arch_reg);
        self.records[preg.0 as usize] = Some(RegRecord {
            arch_reg,
            producer: None,
            pending_consumers: 1,
            most_current: true,
        });
        self.frontend_rat[arch_reg] = Some(preg);
        preg
    }

    /// Instruction that will produce the value of `preg`, or `None` if the
    /// value is already architectural (producer retired or never existed).
    #[inline]
    pub fn get_producing_instr(&self, preg: PhysReg) -> Option<InstrId> {
        self.records[preg.0 as usize]
            .as_ref()
            .and_then(|rec| rec.producer)
    }

    /// Retires a destination register: clears the producer field and commits
    /// the mapping to the back-end table.
    pub fn retire_dest_register(&mut self, preg: PhysReg) {
        let rec = self.record_mut(preg);
        rec.producer = None;
        let arch = rec.arch_reg;
        self.backend_rat[arch] = Some(preg);
    }

    /// Retires a source reference: decrements the pending-consumer count.
    pub fn retire_src_register(&mut self, preg: PhysReg) {
        let rec = self.record_mut(preg);
        if rec.pending_consumers == 0 {
            fatal(Fault::InvariantViolation(format!(
                "retiring source {preg} with zero pending consumers"
            )));
        }
        rec.pending_consumers -= 1;
    }

    /// Returns to the free list every record that is superseded, has zero
    /// pending consumers, and whose producer is absent or already retired
    /// (id older than the ROB head).
    ///
    /// Batched and lazy: a register a not-yet-retired reader still references
    /// keeps a positive consumer count and survives this sweep.
    pub fn free_retired_registers(&mut self, rob_head: InstrId) {
        for idx in 0..self.records.len() {
            let reclaim = match &self.records[idx] {
                Some(rec) => {
                    !rec.most_current
                        && rec.pending_consumers == 0
                        && rec.producer.is_none_or(|id| id < rob_head)
                }
                None => false,
            };
            if reclaim {
                self.records[idx] = None;
                self.free_list.push_back(PhysReg(idx as u16));
            }
        }
    }

    /// Restores the front-end table from the back-end table.
    ///
    /// Called by the upstream dispatcher when it squashes wrong-path state
    /// after a misprediction. Records the committed table does not reference
    /// lose their most-current status: the next rename of that architectural
    /// register supersedes nothing, and the squashed mapping stays eligible
    /// for [`RegisterAllocator::free_retired_registers`].
    pub fn reset_frontend_rat(&mut self) {
        self.frontend_rat.copy_from_slice(&self.backend_rat);
        for idx in 0..self.records.len() {
            if let Some(rec) = self.records[idx].as_mut() {
                rec.most_current = self.backend_rat[rec.arch_reg] == Some(PhysReg(idx as u16));
            }
        }
    }

    /// Read access to a live record, for diagnostics and tests.
    pub fn record(&self, preg: PhysReg) -> Option<&RegRecord> {
        self.records[preg.0 as usize].as_ref()
    }

    fn record_mut(&mut self, preg: PhysReg) -> &mut RegRecord {
        match self.records[preg.0 as usize].as_mut() {
            Some(rec) => rec,
            None => fatal(Fault::InvariantViolation(format!(
                "{preg} has no live record"
            ))),
        }
    }

    fn pop_free(&mut self, arch_reg: usize) -> PhysReg {
        match self.free_list.pop_front() {
            Some(preg) => preg,
            None => {
                self.dump_records();
                fatal(Fault::ResourceExhaustion {
                    pool_size: self.records.len(),
                    arch_reg,
                });
            }
        }
    }

    /// Dumps every live record, the diagnostic half of the exhaustion path.
    fn dump_records(&self) {
        error!("register allocator state: 0 free of {}", self.records.len());
        for (idx, slot) in self.records.iter().enumerate() {
            if let Some(rec) = slot {
                error!(
                    "  p{idx}: arch r{} producer {:?} consumers {} most_current {}",
                    rec.arch_reg, rec.producer, rec.pending_consumers, rec.most_current
                );
            }
        }
    }
}
