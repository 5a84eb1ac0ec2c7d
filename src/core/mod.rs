//! The out-of-order core model.
//!
//! Structure mirrors the hardware it models: the [`dispatch::Dispatcher`]
//! renames and admits instructions, the [`rob::ReorderBuffer`] drives the
//! per-cycle lifecycle and owns the [`lsq::LoadStoreQueue`] and
//! [`regalloc::RegisterAllocator`], and [`instruction::Instruction`] is the
//! record that flows through all of them.

pub mod dispatch;
pub mod instruction;
pub mod lsq;
pub mod regalloc;
pub mod rob;
