//! Entity references for the method arena.
//!
//! Each ref type is a thin `u32` wrapper providing type-safe indexing
//! into `PrimaryMap` storage in `MethodIr`. The display prefixes double as
//! the spelling used by the textual HIR format (`V0`, `BB1`, `L0`, `S2`).

use cranelift_entity::entity_impl;

/// Reference to a node in the arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(u32);
entity_impl!(NodeRef, "n");

/// Reference to a statement.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtRef(u32);
entity_impl!(StmtRef, "stmt");

/// Reference to a basic block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockRef(u32);
entity_impl!(BlockRef, "BB");

/// Reference to an entry of the local variable table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalRef(u32);
entity_impl!(LocalRef, "V");

/// Reference to a class layout (size and GC slots of a struct type).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutRef(u32);
entity_impl!(LayoutRef, "L");

/// Reference to a static (class-level) storage slot.
///
/// Statics are opaque to the pass; there is no table behind this ref.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StaticRef(u32);
entity_impl!(StaticRef, "S");
