//! Sprig method IR.
//!
//! A method is a list of basic blocks. Before rationalization each block holds
//! statement trees (HIR); afterwards it holds one linear, doubly linked range
//! of nodes in execution order (LIR). Both forms share the node arena in
//! [`MethodIr`].

// === Arena and handles ===
pub mod context;
pub mod refs;

// === Node model ===
pub mod flags;
pub mod node;
pub mod opcodes;
pub mod types;

// === Editing ===
pub mod builder;
pub mod range;
pub mod use_edge;

// === Text formats and checks ===
pub mod parser;
pub mod printer;
pub mod validation;

pub use context::{BlockData, FlowGraphOrder, MethodIr, Statement};
pub use flags::NodeFlags;
pub use node::{
    BinaryOp, BlkNode, CallNode, DynBlkNode, FieldListNode, HwIntrinsicNode, IntrinsicNode,
    LclFldNode, LclVarNode, LeaNode, ListNode, NodeData, NodeKind, ObjNode, Oper, PhiArgNode,
    SimdNode, UnaryOp,
};
pub use opcodes::{address_form_of, copy_flags, load_form_of, store_form_of};
pub use parser::{ParseError, parse_method, parse_test_method};
pub use printer::{print_hir, print_lir, print_tree};
pub use range::TreeRange;
pub use refs::{BlockRef, LayoutRef, LocalRef, NodeRef, StaticRef, StmtRef};
pub use types::{
    ClassLayout, FieldHandle, GcSlot, IlOffset, IntrinsicId, LocalVarDsc, SimdIntrinsic, VarType,
};
pub use use_edge::{Use, UseSite};
pub use validation::{ValidationResult, check_hir, check_lir, check_range};

pub use cranelift_entity::EntityRef;
pub use smallvec;
