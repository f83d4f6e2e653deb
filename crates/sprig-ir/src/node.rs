//! Node model: operator tags, payloads, and per-node data.
//!
//! A node is a `NodeKind` (operator tag plus the payload that tag allows),
//! a result type, and a flag set. Operand references are `NodeRef`s into the
//! owning `MethodIr`. Nodes also carry `prev`/`next` links that thread them in
//! execution order, first within a statement and later within a block range.

use std::fmt;

use derive_more::Display;
use smallvec::{SmallVec, smallvec};

use crate::flags::NodeFlags;
use crate::refs::{BlockRef, LayoutRef, LocalRef, NodeRef, StaticRef};
use crate::types::{FieldHandle, IlOffset, IntrinsicId, SimdIntrinsic, VarType};

// ============================================================================
// Operators
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum UnaryOp {
    #[display("neg")]
    Neg,
    #[display("not")]
    Not,
    #[display("cast")]
    Cast,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum BinaryOp {
    #[display("add")]
    Add,
    #[display("sub")]
    Sub,
    #[display("mul")]
    Mul,
    #[display("div")]
    Div,
    #[display("mod")]
    Mod,
    #[display("and")]
    And,
    #[display("or")]
    Or,
    #[display("xor")]
    Xor,
    #[display("lsh")]
    Lsh,
    #[display("rsh")]
    Rsh,
    #[display("eq")]
    Eq,
    #[display("ne")]
    Ne,
    #[display("lt")]
    Lt,
    #[display("le")]
    Le,
    #[display("gt")]
    Gt,
    #[display("ge")]
    Ge,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 3] = [UnaryOp::Neg, UnaryOp::Not, UnaryOp::Cast];
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 16] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Mod,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Xor,
        BinaryOp::Lsh,
        BinaryOp::Rsh,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::Lt,
        BinaryOp::Le,
        BinaryOp::Gt,
        BinaryOp::Ge,
    ];

    pub fn is_compare(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// Integer division and remainder can raise.
    pub fn may_throw(self) -> bool {
        matches!(self, BinaryOp::Div | BinaryOp::Mod)
    }
}

/// Payload-free operator tag of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Oper {
    CnsInt,
    CnsDbl,
    LclVar,
    LclVarAddr,
    LclFld,
    LclFldAddr,
    StoreLclVar,
    StoreLclFld,
    ClsVar,
    ClsVarAddr,
    Nop,
    ArgPlace,
    List,
    FieldList,
    Unary(UnaryOp),
    Binary(BinaryOp),
    Assign,
    Comma,
    AddrOf,
    Ind,
    StoreInd,
    Blk,
    StoreBlk,
    Obj,
    StoreObj,
    DynBlk,
    StoreDynBlk,
    Call,
    Intrinsic,
    Simd,
    HwIntrinsic,
    Lea,
    Box,
    Qmark,
    Colon,
    Phi,
    PhiArg,
    Return,
    JTrue,
    IlOffset,
}

impl Oper {
    const NAMED: [(&'static str, Oper); 38] = [
        ("cns_int", Oper::CnsInt),
        ("cns_dbl", Oper::CnsDbl),
        ("lcl_var", Oper::LclVar),
        ("lcl_var_addr", Oper::LclVarAddr),
        ("lcl_fld", Oper::LclFld),
        ("lcl_fld_addr", Oper::LclFldAddr),
        ("store_lcl_var", Oper::StoreLclVar),
        ("store_lcl_fld", Oper::StoreLclFld),
        ("cls_var", Oper::ClsVar),
        ("cls_var_addr", Oper::ClsVarAddr),
        ("nop", Oper::Nop),
        ("arg_place", Oper::ArgPlace),
        ("list", Oper::List),
        ("field_list", Oper::FieldList),
        ("assign", Oper::Assign),
        ("comma", Oper::Comma),
        ("addr", Oper::AddrOf),
        ("ind", Oper::Ind),
        ("store_ind", Oper::StoreInd),
        ("blk", Oper::Blk),
        ("store_blk", Oper::StoreBlk),
        ("obj", Oper::Obj),
        ("store_obj", Oper::StoreObj),
        ("dyn_blk", Oper::DynBlk),
        ("store_dyn_blk", Oper::StoreDynBlk),
        ("call", Oper::Call),
        ("intrinsic", Oper::Intrinsic),
        ("simd", Oper::Simd),
        ("hw_intrinsic", Oper::HwIntrinsic),
        ("lea", Oper::Lea),
        ("box", Oper::Box),
        ("qmark", Oper::Qmark),
        ("colon", Oper::Colon),
        ("phi", Oper::Phi),
        ("phi_arg", Oper::PhiArg),
        ("return", Oper::Return),
        ("jtrue", Oper::JTrue),
        ("il_offset", Oper::IlOffset),
    ];

    pub fn from_name(name: &str) -> Option<Oper> {
        if let Some((_, oper)) = Self::NAMED.iter().find(|(n, _)| *n == name) {
            return Some(*oper);
        }
        if let Some(op) = UnaryOp::ALL.into_iter().find(|op| op.to_string() == name) {
            return Some(Oper::Unary(op));
        }
        BinaryOp::ALL
            .into_iter()
            .find(|op| op.to_string() == name)
            .map(Oper::Binary)
    }

    pub fn is_local_read(self) -> bool {
        matches!(self, Oper::LclVar | Oper::LclFld)
    }

    pub fn is_local_addr(self) -> bool {
        matches!(self, Oper::LclVarAddr | Oper::LclFldAddr)
    }

    pub fn is_store(self) -> bool {
        matches!(
            self,
            Oper::StoreLclVar
                | Oper::StoreLclFld
                | Oper::StoreInd
                | Oper::StoreBlk
                | Oper::StoreObj
                | Oper::StoreDynBlk
        )
    }

    pub fn is_block(self) -> bool {
        matches!(self, Oper::Blk | Oper::Obj | Oper::DynBlk)
    }

    pub fn is_any_list(self) -> bool {
        matches!(self, Oper::List | Oper::FieldList)
    }
}

impl fmt::Display for Oper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Oper::Unary(op) => write!(f, "{op}"),
            Oper::Binary(op) => write!(f, "{op}"),
            oper => {
                let (name, _) = Self::NAMED
                    .iter()
                    .find(|(_, o)| o == oper)
                    .ok_or(fmt::Error)?;
                f.write_str(name)
            }
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LclVarNode {
    pub local: LocalRef,
}

/// A field of a local at a byte offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LclFldNode {
    pub local: LocalRef,
    pub offset: u32,
    pub field_seq: Option<FieldHandle>,
}

/// One cell of a call argument list: `head` is the argument, `tail` the next cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListNode {
    pub head: NodeRef,
    pub tail: Option<NodeRef>,
}

/// One field of a struct passed in pieces. Only the head cell stays in LIR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldListNode {
    pub value: NodeRef,
    pub offset: u32,
    pub field_ty: VarType,
    pub rest: Option<NodeRef>,
    pub is_head: bool,
}

/// Fixed-size untyped memory block at `addr`. `data` is set on stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlkNode {
    pub addr: NodeRef,
    pub data: Option<NodeRef>,
    pub size: u32,
}

/// Struct-typed memory block whose layout tells the GC where references live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjNode {
    pub addr: NodeRef,
    pub data: Option<NodeRef>,
    pub layout: LayoutRef,
}

/// Memory block whose size is computed at run time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DynBlkNode {
    pub addr: NodeRef,
    pub data: Option<NodeRef>,
    pub size: NodeRef,
    pub eval_size_first: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallNode {
    pub method: String,
    /// Head of the argument `list` chain.
    pub args: Option<NodeRef>,
    /// Struct result returned in more than one register.
    pub multi_reg_ret: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntrinsicNode {
    pub id: IntrinsicId,
    pub op1: NodeRef,
    pub op2: Option<NodeRef>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimdNode {
    pub id: SimdIntrinsic,
    pub base_type: VarType,
    /// Vector width in bytes.
    pub size: u32,
    pub op1: NodeRef,
    pub op2: Option<NodeRef>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HwIntrinsicNode {
    pub name: String,
    pub op1: NodeRef,
    pub op2: Option<NodeRef>,
}

/// `base + index * scale + offset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeaNode {
    pub base: Option<NodeRef>,
    pub index: Option<NodeRef>,
    pub scale: u32,
    pub offset: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhiArgNode {
    pub local: LocalRef,
    pub pred: BlockRef,
}

// ============================================================================
// NodeKind
// ============================================================================

/// Operator tag together with its payload.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    CnsInt(i64),
    CnsDbl(f64),
    LclVar(LclVarNode),
    LclVarAddr(LclVarNode),
    LclFld(LclFldNode),
    LclFldAddr(LclFldNode),
    StoreLclVar { var: LclVarNode, value: NodeRef },
    StoreLclFld { fld: LclFldNode, value: NodeRef },
    ClsVar(StaticRef),
    ClsVarAddr(StaticRef),
    /// Scheduling placeholder, or a transparent wrapper around one operand.
    Nop(Option<NodeRef>),
    ArgPlace,
    List(ListNode),
    FieldList(FieldListNode),
    Unary { op: UnaryOp, operand: NodeRef },
    Binary { op: BinaryOp, op1: NodeRef, op2: NodeRef },
    Assign { target: NodeRef, value: NodeRef },
    /// Evaluate `first`, discard it, yield `second`.
    Comma { first: NodeRef, second: NodeRef },
    AddrOf(NodeRef),
    Ind(NodeRef),
    StoreInd { addr: NodeRef, value: NodeRef },
    Blk(BlkNode),
    StoreBlk(BlkNode),
    Obj(ObjNode),
    StoreObj(ObjNode),
    DynBlk(DynBlkNode),
    StoreDynBlk(DynBlkNode),
    Call(CallNode),
    Intrinsic(IntrinsicNode),
    Simd(SimdNode),
    HwIntrinsic(HwIntrinsicNode),
    Lea(LeaNode),
    Box(NodeRef),
    Qmark { cond: NodeRef, colon: NodeRef },
    Colon { then_value: NodeRef, else_value: NodeRef },
    Phi(SmallVec<[NodeRef; 4]>),
    PhiArg(PhiArgNode),
    Return(Option<NodeRef>),
    JTrue(NodeRef),
    IlOffset(IlOffset),
}

impl NodeKind {
    pub fn oper(&self) -> Oper {
        match self {
            NodeKind::CnsInt(_) => Oper::CnsInt,
            NodeKind::CnsDbl(_) => Oper::CnsDbl,
            NodeKind::LclVar(_) => Oper::LclVar,
            NodeKind::LclVarAddr(_) => Oper::LclVarAddr,
            NodeKind::LclFld(_) => Oper::LclFld,
            NodeKind::LclFldAddr(_) => Oper::LclFldAddr,
            NodeKind::StoreLclVar { .. } => Oper::StoreLclVar,
            NodeKind::StoreLclFld { .. } => Oper::StoreLclFld,
            NodeKind::ClsVar(_) => Oper::ClsVar,
            NodeKind::ClsVarAddr(_) => Oper::ClsVarAddr,
            NodeKind::Nop(_) => Oper::Nop,
            NodeKind::ArgPlace => Oper::ArgPlace,
            NodeKind::List(_) => Oper::List,
            NodeKind::FieldList(_) => Oper::FieldList,
            NodeKind::Unary { op, .. } => Oper::Unary(*op),
            NodeKind::Binary { op, .. } => Oper::Binary(*op),
            NodeKind::Assign { .. } => Oper::Assign,
            NodeKind::Comma { .. } => Oper::Comma,
            NodeKind::AddrOf(_) => Oper::AddrOf,
            NodeKind::Ind(_) => Oper::Ind,
            NodeKind::StoreInd { .. } => Oper::StoreInd,
            NodeKind::Blk(_) => Oper::Blk,
            NodeKind::StoreBlk(_) => Oper::StoreBlk,
            NodeKind::Obj(_) => Oper::Obj,
            NodeKind::StoreObj(_) => Oper::StoreObj,
            NodeKind::DynBlk(_) => Oper::DynBlk,
            NodeKind::StoreDynBlk(_) => Oper::StoreDynBlk,
            NodeKind::Call(_) => Oper::Call,
            NodeKind::Intrinsic(_) => Oper::Intrinsic,
            NodeKind::Simd(_) => Oper::Simd,
            NodeKind::HwIntrinsic(_) => Oper::HwIntrinsic,
            NodeKind::Lea(_) => Oper::Lea,
            NodeKind::Box(_) => Oper::Box,
            NodeKind::Qmark { .. } => Oper::Qmark,
            NodeKind::Colon { .. } => Oper::Colon,
            NodeKind::Phi(_) => Oper::Phi,
            NodeKind::PhiArg(_) => Oper::PhiArg,
            NodeKind::Return(_) => Oper::Return,
            NodeKind::JTrue(_) => Oper::JTrue,
            NodeKind::IlOffset(_) => Oper::IlOffset,
        }
    }

    /// Operands in canonical (left to right) order.
    pub fn operands(&self) -> SmallVec<[NodeRef; 4]> {
        match self {
            NodeKind::CnsInt(_)
            | NodeKind::CnsDbl(_)
            | NodeKind::LclVar(_)
            | NodeKind::LclVarAddr(_)
            | NodeKind::LclFld(_)
            | NodeKind::LclFldAddr(_)
            | NodeKind::ClsVar(_)
            | NodeKind::ClsVarAddr(_)
            | NodeKind::ArgPlace
            | NodeKind::PhiArg(_)
            | NodeKind::IlOffset(_) => SmallVec::new(),
            NodeKind::StoreLclVar { value, .. } | NodeKind::StoreLclFld { value, .. } => {
                smallvec![*value]
            }
            NodeKind::Nop(operand) | NodeKind::Return(operand) => operand.iter().copied().collect(),
            NodeKind::List(list) => std::iter::once(list.head).chain(list.tail).collect(),
            NodeKind::FieldList(list) => std::iter::once(list.value).chain(list.rest).collect(),
            NodeKind::Unary { operand, .. } => smallvec![*operand],
            NodeKind::Binary { op1, op2, .. } => smallvec![*op1, *op2],
            NodeKind::Assign { target, value } => smallvec![*target, *value],
            NodeKind::Comma { first, second } => smallvec![*first, *second],
            NodeKind::AddrOf(op)
            | NodeKind::Ind(op)
            | NodeKind::Box(op)
            | NodeKind::JTrue(op) => smallvec![*op],
            NodeKind::StoreInd { addr, value } => smallvec![*addr, *value],
            NodeKind::Blk(blk) | NodeKind::StoreBlk(blk) => {
                std::iter::once(blk.addr).chain(blk.data).collect()
            }
            NodeKind::Obj(obj) | NodeKind::StoreObj(obj) => {
                std::iter::once(obj.addr).chain(obj.data).collect()
            }
            NodeKind::DynBlk(blk) | NodeKind::StoreDynBlk(blk) => std::iter::once(blk.addr)
                .chain(blk.data)
                .chain(std::iter::once(blk.size))
                .collect(),
            NodeKind::Call(call) => call.args.iter().copied().collect(),
            NodeKind::Intrinsic(intrinsic) => std::iter::once(intrinsic.op1)
                .chain(intrinsic.op2)
                .collect(),
            NodeKind::Simd(simd) => std::iter::once(simd.op1).chain(simd.op2).collect(),
            NodeKind::HwIntrinsic(hw) => std::iter::once(hw.op1).chain(hw.op2).collect(),
            NodeKind::Lea(lea) => lea.base.into_iter().chain(lea.index).collect(),
            NodeKind::Qmark { cond, colon } => smallvec![*cond, *colon],
            NodeKind::Colon {
                then_value,
                else_value,
            } => smallvec![*then_value, *else_value],
            NodeKind::Phi(args) => args.clone(),
        }
    }

    /// Mutable operand slots, in the same order as [`NodeKind::operands`].
    pub fn operands_mut(&mut self) -> SmallVec<[&mut NodeRef; 4]> {
        match self {
            NodeKind::CnsInt(_)
            | NodeKind::CnsDbl(_)
            | NodeKind::LclVar(_)
            | NodeKind::LclVarAddr(_)
            | NodeKind::LclFld(_)
            | NodeKind::LclFldAddr(_)
            | NodeKind::ClsVar(_)
            | NodeKind::ClsVarAddr(_)
            | NodeKind::ArgPlace
            | NodeKind::PhiArg(_)
            | NodeKind::IlOffset(_) => SmallVec::new(),
            NodeKind::StoreLclVar { value, .. } | NodeKind::StoreLclFld { value, .. } => {
                smallvec![value]
            }
            NodeKind::Nop(operand) | NodeKind::Return(operand) => operand.iter_mut().collect(),
            NodeKind::List(list) => std::iter::once(&mut list.head)
                .chain(list.tail.as_mut())
                .collect(),
            NodeKind::FieldList(list) => std::iter::once(&mut list.value)
                .chain(list.rest.as_mut())
                .collect(),
            NodeKind::Unary { operand, .. } => smallvec![operand],
            NodeKind::Binary { op1, op2, .. } => smallvec![op1, op2],
            NodeKind::Assign { target, value } => smallvec![target, value],
            NodeKind::Comma { first, second } => smallvec![first, second],
            NodeKind::AddrOf(op)
            | NodeKind::Ind(op)
            | NodeKind::Box(op)
            | NodeKind::JTrue(op) => smallvec![op],
            NodeKind::StoreInd { addr, value } => smallvec![addr, value],
            NodeKind::Blk(blk) | NodeKind::StoreBlk(blk) => std::iter::once(&mut blk.addr)
                .chain(blk.data.as_mut())
                .collect(),
            NodeKind::Obj(obj) | NodeKind::StoreObj(obj) => std::iter::once(&mut obj.addr)
                .chain(obj.data.as_mut())
                .collect(),
            NodeKind::DynBlk(blk) | NodeKind::StoreDynBlk(blk) => std::iter::once(&mut blk.addr)
                .chain(blk.data.as_mut())
                .chain(std::iter::once(&mut blk.size))
                .collect(),
            NodeKind::Call(call) => call.args.iter_mut().collect(),
            NodeKind::Intrinsic(intrinsic) => std::iter::once(&mut intrinsic.op1)
                .chain(intrinsic.op2.as_mut())
                .collect(),
            NodeKind::Simd(simd) => std::iter::once(&mut simd.op1)
                .chain(simd.op2.as_mut())
                .collect(),
            NodeKind::HwIntrinsic(hw) => std::iter::once(&mut hw.op1)
                .chain(hw.op2.as_mut())
                .collect(),
            NodeKind::Lea(lea) => lea.base.iter_mut().chain(lea.index.iter_mut()).collect(),
            NodeKind::Qmark { cond, colon } => smallvec![cond, colon],
            NodeKind::Colon {
                then_value,
                else_value,
            } => smallvec![then_value, else_value],
            NodeKind::Phi(args) => args.iter_mut().collect(),
        }
    }

    /// Operands in the order they execute.
    ///
    /// `REVERSE_OPS` swaps the two operands of binary-shaped nodes. A dynamic
    /// block with `eval_size_first` evaluates its size before its address.
    pub fn operands_in_eval_order(&self, flags: NodeFlags) -> SmallVec<[NodeRef; 4]> {
        let mut operands = self.operands();
        match self {
            NodeKind::DynBlk(blk) | NodeKind::StoreDynBlk(blk) if blk.eval_size_first => {
                operands.rotate_right(1);
            }
            NodeKind::Binary { .. }
            | NodeKind::Assign { .. }
            | NodeKind::Comma { .. }
            | NodeKind::StoreInd { .. }
            | NodeKind::StoreBlk(_)
            | NodeKind::StoreObj(_)
            | NodeKind::Intrinsic(_)
            | NodeKind::Simd(_)
            | NodeKind::HwIntrinsic(_)
            | NodeKind::Lea(_)
                if flags.contains(NodeFlags::REVERSE_OPS) && operands.len() == 2 =>
            {
                operands.swap(0, 1);
            }
            _ => {}
        }
        operands
    }

    /// Point the operand slot holding `old` at `new`.
    ///
    /// Returns `false` if no slot holds `old`.
    pub fn replace_operand(&mut self, old: NodeRef, new: NodeRef) -> bool {
        match self.operands_mut().into_iter().find(|slot| **slot == old) {
            Some(slot) => {
                *slot = new;
                true
            }
            None => false,
        }
    }

    /// Switch to a different operator that shares this payload.
    ///
    /// Local field nodes may also become their whole-local counterparts; the
    /// offset and field sequence are dropped.
    ///
    /// # Panics
    ///
    /// Panics if `oper` does not carry the same payload as the current tag.
    pub fn retag(&mut self, oper: Oper) {
        let current = self.oper();
        let kind = std::mem::replace(self, NodeKind::ArgPlace);
        *self = match (kind, oper) {
            (NodeKind::LclVar(var) | NodeKind::LclVarAddr(var), Oper::LclVar) => {
                NodeKind::LclVar(var)
            }
            (NodeKind::LclVar(var) | NodeKind::LclVarAddr(var), Oper::LclVarAddr) => {
                NodeKind::LclVarAddr(var)
            }
            (NodeKind::LclFld(fld) | NodeKind::LclFldAddr(fld), Oper::LclFld) => {
                NodeKind::LclFld(fld)
            }
            (NodeKind::LclFld(fld) | NodeKind::LclFldAddr(fld), Oper::LclFldAddr) => {
                NodeKind::LclFldAddr(fld)
            }
            (NodeKind::ClsVar(slot) | NodeKind::ClsVarAddr(slot), Oper::ClsVarAddr) => {
                NodeKind::ClsVarAddr(slot)
            }
            (NodeKind::ClsVar(slot) | NodeKind::ClsVarAddr(slot), Oper::ClsVar) => {
                NodeKind::ClsVar(slot)
            }
            (NodeKind::Blk(blk) | NodeKind::StoreBlk(blk), Oper::StoreBlk) => {
                NodeKind::StoreBlk(blk)
            }
            (NodeKind::Blk(blk) | NodeKind::StoreBlk(blk), Oper::Blk) => NodeKind::Blk(blk),
            (NodeKind::Obj(obj) | NodeKind::StoreObj(obj), Oper::StoreObj) => {
                NodeKind::StoreObj(obj)
            }
            (NodeKind::Obj(obj) | NodeKind::StoreObj(obj), Oper::Obj) => NodeKind::Obj(obj),
            (NodeKind::DynBlk(blk) | NodeKind::StoreDynBlk(blk), Oper::StoreDynBlk) => {
                NodeKind::StoreDynBlk(blk)
            }
            (NodeKind::DynBlk(blk) | NodeKind::StoreDynBlk(blk), Oper::DynBlk) => {
                NodeKind::DynBlk(blk)
            }
            // A field read or store covering the whole local widens to the local.
            (NodeKind::LclFld(fld), Oper::LclVar) => NodeKind::LclVar(LclVarNode { local: fld.local }),
            (NodeKind::StoreLclFld { fld, value }, Oper::StoreLclVar) => NodeKind::StoreLclVar {
                var: LclVarNode { local: fld.local },
                value,
            },
            (_, oper) => panic!("retag: cannot convert {current} to {oper}"),
        };
    }

    /// The local a local-variable node refers to.
    pub fn local(&self) -> Option<LocalRef> {
        match self {
            NodeKind::LclVar(var)
            | NodeKind::LclVarAddr(var)
            | NodeKind::StoreLclVar { var, .. } => Some(var.local),
            NodeKind::LclFld(fld)
            | NodeKind::LclFldAddr(fld)
            | NodeKind::StoreLclFld { fld, .. } => Some(fld.local),
            NodeKind::PhiArg(arg) => Some(arg.local),
            _ => None,
        }
    }

    pub fn int_value(&self) -> Option<i64> {
        match self {
            NodeKind::CnsInt(value) => Some(*value),
            _ => None,
        }
    }
}

// ============================================================================
// NodeData
// ============================================================================

/// A node in the method arena.
#[derive(Clone, Debug)]
pub struct NodeData {
    pub kind: NodeKind,
    pub ty: VarType,
    pub flags: NodeFlags,
    pub(crate) prev: Option<NodeRef>,
    pub(crate) next: Option<NodeRef>,
    /// Block whose range currently holds this node.
    pub(crate) block: Option<BlockRef>,
    pub(crate) dead: bool,
}

impl NodeData {
    pub fn new(kind: NodeKind, ty: VarType, flags: NodeFlags) -> Self {
        Self {
            kind,
            ty,
            flags,
            prev: None,
            next: None,
            block: None,
            dead: false,
        }
    }

    pub fn oper(&self) -> Oper {
        self.kind.oper()
    }

    pub fn prev(&self) -> Option<NodeRef> {
        self.prev
    }

    pub fn next(&self) -> Option<NodeRef> {
        self.next
    }

    /// Block whose range holds this node, if any.
    pub fn block(&self) -> Option<BlockRef> {
        self.block
    }

    /// Whether the node was discarded by a range deletion.
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_local_read(&self) -> bool {
        self.oper().is_local_read()
    }

    pub fn is_store(&self) -> bool {
        self.oper().is_store()
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind, NodeKind::Call(_))
    }

    pub fn is_any_list(&self) -> bool {
        self.oper().is_any_list()
    }

    pub fn is_field_list_head(&self) -> bool {
        matches!(self.kind, NodeKind::FieldList(FieldListNode { is_head: true, .. }))
    }

    /// Whether the node produces a value that something may consume.
    pub fn is_value(&self) -> bool {
        if self.is_field_list_head() {
            return true;
        }
        if self.ty == VarType::Void || self.is_store() || self.is_any_list() {
            return false;
        }
        !matches!(
            self.kind,
            NodeKind::Assign { .. }
                | NodeKind::ArgPlace
                | NodeKind::Nop(None)
                | NodeKind::Return(_)
                | NodeKind::JTrue(_)
                | NodeKind::IlOffset(_)
        )
    }

    pub fn is_unused_value(&self) -> bool {
        self.flags.contains(NodeFlags::UNUSED_VALUE)
    }

    pub fn set_unused_value(&mut self) {
        self.flags.insert(NodeFlags::UNUSED_VALUE);
    }
}

#[cfg(test)]
mod tests {
    use cranelift_entity::EntityRef;

    use super::*;

    fn n(index: usize) -> NodeRef {
        NodeRef::new(index)
    }

    #[test]
    fn oper_names_round_trip() {
        for (name, oper) in Oper::NAMED {
            assert_eq!(oper.to_string(), name);
            assert_eq!(Oper::from_name(name), Some(oper));
        }
        assert_eq!(Oper::from_name("add"), Some(Oper::Binary(BinaryOp::Add)));
        assert_eq!(Oper::from_name("cast"), Some(Oper::Unary(UnaryOp::Cast)));
        assert_eq!(Oper::from_name("asg"), None);
    }

    #[test]
    fn reverse_ops_swaps_binary_operands() {
        let kind = NodeKind::Binary {
            op: BinaryOp::Sub,
            op1: n(1),
            op2: n(2),
        };
        assert_eq!(
            kind.operands_in_eval_order(NodeFlags::empty()).as_slice(),
            &[n(1), n(2)]
        );
        assert_eq!(
            kind.operands_in_eval_order(NodeFlags::REVERSE_OPS).as_slice(),
            &[n(2), n(1)]
        );
    }

    #[test]
    fn reverse_ops_ignored_on_unary_shapes() {
        let kind = NodeKind::Ind(n(3));
        assert_eq!(
            kind.operands_in_eval_order(NodeFlags::REVERSE_OPS).as_slice(),
            &[n(3)]
        );
    }

    #[test]
    fn dyn_blk_size_first() {
        let mut blk = DynBlkNode {
            addr: n(1),
            data: None,
            size: n(2),
            eval_size_first: true,
        };
        let kind = NodeKind::DynBlk(blk);
        assert_eq!(
            kind.operands_in_eval_order(NodeFlags::empty()).as_slice(),
            &[n(2), n(1)]
        );
        blk.eval_size_first = false;
        blk.data = Some(n(3));
        let kind = NodeKind::StoreDynBlk(blk);
        assert_eq!(
            kind.operands_in_eval_order(NodeFlags::empty()).as_slice(),
            &[n(1), n(3), n(2)]
        );
    }

    #[test]
    fn replace_operand_updates_matching_slot() {
        let mut kind = NodeKind::Assign {
            target: n(1),
            value: n(2),
        };
        assert!(kind.replace_operand(n(2), n(5)));
        assert_eq!(kind.operands().as_slice(), &[n(1), n(5)]);
        assert!(!kind.replace_operand(n(9), n(6)));
    }

    #[test]
    fn retag_keeps_payload() {
        let fld = LclFldNode {
            local: LocalRef::new(2),
            offset: 8,
            field_seq: Some(FieldHandle(4)),
        };
        let mut kind = NodeKind::LclFld(fld);
        kind.retag(Oper::LclFldAddr);
        assert_eq!(kind, NodeKind::LclFldAddr(fld));
        kind.retag(Oper::LclFld);
        assert_eq!(kind, NodeKind::LclFld(fld));
        kind.retag(Oper::LclVar);
        assert_eq!(
            kind,
            NodeKind::LclVar(LclVarNode {
                local: LocalRef::new(2)
            })
        );
    }

    #[test]
    #[should_panic(expected = "cannot convert lcl_var to store_blk")]
    fn retag_rejects_different_payloads() {
        let mut kind = NodeKind::LclVar(LclVarNode {
            local: LocalRef::new(0),
        });
        kind.retag(Oper::StoreBlk);
    }

    #[test]
    fn values_exclude_stores_and_lists() {
        let store = NodeData::new(
            NodeKind::StoreInd {
                addr: n(0),
                value: n(1),
            },
            VarType::Int,
            NodeFlags::ASG,
        );
        assert!(!store.is_value());
        let list = NodeData::new(
            NodeKind::List(ListNode {
                head: n(0),
                tail: None,
            }),
            VarType::Void,
            NodeFlags::empty(),
        );
        assert!(!list.is_value());
        let head = NodeData::new(
            NodeKind::FieldList(FieldListNode {
                value: n(0),
                offset: 0,
                field_ty: VarType::Int,
                rest: None,
                is_head: true,
            }),
            VarType::Struct,
            NodeFlags::empty(),
        );
        assert!(head.is_value());
        let cns = NodeData::new(NodeKind::CnsInt(3), VarType::Int, NodeFlags::empty());
        assert!(cns.is_value());
    }
}
