//! Text dumps of a method.
//!
//! [`print_hir`] writes the s-expression format read by [`crate::parser`]:
//!
//! ```text
//! (method
//!   (local V0 int)
//!   (block BB0
//!     (stmt 0x10 (assign:int (lcl_var:int !def V0) (cns_int:int 5)))))
//! ```
//!
//! [`print_lir`] writes each block's range, one node per line, naming every
//! value node `tN`:
//!
//! ```text
//! BB0:
//!   il_offset.void 0x10
//!   t0 = cns_int.int 5
//!   store_lcl_var.int V0 t0
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;

use crate::context::MethodIr;
use crate::flags::NodeFlags;
use crate::node::NodeKind;
use crate::refs::{BlockRef, NodeRef};

/// Print the whole method in the textual HIR format.
pub fn print_hir(ir: &MethodIr) -> String {
    let mut out = String::new();
    write_method(ir, &mut out).expect("fmt::Write to String never fails");
    out
}

/// Print one statement tree in the textual HIR format.
pub fn print_tree(ir: &MethodIr, root: NodeRef) -> String {
    let mut out = String::new();
    write_tree(ir, &mut out, root).expect("fmt::Write to String never fails");
    out
}

/// Print the linear range of every block.
pub fn print_lir(ir: &MethodIr) -> String {
    let mut state = LirState::new(ir);
    let mut out = String::new();
    for block in ir.blocks() {
        state
            .write_block(&mut out, block)
            .expect("fmt::Write to String never fails");
    }
    out
}

// ============================================================================
// HIR
// ============================================================================

fn write_method(ir: &MethodIr, f: &mut impl Write) -> fmt::Result {
    f.write_str("(method")?;
    for (layout, data) in ir.layouts() {
        write!(f, "\n  (layout {layout} {}", data.size)?;
        if !data.gc_slots.is_empty() {
            f.write_str(" (gc")?;
            for slot in &data.gc_slots {
                write!(f, " {slot}")?;
            }
            f.write_str(")")?;
        }
        f.write_str(")")?;
    }
    for (local, data) in ir.locals() {
        write!(f, "\n  (local {local} {}", data.ty)?;
        if let Some(layout) = data.layout {
            write!(f, " {layout}")?;
        }
        if let Some(base) = data.simd_base {
            write!(f, " {base}")?;
        }
        f.write_str(")")?;
    }
    for block in ir.blocks() {
        write!(f, "\n  (block {block}")?;
        for &stmt in &ir.block(block).stmts {
            let stmt = ir.stmt(stmt);
            f.write_str("\n    (stmt ")?;
            if let Some(offset) = stmt.il_offset {
                write!(f, "{offset} ")?;
            }
            write_tree(ir, f, stmt.root)?;
            f.write_str(")")?;
        }
        f.write_str(")")?;
    }
    f.write_str(")\n")
}

fn write_tree(ir: &MethodIr, f: &mut impl Write, node: NodeRef) -> fmt::Result {
    let data = ir.node(node);
    write!(f, "({}:{}", data.oper(), data.ty)?;
    let implied = ir.implied_effects(&data.kind);
    write_flags(f, data.flags.difference(implied))?;
    write_payload(f, &data.kind)?;
    match &data.kind {
        NodeKind::Call(call) => {
            for arg in ir.list_items(call.args) {
                f.write_char(' ')?;
                write_tree(ir, f, arg)?;
            }
        }
        NodeKind::Lea(lea) => {
            for operand in [lea.base, lea.index] {
                match operand {
                    Some(operand) => {
                        f.write_char(' ')?;
                        write_tree(ir, f, operand)?;
                    }
                    None => f.write_str(" _")?,
                }
            }
        }
        kind => {
            for operand in kind.operands() {
                f.write_char(' ')?;
                write_tree(ir, f, operand)?;
            }
        }
    }
    f.write_char(')')
}

// ============================================================================
// Shared pieces
// ============================================================================

fn write_flags(f: &mut impl Write, flags: NodeFlags) -> fmt::Result {
    for name in flags.names() {
        write!(f, " !{name}")?;
    }
    Ok(())
}

/// Operator-specific fields, each preceded by a space.
fn write_payload(f: &mut impl Write, kind: &NodeKind) -> fmt::Result {
    match kind {
        NodeKind::CnsInt(value) => write!(f, " {value}"),
        NodeKind::CnsDbl(value) => write!(f, " {value:?}"),
        NodeKind::LclVar(var) | NodeKind::LclVarAddr(var) | NodeKind::StoreLclVar { var, .. } => {
            write!(f, " {}", var.local)
        }
        NodeKind::LclFld(fld) | NodeKind::LclFldAddr(fld) | NodeKind::StoreLclFld { fld, .. } => {
            write!(f, " {} {}", fld.local, fld.offset)?;
            if let Some(field) = fld.field_seq {
                write!(f, " {field}")?;
            }
            Ok(())
        }
        NodeKind::ClsVar(slot) | NodeKind::ClsVarAddr(slot) => write!(f, " {slot}"),
        NodeKind::FieldList(list) => {
            write!(f, " {} {}", list.offset, list.field_ty)?;
            if list.is_head {
                f.write_str(" head")?;
            }
            Ok(())
        }
        NodeKind::Blk(blk) | NodeKind::StoreBlk(blk) => write!(f, " {}", blk.size),
        NodeKind::Obj(obj) | NodeKind::StoreObj(obj) => write!(f, " {}", obj.layout),
        NodeKind::DynBlk(blk) | NodeKind::StoreDynBlk(blk) if blk.eval_size_first => {
            f.write_str(" size_first")
        }
        NodeKind::Call(call) => {
            write!(f, " \"{}\"", call.method)?;
            if call.multi_reg_ret {
                f.write_str(" multi_reg")?;
            }
            Ok(())
        }
        NodeKind::Intrinsic(intrinsic) => write!(f, " {}", intrinsic.id),
        NodeKind::Simd(simd) => write!(f, " {} {} {}", simd.id, simd.base_type, simd.size),
        NodeKind::HwIntrinsic(hw) => write!(f, " \"{}\"", hw.name),
        NodeKind::Lea(lea) => write!(f, " {} {}", lea.scale, lea.offset),
        NodeKind::PhiArg(arg) => write!(f, " {} {}", arg.local, arg.pred),
        NodeKind::IlOffset(offset) => write!(f, " {offset}"),
        _ => Ok(()),
    }
}

// ============================================================================
// LIR
// ============================================================================

/// Value numbering for the LIR dump.
struct LirState<'a> {
    ir: &'a MethodIr,
    value_names: HashMap<NodeRef, String>,
    next_value_num: usize,
}

impl<'a> LirState<'a> {
    fn new(ir: &'a MethodIr) -> Self {
        Self {
            ir,
            value_names: HashMap::new(),
            next_value_num: 0,
        }
    }

    fn assign_value_name(&mut self, node: NodeRef) -> String {
        let name = format!("t{}", self.next_value_num);
        self.next_value_num += 1;
        self.value_names.insert(node, name.clone());
        name
    }

    fn write_operand_name(&self, f: &mut impl Write, node: NodeRef) -> fmt::Result {
        match self.value_names.get(&node) {
            Some(name) => f.write_str(name),
            // Not (yet) defined in the range.
            None => write!(f, "{node}?"),
        }
    }

    fn write_block(&mut self, f: &mut impl Write, block: BlockRef) -> fmt::Result {
        writeln!(f, "{block}:")?;
        let nodes: Vec<_> = self.ir.range_nodes(block).collect();
        for node in nodes {
            self.write_node(f, block, node)?;
        }
        Ok(())
    }

    fn write_node(&mut self, f: &mut impl Write, block: BlockRef, node: NodeRef) -> fmt::Result {
        let ir = self.ir;
        let data = ir.node(node);
        f.write_str("  ")?;
        if data.is_value() {
            let name = self.assign_value_name(node);
            write!(f, "{name} = ")?;
        }
        write!(f, "{}.{}", data.oper(), data.ty)?;
        write_payload(f, &data.kind)?;
        if let NodeKind::Lea(lea) = &data.kind {
            for operand in [lea.base, lea.index] {
                f.write_char(' ')?;
                match operand {
                    Some(operand) => self.write_operand_name(f, operand)?,
                    None => f.write_char('_')?,
                }
            }
        } else {
            for operand in ir.range_operands(block, node) {
                f.write_char(' ')?;
                self.write_operand_name(f, operand)?;
            }
        }
        write_flags(f, data.flags.difference(NodeFlags::ALL_EFFECT))?;
        f.write_char('\n')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::BinaryOp;
    use crate::types::{ClassLayout, GcSlot, IlOffset, LocalVarDsc, VarType};

    #[test]
    fn test_print_hir_method() {
        let mut ir = MethodIr::new();
        let layout = ir.add_layout(ClassLayout::new(16, vec![GcSlot::Ref, GcSlot::None]));
        let x = ir.add_local(LocalVarDsc::new(VarType::Int));
        ir.add_struct_local(layout);
        let block = ir.create_block();
        let five = ir.cns_int(VarType::Int, 5);
        let target = ir.lcl_var(x);
        let asg = ir.assign(target, five);
        ir.append_statement(block, asg, Some(IlOffset(0x10)));
        ir.create_block();

        insta::assert_snapshot!(print_hir(&ir), @r"
        (method
          (layout L0 16 (gc ref none))
          (local V0 int)
          (local V1 struct L0)
          (block BB0
            (stmt 0x10 (assign:int (lcl_var:int !def V0) (cns_int:int 5))))
          (block BB1))
        ");
    }

    #[test]
    fn test_print_tree_hides_implied_effects() {
        let mut ir = MethodIr::new();
        let addr = ir.cns_int(VarType::IntPtr, 64);
        let ind = ir.ind(VarType::Int, addr);
        ir.node_mut(ind).flags.insert(NodeFlags::IND_VOLATILE);
        let call = ir.call("Helper", VarType::Int, &[ind]);
        ir.node_mut(call).flags.insert(NodeFlags::REVERSE_OPS);

        assert_eq!(
            print_tree(&ir, call),
            "(call:int !rev \"Helper\" (ind:int !volatile (cns_int:int_ptr 64)))"
        );
    }

    #[test]
    fn test_print_lir_names_values() {
        let mut ir = MethodIr::new();
        let block = ir.create_block();
        let a = ir.cns_int(VarType::Int, 1);
        let b = ir.cns_int(VarType::Int, 2);
        let add = ir.binary(BinaryOp::Add, VarType::Int, a, b);
        let ret = ir.ret(Some(add));
        for node in [a, b, add, ret] {
            ir.push_back(block, node);
        }
        ir.node_mut(b).set_unused_value();

        insta::assert_snapshot!(print_lir(&ir), @r"
        BB0:
          t0 = cns_int.int 1
          t1 = cns_int.int 2 !unused
          t2 = add.int t0 t1
          return.void t2
        ");
    }
}
