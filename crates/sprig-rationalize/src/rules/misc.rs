//! Transparent wrappers, boolean qmarks, discarded constants and static reads.

use sprig_ir::{NodeFlags, NodeKind, Oper, Use, VarType};
use tracing::debug;

use crate::context::RewriteContext;
use crate::errors::{RationalizeErrorKind, RationalizeResult};
use crate::rules::is_assignment_target;

/// `nop(x)` and `box(x)` are `x`.
pub(crate) fn rewrite_pass_through(ctx: &mut RewriteContext<'_>, edge: &mut Use) {
    let node = edge.def();
    let operand = match ctx.ir.node(node).kind {
        NodeKind::Nop(Some(operand)) | NodeKind::Box(operand) => operand,
        _ => return,
    };
    debug!("drop wrapper {node} around {operand}");
    edge.replace_with(ctx.ir, operand);
    ctx.remove(node);
}

/// Collapse `qmark(cond, colon(1, 0))` to `cond`.
///
/// Every other qmark should have been expanded into control flow already.
pub(crate) fn rewrite_qmark(ctx: &mut RewriteContext<'_>, edge: &mut Use) -> RationalizeResult<()> {
    let qmark = edge.def();
    let NodeKind::Qmark { cond, colon } = ctx.ir.node(qmark).kind else {
        return Ok(());
    };
    let NodeKind::Colon {
        then_value,
        else_value,
    } = ctx.ir.node(colon).kind
    else {
        return Err(RationalizeErrorKind::UnexpectedQmark(qmark).into());
    };
    let is_boolean = ctx.ir.node(then_value).kind.int_value() == Some(1)
        && ctx.ir.node(else_value).kind.int_value() == Some(0);
    if !is_boolean {
        return Err(RationalizeErrorKind::UnexpectedQmark(qmark).into());
    }

    debug!("collapse boolean qmark {qmark} to {cond}");
    for node in [else_value, then_value, colon, qmark] {
        ctx.remove(node);
    }
    ctx.ir.node_mut(cond).flags.remove(NodeFlags::RELOP_QMARK);
    edge.replace_with(ctx.ir, cond);
    Ok(())
}

/// A constant whose value nobody reads has nothing left to do.
pub(crate) fn remove_dead_constant(ctx: &mut RewriteContext<'_>, edge: &Use) {
    let node = edge.def();
    if edge.is_dummy_use() && ctx.ir.node(node).flags.effects().is_empty() {
        debug!("remove discarded constant {node}");
        ctx.remove(node);
    }
}

/// Read a static through its address: `cls_var` becomes
/// `ind(cls_var_addr)`.
///
/// Static slots that are written or whose address is taken stay as they are
/// for the assignment and `addr` rules.
pub(crate) fn rewrite_static_read(ctx: &mut RewriteContext<'_>, edge: &mut Use) {
    let node = edge.def();
    if is_assignment_target(ctx, edge) {
        return;
    }
    if let Some(user) = edge.user() {
        if ctx.ir.node(user).oper() == Oper::AddrOf {
            return;
        }
    }

    let slot = ctx.ir.node_mut(node);
    let ty = slot.ty;
    let flags = slot.flags.effects();
    slot.kind.retag(Oper::ClsVarAddr);
    slot.ty = VarType::Byref;
    let load = ctx.ir.create_node(NodeKind::Ind(node), ty, flags);
    debug!("rewrite static read {node} as load {load}");
    ctx.insert_after(node, &[load]);
    edge.replace_with(ctx.ir, load);
}
