//! Post-order walk over one statement tree.
//!
//! Operands are visited in evaluation order, so the walk meets nodes in the
//! order they sit in the range. Each visit returns the effect summary of the
//! subtree now occupying its use, which the parent ORs into its own flags
//! before it is rewritten.

use sprig_ir::{NodeFlags, NodeKind, Use};
use tracing::trace;

use crate::context::RewriteContext;
use crate::errors::RationalizeResult;
use crate::rules;

/// Rewrite the current statement's tree in place within the block's range.
pub(crate) fn rewrite_statement(ctx: &mut RewriteContext<'_>) -> RationalizeResult<()> {
    let root = ctx.ir.stmt(ctx.stmt).root;
    let mut edge = Use::dummy(ctx.stmt, root);
    visit(ctx, &mut edge)?;
    Ok(())
}

fn visit(ctx: &mut RewriteContext<'_>, edge: &mut Use) -> RationalizeResult<NodeFlags> {
    if let NodeKind::Intrinsic(intrinsic) = &ctx.ir.node(edge.def()).kind {
        if !ctx.config.is_intrinsic_native(intrinsic.id) {
            rules::intrinsic::rewrite_as_call(ctx, edge)?;
        }
    }

    let node = edge.def();
    let data = ctx.ir.node(node);
    let mut effects = NodeFlags::empty();
    for operand in data.kind.operands_in_eval_order(data.flags) {
        let mut child = Use::operand(node, operand);
        effects |= visit(ctx, &mut child)?;
    }
    ctx.ir.node_mut(node).flags |= effects;

    trace!("visit {node} ({})", ctx.ir.node(node).oper());
    rewrite_node(ctx, edge)?;

    let def = ctx.ir.node(edge.def());
    Ok(if def.is_dead() {
        NodeFlags::empty()
    } else {
        def.flags.effects()
    })
}

fn rewrite_node(ctx: &mut RewriteContext<'_>, edge: &mut Use) -> RationalizeResult<()> {
    let node = edge.def();

    // List cells are bookkeeping for the tree form; only field list heads
    // survive into the range.
    while let Some(prev) = ctx.ir.node(node).prev() {
        let prev_data = ctx.ir.node(prev);
        if !prev_data.is_any_list() || prev_data.is_field_list_head() {
            break;
        }
        ctx.remove(prev);
    }

    // The range now fixes the order.
    ctx.ir.node_mut(node).flags.remove(NodeFlags::REVERSE_OPS);

    let data = ctx.ir.node(node);
    if data.is_any_list() {
        if !data.is_field_list_head() && ctx.in_range(node) {
            ctx.remove(node);
        }
        return Ok(());
    }

    rules::dispatch(ctx, edge)?;
    finish_use(ctx, edge);
    Ok(())
}

/// Bookkeeping for whatever node occupies the use once its rule has run.
fn finish_use(ctx: &mut RewriteContext<'_>, edge: &Use) {
    let def = edge.def();
    if ctx.ir.node(def).is_dead() || !ctx.in_range(def) {
        return;
    }

    if ctx.ir.node(def).is_local_read() {
        if edge.is_dummy_use() {
            trace!("remove discarded local read {def}");
            ctx.remove(def);
        } else {
            ctx.ir.node_mut(def).flags.remove(NodeFlags::ALL_EFFECT);
        }
        return;
    }

    let data = ctx.ir.node_mut(def);
    if !data.is_store() {
        data.flags.remove(NodeFlags::ASG);
    }
    if !data.is_call() {
        data.flags.remove(NodeFlags::CALL);
    }
    if data.is_value() && edge.is_dummy_use() {
        data.set_unused_value();
    }
    if data.ty == sprig_ir::VarType::Long {
        ctx.ir.long_used = true;
    }
}
