//! Assignments to typed stores.
//!
//! `assign(location, value)` becomes the store shaped for its location:
//!
//! | location                 | store                                     |
//! |--------------------------|-------------------------------------------|
//! | `lcl_var` of a struct    | `store_obj` / `store_blk` through `lcl_var_addr` |
//! | `lcl_var`, `lcl_fld`     | `store_lcl_var`, `store_lcl_fld`          |
//! | `ind(addr)`              | `store_ind(addr, value)`                  |
//! | `cls_var`                | `store_ind(cls_var_addr, value)`          |
//! | `blk`, `obj`, `dyn_blk`  | the matching block store                  |

use sprig_ir::{
    BlkNode, LclVarNode, NodeFlags, NodeKind, NodeRef, ObjNode, Oper, SimdIntrinsic,
    SimdNode, Use, VarType, copy_flags,
};
use tracing::debug;

use crate::context::RewriteContext;
use crate::errors::{RationalizeError, RationalizeResult};
use crate::rules::simd;

pub(crate) fn rewrite_assignment(
    ctx: &mut RewriteContext<'_>,
    edge: &mut Use,
) -> RationalizeResult<()> {
    let asg = edge.def();
    let NodeKind::Assign { target, value } = ctx.ir.node(asg).kind else {
        return Ok(());
    };

    if ctx.config.simd_supported {
        init_simd_local(ctx, asg, target, value);
    }
    // The broadcast may have replaced the value.
    let NodeKind::Assign { value, .. } = ctx.ir.node(asg).kind else {
        return Ok(());
    };

    let location = ctx.ir.node(target);
    match location.kind {
        NodeKind::LclVar(var) if is_struct_copy(ctx, target, value) => {
            store_struct_local(ctx, edge, target, var, value);
        }
        NodeKind::LclVar(var) => {
            let kind = NodeKind::StoreLclVar { var, value };
            store_local(ctx, asg, target, kind);
        }
        NodeKind::LclFld(fld) => {
            let kind = NodeKind::StoreLclFld { fld, value };
            store_local(ctx, asg, target, kind);
            if ctx.config.simd_supported {
                simd::fixup_simd_local(ctx, asg);
            }
        }
        NodeKind::Ind(addr) => store_indirect(ctx, edge, target, addr, value),
        NodeKind::ClsVar(_) => {
            debug!("rewrite {asg}: static store through {target}");
            let location = ctx.ir.node_mut(target);
            location.kind.retag(Oper::ClsVarAddr);
            location.ty = VarType::Byref;
            ctx.ir.node_mut(asg).kind = NodeKind::StoreInd {
                addr: target,
                value,
            };
        }
        NodeKind::Blk(_) | NodeKind::Obj(_) | NodeKind::DynBlk(_) => {
            store_block(ctx, edge, target, value)
        }
        _ => {
            return Err(RationalizeError::unexpected_assign_target(
                asg,
                location.oper(),
            ));
        }
    }
    Ok(())
}

/// Whole-struct copy into a struct local that needs a block store.
fn is_struct_copy(ctx: &RewriteContext<'_>, target: NodeRef, value: NodeRef) -> bool {
    if ctx.ir.node(target).ty != VarType::Struct {
        return false;
    }
    match &ctx.ir.node(value).kind {
        NodeKind::Call(call) => !call.multi_reg_ret,
        NodeKind::Phi(_) => false,
        _ => true,
    }
}

/// Broadcast a scalar assigned to a vector local.
fn init_simd_local(ctx: &mut RewriteContext<'_>, asg: NodeRef, target: NodeRef, value: NodeRef) {
    let location = ctx.ir.node(target);
    let NodeKind::LclVar(var) = location.kind else {
        return;
    };
    let ty = location.ty;
    let value_ty = ctx.ir.node(value).ty;
    if !ty.is_simd() || value_ty.is_simd() || value_ty == VarType::Struct {
        return;
    }
    let Some(base_type) = ctx.ir.local(var.local).simd_base else {
        return;
    };

    let kind = NodeKind::Simd(SimdNode {
        id: SimdIntrinsic::Init,
        base_type,
        size: ty.size(ctx.pointer_size()),
        op1: value,
        op2: None,
    });
    let init = ctx.ir.build(kind, ty);
    debug!("rewrite {asg}: broadcast {value} with {init}");
    ctx.insert_after(value, &[init]);
    ctx.ir.node_mut(asg).kind.replace_operand(value, init);
}

fn store_local(ctx: &mut RewriteContext<'_>, asg: NodeRef, target: NodeRef, kind: NodeKind) {
    debug!("rewrite {asg}: local store into {target}");
    let target_flags = ctx.ir.node(target).flags;
    let store = ctx.ir.node_mut(asg);
    store.kind = kind;
    copy_flags(&mut store.flags, target_flags, NodeFlags::LIVENESS_MASK);
    store.flags.remove(NodeFlags::REVERSE_OPS);
    ctx.remove(target);
}

fn store_struct_local(
    ctx: &mut RewriteContext<'_>,
    edge: &mut Use,
    target: NodeRef,
    var: LclVarNode,
    value: NodeRef,
) {
    let asg = edge.def();
    let local = ctx.ir.local(var.local);
    let layout = local.layout;
    let exact_size = local.exact_size;
    let value_flags = ctx.ir.node(value).flags;

    let location = ctx.ir.node_mut(target);
    location.kind.retag(Oper::LclVarAddr);
    location.ty = VarType::Byref;
    let effects = (location.flags | value_flags).effects();

    let kind = match layout {
        Some(layout) if ctx.ir.layout(layout).has_gc_ptrs() => NodeKind::StoreObj(ObjNode {
            addr: target,
            data: Some(value),
            layout,
        }),
        _ => {
            let size = exact_size
                .or_else(|| layout.map(|layout| ctx.ir.layout(layout).size))
                .unwrap_or_default();
            NodeKind::StoreBlk(BlkNode {
                addr: target,
                data: Some(value),
                size,
            })
        }
    };
    let store = ctx
        .ir
        .create_node(kind, VarType::Struct, NodeFlags::ASG | effects);
    debug!("rewrite {asg}: struct copy into {target} as {store}");
    ctx.insert_before(asg, &[store]);
    edge.replace_with(ctx.ir, store);
    ctx.remove(asg);
}

fn store_indirect(
    ctx: &mut RewriteContext<'_>,
    edge: &mut Use,
    target: NodeRef,
    addr: NodeRef,
    value: NodeRef,
) {
    let asg = edge.def();
    let location = ctx.ir.node(target);
    let ty = location.ty;
    let mut flags = NodeFlags::empty();
    copy_flags(&mut flags, ctx.ir.node(asg).flags, NodeFlags::ALL_EFFECT);
    copy_flags(&mut flags, location.flags, NodeFlags::IND_FLAGS);

    let store = ctx
        .ir
        .create_node(NodeKind::StoreInd { addr, value }, ty, flags);
    debug!("rewrite {asg}: indirect store {store}");
    ctx.remove(target);
    ctx.insert_before(asg, &[store]);
    ctx.remove(asg);
    edge.replace_with(ctx.ir, store);
}

fn store_block(ctx: &mut RewriteContext<'_>, edge: &mut Use, target: NodeRef, value: NodeRef) {
    let asg = edge.def();
    let asg_flags = ctx.ir.node(asg).flags;

    let block = ctx.ir.node_mut(target);
    match &mut block.kind {
        NodeKind::Blk(blk) => blk.data = Some(value),
        NodeKind::Obj(obj) => obj.data = Some(value),
        NodeKind::DynBlk(blk) => {
            blk.data = Some(value);
            blk.eval_size_first = false;
        }
        _ => {}
    }
    let store_oper = match block.oper() {
        Oper::Blk => Oper::StoreBlk,
        Oper::Obj => Oper::StoreObj,
        _ => Oper::StoreDynBlk,
    };
    block.kind.retag(store_oper);
    block.flags.remove(NodeFlags::DONT_CSE);
    block.flags |= asg_flags & (NodeFlags::ALL_EFFECT | NodeFlags::IND_FLAGS | NodeFlags::DONT_CSE);

    debug!("rewrite {asg}: block store {target}");
    ctx.move_before(asg, target);
    ctx.remove(asg);
    edge.replace_with(ctx.ir, target);
}
