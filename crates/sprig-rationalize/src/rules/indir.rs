//! Indirections and struct-sized memory blocks.

use sprig_ir::{BinaryOp, NodeFlags, NodeKind, Oper, Use, VarType};
use tracing::debug;

use crate::context::RewriteContext;
use crate::errors::{RationalizeErrorKind, RationalizeResult};
use crate::rules::{is_assignment_target, simd};

/// Rewrite a plain `ind`.
///
/// Vector loads go through [`simd::rewrite_simd_operand`]. A load of a whole
/// local through `lcl_var_addr + 0` becomes a read of the local.
pub(crate) fn rewrite_indir(ctx: &mut RewriteContext<'_>, edge: &mut Use) {
    let ind = edge.def();
    // Register allocation reads this bit as "address in a register".
    ctx.ir.node_mut(ind).flags.remove(NodeFlags::IND_ASG_LHS);
    if is_assignment_target(ctx, edge) {
        return;
    }

    let ty = ctx.ir.node(ind).ty;
    if ty.is_simd() && ctx.config.simd_supported {
        simd::rewrite_simd_operand(ctx, edge, false);
        return;
    }

    let NodeKind::Ind(addr) = ctx.ir.node(ind).kind else {
        return;
    };
    let NodeKind::Binary {
        op: BinaryOp::Add,
        op1: base,
        op2: offset,
    } = ctx.ir.node(addr).kind
    else {
        return;
    };
    let NodeKind::LclVarAddr(var) = ctx.ir.node(base).kind else {
        return;
    };
    if ctx.ir.node(offset).kind.int_value() != Some(0) || ctx.ir.local(var.local).ty != ty {
        return;
    }

    debug!("fold {ind}: read of local {} through its address", var.local);
    let local = ctx.ir.node_mut(base);
    local.kind.retag(Oper::LclVar);
    local.ty = ty;
    edge.replace_with(ctx.ir, base);
    ctx.remove(offset);
    ctx.remove(addr);
    ctx.remove(ind);
}

/// Check a `blk`, `obj` or `dyn_blk` that is not becoming a store.
///
/// Outside of assignments these only produce struct values. A block written
/// by an assignment must not be given a scalar.
pub(crate) fn rewrite_block(ctx: &mut RewriteContext<'_>, edge: &mut Use) -> RationalizeResult<()> {
    let node = edge.def();
    let data = ctx.ir.node(node);
    let ty = data.ty;
    let oper = data.oper();

    let is_target = is_assignment_target(ctx, edge);
    if ty != VarType::Struct && is_target {
        let value_ty = match edge.user().map(|user| &ctx.ir.node(user).kind) {
            Some(NodeKind::Assign { value, .. }) => ctx.ir.node(*value).ty,
            _ => ty,
        };
        if value_ty != VarType::Struct && !value_ty.is_simd() {
            return Err(RationalizeErrorKind::InvalidBlock { node, ty: value_ty }.into());
        }
    }

    if oper != Oper::Blk && ty.is_simd() && ctx.config.simd_supported {
        // A vector `obj` read is a plain vector load.
        let keep_blk = oper == Oper::DynBlk || is_target;
        simd::rewrite_simd_operand(ctx, edge, keep_blk);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use sprig_ir::{NodeFlags, Oper};

    use crate::TargetConfig;
    use crate::errors::RationalizeErrorKind;
    use crate::tests::{lower, lower_with, stmt_root, try_lower};

    #[test]
    fn zero_offset_local_address_folds_to_read() {
        let lir = lower(
            "(method
               (local V0 long)
               (block BB0 (stmt (return (ind:long (add:byref (lcl_var_addr V0) (cns_int:int 0)))))))",
        );
        insta::assert_snapshot!(lir, @r"
        BB0:
          t0 = lcl_var.long V0
          return.void t0
        ");
    }

    #[test]
    fn mismatched_type_is_not_folded() {
        let lir = lower(
            "(method
               (local V0 long)
               (block BB0 (stmt (return (ind:int (add:byref (lcl_var_addr V0) (cns_int:int 0)))))))",
        );
        insta::assert_snapshot!(lir, @r"
        BB0:
          t0 = lcl_var_addr.byref V0
          t1 = cns_int.int 0
          t2 = add.byref t0 t1
          t3 = ind.int t2
          return.void t3
        ");
    }

    #[test]
    fn assignment_lhs_flag_is_cleared() {
        let (ir, _) = lower_with(
            "(method (block BB0 (stmt (return (ind:int !asg_lhs (cns_int:int_ptr 8))))))",
            &TargetConfig::new(8),
        );
        let ret = stmt_root(&ir, 0);
        let block = ir.blocks().next().expect("block");
        let ind = ir.range_operands(block, ret)[0];
        assert_eq!(ir.node(ind).oper(), Oper::Ind);
        assert!(!ir.node(ind).flags.contains(NodeFlags::NODE_MEANS_REG));
    }

    #[test]
    fn scalar_block_initialized_from_scalar_is_rejected() {
        let err = try_lower(
            "(method (layout L0 4) (block BB0 (stmt (assign (obj:int L0 (cns_int:int_ptr 8)) (cns_int:int 0)))))",
            &TargetConfig::new(8),
        )
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            RationalizeErrorKind::InvalidBlock {
                ty: sprig_ir::VarType::Int,
                ..
            }
        ));
    }
}
