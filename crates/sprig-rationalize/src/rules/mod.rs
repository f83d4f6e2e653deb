//! Rewrite rules, one module per operator family.
//!
//! Each rule receives the use of the node being rewritten. When a rule
//! replaces the node it redirects the use, so the walk's bookkeeping sees the
//! replacement.

use sprig_ir::{NodeKind, Oper, Use};

use crate::context::RewriteContext;
use crate::errors::RationalizeResult;

pub(crate) mod address;
pub(crate) mod assign;
pub(crate) mod comma;
pub(crate) mod indir;
pub(crate) mod intrinsic;
pub(crate) mod misc;
pub(crate) mod simd;

pub(crate) fn dispatch(ctx: &mut RewriteContext<'_>, edge: &mut Use) -> RationalizeResult<()> {
    let node = edge.def();
    let simd_supported = ctx.config.simd_supported;
    match ctx.ir.node(node).oper() {
        Oper::Assign => assign::rewrite_assignment(ctx, edge)?,
        Oper::AddrOf => address::rewrite_address_of(ctx, edge),
        Oper::Ind => indir::rewrite_indir(ctx, edge),
        Oper::Blk | Oper::Obj | Oper::DynBlk => indir::rewrite_block(ctx, edge)?,
        Oper::Comma => comma::rewrite_comma(ctx, edge),
        Oper::Simd if simd_supported => simd::rewrite_simd(ctx, edge)?,
        Oper::LclFld if simd_supported && !is_assignment_target(ctx, edge) => {
            simd::fixup_simd_local(ctx, node)
        }
        Oper::ClsVar if ctx.config.explicit_static_reads => misc::rewrite_static_read(ctx, edge),
        Oper::Nop | Oper::Box => misc::rewrite_pass_through(ctx, edge),
        Oper::ArgPlace => ctx.remove(node),
        Oper::Qmark => misc::rewrite_qmark(ctx, edge)?,
        Oper::CnsInt | Oper::CnsDbl => misc::remove_dead_constant(ctx, edge),
        _ => {}
    }
    Ok(())
}

/// Whether `node` is the location written by the assignment using it.
pub(crate) fn is_assignment_target(ctx: &RewriteContext<'_>, edge: &Use) -> bool {
    match edge.user().map(|user| &ctx.ir.node(user).kind) {
        Some(NodeKind::Assign { target, .. }) => *target == edge.def(),
        _ => false,
    }
}
