//! `addr` folding.

use sprig_ir::{NodeFlags, NodeKind, Oper, Use, VarType, address_form_of, copy_flags};
use tracing::debug;

use crate::context::RewriteContext;

/// Fold `addr` into the location it takes the address of.
///
/// Local and static reads become their address forms, and `addr(ind(p))`
/// collapses to `p`. Addresses of anything else stay for lowering.
pub(crate) fn rewrite_address_of(ctx: &mut RewriteContext<'_>, edge: &mut Use) {
    let addr = edge.def();
    let NodeKind::AddrOf(location) = ctx.ir.node(addr).kind else {
        return;
    };
    let addr_flags = ctx.ir.node(addr).flags;

    let inner = ctx.ir.node(location);
    let address_oper = match inner.kind {
        NodeKind::LclVar(_) | NodeKind::LclFld(_) => address_form_of(inner.oper()),
        NodeKind::ClsVar(_) => Oper::ClsVarAddr,
        NodeKind::Ind(pointer) => {
            debug!("fold addr {addr} of indirection {location}");
            ctx.remove(location);
            ctx.remove(addr);
            edge.replace_with(ctx.ir, pointer);
            return;
        }
        _ => return,
    };

    debug!("fold addr {addr} into {location} as {address_oper}");
    let data = ctx.ir.node_mut(location);
    data.kind.retag(address_oper);
    data.ty = VarType::Byref;
    copy_flags(&mut data.flags, addr_flags, NodeFlags::ALL_EFFECT);
    edge.replace_with(ctx.ir, location);
    ctx.remove(addr);
}
