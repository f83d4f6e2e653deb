//! Intrinsics the target cannot expand become calls to their routines.

use smallvec::SmallVec;
use sprig_ir::{CallNode, NodeKind, NodeRef, Use};
use tracing::debug;

use crate::context::RewriteContext;
use crate::errors::{RationalizeErrorKind, RationalizeResult};

/// Replace the intrinsic at `edge` with a call to its library routine.
///
/// Runs before the intrinsic's operands are visited. The argument cells and
/// the call take the intrinsic's place at the end of its range, so the walk
/// then visits the call like any other.
pub(crate) fn rewrite_as_call(ctx: &mut RewriteContext<'_>, edge: &mut Use) -> RationalizeResult<()> {
    let node = edge.def();
    let data = ctx.ir.node(node);
    let NodeKind::Intrinsic(intrinsic) = data.kind else {
        return Ok(());
    };
    let ty = data.ty;

    let declared = intrinsic.id.routine_return_type(ctx.ir.node(intrinsic.op1).ty);
    if declared != ty {
        return Err(RationalizeErrorKind::IntrinsicTypeMismatch {
            node,
            expected: ty,
            actual: declared,
        }
        .into());
    }

    let operands: SmallVec<[NodeRef; 2]> =
        std::iter::once(intrinsic.op1).chain(intrinsic.op2).collect();
    let args = ctx.ir.arg_list(&operands);
    let call = ctx.ir.build(
        NodeKind::Call(CallNode {
            method: intrinsic.id.routine().to_string(),
            args,
            multi_reg_ret: false,
        }),
        declared,
    );

    // Cells run innermost first, like any sequenced list.
    let mut cells: SmallVec<[NodeRef; 3]> = SmallVec::new();
    let mut cursor = args;
    while let Some(cell) = cursor {
        cells.push(cell);
        cursor = match ctx.ir.node(cell).kind {
            NodeKind::List(list) => list.tail,
            _ => None,
        };
    }
    cells.reverse();
    cells.push(call);

    debug!("rewrite intrinsic {node} ({}) as call {call}", intrinsic.id);
    ctx.insert_before(node, &cells);
    ctx.remove(node);
    edge.replace_with(ctx.ir, call);
    Ok(())
}
