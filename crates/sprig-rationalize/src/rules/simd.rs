//! Vector operands, vector nodes and vector locals.
//!
//! Only used on targets with SIMD support.

use sprig_ir::{
    LeaNode, NodeFlags, NodeKind, NodeRef, Oper, SimdIntrinsic, Use, VarType, load_form_of,
};
use tracing::debug;

use crate::context::RewriteContext;
use crate::errors::{RationalizeError, RationalizeResult};

/// Bytes between an array reference and its first element: the method table
/// pointer and the length, one pointer each.
fn array_data_offset(pointer_size: u32) -> i32 {
    2 * pointer_size as i32
}

/// Normalize a vector-typed indirection.
///
/// A load through the address of a vector local becomes a read of the local,
/// and a load through `addr` of a vector-producing node becomes that node.
/// Otherwise the indirection is retyped as a plain vector load unless
/// `keep_blk` asks to keep its block shape.
pub(crate) fn rewrite_simd_operand(ctx: &mut RewriteContext<'_>, edge: &mut Use, keep_blk: bool) {
    let indir = edge.def();
    let data = ctx.ir.node(indir);
    let ty = data.ty;
    if !ty.is_simd() {
        return;
    }
    let addr = match data.kind {
        NodeKind::Ind(addr) => addr,
        NodeKind::Obj(obj) => obj.addr,
        NodeKind::DynBlk(blk) => blk.addr,
        _ => return,
    };

    let address = ctx.ir.node(addr);
    match address.kind {
        NodeKind::LclVarAddr(_) | NodeKind::LclFldAddr(_) if is_simd_local(ctx, addr) => {
            debug!("rewrite {indir}: vector load of local through {addr}");
            let load = load_form_of(address.oper());
            ctx.remove(indir);
            let local = ctx.ir.node_mut(addr);
            local.kind.retag(load);
            local.ty = ty;
            edge.replace_with(ctx.ir, addr);
        }
        NodeKind::AddrOf(inner)
            if matches!(
                ctx.ir.node(inner).oper(),
                Oper::Simd | Oper::HwIntrinsic
            ) =>
        {
            debug!("rewrite {indir}: vector load of {inner} through {addr}");
            ctx.remove(indir);
            ctx.remove(addr);
            edge.replace_with(ctx.ir, inner);
        }
        _ if !keep_blk => {
            let data = ctx.ir.node_mut(indir);
            if let NodeKind::Obj(obj) = data.kind {
                data.kind = NodeKind::Ind(obj.addr);
            }
        }
        _ => {}
    }
}

fn is_simd_local(ctx: &RewriteContext<'_>, node: NodeRef) -> bool {
    ctx.ir
        .node(node)
        .kind
        .local()
        .is_some_and(|local| ctx.ir.local(local).is_simd())
}

/// Normalize a `simd` node.
///
/// Pointer-sized nodes of type `int_ptr` are 8-byte vectors, struct-typed
/// nodes take the vector type of their size, and array initialization is
/// expanded into an explicit element address and load.
pub(crate) fn rewrite_simd(ctx: &mut RewriteContext<'_>, edge: &mut Use) -> RationalizeResult<()> {
    let node = edge.def();
    let pointer_size = ctx.pointer_size();
    let data = ctx.ir.node(node);
    let NodeKind::Simd(simd) = data.kind else {
        return Ok(());
    };

    let mut ty = data.ty;
    if ty == VarType::IntPtr && simd.size == pointer_size {
        ty = VarType::Simd8;
    } else if ty == VarType::Struct || ty.is_simd() {
        ty = VarType::simd_for_size(simd.size).ok_or_else(|| {
            RationalizeError::malformed_simd(node, format!("no vector type is {} bytes", simd.size))
        })?;
    }
    ctx.ir.node_mut(node).ty = ty;

    if simd.id == SimdIntrinsic::InitArray {
        let index = simd
            .op2
            .ok_or_else(|| RationalizeError::malformed_simd(node, "array initialization needs an index"))?;
        let lea = ctx.ir.build(
            NodeKind::Lea(LeaNode {
                base: Some(simd.op1),
                index: Some(index),
                scale: simd.base_type.size(pointer_size),
                offset: array_data_offset(pointer_size),
            }),
            VarType::Byref,
        );
        let load = ctx.ir.build(NodeKind::Ind(lea), ty);
        debug!("rewrite {node}: array initialization as load {load} from {lea}");
        ctx.insert_before(node, &[lea, load]);
        ctx.remove(node);
        edge.replace_with(ctx.ir, load);
        return Ok(());
    }

    for operand in std::iter::once(simd.op1).chain(simd.op2) {
        let operand = ctx.ir.node_mut(operand);
        if operand.ty == VarType::Struct {
            operand.ty = ty;
        }
    }
    Ok(())
}

/// Widen a field access covering a whole vector local to the local itself.
///
/// Applies to `lcl_fld` reads at offset 0 without a field sequence and to
/// every `store_lcl_fld` into a vector local.
pub(crate) fn fixup_simd_local(ctx: &mut RewriteContext<'_>, node: NodeRef) {
    let pointer_size = ctx.pointer_size();
    let data = ctx.ir.node(node);
    let Some(local) = data.kind.local() else {
        return;
    };
    let local = ctx.ir.local(local);
    if !local.is_simd() {
        return;
    }

    let widened = match data.kind {
        NodeKind::LclFld(fld) => {
            let whole = fld.field_seq.is_none()
                && fld.offset == 0
                && data.ty == VarType::IntPtr
                && local.exact_size == Some(pointer_size);
            if !whole {
                return;
            }
            Oper::LclVar
        }
        NodeKind::StoreLclFld { .. } => Oper::StoreLclVar,
        _ => return,
    };
    let ty = local
        .exact_size
        .and_then(|size| VarType::simd_for_size(size.next_multiple_of(pointer_size)))
        .unwrap_or(local.ty);

    debug!("widen {node} to {widened} of the whole vector local");
    let data = ctx.ir.node_mut(node);
    data.kind.retag(widened);
    data.flags.remove(NodeFlags::VAR_USEASG);
    data.ty = ty;
}

#[cfg(test)]
mod tests {
    use sprig_ir::{NodeFlags, Oper, VarType};

    use crate::TargetConfig;
    use crate::errors::RationalizeErrorKind;
    use crate::tests::{lower_with, stmt_root, try_lower};

    fn simd_target() -> TargetConfig {
        TargetConfig::new(8).with_simd(true)
    }

    #[test]
    fn vector_load_through_local_address_reads_local() {
        let (_, lir) = lower_with(
            r#"(method
                 (local V0 simd16 float)
                 (block BB0 (stmt (call:void "Use" (ind:simd16 (lcl_var_addr V0))))))"#,
            &simd_target(),
        );
        insta::assert_snapshot!(lir, @r#"
        BB0:
          t0 = lcl_var.simd16 V0
          call.void "Use" t0
        "#);
    }

    #[test]
    fn vector_load_through_addr_of_simd_node_is_the_node() {
        let (_, lir) = lower_with(
            r#"(method
                 (local V0 simd16 float)
                 (block BB0
                   (stmt (call:void "Use"
                     (ind:simd16 (addr (simd:simd16 sqrt float 16 (lcl_var V0))))))))"#,
            &simd_target(),
        );
        insta::assert_snapshot!(lir, @r#"
        BB0:
          t0 = lcl_var.simd16 V0
          t1 = simd.simd16 sqrt float 16 t0
          call.void "Use" t1
        "#);
    }

    #[test]
    fn vector_obj_through_other_address_becomes_ind() {
        let (_, lir) = lower_with(
            r#"(method
                 (layout L0 16)
                 (block BB0 (stmt (call:void "Use" (obj:simd16 L0 (cns_int:int_ptr 64))))))"#,
            &simd_target(),
        );
        insta::assert_snapshot!(lir, @r#"
        BB0:
          t0 = cns_int.int_ptr 64
          t1 = ind.simd16 t0
          call.void "Use" t1
        "#);
    }

    #[test]
    fn array_initialization_becomes_element_load() {
        let (_, lir) = lower_with(
            r#"(method
                 (local V0 ref)
                 (local V1 int)
                 (local V2 simd16 float)
                 (block BB0
                   (stmt (assign (lcl_var V2) (simd:simd16 init_array float 16 (lcl_var V0) (lcl_var V1))))))"#,
            &simd_target(),
        );
        insta::assert_snapshot!(lir, @r"
        BB0:
          t0 = lcl_var.ref V0
          t1 = lcl_var.int V1
          t2 = lea.byref 4 16 t0 t1
          t3 = ind.simd16 t2
          store_lcl_var.simd16 V2 t3 !def
        ");
    }

    #[test]
    fn struct_typed_simd_node_takes_vector_type() {
        let (ir, _) = lower_with(
            r#"(method
                 (layout L0 16)
                 (local V0 struct L0)
                 (block BB0 (stmt (call:void "Use" (simd:struct abs float 16 (lcl_var V0))))))"#,
            &simd_target(),
        );
        let block = ir.blocks().next().expect("block");
        let call = stmt_root(&ir, 0);
        let simd = ir.range_operands(block, call)[0];
        assert_eq!(ir.node(simd).ty, VarType::Simd16);
        let operand = ir.range_operands(block, simd)[0];
        assert_eq!(ir.node(operand).ty, VarType::Simd16);
    }

    #[test]
    fn odd_sized_simd_node_is_malformed() {
        let err = try_lower(
            r#"(method
                 (layout L0 24)
                 (local V0 struct L0)
                 (block BB0 (stmt (call:void "Use" (simd:struct abs float 24 (lcl_var V0))))))"#,
            &simd_target(),
        )
        .unwrap_err();
        assert!(matches!(err.kind(), RationalizeErrorKind::MalformedSimd { .. }));
    }

    #[test]
    fn pointer_sized_field_of_vector_local_is_widened() {
        let (ir, lir) = lower_with(
            r#"(method
                 (local V0 simd8 float)
                 (block BB0 (stmt (call:void "Use" (lcl_fld:int_ptr V0 0)))))"#,
            &simd_target(),
        );
        insta::assert_snapshot!(lir, @r#"
        BB0:
          t0 = lcl_var.simd8 V0
          call.void "Use" t0
        "#);
        let block = ir.blocks().next().expect("block");
        let read = ir.range_operands(block, stmt_root(&ir, 0))[0];
        assert_eq!(ir.node(read).oper(), Oper::LclVar);
    }

    #[test]
    fn field_store_into_vector_local_stores_whole_local() {
        let (ir, lir) = lower_with(
            r#"(method
                 (local V0 simd12 float)
                 (local V1 simd12 float)
                 (block BB0 (stmt (assign (lcl_fld:simd12 V0 0) (lcl_var V1)))))"#,
            &simd_target(),
        );
        insta::assert_snapshot!(lir, @r"
        BB0:
          t0 = lcl_var.simd12 V1
          store_lcl_var.simd16 V0 t0 !def
        ");
        let store = stmt_root(&ir, 0);
        assert!(!ir.node(store).flags.contains(NodeFlags::VAR_USEASG));
    }

    #[test]
    fn without_simd_support_vector_nodes_are_untouched() {
        let (_, lir) = lower_with(
            r#"(method
                 (local V0 simd16 float)
                 (block BB0 (stmt (call:void "Use" (ind:simd16 (lcl_var_addr V0))))))"#,
            &TargetConfig::new(8),
        );
        insta::assert_snapshot!(lir, @r#"
        BB0:
          t0 = lcl_var_addr.byref V0
          t1 = ind.simd16 t0
          call.void "Use" t1
        "#);
    }
}
