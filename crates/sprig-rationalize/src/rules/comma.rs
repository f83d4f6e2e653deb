//! `comma` removal.

use sprig_ir::{NodeKind, NodeRef, Use};
use tracing::debug;

use crate::context::RewriteContext;

/// Dissolve `comma(first, second)`.
///
/// The range already runs `first` before `second`, so the comma only has to
/// go. A pure `first` is deleted, an effectful one stays with its value
/// marked unused. At the root of a statement a pure `second` is deleted too.
pub(crate) fn rewrite_comma(ctx: &mut RewriteContext<'_>, edge: &mut Use) {
    let comma = edge.def();
    let NodeKind::Comma { first, second } = ctx.ir.node(comma).kind else {
        return;
    };

    discard(ctx, comma, first);
    ctx.remove(comma);

    if !edge.is_dummy_use() {
        edge.replace_with(ctx.ir, second);
        return;
    }

    let range = ctx.tree_range(second);
    if range.side_effects.is_empty() {
        debug!("delete pure result {second} of root comma {comma}");
        ctx.delete(&range);
    } else {
        edge.replace_with(ctx.ir, second);
    }
}

/// The operand's range may be open: an inner comma can leave an unused
/// effectful node between its nodes, and that node stays.
fn discard(ctx: &mut RewriteContext<'_>, comma: NodeRef, first: NodeRef) {
    let range = ctx.tree_range(first);
    if range.side_effects.is_empty() {
        debug!("delete pure operand {first} of comma {comma}");
        ctx.delete(&range);
    } else {
        let data = ctx.ir.node_mut(first);
        if data.is_value() {
            data.set_unused_value();
        }
    }
}

#[cfg(test)]
mod tests {
    use sprig_ir::NodeFlags;

    use crate::TargetConfig;
    use crate::tests::{lower, lower_with};

    #[test]
    fn pure_first_operand_is_deleted() {
        let lir = lower(
            "(method
               (local V0 int)
               (local V1 int)
               (block BB0 (stmt (return (comma (add:int (lcl_var V0) (cns_int:int 1)) (lcl_var V1))))))",
        );
        insta::assert_snapshot!(lir, @r"
        BB0:
          t0 = lcl_var.int V1
          return.void t0
        ");
    }

    #[test]
    fn effectful_first_operand_is_kept_unused() {
        let lir = lower(
            r#"(method
                 (local V0 int)
                 (block BB0 (stmt (return (comma (call:int "Tick") (lcl_var V0))))))"#,
        );
        insta::assert_snapshot!(lir, @r#"
        BB0:
          t0 = call.int "Tick" !unused
          t1 = lcl_var.int V0
          return.void t1
        "#);
    }

    #[test]
    fn pure_root_comma_dissolves() {
        let (ir, lir) = lower_with(
            "(method
               (local V0 int)
               (block BB0 (stmt (comma (lcl_var V0) (cns_int:int 4)))))",
            &TargetConfig::new(8),
        );
        insta::assert_snapshot!(lir, @"BB0:");
        let removed = ir
            .nodes()
            .filter(|&node| ir.node(node).is_dead())
            .count();
        assert_eq!(removed, 2);
    }

    #[test]
    fn effectful_root_result_is_marked_unused() {
        let (ir, lir) = lower_with(
            r#"(method
                 (local V0 int)
                 (block BB0 (stmt (comma (lcl_var V0) (call:int "Next")))))"#,
            &TargetConfig::new(8),
        );
        insta::assert_snapshot!(lir, @r#"
        BB0:
          t0 = call.int "Next" !unused
        "#);
        let block = ir.blocks().next().expect("block");
        let call = ir.range_first(block).expect("call");
        assert!(ir.node(call).flags.contains(NodeFlags::CALL));
    }

    #[test]
    fn pure_operand_around_a_kept_call_is_deleted() {
        let lir = lower(
            r#"(method
                 (local V0 int)
                 (block BB0
                   (stmt (return (comma (add:int (lcl_var V0) (comma (call:int "Tick") (lcl_var V0))) (lcl_var V0))))))"#,
        );
        insta::assert_snapshot!(lir, @r#"
        BB0:
          t0 = call.int "Tick" !unused
          t1 = lcl_var.int V0
          return.void t1
        "#);
    }

    #[test]
    fn effectful_operand_around_a_kept_call_is_unused() {
        let lir = lower(
            r#"(method
                 (local V0 int)
                 (block BB0
                   (stmt (return (comma (add:int (call:int "A") (comma (call:int "Tick") (lcl_var V0))) (lcl_var V0))))))"#,
        );
        insta::assert_snapshot!(lir, @r#"
        BB0:
          t0 = call.int "A"
          t1 = call.int "Tick" !unused
          t2 = lcl_var.int V0
          t3 = add.int t0 t2 !unused
          t4 = lcl_var.int V0
          return.void t4
        "#);
    }

    #[test]
    fn root_comma_with_boxed_inner_comma() {
        let lir = lower(
            r#"(method
                 (local V0 int)
                 (block BB0
                   (stmt (comma (add:int (lcl_var V0) (box (comma (call:int "Tick") (lcl_var V0)))) (lcl_var V0)))))"#,
        );
        insta::assert_snapshot!(lir, @r#"
        BB0:
          t0 = call.int "Tick" !unused
        "#);
    }
}
