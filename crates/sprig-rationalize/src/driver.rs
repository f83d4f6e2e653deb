//! Whole-method driver.

use sprig_ir::{
    BlockRef, FlowGraphOrder, IlOffset, MethodIr, NodeFlags, NodeKind, StmtRef, VarType,
};
use tracing::{debug, debug_span};

use crate::config::TargetConfig;
use crate::context::RewriteContext;
use crate::errors::{RationalizeError, RationalizeErrorKind, RationalizeResult};
use crate::walk;

/// Counts reported by [`rationalize`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RationalizeStats {
    /// Blocks that had statements to rewrite.
    pub blocks: usize,
    pub statements: usize,
    /// Nodes removed from ranges, including deleted subtrees.
    pub nodes_removed: usize,
}

/// Rewrite every block of `ir` from statement trees into one linear range.
///
/// Statements are spliced into their block's range in order, each preceded by
/// an `il_offset` marker when it carries a source position (phi definitions
/// excepted), and then rewritten in place. On success the method is in
/// rational form.
///
/// # Errors
///
/// Fails if the method is already linear, if the trees break an HIR
/// invariant, or if a rewrite meets a shape it cannot handle. The method is
/// left partially rewritten in that case.
pub fn rationalize(ir: &mut MethodIr, config: &TargetConfig) -> RationalizeResult<RationalizeStats> {
    if ir.rational_form {
        return Err(RationalizeErrorKind::AlreadyLinear.into());
    }
    let hir = sprig_ir::check_hir(ir);
    if !hir.is_ok() {
        return Err(RationalizeError::sanity(hir));
    }

    ir.order = FlowGraphOrder::Linear;
    let mut stats = RationalizeStats::default();

    let blocks: Vec<_> = ir.blocks().collect();
    for block in blocks {
        let stmts = ir.block(block).stmts.clone();
        if stmts.is_empty() {
            continue;
        }
        let _span = debug_span!("rationalize_block", %block).entered();
        stats.blocks += 1;

        ir.reset_range(block);
        for stmt in stmts {
            ir.splice_statement(block, stmt);
            if let Some(offset) = ir.stmt(stmt).il_offset {
                if !ir.is_phi_def(stmt) {
                    insert_il_offset(ir, block, stmt, offset);
                }
            }

            let mut ctx = RewriteContext::new(ir, config, block, stmt);
            walk::rewrite_statement(&mut ctx)?;
            stats.statements += 1;
            stats.nodes_removed += ctx.removed();
        }

        let range = sprig_ir::check_range(ir, block);
        if !range.is_ok() {
            return Err(RationalizeError::range(range));
        }
    }

    ir.rational_form = true;
    debug!(
        "rationalized {} statement(s) in {} block(s), removed {} node(s)",
        stats.statements, stats.blocks, stats.nodes_removed
    );
    Ok(stats)
}

fn insert_il_offset(ir: &mut MethodIr, block: BlockRef, stmt: StmtRef, offset: IlOffset) {
    let first = ir.stmt(stmt).first;
    let marker = ir.create_node(NodeKind::IlOffset(offset), VarType::Void, NodeFlags::empty());
    ir.insert_before(block, first, &[marker]);
}

#[cfg(test)]
mod tests {
    use sprig_ir::parse_test_method;

    use super::*;

    #[test]
    fn stats_and_method_state() {
        let mut ir = parse_test_method(
            "(method
               (local V0 int)
               (block BB0
                 (stmt 0x0 (assign (lcl_var V0) (cns_int:int 1)))
                 (stmt 0x4 (cns_int:int 2)))
               (block BB1))",
        );
        let stats = rationalize(&mut ir, &TargetConfig::new(8)).expect("rationalize");
        assert_eq!(
            stats,
            RationalizeStats {
                blocks: 1,
                statements: 2,
                nodes_removed: 2,
            }
        );
        assert!(ir.rational_form);
        assert_eq!(ir.order, FlowGraphOrder::Linear);
    }

    #[test]
    fn second_run_is_rejected() {
        let mut ir = parse_test_method("(method (block BB0 (stmt (nop))))");
        let config = TargetConfig::new(8);
        rationalize(&mut ir, &config).expect("first run");
        let err = rationalize(&mut ir, &config).unwrap_err();
        assert_eq!(err.kind(), &RationalizeErrorKind::AlreadyLinear);
    }

    #[test]
    fn broken_hir_fails_the_sanity_check() {
        let mut ir = parse_test_method(
            "(method
               (local V0 int)
               (local V1 int)
               (block BB0 (stmt (assign (lcl_var V0) (lcl_var !def V1)))))",
        );
        let err = rationalize(&mut ir, &TargetConfig::new(8)).unwrap_err();
        assert!(matches!(err.kind(), RationalizeErrorKind::Sanity(_)));
        assert!(!ir.rational_form);
        assert_eq!(ir.order, FlowGraphOrder::Tree);
    }

    #[test]
    fn il_offsets_become_markers() {
        let lir = crate::tests::lower(
            "(method
               (local V0 int)
               (local V1 int)
               (block BB0
                 (stmt 0x10 (assign (lcl_var V0) (cns_int:int 5)))
                 (stmt 0x14 (assign (lcl_var V1) (phi:int (phi_arg:int V1 BB0))))))",
        );
        insta::assert_snapshot!(lir, @r"
        BB0:
          il_offset.void 0x10
          t0 = cns_int.int 5
          store_lcl_var.int V0 t0 !def
          t1 = phi_arg.int V1 BB0
          t2 = phi.int t1
          store_lcl_var.int V1 t2 !def
        ");
    }

    #[test]
    fn wide_integers_are_recorded() {
        let mut ir = parse_test_method(
            "(method (local V0 long) (block BB0 (stmt (return (add:long (lcl_var V0) (cns_int:long 1))))))",
        );
        rationalize(&mut ir, &TargetConfig::new(8)).expect("rationalize");
        assert!(ir.long_used);
    }
}
