//! Structural checks for HIR statements and LIR ranges.
//!
//! 1. **HIR**: every statement is threaded in evaluation order, every node has
//!    at most one parent, and local definitions carry `VAR_DEF` exactly where
//!    an assignment writes them.
//! 2. **Range**: a block's list is connected in both directions, owned by the
//!    block and free of dead nodes.
//! 3. **LIR**: on top of the range check, no HIR-only shape survives, operands
//!    precede their users, and every value is either consumed or flagged
//!    unused.

use std::fmt;

use cranelift_entity::SecondaryMap;

use crate::context::MethodIr;
use crate::flags::NodeFlags;
use crate::node::{NodeKind, Oper};
use crate::refs::{BlockRef, NodeRef, StmtRef};

// ============================================================================
// Error types
// ============================================================================

/// One violated invariant.
pub struct ValidationError {
    pub block: BlockRef,
    pub node: Option<NodeRef>,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "{}: {}: {}", self.block, node, self.message),
            None => write!(f, "{}: {}", self.block, self.message),
        }
    }
}

impl fmt::Debug for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Result of validation.
#[derive(Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, block: BlockRef, node: Option<NodeRef>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            block,
            node,
            message: message.into(),
        });
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "validation passed");
        }
        writeln!(f, "{} error(s) found:", self.errors.len())?;
        for err in &self.errors {
            writeln!(f, "  - {}", err)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// ============================================================================
// HIR
// ============================================================================

/// Check every statement tree of the method.
pub fn check_hir(ir: &MethodIr) -> ValidationResult {
    let mut result = ValidationResult::default();
    let mut parent: SecondaryMap<NodeRef, Option<NodeRef>> = SecondaryMap::new();
    let mut seen: SecondaryMap<NodeRef, bool> = SecondaryMap::new();

    for block in ir.blocks() {
        for &stmt in &ir.block(block).stmts {
            let root = ir.stmt(stmt).root;
            let mut order = Vec::new();
            if seen[root] {
                result.push(block, Some(root), format!("root of {stmt} is shared"));
                continue;
            }
            seen[root] = true;
            check_tree(ir, block, root, &mut parent, &mut seen, &mut order, &mut result);
            check_threading(ir, block, stmt, &order, &mut result);
        }
    }
    result
}

fn check_tree(
    ir: &MethodIr,
    block: BlockRef,
    node: NodeRef,
    parent: &mut SecondaryMap<NodeRef, Option<NodeRef>>,
    seen: &mut SecondaryMap<NodeRef, bool>,
    order: &mut Vec<NodeRef>,
    result: &mut ValidationResult,
) {
    let data = ir.node(node);
    if let NodeKind::Assign { target, value } = data.kind {
        let target = ir.node(target);
        if target.oper() == Oper::LclVar && !target.flags.contains(NodeFlags::VAR_DEF) {
            result.push(block, Some(node), "local assignment target lacks `def`");
        }
        let value_data = ir.node(value);
        if value_data.oper() == Oper::LclVar && value_data.flags.contains(NodeFlags::VAR_DEF) {
            result.push(block, Some(value), "assigned local read is flagged `def`");
        }
    }

    for operand in data.kind.operands_in_eval_order(data.flags) {
        if seen[operand] {
            let first = parent[operand].map_or_else(|| "a statement".to_string(), |p| p.to_string());
            result.push(
                block,
                Some(operand),
                format!("used by both {first} and {node}"),
            );
            continue;
        }
        seen[operand] = true;
        parent[operand] = Some(node);
        check_tree(ir, block, operand, parent, seen, order, result);
    }
    order.push(node);
}

fn check_threading(
    ir: &MethodIr,
    block: BlockRef,
    stmt: StmtRef,
    order: &[NodeRef],
    result: &mut ValidationResult,
) {
    let mut threaded = Vec::new();
    let mut cursor = Some(ir.stmt(stmt).first);
    while let Some(node) = cursor {
        threaded.push(node);
        if threaded.len() > order.len() {
            break;
        }
        cursor = ir.node(node).next();
    }
    if threaded != order {
        result.push(
            block,
            None,
            format!("{stmt} is not threaded in evaluation order"),
        );
    }
}

// ============================================================================
// Range
// ============================================================================

/// Check that the block's range is a well-formed doubly linked list.
pub fn check_range(ir: &MethodIr, block: BlockRef) -> ValidationResult {
    let mut result = ValidationResult::default();
    check_range_into(ir, block, &mut result);
    result
}

fn check_range_into(ir: &MethodIr, block: BlockRef, result: &mut ValidationResult) -> usize {
    let limit = ir.node_count();
    let mut forward = 0;
    let mut prev = None;
    let mut cursor = ir.range_first(block);
    while let Some(node) = cursor {
        forward += 1;
        if forward > limit {
            result.push(block, Some(node), "range contains a cycle");
            return forward;
        }
        let data = ir.node(node);
        if data.prev() != prev {
            result.push(block, Some(node), "back link does not match the forward walk");
        }
        if data.block() != Some(block) {
            result.push(block, Some(node), "node is not owned by the block");
        }
        if data.is_dead() {
            result.push(block, Some(node), "deleted node is still linked");
        }
        prev = Some(node);
        cursor = data.next();
    }
    if ir.range_last(block) != prev {
        result.push(block, prev, "range end does not match the last node");
    }

    let backward = ir.range_nodes_rev(block).take(limit + 1).count();
    if backward != forward {
        result.push(
            block,
            None,
            format!("{forward} node(s) reachable forward, {backward} backward"),
        );
    }
    forward
}

// ============================================================================
// LIR
// ============================================================================

/// Check every block's range for the LIR shape rules.
pub fn check_lir(ir: &MethodIr) -> ValidationResult {
    let mut result = ValidationResult::default();
    let mut position: SecondaryMap<NodeRef, Option<usize>> = SecondaryMap::new();
    let mut user: SecondaryMap<NodeRef, Option<NodeRef>> = SecondaryMap::new();

    for block in ir.blocks() {
        let count = check_range_into(ir, block, &mut result);
        if count > ir.node_count() {
            continue;
        }
        let nodes: Vec<_> = ir.range_nodes(block).collect();
        for (index, &node) in nodes.iter().enumerate() {
            position[node] = Some(index);
        }

        for (index, &node) in nodes.iter().enumerate() {
            if let Some(message) = banned_shape(ir, node) {
                result.push(block, Some(node), message);
            }
            for operand in ir.range_operands(block, node) {
                match position[operand] {
                    Some(at) if at < index && ir.in_range(block, operand) => {}
                    _ => {
                        result.push(
                            block,
                            Some(node),
                            format!("operand {operand} does not precede its user"),
                        );
                        continue;
                    }
                }
                if let Some(other) = user[operand] {
                    result.push(
                        block,
                        Some(operand),
                        format!("consumed by both {other} and {node}"),
                    );
                }
                user[operand] = Some(node);
            }
        }

        for &node in &nodes {
            let data = ir.node(node);
            if data.is_value() && user[node].is_none() && !data.is_unused_value() {
                result.push(block, Some(node), "value is neither consumed nor flagged unused");
            }
        }
    }
    result
}

fn banned_shape(ir: &MethodIr, node: NodeRef) -> Option<&'static str> {
    match ir.node(node).kind {
        NodeKind::Assign { .. } => Some("assignment survived"),
        NodeKind::Comma { .. } => Some("comma survived"),
        NodeKind::Nop(Some(_)) => Some("nop with an operand survived"),
        NodeKind::ArgPlace => Some("argument placeholder survived"),
        NodeKind::Box(_) => Some("box survived"),
        NodeKind::Qmark { .. } | NodeKind::Colon { .. } => Some("qmark survived"),
        NodeKind::AddrOf(operand) => {
            let inner = ir.node(operand);
            let foldable = inner.is_local_read()
                || matches!(inner.kind, NodeKind::ClsVar(_) | NodeKind::Ind(_));
            foldable.then_some("address of a local, static or indirection survived")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::BinaryOp;
    use crate::types::{LocalVarDsc, VarType};

    #[test]
    fn freshly_built_statements_pass() {
        let mut ir = MethodIr::new();
        let local = ir.add_local(LocalVarDsc::new(VarType::Int));
        let block = ir.create_block();
        let a = ir.cns_int(VarType::Int, 1);
        let b = ir.lcl_var(local);
        let add = ir.binary(BinaryOp::Add, VarType::Int, a, b);
        let target = ir.lcl_var(local);
        let asg = ir.assign(target, add);
        ir.append_statement(block, asg, None);

        let result = check_hir(&ir);
        assert!(result.is_ok(), "{result}");
    }

    #[test]
    fn missing_definition_flag() {
        let mut ir = MethodIr::new();
        let local = ir.add_local(LocalVarDsc::new(VarType::Int));
        let block = ir.create_block();
        let value = ir.cns_int(VarType::Int, 1);
        let target = ir.lcl_var(local);
        let asg = ir.assign(target, value);
        ir.node_mut(target).flags.remove(NodeFlags::VAR_DEF);
        ir.append_statement(block, asg, None);

        let result = check_hir(&ir);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].to_string(),
            format!("BB0: {asg}: local assignment target lacks `def`")
        );
    }

    #[test]
    fn shared_operand_is_reported() {
        let mut ir = MethodIr::new();
        let block = ir.create_block();
        let a = ir.cns_int(VarType::Int, 1);
        let add = ir.binary(BinaryOp::Add, VarType::Int, a, a);
        ir.append_statement(block, add, None);

        let result = check_hir(&ir);
        assert!(!result.is_ok());
        assert!(result.errors[0].message.contains("used by both"));
    }

    #[test]
    fn lir_requires_use_or_mark() {
        let mut ir = MethodIr::new();
        let block = ir.create_block();
        let a = ir.cns_int(VarType::Int, 1);
        let b = ir.cns_int(VarType::Int, 2);
        let ret = ir.ret(Some(b));
        for node in [a, b, ret] {
            ir.push_back(block, node);
        }

        let result = check_lir(&ir);
        assert_eq!(result.errors.len(), 1, "{result}");
        assert_eq!(result.errors[0].node, Some(a));

        ir.node_mut(a).set_unused_value();
        assert!(check_lir(&ir).is_ok());
    }

    #[test]
    fn lir_rejects_hir_shapes_and_misordered_operands() {
        let mut ir = MethodIr::new();
        let block = ir.create_block();
        let a = ir.cns_int(VarType::Int, 1);
        let b = ir.cns_int(VarType::Int, 2);
        let comma = ir.comma(a, b);
        ir.node_mut(comma).set_unused_value();
        for node in [b, a, comma] {
            ir.push_back(block, node);
        }
        ir.node_mut(a).set_unused_value();

        let result = check_lir(&ir);
        let messages: Vec<_> = result.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["comma survived"]);

        let range = check_range(&ir, block);
        assert!(range.is_ok(), "{range}");
    }

    #[test]
    fn range_check_reports_stale_owner() {
        let mut ir = MethodIr::new();
        let block = ir.create_block();
        let a = ir.cns_int(VarType::Int, 1);
        ir.push_back(block, a);
        ir.node_mut(a).dead = true;

        let result = check_range(&ir, block);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "deleted node is still linked");
    }
}
