//! MethodIr: arena storage for one method being compiled.
//!
//! Nodes, statements, blocks, locals and layouts live in `PrimaryMap`s owned
//! by `MethodIr`. Nodes are never freed. Removing a node from a range only
//! unlinks it, and deleting a range additionally marks its nodes dead.

use cranelift_entity::PrimaryMap;
use smallvec::SmallVec;

use crate::flags::NodeFlags;
use crate::node::{NodeData, NodeKind};
use crate::refs::*;
use crate::types::{ClassLayout, IlOffset, LocalVarDsc, VarType};

// ============================================================================
// Entity data types
// ============================================================================

/// Whether blocks hold statement trees or linear ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FlowGraphOrder {
    #[default]
    Tree,
    Linear,
}

/// One statement tree of a block.
#[derive(Clone, Debug)]
pub struct Statement {
    pub root: NodeRef,
    /// First node of the statement in execution order.
    pub first: NodeRef,
    pub il_offset: Option<IlOffset>,
}

/// A basic block: its statements while in HIR, its range once linearized.
#[derive(Clone, Debug, Default)]
pub struct BlockData {
    pub stmts: Vec<StmtRef>,
    pub(crate) first: Option<NodeRef>,
    pub(crate) last: Option<NodeRef>,
}

// ============================================================================
// MethodIr
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct MethodIr {
    nodes: PrimaryMap<NodeRef, NodeData>,
    stmts: PrimaryMap<StmtRef, Statement>,
    blocks: PrimaryMap<BlockRef, BlockData>,
    locals: PrimaryMap<LocalRef, LocalVarDsc>,
    layouts: PrimaryMap<LayoutRef, ClassLayout>,

    pub order: FlowGraphOrder,
    /// Set once every block is in LIR form.
    pub rational_form: bool,
    /// Some node produces a `long`; codegen needs wide integer support.
    pub long_used: bool,
}

impl MethodIr {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Allocate a node with exactly the given flags.
    ///
    /// See [`MethodIr::build`] for the constructor that derives effect flags.
    pub fn create_node(&mut self, kind: NodeKind, ty: VarType, flags: NodeFlags) -> NodeRef {
        self.nodes.push(NodeData::new(kind, ty, flags))
    }

    pub fn node(&self, node: NodeRef) -> &NodeData {
        &self.nodes[node]
    }

    pub fn node_mut(&mut self, node: NodeRef) -> &mut NodeData {
        &mut self.nodes[node]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.nodes.keys()
    }

    /// Items of a `list` chain starting at `head`.
    pub fn list_items(&self, head: Option<NodeRef>) -> SmallVec<[NodeRef; 4]> {
        let mut items = SmallVec::new();
        let mut cursor = head;
        while let Some(cell) = cursor {
            match self.nodes[cell].kind {
                NodeKind::List(list) => {
                    items.push(list.head);
                    cursor = list.tail;
                }
                _ => {
                    items.push(cell);
                    cursor = None;
                }
            }
        }
        items
    }

    // ========================================================================
    // Blocks and statements
    // ========================================================================

    pub fn create_block(&mut self) -> BlockRef {
        self.blocks.push(BlockData::default())
    }

    pub fn block(&self, block: BlockRef) -> &BlockData {
        &self.blocks[block]
    }

    pub fn block_mut(&mut self, block: BlockRef) -> &mut BlockData {
        &mut self.blocks[block]
    }

    /// Blocks in block-list order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockRef> + '_ {
        self.blocks.keys()
    }

    pub fn stmt(&self, stmt: StmtRef) -> &Statement {
        &self.stmts[stmt]
    }

    pub fn stmt_mut(&mut self, stmt: StmtRef) -> &mut Statement {
        &mut self.stmts[stmt]
    }

    /// Append a statement rooted at `root` to `block`, threading its nodes in
    /// execution order.
    pub fn append_statement(
        &mut self,
        block: BlockRef,
        root: NodeRef,
        il_offset: Option<IlOffset>,
    ) -> StmtRef {
        let first = self.sequence_tree(root);
        let stmt = self.stmts.push(Statement {
            root,
            first,
            il_offset,
        });
        self.blocks[block].stmts.push(stmt);
        stmt
    }

    /// Thread the tree under `root` through `prev`/`next` in post order,
    /// honoring `REVERSE_OPS`. Returns the first node.
    pub fn sequence_tree(&mut self, root: NodeRef) -> NodeRef {
        let mut order = Vec::new();
        self.collect_post_order(root, &mut order);

        let mut prev = None;
        for &node in &order {
            let data = &mut self.nodes[node];
            data.prev = prev;
            data.next = None;
            if let Some(prev) = prev {
                self.nodes[prev].next = Some(node);
            }
            prev = Some(node);
        }
        order[0]
    }

    fn collect_post_order(&self, node: NodeRef, order: &mut Vec<NodeRef>) {
        let data = &self.nodes[node];
        for operand in data.kind.operands_in_eval_order(data.flags) {
            self.collect_post_order(operand, order);
        }
        order.push(node);
    }

    /// Whether the statement defines a local from a phi.
    pub fn is_phi_def(&self, stmt: StmtRef) -> bool {
        match self.nodes[self.stmts[stmt].root].kind {
            NodeKind::Assign { value, .. } => matches!(self.nodes[value].kind, NodeKind::Phi(_)),
            NodeKind::StoreLclVar { value, .. } => {
                matches!(self.nodes[value].kind, NodeKind::Phi(_))
            }
            _ => false,
        }
    }

    // ========================================================================
    // Locals and layouts
    // ========================================================================

    pub fn add_layout(&mut self, layout: ClassLayout) -> LayoutRef {
        self.layouts.push(layout)
    }

    pub fn layout(&self, layout: LayoutRef) -> &ClassLayout {
        &self.layouts[layout]
    }

    pub fn add_local(&mut self, local: LocalVarDsc) -> LocalRef {
        self.locals.push(local)
    }

    /// Add a struct-typed local whose size comes from `layout`.
    pub fn add_struct_local(&mut self, layout: LayoutRef) -> LocalRef {
        let size = self.layouts[layout].size;
        self.locals.push(LocalVarDsc {
            ty: VarType::Struct,
            layout: Some(layout),
            simd_base: None,
            exact_size: Some(size),
        })
    }

    pub fn local(&self, local: LocalRef) -> &LocalVarDsc {
        &self.locals[local]
    }

    pub fn locals(&self) -> impl Iterator<Item = (LocalRef, &LocalVarDsc)> {
        self.locals.iter()
    }

    pub fn layouts(&self) -> impl Iterator<Item = (LayoutRef, &ClassLayout)> {
        self.layouts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::BinaryOp;

    #[test]
    fn sequencing_honors_reverse_ops() {
        let mut ir = MethodIr::new();
        let block = ir.create_block();
        let a = ir.cns_int(VarType::Int, 1);
        let b = ir.cns_int(VarType::Int, 2);
        let sub = ir.binary(BinaryOp::Sub, VarType::Int, a, b);
        ir.node_mut(sub).flags.insert(NodeFlags::REVERSE_OPS);
        let stmt = ir.append_statement(block, sub, None);

        assert_eq!(ir.stmt(stmt).first, b);
        assert_eq!(ir.node(b).next(), Some(a));
        assert_eq!(ir.node(a).next(), Some(sub));
        assert_eq!(ir.node(sub).next(), None);
        assert_eq!(ir.node(sub).prev(), Some(a));
    }

    #[test]
    fn phi_definitions_are_recognized() {
        let mut ir = MethodIr::new();
        let block = ir.create_block();
        let pred = ir.create_block();
        let local = ir.add_local(LocalVarDsc::new(VarType::Int));
        let arg = ir.phi_arg(VarType::Int, local, pred);
        let phi = ir.phi(VarType::Int, &[arg]);
        let target = ir.lcl_var(local);
        let asg = ir.assign(target, phi);
        let stmt = ir.append_statement(block, asg, None);
        assert!(ir.is_phi_def(stmt));

        let cns = ir.cns_int(VarType::Int, 0);
        let target = ir.lcl_var(local);
        let asg = ir.assign(target, cns);
        let stmt = ir.append_statement(block, asg, None);
        assert!(!ir.is_phi_def(stmt));
    }

    #[test]
    fn struct_locals_take_layout_size() {
        let mut ir = MethodIr::new();
        let layout = ir.add_layout(ClassLayout::new(24, vec![]));
        let local = ir.add_struct_local(layout);
        assert_eq!(ir.local(local).exact_size, Some(24));
        assert_eq!(ir.local(local).ty, VarType::Struct);
    }
}
