//! Per-statement rewrite state.
//!
//! Rules receive the method, the target configuration and the block and
//! statement being rewritten through a `RewriteContext`, and edit the block's
//! range through it so removals are counted.

use sprig_ir::{BlockRef, MethodIr, NodeRef, StmtRef, TreeRange};

use crate::config::TargetConfig;

pub struct RewriteContext<'a> {
    pub ir: &'a mut MethodIr,
    pub config: &'a TargetConfig,
    pub block: BlockRef,
    pub stmt: StmtRef,
    removed: usize,
}

impl<'a> RewriteContext<'a> {
    pub fn new(
        ir: &'a mut MethodIr,
        config: &'a TargetConfig,
        block: BlockRef,
        stmt: StmtRef,
    ) -> Self {
        Self {
            ir,
            config,
            block,
            stmt,
            removed: 0,
        }
    }

    /// Nodes removed or deleted from the range so far.
    pub fn removed(&self) -> usize {
        self.removed
    }

    pub fn pointer_size(&self) -> u32 {
        self.config.pointer_size
    }

    pub fn in_range(&self, node: NodeRef) -> bool {
        self.ir.in_range(self.block, node)
    }

    pub fn remove(&mut self, node: NodeRef) {
        self.ir.remove(self.block, node);
        self.removed += 1;
    }

    /// Remove a subtree range and mark its nodes dead.
    pub fn delete(&mut self, range: &TreeRange) {
        self.ir.delete_range(self.block, range);
        self.removed += range.nodes.len();
    }

    pub fn insert_before(&mut self, anchor: NodeRef, nodes: &[NodeRef]) {
        self.ir.insert_before(self.block, anchor, nodes);
    }

    pub fn insert_after(&mut self, anchor: NodeRef, nodes: &[NodeRef]) {
        self.ir.insert_after(self.block, anchor, nodes);
    }

    /// Relink `node` immediately before `anchor`.
    pub fn move_before(&mut self, anchor: NodeRef, node: NodeRef) {
        self.ir.remove(self.block, node);
        self.ir.insert_before(self.block, anchor, &[node]);
    }

    pub fn tree_range(&self, root: NodeRef) -> TreeRange {
        self.ir.tree_range(self.block, root)
    }
}
