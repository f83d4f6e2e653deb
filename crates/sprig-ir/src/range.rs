//! Per-block execution-order ranges.
//!
//! A block's range is a doubly linked list threaded through the `prev`/`next`
//! links of its nodes, with the block holding the two ends. All splicing goes
//! through the methods here. Misuse (anchors outside the range, inserting a
//! node that already sits in a range, non-contiguous removal) is a bug in the
//! caller and panics.

use std::collections::HashSet;

use smallvec::SmallVec;

use crate::context::MethodIr;
use crate::flags::NodeFlags;
use crate::node::Oper;
use crate::refs::{BlockRef, NodeRef, StmtRef};

/// The part of a range occupied by one (already linearized) subtree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeRange {
    pub first: NodeRef,
    /// The subtree root.
    pub last: NodeRef,
    /// No node outside the subtree sits between `first` and `last`.
    pub is_closed: bool,
    /// Union of the effect bits of the subtree's nodes.
    pub side_effects: NodeFlags,
    /// Subtree nodes in range order.
    pub nodes: Vec<NodeRef>,
}

impl MethodIr {
    pub fn range_first(&self, block: BlockRef) -> Option<NodeRef> {
        self.block(block).first
    }

    pub fn range_last(&self, block: BlockRef) -> Option<NodeRef> {
        self.block(block).last
    }

    pub fn range_is_empty(&self, block: BlockRef) -> bool {
        self.block(block).first.is_none()
    }

    /// Nodes of the block's range, first to last.
    pub fn range_nodes(&self, block: BlockRef) -> impl Iterator<Item = NodeRef> + '_ {
        std::iter::successors(self.block(block).first, move |&node| self.node(node).next)
    }

    /// Nodes of the block's range, last to first.
    pub fn range_nodes_rev(&self, block: BlockRef) -> impl Iterator<Item = NodeRef> + '_ {
        std::iter::successors(self.block(block).last, move |&node| self.node(node).prev)
    }

    pub fn in_range(&self, block: BlockRef, node: NodeRef) -> bool {
        self.node(node).block == Some(block)
    }

    /// Forget the block's range ends. Nodes are left untouched.
    pub fn reset_range(&mut self, block: BlockRef) {
        let data = self.block_mut(block);
        data.first = None;
        data.last = None;
    }

    /// Append the statement's threaded nodes, `first` through `root`, to the
    /// end of the block's range.
    ///
    /// # Panics
    ///
    /// Panics if the statement's thread does not end at its root, or if one of
    /// its nodes already belongs to a range.
    pub fn splice_statement(&mut self, block: BlockRef, stmt: StmtRef) {
        let (first, root) = {
            let stmt = self.stmt(stmt);
            (stmt.first, stmt.root)
        };
        let mut nodes = Vec::new();
        let mut cursor = Some(first);
        while let Some(node) = cursor {
            nodes.push(node);
            if node == root {
                break;
            }
            cursor = self.node(node).next;
        }
        assert_eq!(
            nodes.last(),
            Some(&root),
            "splice_statement: thread of {stmt} does not reach its root {root}"
        );
        tracing::trace!("splice {stmt} ({} node(s)) into {block}", nodes.len());
        let last = self.block(block).last;
        self.splice_between(block, last, None, &nodes);
    }

    pub fn push_back(&mut self, block: BlockRef, node: NodeRef) {
        let last = self.block(block).last;
        self.splice_between(block, last, None, &[node]);
    }

    /// Insert `nodes`, in order, immediately before `anchor`.
    ///
    /// # Panics
    ///
    /// Panics if `anchor` is not in the block's range or a node is already in
    /// a range.
    pub fn insert_before(&mut self, block: BlockRef, anchor: NodeRef, nodes: &[NodeRef]) {
        self.assert_member(block, anchor, "insert_before");
        let prev = self.node(anchor).prev;
        self.splice_between(block, prev, Some(anchor), nodes);
    }

    /// Insert `nodes`, in order, immediately after `anchor`.
    ///
    /// # Panics
    ///
    /// Same conditions as [`MethodIr::insert_before`].
    pub fn insert_after(&mut self, block: BlockRef, anchor: NodeRef, nodes: &[NodeRef]) {
        self.assert_member(block, anchor, "insert_after");
        let next = self.node(anchor).next;
        self.splice_between(block, Some(anchor), next, nodes);
    }

    /// Unlink one node from the block's range.
    pub fn remove(&mut self, block: BlockRef, node: NodeRef) {
        self.remove_range(block, node, node);
    }

    /// Unlink the contiguous run `first..=last` and return its nodes.
    ///
    /// # Panics
    ///
    /// Panics if either end is outside the block's range or `last` does not
    /// follow `first`.
    pub fn remove_range(&mut self, block: BlockRef, first: NodeRef, last: NodeRef) -> Vec<NodeRef> {
        self.assert_member(block, first, "remove_range");
        self.assert_member(block, last, "remove_range");

        let mut nodes = Vec::new();
        let mut cursor = Some(first);
        loop {
            let Some(node) = cursor else {
                panic!("remove_range: {last} does not follow {first} in {block}");
            };
            nodes.push(node);
            if node == last {
                break;
            }
            cursor = self.node(node).next;
        }

        let before = self.node(first).prev;
        let after = self.node(last).next;
        match before {
            Some(before) => self.node_mut(before).next = after,
            None => self.block_mut(block).first = after,
        }
        match after {
            Some(after) => self.node_mut(after).prev = before,
            None => self.block_mut(block).last = before,
        }
        for &node in &nodes {
            let data = self.node_mut(node);
            data.prev = None;
            data.next = None;
            data.block = None;
        }
        nodes
    }

    /// Remove the nodes of a tree range and mark them dead.
    ///
    /// A closed range is unlinked as one run. Otherwise only the subtree's
    /// own nodes go and whatever is interleaved with them stays in place.
    pub fn delete_range(&mut self, block: BlockRef, range: &TreeRange) {
        tracing::trace!(
            "delete {}..{} ({} node(s), closed: {}) from {block}",
            range.first,
            range.last,
            range.nodes.len(),
            range.is_closed
        );
        let removed = if range.is_closed {
            self.remove_range(block, range.first, range.last)
        } else {
            for &node in &range.nodes {
                self.remove(block, node);
            }
            range.nodes.clone()
        };
        for node in removed {
            self.node_mut(node).dead = true;
        }
    }

    /// Find the range segment occupied by the subtree rooted at `root`.
    ///
    /// Walks backwards from `root` until every operand of the subtree has been
    /// seen. List cells that are no longer in the range are looked through.
    ///
    /// # Panics
    ///
    /// Panics if `root` or one of its operands is missing from the range
    /// before it.
    pub fn tree_range(&self, block: BlockRef, root: NodeRef) -> TreeRange {
        self.assert_member(block, root, "tree_range");

        let mut pending = HashSet::from([root]);
        let mut nodes = Vec::new();
        let mut side_effects = NodeFlags::empty();
        let mut is_closed = true;
        let mut cursor = Some(root);
        while !pending.is_empty() {
            let Some(node) = cursor else {
                panic!("tree_range: operands of {root} are missing from {block}");
            };
            if pending.remove(&node) {
                self.mark_operands(block, node, &mut pending);
                side_effects |= self.node(node).flags.effects();
                nodes.push(node);
            } else {
                is_closed = false;
            }
            cursor = self.node(node).prev;
        }
        nodes.reverse();

        TreeRange {
            first: nodes[0],
            last: root,
            is_closed,
            side_effects,
            nodes,
        }
    }

    /// Operands of `node` as seen in LIR: list cells that left the range are
    /// replaced by their items and removed argument placeholders are skipped.
    pub fn range_operands(&self, block: BlockRef, node: NodeRef) -> SmallVec<[NodeRef; 4]> {
        let mut operands = SmallVec::new();
        self.collect_range_operands(block, node, &mut operands);
        operands
    }

    fn collect_range_operands(
        &self,
        block: BlockRef,
        node: NodeRef,
        operands: &mut SmallVec<[NodeRef; 4]>,
    ) {
        for operand in self.node(node).kind.operands() {
            let data = self.node(operand);
            if self.in_range(block, operand) {
                operands.push(operand);
            } else if data.is_any_list() {
                self.collect_range_operands(block, operand, operands);
            } else if data.oper() != Oper::ArgPlace {
                // Placeholders leave no trace once removed.
                operands.push(operand);
            }
        }
    }

    fn mark_operands(&self, block: BlockRef, node: NodeRef, pending: &mut HashSet<NodeRef>) {
        pending.extend(self.range_operands(block, node));
    }

    fn assert_member(&self, block: BlockRef, node: NodeRef, op: &str) {
        assert!(
            self.in_range(block, node),
            "{op}: {node} is not in the range of {block}"
        );
    }

    fn splice_between(
        &mut self,
        block: BlockRef,
        prev: Option<NodeRef>,
        next: Option<NodeRef>,
        nodes: &[NodeRef],
    ) {
        let mut cursor = prev;
        for &node in nodes {
            let data = self.node_mut(node);
            assert!(
                data.block.is_none() && !data.dead,
                "splice: {node} is already in a range or was deleted"
            );
            data.block = Some(block);
            data.prev = cursor;
            match cursor {
                Some(prev) => self.node_mut(prev).next = Some(node),
                None => self.block_mut(block).first = Some(node),
            }
            cursor = Some(node);
        }
        if let Some(tail) = cursor.filter(|_| !nodes.is_empty()) {
            self.node_mut(tail).next = next;
            match next {
                Some(next) => self.node_mut(next).prev = Some(tail),
                None => self.block_mut(block).last = Some(tail),
            }
        }
    }
}
