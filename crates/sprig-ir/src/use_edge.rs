//! Use edges: the slot a node's value flows into.
//!
//! A [`Use`] is either an operand slot of a user node or the root slot of a
//! statement (a dummy use, whose value nobody consumes). Rewrite rules replace
//! a subtree through its use without caring which kind of slot it is.
//!
//! A `Use` is only meaningful while the tree around it is unchanged; build a
//! fresh one for every rewrite step.

use crate::context::MethodIr;
use crate::refs::{NodeRef, StmtRef};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UseSite {
    /// The statement root.
    Root(StmtRef),
    /// An operand slot of the given user.
    Operand(NodeRef),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Use {
    site: UseSite,
    def: NodeRef,
}

impl Use {
    /// The use of a node standing alone as the root of `stmt`.
    pub fn dummy(stmt: StmtRef, def: NodeRef) -> Self {
        Self {
            site: UseSite::Root(stmt),
            def,
        }
    }

    /// The use of `def` by one of `user`'s operand slots.
    pub fn operand(user: NodeRef, def: NodeRef) -> Self {
        Self {
            site: UseSite::Operand(user),
            def,
        }
    }

    /// The node currently occupying this use.
    pub fn def(&self) -> NodeRef {
        self.def
    }

    pub fn site(&self) -> UseSite {
        self.site
    }

    pub fn user(&self) -> Option<NodeRef> {
        match self.site {
            UseSite::Operand(user) => Some(user),
            UseSite::Root(_) => None,
        }
    }

    pub fn is_dummy_use(&self) -> bool {
        matches!(self.site, UseSite::Root(_))
    }

    /// Install `new` in this use's slot.
    ///
    /// Effect flags are not touched here: the walk folds the effects of the
    /// node occupying each use into its user once the rewrite returns.
    ///
    /// # Panics
    ///
    /// Panics if the user no longer holds the current def in any slot.
    pub fn replace_with(&mut self, ir: &mut MethodIr, new: NodeRef) {
        match self.site {
            UseSite::Operand(user) => {
                let replaced = ir.node_mut(user).kind.replace_operand(self.def, new);
                assert!(
                    replaced,
                    "replace_with: {user} has no operand {}",
                    self.def
                );
            }
            UseSite::Root(stmt) => {
                ir.stmt_mut(stmt).root = new;
            }
        }
        self.def = new;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::BinaryOp;
    use crate::types::VarType;

    #[test]
    fn operand_use_rewrites_user_slot() {
        let mut ir = MethodIr::new();
        let a = ir.cns_int(VarType::Int, 1);
        let b = ir.cns_int(VarType::Int, 2);
        let c = ir.cns_int(VarType::Int, 3);
        let add = ir.binary(BinaryOp::Add, VarType::Int, a, b);

        let mut edge = Use::operand(add, b);
        assert!(!edge.is_dummy_use());
        assert_eq!(edge.user(), Some(add));
        edge.replace_with(&mut ir, c);
        assert_eq!(edge.def(), c);
        assert_eq!(ir.node(add).kind.operands().as_slice(), &[a, c]);
    }

    #[test]
    fn dummy_use_rewrites_statement_root() {
        let mut ir = MethodIr::new();
        let block = ir.create_block();
        let a = ir.cns_int(VarType::Int, 1);
        let b = ir.cns_int(VarType::Int, 2);
        let stmt = ir.append_statement(block, a, None);

        let mut edge = Use::dummy(stmt, a);
        assert!(edge.is_dummy_use());
        assert_eq!(edge.user(), None);
        edge.replace_with(&mut ir, b);
        assert_eq!(ir.stmt(stmt).root, b);
    }

    #[test]
    #[should_panic(expected = "has no operand")]
    fn stale_use_panics() {
        let mut ir = MethodIr::new();
        let a = ir.cns_int(VarType::Int, 1);
        let b = ir.cns_int(VarType::Int, 2);
        let c = ir.cns_int(VarType::Int, 3);
        let add = ir.binary(BinaryOp::Add, VarType::Int, a, b);
        let mut edge = Use::operand(add, c);
        edge.replace_with(&mut ir, a);
    }
}
