//! Per-node flag bits.

bitflags::bitflags! {
    /// Side-effect, ordering, and liveness flags of a node.
    ///
    /// In HIR the effect bits of a node summarize its whole subtree. Once a
    /// node is in a block's range, effects are expressed by position and the
    /// bits describe the node alone.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u32 {
        /// Writes to memory or a local.
        const ASG = 1 << 0;
        /// Contains a call.
        const CALL = 1 << 1;
        /// May raise an exception.
        const EXCEPT = 1 << 2;
        /// Reads global (heap or static) state.
        const GLOB_REF = 1 << 3;
        /// Must not be reordered with other ordered operations.
        const ORDER_SIDEEFF = 1 << 4;

        /// Operands are evaluated right to left.
        const REVERSE_OPS = 1 << 5;

        /// Local node is the target of a definition.
        const VAR_DEF = 1 << 6;
        /// Definition that also reads (partial write of a local).
        const VAR_USEASG = 1 << 7;

        const IND_VOLATILE = 1 << 8;
        const IND_UNALIGNED = 1 << 9;

        /// Indirection is the target of an assignment.
        const IND_ASG_LHS = 1 << 10;
        /// Same bit as `IND_ASG_LHS`; register allocation reads it on LIR nodes.
        const NODE_MEANS_REG = 1 << 10;

        const DONT_CSE = 1 << 11;
        /// Relop feeds a qmark condition.
        const RELOP_QMARK = 1 << 12;
        /// Value is produced but nothing consumes it.
        const UNUSED_VALUE = 1 << 13;

        const SIDE_EFFECT = Self::ASG.bits() | Self::CALL.bits() | Self::EXCEPT.bits();
        const GLOB_EFFECT = Self::SIDE_EFFECT.bits() | Self::GLOB_REF.bits();
        const ALL_EFFECT = Self::GLOB_EFFECT.bits() | Self::ORDER_SIDEEFF.bits();
        const LIVENESS_MASK = Self::VAR_DEF.bits() | Self::VAR_USEASG.bits();
        const IND_FLAGS = Self::IND_VOLATILE.bits() | Self::IND_UNALIGNED.bits();
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Spelling of individual flags in the textual formats, in print order.
pub const FLAG_NAMES: &[(&str, NodeFlags)] = &[
    ("asg", NodeFlags::ASG),
    ("call", NodeFlags::CALL),
    ("except", NodeFlags::EXCEPT),
    ("glob", NodeFlags::GLOB_REF),
    ("order", NodeFlags::ORDER_SIDEEFF),
    ("rev", NodeFlags::REVERSE_OPS),
    ("def", NodeFlags::VAR_DEF),
    ("useasg", NodeFlags::VAR_USEASG),
    ("volatile", NodeFlags::IND_VOLATILE),
    ("unaligned", NodeFlags::IND_UNALIGNED),
    ("asg_lhs", NodeFlags::IND_ASG_LHS),
    ("dont_cse", NodeFlags::DONT_CSE),
    ("qmark", NodeFlags::RELOP_QMARK),
    ("unused", NodeFlags::UNUSED_VALUE),
];

impl NodeFlags {
    /// Looks up a flag by its textual HIR name (`rev`, `def`, ...).
    pub fn from_text_name(name: &str) -> Option<NodeFlags> {
        FLAG_NAMES
            .iter()
            .find(|(flag_name, _)| *flag_name == name)
            .map(|(_, flag)| *flag)
    }

    /// Names of the set flags, in `FLAG_NAMES` order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        FLAG_NAMES
            .iter()
            .filter(move |(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
    }

    pub fn effects(self) -> NodeFlags {
        self & NodeFlags::ALL_EFFECT
    }
}
