//! HIR node constructors.
//!
//! These stand in for the importer: each constructor computes the effect
//! flags the front end would attach, so a freshly built tree satisfies the
//! HIR rule that a node's effects cover those of its subtree.

use crate::context::MethodIr;
use crate::flags::NodeFlags;
use crate::node::*;
use crate::refs::{BlockRef, LayoutRef, LocalRef, NodeRef, StaticRef};
use crate::types::{IntrinsicId, SimdIntrinsic, VarType};

/// Effects a node has on its own, ignoring its operands.
fn own_effects(kind: &NodeKind) -> NodeFlags {
    match kind {
        NodeKind::Assign { .. } | NodeKind::StoreLclVar { .. } | NodeKind::StoreLclFld { .. } => {
            NodeFlags::ASG
        }
        NodeKind::StoreInd { .. }
        | NodeKind::StoreBlk(_)
        | NodeKind::StoreObj(_)
        | NodeKind::StoreDynBlk(_) => NodeFlags::ASG | NodeFlags::EXCEPT | NodeFlags::GLOB_REF,
        NodeKind::Call(_) => NodeFlags::CALL,
        NodeKind::Ind(_) | NodeKind::Blk(_) | NodeKind::Obj(_) | NodeKind::DynBlk(_) => {
            NodeFlags::EXCEPT | NodeFlags::GLOB_REF
        }
        NodeKind::ClsVar(_) => NodeFlags::GLOB_REF,
        NodeKind::Binary { op, .. } if op.may_throw() => NodeFlags::EXCEPT,
        _ => NodeFlags::empty(),
    }
}

impl MethodIr {
    /// Create a node whose effect flags cover its own effects and those of
    /// its operands.
    pub fn build(&mut self, kind: NodeKind, ty: VarType) -> NodeRef {
        self.build_with_flags(kind, ty, NodeFlags::empty())
    }

    /// Like [`MethodIr::build`], with extra flags ORed in.
    pub fn build_with_flags(&mut self, kind: NodeKind, ty: VarType, extra: NodeFlags) -> NodeRef {
        let flags = self.implied_effects(&kind) | extra;
        self.create_node(kind, ty, flags)
    }

    /// Effect flags the front end derives for `kind` from its operator and
    /// current operands.
    pub fn implied_effects(&self, kind: &NodeKind) -> NodeFlags {
        kind.operands()
            .into_iter()
            .fold(own_effects(kind), |flags, operand| {
                flags | self.node(operand).flags.effects()
            })
    }

    pub fn cns_int(&mut self, ty: VarType, value: i64) -> NodeRef {
        self.build(NodeKind::CnsInt(value), ty)
    }

    pub fn cns_dbl(&mut self, ty: VarType, value: f64) -> NodeRef {
        self.build(NodeKind::CnsDbl(value), ty)
    }

    /// Read of a whole local, typed as the local.
    pub fn lcl_var(&mut self, local: LocalRef) -> NodeRef {
        let ty = self.local(local).ty;
        self.build(NodeKind::LclVar(LclVarNode { local }), ty)
    }

    pub fn lcl_fld(&mut self, ty: VarType, local: LocalRef, offset: u32) -> NodeRef {
        let fld = LclFldNode {
            local,
            offset,
            field_seq: None,
        };
        self.build(NodeKind::LclFld(fld), ty)
    }

    pub fn lcl_var_addr(&mut self, local: LocalRef) -> NodeRef {
        self.build(NodeKind::LclVarAddr(LclVarNode { local }), VarType::Byref)
    }

    pub fn cls_var(&mut self, ty: VarType, slot: StaticRef) -> NodeRef {
        self.build(NodeKind::ClsVar(slot), ty)
    }

    pub fn unary(&mut self, op: UnaryOp, ty: VarType, operand: NodeRef) -> NodeRef {
        self.build(NodeKind::Unary { op, operand }, ty)
    }

    pub fn binary(&mut self, op: BinaryOp, ty: VarType, op1: NodeRef, op2: NodeRef) -> NodeRef {
        self.build(NodeKind::Binary { op, op1, op2 }, ty)
    }

    /// `target = value`, typed as the target.
    ///
    /// Local targets are flagged as definitions, partial local targets also
    /// as uses, and indirection targets as assignment left-hand sides.
    pub fn assign(&mut self, target: NodeRef, value: NodeRef) -> NodeRef {
        let target_data = self.node_mut(target);
        match target_data.oper() {
            Oper::LclVar => target_data.flags.insert(NodeFlags::VAR_DEF),
            Oper::LclFld => target_data
                .flags
                .insert(NodeFlags::VAR_DEF | NodeFlags::VAR_USEASG),
            Oper::Ind => target_data.flags.insert(NodeFlags::IND_ASG_LHS),
            _ => {}
        }
        let ty = target_data.ty;
        self.build(NodeKind::Assign { target, value }, ty)
    }

    pub fn comma(&mut self, first: NodeRef, second: NodeRef) -> NodeRef {
        let ty = self.node(second).ty;
        self.build(NodeKind::Comma { first, second }, ty)
    }

    pub fn addr_of(&mut self, operand: NodeRef) -> NodeRef {
        self.build(NodeKind::AddrOf(operand), VarType::Byref)
    }

    pub fn ind(&mut self, ty: VarType, addr: NodeRef) -> NodeRef {
        self.build(NodeKind::Ind(addr), ty)
    }

    pub fn blk(&mut self, addr: NodeRef, size: u32) -> NodeRef {
        let blk = BlkNode {
            addr,
            data: None,
            size,
        };
        self.build(NodeKind::Blk(blk), VarType::Struct)
    }

    pub fn obj(&mut self, ty: VarType, addr: NodeRef, layout: LayoutRef) -> NodeRef {
        let obj = ObjNode {
            addr,
            data: None,
            layout,
        };
        self.build(NodeKind::Obj(obj), ty)
    }

    pub fn dyn_blk(&mut self, addr: NodeRef, size: NodeRef, eval_size_first: bool) -> NodeRef {
        let blk = DynBlkNode {
            addr,
            data: None,
            size,
            eval_size_first,
        };
        self.build(NodeKind::DynBlk(blk), VarType::Struct)
    }

    /// Chain `args` into `list` cells. Returns the head cell.
    pub fn arg_list(&mut self, args: &[NodeRef]) -> Option<NodeRef> {
        let mut tail = None;
        for &head in args.iter().rev() {
            tail = Some(self.build(NodeKind::List(ListNode { head, tail }), VarType::Void));
        }
        tail
    }

    pub fn call(&mut self, method: impl Into<String>, ty: VarType, args: &[NodeRef]) -> NodeRef {
        let args = self.arg_list(args);
        let call = CallNode {
            method: method.into(),
            args,
            multi_reg_ret: false,
        };
        self.build(NodeKind::Call(call), ty)
    }

    /// # Panics
    ///
    /// Panics if the operand count does not match the intrinsic's arity.
    pub fn intrinsic(&mut self, id: IntrinsicId, ty: VarType, operands: &[NodeRef]) -> NodeRef {
        assert_eq!(
            operands.len(),
            id.arity(),
            "intrinsic {id} takes {} operand(s)",
            id.arity()
        );
        let intrinsic = IntrinsicNode {
            id,
            op1: operands[0],
            op2: operands.get(1).copied(),
        };
        self.build(NodeKind::Intrinsic(intrinsic), ty)
    }

    pub fn simd(
        &mut self,
        id: SimdIntrinsic,
        ty: VarType,
        base_type: VarType,
        size: u32,
        op1: NodeRef,
        op2: Option<NodeRef>,
    ) -> NodeRef {
        let simd = SimdNode {
            id,
            base_type,
            size,
            op1,
            op2,
        };
        self.build(NodeKind::Simd(simd), ty)
    }

    pub fn hw_intrinsic(
        &mut self,
        name: impl Into<String>,
        ty: VarType,
        op1: NodeRef,
        op2: Option<NodeRef>,
    ) -> NodeRef {
        let hw = HwIntrinsicNode {
            name: name.into(),
            op1,
            op2,
        };
        self.build(NodeKind::HwIntrinsic(hw), ty)
    }

    pub fn nop(&mut self, operand: Option<NodeRef>) -> NodeRef {
        let ty = operand.map_or(VarType::Void, |op| self.node(op).ty);
        self.build(NodeKind::Nop(operand), ty)
    }

    pub fn box_value(&mut self, operand: NodeRef) -> NodeRef {
        self.build(NodeKind::Box(operand), VarType::Ref)
    }

    pub fn arg_place(&mut self, ty: VarType) -> NodeRef {
        self.build(NodeKind::ArgPlace, ty)
    }

    pub fn qmark(&mut self, ty: VarType, cond: NodeRef, colon: NodeRef) -> NodeRef {
        self.build(NodeKind::Qmark { cond, colon }, ty)
    }

    pub fn colon(&mut self, ty: VarType, then_value: NodeRef, else_value: NodeRef) -> NodeRef {
        self.build(
            NodeKind::Colon {
                then_value,
                else_value,
            },
            ty,
        )
    }

    pub fn phi(&mut self, ty: VarType, args: &[NodeRef]) -> NodeRef {
        self.build(NodeKind::Phi(args.iter().copied().collect()), ty)
    }

    pub fn phi_arg(&mut self, ty: VarType, local: LocalRef, pred: BlockRef) -> NodeRef {
        self.build(NodeKind::PhiArg(PhiArgNode { local, pred }), ty)
    }

    pub fn ret(&mut self, operand: Option<NodeRef>) -> NodeRef {
        self.build(NodeKind::Return(operand), VarType::Void)
    }

    pub fn jtrue(&mut self, cond: NodeRef) -> NodeRef {
        self.build(NodeKind::JTrue(cond), VarType::Void)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LocalVarDsc;

    #[test]
    fn effects_bubble_to_parents() {
        let mut ir = MethodIr::new();
        let local = ir.add_local(LocalVarDsc::new(VarType::Int));
        let call = ir.call("M", VarType::Int, &[]);
        let one = ir.cns_int(VarType::Int, 1);
        let add = ir.binary(BinaryOp::Add, VarType::Int, call, one);
        let target = ir.lcl_var(local);
        let asg = ir.assign(target, add);

        assert_eq!(ir.node(add).flags, NodeFlags::CALL);
        assert_eq!(ir.node(asg).flags, NodeFlags::ASG | NodeFlags::CALL);
        assert!(ir.node(target).flags.contains(NodeFlags::VAR_DEF));
    }

    #[test]
    fn indirections_may_fault() {
        let mut ir = MethodIr::new();
        let addr = ir.cns_int(VarType::IntPtr, 0x1000);
        let ind = ir.ind(VarType::Int, addr);
        assert_eq!(ir.node(ind).flags, NodeFlags::EXCEPT | NodeFlags::GLOB_REF);

        let zero = ir.cns_int(VarType::Int, 0);
        let div = ir.binary(BinaryOp::Div, VarType::Int, ind, zero);
        assert!(ir.node(div).flags.contains(NodeFlags::EXCEPT));
    }

    #[test]
    fn call_arguments_are_listed() {
        let mut ir = MethodIr::new();
        let a = ir.cns_int(VarType::Int, 1);
        let b = ir.cns_int(VarType::Int, 2);
        let call = ir.call("M", VarType::Void, &[a, b]);
        let NodeKind::Call(CallNode { args: Some(head), .. }) = ir.node(call).kind.clone() else {
            panic!("expected a call with arguments");
        };
        let NodeKind::List(first) = ir.node(head).kind else {
            panic!("expected a list cell");
        };
        assert_eq!(first.head, a);
        let tail = first.tail.expect("second cell");
        assert_eq!(
            ir.node(tail).kind,
            NodeKind::List(ListNode {
                head: b,
                tail: None
            })
        );
    }

    #[test]
    #[should_panic(expected = "takes 2 operand(s)")]
    fn intrinsic_arity_is_checked() {
        let mut ir = MethodIr::new();
        let x = ir.cns_dbl(VarType::Double, 2.0);
        ir.intrinsic(IntrinsicId::Pow, VarType::Double, &[x]);
    }
}
