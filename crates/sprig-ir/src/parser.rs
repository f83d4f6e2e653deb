//! Textual HIR parser.
//!
//! Reads the s-expression format written by [`crate::printer::print_hir`].
//!
//! # Two-stage parsing
//!
//! 1. **Raw parse**: winnow combinators read the text into `Sexp` trees.
//! 2. **Build**: `HirBuilder` turns the trees into layouts, locals, blocks
//!    and statements of a fresh [`MethodIr`], deriving effect flags the way
//!    the importer does.
//!
//! Node syntax is `(oper[:type] !flag... field... operand...)`. Layouts,
//! locals and blocks are named by position (`L0`, `V0`, `BB0`, ...), and a
//! `;` starts a comment that runs to the end of the line.

use cranelift_entity::EntityRef;
use winnow::combinator::{alt, delimited, repeat, terminated};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

use crate::context::MethodIr;
use crate::flags::NodeFlags;
use crate::node::*;
use crate::refs::*;
use crate::types::*;

// ============================================================================
// Error type
// ============================================================================

/// Parse error for the textual HIR format.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error at offset {}: {}", self.offset, self.message)
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// Raw parse
// ============================================================================

#[derive(Debug)]
struct Sexp<'a> {
    item: Item<'a>,
    /// Input length remaining where this expression starts.
    rest: usize,
}

#[derive(Debug)]
enum Item<'a> {
    Atom(&'a str),
    Str(&'a str),
    List(Vec<Sexp<'a>>),
}

/// Skip whitespace and `;` comments.
fn ws(input: &mut &str) -> ModalResult<()> {
    repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            (';', take_till(0.., '\n')).void(),
        )),
    )
    .parse_next(input)
}

fn sexp<'a>(input: &mut &'a str) -> ModalResult<Sexp<'a>> {
    let rest = input.len();
    let item = alt((
        delimited(('(', ws), repeat(0.., terminated(sexp, ws)), ')').map(Item::List),
        delimited('"', take_till(0.., '"'), '"').map(Item::Str),
        take_while(1.., |c: char| {
            !c.is_ascii_whitespace() && !matches!(c, '(' | ')' | '"' | ';')
        })
        .map(Item::Atom),
    ))
    .parse_next(input)?;
    Ok(Sexp { item, rest })
}

// ============================================================================
// HirBuilder (Sexp -> MethodIr)
// ============================================================================

struct HirBuilder {
    ir: MethodIr,
    source_len: usize,
    block_count: usize,
}

type Result<T> = std::result::Result<T, ParseError>;

impl HirBuilder {
    fn new(source_len: usize) -> Self {
        Self {
            ir: MethodIr::new(),
            source_len,
            block_count: 0,
        }
    }

    fn error(&self, at: &Sexp<'_>, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            offset: self.source_len - at.rest,
        }
    }

    // ----------------------------------------------------------------
    // Token helpers
    // ----------------------------------------------------------------

    /// Split `(head args...)` into its head atom and arguments.
    fn form<'s, 'a>(&self, sexp: &'s Sexp<'a>) -> Result<(&'a str, &'s [Sexp<'a>])> {
        match &sexp.item {
            Item::List(items) => match items.split_first() {
                Some((
                    Sexp {
                        item: Item::Atom(head),
                        ..
                    },
                    args,
                )) => Ok((*head, args)),
                _ => Err(self.error(sexp, "expected a form starting with a name")),
            },
            _ => Err(self.error(sexp, "expected `(`")),
        }
    }

    fn atom<'a>(&self, sexp: &Sexp<'a>) -> Result<&'a str> {
        match sexp.item {
            Item::Atom(atom) => Ok(atom),
            _ => Err(self.error(sexp, "expected an atom")),
        }
    }

    fn int(&self, sexp: &Sexp<'_>) -> Result<i64> {
        let atom = self.atom(sexp)?;
        let (negative, digits) = match atom.strip_prefix('-') {
            Some(digits) => (true, digits),
            None => (false, atom),
        };
        let magnitude = match digits.strip_prefix("0x") {
            Some(hex) => i64::from_str_radix(hex, 16),
            None => digits.parse::<i64>(),
        }
        .map_err(|_| self.error(sexp, format!("invalid integer `{atom}`")))?;
        Ok(if negative { -magnitude } else { magnitude })
    }

    fn uint(&self, sexp: &Sexp<'_>) -> Result<u32> {
        let value = self.int(sexp)?;
        u32::try_from(value).map_err(|_| self.error(sexp, format!("{value} is out of range")))
    }

    fn var_type(&self, sexp: &Sexp<'_>) -> Result<VarType> {
        let name = self.atom(sexp)?;
        VarType::from_name(name).ok_or_else(|| self.error(sexp, format!("unknown type `{name}`")))
    }

    /// Parse `<prefix><index>` naming one of `count` entities.
    fn entity<E: EntityRef>(&self, sexp: &Sexp<'_>, prefix: &str, count: usize) -> Result<E> {
        let atom = self.atom(sexp)?;
        let index = atom
            .strip_prefix(prefix)
            .and_then(|digits| digits.parse::<usize>().ok())
            .ok_or_else(|| self.error(sexp, format!("expected `{prefix}<n>`, found `{atom}`")))?;
        if index >= count {
            return Err(self.error(sexp, format!("`{atom}` is not declared")));
        }
        Ok(E::new(index))
    }

    fn local(&self, sexp: &Sexp<'_>) -> Result<LocalRef> {
        self.entity(sexp, "V", self.ir.locals().count())
    }

    fn field<'s, 'a>(
        &self,
        at: &Sexp<'_>,
        fields: &[&'s Sexp<'a>],
        index: usize,
    ) -> Result<&'s Sexp<'a>> {
        fields
            .get(index)
            .copied()
            .ok_or_else(|| self.error(at, format!("missing field #{index}")))
    }

    fn operands<const N: usize>(&self, at: &Sexp<'_>, oper: Oper, children: &[NodeRef]) -> Result<[NodeRef; N]> {
        <[NodeRef; N]>::try_from(children).map_err(|_| {
            self.error(
                at,
                format!("`{oper}` takes {N} operand(s), found {}", children.len()),
            )
        })
    }

    fn one_or_two(&self, at: &Sexp<'_>, oper: Oper, children: &[NodeRef]) -> Result<(NodeRef, Option<NodeRef>)> {
        match children {
            [op1] => Ok((*op1, None)),
            [op1, op2] => Ok((*op1, Some(*op2))),
            _ => Err(self.error(
                at,
                format!("`{oper}` takes 1 or 2 operands, found {}", children.len()),
            )),
        }
    }

    // ----------------------------------------------------------------
    // Method structure
    // ----------------------------------------------------------------

    fn build_method(&mut self, top: &Sexp<'_>) -> Result<()> {
        let (head, items) = self.form(top)?;
        if head != "method" {
            return Err(self.error(top, format!("expected `method`, found `{head}`")));
        }

        // Declarations first, so statements may refer to any block.
        let mut blocks = Vec::new();
        for item in items {
            let (head, args) = self.form(item)?;
            match head {
                "layout" => self.declare_layout(item, args)?,
                "local" => self.declare_local(item, args)?,
                "block" => {
                    let name = args.first().ok_or_else(|| self.error(item, "missing block name"))?;
                    self.expect_name(name, "BB", self.block_count)?;
                    self.block_count += 1;
                    blocks.push((self.ir.create_block(), &args[1..]));
                }
                other => return Err(self.error(item, format!("unknown item `{other}`"))),
            }
        }

        for (block, stmts) in blocks {
            for stmt in stmts {
                self.build_stmt(block, stmt)?;
            }
        }
        Ok(())
    }

    fn expect_name(&self, sexp: &Sexp<'_>, prefix: &str, index: usize) -> Result<()> {
        let atom = self.atom(sexp)?;
        if atom != format!("{prefix}{index}") {
            return Err(self.error(sexp, format!("expected `{prefix}{index}`, found `{atom}`")));
        }
        Ok(())
    }

    fn declare_layout(&mut self, at: &Sexp<'_>, args: &[Sexp<'_>]) -> Result<()> {
        let [name, size, rest @ ..] = args else {
            return Err(self.error(at, "expected `(layout L<n> <size> [(gc ...)])`"));
        };
        self.expect_name(name, "L", self.ir.layouts().count())?;
        let size = self.uint(size)?;
        let mut gc_slots = Vec::new();
        if let Some(gc) = rest.first() {
            let (head, slots) = self.form(gc)?;
            if head != "gc" {
                return Err(self.error(gc, format!("expected `gc`, found `{head}`")));
            }
            for slot in slots {
                gc_slots.push(match self.atom(slot)? {
                    "none" => GcSlot::None,
                    "ref" => GcSlot::Ref,
                    "byref" => GcSlot::Byref,
                    other => return Err(self.error(slot, format!("unknown gc slot `{other}`"))),
                });
            }
        }
        self.ir.add_layout(ClassLayout::new(size, gc_slots));
        Ok(())
    }

    fn declare_local(&mut self, at: &Sexp<'_>, args: &[Sexp<'_>]) -> Result<()> {
        let [name, ty, rest @ ..] = args else {
            return Err(self.error(at, "expected `(local V<n> <type> ...)`"));
        };
        self.expect_name(name, "V", self.ir.locals().count())?;
        let ty = self.var_type(ty)?;
        match (ty, rest) {
            (VarType::Struct, [layout]) => {
                let layout = self.entity(layout, "L", self.ir.layouts().count())?;
                self.ir.add_struct_local(layout);
            }
            (ty, [base]) if ty.is_simd() => {
                let mut local = LocalVarDsc::new(ty);
                local.simd_base = Some(self.var_type(base)?);
                self.ir.add_local(local);
            }
            (VarType::Struct, _) => return Err(self.error(at, "struct locals need a layout")),
            (ty, []) if !ty.is_simd() => {
                self.ir.add_local(LocalVarDsc::new(ty));
            }
            _ => return Err(self.error(at, "unexpected local fields")),
        }
        Ok(())
    }

    fn build_stmt(&mut self, block: BlockRef, sexp: &Sexp<'_>) -> Result<()> {
        let (head, args) = self.form(sexp)?;
        if head != "stmt" {
            return Err(self.error(sexp, format!("expected `stmt`, found `{head}`")));
        }
        let (il_offset, tree) = match args {
            [tree] => (None, tree),
            [offset, tree] => (Some(IlOffset(self.uint(offset)?)), tree),
            _ => return Err(self.error(sexp, "expected `(stmt [offset] tree)`")),
        };
        let root = self.build_node(tree)?;
        self.ir.append_statement(block, root, il_offset);
        Ok(())
    }

    // ----------------------------------------------------------------
    // Nodes
    // ----------------------------------------------------------------

    fn build_node(&mut self, sexp: &Sexp<'_>) -> Result<NodeRef> {
        let (head, args) = self.form(sexp)?;
        let (name, ty) = match head.split_once(':') {
            Some((name, ty)) => {
                let ty = VarType::from_name(ty)
                    .ok_or_else(|| self.error(sexp, format!("unknown type `{ty}`")))?;
                (name, Some(ty))
            }
            None => (head, None),
        };
        let oper =
            Oper::from_name(name).ok_or_else(|| self.error(sexp, format!("unknown operator `{name}`")))?;

        let mut flags = NodeFlags::empty();
        let mut fields = Vec::new();
        let mut children = Vec::new();
        for arg in args {
            match &arg.item {
                Item::Atom(atom) if atom.starts_with('!') => {
                    flags |= NodeFlags::from_text_name(&atom[1..])
                        .ok_or_else(|| self.error(arg, format!("unknown flag `{atom}`")))?;
                }
                Item::List(_) => children.push(self.build_node(arg)?),
                _ => fields.push(arg),
            }
        }

        if oper == Oper::Assign {
            let [target, value] = self.operands(sexp, oper, &children)?;
            let node = self.ir.assign(target, value);
            let data = self.ir.node_mut(node);
            data.flags |= flags;
            if let Some(ty) = ty {
                data.ty = ty;
            }
            return Ok(node);
        }

        let kind = self.node_kind(sexp, oper, &fields, &children)?;
        let ty = match ty.or_else(|| self.default_type(&kind)) {
            Some(ty) => ty,
            None => return Err(self.error(sexp, format!("`{oper}` needs an explicit type"))),
        };
        Ok(self.ir.build_with_flags(kind, ty, flags))
    }

    fn node_kind(
        &mut self,
        at: &Sexp<'_>,
        oper: Oper,
        fields: &[&Sexp<'_>],
        children: &[NodeRef],
    ) -> Result<NodeKind> {
        let kind = match oper {
            Oper::CnsInt => {
                self.operands::<0>(at, oper, children)?;
                NodeKind::CnsInt(self.int(self.field(at, fields, 0)?)?)
            }
            Oper::CnsDbl => {
                self.operands::<0>(at, oper, children)?;
                let field = self.field(at, fields, 0)?;
                let atom = self.atom(field)?;
                let value = atom
                    .parse::<f64>()
                    .map_err(|_| self.error(field, format!("invalid float `{atom}`")))?;
                NodeKind::CnsDbl(value)
            }
            Oper::LclVar | Oper::LclVarAddr => {
                self.operands::<0>(at, oper, children)?;
                let var = LclVarNode {
                    local: self.local(self.field(at, fields, 0)?)?,
                };
                if oper == Oper::LclVar {
                    NodeKind::LclVar(var)
                } else {
                    NodeKind::LclVarAddr(var)
                }
            }
            Oper::LclFld | Oper::LclFldAddr => {
                self.operands::<0>(at, oper, children)?;
                let field_seq = match fields.get(2) {
                    Some(field) => {
                        let atom = self.atom(field)?;
                        let handle = atom
                            .strip_prefix('f')
                            .and_then(|digits| digits.parse::<u32>().ok())
                            .ok_or_else(|| self.error(field, format!("invalid field `{atom}`")))?;
                        Some(FieldHandle(handle))
                    }
                    None => None,
                };
                let fld = LclFldNode {
                    local: self.local(self.field(at, fields, 0)?)?,
                    offset: self.uint(self.field(at, fields, 1)?)?,
                    field_seq,
                };
                if oper == Oper::LclFld {
                    NodeKind::LclFld(fld)
                } else {
                    NodeKind::LclFldAddr(fld)
                }
            }
            Oper::ClsVar => {
                self.operands::<0>(at, oper, children)?;
                NodeKind::ClsVar(self.entity(self.field(at, fields, 0)?, "S", usize::MAX)?)
            }
            Oper::Nop => match children {
                [] => NodeKind::Nop(None),
                [operand] => NodeKind::Nop(Some(*operand)),
                _ => return Err(self.error(at, "`nop` takes at most one operand")),
            },
            Oper::ArgPlace => {
                self.operands::<0>(at, oper, children)?;
                NodeKind::ArgPlace
            }
            Oper::FieldList => {
                let (value, rest) = self.one_or_two(at, oper, children)?;
                let is_head = match fields.get(2) {
                    Some(field) if self.atom(field)? == "head" => true,
                    Some(field) => return Err(self.error(field, "expected `head`")),
                    None => false,
                };
                NodeKind::FieldList(FieldListNode {
                    value,
                    offset: self.uint(self.field(at, fields, 0)?)?,
                    field_ty: self.var_type(self.field(at, fields, 1)?)?,
                    rest,
                    is_head,
                })
            }
            Oper::Unary(op) => {
                let [operand] = self.operands(at, oper, children)?;
                NodeKind::Unary { op, operand }
            }
            Oper::Binary(op) => {
                let [op1, op2] = self.operands(at, oper, children)?;
                NodeKind::Binary { op, op1, op2 }
            }
            Oper::Comma => {
                let [first, second] = self.operands(at, oper, children)?;
                NodeKind::Comma { first, second }
            }
            Oper::AddrOf => NodeKind::AddrOf(self.operands::<1>(at, oper, children)?[0]),
            Oper::Ind => NodeKind::Ind(self.operands::<1>(at, oper, children)?[0]),
            Oper::Box => NodeKind::Box(self.operands::<1>(at, oper, children)?[0]),
            Oper::JTrue => NodeKind::JTrue(self.operands::<1>(at, oper, children)?[0]),
            Oper::Return => match children {
                [] => NodeKind::Return(None),
                [operand] => NodeKind::Return(Some(*operand)),
                _ => return Err(self.error(at, "`return` takes at most one operand")),
            },
            Oper::Blk => {
                let [addr] = self.operands(at, oper, children)?;
                NodeKind::Blk(BlkNode {
                    addr,
                    data: None,
                    size: self.uint(self.field(at, fields, 0)?)?,
                })
            }
            Oper::Obj => {
                let [addr] = self.operands(at, oper, children)?;
                let layout = self.entity(self.field(at, fields, 0)?, "L", self.ir.layouts().count())?;
                NodeKind::Obj(ObjNode {
                    addr,
                    data: None,
                    layout,
                })
            }
            Oper::DynBlk => {
                let [addr, size] = self.operands(at, oper, children)?;
                let eval_size_first = match fields.first() {
                    Some(field) if self.atom(field)? == "size_first" => true,
                    Some(field) => return Err(self.error(field, "expected `size_first`")),
                    None => false,
                };
                NodeKind::DynBlk(DynBlkNode {
                    addr,
                    data: None,
                    size,
                    eval_size_first,
                })
            }
            Oper::Call => {
                let method = match self.field(at, fields, 0)?.item {
                    Item::Str(method) => method.to_owned(),
                    _ => return Err(self.error(at, "expected a quoted method name")),
                };
                let multi_reg_ret = match fields.get(1) {
                    Some(field) if self.atom(field)? == "multi_reg" => true,
                    Some(field) => return Err(self.error(field, "expected `multi_reg`")),
                    None => false,
                };
                NodeKind::Call(CallNode {
                    method,
                    args: self.ir.arg_list(children),
                    multi_reg_ret,
                })
            }
            Oper::Intrinsic => {
                let field = self.field(at, fields, 0)?;
                let name = self.atom(field)?;
                let id = IntrinsicId::from_name(name)
                    .ok_or_else(|| self.error(field, format!("unknown intrinsic `{name}`")))?;
                if children.len() != id.arity() {
                    return Err(self.error(at, format!("intrinsic `{id}` takes {} operand(s)", id.arity())));
                }
                let (op1, op2) = self.one_or_two(at, oper, children)?;
                NodeKind::Intrinsic(IntrinsicNode { id, op1, op2 })
            }
            Oper::Simd => {
                let field = self.field(at, fields, 0)?;
                let name = self.atom(field)?;
                let id = SimdIntrinsic::from_name(name)
                    .ok_or_else(|| self.error(field, format!("unknown simd intrinsic `{name}`")))?;
                let (op1, op2) = self.one_or_two(at, oper, children)?;
                NodeKind::Simd(SimdNode {
                    id,
                    base_type: self.var_type(self.field(at, fields, 1)?)?,
                    size: self.uint(self.field(at, fields, 2)?)?,
                    op1,
                    op2,
                })
            }
            Oper::HwIntrinsic => {
                let name = match self.field(at, fields, 0)?.item {
                    Item::Str(name) => name.to_owned(),
                    _ => return Err(self.error(at, "expected a quoted intrinsic name")),
                };
                let (op1, op2) = self.one_or_two(at, oper, children)?;
                NodeKind::HwIntrinsic(HwIntrinsicNode { name, op1, op2 })
            }
            Oper::Qmark => {
                let [cond, colon] = self.operands(at, oper, children)?;
                NodeKind::Qmark { cond, colon }
            }
            Oper::Colon => {
                let [then_value, else_value] = self.operands(at, oper, children)?;
                NodeKind::Colon {
                    then_value,
                    else_value,
                }
            }
            Oper::Phi => NodeKind::Phi(children.iter().copied().collect()),
            Oper::PhiArg => {
                self.operands::<0>(at, oper, children)?;
                NodeKind::PhiArg(PhiArgNode {
                    local: self.local(self.field(at, fields, 0)?)?,
                    pred: self.entity(self.field(at, fields, 1)?, "BB", self.block_count)?,
                })
            }
            Oper::Assign
            | Oper::StoreLclVar
            | Oper::StoreLclFld
            | Oper::ClsVarAddr
            | Oper::List
            | Oper::StoreInd
            | Oper::StoreBlk
            | Oper::StoreObj
            | Oper::StoreDynBlk
            | Oper::Lea
            | Oper::IlOffset => {
                return Err(self.error(at, format!("`{oper}` cannot appear in HIR")));
            }
        };
        Ok(kind)
    }

    /// Type of a node whose form omits `:type`.
    fn default_type(&self, kind: &NodeKind) -> Option<VarType> {
        match kind {
            NodeKind::LclVar(var) => Some(self.ir.local(var.local).ty),
            NodeKind::Comma { second, .. } => Some(self.ir.node(*second).ty),
            NodeKind::Nop(Some(operand)) => Some(self.ir.node(*operand).ty),
            NodeKind::AddrOf(_) | NodeKind::LclVarAddr(_) | NodeKind::LclFldAddr(_) => {
                Some(VarType::Byref)
            }
            NodeKind::Blk(_) | NodeKind::Obj(_) | NodeKind::DynBlk(_) => Some(VarType::Struct),
            NodeKind::Box(_) => Some(VarType::Ref),
            NodeKind::Nop(None)
            | NodeKind::ArgPlace
            | NodeKind::Return(_)
            | NodeKind::JTrue(_)
            | NodeKind::Call(_) => Some(VarType::Void),
            _ => None,
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Parse a method from its textual HIR form.
pub fn parse_method(input: &str) -> std::result::Result<MethodIr, ParseError> {
    let mut remaining = input;
    ws.parse_next(&mut remaining).map_err(|e| ParseError {
        message: format!("lexer error: {e}"),
        offset: input.len() - remaining.len(),
    })?;
    let top = sexp.parse_next(&mut remaining).map_err(|e| ParseError {
        message: format!("syntax error: {e}"),
        offset: input.len() - remaining.len(),
    })?;
    ws.parse_next(&mut remaining).map_err(|e| ParseError {
        message: format!("lexer error: {e}"),
        offset: input.len() - remaining.len(),
    })?;
    if !remaining.is_empty() {
        return Err(ParseError {
            message: "trailing input after `method`".to_string(),
            offset: input.len() - remaining.len(),
        });
    }

    let mut builder = HirBuilder::new(input.len());
    builder.build_method(&top)?;
    Ok(builder.ir)
}

/// Parse a method, panicking on failure.
///
/// Convenience wrapper around [`parse_method`] for tests.
pub fn parse_test_method(input: &str) -> MethodIr {
    parse_method(input).unwrap_or_else(|e| {
        panic!(
            "Failed to parse test HIR at offset {}:\n  {}\n\nInput:\n{}",
            e.offset, e.message, input
        );
    })
}

// ============================================================================
// Tests
// ============================================================================
