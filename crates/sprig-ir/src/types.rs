//! Value types, local variable descriptors, and class layouts.

use derive_more::Display;

use crate::refs::LayoutRef;

/// Static result type of a node or declared type of a local.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum VarType {
    #[display("void")]
    Void,
    #[display("bool")]
    Bool,
    #[display("byte")]
    Byte,
    #[display("short")]
    Short,
    #[display("int")]
    Int,
    /// The wide integer type. Its presence sets `MethodIr::long_used`.
    #[display("long")]
    Long,
    #[display("float")]
    Float,
    #[display("double")]
    Double,
    #[display("int_ptr")]
    IntPtr,
    #[display("ref")]
    Ref,
    #[display("byref")]
    Byref,
    #[display("struct")]
    Struct,
    #[display("simd8")]
    Simd8,
    #[display("simd12")]
    Simd12,
    #[display("simd16")]
    Simd16,
    #[display("simd32")]
    Simd32,
}

impl VarType {
    pub const ALL: [VarType; 16] = [
        VarType::Void,
        VarType::Bool,
        VarType::Byte,
        VarType::Short,
        VarType::Int,
        VarType::Long,
        VarType::Float,
        VarType::Double,
        VarType::IntPtr,
        VarType::Ref,
        VarType::Byref,
        VarType::Struct,
        VarType::Simd8,
        VarType::Simd12,
        VarType::Simd16,
        VarType::Simd32,
    ];

    /// Look a type up by its textual name.
    pub fn from_name(name: &str) -> Option<VarType> {
        Self::ALL.into_iter().find(|ty| ty.to_string() == name)
    }

    pub fn is_simd(self) -> bool {
        matches!(
            self,
            VarType::Simd8 | VarType::Simd12 | VarType::Simd16 | VarType::Simd32
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, VarType::Float | VarType::Double)
    }

    /// Size in bytes. `Struct` and `Void` have no intrinsic size and report 0.
    pub fn size(self, pointer_size: u32) -> u32 {
        match self {
            VarType::Void | VarType::Struct => 0,
            VarType::Bool | VarType::Byte => 1,
            VarType::Short => 2,
            VarType::Int | VarType::Float => 4,
            VarType::Long | VarType::Double => 8,
            VarType::IntPtr | VarType::Ref | VarType::Byref => pointer_size,
            VarType::Simd8 => 8,
            VarType::Simd12 => 12,
            VarType::Simd16 => 16,
            VarType::Simd32 => 32,
        }
    }

    /// The SIMD type occupying exactly `size` bytes.
    pub fn simd_for_size(size: u32) -> Option<VarType> {
        match size {
            8 => Some(VarType::Simd8),
            12 => Some(VarType::Simd12),
            16 => Some(VarType::Simd16),
            32 => Some(VarType::Simd32),
            _ => None,
        }
    }
}

/// GC classification of one pointer-sized slot of a struct layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum GcSlot {
    #[display("none")]
    None,
    #[display("ref")]
    Ref,
    #[display("byref")]
    Byref,
}

/// Size and GC slot map of a struct type, supplied by the type system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassLayout {
    pub size: u32,
    pub gc_slots: Vec<GcSlot>,
}

impl ClassLayout {
    pub fn new(size: u32, gc_slots: Vec<GcSlot>) -> Self {
        Self { size, gc_slots }
    }

    /// Whether a store of this struct must report object references to the GC.
    pub fn has_gc_ptrs(&self) -> bool {
        self.gc_slots.iter().any(|slot| *slot != GcSlot::None)
    }
}

/// Entry of the local variable table.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalVarDsc {
    pub ty: VarType,
    /// Layout of a struct-typed local.
    pub layout: Option<LayoutRef>,
    /// Element type of a SIMD-typed local.
    pub simd_base: Option<VarType>,
    /// Exact byte size for struct and SIMD locals.
    pub exact_size: Option<u32>,
}

impl LocalVarDsc {
    pub fn new(ty: VarType) -> Self {
        Self {
            ty,
            layout: None,
            simd_base: None,
            exact_size: ty.is_simd().then(|| ty.size(0)),
        }
    }

    pub fn is_simd(&self) -> bool {
        self.ty.is_simd()
    }
}

/// Math intrinsics the importer may leave for the backend to expand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum IntrinsicId {
    #[display("sin")]
    Sin,
    #[display("cos")]
    Cos,
    #[display("sqrt")]
    Sqrt,
    #[display("abs")]
    Abs,
    #[display("round")]
    Round,
    #[display("ceiling")]
    Ceiling,
    #[display("floor")]
    Floor,
    #[display("exp")]
    Exp,
    #[display("log")]
    Log,
    #[display("pow")]
    Pow,
    #[display("atan2")]
    Atan2,
}

impl IntrinsicId {
    pub const ALL: [IntrinsicId; 11] = [
        IntrinsicId::Sin,
        IntrinsicId::Cos,
        IntrinsicId::Sqrt,
        IntrinsicId::Abs,
        IntrinsicId::Round,
        IntrinsicId::Ceiling,
        IntrinsicId::Floor,
        IntrinsicId::Exp,
        IntrinsicId::Log,
        IntrinsicId::Pow,
        IntrinsicId::Atan2,
    ];

    pub fn from_name(name: &str) -> Option<IntrinsicId> {
        Self::ALL.into_iter().find(|id| id.to_string() == name)
    }

    pub fn arity(self) -> usize {
        match self {
            IntrinsicId::Pow | IntrinsicId::Atan2 => 2,
            _ => 1,
        }
    }

    /// Name of the managed library method implementing the intrinsic.
    pub fn routine(self) -> &'static str {
        match self {
            IntrinsicId::Sin => "System.Math.Sin",
            IntrinsicId::Cos => "System.Math.Cos",
            IntrinsicId::Sqrt => "System.Math.Sqrt",
            IntrinsicId::Abs => "System.Math.Abs",
            IntrinsicId::Round => "System.Math.Round",
            IntrinsicId::Ceiling => "System.Math.Ceiling",
            IntrinsicId::Floor => "System.Math.Floor",
            IntrinsicId::Exp => "System.Math.Exp",
            IntrinsicId::Log => "System.Math.Log",
            IntrinsicId::Pow => "System.Math.Pow",
            IntrinsicId::Atan2 => "System.Math.Atan2",
        }
    }

    /// Return type of [`IntrinsicId::routine`] for a first argument of type
    /// `operand`. `Abs` is overloaded per numeric type, the rest take and
    /// return doubles.
    pub fn routine_return_type(self, operand: VarType) -> VarType {
        match self {
            IntrinsicId::Abs => operand,
            _ => VarType::Double,
        }
    }
}

/// Vector operations carried by `simd` nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum SimdIntrinsic {
    /// Broadcast a scalar into every lane.
    #[display("init")]
    Init,
    /// Load a vector from an array: `op1` is the array, `op2` the index.
    #[display("init_array")]
    InitArray,
    #[display("add")]
    Add,
    #[display("sub")]
    Sub,
    #[display("mul")]
    Mul,
    #[display("div")]
    Div,
    #[display("sqrt")]
    Sqrt,
    #[display("abs")]
    Abs,
    #[display("min")]
    Min,
    #[display("max")]
    Max,
    #[display("dot")]
    Dot,
    #[display("get_item")]
    GetItem,
}

impl SimdIntrinsic {
    pub const ALL: [SimdIntrinsic; 12] = [
        SimdIntrinsic::Init,
        SimdIntrinsic::InitArray,
        SimdIntrinsic::Add,
        SimdIntrinsic::Sub,
        SimdIntrinsic::Mul,
        SimdIntrinsic::Div,
        SimdIntrinsic::Sqrt,
        SimdIntrinsic::Abs,
        SimdIntrinsic::Min,
        SimdIntrinsic::Max,
        SimdIntrinsic::Dot,
        SimdIntrinsic::GetItem,
    ];

    pub fn from_name(name: &str) -> Option<SimdIntrinsic> {
        Self::ALL.into_iter().find(|id| id.to_string() == name)
    }
}

/// Source position of a statement in the method's bytecode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0:#x}")]
pub struct IlOffset(pub u32);

/// Handle of a field in a field sequence annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[display("f{_0}")]
pub struct FieldHandle(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_round_trip() {
        for ty in VarType::ALL {
            assert_eq!(VarType::from_name(&ty.to_string()), Some(ty));
        }
        assert_eq!(VarType::from_name("vector"), None);
    }

    #[test]
    fn pointer_sized_types_follow_target() {
        assert_eq!(VarType::IntPtr.size(4), 4);
        assert_eq!(VarType::Ref.size(8), 8);
        assert_eq!(VarType::Long.size(4), 8);
    }

    #[test]
    fn simd_sizes() {
        for ty in [VarType::Simd8, VarType::Simd12, VarType::Simd16, VarType::Simd32] {
            assert_eq!(VarType::simd_for_size(ty.size(8)), Some(ty));
        }
        assert_eq!(VarType::simd_for_size(24), None);
        assert_eq!(LocalVarDsc::new(VarType::Simd16).exact_size, Some(16));
        assert_eq!(LocalVarDsc::new(VarType::Int).exact_size, None);
    }

    #[test]
    fn gc_layout_predicate() {
        let plain = ClassLayout::new(16, vec![GcSlot::None, GcSlot::None]);
        let traced = ClassLayout::new(16, vec![GcSlot::None, GcSlot::Ref]);
        assert!(!plain.has_gc_ptrs());
        assert!(traced.has_gc_ptrs());
    }

    #[test]
    fn il_offset_prints_as_hex() {
        assert_eq!(IlOffset(0x1f).to_string(), "0x1f");
    }
}
