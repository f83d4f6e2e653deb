//! Target capabilities consulted by the rewrite rules.

use smallvec::SmallVec;
use sprig_ir::IntrinsicId;
use target_lexicon::{Architecture, Triple};

/// What the target can do natively. Read-only during the pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetConfig {
    /// Size of a native pointer in bytes.
    pub pointer_size: u32,
    /// Whether vector types are enabled.
    pub simd_supported: bool,
    /// Static reads become explicit indirections through the slot address.
    pub explicit_static_reads: bool,
    native_intrinsics: SmallVec<[IntrinsicId; 8]>,
}

impl TargetConfig {
    /// A target with no SIMD support and no native intrinsics.
    pub fn new(pointer_size: u32) -> Self {
        Self {
            pointer_size,
            simd_supported: false,
            explicit_static_reads: false,
            native_intrinsics: SmallVec::new(),
        }
    }

    /// Capabilities of the given target triple.
    ///
    /// Unknown pointer widths fall back to 8 bytes.
    pub fn for_triple(triple: &Triple) -> Self {
        let pointer_size = triple
            .pointer_width()
            .map(|width| u32::from(width.bytes()))
            .unwrap_or(8);
        let config = Self::new(pointer_size);
        let rounding = [
            IntrinsicId::Sqrt,
            IntrinsicId::Abs,
            IntrinsicId::Round,
            IntrinsicId::Ceiling,
            IntrinsicId::Floor,
        ];
        match triple.architecture {
            Architecture::X86_64 | Architecture::X86_64h | Architecture::X86_32(_) => {
                let mut config = config.with_simd(true);
                config.explicit_static_reads = true;
                rounding
                    .into_iter()
                    .fold(config, TargetConfig::with_native_intrinsic)
            }
            Architecture::Aarch64(_) => rounding
                .into_iter()
                .fold(config.with_simd(true), TargetConfig::with_native_intrinsic),
            Architecture::Arm(_) => config
                .with_native_intrinsic(IntrinsicId::Sqrt)
                .with_native_intrinsic(IntrinsicId::Abs),
            _ => config,
        }
    }

    /// Capabilities of the machine running the compiler.
    pub fn host() -> Self {
        Self::for_triple(&Triple::host())
    }

    pub fn with_simd(mut self, supported: bool) -> Self {
        self.simd_supported = supported;
        self
    }

    pub fn with_native_intrinsic(mut self, id: IntrinsicId) -> Self {
        if !self.native_intrinsics.contains(&id) {
            self.native_intrinsics.push(id);
        }
        self
    }

    /// Whether the backend expands `id` itself rather than calling its routine.
    pub fn is_intrinsic_native(&self, id: IntrinsicId) -> bool {
        self.native_intrinsics.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn x86_64_enables_simd_and_rounding() {
        let triple = Triple::from_str("x86_64-unknown-linux-gnu").expect("valid triple");
        let config = TargetConfig::for_triple(&triple);
        assert_eq!(config.pointer_size, 8);
        assert!(config.simd_supported);
        assert!(config.explicit_static_reads);
        assert!(config.is_intrinsic_native(IntrinsicId::Sqrt));
        assert!(config.is_intrinsic_native(IntrinsicId::Floor));
        assert!(!config.is_intrinsic_native(IntrinsicId::Sin));
    }

    #[test]
    fn arm32_has_narrow_pointers_and_no_simd() {
        let triple = Triple::from_str("armv7-unknown-linux-gnueabihf").expect("valid triple");
        let config = TargetConfig::for_triple(&triple);
        assert_eq!(config.pointer_size, 4);
        assert!(!config.simd_supported);
        assert!(!config.explicit_static_reads);
        assert!(config.is_intrinsic_native(IntrinsicId::Abs));
        assert!(!config.is_intrinsic_native(IntrinsicId::Round));
    }

    #[test]
    fn builder_methods() {
        let config = TargetConfig::new(4)
            .with_simd(true)
            .with_native_intrinsic(IntrinsicId::Pow)
            .with_native_intrinsic(IntrinsicId::Pow);
        assert!(config.simd_supported);
        assert_eq!(config.native_intrinsics.len(), 1);
        assert!(config.is_intrinsic_native(IntrinsicId::Pow));
    }
}
