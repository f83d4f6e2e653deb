//! Mappings between related local-variable operators.

use crate::flags::NodeFlags;
use crate::node::Oper;

/// Store operator writing the location a local read reads.
///
/// # Panics
///
/// Panics unless `load` is `lcl_var` or `lcl_fld`.
pub fn store_form_of(load: Oper) -> Oper {
    match load {
        Oper::LclVar => Oper::StoreLclVar,
        Oper::LclFld => Oper::StoreLclFld,
        other => unreachable!("store_form_of: {other} is not a local read"),
    }
}

/// Operator taking the address of the location a local read reads.
///
/// # Panics
///
/// Panics unless `load` is `lcl_var` or `lcl_fld`.
pub fn address_form_of(load: Oper) -> Oper {
    match load {
        Oper::LclVar => Oper::LclVarAddr,
        Oper::LclFld => Oper::LclFldAddr,
        other => unreachable!("address_form_of: {other} is not a local read"),
    }
}

/// Inverse of [`address_form_of`].
///
/// # Panics
///
/// Panics unless `addr` is `lcl_var_addr` or `lcl_fld_addr`.
pub fn load_form_of(addr: Oper) -> Oper {
    match addr {
        Oper::LclVarAddr => Oper::LclVar,
        Oper::LclFldAddr => Oper::LclFld,
        other => unreachable!("load_form_of: {other} is not a local address"),
    }
}

/// Replace the `mask` bits of `dst` with those of `src`.
pub fn copy_flags(dst: &mut NodeFlags, src: NodeFlags, mask: NodeFlags) {
    dst.remove(mask);
    dst.insert(src & mask);
}
