//! Textual HIR in, LIR out.
//!
//! Glue between the HIR parser, the rationalization pass and the LIR dump,
//! shared by the `sprig` binary and its tests.

use std::path::Path;

use derive_more::{Display, From};
use sprig_ir::{ParseError, ValidationResult, check_lir, parse_method, print_hir, print_lir};
use sprig_rationalize::{RationalizeError, RationalizeStats, TargetConfig, rationalize};
use tracing::info;

pub use sprig_ir;
pub use sprig_rationalize;

#[derive(Debug, Display, From)]
pub enum PipelineError {
    #[display("{_0}")]
    Io(std::io::Error),
    #[display("{_0}")]
    Parse(ParseError),
    #[display("internal compiler error: {_0}")]
    Rationalize(RationalizeError),
    #[display("internal compiler error: {_0}")]
    InvalidLir(ValidationResult),
}

impl std::error::Error for PipelineError {}

/// Dumps of one lowered method.
#[derive(Debug)]
pub struct Lowered {
    /// The method as parsed, before the pass.
    pub hir: String,
    pub lir: String,
    pub stats: RationalizeStats,
}

/// Parse `source`, rationalize it for `config` and print both forms.
///
/// Debug builds also check the resulting ranges.
pub fn lower_source(source: &str, config: &TargetConfig) -> Result<Lowered, PipelineError> {
    let mut ir = parse_method(source)?;
    let hir = print_hir(&ir);
    let stats = rationalize(&mut ir, config)?;
    if cfg!(debug_assertions) {
        let result = check_lir(&ir);
        if !result.is_ok() {
            return Err(result.into());
        }
    }
    Ok(Lowered {
        hir,
        lir: print_lir(&ir),
        stats,
    })
}

pub fn lower_file(path: &Path, config: &TargetConfig) -> Result<Lowered, PipelineError> {
    let source = std::fs::read_to_string(path)?;
    let lowered = lower_source(&source, config)?;
    info!(
        path = %path.display(),
        statements = lowered.stats.statements,
        removed = lowered.stats.nodes_removed,
        "lowered method"
    );
    Ok(lowered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_keep_their_source_message() {
        let err = lower_source("(method (block BB0 (stmt (lcl_var V0))))", &TargetConfig::new(8))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
        assert!(err.to_string().contains("`V0` is not declared"), "{err}");
    }

    #[test]
    fn hir_dump_is_taken_before_the_pass() {
        let lowered = lower_source(
            "(method (local V0 int) (block BB0 (stmt (assign (lcl_var V0) (cns_int:int 5)))))",
            &TargetConfig::new(8),
        )
        .expect("lower");
        insta::assert_snapshot!(lowered.hir, @r"
        (method
          (local V0 int)
          (block BB0
            (stmt (assign:int (lcl_var:int !def V0) (cns_int:int 5)))))
        ");
        assert_eq!(lowered.stats.statements, 1);
    }
}
