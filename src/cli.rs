//! Command-line interface for the sprig driver.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use sprig_rationalize::TargetConfig;
use target_lexicon::Triple;

#[derive(Parser)]
#[command(name = "sprig")]
#[command(about = "Rationalize a method from textual HIR into LIR", long_about = None)]
pub struct Cli {
    /// Method in textual HIR form
    pub file: PathBuf,

    /// Target triple (defaults to the host)
    #[arg(long, value_parser = parse_triple)]
    pub target: Option<Triple>,

    /// Treat the target as having no vector support
    #[arg(long)]
    pub no_simd: bool,

    /// Print the method as parsed before the LIR
    #[arg(long)]
    pub dump_hir: bool,
}

fn parse_triple(s: &str) -> Result<Triple, String> {
    Triple::from_str(s).map_err(|e| e.to_string())
}

impl Cli {
    pub fn target_config(&self) -> TargetConfig {
        let config = match &self.target {
            Some(triple) => TargetConfig::for_triple(triple),
            None => TargetConfig::host(),
        };
        if self.no_simd {
            config.with_simd(false)
        } else {
            config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_and_simd_flags() {
        let cli = Cli::try_parse_from(["sprig", "m.hir", "--target", "x86_64-unknown-linux-gnu", "--no-simd"])
            .expect("valid arguments");
        let config = cli.target_config();
        assert_eq!(config.pointer_size, 8);
        assert!(!config.simd_supported);
        assert!(config.explicit_static_reads);
        assert!(!cli.dump_hir);
    }

    #[test]
    fn bad_triple_is_rejected() {
        assert!(Cli::try_parse_from(["sprig", "m.hir", "--target", "not-a-triple-at-all"]).is_err());
    }
}
