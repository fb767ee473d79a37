//! Patch validation without rendering.

use anyhow::bail;
use clap::Args;
use corvid_config::{ConfigError, Patch, ValidationError, validate_patch};
use std::path::{Path, PathBuf};

/// Validate one or more patch files.
#[derive(Args)]
pub struct CheckArgs {
    /// Patch files (TOML)
    #[arg(value_name = "PATCH", required = true)]
    patches: Vec<PathBuf>,
}

/// Run the check command.
pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    let mut failures = 0usize;
    for path in &args.patches {
        let problems = check_file(path);
        if problems.is_empty() {
            println!("{}: ok", path.display());
        } else {
            failures += 1;
            println!("{}: {} problem(s)", path.display(), problems.len());
            for problem in &problems {
                println!("  - {problem}");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} patch(es) failed", args.patches.len());
    }
    Ok(())
}

/// Every problem found in one file, as display strings.
fn check_file(path: &Path) -> Vec<String> {
    let patch = match Patch::load(path) {
        Ok(patch) => patch,
        Err(err) => return vec![err.to_string()],
    };
    tracing::debug!(name = patch.display_name(), channels = patch.channels.len(), "loaded patch");

    if let Err(err) = validate_patch(&patch) {
        return flatten(err);
    }
    // Validation passed; the engine may still refuse a setting.
    match patch.build_engine() {
        Ok(_) => Vec::new(),
        Err(ConfigError::Validation(err)) => flatten(err),
        Err(err) => vec![err.to_string()],
    }
}

fn flatten(err: ValidationError) -> Vec<String> {
    match err {
        ValidationError::Multiple(errors) => errors.iter().map(ToString::to_string).collect(),
        other => vec![other.to_string()],
    }
}
