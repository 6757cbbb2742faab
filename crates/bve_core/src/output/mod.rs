//! Output path resolution.
//!
//! Output files always land in the chosen output directory and never
//! overwrite an existing file: a numeric `_1`, `_2`, ... suffix is
//! appended until the name is free. The check-then-create is only
//! race-free within a single sequential run; there are no concurrent
//! writers in this design.

use std::path::{Path, PathBuf};

use crate::plan::EncodePlan;

/// Compute the collision-free output path for one input file.
pub fn resolve_output_path(input: &Path, plan: &EncodePlan, out_dir: &Path) -> PathBuf {
    // Both forms reduce to stem + suffix: extension replacement uses a
    // suffix that starts with '.', the append form one that carries the
    // container extension.
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = format!("{}{}", stem, plan.out_suffix);

    ensure_unique_path(out_dir.join(name))
}

/// Append `_1`, `_2`, ... to the stem until the path does not exist.
pub fn ensure_unique_path(candidate: PathBuf) -> PathBuf {
    if !candidate.exists() {
        return candidate;
    }

    let stem = candidate
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = candidate
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut i = 1;
    loop {
        let next = candidate.with_file_name(format!("{}_{}{}", stem, i, ext));
        if !next.exists() {
            return next;
        }
        i += 1;
    }
}
