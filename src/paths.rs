use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Path normalization
// ---------------------------------------------------------------------------

/// Normalize a user-supplied path: expand a leading `~`, then canonicalize
/// when the file exists. A path that does not (yet) exist is returned
/// tilde-expanded but otherwise untouched, so output paths work too.
pub fn normalize(path: &Path) -> PathBuf {
    let expanded = expand_tilde(path);
    std::fs::canonicalize(&expanded).unwrap_or(expanded)
}

fn expand_tilde(path: &Path) -> PathBuf {
    let Some(rest) = path.to_str().and_then(|s| s.strip_prefix('~')) else {
        return path.to_path_buf();
    };
    let Some(home) = home_dir() else {
        return path.to_path_buf();
    };
    match rest.strip_prefix(std::path::MAIN_SEPARATOR) {
        Some(tail) => home.join(tail),
        None if rest.is_empty() => home,
        // ~otheruser is left alone.
        None => path.to_path_buf(),
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    let var = "USERPROFILE";
    #[cfg(not(windows))]
    let var = "HOME";
    std::env::var_os(var).map(PathBuf::from)
}

/// Default output path for a converted trace: an `OUT_`-prefixed sibling
/// of the input file.
pub fn default_output(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trace.csv".to_string());
    input.with_file_name(format!("OUT_{name}"))
}
