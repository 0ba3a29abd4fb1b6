use crate::error::SandboxError;
use std::path::{Path, PathBuf};

/// Resolve `cwd` (relative to `root`, or an absolute path) and guard against
/// directory traversal: canonicalize and require the result to stay under
/// `root`. Missing directories are created before canonicalizing so a fresh
/// `fs.write` target doesn't fail purely because its parent doesn't exist yet.
pub fn resolve_under_root(root: &Path, cwd: Option<&str>) -> Result<PathBuf, SandboxError> {
    let candidate = match cwd {
        Some(raw) if !raw.is_empty() => root.join(raw),
        _ => root.to_path_buf(),
    };

    std::fs::create_dir_all(&candidate)?;
    let canonical_root = root.canonicalize()?;
    let canonical_candidate = candidate.canonicalize()?;

    if !canonical_candidate.starts_with(&canonical_root) {
        return Err(SandboxError::PathEscape(format!(
            "{} escapes sandbox root {}",
            canonical_candidate.display(),
            canonical_root.display()
        )));
    }

    Ok(canonical_candidate)
}

/// Resolve a file path (not a directory) under `root` without creating it,
/// used by `fs.write` before the parent directory is created separately.
pub fn resolve_file_under_root(root: &Path, relative: &str) -> Result<PathBuf, SandboxError> {
    let canonical_root = root.canonicalize()?;
    let candidate = canonical_root.join(relative);

    let parent = candidate.parent().unwrap_or(&canonical_root).to_path_buf();
    std::fs::create_dir_all(&parent)?;
    let canonical_parent = parent.canonicalize()?;

    if !canonical_parent.starts_with(&canonical_root) {
        return Err(SandboxError::PathEscape(format!(
            "{} escapes sandbox root {}",
            candidate.display(),
            canonical_root.display()
        )));
    }

    Ok(canonical_parent.join(candidate.file_name().unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_outside_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("work")).unwrap();

        let err = resolve_file_under_root(root, "../../../../etc/passwd").unwrap_err();
        assert!(matches!(err, SandboxError::PathEscape(_)));
    }

    #[test]
    fn accepts_nested_relative_path() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let resolved = resolve_file_under_root(root, "work/output.txt").unwrap();
        assert!(resolved.starts_with(root.canonicalize().unwrap()));
    }
}
