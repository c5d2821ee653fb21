//! Path validation module
//!
//! Keeps evidence file references inside the media root and turns
//! client-supplied file names into safe single path components

use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

/// Longest sanitized file name kept (characters)
const MAX_FILE_NAME_CHARS: usize = 100;

/// Resolve a stored file reference to an existing file under `base_dir`
///
/// This function ensures that:
/// 1. The reference is relative (not absolute)
/// 2. It doesn't contain ".." components
/// 3. The resolved path stays within the base directory
///
/// # Returns
/// * `Ok(PathBuf)` - The canonicalized, validated path
/// * `Err` - If validation fails or the file does not exist
pub fn validate_file_path(base_dir: &Path, relative_path: &str) -> Result<PathBuf> {
    if Path::new(relative_path).is_absolute() {
        return Err(anyhow!("Absolute paths are not allowed: {}", relative_path));
    }

    if relative_path.contains("..") {
        return Err(anyhow!("Path traversal detected in: {}", relative_path));
    }

    if relative_path.contains('\0') {
        return Err(anyhow!("Null byte detected in path: {}", relative_path));
    }

    let full_path = base_dir.join(relative_path);

    // Canonicalize to resolve symlinks and relative components
    let canonical = full_path.canonicalize()
        .map_err(|e| anyhow!("Invalid or non-existent path {}: {}", relative_path, e))?;

    let canonical_base = base_dir.canonicalize()
        .map_err(|e| anyhow!("Invalid media directory: {}", e))?;

    if !canonical.starts_with(&canonical_base) {
        return Err(anyhow!(
            "Path escapes media directory: {} is not within {}",
            canonical.display(),
            canonical_base.display()
        ));
    }

    Ok(canonical)
}

/// Reduce a client-supplied file name to a safe single path component
///
/// Directory parts are dropped and anything outside `[A-Za-z0-9._-]` becomes `_`.
///
/// # Errors
/// Returns error if nothing usable remains
pub fn sanitize_file_name(name: &str) -> Result<String> {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .filter(|c| *c != '\0')
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .take(MAX_FILE_NAME_CHARS)
        .collect();

    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_') {
        return Err(anyhow!("File name is empty after sanitizing: {:?}", name));
    }

    Ok(trimmed.to_string())
}
