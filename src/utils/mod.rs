mod hash;

pub use hash::sha256_hex;

/// Strip null bytes and control characters from string input, keeping
/// newlines and tabs. Applied to every string field before it reaches the
/// database.
#[must_use]
pub fn sanitize_string(input: &str) -> String {
    input
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || c == '\r' || !c.is_control())
        .collect()
}

/// Reject filenames that could escape the uploads directory.
///
/// Returns `None` for empty names, path separators, parent references, and
/// hidden files.
#[must_use]
pub fn safe_filename(name: &str) -> Option<&str> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
    {
        return None;
    }
    Some(name)
}

/// Extract a lowercase file extension (without the dot), if any.
#[must_use]
pub fn file_extension(name: &str) -> Option<String> {
    std::path::Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}
