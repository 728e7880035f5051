use std::path::PathBuf;

use dirs_next::home_dir;

/// Expands a leading `~` to the current user's home directory.
///
/// Paths without a leading tilde are returned unchanged (after trimming). If
/// the home directory cannot be determined the tilde is kept verbatim.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    let home = || home_dir().unwrap_or_else(|| PathBuf::from("~"));
    match trimmed {
        "~" => home(),
        _ => match trimmed.strip_prefix("~/").or_else(|| trimmed.strip_prefix("~\\")) {
            Some(rest) => home().join(rest),
            None => PathBuf::from(trimmed),
        },
    }
}
