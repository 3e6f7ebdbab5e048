//! File naming conventions shared by the watcher, transformer, and printer.
//!
//! - Processed artifacts are named `print_<original-name>` and keep the
//!   original extension, so the encoder follows the source format.
//! - Print jobs are titled `TCG Card - <stem>` so they are recognizable in the
//!   device queue.
//! - A file qualifies for printing when its extension is in the configured
//!   set, compared case-insensitively.

use std::path::{Path, PathBuf};

/// Prefix added to every processed artifact.
pub const PROCESSED_PREFIX: &str = "print_";

/// Output file name for a source image: `print_<original-name>`.
///
/// Returns `None` for paths without a file name (e.g. `/` or `..`).
pub fn processed_file_name(source: &Path) -> Option<String> {
    source
        .file_name()
        .map(|name| format!("{}{}", PROCESSED_PREFIX, name.to_string_lossy()))
}

/// Full output path for a source image inside `processed_dir`.
pub fn processed_path(processed_dir: &Path, source: &Path) -> Option<PathBuf> {
    processed_file_name(source).map(|name| processed_dir.join(name))
}

/// Product noun shared by job titles and the page-size name.
pub const JOB_TITLE_NOUN: &str = "TCG Card";

/// Human-readable job title shown in the printer queue.
pub fn job_title(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{} - {}", JOB_TITLE_NOUN, stem)
}

/// Lowercased extension of a path, if any.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// True when the path's extension is in `supported` (already lowercase).
pub fn has_supported_extension(path: &Path, supported: &[String]) -> bool {
    extension_of(path).is_some_and(|ext| supported.iter().any(|s| *s == ext))
}

/// Short display name for log lines.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> Vec<String> {
        vec!["jpg".into(), "jpeg".into(), "png".into()]
    }

    #[test]
    fn processed_name_keeps_extension() {
        assert_eq!(
            processed_file_name(Path::new("/in/Black Lotus.png")).as_deref(),
            Some("print_Black Lotus.png")
        );
    }

    #[test]
    fn processed_path_joins_dir() {
        assert_eq!(
            processed_path(Path::new("/out"), Path::new("/in/card.jpg")),
            Some(PathBuf::from("/out/print_card.jpg"))
        );
    }

    #[test]
    fn processed_name_none_without_file_name() {
        assert_eq!(processed_file_name(Path::new("/")), None);
    }

    #[test]
    fn job_title_uses_stem() {
        assert_eq!(job_title(Path::new("/out/print_bolt.jpg")), "TCG Card - print_bolt");
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(has_supported_extension(Path::new("a/CARD.JPG"), &exts()));
        assert!(has_supported_extension(Path::new("a/card.Png"), &exts()));
    }

    #[test]
    fn unsupported_or_missing_extension_rejected() {
        assert!(!has_supported_extension(Path::new("a/notes.txt"), &exts()));
        assert!(!has_supported_extension(Path::new("a/README"), &exts()));
        assert!(!has_supported_extension(Path::new("a/.jpg"), &exts()));
    }

    #[test]
    fn display_name_is_file_name() {
        assert_eq!(display_name(Path::new("/deep/dir/card.png")), "card.png");
    }
}
