//! # Utility Functions Module
//!
//! Piccoli helper condivisi: costruzione degli argomenti per i tool esterni
//! e formattazione dei path relativi nei log.

use std::path::Path;

/// Build an argument vector from mixed displayable values.
///
/// ```ignore
/// let args = args!["-o", level, "--strip", "safe"];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        vec![$($item.to_string()),*]
    };
}

/// `path` relative to `root` for log lines, falling back to the full path
pub fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_macro() {
        let level = 6;
        let result = args!["-o", level, "--strip", "safe"];
        assert_eq!(result, vec!["-o", "6", "--strip", "safe"]);
    }

    #[test]
    fn test_display_relative() {
        let root = Path::new("/site/src/assets");
        assert_eq!(
            display_relative(Path::new("/site/src/assets/team/yaya.png"), root),
            Path::new("team").join("yaya.png").display().to_string()
        );
        assert_eq!(display_relative(Path::new("/elsewhere/x.png"), root), "/elsewhere/x.png");
    }
}
