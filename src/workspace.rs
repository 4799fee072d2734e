//! Source file discovery for the translate command.

use std::path::{
    Path,
    PathBuf,
};

use ignore::WalkBuilder;

use crate::config::FileMatcher;

/// Source files under `target` accepted by `matcher`, in path order.
///
/// `target` may be a single file. Git ignore rules are honoured; include and
/// exclude patterns are matched relative to the project root.
#[must_use]
pub fn find_source_files(target: &Path, matcher: &FileMatcher) -> Vec<PathBuf> {
    if target.is_file() {
        return if matcher.is_source_file(target) {
            vec![target.to_path_buf()]
        } else {
            tracing::info!(path = %target.display(), "File does not match includePatterns, skipped");
            Vec::new()
        };
    }

    let mut found_files = Vec::new();
    for result in WalkBuilder::new(target)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
    {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(?err, "Failed to read directory entry");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        if matcher.is_source_file(entry.path()) {
            found_files.push(entry.into_path());
        }
    }

    tracing::debug!(target = %target.display(), count = found_files.len(), "Source files found");
    found_files
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use tempfile::TempDir;

    use super::*;
    use crate::config::I18nSettings;

    fn workspace() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for dir in ["src/views", "node_modules/pkg", "dist", "generated"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        for file in [
            "src/main.js",
            "src/views/Home.vue",
            "src/views/util.ts",
            "src/views/style.css",
            "node_modules/pkg/index.js",
            "dist/app.js",
            "generated/out.js",
        ] {
            fs::write(root.join(file), "").unwrap();
        }
        fs::write(root.join(".gitignore"), "generated/\n").unwrap();
        // the ignore crate only reads .gitignore inside a repository
        fs::create_dir_all(root.join(".git")).unwrap();
        temp_dir
    }

    fn matcher(root: &Path) -> FileMatcher {
        FileMatcher::new(root.to_path_buf(), &I18nSettings::default()).unwrap()
    }

    #[rstest]
    fn test_walks_directory_with_patterns_and_gitignore() {
        let temp_dir = workspace();
        let root = temp_dir.path();

        let files = find_source_files(root, &matcher(root));

        assert_eq!(
            files,
            vec![
                root.join("src/main.js"),
                root.join("src/views/Home.vue"),
                root.join("src/views/util.ts"),
            ]
        );
    }

    #[rstest]
    fn test_subdirectory_target_keeps_root_relative_patterns() {
        let temp_dir = workspace();
        let root = temp_dir.path();

        let files = find_source_files(&root.join("src/views"), &matcher(root));

        assert_eq!(files, vec![root.join("src/views/Home.vue"), root.join("src/views/util.ts")]);
    }

    #[rstest]
    #[case::source("src/main.js", true)]
    #[case::excluded("dist/app.js", false)]
    #[case::other_extension("src/views/style.css", false)]
    fn test_single_file_target(#[case] file: &str, #[case] accepted: bool) {
        let temp_dir = workspace();
        let root = temp_dir.path();

        let files = find_source_files(&root.join(file), &matcher(root));

        assert_eq!(files.len(), usize::from(accepted));
    }
}
