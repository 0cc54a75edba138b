//! Codebase Scanner
//!
//! Walks a directory tree and concatenates every matching text file into one
//! delimited [`ContextBlob`]. Excluded directory names are pruned during the
//! walk so nothing below them is ever visited. Blocks appear in the order the
//! walker yields entries; nothing is sorted.

use ignore::{DirEntry, WalkBuilder};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::constants::blob::{FILE_END, FILE_START};

/// One source file read from disk
#[derive(Debug, Clone)]
pub struct CodeUnit {
    /// Path as discovered (root-joined)
    pub path: PathBuf,
    /// Extension with leading dot
    pub extension: String,
    /// Raw file text
    pub content: String,
}

impl CodeUnit {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Append this unit's delimited block to `out`
    fn write_block(&self, out: &mut String) {
        out.push_str("\n\n");
        out.push_str(FILE_START);
        out.push(' ');
        out.push_str(&self.path.to_string_lossy());
        out.push_str(" ---\n");
        out.push_str(&self.content);
        out.push('\n');
        out.push_str(FILE_END);
        out.push(' ');
        out.push_str(&self.file_name());
        out.push_str(" ---\n");
    }
}

/// Ordered concatenation of file blocks for one repository
#[derive(Debug, Clone, Default)]
pub struct ContextBlob {
    text: String,
    files: Vec<PathBuf>,
    skipped: usize,
}

impl ContextBlob {
    /// Build a blob from units in the given order
    pub fn from_units(units: &[CodeUnit]) -> Self {
        let capacity = units.iter().map(|u| u.content.len() + 128).sum();
        let mut text = String::with_capacity(capacity);
        for unit in units {
            unit.write_block(&mut text);
        }
        Self {
            text,
            files: units.iter().map(|u| u.path.clone()).collect(),
            skipped: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in characters
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Files included, in block order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Matching files that could not be read
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Recursive directory scanner with extension allow-list and directory denylist
pub struct CodebaseScanner {
    root: PathBuf,
    extensions: HashSet<String>,
    exclude_dirs: HashSet<String>,
    respect_gitignore: bool,
}

impl CodebaseScanner {
    pub fn new<P: AsRef<Path>>(root: P, config: &IngestConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions: config.extensions.iter().cloned().collect(),
            exclude_dirs: config.exclude_dirs.iter().cloned().collect(),
            respect_gitignore: config.respect_gitignore,
        }
    }

    /// Scanner with the built-in lists
    pub fn with_defaults<P: AsRef<Path>>(root: P) -> Self {
        Self::new(root, &IngestConfig::default())
    }

    /// Walk the tree and read every matching file
    pub fn scan(&self) -> (Vec<CodeUnit>, usize) {
        let mut units = Vec::new();
        let mut skipped = 0;

        let exclude_dirs = self.exclude_dirs.clone();
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .parents(self.respect_gitignore)
            .require_git(false)
            .follow_links(false) // Security: prevent symlink traversal attacks
            .filter_entry(move |entry| !is_excluded_dir(entry, &exclude_dirs))
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable path during scan: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            let Some(extension) = dotted_extension(path) else {
                continue;
            };
            if !self.extensions.contains(&extension) {
                continue;
            }

            match fs::read_to_string(path) {
                Ok(content) => units.push(CodeUnit {
                    path: path.to_path_buf(),
                    extension,
                    content,
                }),
                Err(e) => {
                    warn!("Skipping file {} due to error: {}", path.display(), e);
                    skipped += 1;
                }
            }
        }

        debug!(
            "Scanned {}: {} files read, {} skipped",
            self.root.display(),
            units.len(),
            skipped
        );
        (units, skipped)
    }

    /// Scan and concatenate into a context blob
    pub fn collect(&self) -> ContextBlob {
        let (units, skipped) = self.scan();
        let mut blob = ContextBlob::from_units(&units);
        blob.skipped = skipped;
        info!(
            "Ingested {} files ({} chars) from {}",
            blob.files.len(),
            blob.char_count(),
            self.root.display()
        );
        blob
    }
}

/// Directory below the root whose name is on the denylist
fn is_excluded_dir(entry: &DirEntry, exclude_dirs: &HashSet<String>) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_dir()) {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| exclude_dirs.contains(name))
}

/// `.py` for `main.py`; `None` for dotfiles and extensionless names
fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_mixed_fixture() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.py", "PY_BODY");
        write(temp.path(), "b.exe", "EXE_BODY");
        write(temp.path(), "node_modules/c.py", "EXCLUDED_BODY");

        let blob = CodebaseScanner::with_defaults(temp.path()).collect();
        let text = blob.as_str();

        assert!(text.contains("---\nPY_BODY\n"));
        assert!(!text.contains("EXE_BODY"));
        assert!(!text.contains("b.exe"));
        assert!(!text.contains("EXCLUDED_BODY"));
        assert!(!text.contains("c.py"));
        assert_eq!(blob.files(), [temp.path().join("a.py")]);
    }

    #[test]
    fn test_block_format() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "main.py", "print('hi')");

        let blob = CodebaseScanner::with_defaults(temp.path()).collect();
        let path = temp.path().join("main.py");
        let expected = format!(
            "\n\n--- START OF FILE: {} ---\nprint('hi')\n--- END OF FILE: main.py ---\n",
            path.display()
        );
        assert_eq!(blob.as_str(), expected);
    }

    #[test]
    fn test_empty_tree_yields_empty_blob() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "notes.txt", "not code");

        let blob = CodebaseScanner::with_defaults(temp.path()).collect();
        assert!(blob.is_empty());
        assert_eq!(blob.char_count(), 0);
    }

    #[test]
    fn test_missing_root_yields_empty_blob() {
        let blob = CodebaseScanner::with_defaults("https://example.invalid/nope").collect();
        assert!(blob.is_empty());
    }

    #[test]
    fn test_extension_is_case_sensitive() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "upper.PY", "SHOUTED");
        write(temp.path(), "lower.py", "quiet");

        let blob = CodebaseScanner::with_defaults(temp.path()).collect();
        assert!(blob.as_str().contains("quiet"));
        assert!(!blob.as_str().contains("SHOUTED"));
    }

    #[test]
    fn test_invalid_utf8_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("bad.js"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        write(temp.path(), "good.js", "const ok = 1;");

        let blob = CodebaseScanner::with_defaults(temp.path()).collect();
        assert!(blob.as_str().contains("const ok = 1;"));
        assert_eq!(blob.files().len(), 1);
        assert_eq!(blob.skipped(), 1);
    }

    #[test]
    fn test_root_named_like_excluded_dir_is_scanned() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("build");
        write(&root, "app.ts", "export const app = 1;");

        let blob = CodebaseScanner::with_defaults(&root).collect();
        assert!(blob.as_str().contains("export const app"));
    }

    #[test]
    fn test_hidden_and_gitignored_files_included_by_default() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), ".gitignore", "generated.js\n");
        write(temp.path(), "generated.js", "GENERATED");
        write(temp.path(), ".config/settings.json", "{\"hidden\": true}");

        let blob = CodebaseScanner::with_defaults(temp.path()).collect();
        assert!(blob.as_str().contains("GENERATED"));
        assert!(blob.as_str().contains("\"hidden\""));
    }

    #[test]
    fn test_respect_gitignore_opt_in() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), ".gitignore", "generated.js\n");
        write(temp.path(), "generated.js", "GENERATED");
        write(temp.path(), "kept.js", "KEPT");

        let config = IngestConfig {
            respect_gitignore: true,
            ..Default::default()
        };
        let blob = CodebaseScanner::new(temp.path(), &config).collect();
        assert!(blob.as_str().contains("KEPT"));
        assert!(!blob.as_str().contains("GENERATED"));
    }

    #[test]
    fn test_custom_extension_list() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib.rs", "fn main() {}");
        write(temp.path(), "a.py", "python");

        let config = IngestConfig {
            extensions: vec![".rs".to_string()],
            ..Default::default()
        };
        let blob = CodebaseScanner::new(temp.path(), &config).collect();
        assert!(blob.as_str().contains("fn main"));
        assert!(!blob.as_str().contains("python"));
    }

    const EXCLUDED: &[&str] = &["node_modules", "venv", ".git", "__pycache__", "dist", "build"];

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_excluded_subtrees_never_leak(
            depth in 0usize..4,
            excluded_idx in 0usize..6,
            nested in proptest::collection::vec("[a-z]{1,6}", 0..3),
        ) {
            let temp = TempDir::new().unwrap();
            let mut rel = PathBuf::new();
            for i in 0..depth {
                rel.push(format!("pkg{}", i));
            }
            rel.push(EXCLUDED[excluded_idx]);
            for part in &nested {
                rel.push(part);
            }
            let leaked = rel.join("hidden.py");
            write(temp.path(), leaked.to_str().unwrap(), "SECRET_MARKER");
            write(temp.path(), "visible.py", "VISIBLE_MARKER");

            let blob = CodebaseScanner::with_defaults(temp.path()).collect();
            prop_assert!(blob.as_str().contains("VISIBLE_MARKER"));
            prop_assert!(!blob.as_str().contains("SECRET_MARKER"));
        }

        #[test]
        fn prop_disallowed_extensions_never_appear(ext in "[a-z]{1,4}") {
            let dotted = format!(".{}", ext);
            prop_assume!(!crate::constants::ingest::ALLOWED_EXTENSIONS.contains(&dotted.as_str()));

            let temp = TempDir::new().unwrap();
            write(temp.path(), &format!("file{}", dotted), "FORBIDDEN_MARKER");
            write(temp.path(), "ok.md", "ALLOWED_MARKER");

            let blob = CodebaseScanner::with_defaults(temp.path()).collect();
            prop_assert!(blob.as_str().contains("ALLOWED_MARKER"));
            prop_assert!(!blob.as_str().contains("FORBIDDEN_MARKER"));
        }
    }
}
