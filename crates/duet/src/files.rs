//! Project files attached to a request, and their serialization into a prompt block.

use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root of the project inside the sandbox the chat interface runs
pub const WORK_DIR: &str = "/home/project";

pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "node_modules/**",
    ".git/**",
    "dist/**",
    "build/**",
    ".next/**",
    "coverage/**",
    ".cache/**",
    ".vscode/**",
    ".idea/**",
    "target/**",
    "**/*.log",
    "**/.DS_Store",
    "**/npm-debug.log*",
    "**/yarn-debug.log*",
    "**/yarn-error.log*",
    "**/*lock.json",
    "**/*lock.yaml",
    "**/*.lock",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileEntry {
    File {
        content: String,
        #[serde(default, rename = "isBinary")]
        is_binary: bool,
    },
    Folder,
}

impl FileEntry {
    pub fn text<S: Into<String>>(content: S) -> Self {
        FileEntry::File {
            content: content.into(),
            is_binary: false,
        }
    }
}

/// File path to entry, ordered by path
pub type FileMap = BTreeMap<String, FileEntry>;

/// Path relative to the project root
pub fn relative_path(path: &str) -> &str {
    path.strip_prefix(WORK_DIR)
        .unwrap_or(path)
        .trim_start_matches('/')
}

#[derive(Debug, Clone)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, glob::PatternError> {
        let patterns = patterns
            .iter()
            .map(|p| Pattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        let path = relative_path(path);
        self.patterns.iter().any(|pattern| pattern.matches(path))
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .filter_map(|p| Pattern::new(p).ok())
                .collect(),
        }
    }
}

/// Serialize text files into a single block, each wrapped in a path marker.
/// Folders, binary files and ignored paths are skipped. Files are added in path order
/// until the next one would push the block past `max_chars`.
pub fn create_files_context(files: &FileMap, ignore: &IgnoreSet, max_chars: usize) -> String {
    let mut sections = Vec::new();
    let mut used = 0;
    let mut omitted = 0;

    for (path, entry) in files {
        let content = match entry {
            FileEntry::File {
                content,
                is_binary: false,
            } => content,
            _ => continue,
        };
        if ignore.is_ignored(path) {
            continue;
        }

        let section = format!(
            "<file path=\"{}\">\n{}\n</file>",
            relative_path(path),
            content
        );
        let section_len = section.chars().count();
        if used + section_len > max_chars {
            omitted += 1;
            continue;
        }
        used += section_len;
        sections.push(section);
    }

    if omitted > 0 {
        tracing::debug!(omitted, max_chars, "Files context truncated");
    }
    if sections.is_empty() {
        return String::new();
    }

    let mut block = format!("<files>\n{}\n</files>", sections.join("\n"));
    if omitted > 0 {
        block.push_str(&format!(
            "\n{} more file(s) omitted to fit the context limit.",
            omitted
        ));
    }
    block
}
