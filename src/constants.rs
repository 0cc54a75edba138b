//! Global Constants
//!
//! Centralized constants for ingestion, the pipeline and the backend clients.
//! All magic numbers and fixed lists should be defined here with documentation.

/// Codebase ingestion constants
pub mod ingest {
    /// File extensions read into the context blob (case-sensitive, leading dot)
    pub const ALLOWED_EXTENSIONS: &[&str] = &[
        ".py", ".js", ".ts", ".java", ".c", ".cpp", ".h", ".css", ".html", ".md", ".json",
    ];

    /// Directory names that are never descended into
    pub const EXCLUDED_DIRS: &[&str] = &[
        "node_modules",
        "venv",
        ".git",
        "__pycache__",
        "dist",
        "build",
    ];

    /// Parent directory for cloned remote repositories
    pub const DEFAULT_STAGING_DIR: &str = "./temp_repos";

    /// Folder name used when a URL has no usable last path segment
    pub const FALLBACK_REPO_NAME: &str = "repository";
}

/// Context blob delimiters
pub mod blob {
    /// Opens a file block; followed by the discovered path
    pub const FILE_START: &str = "--- START OF FILE:";

    /// Closes a file block; followed by the bare filename
    pub const FILE_END: &str = "--- END OF FILE:";
}

/// Context guard constants
pub mod guard {
    /// Maximum characters handed to a single completion call (~200k tokens)
    pub const DEFAULT_MAX_CHARS: usize = 800_000;

    /// Appended when input is cut for size
    pub const TRUNCATION_MARKER: &str = "\n...[CONTEXT TRUNCATED DUE TO SIZE]...";
}

/// Output artifact constants
pub mod output {
    /// Default combined documentation file
    pub const DEFAULT_OUTPUT_FILE: &str = "GENERATED_README.md";

    /// Heading placed between the README text and the diagram block
    pub const DIAGRAM_HEADING: &str = "## Architecture Diagram";

    /// Public Mermaid rendering service (base64 payload appended)
    pub const MERMAID_INK_SVG: &str = "https://mermaid.ink/svg/";
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
}
