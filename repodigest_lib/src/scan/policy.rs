use std::path::Path;

use serde::Deserialize;

use super::rules::{Rule, RuleSet};

pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 50 * 1024;

const DEFAULT_EXTENSIONS: &[&str] = &[
    "js", "ts", "jsx", "tsx", "py", "go", "java", "rb", "php", "cpp", "c", "cs", "swift", "kt",
    "rs", "json", "yml", "yaml", "sql", "env", "",
];

const DEFAULT_PRIORITY_NAMES: &[&str] = &[
    "app.js",
    "main.js",
    "index.js",
    "server.js",
    "app.ts",
    "main.ts",
    "index.ts",
    "server.ts",
    "routes.js",
    "routes.ts",
    "config.js",
    "config.ts",
    "package.json",
    "README.md",
    "Dockerfile",
];

const DEFAULT_SKIP_NAMES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    ".env",
    ".env.local",
    ".env.development",
    ".env.production",
    ".env.test",
    ".DS_Store",
    "Thumbs.db",
    ".gitignore",
];

const DEFAULT_SKIP_NAME_PATTERNS: &[&str] = &[
    r"\.log$",
    r"\.tmp$",
    r"\.cache$",
    r"~$",
    r"\.min\.(js|css)$",
    r"\.map$",
    r"\.(png|jpg|jpeg|gif|webp|svg|bmp|ico)$",
    r"\.(mp3|wav|ogg|flac|aac)$",
    r"\.(mp4|webm|avi|mov|mkv)$",
    r"\.(woff|woff2|ttf|otf|eot|ttc)$",
    r"\.(pdf|ai|eps|sketch|psd|xd)$",
    r"\.(doc|docx|ppt|pptx|xls|xlsx|csv)$",
    r"^sample",
    r"^demo",
    r"^test-data",
    r"\.example$",
];

const DEFAULT_SKIP_NAME_GLOBS: &[&str] = &["*.swp", "*.swo", "*.bak", "*.iml"];

const DEFAULT_SKIP_DIRS: &[&str] = &["node_modules", ".git", "dist", "build", "coverage"];

/// Outcome of checking a file name against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileVerdict {
    /// Matched a skip rule.
    Skipped,
    /// Neither an allowed extension nor a priority name.
    NotAllowed,
    Accepted { priority: bool },
}

/// Rules deciding which files and directories a scan considers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanPolicy {
    /// Extensions without the leading dot; an empty entry admits extensionless files.
    pub allowed_extensions: Vec<String>,
    pub priority_names: RuleSet,
    pub skip_names: RuleSet,
    pub skip_dirs: RuleSet,
    pub max_file_size_bytes: u64,
    pub max_depth: Option<usize>,
}

impl ScanPolicy {
    pub fn skips_dir(&self, name: &str) -> bool {
        self.skip_dirs.matches_any(name)
    }

    /// Whether a directory at `depth` (root children are depth 1) may be entered.
    pub fn allows_depth(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth <= max)
    }

    pub fn is_priority(&self, name: &str) -> bool {
        self.priority_names.matches_any(name)
    }

    pub fn allows_extension(&self, name: &str) -> bool {
        let ext = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    pub fn classify_file(&self, name: &str) -> FileVerdict {
        if self.skip_names.matches_any(name) {
            return FileVerdict::Skipped;
        }

        let priority = self.is_priority(name);
        if priority || self.allows_extension(name) {
            FileVerdict::Accepted { priority }
        } else {
            FileVerdict::NotAllowed
        }
    }
}

impl Default for ScanPolicy {
    fn default() -> Self {
        let mut priority_names: RuleSet = DEFAULT_PRIORITY_NAMES
            .iter()
            .map(|name| Rule::literal(*name))
            .collect();
        priority_names.push(builtin_regex(r"\.config\.js$"));

        let mut skip_names: RuleSet = DEFAULT_SKIP_NAMES
            .iter()
            .map(|name| Rule::literal(*name))
            .chain(DEFAULT_SKIP_NAME_PATTERNS.iter().map(|p| builtin_regex(p)))
            .chain(DEFAULT_SKIP_NAME_GLOBS.iter().map(|p| builtin_glob(p)))
            .collect();
        // prose docs other than READMEs
        skip_names.push(Rule::except(
            builtin_regex(r"\.(md|markdown|rst|txt)$"),
            builtin_regex("README"),
        ));
        // hidden dotfiles
        skip_names.push(Rule::except(builtin_regex(r"^\."), builtin_regex(r"^\.README")));

        let mut skip_dirs: RuleSet = DEFAULT_SKIP_DIRS
            .iter()
            .map(|name| Rule::literal(*name))
            .collect();
        skip_dirs.push(builtin_regex(r"^\."));

        Self {
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            priority_names,
            skip_names,
            skip_dirs,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            max_depth: None,
        }
    }
}

fn builtin_regex(pattern: &str) -> Rule {
    Rule::regex(pattern).expect("built-in scan rule regex should compile")
}

fn builtin_glob(pattern: &str) -> Rule {
    Rule::glob(pattern).expect("built-in scan rule glob should compile")
}
