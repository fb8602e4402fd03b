use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::{
    fs,
    sync::{Semaphore, mpsc},
    task::JoinSet,
};
use tracing::{debug, warn};

use crate::{
    error::{RepoDigestError, Result},
    languages,
};

use super::{
    ScanStats,
    policy::{FileVerdict, ScanPolicy},
    record::{FileRecord, ScoreWeights},
};

pub const DEFAULT_MAX_OPEN_FILES: usize = 64;

/// Shared, read-only state handed to every directory and file task.
struct WalkContext {
    root: PathBuf,
    /// `root` with symlinks resolved; every file read must resolve below it.
    canonical_root: PathBuf,
    policy: ScanPolicy,
    weights: ScoreWeights,
    /// Bounds open handles of both directory listings and file reads.
    open_files: Semaphore,
    sink: mpsc::Sender<FileRecord>,
}

struct DirectoryOutcome {
    subdirectories: Vec<(PathBuf, usize)>,
    stats: ScanStats,
}

/// Entries of one directory, gathered before any file is opened.
struct Listing {
    subdirectories: Vec<(PathBuf, usize)>,
    candidates: Vec<(PathBuf, bool)>,
    stats: ScanStats,
}

enum FileOutcome {
    Accepted { language: Option<&'static str> },
    OutsideRoot,
    Oversized,
    Unreadable,
}

/// Walks a directory tree concurrently, one task per directory, and streams
/// every file that passes the policy into `sink` as a scored [`FileRecord`].
pub struct FileWalker {
    policy: ScanPolicy,
    weights: ScoreWeights,
    max_open_files: usize,
}

impl FileWalker {
    pub fn with_policy(policy: ScanPolicy, weights: ScoreWeights) -> Self {
        Self {
            policy,
            weights,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
        }
    }

    pub fn max_open_files(mut self, max_open_files: usize) -> Self {
        self.max_open_files = max_open_files.max(1);
        self
    }

    /// Walks `root`. Failures below the root are logged and skipped; only a
    /// missing or unlistable root is an error.
    pub async fn walk(&self, root: &Path, sink: mpsc::Sender<FileRecord>) -> Result<ScanStats> {
        let metadata = match fs::metadata(root).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(RepoDigestError::RootNotFound(root.to_path_buf()));
            }
            Err(err) => {
                return Err(RepoDigestError::io(
                    format!("reading scan root '{}'", root.display()),
                    err,
                ));
            }
        };
        if !metadata.is_dir() {
            return Err(RepoDigestError::RootNotDirectory(root.to_path_buf()));
        }
        let canonical_root = fs::canonicalize(root).await.map_err(|e| {
            RepoDigestError::io(format!("resolving scan root '{}'", root.display()), e)
        })?;

        let context = Arc::new(WalkContext {
            root: root.to_path_buf(),
            canonical_root,
            policy: self.policy.clone(),
            weights: self.weights,
            open_files: Semaphore::new(self.max_open_files),
            sink,
        });

        let root_outcome = scan_directory(Arc::clone(&context), root.to_path_buf(), 0).await?;
        let mut stats = root_outcome.stats;
        let mut directories = JoinSet::new();
        for (dir, depth) in root_outcome.subdirectories {
            directories.spawn(scan_directory(Arc::clone(&context), dir, depth));
        }

        while let Some(joined) = directories.join_next().await {
            match joined {
                Ok(Ok(outcome)) => {
                    stats.merge(outcome.stats);
                    for (dir, depth) in outcome.subdirectories {
                        directories.spawn(scan_directory(Arc::clone(&context), dir, depth));
                    }
                }
                Ok(Err(err)) => {
                    warn!(error = %err, "failed reading directory; skipping subtree");
                    stats.directories_unreadable += 1;
                }
                Err(err) => {
                    warn!(error = %err, "directory task failed; skipping subtree");
                    stats.directories_unreadable += 1;
                }
            }
        }

        debug!(
            root = %root.display(),
            files_accepted = stats.files_accepted,
            directories_visited = stats.directories_visited,
            "walk_complete"
        );

        Ok(stats)
    }
}

/// Lists one directory, evaluates its files concurrently, and reports the
/// subdirectories that still need visiting. Files in `dir` sit at `depth`.
async fn scan_directory(
    context: Arc<WalkContext>,
    dir: PathBuf,
    depth: usize,
) -> Result<DirectoryOutcome> {
    let Listing {
        subdirectories,
        candidates,
        mut stats,
    } = list_directory(&context, &dir, depth).await?;

    let mut files = JoinSet::new();
    for (path, priority) in candidates {
        files.spawn(evaluate_file(Arc::clone(&context), path, depth, priority));
    }

    while let Some(joined) = files.join_next().await {
        match joined {
            Ok(FileOutcome::Accepted { language }) => {
                stats.files_accepted += 1;
                if let Some(language) = language {
                    stats.languages.insert(language.to_string());
                }
            }
            Ok(FileOutcome::OutsideRoot) => stats.files_skipped += 1,
            Ok(FileOutcome::Oversized) => stats.files_oversized += 1,
            Ok(FileOutcome::Unreadable) => stats.files_unreadable += 1,
            Err(err) => {
                warn!(directory = %dir.display(), error = %err, "file task failed; skipping file");
                stats.files_unreadable += 1;
            }
        }
    }

    Ok(DirectoryOutcome {
        subdirectories,
        stats,
    })
}

/// Reads the entries of `dir` under one open-file permit. The directory
/// handle is closed before any of its files are opened.
async fn list_directory(context: &WalkContext, dir: &Path, depth: usize) -> Result<Listing> {
    let _permit = context
        .open_files
        .acquire()
        .await
        .map_err(|e| RepoDigestError::InvalidState(format!("open file limiter closed: {e}")))?;

    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| RepoDigestError::io(format!("reading directory '{}'", dir.display()), e))?;

    let mut listing = Listing {
        subdirectories: Vec::new(),
        candidates: Vec::new(),
        stats: ScanStats {
            directories_visited: 1,
            ..ScanStats::default()
        },
    };
    let stats = &mut listing.stats;

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                warn!(directory = %dir.display(), error = %err, "failed reading directory entry; skipping rest of directory");
                break;
            }
        };

        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = match entry.file_type().await {
            Ok(file_type) if file_type.is_symlink() => {
                // only file symlinks are followed; directory links could cycle
                match fs::metadata(&path).await {
                    Ok(target) if target.is_dir() => {
                        debug!(path = %path.display(), "skipping directory symlink");
                        stats.directories_pruned += 1;
                        continue;
                    }
                    _ => false,
                }
            }
            Ok(file_type) => file_type.is_dir(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed reading file type; skipping");
                stats.files_unreadable += 1;
                continue;
            }
        };

        if is_dir {
            let child_depth = depth + 1;
            if context.policy.skips_dir(&name) || !context.policy.allows_depth(child_depth) {
                debug!(directory = %path.display(), "prune_directory");
                stats.directories_pruned += 1;
            } else {
                listing.subdirectories.push((path, child_depth));
            }
            continue;
        }

        stats.files_seen += 1;
        match context.policy.classify_file(&name) {
            FileVerdict::Accepted { priority } => listing.candidates.push((path, priority)),
            FileVerdict::Skipped | FileVerdict::NotAllowed => stats.files_skipped += 1,
        }
    }

    Ok(listing)
}

async fn evaluate_file(
    context: Arc<WalkContext>,
    path: PathBuf,
    depth: usize,
    priority: bool,
) -> FileOutcome {
    let relative_path = relative_path_display(&path, &context.root);

    let content = {
        let Ok(_permit) = context.open_files.acquire().await else {
            return FileOutcome::Unreadable;
        };

        match fs::canonicalize(&path).await {
            Ok(resolved) if resolved.starts_with(&context.canonical_root) => {}
            Ok(resolved) => {
                warn!(
                    target_file = %relative_path,
                    resolved = %resolved.display(),
                    "file resolves outside the scan root; skipping file"
                );
                return FileOutcome::OutsideRoot;
            }
            Err(err) => {
                warn!(target_file = %relative_path, error = %err, "failed resolving file path; skipping file");
                return FileOutcome::Unreadable;
            }
        }

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(target_file = %relative_path, error = %err, "failed reading file metadata; skipping file");
                return FileOutcome::Unreadable;
            }
        };

        if metadata.len() > context.policy.max_file_size_bytes {
            debug!(
                target_file = %relative_path,
                size_bytes = metadata.len(),
                "file_oversized"
            );
            return FileOutcome::Oversized;
        }

        match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) => {
                warn!(target_file = %relative_path, error = %err, "failed reading source file; skipping file");
                return FileOutcome::Unreadable;
            }
        }
    };

    let language = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(languages::detect_language);
    let record = FileRecord::scored(relative_path, content, depth, priority, &context.weights);

    if context.sink.send(record).await.is_err() {
        debug!(path = %path.display(), "record sink closed");
    }

    FileOutcome::Accepted { language }
}

fn relative_path_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::fs as std_fs;

    use tempfile::TempDir;

    use super::*;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std_fs::create_dir_all(parent).unwrap();
        }
        std_fs::write(path, content).unwrap();
    }

    async fn collect(walker: &FileWalker, root: &Path) -> (Vec<FileRecord>, ScanStats) {
        let (tx, mut rx) = mpsc::channel(16);
        let collector = tokio::spawn(async move {
            let mut records = Vec::new();
            while let Some(record) = rx.recv().await {
                records.push(record);
            }
            records
        });
        let stats = walker.walk(root, tx).await.unwrap();
        let mut records = collector.await.unwrap();
        records.sort_by(|a, b| a.path().cmp(b.path()));
        (records, stats)
    }

    #[tokio::test]
    async fn depth_of_nested_files_lowers_score() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "top.rs", "");
        write(dir.path(), "a/b/deep.rs", "");

        let walker = FileWalker::with_policy(ScanPolicy::default(), ScoreWeights::default());
        let (records, stats) = collect(&walker, dir.path()).await;

        assert_eq!(records.len(), 2);
        let deep = records.iter().find(|r| r.path().ends_with("deep.rs")).unwrap();
        let top = records.iter().find(|r| r.path() == "top.rs").unwrap();
        assert_eq!(top.score(), 0.0);
        assert_eq!(deep.score(), -2.0);
        assert_eq!(stats.directories_visited, 3);
        assert!(stats.languages.contains("Rust"));
    }

    #[tokio::test]
    async fn max_depth_prunes_deeper_directories() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "root.py", "print(1)");
        write(dir.path(), "one/one.py", "print(1)");
        write(dir.path(), "one/two/two.py", "print(1)");

        let policy = ScanPolicy {
            max_depth: Some(1),
            ..ScanPolicy::default()
        };
        let walker = FileWalker::with_policy(policy, ScoreWeights::default());
        let (records, stats) = collect(&walker, dir.path()).await;

        let paths: Vec<_> = records.iter().map(|r| r.path().to_string()).collect();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| !p.ends_with("two.py")));
        assert_eq!(stats.directories_pruned, 1);
    }

    #[tokio::test]
    async fn invalid_utf8_file_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "ok.rs", "fn main() {}");
        std_fs::write(dir.path().join("blob.rs"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let walker = FileWalker::with_policy(ScanPolicy::default(), ScoreWeights::default())
            .max_open_files(1);
        let (records, stats) = collect(&walker, dir.path()).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path(), "ok.rs");
        assert_eq!(stats.files_unreadable, 1);
    }

    #[tokio::test]
    async fn wide_trees_are_scanned_completely() {
        let dir = TempDir::new().unwrap();
        for i in 0..3000 {
            write(dir.path(), &format!("d{i:04}/m.rs"), "fn m() {}");
        }

        let walker = FileWalker::with_policy(ScanPolicy::default(), ScoreWeights::default())
            .max_open_files(8);
        let (records, stats) = collect(&walker, dir.path()).await;

        assert_eq!(records.len(), 3000);
        assert_eq!(stats.files_accepted, 3000);
        assert_eq!(stats.directories_visited, 3001);
        assert_eq!(stats.directories_unreadable, 0);
        assert_eq!(stats.files_unreadable, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_symlinks_must_stay_inside_root() {
        use std::os::unix::fs::symlink;

        let outside = TempDir::new().unwrap();
        write(outside.path(), "secret.txt", "TOP SECRET KEY");
        let dir = TempDir::new().unwrap();
        write(dir.path(), "real.rs", "fn real() {}");
        symlink(outside.path().join("secret.txt"), dir.path().join("leak.js")).unwrap();
        symlink(dir.path().join("real.rs"), dir.path().join("alias.rs")).unwrap();

        let walker = FileWalker::with_policy(ScanPolicy::default(), ScoreWeights::default());
        let (records, stats) = collect(&walker, dir.path()).await;

        let paths: Vec<_> = records.iter().map(FileRecord::path).collect();
        assert_eq!(paths, vec!["alias.rs", "real.rs"]);
        assert!(records.iter().all(|r| !r.content().contains("SECRET")));
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.files_accepted, 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn directory_symlinks_are_pruned() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        write(dir.path(), "top.rs", "fn top() {}");
        write(dir.path(), "sub/inner.rs", "fn inner() {}");
        symlink(dir.path().join("sub"), dir.path().join("link")).unwrap();
        symlink(dir.path(), dir.path().join("sub/cycle")).unwrap();

        let walker = FileWalker::with_policy(ScanPolicy::default(), ScoreWeights::default());
        let (records, stats) = collect(&walker, dir.path()).await;

        let paths: Vec<_> = records.iter().map(FileRecord::path).collect();
        assert_eq!(paths, vec!["sub/inner.rs", "top.rs"]);
        assert_eq!(stats.directories_visited, 2);
        assert_eq!(stats.directories_pruned, 2);
        assert_eq!(stats.directories_unreadable, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_subdirectory_is_skipped_with_siblings_kept() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        write(dir.path(), "open.rs", "fn open() {}");
        write(dir.path(), "locked/hidden.rs", "fn hidden() {}");
        write(dir.path(), "other/visible.rs", "fn visible() {}");
        let locked = dir.path().join("locked");
        std_fs::set_permissions(&locked, std_fs::Permissions::from_mode(0o000)).unwrap();

        // privileged users can list the directory anyway
        if std_fs::read_dir(&locked).is_ok() {
            std_fs::set_permissions(&locked, std_fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let walker = FileWalker::with_policy(ScanPolicy::default(), ScoreWeights::default());
        let (records, stats) = collect(&walker, dir.path()).await;
        std_fs::set_permissions(&locked, std_fs::Permissions::from_mode(0o755)).unwrap();

        let paths: Vec<_> = records.iter().map(FileRecord::path).collect();
        assert_eq!(paths, vec!["open.rs", "other/visible.rs"]);
        assert_eq!(stats.directories_unreadable, 1);
        assert_eq!(stats.directories_visited, 2);
        assert_eq!(stats.files_accepted, 2);
    }

    #[tokio::test]
    async fn missing_root_is_distinct_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let walker = FileWalker::with_policy(ScanPolicy::default(), ScoreWeights::default());
        let (tx, _rx) = mpsc::channel(1);

        let err = walker.walk(&missing, tx).await.unwrap_err();
        assert!(matches!(err, RepoDigestError::RootNotFound(_)));
    }

    #[tokio::test]
    async fn file_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "file.rs", "");
        let walker = FileWalker::with_policy(ScanPolicy::default(), ScoreWeights::default());
        let (tx, _rx) = mpsc::channel(1);

        let err = walker.walk(&dir.path().join("file.rs"), tx).await.unwrap_err();
        assert!(matches!(err, RepoDigestError::RootNotDirectory(_)));
    }
}
