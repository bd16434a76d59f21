use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use lazy_static::lazy_static;

/// Prefix shared by every scratch file this tool creates.
pub const SCRATCH_PREFIX: &str = "cdtmp";

static NEXT_INDEX: AtomicUsize = AtomicUsize::new(0);

lazy_static! {
    static ref PROCESS_ID: u32 = std::process::id();
}

/// Build a scratch stem from a process id and a per-process index.
///
/// The stem is `cdtmp{pid}_{index}`. Two processes sharing a work directory
/// never collide, and within a process the index is never reused.
pub fn indexed_scratch_stem(pid: u32, index: usize) -> String {
    format!("{SCRATCH_PREFIX}{pid}_{index}")
}

/// Next unused scratch stem for this process, as a path inside `dir`.
pub fn next_scratch_path(dir: &Path) -> PathBuf {
    let index = NEXT_INDEX.fetch_add(1, Ordering::Relaxed);
    dir.join(indexed_scratch_stem(*PROCESS_ID, index))
}

/// `path` with `.{extension}` appended to its file name.
pub fn with_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    if !extension.is_empty() {
        name.push(".");
        name.push(extension);
    }
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_stem() {
        assert_eq!(indexed_scratch_stem(1234, 0), "cdtmp1234_0");
        assert_eq!(indexed_scratch_stem(1234, 17), "cdtmp1234_17");
    }

    #[test]
    fn test_same_index_different_processes() {
        assert_ne!(indexed_scratch_stem(1, 5), indexed_scratch_stem(2, 5));
    }

    #[test]
    fn test_next_scratch_path_is_unique() {
        let dir = Path::new("/tmp/work");
        let first = next_scratch_path(dir);
        let second = next_scratch_path(dir);
        assert_ne!(first, second);
        assert!(first.starts_with(dir));
        assert!(
            first
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(SCRATCH_PREFIX)
        );
    }

    #[test]
    fn test_with_extension() {
        let stem = Path::new("/tmp/cdtmp1_0");
        assert_eq!(with_extension(stem, "c"), PathBuf::from("/tmp/cdtmp1_0.c"));
        assert_eq!(with_extension(stem, ""), PathBuf::from("/tmp/cdtmp1_0"));
    }
}
