//! Collision-free output names.
//!
//! Every generated file is named `<root>_<tag>[_<n>].<ext>`, where `tag`
//! identifies the operation that produced it. Running an operation on its
//! own output stacks predictably: `photo.jpg` becomes `photo_压缩.jpg`, which
//! becomes `photo_压缩_1.jpg`, then `photo_压缩_2.jpg`, and so on.
//!
//! Existence is checked through a [`Probe`] and is not atomic with the
//! eventual write. Two independent batches writing into the same directory
//! can pick the same name; the later write wins. Within one batch,
//! [`Reservations`] rules that out.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// Answers whether a path is already taken.
#[async_trait]
pub trait Probe: Send + Sync {
    /// `true` if anything (file, directory, dangling symlink) exists at `path`.
    async fn exists(&self, path: &Path) -> bool;
}

/// [`Probe`] backed by the real filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsProbe;

#[async_trait]
impl Probe for FsProbe {
    async fn exists(&self, path: &Path) -> bool {
        // `symlink_metadata` so that a dangling symlink still counts as taken.
        fs::symlink_metadata(path).await.is_ok()
    }
}

/// Split a file stem into the root and the counter of a previous run of the
/// same operation.
///
/// Returns `(root, None)` for a stem that doesn't carry `tag`, and
/// `(root, Some(n))` for one that does; a bare `<root>_<tag>` counts as
/// `n = 0`.
fn split_tagged<'a>(stem: &'a str, tag: &str) -> (&'a str, Option<u32>) {
    let marker = format!("_{tag}");
    if let Some(root) = stem.strip_suffix(marker.as_str())
        && !root.is_empty()
    {
        return (root, Some(0));
    }
    if let Some((head, counter)) = stem.rsplit_once('_')
        && !counter.is_empty()
        && counter.bytes().all(|b| b.is_ascii_digit())
        && let Ok(n) = counter.parse::<u32>()
        && let Some(root) = head.strip_suffix(marker.as_str())
        && !root.is_empty()
    {
        return (root, Some(n));
    }
    (stem, None)
}

fn candidate(dir: &Path, root: &str, tag: &str, counter: Option<u32>, extension: Option<&str>) -> PathBuf {
    let mut name = format!("{root}_{tag}");
    if let Some(n) = counter {
        name.push_str(&format!("_{n}"));
    }
    if let Some(extension) = extension.filter(|e| !e.is_empty()) {
        name.push('.');
        name.push_str(extension);
    }
    dir.join(name)
}

/// Compute the first free output path in `dir` for `input` processed by the
/// operation identified by `tag`.
///
/// The extension is `target_extension` when given (format conversion),
/// otherwise the input's own extension. Never fails; keeps counting until
/// `probe` reports a free name.
pub async fn next_output_path(
    probe: &dyn Probe,
    dir: &Path,
    input: &Path,
    tag: &str,
    target_extension: Option<&str>,
) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let source_extension = input.extension().map(|e| e.to_string_lossy());
    let extension = target_extension.or(source_extension.as_deref());

    let (root, previous) = split_tagged(&stem, tag);
    // Past `u32::MAX` the search starts over from the bare `<root>_<tag>`.
    let mut counter = match previous {
        Some(n) => n.checked_add(1),
        None => None,
    };
    loop {
        let path = candidate(dir, root, tag, counter, extension);
        if !probe.exists(&path).await {
            return path;
        }
        counter = counter.map_or(Some(1), |n| n.checked_add(1));
    }
}

/// Names already handed out during the current batch.
///
/// Concurrent items of one batch pick their output names before any of them
/// has written anything; without reservations two inputs with the same stem
/// would both get `<stem>_<tag>.<ext>`.
#[derive(Debug, Default)]
pub struct Reservations {
    taken: Mutex<HashSet<PathBuf>>,
}

struct Reserved<'a> {
    probe: &'a dyn Probe,
    taken: &'a HashSet<PathBuf>,
}

#[async_trait]
impl Probe for Reserved<'_> {
    async fn exists(&self, path: &Path) -> bool {
        self.taken.contains(path) || self.probe.exists(path).await
    }
}

impl Reservations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Like [`next_output_path`], but also skips every name reserved earlier
    /// and reserves the one returned.
    pub async fn reserve(
        &self,
        probe: &dyn Probe,
        dir: &Path,
        input: &Path,
        tag: &str,
        target_extension: Option<&str>,
    ) -> PathBuf {
        let mut taken = self.taken.lock().await;
        let path = {
            let layered = Reserved { probe, taken: &taken };
            next_output_path(&layered, dir, input, tag, target_extension).await
        };
        taken.insert(path.clone());
        path
    }
}

/// Reject names that would move the entry or that no filesystem accepts.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        exn::bail!(ErrorKind::InvalidPath(PathBuf::from(name)));
    }
    Ok(())
}

/// The path `source` would have after being renamed to `new_name`.
///
/// The entry stays in its directory. A file keeps its extension when
/// `new_name` doesn't carry one; a directory never gains one.
pub fn rename_target(source: &Path, new_name: &str, is_dir: bool) -> Result<PathBuf> {
    validate_name(new_name)?;
    let Some(parent) = source.parent() else {
        exn::bail!(ErrorKind::InvalidPath(source.to_path_buf()));
    };
    let mut name = new_name.to_string();
    if !is_dir
        && Path::new(new_name).extension().is_none()
        && let Some(extension) = source.extension()
    {
        name.push('.');
        name.push_str(&extension.to_string_lossy());
    }
    Ok(parent.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use rstest::rstest;

    /// Deterministic probe over a fixed set of taken paths.
    struct Taken(HashSet<PathBuf>);

    #[async_trait]
    impl Probe for Taken {
        async fn exists(&self, path: &Path) -> bool {
            self.0.contains(path)
        }
    }

    fn taken(paths: &[&str]) -> Taken {
        Taken(paths.iter().map(PathBuf::from).collect())
    }

    #[rstest]
    #[case("photo", ("photo", None))]
    #[case("photo_压缩", ("photo", Some(0)))]
    #[case("photo_压缩_1", ("photo", Some(1)))]
    #[case("photo_压缩_12", ("photo", Some(12)))]
    #[case("photo_转换", ("photo_转换", None))]
    #[case("photo_2024", ("photo_2024", None))]
    #[case("photo_压缩_", ("photo_压缩_", None))]
    #[case("_压缩", ("_压缩", None))]
    #[case("a_b_压缩_3", ("a_b", Some(3)))]
    fn test_split_tagged(#[case] stem: &str, #[case] expected: (&str, Option<u32>)) {
        assert_eq!(split_tagged(stem, "压缩"), expected);
    }

    #[rstest]
    #[case("/d/a.jpg", &[], "/out/a_压缩.jpg")]
    #[case("/d/a.jpg", &["/out/a_压缩.jpg"], "/out/a_压缩_1.jpg")]
    #[case("/d/a.jpg", &["/out/a_压缩.jpg", "/out/a_压缩_1.jpg"], "/out/a_压缩_2.jpg")]
    #[case("/d/a_压缩.jpg", &[], "/out/a_压缩_1.jpg")]
    #[case("/d/a_压缩_4.jpg", &["/out/a_压缩_5.jpg"], "/out/a_压缩_6.jpg")]
    #[case("/d/README", &[], "/out/README_压缩")]
    #[case("/d/a_压缩_4294967295.jpg", &["/out/a_压缩_4294967295.jpg"], "/out/a_压缩.jpg")]
    #[case("/d/a_压缩_4294967295.jpg", &["/out/a_压缩.jpg"], "/out/a_压缩_1.jpg")]
    #[tokio::test]
    async fn test_next_output_path(#[case] input: &str, #[case] existing: &[&str], #[case] expected: &str) {
        let probe = taken(existing);
        let path = next_output_path(&probe, Path::new("/out"), Path::new(input), "压缩", None).await;
        assert_eq!(path, PathBuf::from(expected));
    }

    #[tokio::test]
    async fn test_counter_overflow_on_disk_terminates() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = temp_dir.path().join("a_压缩_4294967295.jpg");
        std::fs::write(&input, b"x").unwrap();
        let path = next_output_path(&FsProbe, temp_dir.path(), &input, "压缩", None).await;
        assert_eq!(path, temp_dir.path().join("a_压缩.jpg"));
    }

    #[tokio::test]
    async fn test_target_extension() {
        let path = next_output_path(&taken(&[]), Path::new("/out"), Path::new("/d/a.png"), "转换", Some("jpg")).await;
        assert_eq!(path, PathBuf::from("/out/a_转换.jpg"));
    }

    #[tokio::test]
    async fn test_never_returns_existing_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let input = Path::new("/elsewhere/a.jpg");
        for _ in 0..5 {
            let path = next_output_path(&FsProbe, temp_dir.path(), input, "压缩", None).await;
            assert!(!path.exists());
            std::fs::write(&path, b"x").unwrap();
        }
        assert!(temp_dir.path().join("a_压缩_4.jpg").exists());
    }

    #[tokio::test]
    async fn test_directory_counts_as_taken() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp_dir.path().join("a_水印.png")).unwrap();
        let path = next_output_path(&FsProbe, temp_dir.path(), Path::new("a.png"), "水印", None).await;
        assert_eq!(path, temp_dir.path().join("a_水印_1.png"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reservations_prevent_self_collision() {
        let reservations = Reservations::new();
        let dir = Path::new("/out");
        let input = Path::new("/d/a.jpg");
        let paths = join_all((0..8).map(|_| reservations.reserve(&FsProbe, dir, input, "压缩", None))).await;
        let unique: HashSet<_> = paths.iter().collect();
        assert_eq!(unique.len(), 8);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case(".")]
    #[case("..")]
    #[case("a/b")]
    #[case("a\\b")]
    #[case("nul\0byte")]
    fn test_validate_name_invalid(#[case] name: &str) {
        let err = validate_name(name).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[rstest]
    #[case("/d/a.jpg", "b", false, "/d/b.jpg")]
    #[case("/d/a.jpg", "b.png", false, "/d/b.png")]
    #[case("/d/a", "b", false, "/d/b")]
    #[case("/d/folder", "renamed", true, "/d/renamed")]
    #[case("/d/folder.v1", "folder", true, "/d/folder")]
    fn test_rename_target(#[case] source: &str, #[case] name: &str, #[case] is_dir: bool, #[case] expected: &str) {
        assert_eq!(rename_target(Path::new(source), name, is_dir).unwrap(), PathBuf::from(expected));
    }
}
