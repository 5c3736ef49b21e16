//! Pure, filesystem-free path manipulation: lexical cleaning, joining and
//! exact-byte prefix handling. No symlink resolution happens here -- that is
//! `chroot.rs`'s job. Kept deliberately free of any syscall so translation
//! calls on an already-constructed `ChrootContext` never touch the disk.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path, PathBuf};

/// Lexically cleans `path`: collapses `.` and duplicate/trailing separators
/// and resolves `..` against preceding components without touching the
/// filesystem. A leading `..` on an absolute path is dropped (you cannot
/// lexically escape `/`); on a relative path it is kept.
pub(crate) fn lexically_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let is_absolute = is_absolute(path);

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::ParentDir => {
                match out.components().next_back() {
                    Some(Component::Normal(_)) => {
                        out.pop();
                    }
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => {
                        // already at the root; ".." is a no-op
                    }
                    _ => {
                        if is_absolute {
                            // no preceding component at all but path is
                            // absolute: still a no-op
                        } else {
                            out.push("..");
                        }
                    }
                }
            }
            Component::Normal(seg) => out.push(seg),
        }
    }

    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// Whether `path` begins with the `/` separator byte, independent of
/// whether it is valid UTF-8.
pub(crate) fn is_absolute(path: &Path) -> bool {
    path.as_os_str()
        .as_bytes()
        .first()
        .map(|&b| b == b'/')
        .unwrap_or(false)
}

/// Joins `base` and `rel`, then lexically cleans the result. `rel` is always
/// treated as relative to `base`, even if it happens to start with `/`.
pub(crate) fn join_clean(base: &Path, rel: &Path) -> PathBuf {
    let mut joined = base.to_path_buf();

    for component in rel.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => {}
            _ => joined.push(component.as_os_str()),
        }
    }

    lexically_clean(&joined)
}

/// Strips `prefix` from `path` component-wise (exact byte comparison),
/// returning the remainder rooted at `/` (empty remainder maps to `/`).
pub(crate) fn strip_prefix_exact(path: &Path, prefix: &Path) -> Option<PathBuf> {
    if prefix.as_os_str().is_empty() {
        return Some(path.to_path_buf());
    }

    let path_bytes = path.as_os_str().as_bytes();
    let prefix_bytes = strip_trailing_slash(prefix.as_os_str().as_bytes());

    if path_bytes == prefix_bytes {
        return Some(PathBuf::from("/"));
    }

    if path_bytes.len() > prefix_bytes.len()
        && &path_bytes[..prefix_bytes.len()] == prefix_bytes
        && path_bytes[prefix_bytes.len()] == b'/'
    {
        let remainder = &path_bytes[prefix_bytes.len()..];
        return Some(PathBuf::from(OsStr::from_bytes(remainder)));
    }

    None
}

fn strip_trailing_slash(bytes: &[u8]) -> &[u8] {
    if bytes.len() > 1 && bytes.last() == Some(&b'/') {
        &bytes[..bytes.len() - 1]
    } else {
        bytes
    }
}

/// The leading byte of a glob-significant metacharacter class (`*`, `?`, `[`).
pub(crate) fn starts_with_glob_metachar(pattern: &Path) -> bool {
    matches!(
        pattern.as_os_str().as_bytes().first(),
        Some(b'*') | Some(b'?') | Some(b'[')
    )
}
