//! Chroot-relative path resolver.
//!
//! A [`ChrootContext`] is a virtual filesystem view anchored at a logical
//! root directory: callers describe paths as if that root were `/`, and the
//! context translates between that chroot view and the paths the host OS
//! understands. It deliberately does **not** open any file descriptor or
//! enforce a sandbox -- symlinks that escape the root are followed, merely
//! *reported* relative to it.

use std::ffi::OsString;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Component, Path, PathBuf};

use crate::cwd;
use crate::errors::*;
use crate::pathutil;
use crate::sys;

/// Hop budget shared across a single parent-canonicalization call, bounding
/// both straight-line symlink chains and cycles.
const MAX_LOOP_CNT: u32 = 256;

struct HopBudget {
    remaining: u32,
}

impl HopBudget {
    fn new() -> Self {
        HopBudget {
            remaining: MAX_LOOP_CNT,
        }
    }

    fn consume(&mut self, path: &Path) -> Result<()> {
        if self.remaining == 0 {
            bail!(ErrorKind::SymlinkLoop(path.to_path_buf()));
        }
        self.remaining -= 1;
        Ok(())
    }
}

/// The normal (non-root, non-`.`/`..`) components of `path`, owned.
fn normal_segments(path: &Path) -> Vec<OsString> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(seg) => Some(seg.to_os_string()),
            _ => None,
        })
        .collect()
}

/// How many leading segments `anchor` and `segments` have in common.
fn common_prefix_len(anchor: &[OsString], segments: &[OsString]) -> usize {
    anchor
        .iter()
        .zip(segments.iter())
        .take_while(|(a, s)| a == s)
        .count()
}

/// Resolves a sequence of path segments component by component, following
/// every symlink encountered -- including one at the final segment -- and
/// failing with `BrokenPath` on any missing component except the last. The
/// first `skip` segments are copied verbatim with no `lstat` at all: they
/// are the already-captured, symlink-preserving cwd prefix a relative root
/// or base was joined onto, and re-walking them would defeat the very
/// preservation the capture exists for. A symlink target, once
/// dereferenced, is always resolved fresh from `/` (`skip = 0`) -- the
/// opaque prefix only ever protects the literal captured cwd.
fn resolve_with_skip(segments: &[OsString], skip: usize, budget: &mut HopBudget) -> Result<PathBuf> {
    let mut current = PathBuf::from("/");
    for seg in &segments[..skip.min(segments.len())] {
        current.push(seg);
    }

    let total = segments.len();

    for (i, seg) in segments.iter().enumerate() {
        if i < skip {
            continue;
        }

        let is_last = i + 1 == total;
        let candidate = current.join(seg);

        match sys::lstat_opt(&candidate)? {
            None => {
                if is_last {
                    current = candidate;
                } else {
                    bail!(ErrorKind::BrokenPath(candidate));
                }
            }
            Some(stat) if sys::is_symlink(&stat) => {
                budget.consume(&candidate)?;

                let target = PathBuf::from(sys::readlink(&candidate)?);
                let target_abs = if pathutil::is_absolute(&target) {
                    pathutil::lexically_clean(&target)
                } else {
                    pathutil::join_clean(&current, &target)
                };

                debug!("resolving symlink {:?} -> {:?}", candidate, target_abs);
                current = resolve_with_skip(&normal_segments(&target_abs), 0, budget)?;
            }
            Some(_) => {
                current = candidate;
            }
        }
    }

    Ok(current)
}

/// Fully resolves `path`'s parent directory chain, leaving the final
/// component of `path` untouched. `anchors` lists the candidate opaque
/// prefixes (the captured cwd, when `path` was built by
/// joining a relative root/base onto it; a caller-supplied `base`, since it
/// is itself already a resolved, given-correct prefix) that must not be
/// re-walked -- whichever shares the longest prefix with `path`'s parent
/// wins. This matters for `root` built on top of a `base`: re-deriving a
/// `/proc/<pid>/root`-style prefix via `lstat`/`readlink` is actively wrong,
/// since `readlink` on that particular magic symlink returns `/`, not a
/// usable redirect, and would silently collapse the whole prefix.
fn canonicalize_parent(path: &Path, anchors: &[&Path], budget: &mut HopBudget) -> Result<PathBuf> {
    match (path.parent(), path.file_name()) {
        (None, _) | (Some(_), None) => Ok(path.to_path_buf()),
        (Some(parent), Some(name)) => {
            let parent_segments = normal_segments(parent);
            let skip = anchors
                .iter()
                .map(|anchor| common_prefix_len(&normal_segments(anchor), &parent_segments))
                .max()
                .unwrap_or(0);

            let resolved_parent = resolve_with_skip(&parent_segments, skip, budget)?;
            Ok(resolved_parent.join(name))
        }
    }
}

/// Wraps a `canonicalize_parent` failure for reporting as part of root/base
/// construction. `SymlinkLoop` and `BrokenPath` already name the precise
/// failure and are passed through unchanged so callers can match on them;
/// anything else (a raw `lstat`/`readlink` failure) is the generic case and
/// gets wrapped in `BadRoot` with the argument that caused it.
fn wrap_canon_err(err: Error, what: &str, path: &Path) -> Error {
    let keep_specific = matches!(err.kind(), ErrorKind::SymlinkLoop(_) | ErrorKind::BrokenPath(_));

    if keep_specific {
        err
    } else {
        Error::with_chain(err, ErrorKind::BadRoot(format!("failed to canonicalize {} {:?}", what, path)))
    }
}

/// Resolves `raw` (a root or base argument) to an absolute, lexically clean
/// path, alongside the opaque anchor `canonicalize_parent` must protect: the
/// captured cwd when `raw` was empty or relative, `/` when it was already
/// absolute and so independent of any particular cwd.
fn resolve_to_absolute(raw: &Path, cwd0: &Path) -> (PathBuf, PathBuf) {
    if raw.as_os_str().is_empty() {
        (cwd0.to_path_buf(), cwd0.to_path_buf())
    } else if pathutil::is_absolute(raw) {
        (pathutil::lexically_clean(raw), PathBuf::from("/"))
    } else {
        (pathutil::join_clean(cwd0, raw), cwd0.to_path_buf())
    }
}

fn strip_leading_slash(p: &Path) -> PathBuf {
    let bytes = p.as_os_str().as_bytes();
    if bytes.first() == Some(&b'/') {
        PathBuf::from(std::ffi::OsStr::from_bytes(&bytes[1..]))
    } else {
        p.to_path_buf()
    }
}

fn concat_bytes(a: &Path, b: &Path, separator: bool) -> PathBuf {
    let mut bytes = a.as_os_str().as_bytes().to_vec();
    if separator && bytes.last() != Some(&b'/') {
        bytes.push(b'/');
    }
    bytes.extend_from_slice(b.as_os_str().as_bytes());
    PathBuf::from(OsString::from_vec(bytes))
}

/// The resolver object: an immutable, `Send + Sync` view of a chroot root
/// (and optional procfs-style `base`) captured once at construction time.
#[derive(Debug, Clone)]
pub struct ChrootContext {
    root: PathBuf,
    base: Option<PathBuf>,
    cwd_relative_to_root: PathBuf,
}

impl ChrootContext {
    /// Builds a context anchored at `root` (empty means "the current
    /// directory"), optionally with `base` -- the native prefix under which
    /// `root` actually lives (procfs reflection, indirect symlink roots).
    pub fn new<R, B>(root: R, base: Option<B>) -> Result<Self>
    where
        R: AsRef<Path>,
        B: AsRef<Path>,
    {
        let cwd0 = cwd::get_logical_cwd(None)?;

        let (root_raw, root_cwd_anchor) = resolve_to_absolute(root.as_ref(), &cwd0);
        let base_raw = base.map(|b| resolve_to_absolute(b.as_ref(), &cwd0));

        let mut budget = HopBudget::new();

        // base is resolved first: a root built on top of it treats it as an
        // additional opaque anchor (see `canonicalize_parent`'s doc comment).
        let base_canon = match base_raw {
            Some((ref b, ref anchor)) => Some(
                canonicalize_parent(b, &[anchor], &mut budget)
                    .map_err(|e| wrap_canon_err(e, "base", b))?,
            ),
            None => None,
        };

        let root_anchors: Vec<&Path> = match &base_canon {
            Some(b) => vec![&root_cwd_anchor, b],
            None => vec![&root_cwd_anchor],
        };
        let root_canon = canonicalize_parent(&root_raw, &root_anchors, &mut budget)
            .map_err(|e| wrap_canon_err(e, "root", &root_raw))?;

        if let Some(ref b) = base_canon {
            ensure!(
                pathutil::strip_prefix_exact(&root_canon, b).is_some(),
                ErrorKind::BadRoot(format!(
                    "base {:?} is not a prefix of root {:?}",
                    b, root_canon
                ))
            );
        }

        let cwd_relative_to_root = match pathutil::strip_prefix_exact(&cwd0, &root_canon) {
            Some(ref p) if p.as_os_str() == "/" => PathBuf::new(),
            Some(p) => strip_leading_slash(&p),
            None => {
                debug!(
                    "cwd {:?} is not under root {:?}; relative paths resolve against root",
                    cwd0, root_canon
                );
                PathBuf::new()
            }
        };

        debug!(
            "chroot context: root={:?} base={:?} cwd_relative_to_root={:?}",
            root_canon, base_canon, cwd_relative_to_root
        );

        Ok(ChrootContext {
            root: root_canon,
            base: base_canon,
            cwd_relative_to_root,
        })
    }

    /// The canonicalized absolute root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The canonicalized absolute base, if one was supplied.
    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    /// The capture-time working directory, expressed relative to `root`.
    /// Empty when the cwd equals `root` or sits outside it.
    pub fn cwd_relative_to_root(&self) -> &Path {
        &self.cwd_relative_to_root
    }

    fn relative_anchor(&self) -> PathBuf {
        pathutil::join_clean(&self.root, &self.cwd_relative_to_root)
    }

    /// Converts a user-facing path (chroot-absolute, or relative to the
    /// capture-time cwd) into a path the host OS can open. Symlinks within
    /// the path are never dereferenced.
    pub fn to_native_path(&self, input: impl AsRef<Path>) -> Result<PathBuf> {
        let input = input.as_ref();
        ensure!(!input.as_os_str().is_empty(), ErrorKind::EmptyPath);

        let native = if pathutil::is_absolute(input) {
            pathutil::join_clean(&self.root, input)
        } else {
            pathutil::join_clean(&self.relative_anchor(), input)
        };

        let native = match &self.base {
            Some(base) if pathutil::strip_prefix_exact(&native, base).is_none() => {
                pathutil::join_clean(base, &native)
            }
            _ => native,
        };

        Ok(native)
    }

    /// Converts a native path back into its chroot-relative reporting form.
    /// Paths that resolve inside `root` are returned without a leading `/`
    /// (the exact root itself maps to `/`); paths that escape `root` but
    /// still live under `base` are reported as an absolute, native-style
    /// path relative to `base` instead.
    pub fn to_chroot_path(&self, native_path: impl AsRef<Path>) -> Result<PathBuf> {
        let native_path = native_path.as_ref();

        let n = if pathutil::is_absolute(native_path) {
            pathutil::lexically_clean(native_path)
        } else {
            self.to_native_path(native_path)?
        };

        let n_prime = match &self.base {
            Some(base) => pathutil::strip_prefix_exact(&n, base).unwrap_or_else(|| n.clone()),
            None => n.clone(),
        };

        match pathutil::strip_prefix_exact(&n_prime, &self.root) {
            Some(ref p) if p.as_os_str() == "/" => Ok(PathBuf::from("/")),
            Some(p) => Ok(strip_leading_slash(&p)),
            None => Ok(n_prime),
        }
    }

    /// Adjusts a user-supplied glob pattern so it anchors under the native
    /// layout. This only adjusts the prefix -- glob matching itself is out
    /// of scope -- so metacharacters anywhere in `pattern` (including a
    /// literal `*` or `[` that happens to be a real directory name inside
    /// `root`) are never escaped.
    pub fn to_native_glob(&self, pattern: impl AsRef<Path>) -> Result<PathBuf> {
        let pattern = pattern.as_ref();

        if pattern.as_os_str().is_empty() {
            return Ok(PathBuf::new());
        }

        if pathutil::starts_with_glob_metachar(pattern) {
            return Ok(pattern.to_path_buf());
        }

        if pathutil::is_absolute(pattern) {
            Ok(concat_bytes(&self.root, pattern, false))
        } else {
            let anchor = self.relative_anchor();
            Ok(concat_bytes(&anchor, pattern, true))
        }
    }
}

#[cfg(test)]
#[path = "tests/fixture.inc.rs"]
mod fixture;

#[cfg(test)]
#[path = "tests/chroot.inc.rs"]
mod test;
