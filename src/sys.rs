//! Thin `libc`-backed wrappers over the three syscalls the resolver is
//! allowed to use: `lstat`, `readlink`, `getcwd`. No `openat`, no file
//! descriptors -- see `chroot.rs` for why.

use std::ffi::{CString, OsStr, OsString};
use std::io::Error;
use std::mem;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::Path;

use crate::errors::*;

macro_rules! try_errno {
    ($expr:expr) => {{
        let rc = $expr;

        ensure!(rc >= 0, Error::last_os_error());

        rc
    }};
}

pub(crate) fn to_cstring(path: &Path) -> CString {
    unsafe { CString::from_vec_unchecked(path.as_os_str().as_bytes().to_vec()) }
}

/// `lstat(2)`: stat without following a trailing symlink.
pub(crate) fn lstat(path: &Path) -> Result<libc::stat> {
    let c_path = to_cstring(path);

    #[allow(clippy::uninit_assumed_init)]
    let mut stat: libc::stat = unsafe { mem::MaybeUninit::uninit().assume_init() };

    try_errno!(unsafe { libc::lstat(c_path.as_ptr(), &mut stat) });

    Ok(stat)
}

/// `lstat(2)`, returning `None` instead of an error when the path does not exist.
pub(crate) fn lstat_opt(path: &Path) -> Result<Option<libc::stat>> {
    match lstat(path) {
        Ok(stat) => Ok(Some(stat)),
        Err(Error(ErrorKind::Io(ref e), _)) if e.raw_os_error() == Some(libc::ENOENT) => Ok(None),
        Err(e) => Err(e),
    }
}

/// `stat(2)`: stat following symlinks.
pub(crate) fn stat(path: &Path) -> Result<libc::stat> {
    let c_path = to_cstring(path);

    #[allow(clippy::uninit_assumed_init)]
    let mut stat: libc::stat = unsafe { mem::MaybeUninit::uninit().assume_init() };

    try_errno!(unsafe { libc::stat(c_path.as_ptr(), &mut stat) });

    Ok(stat)
}

pub(crate) fn is_symlink(stat: &libc::stat) -> bool {
    (stat.st_mode & libc::S_IFMT) == libc::S_IFLNK
}

pub(crate) fn same_file_by_stat(a: &libc::stat, b: &libc::stat) -> bool {
    a.st_dev == b.st_dev && a.st_ino == b.st_ino
}

/// `readlink(2)`.
pub(crate) fn readlink(path: &Path) -> Result<OsString> {
    let c_path = to_cstring(path);
    let mut buf = Vec::with_capacity(256);

    loop {
        let buf_sz = try_errno!(unsafe {
            libc::readlink(
                c_path.as_ptr(),
                buf.as_mut_ptr() as *mut _,
                buf.capacity(),
            )
        }) as usize;

        assert!(buf_sz <= buf.capacity());

        if buf_sz < buf.capacity() {
            unsafe { buf.set_len(buf_sz) };
            return Ok(OsString::from_vec(buf));
        }

        // readlink() fills the whole buffer -- it may have truncated; grow and retry.
        buf.reserve(buf.capacity() + 256);
    }
}

/// `getcwd(2)`.
pub(crate) fn getcwd() -> Result<std::path::PathBuf> {
    let mut buf_sz: usize = 512;

    loop {
        let mut buf: Vec<u8> = vec![0u8; buf_sz];
        let rc = unsafe { libc::getcwd(buf.as_mut_ptr() as *mut _, buf.len()) };

        if !rc.is_null() {
            let len = unsafe { libc::strlen(rc) };
            buf.truncate(len);
            return Ok(std::path::PathBuf::from(OsString::from_vec(buf)));
        }

        let err = Error::last_os_error();
        if err.raw_os_error() != Some(libc::ERANGE) {
            bail!(ErrorKind::IOFailure(format!("getcwd() failed: {}", err)));
        }

        buf_sz += 512;
    }
}

/// Reads the logical cwd via the procfs reflective symlink `<proc_root>/cwd`,
/// e.g. `/proc/self/cwd`.
pub(crate) fn readlink_proc_cwd(proc_root: &Path) -> Result<std::path::PathBuf> {
    let link = proc_root.join("cwd");
    readlink(&link).map(std::path::PathBuf::from)
}

pub(crate) fn env_var_os(name: &str) -> Option<OsString> {
    std::env::var_os(name)
}

pub(crate) fn as_bytes(s: &OsStr) -> &[u8] {
    s.as_bytes()
}
