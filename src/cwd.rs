//! Logical working-directory capture.
//!
//! The kernel's `getcwd` always returns a fully symlink-dereferenced path.
//! Shells preserve the path the user actually typed via `PWD`. Losing that
//! distinction during construction would collapse the root-through-symlink
//! guarantees the resolver exists to provide, so `PWD` is read and checked
//! here rather than trusted blindly.

use std::path::{Path, PathBuf};

use crate::pathutil;
use crate::sys;
use crate::errors::*;

/// Returns the logical cwd: `PWD` when it is non-empty, absolute, lexically
/// clean, and names the same filesystem object as the kernel's `getcwd`;
/// otherwise the kernel cwd itself.
///
/// `proc_root`, when given, is a `/proc/<pid>` style directory whose `cwd`
/// entry is read instead of calling `getcwd()` directly -- this is how a
/// caller inspecting another process's view of the world (or its own,
/// reflected through `/proc/self`) obtains the same notion of "kernel cwd".
pub fn get_logical_cwd(proc_root: Option<&Path>) -> Result<PathBuf> {
    let kernel_cwd = match proc_root {
        Some(root) => sys::readlink_proc_cwd(root)?,
        None => sys::getcwd()?,
    };

    let pwd = match sys::env_var_os("PWD") {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => return Ok(kernel_cwd),
    };

    if !pathutil::is_absolute(&pwd) {
        debug!("PWD {:?} is not absolute, ignoring", pwd);
        return Ok(kernel_cwd);
    }

    let pwd_clean = pathutil::lexically_clean(&pwd);
    if pwd_clean != pwd {
        debug!("PWD {:?} is not lexically clean, ignoring", pwd);
        return Ok(kernel_cwd);
    }

    match (sys::stat(&pwd_clean), sys::stat(&kernel_cwd)) {
        (Ok(pwd_stat), Ok(kernel_stat)) if sys::same_file_by_stat(&pwd_stat, &kernel_stat) => {
            Ok(pwd_clean)
        }
        (Ok(_), Ok(_)) => {
            warn!(
                "PWD {:?} does not match kernel cwd {:?}, ignoring",
                pwd_clean, kernel_cwd
            );
            Ok(kernel_cwd)
        }
        _ => {
            warn!("failed to stat PWD {:?}, ignoring", pwd_clean);
            Ok(kernel_cwd)
        }
    }
}
