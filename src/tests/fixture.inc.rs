//! Shared test scaffolding: fixture-tree construction and a cwd/env guard.
//!
//! Several scenarios below require changing the process cwd and the `PWD`
//! environment variable, both of which are process-global state. `CwdGuard`
//! snapshots both on construction and restores them on drop; callers must
//! additionally serialize via `TEST_LOCK` since cargo runs `#[test]`
//! functions on multiple threads of the same process.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempdir::TempDir;

pub static TEST_LOCK: Mutex<()> = Mutex::new(());

pub struct CwdGuard {
    original_cwd: PathBuf,
    original_pwd: Option<OsString>,
}

impl CwdGuard {
    pub fn enter(dir: &Path) -> Self {
        let guard = CwdGuard {
            original_cwd: std::env::current_dir().expect("current_dir"),
            original_pwd: std::env::var_os("PWD"),
        };

        std::env::set_current_dir(dir).expect("set_current_dir");
        std::env::set_var("PWD", dir);

        guard
    }

    pub fn set_pwd(&self, pwd: &Path) {
        std::env::set_var("PWD", pwd);
    }

    pub fn clear_pwd(&self) {
        std::env::remove_var("PWD");
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original_cwd);
        match &self.original_pwd {
            Some(p) => std::env::set_var("PWD", p),
            None => std::env::remove_var("PWD"),
        }
    }
}

pub fn tmpdir() -> TempDir {
    TempDir::new("chroot-resolve-test").expect("failed to create tmpdir")
}

pub fn mkdirp(path: &Path) {
    fs::create_dir_all(path).unwrap_or_else(|e| panic!("mkdir -p {:?}: {}", path, e));
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        mkdirp(parent);
    }
    fs::write(path, content).unwrap_or_else(|e| panic!("write {:?}: {}", path, e));
}

pub fn symlink(target: &Path, link: &Path) {
    if let Some(parent) = link.parent() {
        mkdirp(parent);
    }
    std::os::unix::fs::symlink(target, link)
        .unwrap_or_else(|e| panic!("symlink {:?} -> {:?}: {}", link, target, e));
}
