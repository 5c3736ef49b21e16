//! Chroot-relative path resolver.
//!
//! Translates user-facing paths between a logical chroot view and the
//! native filesystem, without opening any file descriptor or enforcing a
//! sandbox. See [`chroot::ChrootContext`] for the entry point.

#![allow(clippy::redundant_field_names)]

#[macro_use]
extern crate log;

#[macro_use]
extern crate error_chain;

pub mod chroot;
pub mod cwd;
pub mod errors;
pub(crate) mod pathutil;
pub(crate) mod sys;

pub use chroot::ChrootContext;
pub use cwd::get_logical_cwd;
pub use errors::{Error, ErrorKind, Result};
