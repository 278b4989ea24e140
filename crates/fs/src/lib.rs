//! Filesystem primitives shared by every shears operation.
//!
//! - [`resolve_output_dir`] turns user input into an existing, absolute
//!   output directory, creating it when needed.
//! - [`next_output_path`] picks a collision-free output file name for an
//!   operation, and [`Reservations`] keeps one batch from colliding with
//!   itself.
//! - [`rename_target`] computes where a rename would land.
//! - [`delete_many`] and [`delete_each`] remove files and folders, trying to
//!   repair permission problems before giving up on a path.
//! - [`classify`] maps any I/O error onto the handful of failures a user can
//!   act on.

mod classify;
mod delete;
pub mod error;
mod naming;
mod resolve;

pub use crate::classify::{Failure, classify};
pub use crate::delete::{DeleteOutcome, delete_each, delete_many, delete_path};
pub use crate::naming::{FsProbe, Probe, Reservations, next_output_path, rename_target, validate_name};
pub use crate::resolve::resolve_output_dir;
use std::sync::Arc;

pub type ProbeHandle = Arc<dyn Probe + Send + Sync>;
