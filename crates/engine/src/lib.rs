//! Batch file operations with per-item failure isolation.
//!
//! An [`Engine`] applies one operation to a batch of files concurrently and
//! reports a [`BatchResult`] with one [`ItemResult`] per input, in input
//! order. A failing item never affects its siblings.
//!
//! - **Generating** operations write new files next to nothing they read:
//!   [`compress`](Engine::compress), [`convert`](Engine::convert),
//!   [`crop`](Engine::crop) and [`add_watermark`](Engine::add_watermark)
//!   resolve an output directory once per batch and give every output a
//!   collision-free name carrying the operation's [tag](model::tags).
//! - **Mutating** operations act on the inputs themselves:
//!   [`rename`](Engine::rename) and [`delete_many`](Engine::delete_many).
//!
//! Pixel work is delegated to a [`Codec`](shears_codec::Codec) and runs on
//! Tokio's blocking pool.

mod batch;
pub mod error;
pub mod model;
mod ops;
pub mod options;

pub use crate::model::{
    Anchor, BatchResult, ConvertFormat, CropArea, FileTask, ItemResult, OperationKind, OperationParams, Position,
    WatermarkOptions,
};
pub use crate::options::{Options, WatermarkDefaults};
use shears_codec::CodecHandle;
use shears_fs::{FsProbe, ProbeHandle};
use std::sync::Arc;

/// Entry point for every operation.
///
/// Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct Engine {
    codec: CodecHandle,
    probe: ProbeHandle,
    options: Arc<Options>,
}

impl Engine {
    /// Create an engine that checks for existing output names on the real
    /// filesystem.
    pub fn new(codec: CodecHandle, options: Options) -> Self {
        Self {
            codec,
            probe: Arc::new(FsProbe),
            options: Arc::new(options),
        }
    }

    /// Replace the existence probe used when naming outputs.
    #[must_use]
    pub fn with_probe(mut self, probe: ProbeHandle) -> Self {
        self.probe = probe;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}
