//! Residual command buffers, the decoder's output.
//!
//! Each tile decode appends an ordered stream of residual operations at
//! transform-unit granularity for a downstream applier. The CPU form is
//! a compact delta-indexed byte arena; the GPU form is a fixed-slot
//! array with absolute TU indices, ready for upload.

mod cpu;
mod gpu;

pub use cpu::{CpuCmd, CpuCmdBuffer, CpuCmdIter, CpuCmdRecord, CpuEntryPoint};
pub use gpu::{GpuCmdBuffer, GpuCommand, GpuOperation};

/// Where one tile decode writes its commands. Exactly one sink per
/// decode; tiles own disjoint buffers, so the caller may decode tiles
/// in parallel.
#[derive(Debug)]
pub enum CmdBufferSink<'a> {
    /// Append to a CPU command buffer.
    Cpu(&'a mut CpuCmdBuffer),
    /// Append to a GPU command buffer.
    Gpu(&'a mut GpuCmdBuffer),
}
