//! Histogram kernel launch wrapper (C3).

use crate::kernels::KernelModule;
use columnar::Column;
use gpu_runtime::error::Result;
use gpu_runtime::memory::{LaunchablePtr, Mem};
use rustacuda::function::{BlockSize, GridSize};
use rustacuda::launch;
use rustacuda::memory::DeviceCopy;
use rustacuda::stream::Stream;

pub const HISTOGRAM_BLOCK_SIZE: u32 = 256;
pub const HISTOGRAM_GRID_SIZE: u32 = 128;

/// One key column's device-resident view, laid out exactly as `cuda/common.cuh`'s
/// `KeyColumnArg` expects: a raw byte pointer, an optional word-packed null bitmask, the cell's
/// byte width, and this column's hash seed (see `hasher::hash_row`).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyColumnArg {
    data: LaunchablePtr<u8>,
    null_mask: LaunchablePtr<u32>,
    byte_width: u32,
    seed: u32,
}

unsafe impl DeviceCopy for KeyColumnArg {}

impl KeyColumnArg {
    pub fn from_column(column: &Column, seed: u32) -> Self {
        let data = column.byte_view().as_launchable_ptr();
        let null_mask = column
            .null_mask()
            .map(Mem::as_launchable_ptr)
            .unwrap_or_else(LaunchablePtr::null);
        KeyColumnArg {
            data,
            null_mask,
            byte_width: column.dtype().byte_width() as u32,
            seed,
        }
    }
}

/// The routing tables written by the histogram kernel; owned by [`crate::routing::RoutingTables`]
/// and borrowed here only for the duration of the launch.
pub struct HistogramOutput<'a> {
    pub row_partition: &'a mut Mem<u32>,
    pub row_local_offset: &'a mut Mem<u32>,
    pub block_histogram: &'a mut Mem<u32>,
    pub global_histogram: &'a mut Mem<u32>,
}

/// Launches the histogram kernel (C3): for every row, hashes its key columns, assigns a
/// partition, and accumulates the per-block and global histograms.
///
/// # Safety
///
/// `key_columns` must contain exactly as many device-resident views as `num_key_columns`, each
/// with at least `num_rows` cells; the output buffers must each be sized for `num_rows` (the
/// per-row arrays) or `num_partitions * num_blocks` / `num_partitions` (the histograms).
#[allow(clippy::too_many_arguments)]
pub unsafe fn launch_histogram(
    module: &KernelModule,
    stream: &Stream,
    key_columns: &Mem<KeyColumnArg>,
    num_rows: u32,
    num_partitions: u32,
    use_bitmask: bool,
    num_blocks: u32,
    output: HistogramOutput<'_>,
) -> Result<()> {
    let function = module.function("histogram_kernel")?;
    let shared_bytes = num_partitions * std::mem::size_of::<u32>() as u32;

    let key_columns_ptr = key_columns.as_launchable_ptr();
    let num_key_columns = key_columns.len() as u32;
    let row_partition_ptr = output.row_partition.as_launchable_mut_ptr();
    let row_local_offset_ptr = output.row_local_offset.as_launchable_mut_ptr();
    let block_histogram_ptr = output.block_histogram.as_launchable_mut_ptr();
    let global_histogram_ptr = output.global_histogram.as_launchable_mut_ptr();

    tracing::debug!(
        num_rows,
        num_partitions,
        num_blocks,
        use_bitmask,
        "launching histogram kernel"
    );

    launch!(function<<<GridSize::from(num_blocks), BlockSize::from(HISTOGRAM_BLOCK_SIZE), shared_bytes, stream>>>(
        key_columns_ptr,
        num_key_columns,
        num_rows,
        num_partitions,
        use_bitmask as i32,
        row_partition_ptr,
        row_local_offset_ptr,
        block_histogram_ptr,
        global_histogram_ptr
    ))?;

    Ok(())
}
