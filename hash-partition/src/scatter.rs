//! Scatter kernel launch wrapper (C5).
//!
//! One launch per source column, dispatched on the column's physical byte width. The kernel body
//! is written once in `cuda/partition.cu` (`scatter_impl<T>`) and instantiated at build time for
//! each of the four physical widths; this module is the host-side dispatcher that picks the right
//! instantiation by `DataType`.

use crate::kernels::KernelModule;
use crate::routing::RoutingTables;
use columnar::{Column, DataType};
use gpu_runtime::error::{Error, Result};
use rustacuda::function::{BlockSize, GridSize};
use rustacuda::launch;
use rustacuda::stream::Stream;

pub const SCATTER_BLOCK_SIZE: u32 = 256;

/// Name of the `extern "C"` kernel compiled for columns of this byte width, or `None` if the
/// width has no scatter instantiation (i.e., anything other than 1/2/4/8 bytes, which cannot
/// occur for a supported [`DataType`]).
fn kernel_name_for_width(byte_width: usize) -> Option<&'static str> {
    match byte_width {
        1 => Some("scatter_u8"),
        2 => Some("scatter_u16"),
        4 => Some("scatter_u32"),
        8 => Some("scatter_u64"),
        _ => None,
    }
}

/// Bytes of dynamic shared memory `scatter_impl<T>` needs for one block: the two offset tables
/// plus a `T`-typed staging buffer sized `block_size * K` cells (K small, here 8).
const STAGING_CELLS_PER_THREAD: u32 = 8;

fn shared_bytes(num_partitions: u32, byte_width: u32, block_size: u32) -> u32 {
    let offset_tables = (2 * num_partitions + 1) * std::mem::size_of::<u32>() as u32;
    let staging = block_size * STAGING_CELLS_PER_THREAD * byte_width;
    offset_tables + staging
}

/// Scatters `source`'s cells into a freshly allocated output column of the same `DataType` and
/// row count, using the routing tables C3/C4 already populated.
///
/// # Errors
///
/// Returns [`Error::UnsupportedType`] if `source` bears a null mask (scatter never propagates
/// nulls) or has an unsupported byte width.
pub fn scatter_column(
    module: &KernelModule,
    stream: &Stream,
    routing: &RoutingTables,
    num_rows: u32,
    source: &Column,
    resource: &dyn gpu_runtime::MemoryResource,
) -> Result<Column> {
    if source.has_nulls() {
        return Err(Error::UnsupportedType(format!(
            "scatter does not propagate null masks, but column of type {} has one",
            source.dtype()
        )));
    }

    let byte_width = source.dtype().byte_width();
    let kernel_name = kernel_name_for_width(byte_width).ok_or_else(|| {
        Error::UnsupportedType(format!(
            "no scatter kernel instantiation for a {}-byte cell (dtype {})",
            byte_width,
            source.dtype()
        ))
    })?;

    let mut output = Column::alloc_uninit(source.dtype(), num_rows as usize, resource)?;

    let function = module.function(kernel_name)?;
    let num_partitions = routing.num_partitions();
    let num_blocks = routing.num_blocks();
    let bytes = shared_bytes(num_partitions, byte_width as u32, SCATTER_BLOCK_SIZE);

    tracing::debug!(
        dtype = %source.dtype(),
        num_rows,
        num_partitions,
        num_blocks,
        "launching scatter kernel"
    );

    let src_ptr = source.byte_view().as_launchable_ptr();
    let row_partition_ptr = routing.row_partition.as_launchable_ptr();
    let row_local_offset_ptr = routing.row_local_offset.as_launchable_ptr();
    let block_histogram_ptr = routing.block_histogram.as_launchable_ptr();
    let block_scan_ptr = routing.block_scan.as_launchable_ptr();
    let output_ptr = output.byte_mut_ptr();

    unsafe {
        launch!(function<<<GridSize::from(num_blocks), BlockSize::from(SCATTER_BLOCK_SIZE), bytes, stream>>>(
            src_ptr,
            row_partition_ptr,
            row_local_offset_ptr,
            block_histogram_ptr,
            block_scan_ptr,
            num_rows,
            num_partitions,
            num_blocks,
            output_ptr
        ))?;
    }

    Ok(output)
}
