//! Orchestrator (C6): the two public entry points of this crate.

use crate::hasher::DEFAULT_SEED;
use crate::histogram::{self, HistogramOutput, KeyColumnArg};
use crate::kernels::KernelModule;
use crate::partitioner::PartitionerKind;
use crate::routing::RoutingTables;
use crate::scatter;
use columnar::{Column, DataType, Table};
use gpu_runtime::allocator::{Allocator, MemType, MemoryResource};
use gpu_runtime::error::{Error, Result};
use gpu_runtime::memory::Mem;
use rustacuda::stream::{Stream, StreamFlags};
use std::convert::TryInto;

const HISTOGRAM_BLOCK_SIZE: u32 = histogram::HISTOGRAM_BLOCK_SIZE;
const MAX_HISTOGRAM_BLOCKS: u32 = histogram::HISTOGRAM_GRID_SIZE;

fn num_blocks_for(num_rows: u32) -> u32 {
    let needed = (num_rows + HISTOGRAM_BLOCK_SIZE - 1) / HISTOGRAM_BLOCK_SIZE;
    needed.clamp(1, MAX_HISTOGRAM_BLOCKS)
}

/// Uploads one [`KeyColumnArg`] per key column, paired with its seed, into a small unified-memory
/// array the kernels can dereference directly. `seeds.len()` must equal `keys.len()`.
fn upload_key_column_args(keys: &[&Column], seeds: &[u32]) -> Result<Mem<KeyColumnArg>> {
    let args: Vec<KeyColumnArg> = keys
        .iter()
        .zip(seeds)
        .map(|(c, &seed)| KeyColumnArg::from_column(c, seed))
        .collect();
    let mut buf = Allocator::try_alloc_mem::<KeyColumnArg>(MemType::CudaUniMem, args.len().max(1))?;
    let slice: &mut [KeyColumnArg] = (&mut buf)
        .try_into()
        .map_err(|e: &str| Error::RuntimeError(e.to_string()))?;
    slice[..args.len()].copy_from_slice(&args);
    Ok(buf)
}

/// Builds a zero-row table with the same column types as `table`, used for the empty/invalid
/// short-circuit paths (§4.4's edge policy, §8 property 7).
fn empty_like(table: &Table, resource: &dyn MemoryResource) -> Result<Table> {
    let columns = table
        .columns()
        .iter()
        .map(|c| Column::alloc_uninit(c.dtype(), 0, resource))
        .collect::<Result<Vec<_>>>()?;
    Table::new(columns)
}

/// `hash_partition(input_table, key_column_indices, num_partitions, memory_resource)`.
///
/// Redistributes every row of `input_table` into one of `num_partitions` partitions by hashing
/// the designated key columns, returning a row-permuted output table of the same schema and the
/// length-`num_partitions` vector of partition start offsets.
pub fn hash_partition(
    input_table: &Table,
    key_column_indices: &[usize],
    num_partitions: u32,
    memory_resource: &dyn MemoryResource,
) -> Result<(Table, Vec<u64>)> {
    let num_rows = input_table.num_rows() as u32;

    tracing::info!(
        num_rows,
        num_key_columns = key_column_indices.len(),
        num_partitions,
        "hash_partition: start"
    );

    if num_partitions == 0 || num_rows == 0 || key_column_indices.is_empty() {
        let output = empty_like(input_table, memory_resource)?;
        tracing::info!("hash_partition: short-circuited on empty input");
        return Ok((output, Vec::new()));
    }

    let key_columns = input_table.project(key_column_indices)?;
    for col in &key_columns {
        if !col.dtype().is_fixed_width() {
            return Err(Error::UnsupportedType(format!(
                "key column of type {} is not fixed-width",
                col.dtype()
            )));
        }
    }

    let partitioner = PartitionerKind::for_partition_count(num_partitions);
    let num_blocks = num_blocks_for(num_rows);

    let module = KernelModule::load()?;
    let stream = Stream::new(StreamFlags::NON_BLOCKING, None)?;

    let mut routing = RoutingTables::new(MemType::CudaDevMem, num_rows, num_partitions, num_blocks)?;
    let seeds = vec![DEFAULT_SEED; key_columns.len()];
    let key_column_args = upload_key_column_args(&key_columns, &seeds)?;

    unsafe {
        histogram::launch_histogram(
            &module,
            &stream,
            &key_column_args,
            num_rows,
            num_partitions,
            partitioner.use_bitmask_flag() != 0,
            num_blocks,
            HistogramOutput {
                row_partition: &mut routing.row_partition,
                row_local_offset: &mut routing.row_local_offset,
                block_histogram: &mut routing.block_histogram,
                global_histogram: &mut routing.global_histogram,
            },
        )?;
    }

    let partition_offsets = routing.build_offsets(&module, &stream)?;

    let mut output_columns = Vec::with_capacity(input_table.num_columns());
    for column in input_table.columns() {
        let out = scatter::scatter_column(&module, &stream, &routing, num_rows, column, memory_resource)?;
        output_columns.push(out);
    }
    stream.synchronize()?;

    let output_table = Table::new(output_columns)?;

    tracing::info!(num_rows, num_partitions, "hash_partition: done");

    Ok((output_table, partition_offsets))
}

/// `hash(input_table, initial_hash_per_column)`.
///
/// Computes the 32-bit row hash of every row of `input_table` across all of its columns (not just
/// a caller-selected key subset), seeding each column's contribution from
/// `initial_hash_per_column` if non-empty, or [`DEFAULT_SEED`] otherwise.
pub fn hash(
    input_table: &Table,
    initial_hash_per_column: &[u32],
    memory_resource: &dyn MemoryResource,
) -> Result<Column> {
    let num_rows = input_table.num_rows() as u32;
    let num_columns = input_table.num_columns();

    if !initial_hash_per_column.is_empty() && initial_hash_per_column.len() != num_columns {
        return Err(Error::InvalidArgument(format!(
            "initial_hash_per_column has {} entries, table has {} columns",
            initial_hash_per_column.len(),
            num_columns
        )));
    }

    tracing::info!(num_rows, num_columns, "hash: start");

    if num_rows == 0 || num_columns == 0 {
        return Column::alloc_uninit(DataType::UInt32, 0, memory_resource);
    }

    let columns: Vec<&Column> = input_table.columns().iter().collect();
    let seeds: Vec<u32> = if initial_hash_per_column.is_empty() {
        vec![DEFAULT_SEED; num_columns]
    } else {
        initial_hash_per_column.to_vec()
    };

    let module = KernelModule::load()?;
    let stream = Stream::new(StreamFlags::NON_BLOCKING, None)?;
    let key_column_args = upload_key_column_args(&columns, &seeds)?;

    let mut output = Column::alloc_uninit(DataType::UInt32, num_rows as usize, memory_resource)?;
    let function = module.function("hash_kernel")?;

    let num_blocks = num_blocks_for(num_rows);

    let key_columns_ptr = key_column_args.as_launchable_ptr();
    let num_key_columns = num_columns as u32;
    let output_ptr = output.typed_mut_ptr::<u32>();

    unsafe {
        rustacuda::launch!(function<<<
            rustacuda::function::GridSize::from(num_blocks),
            rustacuda::function::BlockSize::from(HISTOGRAM_BLOCK_SIZE),
            0u32,
            stream
        >>>(
            key_columns_ptr,
            num_key_columns,
            num_rows,
            output_ptr
        ))?;
    }
    stream.synchronize()?;

    tracing::info!(num_rows, "hash: done");

    Ok(output)
}
