//! The routing tables produced by C3 and consumed by C4/C5: `row_partition`,
//! `row_local_offset`, `block_histogram`, `block_scan`, and `global_histogram`.

use crate::kernels::KernelModule;
use crate::prefix_scan;
use gpu_runtime::allocator::{Allocator, MemType};
use gpu_runtime::error::Result;
use gpu_runtime::memory::Mem;
use rustacuda::stream::Stream;
use std::convert::TryInto;

/// Owns every device-resident array that C3-C5 communicate through for a single invocation.
/// Released (by `Drop`, via the underlying `Mem` variants) when the orchestrator returns.
pub struct RoutingTables {
    pub row_partition: Mem<u32>,
    pub row_local_offset: Mem<u32>,
    pub block_histogram: Mem<u32>,
    pub block_scan: Mem<u32>,
    pub global_histogram: Mem<u32>,
    num_partitions: u32,
    num_blocks: u32,
}

impl RoutingTables {
    /// `mem_type` governs the bulk, per-row/per-block arrays. `global_histogram` is always
    /// allocated in CUDA unified memory regardless of `mem_type`, since its scanned contents are
    /// read back to the host as `partition_offsets` at the end of every invocation.
    pub fn new(mem_type: MemType, num_rows: u32, num_partitions: u32, num_blocks: u32) -> Result<Self> {
        let table_len = (num_partitions as usize) * (num_blocks as usize);
        Ok(RoutingTables {
            row_partition: Allocator::try_alloc_mem(mem_type, num_rows as usize)?,
            row_local_offset: Allocator::try_alloc_mem(mem_type, num_rows as usize)?,
            block_histogram: Allocator::try_alloc_mem(mem_type, table_len)?,
            block_scan: Allocator::try_alloc_mem(mem_type, table_len)?,
            global_histogram: Allocator::try_alloc_mem(MemType::CudaUniMem, num_partitions as usize)?,
            num_partitions,
            num_blocks,
        })
    }

    pub fn num_partitions(&self) -> u32 {
        self.num_partitions
    }

    pub fn num_blocks(&self) -> u32 {
        self.num_blocks
    }

    /// Runs C4: scans `block_histogram` (partition-major, length `num_partitions * num_blocks`)
    /// into `block_scan`, and scans `global_histogram` in place. The two scans touch disjoint
    /// buffers and have no data dependency on each other, so they are issued back to back on the
    /// same stream without an intervening synchronization; the caller's final `stream.synchronize`
    /// before reading `partition_offsets` back covers both.
    ///
    /// Returns the host-visible `partition_offsets` vector: the scanned `global_histogram`,
    /// widened to `u64` row indices.
    pub fn build_offsets(&mut self, module: &KernelModule, stream: &Stream) -> Result<Vec<u64>> {
        let table_len = self.block_histogram.len() as u32;
        let mut table_scratch = prefix_scan::alloc_scratch(MemType::CudaDevMem, table_len)?;

        unsafe {
            prefix_scan::exclusive_scan_u32(
                module,
                stream,
                self.block_histogram.as_launchable_ptr(),
                self.block_scan.as_launchable_mut_ptr(),
                table_len,
                &mut table_scratch,
            )?;
        }

        let global_len = self.global_histogram.len() as u32;
        let mut global_scratch = prefix_scan::alloc_scratch(MemType::CudaDevMem, global_len)?;

        unsafe {
            let src = self.global_histogram.as_launchable_ptr();
            let dst = self.global_histogram.as_launchable_mut_ptr();
            prefix_scan::exclusive_scan_u32(module, stream, src, dst, global_len, &mut global_scratch)?;
        }

        stream.synchronize()?;

        let host_offsets: &[u32] = (&self.global_histogram)
            .try_into()
            .map_err(|e: &str| gpu_runtime::error::Error::RuntimeError(e.to_string()))?;
        Ok(host_offsets.iter().map(|&v| v as u64).collect())
    }
}
