//! Device-wide exclusive prefix scan over `u32` (C4).
//!
//! Implemented as a segmented scan-then-fixup rather than a single-pass decoupled-lookback scan:
//! each block computes an exclusive scan of its own chunk plus that chunk's inclusive total, a
//! second launch scans the (always small) array of per-block totals, and a third launch adds each
//! block's bias back into its chunk. Three kernel launches instead of one, traded for not having
//! to reproduce decoupled lookback's global spin-wait coordination from memory.
//!
//! `block_scan` (over `block_histogram`) and the in-place scan of `global_histogram` are both
//! just differently sized invocations of [`exclusive_scan_u32`].

use crate::kernels::KernelModule;
use gpu_runtime::allocator::{Allocator, MemType};
use gpu_runtime::error::{Error, Result};
use gpu_runtime::memory::{LaunchableMutPtr, LaunchablePtr, Mem};
use rustacuda::function::{BlockSize, GridSize};
use rustacuda::launch;
use rustacuda::stream::Stream;

pub const SCAN_BLOCK_SIZE: u32 = 256;

fn scan_block_sums_len(len: u32) -> u32 {
    (len + SCAN_BLOCK_SIZE - 1) / SCAN_BLOCK_SIZE
}

/// Allocates scratch space large enough to scan an array of `len` elements with
/// [`exclusive_scan_u32`].
pub fn alloc_scratch(mem_type: MemType, len: u32) -> Result<Mem<u32>> {
    let scratch_len = scan_block_sums_len(len).max(1) as usize;
    Allocator::try_alloc_mem(mem_type, scratch_len)
}

/// Scans `len` elements starting at `src`, writing the exclusive prefix sum to `dst` (which may
/// alias `src`, as is the case for `global_histogram`'s in-place scan). `block_sums` must be at
/// least `ceil(len / SCAN_BLOCK_SIZE)` elements.
///
/// # Errors
///
/// Returns [`Error::OutOfMemory`] if `len` needs more than `SCAN_BLOCK_SIZE` block-sum entries
/// (i.e. `len > SCAN_BLOCK_SIZE * SCAN_BLOCK_SIZE`): the block-sums array itself would then need a
/// second level of scanning, which this segmented scan-then-fixup does not implement.
///
/// # Safety
///
/// `src` must be valid for `len` reads and `dst` valid for `len` writes on the device associated
/// with `stream`.
pub unsafe fn exclusive_scan_u32(
    module: &KernelModule,
    stream: &Stream,
    src: LaunchablePtr<u32>,
    dst: LaunchableMutPtr<u32>,
    len: u32,
    block_sums: &mut Mem<u32>,
) -> Result<()> {
    if len == 0 {
        return Ok(());
    }

    let num_blocks = scan_block_sums_len(len);
    assert!(
        block_sums.len() as u32 >= num_blocks,
        "block_sums scratch too small: need {} got {}",
        num_blocks,
        block_sums.len()
    );

    let shared_bytes = SCAN_BLOCK_SIZE * std::mem::size_of::<u32>() as u32;
    let sums_ptr = block_sums.as_launchable_mut_ptr();
    let block_size = BlockSize::from(SCAN_BLOCK_SIZE);

    let function = module.function("scan_block_sums_u32")?;
    launch!(function<<<GridSize::from(num_blocks), block_size.clone(), shared_bytes, stream>>>(
        src,
        dst,
        sums_ptr,
        len
    ))?;

    if num_blocks > 1 {
        if num_blocks > SCAN_BLOCK_SIZE {
            return Err(Error::OutOfMemory(format!(
                "block-sums array of {} entries exceeds a single scan block of {}; \
                 a multi-level recursive scan is not implemented, lower num_partitions or \
                 num_blocks so that their product stays within {}",
                num_blocks,
                SCAN_BLOCK_SIZE,
                SCAN_BLOCK_SIZE * SCAN_BLOCK_SIZE
            )));
        }

        let sums_src = block_sums.as_launchable_ptr();
        let sums_dst = block_sums.as_launchable_mut_ptr();
        let no_sums = LaunchableMutPtr::null_mut();
        launch!(function<<<GridSize::from(1u32), block_size.clone(), shared_bytes, stream>>>(
            sums_src,
            sums_dst,
            no_sums,
            num_blocks
        ))?;

        let fixup = module.function("scan_fixup_u32")?;
        let sums_src = block_sums.as_launchable_ptr();
        launch!(fixup<<<GridSize::from(num_blocks), block_size, 0u32, stream>>>(
            dst,
            sums_src,
            len
        ))?;
    }

    Ok(())
}
