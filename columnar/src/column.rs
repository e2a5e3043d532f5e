//! A single, fixed-width, possibly-nullable column of device-resident cells.

use crate::types::DataType;
use gpu_runtime::error::{Error, Result};
use gpu_runtime::memory::{LaunchableMutPtr, LaunchableSlice, Mem};
use rustacuda::memory::{DeviceCopy, UnifiedBuffer};
use std::convert::TryInto;

/// Number of bits packed into one null-mask word.
const MASK_WORD_BITS: usize = 32;

fn null_mask_word_len(num_rows: usize) -> usize {
    (num_rows + MASK_WORD_BITS - 1) / MASK_WORD_BITS
}

/// A column of `len` fixed-width cells, stored as type-erased bytes tagged with a [`DataType`].
///
/// The null mask, if present, is a bitmask with one bit per row (bit set = valid, matching the
/// Arrow/cuDF convention); it is consulted only when the column participates as a hash-partition
/// key under the null-aware path, and is never produced on `hash_partition`'s output columns.
#[derive(Debug)]
pub struct Column {
    dtype: DataType,
    len: usize,
    data: Mem<u8>,
    null_mask: Option<Mem<u32>>,
}

impl Column {
    /// Builds a column from host data, copying it into unified (host-and-device-visible) memory.
    ///
    /// Intended for tests, CLI data loading, and readback verification; the partitioning core
    /// itself only ever allocates columns through a [`gpu_runtime::MemoryResource`].
    pub fn from_host_slice<T: Copy + DeviceCopy>(dtype: DataType, data: &[T]) -> Result<Self> {
        if std::mem::size_of::<T>() != dtype.byte_width() {
            return Err(Error::InvalidArgument(format!(
                "cell width {} does not match {}'s byte width {}",
                std::mem::size_of::<T>(),
                dtype,
                dtype.byte_width()
            )));
        }

        let bytes: &[u8] = unsafe {
            std::slice::from_raw_parts(data.as_ptr() as *const u8, std::mem::size_of_val(data))
        };

        // CUDA unified memory so that the buffer is valid both as a host `&mut [u8]` below and,
        // later, as a kernel argument; plain `SysMem` would not be device-dereferenceable.
        let mut unified = unsafe { UnifiedBuffer::<u8>::uninitialized(bytes.len())? };
        unified.copy_from_slice(bytes);

        Ok(Column {
            dtype,
            len: data.len(),
            data: Mem::CudaUniMem(unified),
            null_mask: None,
        })
    }

    /// Attaches a null mask built from a `bool` slice (`true` = valid), one entry per row.
    pub fn with_validity(mut self, valid: &[bool]) -> Result<Self> {
        if valid.len() != self.len {
            return Err(Error::InvalidArgument(format!(
                "validity slice has {} entries, column has {} rows",
                valid.len(),
                self.len
            )));
        }

        let mut words = vec![0u32; null_mask_word_len(self.len)];
        for (i, &v) in valid.iter().enumerate() {
            if v {
                words[i / MASK_WORD_BITS] |= 1 << (i % MASK_WORD_BITS);
            }
        }

        let mut unified = unsafe { UnifiedBuffer::<u32>::uninitialized(words.len())? };
        unified.copy_from_slice(&words);
        self.null_mask = Some(Mem::CudaUniMem(unified));
        Ok(self)
    }

    /// Allocates an empty, uninitialized column of `len` rows from `resource`. Used by C5 to
    /// create output column buffers before scattering into them.
    pub fn alloc_uninit(
        dtype: DataType,
        len: usize,
        resource: &dyn gpu_runtime::MemoryResource,
    ) -> Result<Self> {
        let byte_len = len * dtype.byte_width();
        let data = resource.allocate_bytes(byte_len)?;
        Ok(Column {
            dtype,
            len,
            data,
            null_mask: None,
        })
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn has_nulls(&self) -> bool {
        self.null_mask.is_some()
    }

    pub fn null_mask(&self) -> Option<&Mem<u32>> {
        self.null_mask.as_ref()
    }

    pub(crate) fn data_mut(&mut self) -> &mut Mem<u8> {
        &mut self.data
    }

    /// A device view of this column's cells as raw bytes, whatever `self.dtype()` is.
    ///
    /// Used by kernel launch wrappers that operate on the cell buffer opaquely (e.g. the row
    /// hasher and the scatter kernel, both of which take a byte pointer plus `byte_width` and let
    /// the device side reinterpret it) rather than requiring a Rust type of matching width.
    pub fn byte_view(&self) -> LaunchableSlice<'_, u8> {
        self.data.as_launchable_slice()
    }

    /// A mutable device pointer to this column's cells as raw bytes. See [`Column::byte_view`].
    pub fn byte_mut_ptr(&mut self) -> LaunchableMutPtr<u8> {
        self.data.as_launchable_mut_ptr()
    }

    /// A device view of this column's cells, reinterpreted as `T`.
    ///
    /// # Panics
    ///
    /// Panics if `size_of::<T>()` does not match `self.dtype().byte_width()`; callers dispatch
    /// on `dtype()` before calling this, so a mismatch indicates a dispatch bug, not bad input.
    pub fn typed_view<T: DeviceCopy>(&self) -> LaunchableSlice<'_, T> {
        assert_eq!(
            std::mem::size_of::<T>(),
            self.dtype.byte_width(),
            "typed_view::<T> called with a type whose width doesn't match the column's dtype"
        );
        let byte_view = self.data.as_launchable_slice();
        unsafe { byte_view.cast(self.len) }
    }

    /// A mutable device pointer to this column's cells, reinterpreted as `T`. Used by the scatter
    /// kernel launch wrapper to write into a freshly allocated output column.
    ///
    /// # Panics
    ///
    /// Same precondition as [`Column::typed_view`].
    pub fn typed_mut_ptr<T: DeviceCopy>(&mut self) -> LaunchableMutPtr<T> {
        assert_eq!(
            std::mem::size_of::<T>(),
            self.dtype.byte_width(),
            "typed_mut_ptr::<T> called with a type whose width doesn't match the column's dtype"
        );
        let ptr = self.data.as_launchable_mut_ptr();
        unsafe { ptr.cast() }
    }

    /// Copies the column's cells back to the host as a typed `Vec`. Fails if the backing memory
    /// is device-only (see [`gpu_runtime::memory::Mem`]'s host-dereference contract); callers
    /// that need host-visible results should allocate output columns in unified memory.
    pub fn to_host_vec<T: Copy + DeviceCopy>(&self) -> Result<Vec<T>> {
        assert_eq!(std::mem::size_of::<T>(), self.dtype.byte_width());
        let bytes: &[u8] = (&self.data)
            .try_into()
            .map_err(|e: &str| Error::RuntimeError(e.to_string()))?;
        let typed = unsafe {
            std::slice::from_raw_parts(bytes.as_ptr() as *const T, self.len)
        };
        Ok(typed.to_vec())
    }

    /// Converts this column's validity mask to a host-side `Vec<bool>`, one entry per row.
    /// Returns `None` if the column has no null mask.
    pub fn validity_to_host_vec(&self) -> Result<Option<Vec<bool>>> {
        let mask = match &self.null_mask {
            Some(m) => m,
            None => return Ok(None),
        };
        let words: &[u32] = mask
            .try_into()
            .map_err(|e: &str| Error::RuntimeError(e.to_string()))?;
        let valid = (0..self.len)
            .map(|i| (words[i / MASK_WORD_BITS] >> (i % MASK_WORD_BITS)) & 1 == 1)
            .collect();
        Ok(Some(valid))
    }
}
