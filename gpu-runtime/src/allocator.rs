/*
 * Copyright 2018-2021 Clemens Lutz
 * Author: Clemens Lutz <lutzcle@cml.li>
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::error::{Error, Result};
use crate::memory::Mem;
use rustacuda::memory::{DeviceBuffer, DeviceCopy, LockedBuffer, UnifiedBuffer};
use std::fmt;

/// Identifies which kind of memory a buffer should be allocated in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemType {
    /// Plain host memory, not registered with the CUDA driver.
    SysMem,
    /// Page-locked ("pinned") host memory; enables async host-device copies.
    CudaPinnedMem,
    /// CUDA managed memory, accessible from host and device.
    CudaUniMem,
    /// Device-only memory.
    CudaDevMem,
}

impl fmt::Display for MemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemType::SysMem => "system",
            MemType::CudaPinnedMem => "CUDA pinned",
            MemType::CudaUniMem => "CUDA unified",
            MemType::CudaDevMem => "CUDA device",
        };
        f.write_str(s)
    }
}

/// A boxed closure that allocates a `Mem<T>` of the given length.
///
/// Used where an allocation strategy must be threaded through several layers of call sites
/// before the actual length is known (e.g., routing tables sized from the histogram's radix
/// fanout).
pub type MemAllocFn<T> = Box<dyn FnMut(usize) -> Mem<T>>;

/// Allocates memory of a requested [`MemType`], zero-initialized.
///
/// Mirrors `numa_gpu::runtime::allocator::Allocator`, trimmed of NUMA-node-aware variants that
/// this crate's single-device scope has no use for.
pub struct Allocator;

impl Allocator {
    pub fn alloc_mem<T: DeviceCopy + Default + Clone>(mem_type: MemType, len: usize) -> Mem<T> {
        match mem_type {
            MemType::SysMem => Mem::SysMem(vec![T::default(); len]),
            MemType::CudaPinnedMem => {
                let buf = LockedBuffer::new(&T::default(), len)
                    .expect("Failed to allocate CUDA pinned memory");
                Mem::CudaPinnedMem(buf)
            }
            MemType::CudaUniMem => {
                let mut buf = unsafe {
                    UnifiedBuffer::uninitialized(len).expect("Failed to allocate CUDA unified memory")
                };
                buf.iter_mut().for_each(|x| *x = T::default());
                Mem::CudaUniMem(buf)
            }
            MemType::CudaDevMem => {
                let host = vec![T::default(); len];
                let buf = DeviceBuffer::from_slice(host.as_slice())
                    .expect("Failed to allocate CUDA device memory");
                Mem::CudaDevMem(buf)
            }
        }
    }

    /// Tries to allocate `len` elements of `mem_type`, returning the crate-local [`Result`]
    /// instead of panicking.
    pub fn try_alloc_mem<T: DeviceCopy + Default + Clone>(
        mem_type: MemType,
        len: usize,
    ) -> Result<Mem<T>> {
        let mem = match mem_type {
            MemType::SysMem => Mem::SysMem(vec![T::default(); len]),
            MemType::CudaPinnedMem => Mem::CudaPinnedMem(LockedBuffer::new(&T::default(), len)?),
            MemType::CudaUniMem => {
                let mut buf = unsafe { UnifiedBuffer::uninitialized(len)? };
                buf.iter_mut().for_each(|x| *x = T::default());
                Mem::CudaUniMem(buf)
            }
            MemType::CudaDevMem => {
                let host = vec![T::default(); len];
                Mem::CudaDevMem(DeviceBuffer::from_slice(host.as_slice())?)
            }
        };
        Ok(mem)
    }

    pub fn mem_alloc_fn<T: DeviceCopy + Default + Clone + 'static>(
        mem_type: MemType,
    ) -> MemAllocFn<T> {
        Box::new(move |len| Self::alloc_mem(mem_type, len))
    }
}

/// The caller-supplied allocator handle used for output column buffers.
///
/// An abstraction akin to RMM's `device_memory_resource` in RAPIDS cuDF: callers that already
/// manage a pool allocator implement this trait to route output buffers through it instead of
/// through raw CUDA allocation calls.
/// Object-safe by design: callers (e.g. `Column::alloc_uninit`) only ever need byte-granular
/// allocation, since every column is stored as type-erased bytes. A generic `allocate<T>` method
/// would make this trait impossible to use behind `&dyn MemoryResource`.
pub trait MemoryResource {
    fn allocate_bytes(&self, len: usize) -> Result<Mem<u8>>;
}

/// Default memory resource: allocates directly from the CUDA device heap.
#[derive(Copy, Clone, Debug, Default)]
pub struct CudaDeviceMemoryResource;

impl MemoryResource for CudaDeviceMemoryResource {
    fn allocate_bytes(&self, len: usize) -> Result<Mem<u8>> {
        Allocator::try_alloc_mem(MemType::CudaDevMem, len).map_err(|e| match e {
            Error::Cuda(cuda_err) => {
                Error::OutOfMemory(format!("device allocation of {} elements failed: {}", len, cuda_err))
            }
            other => other,
        })
    }
}
