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

//! Memory abstraction that unifies host and device allocations.
//!
//! Kernels never see a [`Mem`] directly. Instead, call sites reduce a `Mem<T>` down to a raw,
//! `DeviceCopy` pointer or slice handle ([`LaunchablePtr`], [`LaunchableMutPtr`],
//! [`LaunchableSlice`]) that is safe to embed in a `#[repr(C)]` kernel argument struct and copy to
//! the device with `DeviceBox::new`.

use rustacuda::memory::{DeviceBuffer, DeviceCopy, LockedBuffer, UnifiedBuffer};
use std::convert::TryFrom;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// Backing storage for a routing table, column buffer, or scalar.
///
/// `SysMem` never crosses into a kernel launch; it exists so that host-only code paths (e.g.,
/// building a table from a slice before it is ever touched by a kernel) can share the same type
/// as device-resident storage.
#[derive(Debug)]
pub enum Mem<T: DeviceCopy> {
    SysMem(Vec<T>),
    CudaPinnedMem(LockedBuffer<T>),
    CudaUniMem(UnifiedBuffer<T>),
    CudaDevMem(DeviceBuffer<T>),
}

impl<T: DeviceCopy> Mem<T> {
    pub fn len(&self) -> usize {
        match self {
            Mem::SysMem(m) => m.len(),
            Mem::CudaPinnedMem(m) => m.len(),
            Mem::CudaUniMem(m) => m.len(),
            Mem::CudaDevMem(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a pointer usable as a kernel argument.
    ///
    /// The pointer is only valid for the lifetime of `self`; the caller must keep `self` alive
    /// until the kernel launch that consumes the pointer has been enqueued.
    pub fn as_launchable_ptr(&self) -> LaunchablePtr<T> {
        let ptr = match self {
            Mem::SysMem(m) => m.as_ptr(),
            Mem::CudaPinnedMem(m) => m.as_ptr(),
            Mem::CudaUniMem(m) => m.as_ptr(),
            Mem::CudaDevMem(m) => m.as_ptr(),
        };
        LaunchablePtr(ptr, PhantomData)
    }

    pub fn as_launchable_mut_ptr(&mut self) -> LaunchableMutPtr<T> {
        let ptr = match self {
            Mem::SysMem(m) => m.as_mut_ptr(),
            Mem::CudaPinnedMem(m) => m.as_mut_ptr(),
            Mem::CudaUniMem(m) => m.as_mut_ptr(),
            Mem::CudaDevMem(m) => m.as_mut_ptr(),
        };
        LaunchableMutPtr(ptr, PhantomData)
    }

    pub fn as_launchable_slice(&self) -> LaunchableSlice<'_, T> {
        LaunchableSlice {
            ptr: self.as_launchable_ptr(),
            len: self.len(),
            _marker: PhantomData,
        }
    }
}

impl<'r, T: DeviceCopy> TryFrom<&'r Mem<T>> for &'r [T] {
    type Error = &'static str;

    fn try_from(mem: &'r Mem<T>) -> Result<Self, Self::Error> {
        match mem {
            Mem::SysMem(m) => Ok(m.as_slice()),
            Mem::CudaPinnedMem(m) => Ok(m.as_slice()),
            Mem::CudaUniMem(m) => Ok(m.as_slice()),
            Mem::CudaDevMem(_) => Err("cannot dereference CUDA device memory from the host"),
        }
    }
}

impl<'r, T: DeviceCopy> TryFrom<&'r mut Mem<T>> for &'r mut [T] {
    type Error = &'static str;

    fn try_from(mem: &'r mut Mem<T>) -> Result<Self, Self::Error> {
        match mem {
            Mem::SysMem(m) => Ok(m.as_mut_slice()),
            Mem::CudaPinnedMem(m) => Ok(m.as_mut_slice()),
            Mem::CudaUniMem(m) => Ok(m.as_mut_slice()),
            Mem::CudaDevMem(_) => Err("cannot dereference CUDA device memory from the host"),
        }
    }
}

/// A `Mem` variant that is always host-dereferenceable.
///
/// Used for small, host-visible bookkeeping arrays (e.g., partition offsets after the final
/// scan) that the orchestrator reads back without a device-memory round trip.
#[derive(Debug)]
pub enum DerefMem<T: DeviceCopy> {
    SysMem(Vec<T>),
    CudaPinnedMem(LockedBuffer<T>),
    CudaUniMem(UnifiedBuffer<T>),
}

impl<T: DeviceCopy> From<DerefMem<T>> for Mem<T> {
    fn from(mem: DerefMem<T>) -> Self {
        match mem {
            DerefMem::SysMem(m) => Mem::SysMem(m),
            DerefMem::CudaPinnedMem(m) => Mem::CudaPinnedMem(m),
            DerefMem::CudaUniMem(m) => Mem::CudaUniMem(m),
        }
    }
}

impl<T: DeviceCopy> Deref for DerefMem<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        match self {
            DerefMem::SysMem(m) => m.as_slice(),
            DerefMem::CudaPinnedMem(m) => m.as_slice(),
            DerefMem::CudaUniMem(m) => m.as_slice(),
        }
    }
}

impl<T: DeviceCopy> DerefMut for DerefMem<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        match self {
            DerefMem::SysMem(m) => m.as_mut_slice(),
            DerefMem::CudaPinnedMem(m) => m.as_mut_slice(),
            DerefMem::CudaUniMem(m) => m.as_mut_slice(),
        }
    }
}

/// A `DeviceCopy` pointer that can be embedded in a `#[repr(C)]` kernel argument struct.
#[repr(transparent)]
#[derive(Debug)]
pub struct LaunchablePtr<T>(*const T, PhantomData<T>);

impl<T> LaunchablePtr<T> {
    pub fn null() -> Self {
        Self(std::ptr::null(), PhantomData)
    }

    pub fn as_raw(&self) -> *const T {
        self.0
    }

    /// Reinterprets the pointer as pointing to `U` instead of `T`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the underlying allocation is actually laid out as a sequence
    /// of `U`, e.g. because it is a type-erased byte buffer that a column's `DataType` tag
    /// promises to hold `U`-typed cells.
    pub unsafe fn cast<U>(self) -> LaunchablePtr<U> {
        LaunchablePtr(self.0 as *const U, PhantomData)
    }
}

impl<T> Clone for LaunchablePtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for LaunchablePtr<T> {}
impl<T> Default for LaunchablePtr<T> {
    fn default() -> Self {
        Self::null()
    }
}
unsafe impl<T> DeviceCopy for LaunchablePtr<T> {}
unsafe impl<T> Send for LaunchablePtr<T> {}
unsafe impl<T> Sync for LaunchablePtr<T> {}

/// A mutable counterpart to [`LaunchablePtr`].
#[repr(transparent)]
#[derive(Debug)]
pub struct LaunchableMutPtr<T>(*mut T, PhantomData<T>);

impl<T> LaunchableMutPtr<T> {
    pub fn null_mut() -> Self {
        Self(std::ptr::null_mut(), PhantomData)
    }

    pub fn as_raw_mut(&self) -> *mut T {
        self.0
    }

    /// Reinterprets the pointer as pointing to `U` instead of `T`. See
    /// [`LaunchablePtr::cast`] for the safety contract.
    pub unsafe fn cast<U>(self) -> LaunchableMutPtr<U> {
        LaunchableMutPtr(self.0 as *mut U, PhantomData)
    }
}

impl<T> Clone for LaunchableMutPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for LaunchableMutPtr<T> {}
impl<T> Default for LaunchableMutPtr<T> {
    fn default() -> Self {
        Self::null_mut()
    }
}
unsafe impl<T> DeviceCopy for LaunchableMutPtr<T> {}
unsafe impl<T> Send for LaunchableMutPtr<T> {}
unsafe impl<T> Sync for LaunchableMutPtr<T> {}

/// A borrowed, pointer-plus-length view used as an input parameter to launch wrappers.
///
/// Unlike `LaunchablePtr`, this type is not itself embedded in a kernel argument struct; it
/// exists to carry the length alongside the pointer up to the point where the argument struct is
/// assembled (see `KeyColumnArg` in the `hash-partition` crate).
#[derive(Debug)]
pub struct LaunchableSlice<'s, T> {
    ptr: LaunchablePtr<T>,
    len: usize,
    _marker: PhantomData<&'s T>,
}

impl<'s, T> LaunchableSlice<'s, T> {
    pub fn as_launchable_ptr(&self) -> LaunchablePtr<T> {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reinterprets the slice as a slice of `U` of `new_len` elements. See
    /// [`LaunchablePtr::cast`] for the safety contract.
    pub unsafe fn cast<U>(&self, new_len: usize) -> LaunchableSlice<'s, U> {
        LaunchableSlice {
            ptr: self.ptr.cast(),
            len: new_len,
            _marker: PhantomData,
        }
    }
}

impl<'s, T> Clone for LaunchableSlice<'s, T> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr,
            len: self.len,
            _marker: PhantomData,
        }
    }
}
