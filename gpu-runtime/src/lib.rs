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

//! Device memory and error primitives shared by the partitioning core.
//!
//! This crate has no notion of tables, columns, or partitioning; it only wraps the CUDA driver
//! API (via `rustacuda`) with the allocation and error-handling conventions the rest of the
//! workspace builds on.

pub mod allocator;
pub mod error;
pub mod memory;

pub use allocator::{Allocator, CudaDeviceMemoryResource, MemAllocFn, MemType, MemoryResource};
pub use error::{Error, Result};
pub use memory::{DerefMem, LaunchableMutPtr, LaunchablePtr, LaunchableSlice, Mem};
