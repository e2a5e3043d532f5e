/*
 * Copyright 2019-2020 Clemens Lutz, German Research Center for Artificial Intelligence
 * Author: Clemens Lutz <clemens.lutz@dfki.de>
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

//! Crate-wide error type.
//!
//! All fallible device operations in this codebase return [`Result`]. There are no
//! retries and no partial results: an invocation either completes or returns the
//! first error it encountered.

use std::ffi::NulError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unsupported column type: {0}")]
    UnsupportedType(String),

    #[error("resource exhaustion: {0}")]
    OutOfMemory(String),

    #[error("CUDA driver error: {0}")]
    Cuda(#[from] rustacuda::error::CudaError),

    #[error("failed to build a C string, check for embedded NUL bytes: {0}")]
    NulCharError(#[from] NulError),

    #[error("runtime error: {0}")]
    RuntimeError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
