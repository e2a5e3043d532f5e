//! Loads the CUDA fatbin produced by `build.rs` once per process and hands out named kernel
//! functions to the launch wrappers in [`crate::histogram`], [`crate::prefix_scan`], and
//! [`crate::scatter`].

use gpu_runtime::error::Result;
use rustacuda::module::{Function, Module};
use std::ffi::CString;

pub struct KernelModule {
    module: Module,
}

impl KernelModule {
    pub fn load() -> Result<Self> {
        let path = CString::new(env!("HASH_PARTITION_FATBIN_PATH"))?;
        let module = Module::load_from_file(&path)?;
        Ok(KernelModule { module })
    }

    pub fn function(&self, name: &str) -> Result<Function<'_>> {
        let cname = CString::new(name)?;
        let function = self.module.get_function(&cname)?;
        Ok(function)
    }
}
