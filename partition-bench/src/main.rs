// Copyright 2019-2022 Clemens Lutz
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Demonstration and benchmark binary for the `hash-partition` crate.
//!
//! Generates a synthetic single-key-column table, runs `hash_partition` a configurable number of
//! times, and reports per-run wall-clock time. Loosely modeled on this lineage's `radix-join`
//! benchmark binary, trimmed to this crate's single operator and narrower tuning surface.

use columnar::{Column, DataType, Table};
use gpu_runtime::allocator::CudaDeviceMemoryResource;
use hash_partition::error::Result;
use hash_partition::hash_partition;
use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rustacuda::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use structopt::StructOpt;

fn main() -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed to install tracing subscriber");

    let cmd = CmdOpt::from_args();

    rustacuda::init(CudaFlags::empty())?;
    let device = Device::get_device(cmd.device_id.into())?;
    let _context = Context::create_and_push(ContextFlags::MAP_HOST | ContextFlags::SCHED_AUTO, device)?;

    tracing::info!(
        rows = cmd.rows,
        key_cardinality = cmd.key_cardinality,
        num_partitions = cmd.num_partitions,
        grid_size = cmd.grid_size,
        block_size = cmd.block_size,
        "partition-bench: starting"
    );

    let table = generate_table(cmd.rows, cmd.key_cardinality);
    let resource = CudaDeviceMemoryResource::default();

    let mut points = Vec::with_capacity(cmd.repeat as usize);
    for run in 0..cmd.repeat {
        let start = Instant::now();
        let (output, offsets) = hash_partition(&table, &[0], cmd.num_partitions, &resource)?;
        let elapsed = start.elapsed();

        tracing::debug!(run, rows = output.num_rows(), ?elapsed, "run complete");
        points.push(DataPoint {
            run,
            rows: cmd.rows,
            key_cardinality: cmd.key_cardinality,
            num_partitions: cmd.num_partitions,
            nanos: elapsed.as_nanos() as u64,
            largest_partition: offsets
                .windows(2)
                .map(|w| w[1] - w[0])
                .chain(std::iter::once(
                    cmd.rows as u64 - offsets.last().copied().unwrap_or(0),
                ))
                .max()
                .unwrap_or(0),
        });
    }

    if let Some(csv_path) = cmd.csv {
        write_csv(&csv_path, &points).expect("failed to write measurement CSV");
    }

    tracing::info!("partition-bench: done");
    Ok(())
}

/// Builds a single-key-column table of `rows` rows, with keys drawn uniformly from
/// `[0, key_cardinality)`. A fixed seed keeps runs reproducible across invocations.
fn generate_table(rows: u32, key_cardinality: u32) -> Table {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);
    let dist = Uniform::from(0..key_cardinality.max(1));
    let keys: Vec<u32> = (0..rows).map(|_| dist.sample(&mut rng)).collect();

    let key_column =
        Column::from_host_slice(DataType::UInt32, &keys).expect("key column width matches UInt32");
    Table::new(vec![key_column]).expect("single-column table always has a consistent row count")
}

#[derive(Serialize)]
struct DataPoint {
    run: u32,
    rows: u32,
    key_cardinality: u32,
    num_partitions: u32,
    nanos: u64,
    largest_partition: u64,
}

fn write_csv(path: &PathBuf, points: &[DataPoint]) -> csv::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for point in points {
        writer.serialize(point)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(StructOpt)]
#[structopt(
    name = "partition-bench",
    about = "Benchmarks GPU hash partitioning of a synthetic single-key-column table"
)]
struct CmdOpt {
    /// Number of times to repeat the benchmark
    #[structopt(short = "r", long = "repeat", default_value = "30")]
    repeat: u32,

    /// Output filename for the measurement CSV file
    #[structopt(long = "csv", parse(from_os_str))]
    csv: Option<PathBuf>,

    /// Number of rows in the generated input table
    #[structopt(long = "rows", default_value = "16777216")]
    rows: u32,

    /// Number of distinct key values the generated table's key column draws from
    #[structopt(long = "key-cardinality", default_value = "1024")]
    key_cardinality: u32,

    /// Number of partitions to hash the input into
    #[structopt(long = "partitions", default_value = "64")]
    num_partitions: u32,

    /// CUDA device to run on
    #[structopt(long = "device-id", default_value = "0")]
    device_id: u16,

    /// Histogram/scatter kernel grid size
    ///
    /// The orchestrator currently picks its own grid size from the input's row count; this flag
    /// is recorded in the measurement log for comparison against future versions that expose it.
    #[structopt(long = "grid-size", default_value = "128")]
    grid_size: u32,

    /// Histogram/scatter kernel block size
    ///
    /// Recorded alongside `grid_size`; see its doc comment.
    #[structopt(long = "block-size", default_value = "256")]
    block_size: u32,
}
