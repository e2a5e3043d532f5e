//! Partitioner functors (C2).
//!
//! Both variants are plain, host-testable Rust functions whose semantics are mirrored in
//! `cuda/common.cuh`'s `partition_bitmask`/`partition_modulo` via a runtime flag passed in the
//! kernel argument struct, rather than by compiling two separate kernel bodies.

/// `N` must be a positive power of two; returns `hash & (N - 1)`.
///
/// # Panics
///
/// Panics if `num_partitions` is not a power of two. Callers select this variant only after
/// checking `num_partitions.is_power_of_two()`.
pub fn partition_bitmask(hash: u32, num_partitions: u32) -> u32 {
    assert!(
        num_partitions.is_power_of_two(),
        "partition_bitmask requires a power-of-two partition count, got {}",
        num_partitions
    );
    hash & (num_partitions - 1)
}

/// Returns `hash mod N` for any positive `N`.
pub fn partition_modulo(hash: u32, num_partitions: u32) -> u32 {
    hash % num_partitions
}

/// Which functor an invocation should use, decided once by the orchestrator from `num_partitions`
/// and applied uniformly to every row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionerKind {
    Bitmask,
    Modulo,
}

impl PartitionerKind {
    /// Bitmask is strictly faster on the device (no integer division); it is chosen whenever
    /// legal.
    pub fn for_partition_count(num_partitions: u32) -> Self {
        if num_partitions.is_power_of_two() {
            PartitionerKind::Bitmask
        } else {
            PartitionerKind::Modulo
        }
    }

    pub fn apply(self, hash: u32, num_partitions: u32) -> u32 {
        match self {
            PartitionerKind::Bitmask => partition_bitmask(hash, num_partitions),
            PartitionerKind::Modulo => partition_modulo(hash, num_partitions),
        }
    }

    /// The `use_bitmask` flag value passed into the histogram and scatter kernel arguments.
    pub fn use_bitmask_flag(self) -> i32 {
        matches!(self, PartitionerKind::Bitmask) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmask_and_modulo_agree_on_power_of_two() {
        for hash in [0u32, 1, 2, 3, 7, 8, 255, 256, u32::MAX] {
            for num_partitions in [1u32, 2, 4, 8, 16, 64] {
                assert_eq!(
                    partition_bitmask(hash, num_partitions),
                    partition_modulo(hash, num_partitions),
                    "hash={} num_partitions={}",
                    hash,
                    num_partitions
                );
            }
        }
    }

    #[test]
    fn for_partition_count_prefers_bitmask() {
        assert_eq!(PartitionerKind::for_partition_count(16), PartitionerKind::Bitmask);
        assert_eq!(PartitionerKind::for_partition_count(3), PartitionerKind::Modulo);
    }

    #[test]
    #[should_panic]
    fn bitmask_panics_on_non_power_of_two() {
        partition_bitmask(5, 3);
    }
}
