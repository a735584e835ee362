use std::time::Instant;

use rayon::prelude::*;

use crate::response::HeavyReport;

/// Sum of `0..iterations`, split into `partitions` strided slices summed in
/// parallel. Partition `g` takes every `i` with `i % partitions == g`, so the
/// result does not depend on the partition count.
pub fn partitioned_sum(iterations: u64, partitions: usize) -> i64 {
    let partitions = partitions.max(1);
    (0..partitions)
        .into_par_iter()
        .map(|g| partial_sum(g as u64, partitions, iterations))
        .reduce(|| 0, i64::wrapping_add)
}

/// Wraps on overflow, like the combining step, so every partition count
/// agrees even past `i64::MAX`.
fn partial_sum(offset: u64, stride: usize, iterations: u64) -> i64 {
    (offset..iterations)
        .step_by(stride)
        .fold(0i64, |acc, i| acc.wrapping_add(i as i64))
}

/// Runs the CPU-bound sum and times it.
pub fn run(iterations: u64, partitions: usize) -> HeavyReport {
    let start = Instant::now();
    let result = partitioned_sum(iterations, partitions);
    let total_processing_time = start.elapsed().as_millis() as u64;
    tracing::debug!(iterations, partitions, total_processing_time, "heavy sum done");
    HeavyReport {
        total_processing_time,
        result,
    }
}
