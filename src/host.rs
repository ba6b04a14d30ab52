//! Host-parallel reference stages.
//!
//! The filter and count functions fork across the current rayon pool and
//! join before returning, so no partial result is ever visible to the
//! caller.

use rayon::prelude::*;

/// The predicate shared by the host filter and every counting kernel.
#[inline]
pub fn is_positive(x: f32) -> bool {
    x > 0.0
}

/// Collect the subsequence of `input` satisfying `pred`, preserving order.
pub fn filter<F>(input: &[f32], pred: F) -> Vec<f32>
where
    F: Fn(f32) -> bool + Sync + Send,
{
    input.par_iter().copied().filter(|&x| pred(x)).collect()
}

/// Collect the positive elements of `input`.
pub fn filter_positive(input: &[f32]) -> Vec<f32> {
    filter(input, is_positive)
}

/// Per-group positive counts, the host counterpart of the Partial-Count
/// Buffer. `local_size` must be non-zero; a trailing partial group is
/// counted like any other.
pub fn count_positive_per_group(input: &[f32], local_size: usize) -> Vec<i32> {
    input
        .par_chunks(local_size)
        .map(|group| group.iter().filter(|&&x| is_positive(x)).count() as i32)
        .collect()
}

/// Build a dedicated pool of `threads` workers, or `None` to use the
/// global pool when `threads == 0`.
///
/// Build the pool once per benchmark, outside any timed interval: spawning
/// the workers costs far more than filtering a small sample.
pub fn thread_pool(threads: usize) -> Option<rayon::ThreadPool> {
    if threads == 0 {
        return None;
    }
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => Some(pool),
        Err(e) => {
            log::warn!("could not build {threads}-thread pool ({e}), using global pool");
            None
        }
    }
}

/// Run `f` on `pool`, or on the global pool when there is none.
pub fn install<R, F>(pool: Option<&rayon::ThreadPool>, f: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    match pool {
        Some(pool) => pool.install(f),
        None => f(),
    }
}
