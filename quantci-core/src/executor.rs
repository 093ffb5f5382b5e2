//! Chunked fork-join execution over replicate indices.
//!
//! Bootstrap engines run `B` independent replicates. The executor maps a body
//! over `0..count` and assembles the outputs *by index*, so results are
//! identical whatever the scheduling — determinism then rests entirely on
//! per-index RNG seeding (see [`crate::rng`]).
//!
//! The chunk-size hint trades scheduling overhead against load balance; `0`
//! means "implementation default". Cancellation is not supported.

use rayon::prelude::*;

/// Maps a body over `0..count`, returning outputs in index order.
pub trait Executor: Default + Send + Sync {
    fn map_chunked<T, F>(&self, count: usize, chunk_hint: usize, body: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

/// Runs every index on the calling thread, in order.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleThreadExecutor;

impl Executor for SingleThreadExecutor {
    fn map_chunked<T, F>(&self, count: usize, _chunk_hint: usize, body: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        (0..count).map(body).collect()
    }
}

/// Fans indices out over the rayon thread pool in contiguous chunks.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPoolExecutor;

impl Executor for ThreadPoolExecutor {
    fn map_chunked<T, F>(&self, count: usize, chunk_hint: usize, body: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        if chunk_hint == 0 {
            (0..count).into_par_iter().map(body).collect()
        } else {
            (0..count)
                .into_par_iter()
                .with_min_len(chunk_hint)
                .map(body)
                .collect()
        }
    }
}

/// Free-function form of [`Executor::map_chunked`].
pub fn parallel_for_chunked<E, T, F>(count: usize, exec: &E, body: F, chunk_hint: usize) -> Vec<T>
where
    E: Executor,
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    exec.map_chunked(count, chunk_hint, body)
}
