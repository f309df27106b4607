//! Building blocks the render pipeline is assembled from.
//!
//! Each submodule does exactly one job and can be tested without a page,
//! a store or a clock. The orchestration lives in [`crate::generate`].
//!
//! 1. [`validate`]: accept only absolute `http`/`https` targets
//! 2. [`collector`]: accumulate console output and runtime errors per page
//! 3. [`encrypt`]: best-effort password protection; CPU-bound, so the
//!    pipeline runs it in `spawn_blocking`
//! 4. [`cost`]: pure cost estimate from duration, memory and disk

pub mod collector;
pub mod cost;
pub mod encrypt;
pub mod validate;
