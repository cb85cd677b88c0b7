//! Running daily averages per entity.

mod accumulate;

pub use accumulate::accumulate;
