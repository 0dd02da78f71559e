//! Fetch, stage, partition, publish.

pub mod deduper;
pub mod fetcher;
pub mod partitioner;
pub mod publisher;
pub mod reporter;
pub mod staging;
