//! Shared types and plumbing used by every pipeline stage.

pub mod error;
pub mod hash;
pub mod logger;
pub mod record;
pub mod stats;
pub mod time;
