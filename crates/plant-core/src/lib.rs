//! plant-core — Core library for the plant evidence-locker CLI.
//!
//! Plant uploads external evidence files into a git-backed evidence
//! locker, tagging each with compliance metadata (category, ttl,
//! description, planter identity, timestamp). The git heavy lifting
//! lives in [`git::LockerRepo`]; the planting session and its pluggable
//! metadata indexing live in [`locker`].

pub mod config;
pub mod creds;
pub mod error;
pub mod evidence;
pub mod fsutil;
pub mod git;
pub mod index;
pub mod lock;
pub mod locker;

pub use error::{PlantError, PlantResult};
pub use locker::Locker;
