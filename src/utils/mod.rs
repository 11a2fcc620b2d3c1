//! Shared helpers: hashing, paths, external commands.

pub mod exec;
pub mod hash;
pub mod path;
