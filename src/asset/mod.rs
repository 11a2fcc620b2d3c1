//! Asset transforms and fingerprinted output.
//!
//! - `place` - collision-safe writer for content-addressed files
//! - `transform` - the [`Transforms`] seam and its [`Toolchain`] implementation
//! - `minify`, `preprocess` - the engines behind [`Toolchain`]

mod minify;
mod place;
mod preprocess;
mod transform;

pub use place::{Placed, place};
pub use transform::{ScriptKind, Toolchain, TransformError, Transforms};
