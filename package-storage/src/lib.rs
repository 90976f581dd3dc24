//! Storage of plugin packages
//!
//! Uploads arrive as multipart bodies and are streamed part by part into a
//! [`StorageProvider`] without buffering whole packages in memory. Downloads
//! stream back out the same way.
//!
//! Backends:
//! - [`FileSystemProvider`]: one file per package under a local directory
//! - [`S3Provider`]: one object per package in an S3 bucket (`s3-backend` feature)
//! - [`MemoryProvider`]: volatile, for tests

pub mod backends;
pub mod error;
pub mod storage;

pub use backends::*;
pub use error::*;
pub use storage::*;
