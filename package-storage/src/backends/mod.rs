pub mod filesystem;

#[cfg(feature = "s3-backend")]
pub mod s3;

pub use filesystem::FileSystemProvider;

#[cfg(feature = "s3-backend")]
pub use s3::S3Provider;
