//! S3 implementation of blob storage access.

mod client;

pub use client::S3ObjectStorage;
