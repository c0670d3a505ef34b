//! Remote collection client for brecup.
//!
//! This crate provides:
//! - The `CollectionUploader` seam used by the upload lane
//! - A `biliup` CLI implementation: create + upload, append, listing lookup

pub mod client;
pub mod error;

pub use client::{parse_listing, BiliupClient, CollectionUploader, PLACEHOLDER_HANDLE};
pub use error::{UploadError, UploadResult};
