//! Destination side: the video library's collections and two-step upload.

pub mod api;
pub mod collections;
pub mod error;
pub mod types;
pub mod upload;

pub use api::{BunnyClient, StreamApi};
pub use collections::CollectionResolver;
pub use error::UploadError;
pub use types::UploadedVideo;
pub use upload::Uploader;
