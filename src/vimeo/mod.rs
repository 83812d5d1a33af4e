//! Source side of the migration: authenticated listing calls against the
//! Vimeo API, the scoped folder walk, and rendition choice.

pub mod error;
pub mod rendition;
pub mod session;
pub mod types;
pub mod walker;

pub use error::SourceError;
pub use rendition::select_rendition;
pub use session::{ListingRetryPolicy, SourceSession, VimeoClient};
pub use types::{RemoteAsset, RemoteFolder};
pub use walker::{FolderScope, FolderWalker};
