//! Wire types for the Vimeo listing API and the transient domain values the
//! walker hands to the migration pipeline.

use serde::Deserialize;

/// Paginated envelope shared by every listing endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Listing<T> {
    #[serde(default)]
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Paging,
}

#[derive(Debug, Default, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<String>,
}

/// A folder ("project") as returned by `/users/{id}/folders`.
#[derive(Debug, Deserialize)]
pub struct FolderRecord {
    pub uri: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: FolderMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct FolderMetadata {
    #[serde(default)]
    pub connections: FolderConnections,
}

#[derive(Debug, Default, Deserialize)]
pub struct FolderConnections {
    /// Ancestors ordered from the immediate parent up to the root.
    #[serde(default)]
    pub ancestor_path: Vec<AncestorRef>,
}

#[derive(Debug, Deserialize)]
pub struct AncestorRef {
    #[serde(default)]
    pub name: String,
}

/// A video as returned by `{folder_uri}/videos`.
#[derive(Debug, Deserialize)]
pub struct VideoRecord {
    pub uri: String,
    #[serde(default)]
    pub name: String,
    pub link: String,
    /// Null when downloads are disabled for the video.
    #[serde(default)]
    pub download: Option<Vec<DownloadRecord>>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRecord {
    pub rendition: String,
    pub link: String,
}

/// A source folder matched (or rejected) by the scope filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFolder {
    pub id: String,
    pub name: String,
    /// Ancestor names ordered root first, immediate parent last.
    pub ancestors: Vec<String>,
    /// First page of this folder's video listing.
    pub videos_path: String,
}

impl RemoteFolder {
    /// Human-readable location, e.g. `Root / Marketing / Clips`.
    pub fn display_path(&self) -> String {
        let mut parts: Vec<&str> = self.ancestors.iter().map(String::as_str).collect();
        parts.push(&self.name);
        parts.join(" / ")
    }
}

impl From<FolderRecord> for RemoteFolder {
    fn from(record: FolderRecord) -> Self {
        let ancestors = record
            .metadata
            .connections
            .ancestor_path
            .into_iter()
            .rev()
            .map(|a| a.name)
            .collect();
        let uri = record.uri.trim_end_matches('/');
        Self {
            id: last_segment(uri).to_string(),
            name: record.name,
            ancestors,
            videos_path: format!("{uri}/videos?page=1"),
        }
    }
}

/// One downloadable quality variant of a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    /// `"720p"`, `"1080p"`, or a non-numeric label such as `"source"`.
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAsset {
    pub id: String,
    pub name: String,
    pub renditions: Vec<Rendition>,
    /// Canonical page URL on the source platform; the ledger's dedup key.
    pub source_url: String,
}

impl From<VideoRecord> for RemoteAsset {
    fn from(record: VideoRecord) -> Self {
        let renditions = record
            .download
            .unwrap_or_default()
            .into_iter()
            .map(|d| Rendition {
                label: d.rendition,
                url: d.link,
            })
            .collect();
        Self {
            id: last_segment(&record.uri).to_string(),
            name: record.name,
            renditions,
            source_url: record.link,
        }
    }
}

fn last_segment(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}
