use std::path::Path;
use std::sync::Arc;

use super::api::StreamApi;
use super::error::UploadError;
use super::types::UploadedVideo;

/// Two-step upload: register the video entity, then PUT its bytes.
pub struct Uploader {
    api: Arc<dyn StreamApi>,
    playback_domain: String,
    cdn_hostname: Option<String>,
}

impl Uploader {
    pub fn new(
        api: Arc<dyn StreamApi>,
        playback_domain: impl Into<String>,
        cdn_hostname: Option<String>,
    ) -> Self {
        Self {
            api,
            playback_domain: playback_domain.into(),
            cdn_hostname: cdn_hostname.filter(|h| !h.trim().is_empty()),
        }
    }

    pub async fn upload(
        &self,
        library_id: &str,
        collection_id: &str,
        path: &Path,
        title: &str,
    ) -> Result<UploadedVideo, UploadError> {
        let video_id = self
            .api
            .create_video(library_id, title, collection_id)
            .await?;
        tracing::debug!(video_id = %video_id, title, "Registered video");

        let response = self
            .api
            .put_video_content(library_id, &video_id, path)
            .await?;
        if !response.accepted() {
            return Err(UploadError::Rejected {
                status_code: response.status_code,
                message: response.message.unwrap_or_default(),
            });
        }

        Ok(UploadedVideo {
            playback_url: playback_url(&self.playback_domain, library_id, &video_id),
            thumbnail_url: self
                .cdn_hostname
                .as_deref()
                .map(|host| thumbnail_url(host, &video_id)),
            video_id,
        })
    }
}

pub fn playback_url(domain: &str, library_id: &str, video_id: &str) -> String {
    format!("https://{domain}/play/{library_id}/{video_id}")
}

pub fn thumbnail_url(cdn_hostname: &str, video_id: &str) -> String {
    format!("https://{cdn_hostname}/{video_id}/thumbnail.jpg")
}
