use serde::{Deserialize, Serialize};

/// A collection in the destination library.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CollectionList {
    #[serde(default)]
    pub items: Vec<Collection>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateCollection<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateVideo<'a> {
    pub title: &'a str,
    pub collection_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedVideo {
    #[serde(default)]
    pub guid: Option<String>,
}

/// Body of the content PUT. Success is judged by `status_code`, not by the
/// HTTP status of the response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
}

impl UploadResponse {
    pub fn accepted(&self) -> bool {
        self.status_code == Some(200)
    }
}

/// A video that finished uploading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedVideo {
    pub video_id: String,
    pub playback_url: String,
    pub thumbnail_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_response_judged_by_body_status() {
        let ok: UploadResponse =
            serde_json::from_str(r#"{"success": true, "message": "OK", "statusCode": 200}"#)
                .unwrap();
        assert!(ok.accepted());

        let rejected: UploadResponse =
            serde_json::from_str(r#"{"success": false, "message": "Bad", "statusCode": 400}"#)
                .unwrap();
        assert!(!rejected.accepted());

        let empty: UploadResponse = serde_json::from_str("{}").unwrap();
        assert!(!empty.accepted());
    }

    #[test]
    fn test_create_video_body_is_camel_case() {
        let body = serde_json::to_value(CreateVideo {
            title: "clip.mp4",
            collection_id: "c-1",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"title": "clip.mp4", "collectionId": "c-1"}));
    }

    #[test]
    fn test_collection_list_parses() {
        let list: CollectionList = serde_json::from_str(
            r#"{"totalItems": 1, "currentPage": 1, "itemsPerPage": 100,
                "items": [{"videoLibraryId": 7, "guid": "abc", "name": "Marketing", "videoCount": 3}]}"#,
        )
        .unwrap();
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].guid.as_deref(), Some("abc"));
    }
}
