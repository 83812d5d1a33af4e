use std::path::Path;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use tokio_util::io::ReaderStream;

use super::error::UploadError;
use super::types::{
    Collection, CollectionList, CreateCollection, CreateVideo, CreatedVideo, UploadResponse,
};

/// Largest error body kept in an `HttpStatus` error.
const MAX_ERROR_BODY: usize = 512;

const SEARCH_PAGE_SIZE: &str = "100";

/// The destination library's REST surface, as used by collection resolution
/// and upload.
#[async_trait::async_trait]
pub trait StreamApi: Send + Sync {
    /// Collections whose names contain `name`, as the server's search sees it.
    async fn search_collections(
        &self,
        library_id: &str,
        name: &str,
    ) -> Result<Vec<Collection>, UploadError>;

    async fn create_collection(
        &self,
        library_id: &str,
        name: &str,
    ) -> Result<Collection, UploadError>;

    /// Register an empty video entity and return its id.
    async fn create_video(
        &self,
        library_id: &str,
        title: &str,
        collection_id: &str,
    ) -> Result<String, UploadError>;

    async fn put_video_content(
        &self,
        library_id: &str,
        video_id: &str,
        path: &Path,
    ) -> Result<UploadResponse, UploadError>;
}

pub struct BunnyClient {
    client: Client,
    api_base: String,
    /// Total time allowed for a JSON API call. The content PUT is bounded by
    /// the client's read timeout instead.
    request_timeout: Duration,
}

impl std::fmt::Debug for BunnyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BunnyClient")
            .field("api_base", &self.api_base)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl BunnyClient {
    pub fn new(
        api_base: &str,
        api_key: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut key = HeaderValue::from_str(api_key)?;
        key.set_sensitive(true);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(HeaderName::from_static("accesskey"), key);
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(default_headers)
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    fn endpoint(&self, library_id: &str, path: &str) -> String {
        format!("{}/library/{}/{}", self.api_base, library_id, path)
    }
}

fn snippet(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(MAX_ERROR_BODY)
        .collect()
}

/// Decode a JSON body, turning non-2xx responses into `HttpStatus`.
async fn read_json<T: DeserializeOwned>(
    op: &'static str,
    response: Response,
) -> Result<T, UploadError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|source| UploadError::Http { op, source })?;

    if !status.is_success() {
        return Err(UploadError::HttpStatus {
            op,
            status: status.as_u16(),
            body: snippet(&body),
        });
    }

    serde_json::from_slice(&body).map_err(|source| UploadError::Decode { op, source })
}

#[async_trait::async_trait]
impl StreamApi for BunnyClient {
    async fn search_collections(
        &self,
        library_id: &str,
        name: &str,
    ) -> Result<Vec<Collection>, UploadError> {
        const OP: &str = "search collections";
        let response = self
            .client
            .get(self.endpoint(library_id, "collections"))
            .timeout(self.request_timeout)
            .query(&[
                ("page", "1"),
                ("itemsPerPage", SEARCH_PAGE_SIZE),
                ("search", name),
                ("orderBy", "date"),
                ("includeThumbnails", "false"),
            ])
            .send()
            .await
            .map_err(|source| UploadError::Http { op: OP, source })?;
        let list: CollectionList = read_json(OP, response).await?;
        Ok(list.items)
    }

    async fn create_collection(
        &self,
        library_id: &str,
        name: &str,
    ) -> Result<Collection, UploadError> {
        const OP: &str = "create collection";
        let response = self
            .client
            .post(self.endpoint(library_id, "collections"))
            .timeout(self.request_timeout)
            .json(&CreateCollection { name })
            .send()
            .await
            .map_err(|source| UploadError::Http { op: OP, source })?;
        read_json(OP, response).await
    }

    async fn create_video(
        &self,
        library_id: &str,
        title: &str,
        collection_id: &str,
    ) -> Result<String, UploadError> {
        const OP: &str = "create video";
        let response = self
            .client
            .post(self.endpoint(library_id, "videos"))
            .timeout(self.request_timeout)
            .json(&CreateVideo {
                title,
                collection_id,
            })
            .send()
            .await
            .map_err(|source| UploadError::Http { op: OP, source })?;
        let created: CreatedVideo = read_json(OP, response).await?;
        created
            .guid
            .filter(|g| !g.is_empty())
            .ok_or(UploadError::MissingField {
                op: OP,
                field: "guid",
            })
    }

    async fn put_video_content(
        &self,
        library_id: &str,
        video_id: &str,
        path: &Path,
    ) -> Result<UploadResponse, UploadError> {
        const OP: &str = "upload video";
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();

        let response = self
            .client
            .put(self.endpoint(library_id, &format!("videos/{video_id}")))
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, len)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(|source| UploadError::Http { op: OP, source })?;

        // The body carries the verdict even on error statuses; only fall back
        // to the HTTP status when it cannot be parsed.
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| UploadError::Http { op: OP, source })?;
        match serde_json::from_slice::<UploadResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(UploadError::HttpStatus {
                op: OP,
                status: status.as_u16(),
                body: snippet(&body),
            }),
            Err(source) => Err(UploadError::Decode { op: OP, source }),
        }
    }
}
