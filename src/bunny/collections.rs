use std::sync::Arc;

use super::api::StreamApi;
use super::error::UploadError;

/// Finds or creates the destination collection for a source folder name.
///
/// Nothing is cached: every call searches first. Two tasks resolving the
/// same new name at once can still both create it.
pub struct CollectionResolver {
    api: Arc<dyn StreamApi>,
}

impl CollectionResolver {
    pub fn new(api: Arc<dyn StreamApi>) -> Self {
        Self { api }
    }

    /// Return the id of the collection named `name` (case-insensitive),
    /// creating it if the library has none.
    pub async fn resolve(&self, library_id: &str, name: &str) -> Result<String, UploadError> {
        let wanted = name.to_lowercase();
        let existing = self
            .api
            .search_collections(library_id, name)
            .await?
            .into_iter()
            .find(|c| c.name.to_lowercase() == wanted);

        let collection = match existing {
            Some(found) => found,
            None => {
                tracing::info!("Creating collection \"{}\"", name);
                self.api.create_collection(library_id, name).await?
            }
        };

        collection
            .guid
            .filter(|g| !g.is_empty())
            .ok_or(UploadError::MissingField {
                op: "resolve collection",
                field: "guid",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeStreamApi;

    #[tokio::test]
    async fn test_existing_collection_reused_case_insensitively() {
        let api = Arc::new(FakeStreamApi::new().with_collection("col-m", "Marketing"));
        let resolver = CollectionResolver::new(api.clone());

        let id = resolver.resolve("7", "marketing").await.unwrap();
        assert_eq!(id, "col-m");
        assert_eq!(api.calls(), vec!["search marketing"]);
    }

    #[tokio::test]
    async fn test_substring_match_is_not_reused() {
        let api = Arc::new(FakeStreamApi::new().with_collection("col-m", "Marketing Archive"));
        let resolver = CollectionResolver::new(api.clone());

        let id = resolver.resolve("7", "Marketing").await.unwrap();
        assert_ne!(id, "col-m");
        assert_eq!(api.calls(), vec!["search Marketing", "create_collection Marketing"]);
    }

    #[tokio::test]
    async fn test_second_resolve_finds_created_collection() {
        let api = Arc::new(FakeStreamApi::new());
        let resolver = CollectionResolver::new(api.clone());

        let first = resolver.resolve("7", "Clips").await.unwrap();
        let second = resolver.resolve("7", "CLIPS").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            api.calls()
                .iter()
                .filter(|c| c.starts_with("create_collection"))
                .count(),
            1
        );
    }
}
