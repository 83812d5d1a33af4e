//! Lazy, page-at-a-time traversal of the folder listing and of each matching
//! folder's video listing. Nothing is fetched until the caller asks for the
//! next page, so discovery never runs ahead of the transfer pipeline.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::error::SourceError;
use super::session::SourceSession;
use super::types::{FolderRecord, Listing, RemoteAsset, RemoteFolder, VideoRecord};

/// Which folders a run should touch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderScope {
    folder: Option<String>,
    parent: Option<String>,
}

impl FolderScope {
    /// Blank names are treated as unset.
    pub fn new(folder: Option<String>, parent: Option<String>) -> Self {
        let clean = |s: Option<String>| {
            s.map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            folder: clean(folder),
            parent: clean(parent),
        }
    }

    /// A folder matches when no target is set, or when it is the target or
    /// nested anywhere below it. A parent constraint additionally requires
    /// that name somewhere in the ancestor chain.
    pub fn matches(&self, folder: &RemoteFolder) -> bool {
        let Some(target) = &self.folder else {
            return true;
        };

        let same = |a: &str, b: &str| a.to_lowercase() == b.to_lowercase();
        let in_ancestors = |name: &str| folder.ancestors.iter().any(|a| same(a, name));

        if !same(&folder.name, target) && !in_ancestors(target) {
            return false;
        }

        match &self.parent {
            Some(parent) => in_ancestors(parent),
            None => true,
        }
    }

    pub fn describe(&self) -> String {
        match (&self.parent, &self.folder) {
            (_, None) => "all folders".to_string(),
            (Some(parent), Some(folder)) => format!("\"{parent} > {folder}\""),
            (None, Some(folder)) => format!("\"{folder}\""),
        }
    }
}

/// Cursor over a paginated listing. Follows `paging.next` until it is absent.
pub struct Pages<T> {
    session: Arc<dyn SourceSession>,
    next: Option<String>,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Pages<T> {
    pub fn new(session: Arc<dyn SourceSession>, start: impl Into<String>) -> Self {
        Self {
            session,
            next: Some(start.into()),
            _record: PhantomData,
        }
    }

    /// Fetch the next page, or `None` once the listing is exhausted.
    ///
    /// After an error the cursor is spent: the walk does not resume.
    pub async fn next_page(&mut self) -> Result<Option<Listing<T>>, SourceError> {
        let Some(path) = self.next.take() else {
            return Ok(None);
        };

        let value = self.session.get_json(&path).await?;
        let listing: Listing<T> =
            serde_json::from_value(value).map_err(|source| SourceError::Decode {
                url: path.clone(),
                source,
            })?;

        self.next = listing
            .paging
            .next
            .clone()
            .filter(|next| !next.is_empty());
        Ok(Some(listing))
    }
}

/// One page of the folder listing after scope filtering.
#[derive(Debug)]
pub struct FolderPage {
    pub matching: Vec<RemoteFolder>,
    pub skipped: usize,
}

/// Walks the folder listing and filters it through a [`FolderScope`].
pub struct FolderWalker {
    session: Arc<dyn SourceSession>,
    pages: Pages<FolderRecord>,
    scope: FolderScope,
}

impl FolderWalker {
    pub fn new(
        session: Arc<dyn SourceSession>,
        folders_path: impl Into<String>,
        scope: FolderScope,
    ) -> Self {
        Self {
            pages: Pages::new(session.clone(), folders_path),
            session,
            scope,
        }
    }

    pub async fn next_page(&mut self) -> Result<Option<FolderPage>, SourceError> {
        let Some(listing) = self.pages.next_page().await? else {
            return Ok(None);
        };

        let mut matching = Vec::new();
        let mut skipped = 0;
        for folder in listing.data.into_iter().map(RemoteFolder::from) {
            if self.scope.matches(&folder) {
                matching.push(folder);
            } else {
                tracing::debug!(folder = %folder.display_path(), "Folder out of scope");
                skipped += 1;
            }
        }
        Ok(Some(FolderPage { matching, skipped }))
    }

    /// Start the nested walk over a folder's videos.
    pub fn assets(&self, folder: &RemoteFolder) -> AssetPages {
        AssetPages {
            pages: Pages::new(self.session.clone(), folder.videos_path.clone()),
        }
    }
}

/// One page of a folder's video listing.
#[derive(Debug)]
pub struct AssetPage {
    pub assets: Vec<RemoteAsset>,
}

pub struct AssetPages {
    pages: Pages<VideoRecord>,
}

impl AssetPages {
    pub async fn next_page(&mut self) -> Result<Option<AssetPage>, SourceError> {
        Ok(self.pages.next_page().await?.map(|listing| AssetPage {
            assets: listing.data.into_iter().map(RemoteAsset::from).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSource, folder_json, page_json, video_json};

    fn folder(name: &str, ancestors: &[&str]) -> RemoteFolder {
        RemoteFolder {
            id: "1".into(),
            name: name.into(),
            ancestors: ancestors.iter().map(|a| a.to_string()).collect(),
            videos_path: "/x/videos?page=1".into(),
        }
    }

    fn scope(folder: &str) -> FolderScope {
        FolderScope::new(Some(folder.into()), None)
    }

    #[test]
    fn test_nested_folder_matches_ancestor_target() {
        let clips = folder("Clips", &["Root", "Marketing"]);
        assert!(scope("Marketing").matches(&clips));
        assert!(!scope("Sales").matches(&clips));
    }

    #[test]
    fn test_folder_matches_own_name() {
        assert!(scope("Marketing").matches(&folder("Marketing", &["Root"])));
        assert!(scope("marketing").matches(&folder("MARKETING", &[])));
    }

    #[test]
    fn test_scope_folds_non_ascii_case() {
        assert!(scope("événements").matches(&folder("ÉVÉNEMENTS", &[])));
        assert!(scope("Événements").matches(&folder("Clips", &["Root", "ÉVÉNEMENTS"])));
        let parent = FolderScope::new(Some("Clips".into()), Some("straße".into()));
        assert!(parent.matches(&folder("clips", &["STRAßE"])));
    }

    #[test]
    fn test_no_target_passes_everything() {
        let all = FolderScope::new(None, Some("Root".into()));
        assert!(all.matches(&folder("Anything", &[])));
        assert!(FolderScope::default().matches(&folder("Anything", &["X"])));
    }

    #[test]
    fn test_parent_constraint_must_be_in_ancestors() {
        let scoped = FolderScope::new(Some("Clips".into()), Some("Marketing".into()));
        assert!(scoped.matches(&folder("Clips", &["Root", "Marketing"])));
        assert!(!scoped.matches(&folder("Clips", &["Root", "Sales"])));
        // The folder's own name does not satisfy the parent constraint.
        let self_parent = FolderScope::new(Some("Marketing".into()), Some("Marketing".into()));
        assert!(!self_parent.matches(&folder("Marketing", &["Root"])));
    }

    #[test]
    fn test_blank_names_are_unset() {
        let blank = FolderScope::new(Some("  ".into()), Some(String::new()));
        assert_eq!(blank, FolderScope::default());
        assert_eq!(blank.describe(), "all folders");
        let scoped = FolderScope::new(Some(" Clips ".into()), Some("Marketing".into()));
        assert_eq!(scoped.describe(), "\"Marketing > Clips\"");
    }

    #[tokio::test]
    async fn test_pagination_stops_when_next_is_absent() {
        let source = FakeSource::new()
            .with_page("/p1", page_json(vec![], Some("/p2")))
            .with_page("/p2", page_json(vec![], Some("/p3")))
            .with_page("/p3", page_json(vec![], None));
        let source = Arc::new(source);

        let mut pages: Pages<FolderRecord> = Pages::new(source.clone(), "/p1");
        let mut count = 0;
        while pages.next_page().await.unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
        assert_eq!(source.requests(), vec!["/p1", "/p2", "/p3"]);
        // Exhausted cursor stays exhausted without further requests.
        assert!(pages.next_page().await.unwrap().is_none());
        assert_eq!(source.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_walker_filters_folders_and_lists_assets() {
        let source = FakeSource::new()
            .with_page(
                "/users/1/folders?page=1",
                page_json(
                    vec![
                        folder_json("/users/1/projects/10", "Clips", &["Root", "Marketing"]),
                        folder_json("/users/1/projects/11", "Quarterly", &["Root", "Sales"]),
                    ],
                    None,
                ),
            )
            .with_page(
                "/users/1/projects/10/videos?page=1",
                page_json(vec![video_json(1, &["360p", "1080p"])], None),
            );
        let source = Arc::new(source);

        let mut walker = FolderWalker::new(source.clone(), "/users/1/folders?page=1", scope("Marketing"));
        let page = walker.next_page().await.unwrap().unwrap();
        assert_eq!(page.skipped, 1);
        assert_eq!(page.matching.len(), 1);
        assert_eq!(page.matching[0].name, "Clips");

        let mut assets = walker.assets(&page.matching[0]);
        let asset_page = assets.next_page().await.unwrap().unwrap();
        assert_eq!(asset_page.assets.len(), 1);
        assert_eq!(asset_page.assets[0].renditions.len(), 2);
        assert!(assets.next_page().await.unwrap().is_none());

        assert!(walker.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listing_error_propagates() {
        let source = Arc::new(FakeSource::new().with_status("/users/1/folders?page=1", 500));
        let mut walker = FolderWalker::new(source, "/users/1/folders?page=1", FolderScope::default());
        let err = walker.next_page().await.unwrap_err();
        assert!(matches!(err, SourceError::HttpStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_malformed_listing_is_decode_error() {
        let source = Arc::new(
            FakeSource::new().with_page("/p1", serde_json::json!({"data": "not-a-list"})),
        );
        let mut pages: Pages<FolderRecord> = Pages::new(source, "/p1");
        let err = pages.next_page().await.unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }));
    }
}
