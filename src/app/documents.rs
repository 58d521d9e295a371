//! Document library with metadata editing.

use std::sync::Mutex;

use super::lists::{DocumentsList, DocumentsSource};
use crate::api::{DocumentsFilter, MihfApi};
use crate::domain::models::{Document, NamedRef};
use crate::session::SessionHandle;

pub const LOAD_FAILED: &str = "Could not load documents";
pub const UPDATE_FAILED: &str = "Could not update document data";

/// Re-points a reference at `id`, keeping the old label until the next reload.
fn repoint(current: Option<NamedRef>, id: Option<i64>) -> Option<NamedRef> {
    id.map(|id| NamedRef {
        id,
        name: current.map(|r| r.name).unwrap_or_default(),
    })
}

/// Applies a successful metadata update to a loaded row.
pub(crate) fn apply_meta(doc: &mut Document, category_id: Option<i64>, season_id: Option<i64>) {
    doc.category = repoint(doc.category.take(), category_id);
    doc.season = repoint(doc.season.take(), season_id);
}

#[derive(Debug)]
pub struct DocumentsDesk {
    api: MihfApi,
    session: SessionHandle,
    documents: DocumentsList,
    error: Mutex<Option<String>>,
}

impl DocumentsDesk {
    #[must_use]
    pub fn new(api: MihfApi, session: SessionHandle) -> Self {
        let documents = DocumentsList::new(DocumentsSource::new(api.clone()), session.clone());
        Self {
            api,
            session,
            documents,
            error: Mutex::new(None),
        }
    }

    /// Overrides the list page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.documents = self.documents.with_page_size(page_size);
        self
    }

    #[must_use]
    pub const fn documents(&self) -> &DocumentsList {
        &self.documents
    }

    pub async fn reload(&self) {
        self.documents.reload().await;
        self.check_load();
    }

    pub async fn apply_filter(&self, filter: DocumentsFilter) {
        self.documents.apply_filter(filter).await;
        self.check_load();
    }

    pub async fn load_more_if_needed(&self, current: Option<&Document>) {
        self.documents
            .load_more_if_needed(current.map(|doc| &doc.id))
            .await;
        self.check_load();
    }

    fn check_load(&self) {
        if self.documents.last_error().is_some() {
            self.set_error(LOAD_FAILED);
        }
    }

    /// Re-files a document. `None` clears the category or season.
    ///
    /// On success the loaded row is patched in place.
    pub async fn update_meta(
        &self,
        document_id: i64,
        category_id: Option<i64>,
        season_id: Option<i64>,
    ) -> bool {
        let Some(token) = self.session.token() else {
            return false;
        };

        match self
            .api
            .update_document(&token, document_id, category_id, season_id)
            .await
        {
            Ok(()) => {
                let patched = self.documents.update_item(&document_id, |doc| {
                    apply_meta(doc, category_id, season_id);
                });
                tracing::debug!(document_id, patched, "document metadata updated");
                true
            }
            Err(e) => {
                tracing::warn!(document_id, error = %e, "document metadata update failed");
                self.set_error(UPDATE_FAILED);
                false
            }
        }
    }

    fn set_error(&self, message: &str) {
        *self
            .error
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(message.to_string());
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.error
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
