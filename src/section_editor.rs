//! Draft-then-save editing used by the admin panels.
//!
//! An editor keeps the committed value and, while the admin is editing, a
//! separate draft. Nothing in the draft reaches storage until [`save`] is
//! called; [`cancel`] throws it away.
//!
//! [`save`]: SectionEditor::save
//! [`cancel`]: SectionEditor::cancel

use log::{debug, warn};

use crate::content_model::{Record, SectionDocument};
use crate::content_store::ContentStore;
use crate::store_error::StoreError;

pub struct SectionEditor<'a, D: SectionDocument> {
    store: &'a ContentStore,
    committed: D,
    draft: Option<D>,
}

impl<'a, D: SectionDocument> SectionEditor<'a, D> {
    pub fn new(store: &'a ContentStore) -> Self {
        Self {
            store,
            committed: store.load_document(),
            draft: None,
        }
    }

    pub fn committed(&self) -> &D {
        &self.committed
    }

    pub fn draft(&self) -> Option<&D> {
        self.draft.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    /// Starts editing from the committed value, or continues an open draft.
    pub fn begin_edit(&mut self) -> &mut D {
        let committed = &self.committed;
        self.draft.get_or_insert_with(|| committed.clone())
    }

    pub fn draft_mut(&mut self) -> Option<&mut D> {
        self.draft.as_mut()
    }

    /// Discards the draft. Returns whether one was open.
    pub fn cancel(&mut self) -> bool {
        self.draft.take().is_some()
    }

    /// Writes the draft as the new section document.
    ///
    /// Returns `Ok(false)` when there was nothing to save. On error the draft
    /// stays open so the admin does not lose their edits.
    pub fn save(&mut self) -> Result<bool, StoreError> {
        let draft = match self.draft.take() {
            Some(draft) => draft,
            None => return Ok(false),
        };
        if let Err(e) = self.store.save_document(&draft) {
            warn!("Saving section '{}' failed: {}", D::KEY, e);
            self.draft = Some(draft);
            return Err(e);
        }
        debug!("Section '{}' saved", D::KEY);
        self.committed = draft;
        Ok(true)
    }

    /// Re-reads the committed document, e.g. after another view saved it.
    /// An open draft is left untouched.
    pub fn refresh(&mut self) {
        self.committed = self.store.load_document();
    }
}

/// Edits one row of a collection through a typed patch.
pub struct RecordEditor<'a, T: Record> {
    store: &'a ContentStore,
    committed: T,
    draft: Option<T::Patch>,
}

impl<'a, T: Record> RecordEditor<'a, T> {
    /// `None` when no row has `id`.
    pub fn open(store: &'a ContentStore, id: &str) -> Option<Self> {
        let committed = store.collection::<T>().get(id)?;
        Some(Self {
            store,
            committed,
            draft: None,
        })
    }

    pub fn committed(&self) -> &T {
        &self.committed
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn begin_edit(&mut self) -> &mut T::Patch {
        self.draft.get_or_insert_with(T::Patch::default)
    }

    /// The row as it would look after saving.
    pub fn preview(&self) -> T {
        let mut preview = self.committed.clone();
        if let Some(patch) = &self.draft {
            preview.apply_patch(patch.clone());
        }
        preview
    }

    pub fn cancel(&mut self) -> bool {
        self.draft.take().is_some()
    }

    /// Applies the draft with [`Collection::update`](crate::content_store::Collection::update).
    ///
    /// `Ok(None)` means the row was deleted elsewhere in the meantime; the
    /// draft is dropped since there is nothing left to apply it to.
    pub fn save(&mut self) -> Result<Option<&T>, StoreError> {
        let patch = match self.draft.take() {
            Some(patch) => patch,
            None => return Ok(Some(&self.committed)),
        };
        let id = self.committed.id().to_string();
        match self.store.collection::<T>().update(&id, patch.clone()) {
            Ok(Some(updated)) => {
                self.committed = updated;
                Ok(Some(&self.committed))
            }
            Ok(None) => {
                warn!("Row '{}' vanished from '{}' before save", id, T::KEY);
                Ok(None)
            }
            Err(e) => {
                self.draft = Some(patch);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_model::{AboutContent, Article, ArticleDraft, StatItem};

    #[test]
    fn draft_is_not_persisted_until_save() {
        let store = ContentStore::in_memory();
        let mut editor = SectionEditor::<AboutContent>::new(&store);

        editor.begin_edit().title = "Profil Baru".to_string();
        assert_eq!(store.load_document::<AboutContent>(), AboutContent::default());

        assert!(editor.save().unwrap());
        assert_eq!(store.load_document::<AboutContent>().title, "Profil Baru");
        assert_eq!(editor.committed().title, "Profil Baru");
        assert!(!editor.is_editing());
    }

    #[test]
    fn cancel_discards_draft() {
        let store = ContentStore::in_memory();
        let mut editor = SectionEditor::<AboutContent>::new(&store);
        editor.begin_edit().stats.push(StatItem {
            id: 9,
            value: "100".to_string(),
            label: "Kelas".to_string(),
        });

        assert!(editor.cancel());
        assert!(!editor.save().unwrap());
        assert_eq!(editor.committed(), &AboutContent::default());
    }

    #[test]
    fn refresh_keeps_open_draft() {
        let store = ContentStore::in_memory();
        let mut editor = SectionEditor::<AboutContent>::new(&store);
        editor.begin_edit().title = "Draf".to_string();

        let mut other = AboutContent::default();
        other.title = "Dari tab lain".to_string();
        store.save_document(&other).unwrap();
        editor.refresh();

        assert_eq!(editor.committed().title, "Dari tab lain");
        assert_eq!(editor.draft().map(|d| d.title.as_str()), Some("Draf"));
    }

    #[test]
    fn record_editor_applies_patch_on_save() {
        let store = ContentStore::in_memory();
        let added = store
            .articles()
            .add(ArticleDraft {
                title: "Awal".to_string(),
                author: "Budi".to_string(),
                ..Default::default()
            })
            .unwrap();

        let mut editor = RecordEditor::<Article>::open(&store, &added.id).unwrap();
        editor.begin_edit().title = Some("Revisi".to_string());
        assert_eq!(editor.preview().title, "Revisi");
        assert_eq!(store.articles().get(&added.id).unwrap().title, "Awal");

        let saved = editor.save().unwrap().unwrap();
        assert_eq!(saved.title, "Revisi");
        assert_eq!(saved.author, "Budi");
        assert_eq!(store.articles().get(&added.id).unwrap().title, "Revisi");
    }

    #[test]
    fn record_editor_reports_vanished_row() {
        let store = ContentStore::in_memory();
        let added = store.articles().add(ArticleDraft::default()).unwrap();
        let mut editor = RecordEditor::<Article>::open(&store, &added.id).unwrap();
        editor.begin_edit().title = Some("x".to_string());

        store.articles().delete(&added.id).unwrap();
        assert!(editor.save().unwrap().is_none());
        assert!(RecordEditor::<Article>::open(&store, "missing").is_none());
    }
}
