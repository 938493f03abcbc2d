//! In-memory record tables with change tracking

use crate::records::{ChapterRecord, RecordUpsert, WorkRecord};
use crate::storage::{Storage, StorageResult};
use std::collections::{BTreeSet, HashMap};

/// Records changed since the last checkpoint, ordered by ID
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirtyRecords {
    pub works: Vec<(u64, WorkRecord)>,
    pub chapters: Vec<(u64, ChapterRecord)>,
}

impl DirtyRecords {
    pub fn is_empty(&self) -> bool {
        self.works.is_empty() && self.chapters.is_empty()
    }
}

/// Works and chapters keyed by ID
///
/// Upserts that leave a record unchanged do not mark it dirty, so
/// re-crawling a page never causes a write.
#[derive(Debug, Default)]
pub struct RecordStore {
    works: HashMap<u64, WorkRecord>,
    chapters: HashMap<u64, ChapterRecord>,
    dirty_works: BTreeSet<u64>,
    dirty_chapters: BTreeSet<u64>,
}

impl RecordStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads both tables from storage
    ///
    /// A fresh database yields an empty store. Loaded records start clean.
    pub fn load(storage: &dyn Storage) -> StorageResult<Self> {
        let works = storage.load_works()?;
        let chapters = storage.load_chapters()?;

        tracing::debug!(
            "Loaded {} works and {} chapters from storage",
            works.len(),
            chapters.len()
        );

        Ok(Self {
            works,
            chapters,
            ..Self::default()
        })
    }

    /// Applies one upsert
    ///
    /// Returns true if a record was created or changed.
    pub fn apply(&mut self, upsert: RecordUpsert) -> bool {
        match upsert {
            RecordUpsert::WorkListing { id, listing } => {
                let work = self.works.entry(id).or_default();
                let updated = WorkRecord {
                    title: Some(listing.title),
                    follower_count: Some(listing.follower_count),
                    view_count: Some(listing.view_count),
                    chapter_count: Some(listing.chapter_count),
                    page_count: Some(listing.page_count),
                    rating: Some(listing.rating),
                    tags: Some(listing.tags),
                    author: work.author.clone(),
                };
                Self::replace(work, updated, id, &mut self.dirty_works)
            }

            RecordUpsert::WorkAuthor { id, author } => {
                let work = self.works.entry(id).or_default();
                let updated = WorkRecord {
                    author: Some(author),
                    ..work.clone()
                };
                Self::replace(work, updated, id, &mut self.dirty_works)
            }

            RecordUpsert::Chapter { id, record } => {
                if self.chapters.get(&id) == Some(&record) {
                    return false;
                }
                self.chapters.insert(id, record);
                self.dirty_chapters.insert(id);
                true
            }
        }
    }

    fn replace(
        slot: &mut WorkRecord,
        updated: WorkRecord,
        id: u64,
        dirty: &mut BTreeSet<u64>,
    ) -> bool {
        if *slot == updated {
            return false;
        }
        *slot = updated;
        dirty.insert(id);
        true
    }

    /// Removes and returns every record changed since the last call
    pub fn take_dirty(&mut self) -> DirtyRecords {
        let works = std::mem::take(&mut self.dirty_works)
            .into_iter()
            .filter_map(|id| self.works.get(&id).map(|w| (id, w.clone())))
            .collect();
        let chapters = std::mem::take(&mut self.dirty_chapters)
            .into_iter()
            .filter_map(|id| self.chapters.get(&id).map(|c| (id, c.clone())))
            .collect();

        DirtyRecords { works, chapters }
    }

    /// Gets a work by ID
    #[cfg(test)]
    pub fn work(&self, id: u64) -> Option<&WorkRecord> {
        self.works.get(&id)
    }

    /// Gets a chapter by ID
    #[cfg(test)]
    pub fn chapter(&self, id: u64) -> Option<&ChapterRecord> {
        self.chapters.get(&id)
    }

    pub fn work_count(&self) -> usize {
        self.works.len()
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }
}
