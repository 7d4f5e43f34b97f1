//! In-memory state shared by grouping, action generation and commands.
//!
//! Records and results are addressed by handles instead of list positions,
//! so a command can put back exactly what it removed even if the list
//! changed shape in between.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{
    DuplicatePairResult, ImageId, ImageRecord, ResultId, ResultKind, TransformType,
};

/// Arena of image records keyed by path
#[derive(Debug, Default)]
pub struct ImageStore {
    records: Vec<ImageRecord>,
    by_path: HashMap<PathBuf, ImageId>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record, or return the handle of the record already holding that path
    pub fn intern(&mut self, record: ImageRecord) -> ImageId {
        if let Some(id) = self.by_path.get(&record.path) {
            return *id;
        }
        let id = ImageId(self.records.len() as u32);
        self.by_path.insert(record.path.clone(), id);
        self.records.push(record);
        id
    }

    pub fn get(&self, id: ImageId) -> Option<&ImageRecord> {
        self.records.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: ImageId) -> Option<&mut ImageRecord> {
        self.records.get_mut(id.0 as usize)
    }

    /// Like [`get`](Self::get) but an unknown handle is an error
    pub fn record(&self, id: ImageId) -> Result<&ImageRecord> {
        self.get(id).ok_or(Error::UnknownImage(id))
    }

    pub fn find(&self, path: &Path) -> Option<ImageId> {
        self.by_path.get(path).copied()
    }

    pub fn path(&self, id: ImageId) -> Result<PathBuf> {
        Ok(self.record(id)?.path.clone())
    }

    /// Point a record at a new path, keeping the path index in sync
    pub fn set_path(&mut self, id: ImageId, path: PathBuf) -> Result<()> {
        let record = self.records.get_mut(id.0 as usize).ok_or(Error::UnknownImage(id))?;
        if self.by_path.get(&record.path) == Some(&id) {
            self.by_path.remove(&record.path);
        }
        record.path = path.clone();
        self.by_path.insert(path, id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ImageId, &ImageRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| (ImageId(index as u32), record))
    }
}

/// Ordered list of pair results; order always equals [`ResultId`] order
#[derive(Debug, Default)]
pub struct ResultList {
    results: Vec<DuplicatePairResult>,
    next_id: u64,
}

impl ResultList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result and return its handle
    pub fn push(
        &mut self,
        first: ImageId,
        second: ImageId,
        difference: f64,
        transform: TransformType,
        kind: ResultKind,
    ) -> ResultId {
        let id = ResultId(self.next_id);
        self.next_id += 1;
        self.results.push(DuplicatePairResult {
            id,
            first,
            second,
            difference,
            transform,
            kind,
        });
        id
    }

    pub fn get(&self, id: ResultId) -> Option<&DuplicatePairResult> {
        self.results
            .binary_search_by_key(&id, |result| result.id)
            .ok()
            .map(|index| &self.results[index])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DuplicatePairResult> {
        self.results.iter()
    }

    pub fn as_slice(&self) -> &[DuplicatePairResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Remove every result touching one of `images` and return them
    pub fn remove_involving(&mut self, images: &[ImageId]) -> Vec<DuplicatePairResult> {
        let mut removed = Vec::new();
        self.results.retain(|result| {
            if images.iter().any(|image| result.involves(*image)) {
                removed.push(result.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Put previously removed results back at their original place in the order
    pub fn restore(&mut self, removed: Vec<DuplicatePairResult>) {
        for result in removed {
            match self.results.binary_search_by_key(&result.id, |r| r.id) {
                Ok(_) => log::warn!("Result {:?} already present, not restoring", result.id),
                Err(index) => self.results.insert(index, result),
            }
        }
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&DuplicatePairResult) -> bool,
    {
        self.results.retain(keep);
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }
}
