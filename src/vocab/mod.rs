use std::{
    collections::{
        BTreeMap,
        HashMap,
    },
    fs,
    path::Path,
    time::Instant,
};

use crate::core::{
    utils::clean_text,
    RawRecord,
    VocabItem,
    VocabotError,
};

pub mod pagination;

/// Word search stops after this many hits.
pub const SEARCH_CAP: usize = 30;

/// Immutable-after-load lookup structure over the vocabulary.
///
/// Built once at startup and only read afterwards, so it can be shared
/// across concurrent handlers behind a plain `Arc`.
#[derive(Debug)]
pub struct VocabIndex {
    items: Vec<VocabItem>,
    by_id: HashMap<u32, usize>,
}

impl VocabIndex {
    /// Builds the index from raw source rows. Rows without a usable word
    /// are dropped; the survivors get dense ascending ids in file order.
    pub fn from_records(records: Vec<RawRecord>) -> Result<Self, VocabotError> {
        let mut items = Vec::new();
        let mut next_id = 1u32;

        for record in records {
            let word = clean_text(record.word.as_deref());
            if word.is_empty() {
                continue;
            }

            items.push(VocabItem {
                id: next_id,
                word,
                unit_no: record.unit_no(),
                definition: clean_text(record.definition.as_deref()),
                translation: clean_text(record.translation.as_deref()),
                part_of_speech: clean_text(record.part_of_speech.as_deref()),
                example: clean_text(record.example.as_deref()),
            });
            next_id += 1;
        }

        if items.is_empty() {
            return Err(VocabotError::Load("no usable vocabulary records".to_string()));
        }

        let by_id = items.iter().enumerate().map(|(i, item)| (item.id, i)).collect();
        Ok(Self { items, by_id })
    }

    /// Loads a JSON array of raw records from disk.
    pub fn load_json(path: &Path) -> Result<Self, VocabotError> {
        let start = Instant::now();

        let content = fs::read_to_string(path)
            .map_err(|e| VocabotError::Load(format!("failed to read {:?}: {}", path, e)))?;
        let records: Vec<RawRecord> = serde_json::from_str(&content)
            .map_err(|e| VocabotError::Load(format!("failed to parse {:?}: {}", path, e)))?;

        let index = Self::from_records(records)?;
        println!("Loaded {} vocabulary records in {:?}", index.len(), start.elapsed());
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[VocabItem] {
        &self.items
    }

    pub fn max_id(&self) -> u32 {
        self.items.last().map(|item| item.id).unwrap_or(0)
    }

    pub fn by_id(&self, id: u32) -> Option<&VocabItem> {
        self.by_id.get(&id).map(|&i| &self.items[i])
    }

    /// Items of one unit, in load order.
    pub fn by_unit(&self, unit_no: u32) -> Vec<&VocabItem> {
        self.items.iter().filter(|item| item.unit_no == unit_no).collect()
    }

    /// Swaps a reversed range and clamps it to `[1, max_id]`.
    pub fn normalize_range(&self, a: u32, b: u32) -> (u32, u32) {
        let (lo, hi) = if a > b { (b, a) } else { (a, b) };
        (lo.max(1), hi.min(self.max_id()))
    }

    /// Items with `a <= id <= b`, after swap and clamp.
    pub fn range(&self, a: u32, b: u32) -> Vec<&VocabItem> {
        let (lo, hi) = self.normalize_range(a, b);
        self.items.iter().filter(|item| item.id >= lo && item.id <= hi).collect()
    }

    /// Case-insensitive substring search on the word, capped at
    /// [`SEARCH_CAP`] results.
    pub fn search(&self, query: &str) -> Vec<&VocabItem> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return Vec::new();
        }
        self.items
            .iter()
            .filter(|item| item.word.to_lowercase().contains(&q))
            .take(SEARCH_CAP)
            .collect()
    }

    /// Word counts per unit, sorted by unit number. Unit 0 (unassigned)
    /// is excluded.
    pub fn unit_counts(&self) -> BTreeMap<u32, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            if item.unit_no > 0 {
                *counts.entry(item.unit_no).or_insert(0) += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
pub(crate) fn record(word: &str, unit: u32, definition: &str) -> RawRecord {
    RawRecord {
        word: Some(word.to_string()),
        unit_no: Some(serde_json::json!(unit)),
        definition: Some(definition.to_string()),
        ..RawRecord::default()
    }
}
