use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{PimdError, Result};
use crate::model::Record;
use crate::options::ExtractionMode;

/// Id lookup over a record slice. A duplicated id resolves to the record seen
/// last in file order.
#[derive(Debug)]
pub struct RecordIndex<'a> {
    by_id: HashMap<&'a str, &'a Record>,
    last_id: Option<&'a str>,
}

impl<'a> RecordIndex<'a> {
    pub fn build(records: &'a [Record]) -> Self {
        let mut by_id = HashMap::new();
        let mut last_id = None;

        for record in records {
            let Some(id) = record.id() else {
                continue;
            };
            last_id = Some(id);
            by_id.insert(id, record);
        }

        Self { by_id, last_id }
    }

    pub fn get(&self, id: &str) -> Option<&'a Record> {
        self.by_id.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn default_leaf(&self) -> Option<&'a str> {
        self.last_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkStop {
    Root,
    Dangling(String),
    Cycle(String),
}

#[derive(Debug)]
pub struct BranchWalk<'a> {
    pub records: Vec<&'a Record>,
    pub stop: WalkStop,
}

pub fn walk_branch<'a>(index: &RecordIndex<'a>, leaf_id: &str) -> BranchWalk<'a> {
    let mut records = Vec::new();
    let mut seen = HashSet::new();
    let mut current = leaf_id;

    let stop = loop {
        if !seen.insert(current) {
            break WalkStop::Cycle(current.to_string());
        }

        let Some(record) = index.get(current) else {
            break WalkStop::Dangling(current.to_string());
        };
        records.push(record);

        match record.parent_id() {
            Some(parent_id) => current = parent_id,
            None => break WalkStop::Root,
        }
    };

    records.reverse();
    BranchWalk { records, stop }
}

#[derive(Debug, Default)]
pub struct Selection<'a> {
    pub records: Vec<&'a Record>,
    pub leaf_id: Option<String>,
    pub warnings: Vec<String>,
}

/// Only an explicit `leaf_id` that is absent from the index is an error; every
/// other gap yields a shorter selection.
pub fn select_records<'a>(
    records: &'a [Record],
    mode: ExtractionMode,
    leaf_id: Option<&str>,
) -> Result<Selection<'a>> {
    if mode == ExtractionMode::All {
        return Ok(Selection {
            records: records.iter().filter(|record| !record.is_ignored()).collect(),
            ..Selection::default()
        });
    }

    let index = RecordIndex::build(records);

    let leaf = match leaf_id {
        Some(leaf_id) if index.contains(leaf_id) => leaf_id,
        Some(leaf_id) => {
            return Err(PimdError::LeafNotFound {
                leaf_id: leaf_id.to_string(),
            });
        }
        None => match index.default_leaf() {
            Some(leaf_id) => leaf_id,
            None => return Ok(Selection::default()),
        },
    };

    let walk = walk_branch(&index, leaf);
    let mut warnings = Vec::new();
    match &walk.stop {
        WalkStop::Root => {}
        WalkStop::Dangling(parent_id) => {
            debug!(leaf = leaf, parent = %parent_id, "branch walk stopped at dangling parent");
            warnings.push(format!(
                "branch from leaf {leaf} stops early: parent {parent_id} not found"
            ));
        }
        WalkStop::Cycle(entry_id) => {
            debug!(leaf = leaf, entry = %entry_id, "branch walk stopped at cycle");
            warnings.push(format!(
                "branch from leaf {leaf} stops early: parent cycle at {entry_id}"
            ));
        }
    }

    Ok(Selection {
        records: walk
            .records
            .into_iter()
            .filter(|record| !record.is_ignored())
            .collect(),
        leaf_id: Some(leaf.to_string()),
        warnings,
    })
}
