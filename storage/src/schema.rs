use graphport_core::model::{ClassKind, DestType, IndexKind, PropertyMap, PropertyValue, RecordId};
use std::collections::{BTreeMap, HashMap};

/// One stored vertex or edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub properties: PropertyMap,
    /// (out, in) for edges.
    pub endpoints: Option<(RecordId, RecordId)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub name: String,
    pub property: String,
    pub kind: IndexKind,
}

/// Read-only view of a class, returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    pub name: String,
    pub kind: ClassKind,
    pub cluster: u32,
    pub properties: BTreeMap<String, DestType>,
    pub indexes: Vec<IndexInfo>,
    pub record_count: u64,
}

#[derive(Debug)]
pub(crate) struct PropertyIndex {
    pub kind: IndexKind,
    pub entries: HashMap<String, Vec<u64>>,
}

impl PropertyIndex {
    pub fn new(kind: IndexKind) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, value: &PropertyValue, position: u64) {
        self.entries
            .entry(value.index_key())
            .or_default()
            .push(position);
    }

    pub fn get(&self, value: &PropertyValue) -> &[u64] {
        self.entries
            .get(&value.index_key())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug)]
pub(crate) struct ClassDef {
    pub name: String,
    pub kind: ClassKind,
    pub cluster: u32,
    pub properties: BTreeMap<String, DestType>,
    pub indexes: BTreeMap<String, PropertyIndex>,
    pub records: BTreeMap<u64, Record>,
    pub next_position: u64,
}

impl ClassDef {
    pub fn new(name: String, kind: ClassKind, cluster: u32) -> Self {
        Self {
            name,
            kind,
            cluster,
            properties: BTreeMap::new(),
            indexes: BTreeMap::new(),
            records: BTreeMap::new(),
            next_position: 0,
        }
    }

    pub fn index_name(&self, property: &str) -> String {
        format!("{}.{}", self.name, property)
    }

    pub fn info(&self) -> ClassInfo {
        ClassInfo {
            name: self.name.clone(),
            kind: self.kind,
            cluster: self.cluster,
            properties: self.properties.clone(),
            indexes: self
                .indexes
                .iter()
                .map(|(property, index)| IndexInfo {
                    name: self.index_name(property),
                    property: property.clone(),
                    kind: index.kind,
                })
                .collect(),
            record_count: self.records.len() as u64,
        }
    }

    pub fn insert_record(&mut self, position: u64, record: Record) {
        for (property, index) in self.indexes.iter_mut() {
            if let Some(value) = record.properties.get(property) {
                index.insert(value, position);
            }
        }
        self.records.insert(position, record);
        self.next_position = self.next_position.max(position + 1);
    }

    /// Positions whose `key` matches `value`, through the index when one exists.
    pub fn positions_matching(&self, key: &str, value: &PropertyValue) -> Vec<u64> {
        if let Some(index) = self.indexes.get(key) {
            return index.get(value).to_vec();
        }
        let wanted = value.index_key();
        self.records
            .iter()
            .filter(|(_, record)| {
                record
                    .properties
                    .get(key)
                    .map(|v| v.index_key() == wanted)
                    .unwrap_or(false)
            })
            .map(|(position, _)| *position)
            .collect()
    }
}

/// Class names are unique ignoring ASCII/Unicode case.
pub(crate) fn class_key(name: &str) -> String {
    name.to_lowercase()
}
