use crate::schema::{class_key, ClassDef, ClassInfo, PropertyIndex, Record};
use crate::wal::{Wal, WalError};
use graphport_core::error::{ClassifiedError, ErrorCode};
use graphport_core::model::{
    ClassKind, DestType, IndexKind, PropertyMap, PropertyValue, RecordId,
};
use rkyv::ser::{serializers::AllocSerializer, Serializer};
use rkyv::{Archive, Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

pub const WAL_FILE_NAME: &str = "graph.wal";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error")]
    Serialization,
    #[error("destination {0} already exists and overwrite was not requested")]
    DestinationExists(String),
    #[error("destination {0} does not contain a graph store")]
    DestinationMissing(String),
    #[error("invalid class name {0:?}")]
    InvalidClassName(String),
    #[error("class {0} already exists")]
    ClassAlreadyExists(String),
    #[error("class {0} not found")]
    ClassNotFound(String),
    #[error("class {class} is not a {expected:?} class")]
    WrongClassKind { class: String, expected: ClassKind },
    #[error("property {class}.{property} is not declared")]
    PropertyNotFound { class: String, property: String },
    #[error("property {class}.{property} is declared {declared} but found {found}")]
    PropertyTypeConflict {
        class: String,
        property: String,
        declared: DestType,
        found: DestType,
    },
    #[error("index {index} already exists as {existing}, cannot create it as {requested}")]
    IndexKindConflict {
        index: String,
        existing: IndexKind,
        requested: IndexKind,
    },
    #[error("duplicate key {key} for unique index {index}")]
    DuplicateKey { index: String, key: String },
    #[error("record {0} not found")]
    RecordNotFound(RecordId),
}

impl ClassifiedError for StoreError {
    fn error_code(&self) -> ErrorCode {
        match self {
            StoreError::Wal(err) => err.error_code(),
            StoreError::Io(_) => ErrorCode::Unavailable,
            StoreError::Serialization => ErrorCode::Internal,
            StoreError::DestinationExists(_) => ErrorCode::AlreadyExists,
            StoreError::DestinationMissing(_) => ErrorCode::NotFound,
            StoreError::InvalidClassName(_) => ErrorCode::InvalidArgument,
            StoreError::ClassAlreadyExists(_) => ErrorCode::AlreadyExists,
            StoreError::ClassNotFound(_) => ErrorCode::NotFound,
            StoreError::WrongClassKind { .. } => ErrorCode::FailedPrecondition,
            StoreError::PropertyNotFound { .. } => ErrorCode::NotFound,
            StoreError::PropertyTypeConflict { .. } => ErrorCode::FailedPrecondition,
            StoreError::IndexKindConflict { .. } => ErrorCode::AlreadyExists,
            StoreError::DuplicateKey { .. } => ErrorCode::FailedPrecondition,
            StoreError::RecordNotFound(_) => ErrorCode::NotFound,
        }
    }
}

#[derive(Archive, Deserialize, Serialize, Debug, Clone)]
#[archive(check_bytes)]
pub struct StoredProperty {
    pub key: String,
    pub value: PropertyValue,
}

/// WAL entry types. Every store mutation is exactly one entry.
#[derive(Archive, Deserialize, Serialize, Debug, Clone)]
#[archive(check_bytes)]
pub enum WalEntry {
    CreateClass {
        name: String,
        kind: ClassKind,
        cluster: u32,
    },
    CreateProperty {
        cluster: u32,
        name: String,
        dest_type: DestType,
    },
    CreateIndex {
        cluster: u32,
        property: String,
        kind: IndexKind,
    },
    PutVertex {
        rid: RecordId,
        properties: Vec<StoredProperty>,
    },
    PutEdge {
        rid: RecordId,
        out_rid: RecordId,
        in_rid: RecordId,
        properties: Vec<StoredProperty>,
    },
}

/// Which vertex classes a property lookup searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VertexScope {
    Any,
    Class(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub rid: RecordId,
    pub class: String,
    pub properties: PropertyMap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub rid: RecordId,
    pub class: String,
    pub out_vertex: RecordId,
    pub in_vertex: RecordId,
    pub properties: PropertyMap,
}

#[derive(Default)]
struct GraphState {
    /// Indexed by cluster id.
    classes: Vec<ClassDef>,
    by_name: HashMap<String, u32>,
}

impl GraphState {
    fn class(&self, name: &str) -> Option<&ClassDef> {
        self.by_name
            .get(&class_key(name))
            .and_then(|cluster| self.classes.get(*cluster as usize))
    }

    fn cluster_mut(&mut self, cluster: u32) -> Result<&mut ClassDef, StoreError> {
        self.classes
            .get_mut(cluster as usize)
            .ok_or_else(|| StoreError::ClassNotFound(format!("cluster {}", cluster)))
    }

    fn record(&self, rid: RecordId, kind: ClassKind) -> Option<(&ClassDef, &Record)> {
        let class = self.classes.get(rid.cluster as usize)?;
        if class.kind != kind {
            return None;
        }
        class.records.get(&rid.position).map(|record| (class, record))
    }

    fn apply(&mut self, entry: WalEntry) -> Result<(), StoreError> {
        match entry {
            WalEntry::CreateClass {
                name,
                kind,
                cluster,
            } => {
                if cluster as usize != self.classes.len() {
                    return Err(StoreError::Wal(WalError::CorruptEntry));
                }
                self.by_name.insert(class_key(&name), cluster);
                self.classes.push(ClassDef::new(name, kind, cluster));
            }
            WalEntry::CreateProperty {
                cluster,
                name,
                dest_type,
            } => {
                self.cluster_mut(cluster)?.properties.insert(name, dest_type);
            }
            WalEntry::CreateIndex {
                cluster,
                property,
                kind,
            } => {
                let class = self.cluster_mut(cluster)?;
                let mut index = PropertyIndex::new(kind);
                for (position, record) in &class.records {
                    if let Some(value) = record.properties.get(&property) {
                        index.insert(value, *position);
                    }
                }
                class.indexes.insert(property, index);
            }
            WalEntry::PutVertex { rid, properties } => {
                let record = Record {
                    properties: from_stored(properties),
                    endpoints: None,
                };
                self.cluster_mut(rid.cluster)?
                    .insert_record(rid.position, record);
            }
            WalEntry::PutEdge {
                rid,
                out_rid,
                in_rid,
                properties,
            } => {
                let record = Record {
                    properties: from_stored(properties),
                    endpoints: Some((out_rid, in_rid)),
                };
                self.cluster_mut(rid.cluster)?
                    .insert_record(rid.position, record);
            }
        }
        Ok(())
    }
}

/// The schema-flexible destination graph. Classes and their schema are created
/// on demand; every mutation is journalled to a WAL inside the store directory.
pub struct GraphStore {
    dir: PathBuf,
    wal: Mutex<Wal>,
    state: RwLock<GraphState>,
}

impl GraphStore {
    /// Create a fresh store in `dir`. An existing store is only replaced when
    /// `overwrite` is set.
    pub async fn create(dir: impl AsRef<Path>, overwrite: bool) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();

        if destination_exists(&dir).await? {
            if !overwrite {
                return Err(StoreError::DestinationExists(dir.display().to_string()));
            }
            info!("Removing existing destination {}", dir.display());
            if tokio::fs::metadata(&dir).await?.is_dir() {
                tokio::fs::remove_dir_all(&dir).await?;
            } else {
                tokio::fs::remove_file(&dir).await?;
            }
        }

        tokio::fs::create_dir_all(&dir).await?;
        let wal = Wal::open(dir.join(WAL_FILE_NAME)).await?;

        Ok(Self {
            dir,
            wal: Mutex::new(wal),
            state: RwLock::new(GraphState::default()),
        })
    }

    /// Open an existing store and replay its WAL.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        let wal_path = dir.join(WAL_FILE_NAME);
        if !tokio::fs::try_exists(&wal_path).await? {
            return Err(StoreError::DestinationMissing(dir.display().to_string()));
        }

        let mut wal = Wal::open(&wal_path).await?;
        let mut state = GraphState::default();
        let last_lsn = wal
            .replay(|_lsn, data| {
                let archived = rkyv::check_archived_root::<WalEntry>(&data[..])
                    .map_err(|_| WalError::CorruptEntry)?;
                let entry: WalEntry = archived
                    .deserialize(&mut rkyv::Infallible)
                    .map_err(|_| WalError::CorruptEntry)?;
                state.apply(entry).map_err(|_| WalError::CorruptEntry)
            })
            .await?;
        debug!("Replayed {} WAL entries from {}", last_lsn, wal_path.display());

        Ok(Self {
            dir,
            wal: Mutex::new(wal),
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Flush everything journalled so far.
    pub async fn close(&self) -> Result<(), StoreError> {
        let mut wal = self.wal.lock().await;
        wal.flush().await?;
        Ok(())
    }

    pub async fn current_lsn(&self) -> u64 {
        self.wal.lock().await.current_lsn()
    }

    async fn commit(
        &self,
        state: &mut GraphState,
        entry: WalEntry,
        durable: bool,
    ) -> Result<(), StoreError> {
        let bytes = serialize_wal_entry(&entry)?;
        {
            let mut wal = self.wal.lock().await;
            wal.append(&bytes).await?;
            if durable {
                wal.flush().await?;
            }
        }
        state.apply(entry)
    }

    // -- schema ------------------------------------------------------------

    /// Case-insensitive class lookup.
    pub async fn class_kind(&self, name: &str) -> Option<ClassKind> {
        let state = self.state.read().await;
        state.class(name).map(|class| class.kind)
    }

    pub async fn class_exists(&self, name: &str) -> bool {
        self.class_kind(name).await.is_some()
    }

    pub async fn class(&self, name: &str) -> Option<ClassInfo> {
        let state = self.state.read().await;
        state.class(name).map(ClassDef::info)
    }

    /// Class names of one kind, in creation order.
    pub async fn class_names(&self, kind: ClassKind) -> Vec<String> {
        let state = self.state.read().await;
        state
            .classes
            .iter()
            .filter(|class| class.kind == kind)
            .map(|class| class.name.clone())
            .collect()
    }

    pub async fn create_class(&self, name: &str, kind: ClassKind) -> Result<u32, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::InvalidClassName(name.to_string()));
        }

        let mut state = self.state.write().await;
        if let Some(existing) = state.class(name) {
            return Err(StoreError::ClassAlreadyExists(existing.name.clone()));
        }

        let cluster = state.classes.len() as u32;
        let entry = WalEntry::CreateClass {
            name: name.to_string(),
            kind,
            cluster,
        };
        self.commit(&mut state, entry, true).await?;
        debug!("Created {:?} class {} (cluster {})", kind, name, cluster);
        Ok(cluster)
    }

    pub async fn create_vertex_class(&self, name: &str) -> Result<u32, StoreError> {
        self.create_class(name, ClassKind::Vertex).await
    }

    pub async fn create_edge_class(&self, name: &str) -> Result<u32, StoreError> {
        self.create_class(name, ClassKind::Edge).await
    }

    /// Declare a typed property. Returns `false` when an identical declaration
    /// already exists.
    pub async fn create_property(
        &self,
        class_name: &str,
        property: &str,
        dest_type: DestType,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let cluster = {
            let class = state
                .class(class_name)
                .ok_or_else(|| StoreError::ClassNotFound(class_name.to_string()))?;

            match class.properties.get(property) {
                Some(existing) if *existing == dest_type => return Ok(false),
                Some(existing) => {
                    return Err(StoreError::PropertyTypeConflict {
                        class: class.name.clone(),
                        property: property.to_string(),
                        declared: *existing,
                        found: dest_type,
                    })
                }
                None => {}
            }

            if let Some(value) = class
                .records
                .values()
                .filter_map(|record| record.properties.get(property))
                .find(|value| !dest_type.accepts(value))
            {
                return Err(StoreError::PropertyTypeConflict {
                    class: class.name.clone(),
                    property: property.to_string(),
                    declared: dest_type,
                    found: value.dest_type(),
                });
            }
            class.cluster
        };

        let entry = WalEntry::CreateProperty {
            cluster,
            name: property.to_string(),
            dest_type,
        };
        self.commit(&mut state, entry, true).await?;
        Ok(true)
    }

    /// Create an index named `Class.property`. Returns `false` when an index of
    /// the same kind already covers the property.
    pub async fn create_index(
        &self,
        class_name: &str,
        property: &str,
        kind: IndexKind,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let cluster = {
            let class = state
                .class(class_name)
                .ok_or_else(|| StoreError::ClassNotFound(class_name.to_string()))?;

            if !class.properties.contains_key(property) {
                return Err(StoreError::PropertyNotFound {
                    class: class.name.clone(),
                    property: property.to_string(),
                });
            }

            if let Some(existing) = class.indexes.get(property) {
                if existing.kind == kind {
                    return Ok(false);
                }
                return Err(StoreError::IndexKindConflict {
                    index: class.index_name(property),
                    existing: existing.kind,
                    requested: kind,
                });
            }

            if kind == IndexKind::Unique {
                let mut seen = HashSet::new();
                for value in class
                    .records
                    .values()
                    .filter_map(|record| record.properties.get(property))
                {
                    let key = value.index_key();
                    if !seen.insert(key.clone()) {
                        return Err(StoreError::DuplicateKey {
                            index: class.index_name(property),
                            key,
                        });
                    }
                }
            }
            class.cluster
        };

        let entry = WalEntry::CreateIndex {
            cluster,
            property: property.to_string(),
            kind,
        };
        self.commit(&mut state, entry, true).await?;
        Ok(true)
    }

    // -- data --------------------------------------------------------------

    pub async fn create_vertex(
        &self,
        class_name: &str,
        properties: PropertyMap,
    ) -> Result<RecordId, StoreError> {
        let mut state = self.state.write().await;
        let rid = {
            let class = state
                .class(class_name)
                .ok_or_else(|| StoreError::ClassNotFound(class_name.to_string()))?;
            if class.kind != ClassKind::Vertex {
                return Err(StoreError::WrongClassKind {
                    class: class.name.clone(),
                    expected: ClassKind::Vertex,
                });
            }
            validate_record(class, &properties)?;
            RecordId::new(class.cluster, class.next_position)
        };

        let entry = WalEntry::PutVertex {
            rid,
            properties: to_stored(properties),
        };
        self.commit(&mut state, entry, false).await?;
        Ok(rid)
    }

    pub async fn create_edge(
        &self,
        class_name: &str,
        out_vertex: RecordId,
        in_vertex: RecordId,
        properties: PropertyMap,
    ) -> Result<RecordId, StoreError> {
        let mut state = self.state.write().await;
        let rid = {
            for endpoint in [out_vertex, in_vertex] {
                if state.record(endpoint, ClassKind::Vertex).is_none() {
                    return Err(StoreError::RecordNotFound(endpoint));
                }
            }
            let class = state
                .class(class_name)
                .ok_or_else(|| StoreError::ClassNotFound(class_name.to_string()))?;
            if class.kind != ClassKind::Edge {
                return Err(StoreError::WrongClassKind {
                    class: class.name.clone(),
                    expected: ClassKind::Edge,
                });
            }
            validate_record(class, &properties)?;
            RecordId::new(class.cluster, class.next_position)
        };

        let entry = WalEntry::PutEdge {
            rid,
            out_rid: out_vertex,
            in_rid: in_vertex,
            properties: to_stored(properties),
        };
        self.commit(&mut state, entry, false).await?;
        Ok(rid)
    }

    /// All vertices whose `key` equals `value`, in cluster then position order.
    pub async fn find_vertices_by_property(
        &self,
        scope: &VertexScope,
        key: &str,
        value: &PropertyValue,
    ) -> Result<Vec<RecordId>, StoreError> {
        let state = self.state.read().await;
        let classes: Vec<&ClassDef> = match scope {
            VertexScope::Any => state
                .classes
                .iter()
                .filter(|class| class.kind == ClassKind::Vertex)
                .collect(),
            VertexScope::Class(name) => {
                let class = state
                    .class(name)
                    .ok_or_else(|| StoreError::ClassNotFound(name.clone()))?;
                if class.kind != ClassKind::Vertex {
                    warn!("Vertex lookup scoped to edge class {}", class.name);
                    return Ok(Vec::new());
                }
                vec![class]
            }
        };

        let mut out = Vec::new();
        for class in classes {
            let mut positions = class.positions_matching(key, value);
            positions.sort_unstable();
            out.extend(
                positions
                    .into_iter()
                    .map(|position| RecordId::new(class.cluster, position)),
            );
        }
        Ok(out)
    }

    pub async fn vertex(&self, rid: RecordId) -> Option<Vertex> {
        let state = self.state.read().await;
        state
            .record(rid, ClassKind::Vertex)
            .map(|(class, record)| Vertex {
                rid,
                class: class.name.clone(),
                properties: record.properties.clone(),
            })
    }

    pub async fn edge(&self, rid: RecordId) -> Option<Edge> {
        let state = self.state.read().await;
        let (class, record) = state.record(rid, ClassKind::Edge)?;
        let (out_vertex, in_vertex) = record.endpoints?;
        Some(Edge {
            rid,
            class: class.name.clone(),
            out_vertex,
            in_vertex,
            properties: record.properties.clone(),
        })
    }

    pub async fn vertices(&self, class_name: &str) -> Vec<Vertex> {
        let state = self.state.read().await;
        let Some(class) = state.class(class_name) else {
            return Vec::new();
        };
        if class.kind != ClassKind::Vertex {
            return Vec::new();
        }
        class
            .records
            .iter()
            .map(|(position, record)| Vertex {
                rid: RecordId::new(class.cluster, *position),
                class: class.name.clone(),
                properties: record.properties.clone(),
            })
            .collect()
    }

    pub async fn edges(&self, class_name: &str) -> Vec<Edge> {
        let state = self.state.read().await;
        let Some(class) = state.class(class_name) else {
            return Vec::new();
        };
        class
            .records
            .iter()
            .filter_map(|(position, record)| {
                record.endpoints.map(|(out_vertex, in_vertex)| Edge {
                    rid: RecordId::new(class.cluster, *position),
                    class: class.name.clone(),
                    out_vertex,
                    in_vertex,
                    properties: record.properties.clone(),
                })
            })
            .collect()
    }

    pub async fn count(&self, class_name: &str) -> Option<u64> {
        let state = self.state.read().await;
        state
            .class(class_name)
            .map(|class| class.records.len() as u64)
    }
}

fn validate_record(class: &ClassDef, properties: &PropertyMap) -> Result<(), StoreError> {
    for (key, value) in properties {
        if let Some(declared) = class.properties.get(key) {
            if !declared.accepts(value) {
                return Err(StoreError::PropertyTypeConflict {
                    class: class.name.clone(),
                    property: key.clone(),
                    declared: *declared,
                    found: value.dest_type(),
                });
            }
        }
    }

    for (property, index) in &class.indexes {
        if index.kind != IndexKind::Unique {
            continue;
        }
        if let Some(value) = properties.get(property) {
            if !index.get(value).is_empty() {
                return Err(StoreError::DuplicateKey {
                    index: class.index_name(property),
                    key: value.index_key(),
                });
            }
        }
    }
    Ok(())
}

async fn destination_exists(dir: &Path) -> Result<bool, StoreError> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => {
            let mut entries = tokio::fs::read_dir(dir).await?;
            Ok(entries.next_entry().await?.is_some())
        }
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn to_stored(properties: PropertyMap) -> Vec<StoredProperty> {
    properties
        .into_iter()
        .map(|(key, value)| StoredProperty { key, value })
        .collect()
}

fn from_stored(properties: Vec<StoredProperty>) -> PropertyMap {
    properties
        .into_iter()
        .map(|property| (property.key, property.value))
        .collect()
}

fn serialize_wal_entry(entry: &WalEntry) -> Result<Vec<u8>, StoreError> {
    let mut serializer = AllocSerializer::<4096>::default();
    serializer
        .serialize_value(entry)
        .map_err(|_| StoreError::Serialization)?;
    Ok(serializer.into_serializer().into_inner().to_vec())
}
