use rkyv::{Archive, Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Source side (read-only view of the graph being migrated)
// ---------------------------------------------------------------------------

/// Runtime kind of a source property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SourceKind {
    String,
    Integer,
    Long,
    Boolean,
    Byte,
    Float,
    Double,
    Character,
    Short,
    List,
}

/// A source property value, tagged once at the ingestion boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    String(String),
    Integer(i32),
    Long(i64),
    Boolean(bool),
    Byte(i8),
    Float(f32),
    Double(f64),
    Character(char),
    Short(i16),
    List(Vec<SourceValue>),
}

impl SourceValue {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceValue::String(_) => SourceKind::String,
            SourceValue::Integer(_) => SourceKind::Integer,
            SourceValue::Long(_) => SourceKind::Long,
            SourceValue::Boolean(_) => SourceKind::Boolean,
            SourceValue::Byte(_) => SourceKind::Byte,
            SourceValue::Float(_) => SourceKind::Float,
            SourceValue::Double(_) => SourceKind::Double,
            SourceValue::Character(_) => SourceKind::Character,
            SourceValue::Short(_) => SourceKind::Short,
            SourceValue::List(_) => SourceKind::List,
        }
    }
}

impl From<&str> for SourceValue {
    fn from(value: &str) -> Self {
        SourceValue::String(value.to_string())
    }
}

impl From<String> for SourceValue {
    fn from(value: String) -> Self {
        SourceValue::String(value)
    }
}

impl From<i32> for SourceValue {
    fn from(value: i32) -> Self {
        SourceValue::Integer(value)
    }
}

impl From<i64> for SourceValue {
    fn from(value: i64) -> Self {
        SourceValue::Long(value)
    }
}

impl From<bool> for SourceValue {
    fn from(value: bool) -> Self {
        SourceValue::Boolean(value)
    }
}

impl From<f64> for SourceValue {
    fn from(value: f64) -> Self {
        SourceValue::Double(value)
    }
}

pub type SourceProperties = BTreeMap<String, SourceValue>;

#[derive(Debug, Clone, PartialEq)]
pub struct SourceNode {
    pub id: i64,
    pub labels: Vec<String>,
    pub properties: SourceProperties,
}

impl SourceNode {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            labels: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<SourceValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceRelationship {
    pub id: i64,
    pub rel_type: String,
    pub start: i64,
    pub end: i64,
    pub properties: SourceProperties,
}

impl SourceRelationship {
    pub fn new(id: i64, rel_type: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            id,
            rel_type: rel_type.into(),
            start,
            end,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<SourceValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    Uniqueness,
    NodePropertyExistence,
    RelationshipPropertyExistence,
}

/// What a source schema element applies to. A constraint is scoped to exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaScope {
    Label(String),
    RelationshipType(String),
}

impl SchemaScope {
    pub fn name(&self) -> &str {
        match self {
            SchemaScope::Label(name) | SchemaScope::RelationshipType(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceConstraint {
    pub kind: ConstraintKind,
    pub scope: SchemaScope,
    pub property_keys: Vec<String>,
}

impl SourceConstraint {
    pub fn first_key(&self) -> Option<&str> {
        self.property_keys.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceIndex {
    pub label: String,
    pub property_keys: Vec<String>,
    /// Set when the index only exists to back a uniqueness constraint.
    pub constraint_index: bool,
}

impl SourceIndex {
    pub fn first_key(&self) -> Option<&str> {
        self.property_keys.first().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Destination side
// ---------------------------------------------------------------------------

#[derive(
    Archive, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash,
    serde::Serialize, serde::Deserialize,
)]
#[archive(check_bytes)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DestType {
    String,
    Integer,
    Long,
    Boolean,
    Byte,
    Float,
    Double,
    Short,
    EmbeddedList,
}

impl DestType {
    /// Whether a value may be stored under a property declared with this type.
    /// Narrower numeric kinds widen into wider declared types.
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        use PropertyValue as V;
        match self {
            DestType::String => matches!(value, V::String(_)),
            DestType::Long => matches!(value, V::Byte(_) | V::Short(_) | V::Integer(_) | V::Long(_)),
            DestType::Integer => matches!(value, V::Byte(_) | V::Short(_) | V::Integer(_)),
            DestType::Short => matches!(value, V::Byte(_) | V::Short(_)),
            DestType::Byte => matches!(value, V::Byte(_)),
            DestType::Double => matches!(value, V::Float(_) | V::Double(_)),
            DestType::Float => matches!(value, V::Float(_)),
            DestType::Boolean => matches!(value, V::Boolean(_)),
            DestType::EmbeddedList => matches!(value, V::List(_)),
        }
    }
}

impl std::fmt::Display for DestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DestType::String => "STRING",
            DestType::Integer => "INTEGER",
            DestType::Long => "LONG",
            DestType::Boolean => "BOOLEAN",
            DestType::Byte => "BYTE",
            DestType::Float => "FLOAT",
            DestType::Double => "DOUBLE",
            DestType::Short => "SHORT",
            DestType::EmbeddedList => "EMBEDDEDLIST",
        };
        write!(f, "{}", s)
    }
}

#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, serde::Serialize)]
#[archive(check_bytes)]
#[serde(untagged)]
pub enum ScalarValue {
    String(String),
    Integer(i32),
    Long(i64),
    Boolean(bool),
    Byte(i8),
    Float(f32),
    Double(f64),
    Short(i16),
}

#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, serde::Serialize)]
#[archive(check_bytes)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Integer(i32),
    Long(i64),
    Boolean(bool),
    Byte(i8),
    Float(f32),
    Double(f64),
    Short(i16),
    List(Vec<ScalarValue>),
}

impl PropertyValue {
    pub fn dest_type(&self) -> DestType {
        match self {
            PropertyValue::String(_) => DestType::String,
            PropertyValue::Integer(_) => DestType::Integer,
            PropertyValue::Long(_) => DestType::Long,
            PropertyValue::Boolean(_) => DestType::Boolean,
            PropertyValue::Byte(_) => DestType::Byte,
            PropertyValue::Float(_) => DestType::Float,
            PropertyValue::Double(_) => DestType::Double,
            PropertyValue::Short(_) => DestType::Short,
            PropertyValue::List(_) => DestType::EmbeddedList,
        }
    }

    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PropertyValue::List(
            items
                .into_iter()
                .map(|s| ScalarValue::String(s.into()))
                .collect(),
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Byte(v) => Some(i64::from(*v)),
            PropertyValue::Short(v) => Some(i64::from(*v)),
            PropertyValue::Integer(v) => Some(i64::from(*v)),
            PropertyValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Canonical key used by indices. Integer kinds share one key space, as do
    /// floating kinds, so a `Long(7)` lookup finds an `Integer(7)` value.
    pub fn index_key(&self) -> String {
        match self {
            PropertyValue::List(items) => {
                let keys: Vec<String> = items.iter().map(ScalarValue::index_key).collect();
                format!("l:[{}]", keys.join("\u{1f}"))
            }
            PropertyValue::String(s) => format!("s:{}", s),
            PropertyValue::Boolean(b) => format!("b:{}", b),
            PropertyValue::Float(v) => format!("f:{}", f64::from(*v)),
            PropertyValue::Double(v) => format!("f:{}", v),
            other => match other.as_i64() {
                Some(n) => format!("n:{}", n),
                None => String::new(),
            },
        }
    }
}

impl ScalarValue {
    pub fn index_key(&self) -> String {
        match self {
            ScalarValue::String(s) => format!("s:{}", s),
            ScalarValue::Integer(v) => format!("n:{}", v),
            ScalarValue::Long(v) => format!("n:{}", v),
            ScalarValue::Byte(v) => format!("n:{}", v),
            ScalarValue::Short(v) => format!("n:{}", v),
            ScalarValue::Boolean(b) => format!("b:{}", b),
            ScalarValue::Float(v) => format!("f:{}", f64::from(*v)),
            ScalarValue::Double(v) => format!("f:{}", v),
        }
    }
}

fn scalar_from_source(value: &SourceValue, out: &mut Vec<ScalarValue>) {
    match value {
        SourceValue::String(s) => out.push(ScalarValue::String(s.clone())),
        SourceValue::Integer(v) => out.push(ScalarValue::Integer(*v)),
        SourceValue::Long(v) => out.push(ScalarValue::Long(*v)),
        SourceValue::Boolean(v) => out.push(ScalarValue::Boolean(*v)),
        SourceValue::Byte(v) => out.push(ScalarValue::Byte(*v)),
        SourceValue::Float(v) => out.push(ScalarValue::Float(*v)),
        SourceValue::Double(v) => out.push(ScalarValue::Double(*v)),
        SourceValue::Character(c) => out.push(ScalarValue::String(c.to_string())),
        SourceValue::Short(v) => out.push(ScalarValue::Short(*v)),
        // Source arrays never nest; flatten defensively.
        SourceValue::List(items) => items.iter().for_each(|item| scalar_from_source(item, out)),
    }
}

impl From<&SourceValue> for PropertyValue {
    fn from(value: &SourceValue) -> Self {
        match value {
            SourceValue::String(s) => PropertyValue::String(s.clone()),
            SourceValue::Integer(v) => PropertyValue::Integer(*v),
            SourceValue::Long(v) => PropertyValue::Long(*v),
            SourceValue::Boolean(v) => PropertyValue::Boolean(*v),
            SourceValue::Byte(v) => PropertyValue::Byte(*v),
            SourceValue::Float(v) => PropertyValue::Float(*v),
            SourceValue::Double(v) => PropertyValue::Double(*v),
            SourceValue::Character(c) => PropertyValue::String(c.to_string()),
            SourceValue::Short(v) => PropertyValue::Short(*v),
            SourceValue::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                items.iter().for_each(|item| scalar_from_source(item, &mut out));
                PropertyValue::List(out)
            }
        }
    }
}

pub type PropertyMap = BTreeMap<String, PropertyValue>;

#[derive(Archive, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[archive(check_bytes)]
pub enum ClassKind {
    Vertex,
    Edge,
}

#[derive(Archive, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[archive(check_bytes)]
pub enum IndexKind {
    Unique,
    NotUnique,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::Unique => write!(f, "UNIQUE"),
            IndexKind::NotUnique => write!(f, "NOTUNIQUE"),
        }
    }
}

/// Address of a destination record: the class's cluster and the position within it.
#[derive(
    Archive, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[archive(check_bytes)]
pub struct RecordId {
    pub cluster: u32,
    pub position: u64,
}

impl RecordId {
    pub fn new(cluster: u32, position: u64) -> Self {
        Self { cluster, position }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}:{}", self.cluster, self.position)
    }
}
