//! JSON-lines export reader.
//!
//! Understands the line format produced by `apoc.export.json.all`:
//!
//! ```text
//! {"type":"node","id":"0","labels":["User"],"properties":{"name":"Adam"}}
//! {"type":"relationship","id":"0","label":"KNOWS","properties":{},"start":{"id":"0"},"end":{"id":"1"}}
//! ```
//!
//! plus two schema lines the export does not emit on its own:
//!
//! ```text
//! {"type":"constraint","kind":"UNIQUENESS","label":"User","properties":["email"]}
//! {"type":"index","label":"User","properties":["name"],"constraintIndex":false}
//! ```

use crate::reader::{NodeIter, RelationshipIter, SourceError, SourceGraphReader};
use graphport_core::model::{
    ConstraintKind, SchemaScope, SourceConstraint, SourceIndex, SourceNode, SourceProperties,
    SourceRelationship, SourceValue,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DumpId {
    Number(i64),
    Text(String),
}

impl DumpId {
    fn resolve(&self) -> Result<i64, String> {
        match self {
            DumpId::Number(n) => Ok(*n),
            DumpId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("id {:?} is not an integer", s)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DumpEndpoint {
    id: DumpId,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum DumpRecord {
    Node {
        id: DumpId,
        #[serde(default)]
        labels: Vec<String>,
        #[serde(default)]
        properties: Map<String, Value>,
    },
    Relationship {
        id: DumpId,
        label: String,
        #[serde(default)]
        properties: Map<String, Value>,
        start: DumpEndpoint,
        end: DumpEndpoint,
    },
    Constraint {
        kind: ConstraintKind,
        #[serde(default)]
        label: Option<String>,
        #[serde(default, rename = "relationshipType")]
        relationship_type: Option<String>,
        properties: Vec<String>,
    },
    Index {
        label: String,
        properties: Vec<String>,
        #[serde(default, rename = "constraintIndex")]
        constraint_index: bool,
    },
}

/// A record that was present in the dump but could not be decoded.
#[derive(Debug, Clone)]
enum Entry<T> {
    Ok(T),
    Broken { line: usize, reason: String },
}

impl<T: Clone> Entry<T> {
    fn to_result(&self) -> Result<T, SourceError> {
        match self {
            Entry::Ok(item) => Ok(item.clone()),
            Entry::Broken { line, reason } => Err(SourceError::MalformedRecord {
                line: *line,
                reason: reason.clone(),
            }),
        }
    }
}

/// Source graph loaded from a JSON-lines dump. The file is read once at open;
/// iteration follows file order.
pub struct DumpSourceGraph {
    nodes: Vec<Entry<SourceNode>>,
    relationships: Vec<Entry<SourceRelationship>>,
    constraints: Vec<SourceConstraint>,
    indexes: Vec<SourceIndex>,
    skipped_lines: usize,
    closed: AtomicBool,
}

impl DumpSourceGraph {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| SourceError::Open {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let graph = Self::from_reader(BufReader::new(file)).map_err(|err| match err {
            SourceError::Open { reason, .. } => SourceError::Open {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })?;
        debug!(
            "Loaded dump {}: {} nodes, {} relationships, {} constraints, {} indexes",
            path.display(),
            graph.nodes.len(),
            graph.relationships.len(),
            graph.constraints.len(),
            graph.indexes.len()
        );
        Ok(graph)
    }

    pub fn from_reader(reader: impl BufRead) -> Result<Self, SourceError> {
        let mut graph = Self {
            nodes: Vec::new(),
            relationships: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
            skipped_lines: 0,
            closed: AtomicBool::new(false),
        };

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|err| SourceError::Open {
                path: String::new(),
                reason: format!("read failed at line {}: {}", line_no, err),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            graph.ingest_line(line_no, &line);
        }

        Ok(graph)
    }

    /// Lines that were neither a readable record nor attributable to one.
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    fn ingest_line(&mut self, line_no: usize, line: &str) {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                warn!("Skipping unparseable dump line {}: {}", line_no, err);
                self.skipped_lines += 1;
                return;
            }
        };
        let record_type = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let decoded = serde_json::from_value::<DumpRecord>(value)
            .map_err(|err| err.to_string())
            .and_then(decode_record);

        match decoded {
            Ok(Decoded::Node(node)) => self.nodes.push(Entry::Ok(node)),
            Ok(Decoded::Relationship(rel)) => self.relationships.push(Entry::Ok(rel)),
            Ok(Decoded::Constraint(constraint)) => self.constraints.push(constraint),
            Ok(Decoded::Index(index)) => self.indexes.push(index),
            Err(reason) => match record_type.as_str() {
                "node" => self.nodes.push(Entry::Broken {
                    line: line_no,
                    reason,
                }),
                "relationship" => self.relationships.push(Entry::Broken {
                    line: line_no,
                    reason,
                }),
                _ => {
                    warn!("Skipping dump line {} of type {:?}", line_no, record_type);
                    self.skipped_lines += 1;
                }
            },
        }
    }

    fn ensure_open(&self) -> Result<(), SourceError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SourceError::Closed);
        }
        Ok(())
    }
}

enum Decoded {
    Node(SourceNode),
    Relationship(SourceRelationship),
    Constraint(SourceConstraint),
    Index(SourceIndex),
}

fn decode_record(record: DumpRecord) -> Result<Decoded, String> {
    match record {
        DumpRecord::Node {
            id,
            labels,
            properties,
        } => Ok(Decoded::Node(SourceNode {
            id: id.resolve()?,
            labels,
            properties: decode_properties(properties),
        })),
        DumpRecord::Relationship {
            id,
            label,
            properties,
            start,
            end,
        } => Ok(Decoded::Relationship(SourceRelationship {
            id: id.resolve()?,
            rel_type: label,
            start: start.id.resolve()?,
            end: end.id.resolve()?,
            properties: decode_properties(properties),
        })),
        DumpRecord::Constraint {
            kind,
            label,
            relationship_type,
            properties,
        } => {
            let scope = match (label, relationship_type) {
                (Some(label), None) => SchemaScope::Label(label),
                (None, Some(rel_type)) => SchemaScope::RelationshipType(rel_type),
                _ => {
                    return Err(
                        "constraint needs exactly one of label or relationshipType".to_string()
                    )
                }
            };
            Ok(Decoded::Constraint(SourceConstraint {
                kind,
                scope,
                property_keys: properties,
            }))
        }
        DumpRecord::Index {
            label,
            properties,
            constraint_index,
        } => Ok(Decoded::Index(SourceIndex {
            label,
            property_keys: properties,
            constraint_index,
        })),
    }
}

fn decode_properties(properties: Map<String, Value>) -> SourceProperties {
    properties
        .into_iter()
        .filter_map(|(key, value)| decode_value(&value).map(|v| (key, v)))
        .collect()
}

/// JSON integers become `Long`, other numbers `Double`; nulls are dropped.
fn decode_value(value: &Value) -> Option<SourceValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(SourceValue::Boolean(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(SourceValue::Long(i)),
            None => n.as_f64().map(SourceValue::Double),
        },
        Value::String(s) => Some(SourceValue::String(s.clone())),
        Value::Array(items) => Some(SourceValue::List(
            items.iter().filter_map(decode_value).collect(),
        )),
        // Spatial and temporal values arrive as objects; keep their JSON text.
        Value::Object(_) => Some(SourceValue::String(value.to_string())),
    }
}

impl SourceGraphReader for DumpSourceGraph {
    fn nodes(&self) -> Result<NodeIter<'_>, SourceError> {
        self.ensure_open()?;
        Ok(Box::new(self.nodes.iter().map(Entry::to_result)))
    }

    fn relationships(&self) -> Result<RelationshipIter<'_>, SourceError> {
        self.ensure_open()?;
        Ok(Box::new(self.relationships.iter().map(Entry::to_result)))
    }

    fn constraints(&self) -> Result<Vec<SourceConstraint>, SourceError> {
        self.ensure_open()?;
        Ok(self.constraints.clone())
    }

    fn indexes(&self) -> Result<Vec<SourceIndex>, SourceError> {
        self.ensure_open()?;
        Ok(self.indexes.clone())
    }

    fn close(&self) -> Result<(), SourceError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
