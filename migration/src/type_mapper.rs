use graphport_core::model::{DestType, SourceKind};

/// Destination property type for a source value kind.
pub fn map_type(kind: SourceKind) -> DestType {
    match kind {
        SourceKind::String => DestType::String,
        SourceKind::Integer => DestType::Integer,
        SourceKind::Long => DestType::Long,
        SourceKind::Boolean => DestType::Boolean,
        SourceKind::Byte => DestType::Byte,
        SourceKind::Float => DestType::Float,
        SourceKind::Double => DestType::Double,
        // no single-character type on the destination
        SourceKind::Character => DestType::String,
        SourceKind::Short => DestType::Short,
        SourceKind::List => DestType::EmbeddedList,
    }
}

/// Like [`map_type`], with unsampled input falling back to `String`.
pub fn map_sampled(kind: Option<SourceKind>) -> DestType {
    kind.map(map_type).unwrap_or(DestType::String)
}
