// src/origin/entity.rs
//! Entity records as delivered by the data source and as served to callers

use crate::error::{MetaError, Result};
use crate::geometry::Geometry;
use serde::Serialize;
use serde_json::{Map, Value};

/// Entity as it arrives from the data source: an id, a WKT geometry and
/// whatever other fields the source attaches.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntity {
    pub id: String,
    pub geometry: String,
    pub fields: Map<String, Value>,
}

impl RawEntity {
    pub fn new(id: impl Into<String>, geometry: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            geometry: geometry.into(),
            fields: Map::new(),
        }
    }

    /// Attach a metadata field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Build from one element of a source response.
    ///
    /// The object must carry an `id` (string or number) and a string
    /// `geometry`; every other member becomes a metadata field.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(MetaError::MalformedEntity {
                id: "?".to_string(),
                reason: "entity is not a JSON object".to_string(),
            });
        };

        let id = match fields.remove("id") {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(MetaError::MalformedEntity {
                    id: "?".to_string(),
                    reason: "missing or empty id".to_string(),
                })
            }
        };

        let geometry = match fields.remove("geometry") {
            Some(Value::String(s)) => s,
            _ => {
                return Err(MetaError::MalformedEntity {
                    id,
                    reason: "missing WKT geometry".to_string(),
                })
            }
        };

        Ok(Self { id, geometry, fields })
    }
}

/// Metadata kept once per entity id, shared by every tile the entity
/// appears in. Geometry lives with the tile, not here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// An entity as returned for one tile: that tile's geometry merged with the
/// shared metadata record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEntity {
    pub id: String,
    pub geometry: Geometry,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ResolvedEntity {
    /// Look up a metadata field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value() {
        let entity = RawEntity::from_value(json!({
            "id": "141265769338187_1",
            "geometry": "POINT(82.9 55.0)",
            "name": "Cafe",
            "rating": 4.5
        }))
        .unwrap();

        assert_eq!(entity.id, "141265769338187_1");
        assert_eq!(entity.geometry, "POINT(82.9 55.0)");
        assert_eq!(entity.fields.len(), 2);
        assert!(!entity.fields.contains_key("id"));
        assert!(!entity.fields.contains_key("geometry"));
    }

    #[test]
    fn test_numeric_id() {
        let entity = RawEntity::from_value(json!({"id": 42, "geometry": "POINT(0 0)"})).unwrap();
        assert_eq!(entity.id, "42");
    }

    #[test]
    fn test_malformed_values() {
        assert!(RawEntity::from_value(json!("POINT(0 0)")).is_err());
        assert!(RawEntity::from_value(json!({"geometry": "POINT(0 0)"})).is_err());
        assert!(RawEntity::from_value(json!({"id": "", "geometry": "POINT(0 0)"})).is_err());

        let err = RawEntity::from_value(json!({"id": "7"})).unwrap_err();
        assert!(matches!(err, MetaError::MalformedEntity { ref id, .. } if id == "7"));
    }

    #[test]
    fn test_resolved_serializes_flat() {
        let resolved = ResolvedEntity {
            id: "1".to_string(),
            geometry: crate::geometry::wkt::parse("POINT(1 1)").unwrap(),
            fields: RawEntity::new("1", "").with_field("name", "A").fields,
        };
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json["id"], "1");
        assert_eq!(json["name"], "A");
        assert_eq!(json["geometry"]["type"], "Point");
    }
}
