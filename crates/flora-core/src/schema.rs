//! Canonical species schema registry.
//!
//! The registry is the closed, ordered set of output fields every provider
//! adapter maps into and the persister inserts. Order matters: it is the
//! column order used when assembling insert statements.

use serde::{Deserialize, Serialize};

/// Structural kind of a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Whole number.
    Int,
    /// Floating-point number.
    Float,
    /// Flag stored as 0/1.
    Boolean,
    /// JSON array serialized to text.
    JsonArray,
    /// JSON object serialized to text.
    JsonObject,
}

impl FieldKind {
    /// Whether values of this kind are JSON payloads carried as text.
    pub fn is_json(self) -> bool {
        matches!(self, Self::JsonArray | Self::JsonObject)
    }

    /// Storage class used when binding values of this kind.
    pub fn storage(self) -> StorageType {
        match self {
            Self::Int | Self::Boolean => StorageType::Integer,
            Self::Float => StorageType::Float,
            Self::Text | Self::JsonArray | Self::JsonObject => StorageType::Text,
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
            Self::JsonArray => write!(f, "json_array"),
            Self::JsonObject => write!(f, "json_object"),
        }
    }
}

/// Bind-parameter class for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    Integer,
    Float,
    Text,
}

/// A named, typed slot in the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalField {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> CanonicalField {
    CanonicalField { name, kind }
}

use FieldKind::{Boolean, Float, Int, JsonArray, JsonObject, Text};

static FIELDS: [CanonicalField; 73] = [
    // identity
    field("id", Int),
    field("common_name", Text),
    field("slug", Text),
    field("scientific_name", Text),
    field("year", Int),
    field("bibliography", Text),
    field("author", Text),
    field("status", Text),
    field("rank", Text),
    // taxonomy
    field("family_common_name", Text),
    field("family", Text),
    field("genus_id", Int),
    field("genus", Text),
    field("image_path", Text),
    field("duration", JsonArray),
    field("edible_part", JsonArray),
    field("edible", Boolean),
    field("vegetable", Boolean),
    field("observations", Text),
    field("common_names", JsonObject),
    field("distribution", JsonObject),
    field("synonyms", JsonArray),
    field("sources", JsonArray),
    // media
    field("flower_images", JsonArray),
    field("leaf_images", JsonArray),
    field("habit_images", JsonArray),
    field("fruit_images", JsonArray),
    field("bark_images", JsonArray),
    field("other_images", JsonArray),
    // distribution
    field("distributions_native", JsonArray),
    field("distributions_introduced", JsonArray),
    field("distributions_doubtful", JsonArray),
    field("distributions_absent", JsonArray),
    field("distributions_extinct", JsonArray),
    // morphology
    field("flower_color", JsonArray),
    field("flower_conspicuous", Boolean),
    field("foliage_texture", Text),
    field("foliage_color", JsonArray),
    field("foliage_leaf_retention", Boolean),
    field("fruit_conspicuous", Boolean),
    field("fruit_color", JsonArray),
    field("fruit_shape", Text),
    field("fruit_seed_persistence", Boolean),
    field("ligneous_type", Text),
    field("growth_form", Text),
    field("growth_habit", Text),
    field("growth_rate", Text),
    field("average_height", JsonObject),
    field("maximum_height", JsonObject),
    field("nitrogen_fixation", Text),
    field("shape_and_orientation", Text),
    field("toxicity", Text),
    // growth and environmental tolerance
    field("days_to_harvest", Int),
    field("growth_description", Text),
    field("growth_sowing", Text),
    field("ph_maximum", Float),
    field("ph_minimum", Float),
    field("light", Int),
    field("atmospheric_humidity", Int),
    field("growth_months", JsonArray),
    field("bloom_months", JsonArray),
    field("fruit_months", JsonArray),
    field("row_spacing", JsonObject),
    field("spread", JsonObject),
    field("minimum_precipitation", JsonObject),
    field("maximum_precipitation", JsonObject),
    field("minimum_root_depth", JsonObject),
    field("minimum_temperature", JsonObject),
    field("maximum_temperature", JsonObject),
    field("soil_nutriments", Int),
    field("soil_salinity", Int),
    field("soil_texture", Int),
    field("soil_humidity", Int),
];

/// Name of the identity field (provider native id, reused as primary key).
pub const ID_FIELD: &str = "id";

/// All canonical fields in registry order.
pub fn fields() -> &'static [CanonicalField] {
    &FIELDS
}

/// Look up a canonical field by name.
pub fn field_named(name: &str) -> Option<&'static CanonicalField> {
    FIELDS.iter().find(|f| f.name == name)
}

/// Whether `name` is part of the canonical schema.
pub fn is_canonical(name: &str) -> bool {
    field_named(name).is_some()
}

/// Registry position of `name`, used to keep records in column order.
pub fn position(name: &str) -> Option<usize> {
    FIELDS.iter().position(|f| f.name == name)
}

/// Fields whose stored text must be valid JSON.
pub fn json_fields() -> impl Iterator<Item = &'static CanonicalField> {
    FIELDS.iter().filter(|f| f.kind.is_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_names_are_unique() {
        let names: HashSet<_> = fields().iter().map(|f| f.name).collect();
        assert_eq!(names.len(), fields().len());
    }

    #[test]
    fn test_registry_order_starts_with_id_and_ends_with_soil_humidity() {
        assert_eq!(fields().first().map(|f| f.name), Some("id"));
        assert_eq!(fields().last().map(|f| f.name), Some("soil_humidity"));
    }

    #[test]
    fn test_last_updated_is_not_canonical() {
        assert!(!is_canonical("last_updated"));
    }

    #[test]
    fn test_kinds_follow_storage_schema() {
        assert_eq!(field_named("id").unwrap().kind, FieldKind::Int);
        assert_eq!(field_named("edible").unwrap().kind, FieldKind::Boolean);
        assert_eq!(field_named("ph_minimum").unwrap().kind, FieldKind::Float);
        assert_eq!(
            field_named("edible_part").unwrap().kind,
            FieldKind::JsonArray
        );
        assert_eq!(
            field_named("average_height").unwrap().kind,
            FieldKind::JsonObject
        );
        assert_eq!(field_named("toxicity").unwrap().kind, FieldKind::Text);
    }

    #[test]
    fn test_storage_classes() {
        assert_eq!(FieldKind::Boolean.storage(), StorageType::Integer);
        assert_eq!(FieldKind::Int.storage(), StorageType::Integer);
        assert_eq!(FieldKind::Float.storage(), StorageType::Float);
        assert_eq!(FieldKind::JsonObject.storage(), StorageType::Text);
        assert_eq!(FieldKind::Text.storage(), StorageType::Text);
    }

    #[test]
    fn test_position_matches_iteration_order() {
        for (i, f) in fields().iter().enumerate() {
            assert_eq!(position(f.name), Some(i));
        }
        assert_eq!(position("petal_count"), None);
    }

    #[test]
    fn test_json_fields_are_all_json_kinds() {
        let json: Vec<_> = json_fields().collect();
        assert!(json.iter().all(|f| f.kind.is_json()));
        assert!(json.iter().any(|f| f.name == "distribution"));
        assert!(!json.iter().any(|f| f.name == "scientific_name"));
    }
}
