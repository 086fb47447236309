//! Trefle adapter.
//!
//! Trefle returns one fixed object per species with named sub-objects
//! (`flower`, `growth`, ...). Those sub-objects are sometimes only present
//! one level deeper under `main_species`, which is used as the fallback.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use flora_core::{Provider, Result, SourceAdapter, SparseRecord};

use crate::client::ProviderClient;
use crate::config::TrefleConfig;
use crate::mapping::{first_present, nested, RecordBuilder};

/// Root fields copied as-is.
const IDENTITY_FIELDS: &[&str] = &[
    "id",
    "common_name",
    "slug",
    "scientific_name",
    "year",
    "bibliography",
    "author",
    "status",
    "rank",
    "family_common_name",
    "observations",
];

const DISTRIBUTION_ZONES: &[&str] = &["native", "introduced", "doubtful", "absent", "extinct"];

const IMAGE_GROUPS: &[&str] = &["flower", "leaf", "habit", "fruit", "bark", "other"];

const SPECIFICATION_TEXT: &[&str] = &[
    "ligneous_type",
    "growth_form",
    "growth_habit",
    "growth_rate",
    "nitrogen_fixation",
    "shape_and_orientation",
    "toxicity",
];

/// Growth members whose canonical name matches the source name.
const GROWTH_SCALARS: &[&str] = &[
    "days_to_harvest",
    "ph_maximum",
    "ph_minimum",
    "light",
    "atmospheric_humidity",
    "growth_months",
    "bloom_months",
    "fruit_months",
    "soil_nutriments",
    "soil_salinity",
    "soil_texture",
    "soil_humidity",
];

/// Growth measurements as (field, unit key).
const GROWTH_UNITS: &[(&str, &str)] = &[
    ("row_spacing", "cm"),
    ("spread", "cm"),
    ("minimum_root_depth", "cm"),
    ("minimum_precipitation", "mm"),
    ("maximum_precipitation", "mm"),
    ("minimum_temperature", "deg_c"),
    ("maximum_temperature", "deg_c"),
];

/// Trefle slug for a scientific name: lowercase, whitespace runs to `-`.
pub fn slug_for(scientific_name: &str) -> String {
    scientific_name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Sub-object `name` from the record root, else from `main_species`.
fn section<'a>(species: &'a Value, name: &str) -> Option<&'a Value> {
    first_present(species, &[name]).or_else(|| nested(species, &["main_species", name]))
}

/// Map one Trefle species object into the canonical schema.
pub fn map_species(species: &Value) -> Result<SparseRecord> {
    let mut record = RecordBuilder::new();

    for field in IDENTITY_FIELDS {
        record.value(field, species.get(field))?;
    }
    record
        .value(
            "family",
            nested(species, &["family", "name"])
                .or_else(|| species.get("family").filter(|v| v.is_string())),
        )?
        .value(
            "genus_id",
            nested(species, &["genus", "id"]).or_else(|| species.get("genus_id")),
        )?
        .value(
            "genus",
            nested(species, &["genus", "name"])
                .or_else(|| species.get("genus").filter(|v| v.is_string())),
        )?
        .value("image_path", species.get("image_url"))?
        .value("duration", species.get("duration"))?
        .value(
            "edible_part",
            first_present(species, &["edible_parts", "parts_used_as_edible"]),
        )?
        .value("edible", species.get("edible"))?
        .value("vegetable", species.get("vegetable"))?
        .value("common_names", species.get("common_names"))?
        .value("synonyms", species.get("synonyms"))?
        .value("sources", species.get("sources"))?;

    if let Some(distributions) = species.get("distributions").filter(|v| v.is_object()) {
        let mut combined = Map::new();
        for zone in ["native", "introduced"] {
            if let Some(list) = first_present(distributions, &[zone]) {
                combined.insert(zone.to_string(), list.clone());
            }
        }
        if !combined.is_empty() {
            record.value("distribution", Some(&Value::Object(combined)))?;
        }
        for zone in DISTRIBUTION_ZONES {
            record.value(
                &format!("distributions_{}", zone),
                first_present(distributions, &[zone]),
            )?;
        }
    }

    if let Some(images) = section(species, "images") {
        for group in IMAGE_GROUPS {
            record.value(&format!("{}_images", group), images.get(group))?;
        }
    }

    if let Some(flower) = section(species, "flower") {
        record
            .value("flower_color", flower.get("color"))?
            .value("flower_conspicuous", flower.get("conspicuous"))?;
    }

    if let Some(foliage) = section(species, "foliage") {
        record
            .value("foliage_texture", foliage.get("texture"))?
            .value("foliage_color", foliage.get("color"))?
            .value("foliage_leaf_retention", foliage.get("leaf_retention"))?;
    }

    if let Some(fruit) = section(species, "fruit_or_seed") {
        record
            .value("fruit_conspicuous", fruit.get("conspicuous"))?
            .value("fruit_color", fruit.get("color"))?
            .value("fruit_shape", fruit.get("shape"))?
            .value("fruit_seed_persistence", fruit.get("seed_persistence"))?;
    }

    if let Some(spec) = section(species, "specifications") {
        for field in SPECIFICATION_TEXT {
            record.value(field, spec.get(field))?;
        }
        record
            .unit("average_height", spec.get("average_height"), "cm")?
            .unit("maximum_height", spec.get("maximum_height"), "cm")?;
    }

    if let Some(growth) = section(species, "growth") {
        record
            .value("growth_description", growth.get("description"))?
            .value("growth_sowing", growth.get("sowing"))?;
        for field in GROWTH_SCALARS {
            record.value(field, growth.get(field))?;
        }
        for (field, unit) in GROWTH_UNITS {
            record.unit(field, growth.get(field), unit)?;
        }
    }

    Ok(record.build())
}

/// Source adapter for the Trefle species API.
#[derive(Clone)]
pub struct TrefleAdapter {
    client: ProviderClient,
    token: String,
}

impl TrefleAdapter {
    pub fn new(config: TrefleConfig) -> Result<Self> {
        let client = ProviderClient::new(Provider::Trefle, &config.base_url, config.timeout)?;
        Ok(Self {
            client,
            token: config.token,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(TrefleConfig::from_env()?)
    }

    /// Fetch the raw species object for `slug`; `None` when Trefle has none.
    pub async fn fetch_species(&self, slug: &str) -> Result<Option<Value>> {
        let path = format!("/api/v1/species/{}", slug);
        let request = self.client.get(&path).query(&[("token", self.token.as_str())]);
        let body = self.client.send_json(request, &path).await?;

        Ok(body
            .and_then(|mut body| body.get_mut("data").map(Value::take))
            .filter(|data| match data {
                Value::Null => false,
                Value::Object(map) => !map.is_empty(),
                Value::Array(items) => !items.is_empty(),
                _ => true,
            }))
    }
}

#[async_trait]
impl SourceAdapter for TrefleAdapter {
    fn provider(&self) -> Provider {
        Provider::Trefle
    }

    async fn fetch_and_map(&self, query_key: &str) -> Result<Option<SparseRecord>> {
        let start = Instant::now();
        let slug = slug_for(query_key);
        debug!(
            subsystem = "providers",
            component = "trefle",
            op = "resolve",
            query = query_key,
            slug = %slug,
            "Resolved slug"
        );

        let Some(species) = self.fetch_species(&slug).await? else {
            warn!(
                subsystem = "providers",
                component = "trefle",
                op = "fetch_detail",
                query = query_key,
                slug = %slug,
                "No species data returned"
            );
            return Ok(None);
        };

        let record = map_species(&species)?;
        info!(
            subsystem = "providers",
            component = "trefle",
            op = "map",
            query = query_key,
            species_id = record.id(),
            field_count = record.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Mapped species"
        );
        Ok(Some(record))
    }
}
