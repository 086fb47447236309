//! Permapeople adapter.
//!
//! Resolution is a name search followed by a detail fetch by id. Most
//! attributes arrive as a flat `data` list of `{key, value}` pairs, folded
//! into a string lookup table before any field is read.

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use flora_core::{Provider, Result, SourceAdapter, SparseRecord};

use crate::client::ProviderClient;
use crate::config::PermapeopleConfig;
use crate::mapping::{first_present_in, RecordBuilder};

pub const KEY_ID_HEADER: &str = "x-permapeople-key-id";
pub const KEY_SECRET_HEADER: &str = "x-permapeople-key-secret";

const SEARCH_PATH: &str = "/api/search";

/// Lookup-table keys per canonical field, tried in order.
const TABLE_FIELDS: &[(&str, &[&str])] = &[
    ("family", &["Family"]),
    ("genus", &["Genus"]),
    ("duration", &["Duration"]),
    ("edible_part", &["Edible parts"]),
    ("edible", &["Edible"]),
    ("vegetable", &["Vegetable"]),
    ("flower_color", &["Flower color"]),
    ("foliage_texture", &["Foliage texture"]),
    ("foliage_color", &["Foliage color"]),
    ("ligneous_type", &["Ligneous type", "Type", "Layer"]),
    ("growth_form", &["Growth form"]),
    ("growth_habit", &["Growth habit", "Habit"]),
    ("growth_rate", &["Growth", "Growth rate"]),
    ("nitrogen_fixation", &["Nitrogen fixer", "Nitrogen fixation"]),
    ("toxicity", &["Toxicity"]),
    ("ph_maximum", &["pH max"]),
    ("ph_minimum", &["pH min"]),
    ("light", &["Light requirement", "Sun"]),
    ("growth_months", &["Growth months"]),
    ("bloom_months", &["Bloom months"]),
    ("fruit_months", &["Fruit months"]),
    ("soil_nutriments", &["Soil NPK"]),
    ("soil_salinity", &["Salinity tolerance"]),
    ("soil_texture", &["Soil type", "Soil texture"]),
    ("soil_humidity", &["Water requirement", "Soil moisture"]),
];

/// Fold `[{key, value}, ...]` into a lookup table. Later keys overwrite
/// earlier ones; pairs missing either side are ignored.
pub fn fold_data(data: Option<&Value>) -> BTreeMap<String, String> {
    let mut table = BTreeMap::new();
    let Some(pairs) = data.and_then(Value::as_array) else {
        return table;
    };
    for pair in pairs {
        let key = pair.get("key").and_then(Value::as_str);
        let value = pair.get("value").filter(|v| !v.is_null());
        if let (Some(key), Some(value)) = (key, value) {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            table.insert(key.to_string(), text);
        }
    }
    table
}

/// Prefer the candidate whose `scientific_name` equals `query`, else the first.
pub fn select_candidate<'a>(plants: &'a [Value], query: &str) -> Option<&'a Value> {
    plants
        .iter()
        .find(|plant| plant.get("scientific_name").and_then(Value::as_str) == Some(query))
        .or_else(|| plants.first())
}

/// Provider id of a search candidate; numeric or numeric text.
fn candidate_id(plant: &Value) -> Option<i64> {
    match plant.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Map one Permapeople plant object into the canonical schema.
pub fn map_plant(plant: &Value) -> Result<SparseRecord> {
    let table = fold_data(plant.get("data"));
    let mut record = RecordBuilder::new();

    record
        .value("id", plant.get("id"))?
        .value("common_name", plant.get("name"))?
        .value("slug", plant.get("slug"))?
        .value("scientific_name", plant.get("scientific_name"))?
        .value("observations", plant.get("description"))?;

    for (field, keys) in TABLE_FIELDS {
        let value = first_present_in(&table, keys);
        if value.is_none() && keys.len() > 1 {
            debug!(
                subsystem = "providers",
                component = "permapeople",
                field = *field,
                candidates = ?keys,
                "No alias present"
            );
        }
        record.text(field, value)?;
    }

    match first_present_in(&table, &["Growth notes"]) {
        Some(notes) => record.text("growth_description", Some(notes))?,
        None => record.value("growth_description", plant.get("description"))?,
    };

    let height = first_present_in(&table, &["Height range", "Height"]).map(|s| json!(s));
    record.unit("average_height", height.as_ref(), "m")?;

    Ok(record.build())
}

/// Source adapter for the Permapeople plant API.
#[derive(Clone)]
pub struct PermapeopleAdapter {
    client: ProviderClient,
    key_id: String,
    key_secret: String,
}

impl PermapeopleAdapter {
    pub fn new(config: PermapeopleConfig) -> Result<Self> {
        let client =
            ProviderClient::new(Provider::Permapeople, &config.base_url, config.timeout)?;
        Ok(Self {
            client,
            key_id: config.key_id,
            key_secret: config.key_secret,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(PermapeopleConfig::from_env()?)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(KEY_ID_HEADER, &self.key_id)
            .header(KEY_SECRET_HEADER, &self.key_secret)
    }

    /// Search by name and pick a plant id.
    pub async fn resolve_id(&self, query: &str) -> Result<Option<i64>> {
        let request = self
            .authorize(self.client.post(SEARCH_PATH))
            .json(&json!({ "q": query }));
        let body = self.client.send_json(request, SEARCH_PATH).await?;

        let plants = body
            .as_ref()
            .and_then(|b| b.get("plants"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let Some(candidate) = select_candidate(plants, query) else {
            return Ok(None);
        };

        let chosen = candidate.get("scientific_name").and_then(Value::as_str);
        let exact = chosen == Some(query);
        debug!(
            subsystem = "providers",
            component = "permapeople",
            op = "resolve",
            query = query,
            candidates = plants.len(),
            exact_match = exact,
            chosen = chosen,
            "Selected search candidate"
        );
        Ok(candidate_id(candidate))
    }

    /// Fetch the full plant object for `id`.
    pub async fn fetch_plant(&self, id: i64) -> Result<Option<Value>> {
        let path = format!("/api/plants/{}", id);
        let request = self.authorize(self.client.get(&path));
        let body = self.client.send_json(request, &path).await?;
        Ok(body.filter(|b| b.as_object().map_or(true, |m| !m.is_empty())))
    }
}

#[async_trait]
impl SourceAdapter for PermapeopleAdapter {
    fn provider(&self) -> Provider {
        Provider::Permapeople
    }

    async fn fetch_and_map(&self, query_key: &str) -> Result<Option<SparseRecord>> {
        let start = Instant::now();

        let Some(id) = self.resolve_id(query_key).await? else {
            warn!(
                subsystem = "providers",
                component = "permapeople",
                op = "resolve",
                query = query_key,
                "No search candidate with an id"
            );
            return Ok(None);
        };

        let Some(plant) = self.fetch_plant(id).await? else {
            warn!(
                subsystem = "providers",
                component = "permapeople",
                op = "fetch_detail",
                query = query_key,
                species_id = id,
                "Empty plant detail"
            );
            return Ok(None);
        };

        let record = map_plant(&plant)?;
        info!(
            subsystem = "providers",
            component = "permapeople",
            op = "map",
            query = query_key,
            species_id = record.id(),
            field_count = record.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Mapped plant"
        );
        Ok(Some(record))
    }
}
