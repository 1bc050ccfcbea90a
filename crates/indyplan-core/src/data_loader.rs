//! Data-driven catalog and snapshot loading from JSON.
//!
//! Feature-gated behind `data-loader`. Provides JSON deserialization into
//! [`CatalogBuilder`], [`PriceSnapshot`] and [`InventorySnapshot`] for
//! static data exported from upstream dumps.

use crate::catalog::{
    Activity, BlueprintDef, CatalogBuilder, CatalogError, DecryptorDef, InventionData,
    MaterialRequirement, ProductOutput, ProductionData, RigEffectDef, RigMetric,
};
use crate::id::TypeId;
use crate::inventory::{Holding, InventoryLot, InventorySnapshot};
use crate::market::{PriceQuote, PriceSnapshot};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("unknown activity {0:?}")]
    UnknownActivity(String),
    #[error("unknown rig metric {0:?}")]
    UnknownMetric(String),
}

// ---------------------------------------------------------------------------
// JSON data structures
// ---------------------------------------------------------------------------

/// Top-level catalog document.
#[derive(Debug, serde::Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub types: Vec<TypeData>,
    #[serde(default)]
    pub blueprints: Vec<BlueprintData>,
    #[serde(default)]
    pub rigs: Vec<RigData>,
    #[serde(default)]
    pub decryptors: Vec<DecryptorData>,
}

#[derive(Debug, serde::Deserialize)]
pub struct TypeData {
    pub type_id: u32,
    pub name: String,
    #[serde(default)]
    pub rig_group: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct BlueprintData {
    pub type_id: u32,
    pub name: String,
    #[serde(default = "default_production_limit")]
    pub max_production_limit: i64,
    #[serde(default)]
    pub manufacturing: Option<ProductionActivityData>,
    #[serde(default)]
    pub invention: Option<InventionActivityData>,
    #[serde(default)]
    pub copying_time_seconds: Option<f64>,
    #[serde(default)]
    pub reaction: Option<ProductionActivityData>,
}

fn default_production_limit() -> i64 {
    1
}

#[derive(Debug, serde::Deserialize)]
pub struct ProductionActivityData {
    #[serde(default)]
    pub materials: Vec<QuantityData>,
    #[serde(default)]
    pub products: Vec<QuantityData>,
    #[serde(default)]
    pub time_seconds: f64,
}

#[derive(Debug, serde::Deserialize)]
pub struct InventionActivityData {
    pub base_probability: f64,
    #[serde(default)]
    pub materials: Vec<QuantityData>,
    pub output_blueprint: u32,
    #[serde(default = "default_output_runs")]
    pub output_runs: i64,
    #[serde(default)]
    pub encryption_skill: Option<u32>,
    #[serde(default)]
    pub science_skills: Vec<u32>,
    #[serde(default)]
    pub time_seconds: f64,
}

fn default_output_runs() -> i64 {
    1
}

#[derive(Debug, serde::Deserialize)]
pub struct QuantityData {
    pub type_id: u32,
    pub quantity: i64,
}

#[derive(Debug, serde::Deserialize)]
pub struct RigData {
    pub type_id: u32,
    #[serde(default)]
    pub effects: Vec<RigEffectData>,
}

#[derive(Debug, serde::Deserialize)]
pub struct RigEffectData {
    pub activity: String, // "manufacturing", "invention", "copying", "reaction"
    pub group: String,
    pub metric: String, // "material", "time", "cost"
    pub reduction: f64,
}

#[derive(Debug, serde::Deserialize)]
pub struct DecryptorData {
    pub type_id: u32,
    pub name: String,
    #[serde(default = "default_multiplier")]
    pub probability_multiplier: f64,
    #[serde(default)]
    pub me_modifier: i32,
    #[serde(default)]
    pub te_modifier: i32,
    #[serde(default)]
    pub run_modifier: i32,
}

fn default_multiplier() -> f64 {
    1.0
}

/// One price entry of a price document.
#[derive(Debug, serde::Deserialize)]
pub struct PriceData {
    pub type_id: u32,
    #[serde(default)]
    pub average: Option<f64>,
    #[serde(default)]
    pub adjusted: Option<f64>,
}

/// One holding of an inventory document.
#[derive(Debug, serde::Deserialize)]
pub struct HoldingData {
    pub type_id: u32,
    pub on_hand: i64,
    #[serde(default)]
    pub lots: Vec<LotData>,
}

#[derive(Debug, serde::Deserialize)]
pub struct LotData {
    pub quantity: i64,
    pub unit_cost: f64,
    #[serde(default)]
    pub acquired_at: Option<u64>,
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load a catalog builder from a JSON string.
pub fn load_catalog_json(json: &str) -> Result<CatalogBuilder, DataLoadError> {
    let data: CatalogData = serde_json::from_str(json)?;
    build_catalog(data)
}

/// Load a price snapshot from a JSON array.
pub fn load_prices_json(json: &str) -> Result<PriceSnapshot, DataLoadError> {
    let data: Vec<PriceData> = serde_json::from_str(json)?;
    Ok(data
        .into_iter()
        .map(|p| (TypeId(p.type_id), PriceQuote::new(p.average, p.adjusted)))
        .collect())
}

/// Load an inventory snapshot from a JSON array.
pub fn load_inventory_json(json: &str) -> Result<InventorySnapshot, DataLoadError> {
    let data: Vec<HoldingData> = serde_json::from_str(json)?;
    let mut snapshot = InventorySnapshot::new();
    for holding in data {
        let lots = holding
            .lots
            .into_iter()
            .map(|lot| InventoryLot {
                quantity: lot.quantity,
                unit_cost: lot.unit_cost,
                acquired_at: lot.acquired_at,
            })
            .collect();
        snapshot.insert(TypeId(holding.type_id), Holding::new(holding.on_hand, lots));
    }
    Ok(snapshot)
}

fn parse_activity(name: &str) -> Result<Activity, DataLoadError> {
    match name {
        "manufacturing" => Ok(Activity::Manufacturing),
        "invention" => Ok(Activity::Invention),
        "copying" => Ok(Activity::Copying),
        "reaction" => Ok(Activity::Reaction),
        other => Err(DataLoadError::UnknownActivity(other.to_string())),
    }
}

fn parse_metric(name: &str) -> Result<RigMetric, DataLoadError> {
    match name {
        "material" => Ok(RigMetric::Material),
        "time" => Ok(RigMetric::Time),
        "cost" => Ok(RigMetric::Cost),
        other => Err(DataLoadError::UnknownMetric(other.to_string())),
    }
}

fn parse_production(data: ProductionActivityData) -> ProductionData {
    ProductionData {
        materials: data
            .materials
            .into_iter()
            .map(|m| MaterialRequirement {
                type_id: TypeId(m.type_id),
                quantity: m.quantity,
            })
            .collect(),
        products: data
            .products
            .into_iter()
            .map(|p| ProductOutput {
                type_id: TypeId(p.type_id),
                quantity_per_run: p.quantity,
            })
            .collect(),
        time_seconds: data.time_seconds,
    }
}

fn build_catalog(data: CatalogData) -> Result<CatalogBuilder, DataLoadError> {
    let mut builder = CatalogBuilder::new();
    for t in data.types {
        builder.register_type(TypeId(t.type_id), &t.name)?;
        if let Some(group) = t.rig_group {
            builder.set_rig_group(TypeId(t.type_id), &group);
        }
    }
    for bp in data.blueprints {
        let def = BlueprintDef {
            name: bp.name,
            max_production_limit: bp.max_production_limit,
            manufacturing: bp.manufacturing.map(parse_production),
            invention: bp.invention.map(|inv| InventionData {
                base_probability: inv.base_probability,
                materials: inv
                    .materials
                    .into_iter()
                    .map(|m| MaterialRequirement {
                        type_id: TypeId(m.type_id),
                        quantity: m.quantity,
                    })
                    .collect(),
                output_blueprint: TypeId(inv.output_blueprint),
                output_runs: inv.output_runs,
                encryption_skill: inv.encryption_skill.map(TypeId),
                science_skills: inv.science_skills.into_iter().map(TypeId).collect(),
                time_seconds: inv.time_seconds,
            }),
            copying_time_seconds: bp.copying_time_seconds,
            reaction: bp.reaction.map(parse_production),
        };
        builder.register_blueprint(TypeId(bp.type_id), def)?;
    }
    for rig in data.rigs {
        let effects = rig
            .effects
            .into_iter()
            .map(|e| {
                Ok(RigEffectDef {
                    activity: parse_activity(&e.activity)?,
                    group: e.group,
                    metric: parse_metric(&e.metric)?,
                    reduction: e.reduction,
                })
            })
            .collect::<Result<Vec<_>, DataLoadError>>()?;
        builder.register_rig(TypeId(rig.type_id), effects);
    }
    for d in data.decryptors {
        builder.register_decryptor(DecryptorDef {
            type_id: TypeId(d.type_id),
            name: d.name,
            probability_multiplier: d.probability_multiplier,
            me_modifier: d.me_modifier,
            te_modifier: d.te_modifier,
            run_modifier: d.run_modifier,
        });
    }
    Ok(builder)
}
