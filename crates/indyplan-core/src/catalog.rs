use crate::id::TypeId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Industrial activity kinds. Closed set: every consumer matches on all
/// four variants, string-keyed dispatch never leaves the data loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    Manufacturing,
    Invention,
    Copying,
    Reaction,
}

/// Which bonus dimension a rig effect reduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RigMetric {
    Material,
    Time,
    Cost,
}

/// One material line of a blueprint activity, at ME 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    pub type_id: TypeId,
    pub quantity: i64,
}

/// One product line of a blueprint activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOutput {
    pub type_id: TypeId,
    pub quantity_per_run: i64,
}

/// Manufacturing or reaction payload of a blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionData {
    pub materials: Vec<MaterialRequirement>,
    pub products: Vec<ProductOutput>,
    pub time_seconds: f64,
}

/// Invention payload of a blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventionData {
    /// Base success probability before skills and decryptors, in [0, 1].
    pub base_probability: f64,
    pub materials: Vec<MaterialRequirement>,
    /// Blueprint type produced on success.
    pub output_blueprint: TypeId,
    /// Licensed runs on the invented copy before run modifiers.
    pub output_runs: i64,
    pub encryption_skill: Option<TypeId>,
    pub science_skills: Vec<TypeId>,
    pub time_seconds: f64,
}

/// A blueprint definition: one entry per activity it supports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintDef {
    pub name: String,
    /// Maximum runs a single copy can carry. Used to amortize copy fees.
    pub max_production_limit: i64,
    pub manufacturing: Option<ProductionData>,
    pub invention: Option<InventionData>,
    /// Per-run copy duration, present when the blueprint can be copied.
    pub copying_time_seconds: Option<f64>,
    pub reaction: Option<ProductionData>,
}

/// A decryptor consumable and its invention modifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecryptorDef {
    pub type_id: TypeId,
    pub name: String,
    pub probability_multiplier: f64,
    pub me_modifier: i32,
    pub te_modifier: i32,
    pub run_modifier: i32,
}

/// One bonus a structure rig grants: applies to jobs of `activity` whose
/// product belongs to `group` ("All" matches every group).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigEffectDef {
    pub activity: Activity,
    pub group: String,
    pub metric: RigMetric,
    /// Reduction fraction in [0, 1].
    pub reduction: f64,
}

/// Rig group label matching every product group.
pub const RIG_GROUP_ALL: &str = "All";

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("duplicate type id {0:?}")]
    DuplicateType(TypeId),
    #[error("duplicate blueprint {0:?}")]
    DuplicateBlueprint(TypeId),
    #[error("blueprint {blueprint:?} has no products for {activity:?}")]
    EmptyProducts { blueprint: TypeId, activity: Activity },
    #[error("blueprint {blueprint:?} has non-positive output quantity for {product:?}")]
    NonPositiveOutput { blueprint: TypeId, product: TypeId },
    #[error("blueprint {blueprint:?} has negative material quantity for {material:?}")]
    NegativeMaterial { blueprint: TypeId, material: TypeId },
    #[error("blueprint {blueprint:?} invention probability {probability} outside [0, 1]")]
    InvalidProbability { blueprint: TypeId, probability: f64 },
    #[error("rig effect on {rig:?} has reduction {reduction} outside [0, 1]")]
    InvalidRigReduction { rig: TypeId, reduction: f64 },
}

/// A resolved "who builds this product" answer from the catalog index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManufacturingSource {
    pub blueprint_type_id: TypeId,
    pub per_run_output: i64,
}

/// Builder for constructing an immutable [`Catalog`].
/// Two-phase lifecycle: registration, then validation at `build()`.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    type_names: HashMap<TypeId, String>,
    blueprints: HashMap<TypeId, BlueprintDef>,
    rig_effects: HashMap<TypeId, Vec<RigEffectDef>>,
    decryptors: Vec<DecryptorDef>,
    rig_groups: HashMap<TypeId, String>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a displayable type. Every plannable target must be known
    /// here; materials discovered mid-tree need not be.
    pub fn register_type(&mut self, type_id: TypeId, name: &str) -> Result<(), CatalogError> {
        if self.type_names.contains_key(&type_id) {
            return Err(CatalogError::DuplicateType(type_id));
        }
        self.type_names.insert(type_id, name.to_string());
        Ok(())
    }

    pub fn register_blueprint(
        &mut self,
        type_id: TypeId,
        def: BlueprintDef,
    ) -> Result<(), CatalogError> {
        if self.blueprints.contains_key(&type_id) {
            return Err(CatalogError::DuplicateBlueprint(type_id));
        }
        self.blueprints.insert(type_id, def);
        Ok(())
    }

    pub fn register_rig(&mut self, rig_type_id: TypeId, effects: Vec<RigEffectDef>) {
        self.rig_effects.entry(rig_type_id).or_default().extend(effects);
    }

    pub fn register_decryptor(&mut self, def: DecryptorDef) {
        self.decryptors.push(def);
    }

    /// Assign a product type to a rig bonus group. Unassigned types fall
    /// into [`RIG_GROUP_ALL`].
    pub fn set_rig_group(&mut self, type_id: TypeId, group: &str) {
        self.rig_groups.insert(type_id, group.to_string());
    }

    /// Validate and freeze into an immutable catalog.
    pub fn build(mut self) -> Result<Catalog, CatalogError> {
        for (&bp_id, def) in &self.blueprints {
            for (activity, data) in [
                (Activity::Manufacturing, def.manufacturing.as_ref()),
                (Activity::Reaction, def.reaction.as_ref()),
            ] {
                let Some(data) = data else { continue };
                if data.products.is_empty() {
                    return Err(CatalogError::EmptyProducts { blueprint: bp_id, activity });
                }
                for product in &data.products {
                    if product.quantity_per_run <= 0 {
                        return Err(CatalogError::NonPositiveOutput {
                            blueprint: bp_id,
                            product: product.type_id,
                        });
                    }
                }
                for material in &data.materials {
                    if material.quantity < 0 {
                        return Err(CatalogError::NegativeMaterial {
                            blueprint: bp_id,
                            material: material.type_id,
                        });
                    }
                }
            }
            if let Some(inv) = &def.invention {
                if !(0.0..=1.0).contains(&inv.base_probability) {
                    return Err(CatalogError::InvalidProbability {
                        blueprint: bp_id,
                        probability: inv.base_probability,
                    });
                }
                for material in &inv.materials {
                    if material.quantity < 0 {
                        return Err(CatalogError::NegativeMaterial {
                            blueprint: bp_id,
                            material: material.type_id,
                        });
                    }
                }
            }
        }
        for (&rig_id, effects) in &self.rig_effects {
            for effect in effects {
                if !(0.0..=1.0).contains(&effect.reduction) {
                    return Err(CatalogError::InvalidRigReduction {
                        rig: rig_id,
                        reduction: effect.reduction,
                    });
                }
            }
        }

        // Product index: for each manufacturable type, blueprints ordered
        // by largest output per run so the most productive source wins.
        let mut manufacturing_index: HashMap<TypeId, Vec<ManufacturingSource>> = HashMap::new();
        let mut reaction_products: HashSet<TypeId> = HashSet::new();
        for (&bp_id, def) in &self.blueprints {
            if let Some(mfg) = &def.manufacturing {
                for product in &mfg.products {
                    manufacturing_index.entry(product.type_id).or_default().push(
                        ManufacturingSource {
                            blueprint_type_id: bp_id,
                            per_run_output: product.quantity_per_run,
                        },
                    );
                }
            }
            if let Some(reaction) = &def.reaction {
                for product in &reaction.products {
                    reaction_products.insert(product.type_id);
                }
            }
        }
        for sources in manufacturing_index.values_mut() {
            sources.sort_by(|a, b| {
                b.per_run_output
                    .cmp(&a.per_run_output)
                    .then(a.blueprint_type_id.cmp(&b.blueprint_type_id))
            });
        }

        self.decryptors
            .sort_by(|a, b| a.name.cmp(&b.name).then(a.type_id.cmp(&b.type_id)));

        Ok(Catalog {
            type_names: self.type_names,
            blueprints: self.blueprints,
            manufacturing_index,
            reaction_products,
            rig_effects: self.rig_effects,
            decryptors: self.decryptors,
            rig_groups: self.rig_groups,
        })
    }
}

/// Immutable static-data catalog: blueprints, the product index, rig
/// effects and decryptors. Shared read-only across planning calls.
#[derive(Debug, Clone)]
pub struct Catalog {
    type_names: HashMap<TypeId, String>,
    blueprints: HashMap<TypeId, BlueprintDef>,
    manufacturing_index: HashMap<TypeId, Vec<ManufacturingSource>>,
    reaction_products: HashSet<TypeId>,
    rig_effects: HashMap<TypeId, Vec<RigEffectDef>>,
    decryptors: Vec<DecryptorDef>,
    rig_groups: HashMap<TypeId, String>,
}

impl Catalog {
    pub fn type_name(&self, type_id: TypeId) -> Option<&str> {
        self.type_names.get(&type_id).map(String::as_str)
    }

    pub fn has_type(&self, type_id: TypeId) -> bool {
        self.type_names.contains_key(&type_id)
    }

    pub fn blueprint(&self, type_id: TypeId) -> Option<&BlueprintDef> {
        self.blueprints.get(&type_id)
    }

    /// The preferred manufacturing blueprint for a product, if any.
    pub fn manufacturing_source(&self, product: TypeId) -> Option<ManufacturingSource> {
        self.manufacturing_index
            .get(&product)
            .and_then(|sources| sources.first())
            .copied()
    }

    /// All manufacturing blueprints producing `product`, best first.
    pub fn manufacturing_sources(&self, product: TypeId) -> &[ManufacturingSource] {
        self.manufacturing_index
            .get(&product)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when the only way to produce `product` is a reaction formula.
    pub fn is_reaction_only(&self, product: TypeId) -> bool {
        self.reaction_products.contains(&product)
            && !self.manufacturing_index.contains_key(&product)
    }

    pub fn rig_effects(&self, rig_type_id: TypeId) -> &[RigEffectDef] {
        self.rig_effects
            .get(&rig_type_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rig bonus group of a product type. Defaults to [`RIG_GROUP_ALL`].
    pub fn rig_group(&self, type_id: TypeId) -> &str {
        self.rig_groups
            .get(&type_id)
            .map(String::as_str)
            .unwrap_or(RIG_GROUP_ALL)
    }

    /// Known decryptors, sorted by name for stable option ordering.
    pub fn decryptors(&self) -> &[DecryptorDef] {
        &self.decryptors
    }
}
