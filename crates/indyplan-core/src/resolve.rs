//! Bill-of-materials resolution.
//!
//! Expands a product into runs and material requirements. ME and facility
//! material bonuses round per run (`ceil`, minimum 1 for any non-zero raw
//! requirement) and the per-run quantity is then multiplied by the run
//! count, so a deep tree never loses sub-unit requirements.

use crate::catalog::{Catalog, ProductOutput};
use crate::id::TypeId;
use crate::market::PriceSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default recursion ceiling for requirement trees.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Why a node could not (or must not) be expanded further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeReason {
    /// The type already appears on the path from the root.
    CycleDetected,
    /// The recursion ceiling was reached.
    DepthLimit,
    /// No manufacturing blueprint produces this type.
    NoBlueprint,
    /// Only a reaction formula produces this type; reactions are not
    /// planned, the material is bought.
    ReactionOnly,
    /// The manufacturing blueprint exists but is not owned and policy
    /// forbids assuming a copy.
    BlueprintNotOwned,
    /// No market price exists for a portion that must be bought.
    MissingPrice,
    /// The buy side is unpriced, so building was chosen by default.
    BuyPriceMissing,
}

/// Runs needed to produce at least `target` units at `per_run_output`
/// units per run.
pub fn runs_needed(target: i64, per_run_output: i64) -> i64 {
    if target <= 0 || per_run_output <= 0 {
        return 0;
    }
    (target + per_run_output - 1) / per_run_output
}

/// Per-run material quantity after ME and facility material bonuses.
/// Any non-zero raw requirement stays at least 1 per run. Negative ME
/// (invented blueprints before research) increases the requirement.
pub fn adjusted_per_run_quantity(raw: i64, me_percent: f64, material_reduction: f64) -> i64 {
    if raw <= 0 {
        return 0;
    }
    let me = (me_percent / 100.0).min(1.0);
    let facility = material_reduction.clamp(0.0, 1.0);
    let adjusted = (raw as f64) * (1.0 - me) * (1.0 - facility);
    (adjusted.ceil() as i64).max(1)
}

/// One material line of an expansion, at both ME0 and adjusted quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpandedMaterial {
    pub type_id: TypeId,
    pub per_run_me0: i64,
    pub per_run_adjusted: i64,
    pub total_me0: i64,
    pub total_adjusted: i64,
}

/// A single-level expansion of a product into blueprint runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expansion {
    pub blueprint_type_id: TypeId,
    pub runs: i64,
    pub per_run_output: i64,
    /// Units actually produced; `>= target` when runs round up.
    pub output_total: i64,
    pub materials: Vec<ExpandedMaterial>,
}

/// Expand one product into its preferred blueprint's run count and
/// materials. Returns `None` when no manufacturing blueprint exists.
pub fn expand_blueprint(
    catalog: &Catalog,
    product: TypeId,
    target: i64,
    me_percent: f64,
    material_reduction: f64,
) -> Option<Expansion> {
    let source = catalog.manufacturing_source(product)?;
    let def = catalog.blueprint(source.blueprint_type_id)?;
    let mfg = def.manufacturing.as_ref()?;
    let runs = runs_needed(target, source.per_run_output);
    let materials = mfg
        .materials
        .iter()
        .filter(|m| m.quantity > 0)
        .map(|m| {
            let per_run_adjusted =
                adjusted_per_run_quantity(m.quantity, me_percent, material_reduction);
            ExpandedMaterial {
                type_id: m.type_id,
                per_run_me0: m.quantity,
                per_run_adjusted,
                total_me0: m.quantity * runs,
                total_adjusted: per_run_adjusted * runs,
            }
        })
        .collect();
    Some(Expansion {
        blueprint_type_id: source.blueprint_type_id,
        runs,
        per_run_output: source.per_run_output,
        output_total: runs * source.per_run_output,
        materials,
    })
}

/// An unpriced requirement-tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementNode {
    pub type_id: TypeId,
    pub required_quantity: i64,
    /// Present on forced or natural leaves.
    pub leaf_reason: Option<NodeReason>,
    /// Expansion backing the children, absent on leaves.
    pub expansion: Option<Expansion>,
    pub children: Vec<RequirementNode>,
}

/// Resolve the full unpriced requirement tree for a product. The same ME
/// and facility reduction apply at every level; cost-aware per-node
/// efficiency lives in the planner.
pub fn resolve_requirements(
    catalog: &Catalog,
    target: TypeId,
    quantity: i64,
    me_percent: f64,
    material_reduction: f64,
    max_depth: usize,
) -> RequirementNode {
    let ancestors = HashSet::new();
    resolve_node(
        catalog,
        target,
        quantity,
        me_percent,
        material_reduction,
        0,
        max_depth,
        &ancestors,
    )
}

fn resolve_node(
    catalog: &Catalog,
    type_id: TypeId,
    quantity: i64,
    me_percent: f64,
    material_reduction: f64,
    depth: usize,
    max_depth: usize,
    ancestors: &HashSet<TypeId>,
) -> RequirementNode {
    let leaf = |reason| RequirementNode {
        type_id,
        required_quantity: quantity,
        leaf_reason: Some(reason),
        expansion: None,
        children: Vec::new(),
    };

    if ancestors.contains(&type_id) {
        return leaf(NodeReason::CycleDetected);
    }
    if depth >= max_depth {
        return leaf(NodeReason::DepthLimit);
    }
    if catalog.is_reaction_only(type_id) {
        return leaf(NodeReason::ReactionOnly);
    }
    let Some(expansion) =
        expand_blueprint(catalog, type_id, quantity, me_percent, material_reduction)
    else {
        return leaf(NodeReason::NoBlueprint);
    };

    // Each child gets its own ancestor set: a cycle through one branch
    // must not poison its siblings.
    let mut path = ancestors.clone();
    path.insert(type_id);
    let children = expansion
        .materials
        .iter()
        .map(|m| {
            resolve_node(
                catalog,
                m.type_id,
                m.total_adjusted,
                me_percent,
                material_reduction,
                depth + 1,
                max_depth,
                &path,
            )
        })
        .collect();

    RequirementNode {
        type_id,
        required_quantity: quantity,
        leaf_reason: None,
        expansion: Some(expansion),
        children,
    }
}

/// Basis actually used for a multi-output allocation share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareBasis {
    /// Market value of each output stream.
    Value,
    /// Output quantities, when any output lacks a price.
    Quantity,
    /// Single output or nothing to weigh by.
    Whole,
}

/// Allocation share of one output of a multi-product blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationShare {
    pub type_id: TypeId,
    pub share: f64,
    pub basis: ShareBasis,
}

/// Cost allocation shares across a blueprint's outputs: value-weighted
/// when every output has a buy price, quantity-weighted otherwise, and a
/// whole share of 1.0 when neither basis works.
pub fn allocation_shares(products: &[ProductOutput], prices: &PriceSnapshot) -> Vec<AllocationShare> {
    if products.len() == 1 {
        return vec![AllocationShare {
            type_id: products[0].type_id,
            share: 1.0,
            basis: ShareBasis::Whole,
        }];
    }

    let values: Option<Vec<f64>> = products
        .iter()
        .map(|p| {
            prices
                .buy_unit_price(p.type_id)
                .map(|u| u * p.quantity_per_run.max(0) as f64)
        })
        .collect();
    if let Some(values) = values {
        let total: f64 = values.iter().sum();
        if total > 0.0 {
            return products
                .iter()
                .zip(values)
                .map(|(p, v)| AllocationShare {
                    type_id: p.type_id,
                    share: v / total,
                    basis: ShareBasis::Value,
                })
                .collect();
        }
    }

    let total_qty: i64 = products.iter().map(|p| p.quantity_per_run.max(0)).sum();
    if total_qty > 0 {
        return products
            .iter()
            .map(|p| AllocationShare {
                type_id: p.type_id,
                share: p.quantity_per_run.max(0) as f64 / total_qty as f64,
                basis: ShareBasis::Quantity,
            })
            .collect();
    }

    products
        .iter()
        .map(|p| AllocationShare {
            type_id: p.type_id,
            share: 1.0,
            basis: ShareBasis::Whole,
        })
        .collect()
}
