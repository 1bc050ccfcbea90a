//! Plan-tree flattening for tabular consumers.
//!
//! Rows come out in depth-first order, each annotated with the full path
//! of ancestor type ids. Monetary columns on parent rows are recomputed
//! as the sum of their immediate children's already-rolled-up values, so
//! a consumer can total any subtree without double counting; there is
//! never a second full-depth sum.

use crate::id::TypeId;
use crate::planner::{BomNode, Recommendation};
use crate::resolve::NodeReason;
use serde::{Deserialize, Serialize};

/// One flattened plan row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRow {
    /// Type ids from the root down to this row, self included.
    pub path: Vec<TypeId>,
    pub depth: usize,
    pub type_id: TypeId,
    pub type_name: Option<String>,
    pub recommendation: Recommendation,
    pub reason: Option<NodeReason>,
    pub required_quantity: i64,
    pub inventory_used: i64,
    pub buy_now: i64,
    /// Effective cost per unit of this row's own requirement.
    pub unit_cost: Option<f64>,
    pub effective_cost: Option<f64>,
    pub buy_cost: Option<f64>,
    pub build_cost: Option<f64>,
    /// This row's own job fee (manufacturing plus copy overhead). Not
    /// rolled up; fees are already inside the build cost.
    pub job_fee: Option<f64>,
    pub savings: Option<f64>,
    pub has_children: bool,
}

#[derive(Clone, Copy)]
struct Money {
    effective: Option<f64>,
    buy: Option<f64>,
    build: Option<f64>,
}

fn add(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        _ => None,
    }
}

/// Flatten a decided plan tree into path-annotated rows.
pub fn flatten(root: &BomNode) -> Vec<PlanRow> {
    let mut rows = Vec::new();
    flatten_node(root, &[], &mut rows);
    rows
}

fn flatten_node(node: &BomNode, ancestors: &[TypeId], rows: &mut Vec<PlanRow>) -> Money {
    let mut path = ancestors.to_vec();
    path.push(node.type_id);

    let own = Money {
        effective: node.effective_cost,
        buy: node.valuation.buy_cost,
        build: node.build.as_ref().and_then(|b| b.total_cost),
    };
    let job_fee = node.build.as_ref().map(|b| {
        b.job_fee.map(|f| f.total_job_cost).unwrap_or(0.0)
            + b.copy_overhead.map(|o| o.fee.total_job_cost).unwrap_or(0.0)
    });

    let index = rows.len();
    rows.push(PlanRow {
        path: path.clone(),
        depth: node.depth,
        type_id: node.type_id,
        type_name: node.type_name.clone(),
        recommendation: node.recommendation,
        reason: node.reason,
        required_quantity: node.required_quantity,
        inventory_used: node.valuation.inventory_used,
        buy_now: node.valuation.buy_now,
        unit_cost: node.valuation.effective_unit_cost(),
        effective_cost: own.effective,
        buy_cost: own.buy,
        build_cost: own.build,
        job_fee,
        savings: node.savings,
        has_children: !node.children.is_empty(),
    });

    if node.children.is_empty() {
        return own;
    }

    // Parent money becomes the one-level sum of its children's rolled-up
    // money. Children recurse first, so grandchildren are already folded
    // into each child exactly once.
    let mut rolled = Money {
        effective: Some(0.0),
        buy: Some(0.0),
        build: Some(0.0),
    };
    for child in &node.children {
        let child_money = flatten_node(child, &path, rows);
        rolled.effective = add(rolled.effective, child_money.effective);
        rolled.buy = add(rolled.buy, child_money.buy);
        rolled.build = add(rolled.build, child_money.build);
    }
    rows[index].effective_cost = rolled.effective;
    rows[index].buy_cost = rolled.buy;
    rows[index].build_cost = rolled.build;
    rolled
}

/// Scale every monetary column by an allocation share, for consumers
/// attributing a multi-output blueprint's costs to one output stream.
pub fn scale_money(rows: &mut [PlanRow], share: f64) {
    let scale = |v: &mut Option<f64>| {
        if let Some(v) = v.as_mut() {
            *v *= share;
        }
    };
    for row in rows {
        scale(&mut row.unit_cost);
        scale(&mut row.effective_cost);
        scale(&mut row.buy_cost);
        scale(&mut row.build_cost);
        scale(&mut row.job_fee);
        scale(&mut row.savings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        BlueprintDef, CatalogBuilder, MaterialRequirement, ProductOutput, ProductionData,
    };
    use crate::inventory::InventorySnapshot;
    use crate::market::{PriceQuote, PriceSnapshot};
    use crate::planner::{BuildPolicy, OwnedBlueprint, Planner};
    use crate::profile::FacilityProfile;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    fn mfg_blueprint(materials: Vec<(u32, i64)>, product: (u32, i64)) -> BlueprintDef {
        BlueprintDef {
            name: "bp".to_string(),
            max_production_limit: 10,
            manufacturing: Some(ProductionData {
                materials: materials
                    .into_iter()
                    .map(|(id, quantity)| MaterialRequirement { type_id: TypeId(id), quantity })
                    .collect(),
                products: vec![ProductOutput {
                    type_id: TypeId(product.0),
                    quantity_per_run: product.1,
                }],
                time_seconds: 600.0,
            }),
            invention: None,
            copying_time_seconds: None,
            reaction: None,
        }
    }

    /// 2 builds from 2x 3 and 1x 4; 3 builds from 5x 1.
    fn two_level_rows() -> Vec<PlanRow> {
        let mut builder = CatalogBuilder::new();
        builder.register_type(TypeId(2), "Assembly").unwrap();
        builder
            .register_blueprint(TypeId(10), mfg_blueprint(vec![(3, 2), (4, 1)], (2, 1)))
            .unwrap();
        builder
            .register_blueprint(TypeId(11), mfg_blueprint(vec![(1, 5)], (3, 1)))
            .unwrap();
        let catalog = builder.build().unwrap();
        let mut prices = PriceSnapshot::new();
        prices.insert(TypeId(1), PriceQuote::new(Some(1.0), Some(1.0)));
        prices.insert(TypeId(2), PriceQuote::new(Some(1000.0), None));
        prices.insert(TypeId(3), PriceQuote::new(Some(100.0), Some(100.0)));
        prices.insert(TypeId(4), PriceQuote::new(Some(7.0), Some(7.0)));
        let inventory = InventorySnapshot::new();
        let profile = FacilityProfile::default();
        let mut policy = BuildPolicy::default();
        policy
            .owned_blueprints
            .insert(TypeId(10), OwnedBlueprint::original(0.0, 0.0));
        policy
            .owned_blueprints
            .insert(TypeId(11), OwnedBlueprint::original(0.0, 0.0));
        let planner = Planner::new(&catalog, &prices, &inventory, &profile, &policy);
        let plan = planner.resolve_and_plan(TypeId(2), 1).unwrap();
        flatten(&plan.root)
    }

    #[test]
    fn rows_in_depth_first_order() {
        let rows = two_level_rows();
        let ids: Vec<TypeId> = rows.iter().map(|r| r.type_id).collect();
        assert_eq!(
            ids,
            vec![TypeId(2), TypeId(3), TypeId(1), TypeId(4)]
        );
        let depths: Vec<usize> = rows.iter().map(|r| r.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 1]);
    }

    #[test]
    fn paths_include_self() {
        let rows = two_level_rows();
        assert_eq!(rows[0].path, vec![TypeId(2)]);
        assert_eq!(rows[2].path, vec![TypeId(2), TypeId(3), TypeId(1)]);
    }

    #[test]
    fn parent_money_is_immediate_children_sum() {
        let rows = two_level_rows();
        // Material 1: 2 runs of 5 = 10 units at 1.0; material 4: 7.0.
        // Node 3 rolls up to its child's 10.0; root = 10 + 7.
        let node3 = &rows[1];
        assert_close(node3.effective_cost.unwrap(), 10.0);
        let root = &rows[0];
        assert_close(root.effective_cost.unwrap(), 17.0);
        // Depth-1 rows alone reproduce the root: no double counting of
        // the grandchild.
        let depth1: f64 = rows
            .iter()
            .filter(|r| r.depth == 1)
            .map(|r| r.effective_cost.unwrap())
            .sum();
        assert_close(root.effective_cost.unwrap(), depth1);
    }

    #[test]
    fn unknown_child_poisons_parent_rollup() {
        let mut builder = CatalogBuilder::new();
        builder.register_type(TypeId(2), "Assembly").unwrap();
        builder
            .register_blueprint(TypeId(10), mfg_blueprint(vec![(3, 1)], (2, 1)))
            .unwrap();
        let catalog = builder.build().unwrap();
        let prices = PriceSnapshot::new(); // nothing priced
        let inventory = InventorySnapshot::new();
        let profile = FacilityProfile::default();
        let policy = BuildPolicy::default();
        let planner = Planner::new(&catalog, &prices, &inventory, &profile, &policy);
        let plan = planner.resolve_and_plan(TypeId(2), 1).unwrap();
        let rows = flatten(&plan.root);
        assert_eq!(rows[0].effective_cost, None);
        assert_eq!(rows[1].effective_cost, None);
    }

    #[test]
    fn leaf_rows_keep_own_money() {
        let rows = two_level_rows();
        let leaf = rows.iter().find(|r| r.type_id == TypeId(4)).unwrap();
        assert!(!leaf.has_children);
        assert_close(leaf.effective_cost.unwrap(), 7.0);
        assert_close(leaf.unit_cost.unwrap(), 7.0);
    }

    #[test]
    fn scaling_hits_every_money_column() {
        let mut rows = two_level_rows();
        scale_money(&mut rows, 0.5);
        assert_close(rows[0].effective_cost.unwrap(), 8.5);
        let leaf = rows.iter().find(|r| r.type_id == TypeId(4)).unwrap();
        assert_close(leaf.effective_cost.unwrap(), 3.5);
        assert_close(leaf.buy_cost.unwrap(), 3.5);
    }
}
