//! Build-vs-buy planning.
//!
//! [`Planner::resolve_and_plan`] expands a target into a decided BOM tree:
//! every node carries its inventory-aware valuation, its build breakdown
//! when a blueprint applies, and a recommendation. Building wins only when
//! the build cost is fully known and strictly cheaper than acquiring the
//! item (ties follow [`TieBreak`]). Unknown costs are data, not errors:
//! they surface as `None` and as per-node reasons.

use crate::bonus::{layered_reduction, rig_reduction};
use crate::catalog::{Activity, Catalog, RigMetric};
use crate::fees::{JobFeeBreakdown, job_fee};
use crate::id::TypeId;
use crate::inventory::{InventorySnapshot, Valuation};
use crate::market::PriceSnapshot;
use crate::profile::{FacilityProfile, as_fraction};
use crate::resolve::{DEFAULT_MAX_DEPTH, Expansion, NodeReason, expand_blueprint};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// ME percent assumed for a manufacturing blueprint the caller does not
/// own but is willing to copy.
pub const ASSUMED_COPY_ME: f64 = 10.0;
/// TE percent assumed for an unowned blueprint copy.
pub const ASSUMED_COPY_TE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Buy,
    Build,
}

/// What wins when build and buy cost exactly the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBreak {
    /// Fewer industry steps; the default.
    #[default]
    PreferBuy,
    PreferBuild,
}

/// A blueprint the caller owns, with its researched efficiency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OwnedBlueprint {
    pub me_percent: f64,
    pub te_percent: f64,
    pub is_copy: bool,
    /// Remaining licensed runs, `None` for originals.
    pub runs: Option<i64>,
}

impl OwnedBlueprint {
    pub fn original(me_percent: f64, te_percent: f64) -> Self {
        Self {
            me_percent,
            te_percent,
            is_copy: false,
            runs: None,
        }
    }
}

/// Caller policy for one planning call.
#[derive(Debug, Clone)]
pub struct BuildPolicy {
    pub max_depth: usize,
    pub tie_break: TieBreak,
    /// Consume on-hand inventory first and decide build-vs-buy only for
    /// the remaining shortfall.
    pub prefer_inventory: bool,
    /// Treat unowned blueprints as copyable at assumed efficiency, with
    /// an amortized copy fee added to the build cost.
    pub assume_copy_from_original: bool,
    pub owned_blueprints: HashMap<TypeId, OwnedBlueprint>,
}

impl Default for BuildPolicy {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            tie_break: TieBreak::default(),
            prefer_inventory: false,
            assume_copy_from_original: true,
            owned_blueprints: HashMap::new(),
        }
    }
}

/// Rejections raised before any recursion happens.
#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("target quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),
    #[error("unknown target type {0:?}")]
    UnknownTargetType(TypeId),
}

/// A guard event recorded while planning; the plan itself still succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanWarning {
    pub type_id: TypeId,
    pub depth: usize,
    pub reason: NodeReason,
}

/// Where a node's ME/TE came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EfficiencySource {
    Owned,
    AssumedCopy,
}

/// Amortized blueprint-copy cost attached to an assumed-copy build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CopyOverhead {
    /// `runs / max_production_limit`, clamped to [0, 1].
    pub run_ratio: f64,
    pub fee: JobFeeBreakdown,
}

/// Economics of building a node's requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildBreakdown {
    pub blueprint_type_id: TypeId,
    pub runs: i64,
    pub per_run_output: i64,
    /// Units produced; overshoots the requirement when runs round up.
    pub output_total: i64,
    pub me_percent: f64,
    pub te_percent: f64,
    pub efficiency_source: EfficiencySource,
    /// Sum of the children's effective costs; `None` if any is unknown.
    pub children_cost: Option<f64>,
    /// Estimated item value of the ME0 inputs at basis prices.
    pub eiv: Option<f64>,
    /// Manufacturing installation fee; `None` when the EIV is unknown.
    pub job_fee: Option<JobFeeBreakdown>,
    pub copy_overhead: Option<CopyOverhead>,
    /// Children plus fees. `None` only when the children cost is unknown;
    /// an unknown fee contributes nothing rather than poisoning the total.
    pub total_cost: Option<f64>,
}

/// The shortfall-only decision made under `prefer_inventory`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShortfallDecision {
    pub quantity: i64,
    pub recommendation: Recommendation,
    pub buy_cost: Option<f64>,
    pub build_cost: Option<f64>,
}

/// One decided node of the plan tree. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomNode {
    pub type_id: TypeId,
    pub type_name: Option<String>,
    pub depth: usize,
    pub required_quantity: i64,
    pub valuation: Valuation,
    pub build: Option<BuildBreakdown>,
    pub recommendation: Recommendation,
    pub reason: Option<NodeReason>,
    /// Cost of following the recommendation; `None` when unknowable.
    pub effective_cost: Option<f64>,
    /// Buy-side minus build-side cost, when both are known.
    pub savings: Option<f64>,
    pub shortfall: Option<ShortfallDecision>,
    pub children: Vec<BomNode>,
}

/// Root-level aggregation. Sums cover the root's immediate children only;
/// grandchildren are already folded into their parents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanTotals {
    pub effective_cost: Option<f64>,
    /// Sum of the immediate children's effective costs.
    pub materials_cost: Option<f64>,
    /// Root job fee plus copy overhead.
    pub job_fees: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub root: BomNode,
    pub totals: PlanTotals,
    pub warnings: Vec<PlanWarning>,
}

/// One material line of a per-run economics breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub type_id: TypeId,
    pub per_run_quantity: i64,
    pub valuation: Valuation,
}

/// Per-run manufacturing economics at a given ME, as consumed by the
/// invention optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturingEconomics {
    pub blueprint_type_id: TypeId,
    pub product_type_id: TypeId,
    pub product_per_run: i64,
    pub me_percent: f64,
    pub materials: Vec<MaterialLine>,
    pub material_cost_per_run: Option<f64>,
    pub eiv_per_run: Option<f64>,
    pub job_fee_per_run: Option<JobFeeBreakdown>,
    pub revenue_per_run: Option<f64>,
    pub profit_per_run: Option<f64>,
}

/// Sum an iterator of optional costs; any unknown makes the sum unknown.
fn sum_known<I: IntoIterator<Item = Option<f64>>>(costs: I) -> Option<f64> {
    costs.into_iter().sum::<Option<f64>>()
}

/// Pure planning facade over read-only snapshots. Holds no mutable state,
/// so one planner can serve many targets, concurrently under `parallel`.
#[derive(Debug, Clone, Copy)]
pub struct Planner<'a> {
    catalog: &'a Catalog,
    prices: &'a PriceSnapshot,
    inventory: &'a InventorySnapshot,
    profile: &'a FacilityProfile,
    policy: &'a BuildPolicy,
}

impl<'a> Planner<'a> {
    pub fn new(
        catalog: &'a Catalog,
        prices: &'a PriceSnapshot,
        inventory: &'a InventorySnapshot,
        profile: &'a FacilityProfile,
        policy: &'a BuildPolicy,
    ) -> Self {
        Self {
            catalog,
            prices,
            inventory,
            profile,
            policy,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    pub fn prices(&self) -> &PriceSnapshot {
        self.prices
    }

    pub fn inventory(&self) -> &InventorySnapshot {
        self.inventory
    }

    pub fn profile(&self) -> &FacilityProfile {
        self.profile
    }

    pub fn policy(&self) -> &BuildPolicy {
        self.policy
    }

    /// Plan one target. Rejects non-positive quantities and targets the
    /// catalog has never heard of; everything else degrades to per-node
    /// reasons and warnings.
    pub fn resolve_and_plan(&self, target: TypeId, quantity: i64) -> Result<PlanResult, PlanError> {
        if quantity <= 0 {
            return Err(PlanError::NonPositiveQuantity(quantity));
        }
        if !self.catalog.has_type(target) {
            return Err(PlanError::UnknownTargetType(target));
        }
        let mut warnings = Vec::new();
        let ancestors = HashSet::new();
        let root = self.plan_node(target, quantity, 0, &ancestors, &mut warnings);

        let materials_cost = if root.children.is_empty() {
            None
        } else {
            sum_known(root.children.iter().map(|c| c.effective_cost))
        };
        let job_fees = root
            .build
            .as_ref()
            .map(|b| {
                b.job_fee.map(|f| f.total_job_cost).unwrap_or(0.0)
                    + b.copy_overhead.map(|c| c.fee.total_job_cost).unwrap_or(0.0)
            })
            .unwrap_or(0.0);
        let totals = PlanTotals {
            effective_cost: root.effective_cost,
            materials_cost,
            job_fees,
        };
        Ok(PlanResult {
            root,
            totals,
            warnings,
        })
    }

    /// ME/TE to plan a blueprint with, if policy allows building from it.
    fn efficiency_for(&self, blueprint: TypeId) -> Option<(f64, f64, EfficiencySource)> {
        if let Some(owned) = self.policy.owned_blueprints.get(&blueprint) {
            return Some((owned.me_percent, owned.te_percent, EfficiencySource::Owned));
        }
        if self.policy.assume_copy_from_original {
            return Some((ASSUMED_COPY_ME, ASSUMED_COPY_TE, EfficiencySource::AssumedCopy));
        }
        None
    }

    /// Facility + rig material reduction for manufacturing a product.
    fn material_reduction_for(&self, product: TypeId) -> f64 {
        let rig = rig_reduction(
            self.catalog,
            &self.profile.rig_type_ids,
            Activity::Manufacturing,
            self.catalog.rig_group(product),
            RigMetric::Material,
        );
        layered_reduction(as_fraction(self.profile.material_reduction), rig)
    }

    /// Facility + rig job-cost reduction for an activity on a product.
    fn cost_reduction_for(&self, product: TypeId, activity: Activity) -> f64 {
        let rig = rig_reduction(
            self.catalog,
            &self.profile.rig_type_ids,
            activity,
            self.catalog.rig_group(product),
            RigMetric::Cost,
        );
        layered_reduction(as_fraction(self.profile.cost_reduction), rig)
    }

    /// EIV of an expansion's ME0 inputs at basis prices.
    fn expansion_eiv(&self, expansion: &Expansion) -> Option<f64> {
        sum_known(expansion.materials.iter().map(|m| {
            self.prices
                .basis_unit_price(m.type_id)
                .map(|u| u * m.total_me0 as f64)
        }))
    }

    pub(crate) fn activity_fee(
        &self,
        product: TypeId,
        activity: Activity,
        job_cost_base: f64,
    ) -> JobFeeBreakdown {
        job_fee(
            job_cost_base,
            self.profile.cost_indices.index_for(activity),
            self.cost_reduction_for(product, activity),
            self.profile.surcharge_total(),
        )
    }

    fn leaf(
        &self,
        type_id: TypeId,
        required: i64,
        depth: usize,
        reason: NodeReason,
    ) -> BomNode {
        let valuation = self
            .inventory
            .valuate(type_id, required, self.prices.buy_unit_price(type_id));
        let effective_cost = valuation.effective_cost;
        let reason = if effective_cost.is_none() && reason == NodeReason::NoBlueprint {
            // An unbuildable node without a price is unknowable; the price
            // gap is the more actionable signal.
            NodeReason::MissingPrice
        } else {
            reason
        };
        BomNode {
            type_id,
            type_name: self.catalog.type_name(type_id).map(str::to_string),
            depth,
            required_quantity: required,
            valuation,
            build: None,
            recommendation: Recommendation::Buy,
            reason: Some(reason),
            effective_cost,
            savings: None,
            shortfall: None,
            children: Vec::new(),
        }
    }

    fn plan_node(
        &self,
        type_id: TypeId,
        required: i64,
        depth: usize,
        ancestors: &HashSet<TypeId>,
        warnings: &mut Vec<PlanWarning>,
    ) -> BomNode {
        if ancestors.contains(&type_id) {
            warnings.push(PlanWarning {
                type_id,
                depth,
                reason: NodeReason::CycleDetected,
            });
            return self.leaf(type_id, required, depth, NodeReason::CycleDetected);
        }
        if depth >= self.policy.max_depth {
            warnings.push(PlanWarning {
                type_id,
                depth,
                reason: NodeReason::DepthLimit,
            });
            return self.leaf(type_id, required, depth, NodeReason::DepthLimit);
        }
        if self.catalog.is_reaction_only(type_id) {
            return self.leaf(type_id, required, depth, NodeReason::ReactionOnly);
        }
        let Some(source) = self.catalog.manufacturing_source(type_id) else {
            return self.leaf(type_id, required, depth, NodeReason::NoBlueprint);
        };
        let Some((me_percent, te_percent, efficiency_source)) =
            self.efficiency_for(source.blueprint_type_id)
        else {
            return self.leaf(type_id, required, depth, NodeReason::BlueprintNotOwned);
        };

        let market_unit = self.prices.buy_unit_price(type_id);
        let valuation = self.inventory.valuate(type_id, required, market_unit);

        // Under prefer_inventory, on-hand stock is consumed first and the
        // build machinery only ever sees the shortfall.
        let build_target = if self.policy.prefer_inventory {
            valuation.buy_now
        } else {
            required
        };
        if build_target == 0 {
            // Stock covers the whole requirement: a pure take.
            return BomNode {
                type_id,
                type_name: self.catalog.type_name(type_id).map(str::to_string),
                depth,
                required_quantity: required,
                valuation,
                build: None,
                recommendation: Recommendation::Buy,
                reason: None,
                effective_cost: valuation.effective_cost,
                savings: None,
                shortfall: None,
                children: Vec::new(),
            };
        }

        let material_reduction = self.material_reduction_for(type_id);
        let Some(expansion) =
            expand_blueprint(self.catalog, type_id, build_target, me_percent, material_reduction)
        else {
            return self.leaf(type_id, required, depth, NodeReason::NoBlueprint);
        };

        let mut path = ancestors.clone();
        path.insert(type_id);
        let children: Vec<BomNode> = expansion
            .materials
            .iter()
            .map(|m| self.plan_node(m.type_id, m.total_adjusted, depth + 1, &path, warnings))
            .collect();

        let children_cost = sum_known(children.iter().map(|c| c.effective_cost));
        let eiv = self.expansion_eiv(&expansion);
        let fee = eiv.map(|e| {
            self.activity_fee(
                type_id,
                Activity::Manufacturing,
                e * Activity::Manufacturing.job_cost_base_fraction(),
            )
        });
        let copy_overhead = self.copy_overhead(type_id, &expansion, efficiency_source, eiv);
        let total_cost = children_cost.map(|c| {
            c + fee.map(|f| f.total_job_cost).unwrap_or(0.0)
                + copy_overhead.map(|o| o.fee.total_job_cost).unwrap_or(0.0)
        });

        let build = BuildBreakdown {
            blueprint_type_id: expansion.blueprint_type_id,
            runs: expansion.runs,
            per_run_output: expansion.per_run_output,
            output_total: expansion.output_total,
            me_percent,
            te_percent,
            efficiency_source,
            children_cost,
            eiv,
            job_fee: fee,
            copy_overhead,
            total_cost,
        };

        if self.policy.prefer_inventory {
            self.decide_shortfall(type_id, depth, required, valuation, build, children)
        } else {
            self.decide_full(type_id, depth, required, valuation, build, children)
        }
    }

    fn copy_overhead(
        &self,
        product: TypeId,
        expansion: &Expansion,
        efficiency_source: EfficiencySource,
        eiv: Option<f64>,
    ) -> Option<CopyOverhead> {
        if efficiency_source != EfficiencySource::AssumedCopy {
            return None;
        }
        let def = self.catalog.blueprint(expansion.blueprint_type_id)?;
        def.copying_time_seconds?;
        if def.max_production_limit <= 0 {
            return None;
        }
        let eiv = eiv?;
        let run_ratio =
            (expansion.runs as f64 / def.max_production_limit as f64).clamp(0.0, 1.0);
        let base = eiv * Activity::Copying.job_cost_base_fraction() * run_ratio;
        Some(CopyOverhead {
            run_ratio,
            fee: self.activity_fee(product, Activity::Copying, base),
        })
    }

    /// Decide a node when the whole requirement is in play.
    fn decide_full(
        &self,
        type_id: TypeId,
        depth: usize,
        required: i64,
        valuation: Valuation,
        build: BuildBreakdown,
        children: Vec<BomNode>,
    ) -> BomNode {
        let buy_side = valuation.effective_cost;
        let build_side = build.total_cost;
        let (recommendation, effective_cost, reason) = decide(buy_side, build_side, self.policy.tie_break);
        let savings = match (buy_side, build_side) {
            (Some(buy), Some(bld)) => Some(buy - bld),
            _ => None,
        };
        BomNode {
            type_id,
            type_name: self.catalog.type_name(type_id).map(str::to_string),
            depth,
            required_quantity: required,
            valuation,
            build: Some(build),
            recommendation,
            reason,
            effective_cost,
            savings,
            shortfall: None,
            children,
        }
    }

    /// Decide a node when inventory is consumed first and only the
    /// shortfall is compared.
    fn decide_shortfall(
        &self,
        type_id: TypeId,
        depth: usize,
        required: i64,
        valuation: Valuation,
        build: BuildBreakdown,
        children: Vec<BomNode>,
    ) -> BomNode {
        let shortfall_buy = if valuation.buy_now > 0 {
            valuation.market_unit_price.map(|u| valuation.buy_now as f64 * u)
        } else {
            Some(0.0)
        };
        let build_side = build.total_cost;
        let (recommendation, chosen, reason) = decide(shortfall_buy, build_side, self.policy.tie_break);
        let inventory_portion = valuation.inventory_portion_cost();
        let effective_cost = match (inventory_portion, chosen) {
            (Some(inv), Some(chosen)) => Some(inv + chosen),
            _ => None,
        };
        let savings = match (shortfall_buy, build_side) {
            (Some(buy), Some(bld)) => Some(buy - bld),
            _ => None,
        };
        BomNode {
            type_id,
            type_name: self.catalog.type_name(type_id).map(str::to_string),
            depth,
            required_quantity: required,
            valuation,
            shortfall: Some(ShortfallDecision {
                quantity: valuation.buy_now,
                recommendation,
                buy_cost: shortfall_buy,
                build_cost: build_side,
            }),
            build: Some(build),
            recommendation,
            reason,
            effective_cost,
            savings,
            children,
        }
    }

    /// Per-run manufacturing economics for a blueprint at a given ME.
    /// `None` when the blueprint or its manufacturing activity is absent.
    pub fn manufacturing_economics(
        &self,
        blueprint: TypeId,
        me_percent: f64,
    ) -> Option<ManufacturingEconomics> {
        let def = self.catalog.blueprint(blueprint)?;
        let mfg = def.manufacturing.as_ref()?;
        let product = mfg.products.first()?;
        let material_reduction = self.material_reduction_for(product.type_id);

        let materials: Vec<MaterialLine> = mfg
            .materials
            .iter()
            .filter(|m| m.quantity > 0)
            .map(|m| {
                let per_run_quantity = crate::resolve::adjusted_per_run_quantity(
                    m.quantity,
                    me_percent,
                    material_reduction,
                );
                MaterialLine {
                    type_id: m.type_id,
                    per_run_quantity,
                    valuation: self.inventory.valuate(
                        m.type_id,
                        per_run_quantity,
                        self.prices.buy_unit_price(m.type_id),
                    ),
                }
            })
            .collect();

        let material_cost_per_run =
            sum_known(materials.iter().map(|m| m.valuation.effective_cost));
        let eiv_per_run = sum_known(mfg.materials.iter().filter(|m| m.quantity > 0).map(|m| {
            self.prices
                .basis_unit_price(m.type_id)
                .map(|u| u * m.quantity as f64)
        }));
        let job_fee_per_run = eiv_per_run.map(|e| {
            self.activity_fee(
                product.type_id,
                Activity::Manufacturing,
                e * Activity::Manufacturing.job_cost_base_fraction(),
            )
        });
        let revenue_per_run = self
            .prices
            .buy_unit_price(product.type_id)
            .map(|u| u * product.quantity_per_run as f64);
        let profit_per_run = match (revenue_per_run, material_cost_per_run) {
            (Some(revenue), Some(materials)) => Some(
                revenue
                    - materials
                    - job_fee_per_run.map(|f| f.total_job_cost).unwrap_or(0.0),
            ),
            _ => None,
        };

        Some(ManufacturingEconomics {
            blueprint_type_id: blueprint,
            product_type_id: product.type_id,
            product_per_run: product.quantity_per_run,
            me_percent,
            materials,
            material_cost_per_run,
            eiv_per_run,
            job_fee_per_run,
            revenue_per_run,
            profit_per_run,
        })
    }
}

/// The core comparison: build only on a fully-known, strictly cheaper
/// build cost (ties per policy). Returns the recommendation, the cost of
/// following it, and an optional reason.
fn decide(
    buy_side: Option<f64>,
    build_side: Option<f64>,
    tie_break: TieBreak,
) -> (Recommendation, Option<f64>, Option<NodeReason>) {
    match (buy_side, build_side) {
        (Some(buy), Some(build)) => {
            let build_wins =
                build < buy || (build == buy && tie_break == TieBreak::PreferBuild);
            if build_wins {
                (Recommendation::Build, Some(build), None)
            } else {
                (Recommendation::Buy, Some(buy), None)
            }
        }
        (None, Some(build)) => (
            Recommendation::Build,
            Some(build),
            Some(NodeReason::BuyPriceMissing),
        ),
        (Some(buy), None) => (Recommendation::Buy, Some(buy), None),
        (None, None) => (Recommendation::Buy, None, Some(NodeReason::MissingPrice)),
    }
}
