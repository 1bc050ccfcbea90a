//! Invention decryptor optimization.
//!
//! Enumerates every decryptor option (plus a mandatory no-decryptor
//! baseline) for a T1 blueprint's invention activity and ranks them by
//! manufacturing ROI of the invented copy. Options whose economics cannot
//! be computed (zero success probability, unpriced consumable) are never
//! dropped; their economics null out and they sort last.

use crate::catalog::{Activity, InventionData};
use crate::fees::JobFeeBreakdown;
use crate::id::TypeId;
use crate::inventory::Valuation;
use crate::planner::{ManufacturingEconomics, Planner};
use crate::profile::CharacterSkills;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ME of a freshly invented copy before decryptor modifiers.
pub const BASE_INVENTED_ME: i32 = -4;
/// TE of a freshly invented copy before decryptor modifiers.
pub const BASE_INVENTED_TE: i32 = -4;

/// Display name of the mandatory baseline option.
pub const NO_DECRYPTOR: &str = "No Decryptor";

#[derive(Debug, Error, PartialEq)]
pub enum InventionError {
    #[error("unknown blueprint {0:?}")]
    UnknownBlueprint(TypeId),
    #[error("blueprint {0:?} has no invention activity")]
    NoInventionActivity(TypeId),
    #[error("invented blueprint {0:?} has no manufacturing activity")]
    OutputNotManufacturable(TypeId),
}

/// One invention material line, valued against inventory and market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptMaterialLine {
    pub type_id: TypeId,
    pub quantity: i64,
    pub valuation: Valuation,
}

/// One ranked decryptor choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventionOption {
    /// `None` for the no-decryptor baseline.
    pub decryptor_type_id: Option<TypeId>,
    pub decryptor_name: String,
    pub probability_multiplier: f64,
    pub me_modifier: i32,
    pub te_modifier: i32,
    pub run_modifier: i32,
    /// Final success probability in [0, 1].
    pub success_probability: f64,
    /// `1 / success_probability`; `None` when success is impossible.
    pub expected_attempts: Option<f64>,
    pub invented_me: i32,
    pub invented_te: i32,
    pub invented_runs: i64,
    /// Market cost of one consumable; `Some(0.0)` for the baseline.
    pub decryptor_cost: Option<f64>,
    /// Materials + consumable + invention fee for one attempt.
    pub attempt_cost: Option<f64>,
    /// Attempt cost amortized over expected attempts and invented runs.
    pub invention_cost_per_run: Option<f64>,
    /// Manufacturing economics of the invented copy at its invented ME.
    pub manufacturing: ManufacturingEconomics,
    pub net_profit_per_run: Option<f64>,
    pub roi_percent: Option<f64>,
}

/// Ranked options plus the inputs shared by all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventionReport {
    pub blueprint_type_id: TypeId,
    pub output_blueprint: TypeId,
    pub product_type_id: TypeId,
    pub base_probability: f64,
    pub skill_multiplier: f64,
    pub attempt_materials: Vec<AttemptMaterialLine>,
    /// Sum of the attempt material costs; `None` if any is unknown.
    pub attempt_material_cost: Option<f64>,
    /// Invention installation fee; `None` when the material EIV is
    /// unknown, in which case it contributes nothing to attempt costs.
    pub invention_fee: Option<JobFeeBreakdown>,
    /// Best option first.
    pub options: Vec<InventionOption>,
}

/// Skill multiplier on the base success probability:
/// `1 + science_sum / 30 + encryption / 40`.
pub fn skill_multiplier(inv: &InventionData, skills: &CharacterSkills) -> f64 {
    let science_sum: u32 = inv
        .science_skills
        .iter()
        .map(|s| skills.trained_level(*s) as u32)
        .sum();
    let encryption = inv
        .encryption_skill
        .map(|s| skills.trained_level(s) as u32)
        .unwrap_or(0);
    1.0 + science_sum as f64 / 30.0 + encryption as f64 / 40.0
}

/// Enumerate and rank decryptor options for a T1 blueprint.
pub fn rank_invention_options(
    planner: &Planner<'_>,
    skills: &CharacterSkills,
    blueprint: TypeId,
) -> Result<InventionReport, InventionError> {
    let catalog = planner.catalog();
    let def = catalog
        .blueprint(blueprint)
        .ok_or(InventionError::UnknownBlueprint(blueprint))?;
    let inv = def
        .invention
        .as_ref()
        .ok_or(InventionError::NoInventionActivity(blueprint))?;

    let multiplier = skill_multiplier(inv, skills);

    let prices = planner.prices();
    let inventory = planner.inventory();
    let attempt_materials: Vec<AttemptMaterialLine> = inv
        .materials
        .iter()
        .filter(|m| m.quantity > 0)
        .map(|m| AttemptMaterialLine {
            type_id: m.type_id,
            quantity: m.quantity,
            valuation: inventory.valuate(
                m.type_id,
                m.quantity,
                prices.buy_unit_price(m.type_id),
            ),
        })
        .collect();
    let attempt_material_cost: Option<f64> = attempt_materials
        .iter()
        .map(|m| m.valuation.effective_cost)
        .sum();

    // Fee basis: full EIV of the invention materials (datacores), the
    // consumable excluded. Identical for every option.
    let eiv: Option<f64> = inv
        .materials
        .iter()
        .filter(|m| m.quantity > 0)
        .map(|m| {
            prices
                .basis_unit_price(m.type_id)
                .map(|u| u * m.quantity as f64)
        })
        .sum();
    let invention_fee = eiv.map(|e| {
        planner.activity_fee(
            inv.output_blueprint,
            Activity::Invention,
            e * Activity::Invention.job_cost_base_fraction(),
        )
    });
    let fee_cost = invention_fee.map(|f| f.total_job_cost).unwrap_or(0.0);

    // Baseline first, then catalog decryptors in name order; the sort
    // below is stable, so equal economics keep this ordering.
    let mut candidates: Vec<(Option<&crate::catalog::DecryptorDef>, String)> =
        vec![(None, NO_DECRYPTOR.to_string())];
    for d in catalog.decryptors() {
        candidates.push((Some(d), d.name.clone()));
    }

    let mut product_type_id = None;
    let mut options = Vec::with_capacity(candidates.len());
    for (decryptor, name) in candidates {
        let (probability_multiplier, me_modifier, te_modifier, run_modifier) = match decryptor {
            Some(d) => (d.probability_multiplier, d.me_modifier, d.te_modifier, d.run_modifier),
            None => (1.0, 0, 0, 0),
        };
        let success_probability =
            (inv.base_probability * multiplier * probability_multiplier).clamp(0.0, 1.0);
        let expected_attempts = if success_probability > 0.0 {
            Some(1.0 / success_probability)
        } else {
            None
        };
        let invented_me = BASE_INVENTED_ME + me_modifier;
        let invented_te = BASE_INVENTED_TE + te_modifier;
        let invented_runs = (inv.output_runs + run_modifier as i64).max(1);

        let decryptor_cost = match decryptor {
            Some(d) => prices.buy_unit_price(d.type_id),
            None => Some(0.0),
        };
        let attempt_cost = match (attempt_material_cost, decryptor_cost) {
            (Some(materials), Some(consumable)) => Some(materials + consumable + fee_cost),
            _ => None,
        };
        let invention_cost_per_run = match (attempt_cost, expected_attempts) {
            (Some(cost), Some(attempts)) => Some(cost * attempts / invented_runs as f64),
            _ => None,
        };

        let manufacturing = planner
            .manufacturing_economics(inv.output_blueprint, invented_me as f64)
            .ok_or(InventionError::OutputNotManufacturable(inv.output_blueprint))?;
        product_type_id = Some(manufacturing.product_type_id);

        let net_profit_per_run = match (manufacturing.profit_per_run, invention_cost_per_run) {
            (Some(profit), Some(invention)) => Some(profit - invention),
            _ => None,
        };
        let roi_percent = match (
            net_profit_per_run,
            manufacturing.material_cost_per_run,
            invention_cost_per_run,
        ) {
            (Some(net), Some(materials), Some(invention)) => {
                let denominator = materials + invention;
                (denominator > 0.0).then(|| net / denominator * 100.0)
            }
            _ => None,
        };

        options.push(InventionOption {
            decryptor_type_id: decryptor.map(|d| d.type_id),
            decryptor_name: name,
            probability_multiplier,
            me_modifier,
            te_modifier,
            run_modifier,
            success_probability,
            expected_attempts,
            invented_me,
            invented_te,
            invented_runs,
            decryptor_cost,
            attempt_cost,
            invention_cost_per_run,
            manufacturing,
            net_profit_per_run,
            roi_percent,
        });
    }

    // Undefined keys rank below every defined value.
    let key = |v: Option<f64>| v.unwrap_or(f64::NEG_INFINITY);
    options.sort_by(|a, b| {
        key(b.roi_percent)
            .total_cmp(&key(a.roi_percent))
            .then(key(b.net_profit_per_run).total_cmp(&key(a.net_profit_per_run)))
    });

    let product_type_id =
        product_type_id.ok_or(InventionError::OutputNotManufacturable(inv.output_blueprint))?;

    Ok(InventionReport {
        blueprint_type_id: blueprint,
        output_blueprint: inv.output_blueprint,
        product_type_id,
        base_probability: inv.base_probability,
        skill_multiplier: multiplier,
        attempt_materials,
        attempt_material_cost,
        invention_fee,
        options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        BlueprintDef, Catalog, CatalogBuilder, DecryptorDef, MaterialRequirement, ProductOutput,
        ProductionData,
    };
    use crate::inventory::InventorySnapshot;
    use crate::market::{PriceQuote, PriceSnapshot};
    use crate::planner::BuildPolicy;
    use crate::profile::{CostIndices, FacilityProfile};

    const T1_BP: TypeId = TypeId(100);
    const T2_BP: TypeId = TypeId(101);
    const T2_PRODUCT: TypeId = TypeId(200);
    const DATACORE_A: TypeId = TypeId(300);
    const DATACORE_B: TypeId = TypeId(301);
    const MINERAL: TypeId = TypeId(34);
    const SKILL_SCIENCE_A: TypeId = TypeId(400);
    const SKILL_SCIENCE_B: TypeId = TypeId(401);
    const SKILL_ENCRYPTION: TypeId = TypeId(402);
    const DECRYPTOR_ACCELERANT: TypeId = TypeId(500);
    const DECRYPTOR_DOOM: TypeId = TypeId(501);

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    fn catalog() -> Catalog {
        let mut builder = CatalogBuilder::new();
        builder
            .register_blueprint(
                T1_BP,
                BlueprintDef {
                    name: "Module Blueprint".to_string(),
                    max_production_limit: 10,
                    manufacturing: None,
                    invention: Some(InventionData {
                        base_probability: 0.34,
                        materials: vec![
                            MaterialRequirement { type_id: DATACORE_A, quantity: 2 },
                            MaterialRequirement { type_id: DATACORE_B, quantity: 2 },
                        ],
                        output_blueprint: T2_BP,
                        output_runs: 10,
                        encryption_skill: Some(SKILL_ENCRYPTION),
                        science_skills: vec![SKILL_SCIENCE_A, SKILL_SCIENCE_B],
                        time_seconds: 9000.0,
                    }),
                    copying_time_seconds: Some(4800.0),
                    reaction: None,
                },
            )
            .unwrap();
        builder
            .register_blueprint(
                T2_BP,
                BlueprintDef {
                    name: "Module II Blueprint".to_string(),
                    max_production_limit: 10,
                    manufacturing: Some(ProductionData {
                        materials: vec![MaterialRequirement { type_id: MINERAL, quantity: 100 }],
                        products: vec![ProductOutput {
                            type_id: T2_PRODUCT,
                            quantity_per_run: 1,
                        }],
                        time_seconds: 1200.0,
                    }),
                    invention: None,
                    copying_time_seconds: None,
                    reaction: None,
                },
            )
            .unwrap();
        builder.register_decryptor(DecryptorDef {
            type_id: DECRYPTOR_ACCELERANT,
            name: "Accelerant Decryptor".to_string(),
            probability_multiplier: 1.2,
            me_modifier: 2,
            te_modifier: 10,
            run_modifier: 1,
        });
        builder.register_decryptor(DecryptorDef {
            type_id: DECRYPTOR_DOOM,
            name: "Doom Decryptor".to_string(),
            probability_multiplier: 0.0,
            me_modifier: 0,
            te_modifier: 0,
            run_modifier: 0,
        });
        builder.build().unwrap()
    }

    fn prices() -> PriceSnapshot {
        let mut prices = PriceSnapshot::new();
        prices.insert(DATACORE_A, PriceQuote::new(Some(50_000.0), Some(48_000.0)));
        prices.insert(DATACORE_B, PriceQuote::new(Some(30_000.0), Some(29_000.0)));
        prices.insert(MINERAL, PriceQuote::new(Some(5.0), Some(5.0)));
        prices.insert(T2_PRODUCT, PriceQuote::new(Some(2_000_000.0), None));
        prices.insert(DECRYPTOR_ACCELERANT, PriceQuote::new(Some(100_000.0), None));
        prices.insert(DECRYPTOR_DOOM, PriceQuote::new(Some(1_000.0), None));
        prices
    }

    struct Fixture {
        catalog: Catalog,
        prices: PriceSnapshot,
        inventory: InventorySnapshot,
        profile: FacilityProfile,
        policy: BuildPolicy,
        skills: CharacterSkills,
    }

    impl Fixture {
        fn new() -> Self {
            let skills = [
                (SKILL_SCIENCE_A, 4),
                (SKILL_SCIENCE_B, 4),
                (SKILL_ENCRYPTION, 3),
            ]
            .into_iter()
            .collect();
            Self {
                catalog: catalog(),
                prices: prices(),
                inventory: InventorySnapshot::new(),
                profile: FacilityProfile {
                    cost_indices: CostIndices {
                        invention: 0.02,
                        manufacturing: 0.0,
                        ..Default::default()
                    },
                    ..Default::default()
                },
                policy: BuildPolicy::default(),
                skills,
            }
        }

        fn report(&self) -> InventionReport {
            let planner = Planner::new(
                &self.catalog,
                &self.prices,
                &self.inventory,
                &self.profile,
                &self.policy,
            );
            rank_invention_options(&planner, &self.skills, T1_BP).unwrap()
        }
    }

    #[test]
    fn skill_multiplier_formula() {
        let fx = Fixture::new();
        let report = fx.report();
        // science 4+4, encryption 3: 1 + 8/30 + 3/40.
        assert_close(report.skill_multiplier, 1.0 + 8.0 / 30.0 + 3.0 / 40.0);
    }

    #[test]
    fn baseline_option_always_present() {
        let fx = Fixture::new();
        let report = fx.report();
        assert_eq!(report.options.len(), 3);
        assert!(report
            .options
            .iter()
            .any(|o| o.decryptor_type_id.is_none() && o.decryptor_name == NO_DECRYPTOR));
    }

    #[test]
    fn baseline_uses_invented_base_efficiency() {
        let fx = Fixture::new();
        let report = fx.report();
        let baseline = report
            .options
            .iter()
            .find(|o| o.decryptor_type_id.is_none())
            .unwrap();
        assert_eq!(baseline.invented_me, BASE_INVENTED_ME);
        assert_eq!(baseline.invented_te, BASE_INVENTED_TE);
        assert_eq!(baseline.invented_runs, 10);
        // ME -4: ceil(100 * 1.04) = 104 minerals per run.
        assert_eq!(baseline.manufacturing.materials[0].per_run_quantity, 104);
    }

    #[test]
    fn decryptor_modifiers_apply() {
        let fx = Fixture::new();
        let report = fx.report();
        let accelerant = report
            .options
            .iter()
            .find(|o| o.decryptor_type_id == Some(DECRYPTOR_ACCELERANT))
            .unwrap();
        assert_eq!(accelerant.invented_me, -2);
        assert_eq!(accelerant.invented_te, 6);
        assert_eq!(accelerant.invented_runs, 11);
        let expected_p = 0.34 * report.skill_multiplier * 1.2;
        assert_close(accelerant.success_probability, expected_p);
        assert_close(
            accelerant.expected_attempts.unwrap(),
            1.0 / expected_p,
        );
    }

    #[test]
    fn zero_probability_nulls_economics_but_keeps_option() {
        let fx = Fixture::new();
        let report = fx.report();
        let doom = report
            .options
            .iter()
            .find(|o| o.decryptor_type_id == Some(DECRYPTOR_DOOM))
            .unwrap();
        assert_eq!(doom.success_probability, 0.0);
        assert_eq!(doom.expected_attempts, None);
        assert_eq!(doom.invention_cost_per_run, None);
        assert_eq!(doom.net_profit_per_run, None);
        assert_eq!(doom.roi_percent, None);
        // Nulled economics sort last.
        assert_eq!(
            report.options.last().unwrap().decryptor_type_id,
            Some(DECRYPTOR_DOOM)
        );
    }

    #[test]
    fn attempt_cost_includes_fee_and_consumable() {
        let fx = Fixture::new();
        let report = fx.report();
        // Materials: 2 * 50k + 2 * 30k at buy prices.
        assert_close(report.attempt_material_cost.unwrap(), 160_000.0);
        // EIV at basis prices: 2 * 48k + 2 * 29k = 154k, fee index 2%.
        let fee = report.invention_fee.unwrap();
        assert_close(fee.job_cost_base, 154_000.0);
        assert_close(fee.total_job_cost, 154_000.0 * 0.02);
        let accelerant = report
            .options
            .iter()
            .find(|o| o.decryptor_type_id == Some(DECRYPTOR_ACCELERANT))
            .unwrap();
        assert_close(
            accelerant.attempt_cost.unwrap(),
            160_000.0 + 100_000.0 + 154_000.0 * 0.02,
        );
    }

    #[test]
    fn options_sorted_by_roi_descending() {
        let fx = Fixture::new();
        let report = fx.report();
        let defined: Vec<f64> = report
            .options
            .iter()
            .filter_map(|o| o.roi_percent)
            .collect();
        assert!(defined.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn unpriced_consumable_nulls_attempt_cost() {
        let mut fx = Fixture::new();
        fx.prices.insert(DECRYPTOR_ACCELERANT, PriceQuote::default());
        let report = fx.report();
        let accelerant = report
            .options
            .iter()
            .find(|o| o.decryptor_type_id == Some(DECRYPTOR_ACCELERANT))
            .unwrap();
        assert_eq!(accelerant.decryptor_cost, None);
        assert_eq!(accelerant.attempt_cost, None);
        assert_eq!(accelerant.roi_percent, None);
    }

    #[test]
    fn missing_invention_activity_errors() {
        let fx = Fixture::new();
        let planner = Planner::new(
            &fx.catalog,
            &fx.prices,
            &fx.inventory,
            &fx.profile,
            &fx.policy,
        );
        assert_eq!(
            rank_invention_options(&planner, &fx.skills, T2_BP).unwrap_err(),
            InventionError::NoInventionActivity(T2_BP)
        );
        assert_eq!(
            rank_invention_options(&planner, &fx.skills, TypeId(999)).unwrap_err(),
            InventionError::UnknownBlueprint(TypeId(999))
        );
    }
}
