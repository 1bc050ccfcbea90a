//! Shared fixtures for unit, property and integration tests.
//!
//! A small but fully wired catalog: a two-level manufacturing chain, a
//! reaction-only input, rigs, and an invention pair with decryptors.

use crate::catalog::{
    Activity, BlueprintDef, Catalog, CatalogBuilder, DecryptorDef, InventionData,
    MaterialRequirement, ProductOutput, ProductionData, RigEffectDef, RigMetric,
};
use crate::id::TypeId;
use crate::inventory::{Holding, InventoryLot, InventorySnapshot};
use crate::market::{PriceQuote, PriceSnapshot};
use crate::profile::CharacterSkills;

pub const MINERAL: TypeId = TypeId(34);
pub const COMPONENT: TypeId = TypeId(3);
pub const WIDGET: TypeId = TypeId(2);
pub const FUEL_GAS: TypeId = TypeId(7);

pub const WIDGET_BP: TypeId = TypeId(10);
pub const COMPONENT_BP: TypeId = TypeId(11);
pub const GAS_FORMULA: TypeId = TypeId(12);

pub const T2_WIDGET: TypeId = TypeId(20);
pub const T2_WIDGET_BP: TypeId = TypeId(21);
pub const DATACORE: TypeId = TypeId(30);
pub const SKILL_SCIENCE: TypeId = TypeId(40);
pub const SKILL_ENCRYPTION: TypeId = TypeId(41);
pub const DECRYPTOR: TypeId = TypeId(50);
pub const ME_RIG: TypeId = TypeId(60);

fn mats(entries: &[(TypeId, i64)]) -> Vec<MaterialRequirement> {
    entries
        .iter()
        .map(|&(type_id, quantity)| MaterialRequirement { type_id, quantity })
        .collect()
}

fn outputs(entries: &[(TypeId, i64)]) -> Vec<ProductOutput> {
    entries
        .iter()
        .map(|&(type_id, quantity_per_run)| ProductOutput {
            type_id,
            quantity_per_run,
        })
        .collect()
}

fn production(
    materials: &[(TypeId, i64)],
    products: &[(TypeId, i64)],
    time_seconds: f64,
) -> ProductionData {
    ProductionData {
        materials: mats(materials),
        products: outputs(products),
        time_seconds,
    }
}

fn bare(name: &str) -> BlueprintDef {
    BlueprintDef {
        name: name.to_string(),
        max_production_limit: 10,
        manufacturing: None,
        invention: None,
        copying_time_seconds: None,
        reaction: None,
    }
}

/// The standard fixture catalog:
///
/// - `WIDGET` = 2x `COMPONENT` + 1x `FUEL_GAS` + 50x `MINERAL` per run
/// - `COMPONENT` = 100x `MINERAL` per run
/// - `FUEL_GAS` only comes from a reaction formula
/// - `WIDGET_BP` invents `T2_WIDGET_BP` (product `T2_WIDGET`)
/// - `ME_RIG` grants 4.2% manufacturing material reduction to "Widgets"
pub fn fixture_catalog() -> Catalog {
    let mut builder = CatalogBuilder::new();
    builder.register_type(WIDGET, "Widget").unwrap();
    builder.register_type(COMPONENT, "Component").unwrap();
    builder.register_type(MINERAL, "Mineral").unwrap();
    builder.register_type(FUEL_GAS, "Fuel Gas").unwrap();
    builder.register_type(T2_WIDGET, "Widget II").unwrap();
    builder.set_rig_group(WIDGET, "Widgets");
    builder.set_rig_group(T2_WIDGET, "Widgets");

    let mut widget_bp = bare("Widget Blueprint");
    widget_bp.manufacturing = Some(production(
        &[(COMPONENT, 2), (FUEL_GAS, 1), (MINERAL, 50)],
        &[(WIDGET, 1)],
        1200.0,
    ));
    widget_bp.copying_time_seconds = Some(4800.0);
    widget_bp.invention = Some(InventionData {
        base_probability: 0.34,
        materials: mats(&[(DATACORE, 2)]),
        output_blueprint: T2_WIDGET_BP,
        output_runs: 10,
        encryption_skill: Some(SKILL_ENCRYPTION),
        science_skills: vec![SKILL_SCIENCE],
        time_seconds: 9000.0,
    });
    builder.register_blueprint(WIDGET_BP, widget_bp).unwrap();

    let mut component_bp = bare("Component Blueprint");
    component_bp.manufacturing =
        Some(production(&[(MINERAL, 100)], &[(COMPONENT, 1)], 600.0));
    component_bp.copying_time_seconds = Some(1200.0);
    builder.register_blueprint(COMPONENT_BP, component_bp).unwrap();

    let mut gas_formula = bare("Fuel Gas Reaction Formula");
    gas_formula.reaction = Some(production(&[(MINERAL, 10)], &[(FUEL_GAS, 200)], 1800.0));
    builder.register_blueprint(GAS_FORMULA, gas_formula).unwrap();

    let mut t2_bp = bare("Widget II Blueprint");
    t2_bp.manufacturing = Some(production(
        &[(MINERAL, 80), (COMPONENT, 1)],
        &[(T2_WIDGET, 1)],
        2400.0,
    ));
    builder.register_blueprint(T2_WIDGET_BP, t2_bp).unwrap();

    builder.register_rig(
        ME_RIG,
        vec![RigEffectDef {
            activity: Activity::Manufacturing,
            group: "Widgets".to_string(),
            metric: RigMetric::Material,
            reduction: 0.042,
        }],
    );
    builder.register_decryptor(DecryptorDef {
        type_id: DECRYPTOR,
        name: "Accelerant Decryptor".to_string(),
        probability_multiplier: 1.2,
        me_modifier: 2,
        te_modifier: 10,
        run_modifier: 1,
    });

    builder.build().expect("fixture catalog is valid")
}

/// Price snapshot where each entry's average and adjusted agree.
pub fn flat_prices(entries: &[(TypeId, f64)]) -> PriceSnapshot {
    entries
        .iter()
        .map(|&(type_id, price)| (type_id, PriceQuote::new(Some(price), Some(price))))
        .collect()
}

/// Sensible default prices for the fixture catalog.
pub fn fixture_prices() -> PriceSnapshot {
    flat_prices(&[
        (MINERAL, 5.0),
        (COMPONENT, 900.0),
        (FUEL_GAS, 40.0),
        (WIDGET, 4000.0),
        (T2_WIDGET, 60_000.0),
        (DATACORE, 60_000.0),
        (DECRYPTOR, 120_000.0),
    ])
}

/// Inventory snapshot from `(type, on_hand, lots)` triples.
pub fn inventory(entries: &[(TypeId, i64, &[(i64, f64)])]) -> InventorySnapshot {
    let mut snapshot = InventorySnapshot::new();
    for &(type_id, on_hand, lots) in entries {
        let lots = lots
            .iter()
            .enumerate()
            .map(|(i, &(quantity, unit_cost))| {
                InventoryLot::new(quantity, unit_cost).acquired_at(i as u64)
            })
            .collect();
        snapshot.insert(type_id, Holding::new(on_hand, lots));
    }
    snapshot
}

/// Skills trained to useful levels for the fixture invention pair.
pub fn fixture_skills() -> CharacterSkills {
    [(SKILL_SCIENCE, 4), (SKILL_ENCRYPTION, 3)]
        .into_iter()
        .collect()
}
