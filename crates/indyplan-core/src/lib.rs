//! Deterministic build-vs-buy planning for industrial production chains.
//!
//! The core is a set of pure functions over immutable snapshots: a static
//! [`catalog::Catalog`] (blueprints, rigs, decryptors), a
//! [`market::PriceSnapshot`], an [`inventory::InventorySnapshot`], and a
//! caller [`profile::FacilityProfile`] + [`planner::BuildPolicy`]. Nothing
//! here performs I/O, mutates its inputs, or depends on wall-clock time;
//! identical inputs always produce identical plans.
//!
//! # Pipeline
//!
//! 1. [`resolve`] expands a target into blueprint runs and material
//!    requirements (ME and facility bonuses, cycle/depth guards).
//! 2. [`inventory`] values each requirement FIFO-first, market-second;
//!    unknowable costs stay `None` instead of guessing.
//! 3. [`fees`] prices job installation against the material EIV.
//! 4. [`planner`] decides build vs. buy per node and aggregates a
//!    [`planner::PlanResult`].
//! 5. [`flatten`] turns the decided tree into path-annotated rows with
//!    double-count-safe rollups.
//!
//! [`invention`] ranks decryptor options for a T1 blueprint by the ROI of
//! manufacturing from the invented copy, reusing the planner's per-run
//! economics. [`batch`] plans many targets against the same snapshots,
//! in parallel under the `parallel` feature.
//!
//! # Features
//!
//! - `data-loader`: JSON loading of catalogs and snapshots (serde_json).
//! - `parallel`: rayon-backed [`batch::plan_batch`].
//! - `test-utils`: shared fixtures for downstream tests.

pub mod batch;
pub mod bonus;
pub mod catalog;
pub mod fees;
pub mod flatten;
pub mod id;
pub mod invention;
pub mod inventory;
pub mod market;
pub mod planner;
pub mod profile;
pub mod resolve;

#[cfg(feature = "data-loader")]
pub mod data_loader;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use id::TypeId;
