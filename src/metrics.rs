//! Sustainability metrics derived from a packing.
//!
//! Everything here is a pure function of the packed boxes, the flat item list
//! they were packed from and the catalog. Nothing is cached.

use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::ContainerCatalog;
use crate::model::{Item, PackedContainer};
use crate::optimizer::PackingResult;

/// Efficiency and carbon figures for one packing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct Metrics {
    /// Filled volume over total box volume, in percent (0 without boxes).
    pub efficiency_percent: f64,
    /// kg CO2e for shipping the boxes as packed.
    pub carbon_impact_kg: f64,
    /// Shipping every unit in its own smallest box minus `carbon_impact_kg`.
    /// Negative when the packing is worse than shipping separately.
    pub carbon_saved_kg: f64,
    pub container_count: usize,
    /// Boxes per container type, in order of first use.
    pub breakdown: Vec<ContainerTally>,
}

impl Metrics {
    /// Metrics for a packing result and the item list it was packed from.
    pub fn for_result(result: &PackingResult, items: &[Item], catalog: &ContainerCatalog) -> Self {
        calculate_metrics(&result.containers, items, catalog)
    }

    /// Breakdown rendered as e.g. `"2x Medium, 1x Small"`.
    pub fn breakdown_label(&self) -> String {
        self.breakdown
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Number of boxes of one container type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct ContainerTally {
    pub name: String,
    pub count: usize,
}

impl std::fmt::Display for ContainerTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x {}", self.count, self.name)
    }
}

/// Computes all metrics for `containers`, packed from `items`.
///
/// # Parameters
/// * `containers` - The packed boxes (real or simulated)
/// * `items` - The flat unit list the boxes were filled from
/// * `catalog` - Catalog used for the separate-shipping baseline
pub fn calculate_metrics(
    containers: &[PackedContainer],
    items: &[Item],
    catalog: &ContainerCatalog,
) -> Metrics {
    let carbon_impact_kg = carbon_impact(containers);
    Metrics {
        efficiency_percent: packaging_efficiency(containers),
        carbon_impact_kg,
        carbon_saved_kg: separate_shipping_carbon(items, catalog) - carbon_impact_kg,
        container_count: containers.len(),
        breakdown: breakdown(containers),
    }
}

pub fn packaging_efficiency(containers: &[PackedContainer]) -> f64 {
    let capacity: f64 = containers.iter().map(|c| c.container().volume).sum();
    if capacity <= 0.0 {
        return 0.0;
    }
    let filled: f64 = containers.iter().map(PackedContainer::filled_volume).sum();
    filled / capacity * 100.0
}

/// Fixed cost per box plus weight-dependent cost, summed over all boxes.
pub fn carbon_impact(containers: &[PackedContainer]) -> f64 {
    containers
        .iter()
        .map(|c| c.container().carbon_for(c.total_weight()))
        .sum()
}

/// Carbon for shipping every unit alone in its smallest fitting box.
///
/// Units no box can hold are left out of the sum.
pub fn separate_shipping_carbon(items: &[Item], catalog: &ContainerCatalog) -> f64 {
    items
        .iter()
        .filter_map(|item| {
            catalog
                .smallest_fitting(item)
                .map(|container| container.carbon_for(item.weight))
        })
        .sum()
}

fn breakdown(containers: &[PackedContainer]) -> Vec<ContainerTally> {
    let mut tallies: Vec<ContainerTally> = Vec::new();
    for container in containers {
        let name = &container.container().name;
        match tallies.iter_mut().find(|t| &t.name == name) {
            Some(tally) => tally.count += 1,
            None => tallies.push(ContainerTally {
                name: name.clone(),
                count: 1,
            }),
        }
    }
    tallies
}
