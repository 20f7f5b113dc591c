//! Suggestions for folding deferred items into the boxes the cart already needs.
//!
//! Every deferred item type is evaluated on its own against the same baseline
//! packing of the cart. Interactions between deferred types are ignored.

use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use crate::catalog::ContainerCatalog;
use crate::consolidation::simulate_fold;
use crate::metrics::{Metrics, calculate_metrics, carbon_impact};
use crate::model::Item;
use crate::optimizer::{
    PackingResult, UnpackableReason, determine_unpackable_reason, pack_items,
};
use crate::store::Selection;

/// Thresholds below which an improvement is not worth suggesting.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SuggestionConfig {
    /// Minimum kg CO2e saved by folding.
    pub min_carbon_saved: f64,
    /// Minimum efficiency gain in percentage points.
    pub min_efficiency_gain: f64,
}

impl SuggestionConfig {
    pub const DEFAULT_MIN_CARBON_SAVED: f64 = 0.01;
    pub const DEFAULT_MIN_EFFICIENCY_GAIN: f64 = 0.1;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> SuggestionConfigBuilder {
        SuggestionConfigBuilder::default()
    }

    fn is_worthwhile(&self, carbon_saved: f64, efficiency_gain: f64) -> bool {
        carbon_saved > self.min_carbon_saved || efficiency_gain > self.min_efficiency_gain
    }
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            min_carbon_saved: Self::DEFAULT_MIN_CARBON_SAVED,
            min_efficiency_gain: Self::DEFAULT_MIN_EFFICIENCY_GAIN,
        }
    }
}

/// Builder for `SuggestionConfig`.
#[derive(Clone, Debug, Default)]
pub struct SuggestionConfigBuilder {
    config: SuggestionConfig,
}

impl SuggestionConfigBuilder {
    pub fn min_carbon_saved(mut self, value: f64) -> Self {
        self.config.min_carbon_saved = value;
        self
    }

    pub fn min_efficiency_gain(mut self, value: f64) -> Self {
        self.config.min_efficiency_gain = value;
        self
    }

    pub fn build(self) -> SuggestionConfig {
        self.config
    }
}

/// A proposal for one deferred item type.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Suggestion {
    /// Some units can ride along in the boxes already needed.
    Foldable {
        item: Item,
        /// Units that fit into the existing boxes.
        quantity: usize,
        /// Units currently held in the deferred pool.
        held_quantity: usize,
        /// Combined efficiency minus baseline efficiency, in percentage points.
        efficiency_gain_percent: f64,
        /// Baseline plus separately shipped units, minus the combined shipment.
        carbon_saved_kg: f64,
        resulting_efficiency_percent: f64,
        /// Unchanged from the baseline; folding never opens a box.
        container_count: usize,
    },
    /// Not a single unit fits.
    Rejected { item: Item, reason: RejectReason },
}

impl Suggestion {
    pub fn item(&self) -> &Item {
        match self {
            Suggestion::Foldable { item, .. } | Suggestion::Rejected { item, .. } => item,
        }
    }

    pub fn is_foldable(&self) -> bool {
        matches!(self, Suggestion::Foldable { .. })
    }
}

/// Why a deferred item cannot be folded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The cart needs no boxes at all.
    NoOpenContainers,
    /// The boxes the cart needs have no room for even one unit.
    NoFreeCapacity,
    /// No catalog box could hold a single unit, even empty.
    Unpackable(UnpackableReason),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::NoOpenContainers => write!(f, "There are no boxes to add it to"),
            RejectReason::NoFreeCapacity => {
                write!(f, "Does not fit into the boxes already in use")
            }
            RejectReason::Unpackable(reason) => reason.fmt(f),
        }
    }
}

/// Baseline packing of the cart together with the folding suggestions.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct SuggestionReport {
    pub packing: PackingResult,
    pub metrics: Metrics,
    pub suggestions: Vec<Suggestion>,
}

/// Packs the cart and evaluates every deferred selection against it.
///
/// # Parameters
/// * `cart_items` - Flat unit list of the cart
/// * `deferred` - Quantity-tagged deferred item types, in display order
/// * `catalog` - Available box types
/// * `config` - Thresholds for suppressing negligible improvements
pub fn suggest(
    cart_items: &[Item],
    deferred: &[Selection],
    catalog: &ContainerCatalog,
    config: &SuggestionConfig,
) -> SuggestionReport {
    let packing = pack_items(cart_items, catalog);
    let metrics = Metrics::for_result(&packing, cart_items, catalog);

    let suggestions = deferred
        .iter()
        .filter(|selection| selection.quantity > 0)
        .filter_map(|selection| {
            evaluate_deferred(selection, cart_items, &packing, &metrics, catalog, config)
        })
        .collect();

    SuggestionReport {
        packing,
        metrics,
        suggestions,
    }
}

fn evaluate_deferred(
    selection: &Selection,
    cart_items: &[Item],
    baseline: &PackingResult,
    baseline_metrics: &Metrics,
    catalog: &ContainerCatalog,
    config: &SuggestionConfig,
) -> Option<Suggestion> {
    let item = &selection.item;
    let held_quantity = selection.quantity as usize;
    let outcome = simulate_fold(item, held_quantity, &baseline.containers);

    if outcome.placed == 0 {
        let reason = if catalog.smallest_fitting(item).is_none() {
            RejectReason::Unpackable(determine_unpackable_reason(catalog, item))
        } else if baseline.containers.is_empty() {
            RejectReason::NoOpenContainers
        } else {
            RejectReason::NoFreeCapacity
        };
        return Some(Suggestion::Rejected {
            item: item.clone(),
            reason,
        });
    }

    let folded = outcome.folded_units(item);
    let combined_items: Vec<Item> = cart_items.iter().chain(folded.iter()).cloned().collect();
    let combined = calculate_metrics(&outcome.containers, &combined_items, catalog);

    let separate = pack_items(&folded, catalog);
    let separate_carbon = carbon_impact(&separate.containers);

    let carbon_saved_kg =
        baseline_metrics.carbon_impact_kg + separate_carbon - combined.carbon_impact_kg;
    let efficiency_gain_percent = combined.efficiency_percent - baseline_metrics.efficiency_percent;

    if !config.is_worthwhile(carbon_saved_kg, efficiency_gain_percent) {
        debug!(
            "Suppressing fold of '{}': {:.4} kg saved, {:.4} pp gained",
            item.id, carbon_saved_kg, efficiency_gain_percent
        );
        return None;
    }

    Some(Suggestion::Foldable {
        item: item.clone(),
        quantity: outcome.placed,
        held_quantity,
        efficiency_gain_percent,
        carbon_saved_kg,
        resulting_efficiency_percent: combined.efficiency_percent,
        container_count: baseline_metrics.container_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContainerType;

    const TOLERANCE: f64 = 1e-9;

    fn item(id: &str, dims: (f64, f64, f64), weight: f64) -> Item {
        Item::new(id, id, dims, weight).unwrap()
    }

    fn book() -> Item {
        item("book", (25.0, 18.0, 4.0), 0.8)
    }

    fn mug() -> Item {
        item("mug", (12.0, 9.0, 10.0), 0.4)
    }

    fn held(item: Item, quantity: u32) -> Selection {
        Selection { item, quantity }
    }

    #[test]
    fn empty_pool_yields_no_suggestions() {
        let report = suggest(
            &[book()],
            &[],
            &ContainerCatalog::builtin(),
            &SuggestionConfig::default(),
        );
        assert!(report.suggestions.is_empty());
        assert_eq!(report.metrics.container_count, 1);
    }

    #[test]
    fn mugs_fold_into_the_book_box() {
        let report = suggest(
            &[book()],
            &[held(mug(), 5)],
            &ContainerCatalog::builtin(),
            &SuggestionConfig::default(),
        );

        assert_eq!(report.suggestions.len(), 1);
        match &report.suggestions[0] {
            Suggestion::Foldable {
                item,
                quantity,
                held_quantity,
                efficiency_gain_percent,
                carbon_saved_kg,
                resulting_efficiency_percent,
                container_count,
            } => {
                assert_eq!(item.id, "mug");
                assert_eq!(*quantity, 3);
                assert_eq!(*held_quantity, 5);
                // 1800 / 6000 -> 5040 / 6000
                assert!((efficiency_gain_percent - 54.0).abs() < TOLERANCE);
                assert!((resulting_efficiency_percent - 84.0).abs() < TOLERANCE);
                // 0.16 baseline + 0.18 separately - 0.22 combined
                assert!((carbon_saved_kg - 0.12).abs() < TOLERANCE);
                assert_eq!(*container_count, 1);
            }
            other => panic!("expected a foldable suggestion, got {:?}", other),
        }
    }

    #[test]
    fn item_without_room_is_rejected() {
        let keyboard = item("keyboard", (45.0, 15.0, 4.0), 1.0);
        let report = suggest(
            &[book()],
            &[held(keyboard, 1)],
            &ContainerCatalog::builtin(),
            &SuggestionConfig::default(),
        );

        assert_eq!(
            report.suggestions,
            vec![Suggestion::Rejected {
                item: item("keyboard", (45.0, 15.0, 4.0), 1.0),
                reason: RejectReason::NoFreeCapacity,
            }]
        );
    }

    #[test]
    fn empty_cart_has_nothing_to_fold_into() {
        let report = suggest(
            &[],
            &[held(mug(), 2)],
            &ContainerCatalog::builtin(),
            &SuggestionConfig::default(),
        );

        assert!(report.packing.containers.is_empty());
        assert!(matches!(
            report.suggestions.as_slice(),
            [Suggestion::Rejected {
                reason: RejectReason::NoOpenContainers,
                ..
            }]
        ));
    }

    #[test]
    fn deferred_types_are_evaluated_independently() {
        let jar = item("jar", (12.0, 9.0, 10.0), 0.5);
        let report = suggest(
            &[book()],
            &[held(mug(), 3), held(jar, 3)],
            &ContainerCatalog::builtin(),
            &SuggestionConfig::default(),
        );

        // Together they would not fit, but each is checked against the
        // untouched baseline.
        let folded: Vec<(&str, usize)> = report
            .suggestions
            .iter()
            .map(|s| match s {
                Suggestion::Foldable { item, quantity, .. } => (item.id.as_str(), *quantity),
                Suggestion::Rejected { item, .. } => (item.id.as_str(), 0),
            })
            .collect();
        assert_eq!(folded, vec![("mug", 3), ("jar", 3)]);
        assert_eq!(report.packing.containers[0].items().len(), 1);
    }

    #[test]
    fn negligible_improvements_are_suppressed() {
        let crate_type =
            ContainerType::new("Crate", (60.0, 40.0, 30.0), 72000.0, 22.0, 0.0, 0.05).unwrap();
        let catalog = ContainerCatalog::new(vec![crate_type]).unwrap();
        let block = item("block", (50.0, 30.0, 20.0), 5.0);
        let pebble = item("pebble", (1.0, 1.0, 1.0), 0.01);

        let report = suggest(
            &[block],
            &[held(pebble, 1)],
            &catalog,
            &SuggestionConfig::default(),
        );
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn either_threshold_alone_is_enough() {
        let config = SuggestionConfig::default();
        assert!(config.is_worthwhile(0.02, 0.0));
        assert!(config.is_worthwhile(0.0, 0.2));
        assert!(config.is_worthwhile(-0.5, 0.2));
        assert!(!config.is_worthwhile(0.01, 0.1));
        assert!(!config.is_worthwhile(0.0, 0.0));
    }

    #[test]
    fn carbon_savings_alone_make_a_fold_worthwhile() {
        let crate_type =
            ContainerType::new("Crate", (60.0, 40.0, 30.0), 72000.0, 22.0, 0.5, 0.0).unwrap();
        let catalog = ContainerCatalog::new(vec![crate_type]).unwrap();
        let block = item("block", (50.0, 30.0, 20.0), 5.0);
        let pebble = item("pebble", (1.0, 1.0, 1.0), 0.01);

        let report = suggest(
            &[block],
            &[held(pebble, 1)],
            &catalog,
            &SuggestionConfig::default(),
        );

        match report.suggestions.as_slice() {
            [
                Suggestion::Foldable {
                    efficiency_gain_percent,
                    carbon_saved_kg,
                    ..
                },
            ] => {
                assert!(*efficiency_gain_percent < 0.1);
                // The pebble would need its own crate otherwise.
                assert!((carbon_saved_kg - 0.5).abs() < TOLERANCE);
            }
            other => panic!("expected one foldable suggestion, got {:?}", other),
        }
    }

    #[test]
    fn efficiency_gain_alone_makes_a_fold_worthwhile() {
        let crate_type =
            ContainerType::new("Crate", (60.0, 40.0, 30.0), 72000.0, 22.0, 0.0, 0.05).unwrap();
        let catalog = ContainerCatalog::new(vec![crate_type]).unwrap();
        let block = item("block", (50.0, 30.0, 20.0), 5.0);
        let cube = item("cube", (10.0, 10.0, 10.0), 0.01);

        let report = suggest(
            &[block],
            &[held(cube, 1)],
            &catalog,
            &SuggestionConfig::default(),
        );

        match report.suggestions.as_slice() {
            [
                Suggestion::Foldable {
                    efficiency_gain_percent,
                    carbon_saved_kg,
                    ..
                },
            ] => {
                // 1000 / 72000
                assert!((efficiency_gain_percent - 1000.0 / 720.0).abs() < TOLERANCE);
                assert!(carbon_saved_kg.abs() < TOLERANCE);
            }
            other => panic!("expected one foldable suggestion, got {:?}", other),
        }
    }

    #[test]
    fn items_no_box_can_hold_report_the_cause() {
        let anvil = item("anvil", (20.0, 10.0, 10.0), 30.0);
        let surfboard = item("surfboard", (200.0, 50.0, 8.0), 4.0);

        let report = suggest(
            &[book()],
            &[held(anvil, 1), held(surfboard, 1)],
            &ContainerCatalog::builtin(),
            &SuggestionConfig::default(),
        );
        let reasons: Vec<RejectReason> = report
            .suggestions
            .iter()
            .filter_map(|s| match s {
                Suggestion::Rejected { reason, .. } => Some(*reason),
                Suggestion::Foldable { .. } => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                RejectReason::Unpackable(UnpackableReason::TooHeavy),
                RejectReason::Unpackable(UnpackableReason::DimensionsExceed),
            ]
        );

        let empty_cart = suggest(
            &[],
            &[held(item("anvil", (20.0, 10.0, 10.0), 30.0), 1)],
            &ContainerCatalog::builtin(),
            &SuggestionConfig::default(),
        );
        assert!(matches!(
            empty_cart.suggestions.as_slice(),
            [Suggestion::Rejected {
                reason: RejectReason::Unpackable(UnpackableReason::TooHeavy),
                ..
            }]
        ));
        assert_eq!(
            RejectReason::Unpackable(UnpackableReason::TooHeavy).to_string(),
            UnpackableReason::TooHeavy.to_string()
        );
    }

    #[test]
    fn thresholds_are_configurable() {
        let strict = SuggestionConfig::builder()
            .min_carbon_saved(10.0)
            .min_efficiency_gain(90.0)
            .build();

        let report = suggest(
            &[book()],
            &[held(mug(), 5)],
            &ContainerCatalog::builtin(),
            &strict,
        );
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn zero_quantity_selections_are_skipped() {
        let report = suggest(
            &[book()],
            &[held(mug(), 0)],
            &ContainerCatalog::builtin(),
            &SuggestionConfig::default(),
        );
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn suggestion_accessors() {
        let rejected = Suggestion::Rejected {
            item: mug(),
            reason: RejectReason::NoFreeCapacity,
        };
        assert_eq!(rejected.item().id, "mug");
        assert!(!rejected.is_foldable());
        assert_eq!(
            RejectReason::NoFreeCapacity.to_string(),
            "Does not fit into the boxes already in use"
        );
    }
}
