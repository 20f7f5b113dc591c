//! Folding simulation: how many deferred units fit into boxes already opened.
//!
//! The simulation works on its own copy of the boxes and never opens a new
//! one, so it measures spare capacity only.

use tracing::debug;

use crate::model::{Item, PackedContainer};
use crate::optimizer::best_fit_index;

/// Outcome of folding units of one item type into existing boxes.
#[derive(Clone, Debug, PartialEq)]
pub struct FoldOutcome {
    /// Units that found a place (0 if none).
    pub placed: usize,
    /// Copy of the boxes including the placed units.
    pub containers: Vec<PackedContainer>,
}

impl FoldOutcome {
    /// The units that were placed, one element per unit.
    pub fn folded_units(&self, item: &Item) -> Vec<Item> {
        vec![item.clone(); self.placed]
    }
}

/// Adds up to `quantity` units of `item` to copies of `containers`, one at a
/// time, each into the box with the highest resulting fill.
///
/// Stops at the first unit that fits nowhere. `containers` itself is left
/// untouched.
pub fn simulate_fold(item: &Item, quantity: usize, containers: &[PackedContainer]) -> FoldOutcome {
    let mut simulated = containers.to_vec();
    let mut placed = 0;

    while placed < quantity {
        let Some(idx) = best_fit_index(&simulated, item) else {
            break;
        };
        if !simulated[idx].try_add(item) {
            break;
        }
        placed += 1;
    }

    debug!(
        "Folding '{}': {} of {} units fit into {} open boxes",
        item.id,
        placed,
        quantity,
        containers.len()
    );

    FoldOutcome {
        placed,
        containers: simulated,
    }
}
