//! Packing engine: assigns a flat list of items to shipping boxes.
//!
//! Two phases:
//! - Try to put everything into a single box, smallest catalog type first
//! - Otherwise place items largest first with a best-fit rule, opening the
//!   smallest suitable box when no open box accepts the item, and backfill the
//!   chosen box with pending items after every placement
//!
//! The algorithm is deterministic. Items that no catalog type can ever hold are
//! returned as `unpackable` instead of being dropped.

use std::cmp::Ordering;
use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::catalog::ContainerCatalog;
use crate::fit::{FillState, can_add};
use crate::model::{ContainerType, Item, PackedContainer};
use crate::types::{Dimensional, EPSILON_GENERAL};

/// Result of a packing run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct PackingResult {
    pub containers: Vec<PackedContainer>,
    pub unpackable: Vec<UnpackableItem>,
}

impl PackingResult {
    /// Indicates whether every requested unit was packed.
    pub fn is_complete(&self) -> bool {
        self.unpackable.is_empty()
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn unpackable_count(&self) -> usize {
        self.unpackable.len()
    }

    /// Number of units that ended up in a box.
    pub fn packed_unit_count(&self) -> usize {
        self.containers.iter().map(|c| c.items().len()).sum()
    }
}

/// Unit that no catalog type can hold, even in an empty box.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct UnpackableItem {
    pub item: Item,
    pub reason: UnpackableReason,
}

/// Why an item could not be assigned to any box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnpackableReason {
    TooHeavy,
    DimensionsExceed,
    VolumeExceeds,
}

impl UnpackableReason {
    pub fn code(&self) -> &'static str {
        match self {
            UnpackableReason::TooHeavy => "too_heavy",
            UnpackableReason::DimensionsExceed => "dimensions_exceed",
            UnpackableReason::VolumeExceeds => "volume_exceeds",
        }
    }
}

impl std::fmt::Display for UnpackableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnpackableReason::TooHeavy => {
                write!(f, "Item exceeds the weight limit of every container type")
            }
            UnpackableReason::DimensionsExceed => {
                write!(
                    f,
                    "Item exceeds at least one dimension of every container type"
                )
            }
            UnpackableReason::VolumeExceeds => {
                write!(f, "Item exceeds the usable volume of every container type")
            }
        }
    }
}

pub(crate) fn determine_unpackable_reason(
    catalog: &ContainerCatalog,
    item: &Item,
) -> UnpackableReason {
    let weight_blocked = catalog
        .entries()
        .iter()
        .all(|ct| item.weight > ct.max_weight + EPSILON_GENERAL);
    if weight_blocked {
        return UnpackableReason::TooHeavy;
    }

    let dimension_blocked = catalog
        .entries()
        .iter()
        .all(|ct| !item.fits_in(&ct.dimensions(), EPSILON_GENERAL));
    if dimension_blocked {
        return UnpackableReason::DimensionsExceed;
    }

    UnpackableReason::VolumeExceeds
}

/// Events emitted while packing, for live progress reporting.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// A new box was opened.
    ContainerOpened { container_index: usize, name: String },
    /// A unit was assigned to a box.
    ItemPlaced {
        container_index: usize,
        item_id: String,
        fill_percent: f64,
        total_weight: f64,
    },
    /// A unit cannot be held by any catalog type.
    ItemRejected {
        item_id: String,
        reason_code: String,
        reason_text: String,
    },
    /// Packing finished.
    Finished {
        containers: usize,
        unpackable: usize,
    },
}

/// Packs `items` (one element per physical unit) into boxes from `catalog`.
///
/// # Parameters
/// * `items` - Flat list of units to pack
/// * `catalog` - Available box types
///
/// # Returns
/// `PackingResult` with the filled boxes and any unpackable units
pub fn pack_items(items: &[Item], catalog: &ContainerCatalog) -> PackingResult {
    pack_items_with_progress(items, catalog, |_| {})
}

/// Like `pack_items`, reporting every step through `on_event`.
pub fn pack_items_with_progress(
    items: &[Item],
    catalog: &ContainerCatalog,
    mut on_event: impl FnMut(&PackEvent),
) -> PackingResult {
    if items.is_empty() {
        on_event(&PackEvent::Finished {
            containers: 0,
            unpackable: 0,
        });
        return PackingResult::default();
    }

    let sorted = sort_by_volume_desc(items);

    if let Some(single) = pack_single_container(&sorted, catalog) {
        debug!(
            "All {} units fit into one {} box",
            sorted.len(),
            single.container().name
        );
        on_event(&PackEvent::ContainerOpened {
            container_index: 0,
            name: single.container().name.clone(),
        });
        let mut fill = FillState::EMPTY;
        for item in single.items() {
            fill = fill.with(item);
            on_event(&PackEvent::ItemPlaced {
                container_index: 0,
                item_id: item.id.clone(),
                fill_percent: fill.volume / single.container().volume * 100.0,
                total_weight: fill.weight,
            });
        }
        on_event(&PackEvent::Finished {
            containers: 1,
            unpackable: 0,
        });
        return PackingResult {
            containers: vec![single],
            unpackable: Vec::new(),
        };
    }

    debug!(
        "No single box holds all {} units, falling back to best-fit",
        sorted.len()
    );
    let result = pack_best_fit(sorted, catalog, &mut on_event);
    on_event(&PackEvent::Finished {
        containers: result.container_count(),
        unpackable: result.unpackable_count(),
    });
    result
}

/// Stable sort, largest volume first.
fn sort_by_volume_desc(items: &[Item]) -> Vec<Item> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| b.volume().partial_cmp(&a.volume()).unwrap_or(Ordering::Equal));
    sorted
}

/// Phase 1: smallest catalog type that holds every unit at once.
fn pack_single_container(sorted: &[Item], catalog: &ContainerCatalog) -> Option<PackedContainer> {
    let container = catalog.ascending().find(|ct| {
        let mut fill = FillState::EMPTY;
        sorted.iter().all(|item| {
            let fits = can_add(item, ct, fill);
            fill = fill.with(item);
            fits
        })
    })?;

    let mut packed = PackedContainer::new(container.clone());
    for item in sorted {
        let placed = packed.try_add(item);
        debug_assert!(placed, "phase 1 accepted a unit the box refuses");
    }
    Some(packed)
}

/// Phase 2: best-fit over open boxes with backfilling after each placement.
fn pack_best_fit(
    sorted: Vec<Item>,
    catalog: &ContainerCatalog,
    on_event: &mut impl FnMut(&PackEvent),
) -> PackingResult {
    let mut pending: VecDeque<Item> = sorted.into();
    let mut containers: Vec<PackedContainer> = Vec::new();
    let mut unpackable: Vec<UnpackableItem> = Vec::new();

    while let Some(item) = pending.pop_front() {
        let target = match best_fit_index(&containers, &item) {
            Some(idx) => idx,
            None => match catalog.smallest_fitting(&item) {
                Some(container) => open_container(&mut containers, container, on_event),
                None => {
                    reject(catalog, item, &mut unpackable, on_event);
                    continue;
                }
            },
        };

        place(&mut containers[target], target, &item, on_event);
        backfill(&mut containers[target], target, &mut pending, on_event);
    }

    PackingResult {
        containers,
        unpackable,
    }
}

/// Index of the open box that reaches the highest fill after taking `item`.
///
/// Only boxes passing the fit predicate are considered. On equal fill the
/// earlier box wins.
pub(crate) fn best_fit_index(containers: &[PackedContainer], item: &Item) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (idx, container) in containers.iter().enumerate() {
        if !container.can_accept(item) {
            continue;
        }
        let fill = container.fill_percent_with(item);
        match best {
            Some((_, current)) if fill <= current + EPSILON_GENERAL => {}
            _ => best = Some((idx, fill)),
        }
    }

    best.map(|(idx, _)| idx)
}

fn open_container(
    containers: &mut Vec<PackedContainer>,
    container: &ContainerType,
    on_event: &mut impl FnMut(&PackEvent),
) -> usize {
    let index = containers.len();
    debug!("Opening {} box #{}", container.name, index + 1);
    on_event(&PackEvent::ContainerOpened {
        container_index: index,
        name: container.name.clone(),
    });
    containers.push(PackedContainer::new(container.clone()));
    index
}

fn place(
    container: &mut PackedContainer,
    index: usize,
    item: &Item,
    on_event: &mut impl FnMut(&PackEvent),
) {
    let placed = container.try_add(item);
    debug_assert!(placed, "selected box refuses the unit");
    on_event(&PackEvent::ItemPlaced {
        container_index: index,
        item_id: item.id.clone(),
        fill_percent: container.fill_percent(),
        total_weight: container.total_weight(),
    });
}

/// Moves every pending unit that still fits into `container`, keeping the
/// relative order of the rest.
fn backfill(
    container: &mut PackedContainer,
    index: usize,
    pending: &mut VecDeque<Item>,
    on_event: &mut impl FnMut(&PackEvent),
) {
    let mut remaining = VecDeque::with_capacity(pending.len());
    for candidate in pending.drain(..) {
        if container.can_accept(&candidate) {
            place(container, index, &candidate, on_event);
        } else {
            remaining.push_back(candidate);
        }
    }
    *pending = remaining;
}

fn reject(
    catalog: &ContainerCatalog,
    item: Item,
    unpackable: &mut Vec<UnpackableItem>,
    on_event: &mut impl FnMut(&PackEvent),
) {
    let reason = determine_unpackable_reason(catalog, &item);
    warn!(
        "⚠️ Item '{}' ({}) cannot be packed: {}",
        item.label,
        item.id,
        reason
    );
    on_event(&PackEvent::ItemRejected {
        item_id: item.id.clone(),
        reason_code: reason.code().to_string(),
        reason_text: reason.to_string(),
    });
    unpackable.push(UnpackableItem { item, reason });
}
