//! Position planning for ordered sequences.
//!
//! Everything here is a pure function over a snapshot of one sequence,
//! sorted ascending by position. Stores call these inside their unit of
//! work and write back only the returned updates.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{BulkPlan, BulkReorderMode, OrderedItem, PositionUpdate},
};

/// Converts a client-supplied position into a stored one
pub fn parse_position(raw: i64) -> AppResult<i32> {
    if raw < 1 {
        return Err(AppError::InvalidInput(
            "Position must be a positive integer".to_string(),
        ));
    }
    i32::try_from(raw).map_err(|_| AppError::InvalidInput("Position is too large".to_string()))
}

/// Narrows a requested move target to `i32`.
///
/// Values outside `i32` saturate, so `plan_move` still reports them against
/// the sequence length.
pub fn move_target(raw: i64) -> i32 {
    raw.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Position for an item appended to the end of `items`
pub fn next_position(items: &[OrderedItem]) -> i32 {
    items.iter().map(|item| item.position).max().unwrap_or(0) + 1
}

/// Plans moving `item_id` to the 1-based `new_position`.
///
/// The resulting sequence is `1..=N` with the moved item at exactly
/// `new_position`. Only rows whose position changes are returned, so a
/// no-op move yields an empty plan.
pub fn plan_move(
    items: &[OrderedItem],
    item_id: Uuid,
    new_position: i32,
) -> AppResult<Vec<PositionUpdate>> {
    if new_position < 1 {
        return Err(AppError::InvalidInput(
            "Position must be a positive integer".to_string(),
        ));
    }

    let current_index = items
        .iter()
        .position(|item| item.id == item_id)
        .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))?;

    let count = items.len();
    if new_position as usize > count {
        return Err(AppError::InvalidInput(format!(
            "Position must be between 1 and {}",
            count
        )));
    }

    let mut ordering: Vec<&OrderedItem> = items.iter().collect();
    let moved = ordering.remove(current_index);
    ordering.insert(new_position as usize - 1, moved);

    let updates = ordering
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let position = index as i32 + 1;
            (item.position != position).then(|| PositionUpdate::new(item.id, position))
        })
        .collect();

    Ok(updates)
}

/// Plans a client-supplied bulk ordering.
///
/// Entries naming ids outside the sequence are collected in `failed_ids`.
/// In `Lenient` mode the remaining entries are still planned; `Atomic` and
/// `Strict` reject the batch instead. `Strict` additionally requires the
/// batch to be a permutation of `1..=N` over every item.
pub fn plan_bulk(
    items: &[OrderedItem],
    entries: &[PositionUpdate],
    mode: BulkReorderMode,
) -> AppResult<BulkPlan> {
    if entries.is_empty() {
        return Err(AppError::InvalidInput("Items array is required".to_string()));
    }

    if entries.iter().any(|entry| entry.position < 1) {
        return Err(AppError::InvalidInput(
            "Positions must be positive integers".to_string(),
        ));
    }

    let current: HashMap<Uuid, i32> = items.iter().map(|item| (item.id, item.position)).collect();

    let mut failed_ids = Vec::new();
    for entry in entries {
        if !current.contains_key(&entry.id) && !failed_ids.contains(&entry.id) {
            failed_ids.push(entry.id);
        }
    }

    if mode != BulkReorderMode::Lenient && !failed_ids.is_empty() {
        return Err(AppError::PartialReorder {
            message: "Some items do not belong to this collection".to_string(),
            failed_ids,
        });
    }

    if mode == BulkReorderMode::Strict {
        check_permutation(items.len(), entries)?;
    }

    // Last entry wins for repeated ids
    let targets: HashMap<Uuid, i32> = entries
        .iter()
        .filter(|entry| current.contains_key(&entry.id))
        .map(|entry| (entry.id, entry.position))
        .collect();

    let mut seen = HashSet::new();
    let updates = entries
        .iter()
        .filter(|entry| seen.insert(entry.id))
        .filter_map(|entry| {
            let target = *targets.get(&entry.id)?;
            (current[&entry.id] != target).then(|| PositionUpdate::new(entry.id, target))
        })
        .collect();

    Ok(BulkPlan {
        updates,
        failed_ids,
    })
}

fn check_permutation(count: usize, entries: &[PositionUpdate]) -> AppResult<()> {
    let ids: HashSet<Uuid> = entries.iter().map(|entry| entry.id).collect();
    let positions: HashSet<i32> = entries.iter().map(|entry| entry.position).collect();

    let complete = entries.len() == count
        && ids.len() == count
        && positions.len() == count
        && positions.iter().all(|&p| p >= 1 && p as usize <= count);

    if complete {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "Reorder must assign each of the {} items a unique position between 1 and {}",
            count, count
        )))
    }
}

/// Applies planned updates to an in-memory snapshot and re-sorts it
pub fn apply_updates(items: &mut [OrderedItem], updates: &[PositionUpdate]) {
    let targets: HashMap<Uuid, i32> = updates.iter().map(|u| (u.id, u.position)).collect();
    for item in items.iter_mut() {
        if let Some(&position) = targets.get(&item.id) {
            item.position = position;
        }
    }
    items.sort_by(|a, b| {
        (a.position, a.created_at, a.id).cmp(&(b.position, b.created_at, b.id))
    });
}
