//! Block integrity recalculation after a component list change.
//!
//! The host derives mass, integrity and the build thresholds from a block's
//! component list once, when definitions load. Any later edit to the list has
//! to be followed by [`recalculate`] or the block's physics and weld progress
//! go out of sync with what the player actually has to weld in.
//!
//! Accumulation follows list order. The critical and ownership thresholds are
//! snapshots of the running total, so reordering components changes them.

use crate::blocks::{
    BlockDescriptor, ComponentEntry, ComponentHandle, DerivedAttributes, ItemHandle,
};

/// Recompute derived attributes from a component list.
///
/// Reads only the component list and the previous ratios in `old`:
/// - integrity accrual rate keeps the old time-to-build under the new total
/// - a non-default max integrity ratio is rescaled to the new total; the
///   deformation ratio is rescaled using the old ratio
/// - critical integrity is the total accumulated before the entry at
///   `critical_group_index`
/// - ownership integrity is the total accumulated before the first
///   ownership-granting entry, plus one unit of it
///
/// Returns `old` unchanged when the list is empty or contributes no
/// integrity at all.
///
/// Repeated calls are stable for every field except `deformation_ratio` when
/// `max_integrity_ratio != 1.0`: that field is multiplied by the ratio and
/// divided by the total again on each call.
pub fn recalculate(old: &DerivedAttributes, components: &[ComponentEntry]) -> DerivedAttributes {
    if components.is_empty() {
        return *old;
    }

    let mut mass = 0.0f32;
    let mut max_integrity = 0.0f32;
    let mut critical_integrity = 0.0f32;
    let mut ownership_integrity = 0.0f32;

    for (index, entry) in components.iter().enumerate() {
        let definition = &entry.definition;
        let count = entry.count as f32;

        if definition.grants_ownership() && ownership_integrity == 0.0 {
            ownership_integrity = max_integrity + definition.max_integrity;
        }
        if index == old.critical_group_index {
            critical_integrity = max_integrity;
        }

        max_integrity += count * definition.max_integrity;
        mass += count * definition.mass;
    }

    if max_integrity <= 0.0 {
        return *old;
    }

    let mut new = *old;
    new.mass = mass;
    new.max_integrity = max_integrity;

    // Seconds to weld from zero to full.
    let build_time = old.max_integrity / old.integrity_accrual_rate;
    if build_time.is_finite() && build_time > 0.0 {
        new.integrity_accrual_rate = max_integrity / build_time;
    }

    if old.max_integrity_ratio != 1.0 {
        new.max_integrity_ratio = old.max_integrity_ratio * old.max_integrity / max_integrity;
        new.deformation_ratio = old.deformation_ratio * old.max_integrity_ratio / max_integrity;
    }

    new.critical_integrity_ratio = critical_integrity / max_integrity;
    new.ownership_integrity_ratio = ownership_integrity / max_integrity;
    new
}

/// Recompute `block.attributes` in place from `block.components`.
pub fn sync_component_changes(block: &mut BlockDescriptor) {
    let bears_integrity = block
        .components
        .iter()
        .any(|c| c.count > 0 && c.definition.max_integrity > 0.0);
    if !block.components.is_empty() && !bears_integrity {
        log::warn!(
            "BuildRestrictions: {} has no integrity-bearing components, attributes left unchanged",
            block.id()
        );
    }
    block.attributes = recalculate(&block.attributes, &block.components);
}

/// Put `count` units of `component` at the front of the block's build list.
///
/// Existing entries move back one slot, so the critical group index follows
/// them. The entry deconstructs into `deconstruct_item`, or into the component
/// itself when none is given. Attributes are recalculated before returning.
pub fn prepend_component(
    block: &mut BlockDescriptor,
    component: ComponentHandle,
    count: u32,
    deconstruct_item: Option<ItemHandle>,
) {
    let mut entry = ComponentEntry::new(component, count);
    if let Some(item) = deconstruct_item {
        entry = entry.with_deconstruct_item(item);
    }
    block.components.insert(0, entry);
    block.attributes.critical_group_index += 1;

    sync_component_changes(block);
}
