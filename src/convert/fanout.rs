//! One-record-per-unit expansion for backends that store a single unit per
//! rental. Flat amounts (deposit, flat discount) are split evenly by unit and
//! the last record absorbs the rounding remainder, so the parts always add
//! back up to the original.

use crate::backend::RentalDraft;

/// Split `amount` into `units` parts summing exactly to `amount`
pub fn split_evenly(amount: f64, units: u32) -> Vec<f64> {
    if units == 0 {
        return Vec::new();
    }
    let share = amount / units as f64;
    let mut parts = vec![share; units as usize];
    let allocated = share * (units - 1) as f64;
    if let Some(last) = parts.last_mut() {
        *last = amount - allocated;
    }
    parts
}

pub fn total_units(draft: &RentalDraft) -> u32 {
    draft.items.iter().map(|item| item.quantity).sum()
}

/// Expand a multi-unit rental into single-unit drafts, in item order
pub fn fan_out(draft: &RentalDraft) -> Vec<RentalDraft> {
    let units = total_units(draft);
    let deposits = split_evenly(draft.deposit, units);
    let discounts = split_evenly(draft.discount_amount, units);

    let mut drafts = Vec::with_capacity(units as usize);
    let mut slot = 0usize;
    for item in &draft.items {
        for _ in 0..item.quantity {
            let mut unit_item = item.clone();
            unit_item.quantity = 1;
            drafts.push(RentalDraft {
                items: vec![unit_item],
                deposit: deposits[slot],
                discount_amount: discounts[slot],
                ..draft.clone()
            });
            slot += 1;
        }
    }

    tracing::debug!(units, records = drafts.len(), "fanned out rental");
    drafts
}
