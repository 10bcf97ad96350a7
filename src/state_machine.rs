//! Guard conditions for Order/Shipment/Session transitions (spec.md §4.4,
//! §4.6). Pure functions returning typed errors — no I/O — analogous to the
//! `assert_*` helpers in the settlement path this crate was built from.

use crate::db::models::ShipmentRow;
use crate::error::PodxError;
use crate::types::ShipmentStatus;

/// A pickup session may only be created while the shipment is fresh.
pub fn assert_pickup_creatable(shipment: &ShipmentRow) -> Result<(), PodxError> {
    if shipment.status != ShipmentStatus::Created {
        return Err(PodxError::ShipmentState);
    }
    Ok(())
}

/// A drop session may only be created once pickup has landed and before the
/// shipment has already been settled.
pub fn assert_drop_creatable(shipment: &ShipmentRow) -> Result<(), PodxError> {
    if shipment.status != ShipmentStatus::InTransit || shipment.picked_up_at.is_none() {
        return Err(PodxError::ShipmentState);
    }
    Ok(())
}

/// Re-checked immediately before settlement, since time may have passed
/// between session creation and counter-signature.
pub fn assert_pickup_settleable(shipment: &ShipmentRow) -> Result<(), PodxError> {
    assert_pickup_creatable(shipment)
}

pub fn assert_drop_settleable(shipment: &ShipmentRow) -> Result<(), PodxError> {
    assert_drop_creatable(shipment)
}

/// `claimedTs = 0` is always rejected (spec.md §8 boundary case) — a real
/// milestone always carries a nonzero Unix timestamp. `BAD_DISTANCE` is
/// reserved for `|distance - planned| > 5` (spec.md §7) and a pickup has no
/// distance at all, so this is reported as a signature/attestation failure
/// instead — the claimed timestamp is part of what got signed.
pub fn assert_claimed_ts_nonzero(claimed_ts: u64) -> Result<(), PodxError> {
    if claimed_ts == 0 {
        return Err(PodxError::BadSignature {
            expected_signer: None,
            recovered: None,
        });
    }
    Ok(())
}

/// `|claimed − planned| ≤ tolerance` (spec.md §4.4, §4.6; tolerance is 5
/// meters throughout).
pub fn assert_distance_matches(claimed_meters: u64, planned_meters: u64, tolerance_meters: u64) -> Result<(), PodxError> {
    let diff = claimed_meters.abs_diff(planned_meters);
    if diff > tolerance_meters {
        return Err(PodxError::BadDistance);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_tolerance_is_inclusive() {
        assert!(assert_distance_matches(1005, 1000, 5).is_ok());
        assert!(assert_distance_matches(1006, 1000, 5).is_err());
    }

    #[test]
    fn zero_claimed_timestamp_is_rejected() {
        assert!(assert_claimed_ts_nonzero(0).is_err());
        assert!(assert_claimed_ts_nonzero(1_700_000_000).is_ok());
    }
}
