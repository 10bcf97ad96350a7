//! EIP-712 domain and struct hashing for PODx milestone approvals.
//!
//! Two typed-data structures are signed over the lifetime of a shipment:
//! `PickupApproval` (courier hands the parcel to the supplier) and
//! `DropApproval` (courier delivers to the buyer, releasing escrow). Both
//! share one fixed domain, constructed exactly as specified in spec.md §4.1.

use alloy_primitives::{keccak256, Address, I256, U256};
use alloy_sol_types::{eip712_domain, sol, Eip712Domain, SolStruct, SolValue};

sol! {
    /// Attests that the courier has picked the shipment up at the planned
    /// location and is ready for the supplier to countersign.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct PickupApproval {
        bytes32 shipmentId;
        uint256 orderId;
        bytes32 locationHash;
        uint64 claimedTs;
    }
}

sol! {
    /// Attests that the courier has dropped the shipment off at the buyer's
    /// location, including the claimed travel distance used for reward
    /// computation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct DropApproval {
        bytes32 shipmentId;
        uint256 orderId;
        bytes32 locationHash;
        uint64 claimedTs;
        uint256 distanceMeters;
    }
}

sol! {
    struct LocationHashInput {
        int256 latScaled;
        int256 lonScaled;
        uint64 claimedTs;
    }
}

/// Builds the fixed `PODxShipment` EIP-712 domain for a given chain and
/// verifying contract (the shipment registry).
pub fn domain(chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    eip712_domain! {
        name: "PODxShipment",
        version: "1",
        chain_id: chain_id,
        verifying_contract: verifying_contract,
    }
}

/// `shipmentId = keccak256(utf8(shipment.id))`.
pub fn shipment_id_hash(shipment_id: &str) -> alloy_primitives::B256 {
    keccak256(shipment_id.as_bytes())
}

/// Scales a decimal-degree coordinate to a fixed-point integer at 1e6
/// precision, rounding half-to-even, per spec.md §4.1.
pub fn scale_degrees(value: f64) -> I256 {
    let scaled = (value * 1_000_000.0).round_ties_even();
    I256::try_from(scaled as i128).expect("scaled coordinate fits in i256")
}

/// `locationHash = keccak256(abi.encode(int256 latScaled, int256 lonScaled, uint64 claimedTs))`.
pub fn location_hash(lat: f64, lon: f64, claimed_ts: u64) -> alloy_primitives::B256 {
    let input = LocationHashInput {
        latScaled: scale_degrees(lat),
        lonScaled: scale_degrees(lon),
        claimedTs: claimed_ts,
    };
    keccak256(input.abi_encode())
}

/// The EIP-712 signing hash (`0x1901 || domainSeparator || structHash`) for a
/// pickup approval.
pub fn pickup_signing_hash(approval: &PickupApproval, domain: &Eip712Domain) -> alloy_primitives::B256 {
    approval.eip712_signing_hash(domain)
}

/// The EIP-712 signing hash for a drop approval.
pub fn drop_signing_hash(approval: &DropApproval, domain: &Eip712Domain) -> alloy_primitives::B256 {
    approval.eip712_signing_hash(domain)
}

/// `chainOrderId` as used inside typed-data structs, which take native
/// `uint256` (as opposed to the wire form, which survives JSON as a decimal
/// string — see [`crate::types::ChainOrderId`]).
pub fn order_id_u256(chain_order_id: crate::types::ChainOrderId) -> U256 {
    chain_order_id.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_hash_is_deterministic() {
        let a = location_hash(37.7749, -122.4194, 1700000100);
        let b = location_hash(37.7749, -122.4194, 1700000100);
        assert_eq!(a, b);
    }

    #[test]
    fn location_hash_differs_on_timestamp() {
        let a = location_hash(37.7749, -122.4194, 1700000100);
        let b = location_hash(37.7749, -122.4194, 1700000101);
        assert_ne!(a, b);
    }

    #[test]
    fn scale_degrees_rounds_half_to_even() {
        // 0.0000015 degrees -> 1.5 scaled units -> rounds to 2 (even).
        assert_eq!(scale_degrees(0.0000015), I256::try_from(2).unwrap());
        // 0.0000025 degrees -> 2.5 scaled units -> rounds to 2 (even).
        assert_eq!(scale_degrees(0.0000025), I256::try_from(2).unwrap());
    }

    #[test]
    fn pickup_and_drop_hash_to_different_digests_for_same_prefix_fields() {
        let domain = domain(84532, Address::ZERO);
        let pickup = PickupApproval {
            shipmentId: shipment_id_hash("shp_1"),
            orderId: U256::from(1700000000000u64),
            locationHash: location_hash(37.7749, -122.4194, 1700000100),
            claimedTs: 1700000100,
        };
        let drop = DropApproval {
            shipmentId: pickup.shipmentId,
            orderId: pickup.orderId,
            locationHash: pickup.locationHash,
            claimedTs: pickup.claimedTs,
            distanceMeters: U256::from(14u64),
        };
        assert_ne!(
            pickup_signing_hash(&pickup, &domain),
            drop_signing_hash(&drop, &domain)
        );
    }
}
