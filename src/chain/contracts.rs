//! ABI-level contract interfaces (spec.md §6 "On-chain contracts").
//!
//! Declared inline via `sol!` Solidity-interface blocks rather than loading a
//! JSON ABI file from disk — the corpus this core is built from does the same
//! for structs local to a single call site (e.g. `scheme/v1_eip155_exact`'s
//! `IEIP3009`), and no ABI JSON was retrieved for these three contracts.

use alloy_sol_types::sol;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

sol! {
    #[sol(rpc)]
    interface IEscrow {
        function fund(uint256 orderId, uint256 amount) external;
        function escrowed(uint256 orderId) external view returns (uint256);
    }
}

sol! {
    #[sol(rpc)]
    interface IOrderRegistry {
        function createOrder(uint256 orderId, address buyer, address supplier, uint256 amount) external;
        function markFunded(uint256 orderId) external;
        function orders(uint256 orderId)
            external
            view
            returns (address buyer, address supplier, uint256 amount, uint8 status);
        function deliveryOracle() external view returns (address);
    }
}

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    struct PickupApprovalCalldata {
        bytes32 shipmentId;
        uint256 orderId;
        bytes32 locationHash;
        uint64 claimedTs;
    }
}

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    struct DropApprovalCalldata {
        bytes32 shipmentId;
        uint256 orderId;
        bytes32 locationHash;
        uint64 claimedTs;
        uint256 distanceMeters;
    }
}

sol! {
    #[sol(rpc)]
    interface IShipmentRegistry {
        function registerShipment(
            bytes32 shipmentId,
            uint256 orderId,
            address buyer,
            address supplier,
            address courier
        ) external;

        function updateCourier(bytes32 shipmentId, address courier) external;

        function confirmPickup(
            PickupApprovalCalldata calldata approval,
            bytes calldata courierSig,
            bytes calldata counterpartySig
        ) external;

        function confirmDrop(
            DropApprovalCalldata calldata approval,
            bytes calldata courierSig,
            bytes calldata counterpartySig,
            string calldata lineItemsJson,
            string calldata metadataUri
        ) external;

        event PickupApproved(
            bytes32 shipmentId,
            uint256 orderId,
            bytes32 locationHash,
            uint64 claimedTs
        );

        event DropApproved(
            bytes32 shipmentId,
            uint256 orderId,
            bytes32 locationHash,
            uint64 claimedTs,
            uint256 distanceMeters,
            uint256 courierReward
        );
    }
}

sol! {
    #[sol(rpc)]
    interface IERC1271 {
        function isValidSignature(bytes32 hash, bytes calldata signature) external view returns (bytes4);
    }
}

/// The ERC-1271 magic value returned by `isValidSignature` on acceptance.
pub const ERC1271_MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];
