use std::str::FromStr;

use alloy::{
    primitives::{Address, Bytes as AlloyBytes, TxKind, U256},
    rpc::types::{TransactionInput, TransactionRequest},
};
use num_bigint::BigUint;

use crate::approvals::{errors::ApprovalError, models::Transaction};

/// Parses a `0x`-prefixed 20 byte hex address, in any letter case.
pub fn parse_address(address: &str) -> Result<Address, ApprovalError> {
    let hex_part = address
        .strip_prefix("0x")
        .ok_or_else(|| ApprovalError::InvalidInput(format!("Invalid address: {address}")))?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ApprovalError::InvalidInput(format!("Invalid address: {address}")));
    }
    Address::from_str(address)
        .map_err(|_| ApprovalError::InvalidInput(format!("Invalid address: {address}")))
}

/// Fails when the value does not fit in 256 bits.
pub fn biguint_to_u256(value: &BigUint) -> Result<U256, ApprovalError> {
    let bytes = value.to_bytes_be();
    U256::try_from_be_slice(&bytes)
        .ok_or_else(|| ApprovalError::InvalidInput(format!("Value {value} exceeds 256 bits")))
}

pub fn u256_to_biguint(value: U256) -> BigUint {
    BigUint::from_bytes_be(&value.to_be_bytes::<32>())
}

/// Lowercase `0x` hex rendering of an address.
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

/// Converts an unsigned transaction into an alloy request. Authorizations are not carried over:
/// they have to be signed by the account key first.
pub fn to_transaction_request(tx: &Transaction) -> Result<TransactionRequest, ApprovalError> {
    let from = parse_address(&tx.from)?;
    let to = parse_address(&tx.to)?;
    Ok(TransactionRequest {
        from: Some(from),
        to: Some(TxKind::from(to)),
        value: Some(biguint_to_u256(&tx.value)?),
        chain_id: Some(tx.chain_id),
        nonce: tx.nonce,
        input: TransactionInput { input: Some(AlloyBytes::from(tx.data.clone())), data: None },
        ..Default::default()
    })
}
