//! Chain interaction errors

use alloy_primitives::{Address, Bytes};

pub type Result<T> = core::result::Result<T, ChainError>;

/// Error raised by a chain client or contract factory.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The backend could not be reached or answered nonsense.
    #[error("rpc failure: {0}")]
    Rpc(String),
    /// An inclusion wait ran past its deadline.
    #[error("timed out waiting for transaction inclusion")]
    InclusionTimeout,
    /// The transaction was included but reverted.
    #[error("transaction reverted, output: {output}")]
    Reverted { output: Bytes },
    /// Execution halted (out of gas, invalid opcode, ...).
    #[error("transaction halted: {0}")]
    Halted(String),
    /// No contract code exists at the given address.
    #[error("no contract code at {0}")]
    NoCode(Address),
    /// A contract call returned data that does not decode as expected.
    #[error("abi decode failed: {0}")]
    Abi(#[from] alloy_sol_types::Error),
    /// The execution outcome had an unexpected shape.
    #[error("unexpected execution result: {0}")]
    UnexpectedResult(String),
}
