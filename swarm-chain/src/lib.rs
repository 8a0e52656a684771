mod client;
mod error;
pub mod evm;

pub mod test_utils;

pub use client::{
    ChainClient, ContractFactory, ContractId, Deadline, Deployment, PendingTx, TokenView,
    TxReceipt,
};
pub use error::{ChainError, Result};
pub use evm::EvmDevChain;
