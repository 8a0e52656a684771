//! Chain client and contract factory seams.
//!
//! The deployment orchestrator only talks to a chain through these traits,
//! so it can run against the in-process [`crate::EvmDevChain`], the scripted
//! [`crate::test_utils::FakeChain`], or an external RPC backend supplied by
//! the embedding tool.

use std::time::{Duration, Instant};

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes, U256};

use crate::error::Result;

/// Handle for a submitted transaction that has not been waited on yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTx(pub u64);

/// Receipt of an included transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub gas_used: u64,
    pub status: bool,
}

/// Outcome of a contract-creation transaction.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub address: Address,
    pub receipt: TxReceipt,
}

/// A contract name together with its creation bytecode.
#[derive(Debug, Clone)]
pub struct ContractId {
    pub name: String,
    pub bytecode: Bytes,
}

impl ContractId {
    pub fn new(name: impl Into<String>, bytecode: Bytes) -> Self {
        Self {
            name: name.into(),
            bytecode,
        }
    }
}

/// Optional wall-clock bound on a blocking inclusion wait.
///
/// Inclusion waits are the only suspension points in a deployment run. A
/// `Deadline` makes them cancellable so a hung network fails the run with
/// [`crate::ChainError::InclusionTimeout`] instead of hanging the tool.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No bound: the wait blocks until the chain answers.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(timeout: Duration) -> Self {
        Self(Some(Instant::now() + timeout))
    }

    pub fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left before expiry; `None` for an unbounded deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_deadline_never_expires() {
        let deadline = Deadline::none();
        assert!(!deadline.expired());
        assert_eq!(deadline.remaining(), None);
    }

    #[test]
    fn elapsed_deadline_expires() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(deadline.expired());
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));

        let deadline = Deadline::after(Duration::from_secs(3600));
        assert!(!deadline.expired());
        assert!(deadline.remaining().is_some_and(|left| !left.is_zero()));
    }
}

/// Transaction-level view of a chain, scoped to what the orchestrator needs.
pub trait ChainClient {
    /// The account's current transaction count, read fresh from the chain.
    fn transaction_count(&mut self, account: Address) -> Result<u64>;

    /// Submit a plain value transfer.
    fn send_transaction(&mut self, from: Address, to: Address, value: U256) -> Result<PendingTx>;

    /// Block until the transaction is included or the deadline expires.
    fn wait(&mut self, tx: PendingTx, deadline: Deadline) -> Result<TxReceipt>;

    /// Code deployed at `address`, empty if none.
    fn code_at(&mut self, address: Address) -> Result<Bytes>;
}

/// Read-only handle to a deployed token contract.
pub trait TokenView {
    fn name(&mut self) -> Result<String>;
    fn symbol(&mut self) -> Result<String>;
    fn decimals(&mut self) -> Result<u8>;
    fn total_supply(&mut self) -> Result<U256>;
    fn balance_of(&mut self, owner: Address) -> Result<U256>;
}

/// Deploys contracts and attaches read-only handles to existing ones.
pub trait ContractFactory {
    /// Submit the creation transaction with ABI-encoded constructor params
    /// and block until it is included or the deadline expires.
    fn deploy(
        &mut self,
        contract: &ContractId,
        params: &[DynSolValue],
        signer: Address,
        deadline: Deadline,
    ) -> Result<Deployment>;

    /// Attach to a contract believed to exist at `address`.
    fn attach(&mut self, contract: &ContractId, address: Address)
        -> Result<Box<dyn TokenView + '_>>;
}
