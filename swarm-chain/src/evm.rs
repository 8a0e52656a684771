//! In-process development chain backed by revm.
//!
//! Plays the role of the `hardhat`/`local` networks: transactions execute
//! and commit immediately, account nonces are tracked by the EVM's own
//! journaled state, and CREATE addresses are derived by the EVM itself.

use std::collections::HashMap;

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::keccak256;
use alloy_sol_types::{sol_data, SolType, SolValue};
use revm::{
    primitives::{AccountInfo, Address, Bytes, ExecutionResult, Output, TransactTo, U256},
    Database, Evm, InMemoryDB,
};
use tracing::debug;

use crate::{
    client::{ChainClient, ContractFactory, ContractId, Deadline, Deployment, PendingTx, TxReceipt},
    error::{ChainError, Result},
    TokenView,
};

const CALL_GAS_LIMIT: u64 = 1_000_000;
const CREATE_GAS_LIMIT: u64 = 10_000_000;

/// An in-memory EVM chain implementing both collaborator seams.
#[derive(Default)]
pub struct EvmDevChain {
    db: InMemoryDB,
    receipts: HashMap<u64, TxReceipt>,
    next_tx: u64,
}

impl EvmDevChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account balance at genesis. Resets the account, so only use
    /// before any transaction touches it.
    pub fn fund(&mut self, account: Address, wei: U256) {
        self.db
            .insert_account_info(account, AccountInfo::from_balance(wei));
    }

    fn transact_commit(
        &mut self,
        caller: Address,
        to: TransactTo,
        data: Bytes,
        value: U256,
        gas_limit: u64,
    ) -> Result<ExecutionResult> {
        let mut evm = Evm::builder()
            .with_db(&mut self.db)
            .modify_tx_env(|tx| {
                tx.caller = caller;
                tx.transact_to = to;
                tx.data = data;
                tx.value = value;
                tx.gas_limit = gas_limit;
            })
            .build();

        let result = evm
            .transact_commit()
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        checked(result)
    }

    /// Read-only call, does not commit state or bump the caller nonce.
    fn call(&mut self, to: Address, calldata: Vec<u8>) -> Result<Bytes> {
        let mut evm = Evm::builder()
            .with_db(&mut self.db)
            .modify_tx_env(|tx| {
                tx.caller = Address::ZERO;
                tx.transact_to = TransactTo::Call(to);
                tx.data = calldata.into();
                tx.value = U256::ZERO;
                tx.gas_limit = CALL_GAS_LIMIT;
            })
            .build();

        let outcome = evm.transact().map_err(|e| ChainError::Rpc(e.to_string()))?;
        match checked(outcome.result)? {
            ExecutionResult::Success {
                output: Output::Call(value),
                ..
            } => Ok(value),
            other => Err(ChainError::UnexpectedResult(format!("{other:?}"))),
        }
    }
}

fn checked(result: ExecutionResult) -> Result<ExecutionResult> {
    match result {
        ExecutionResult::Revert { output, .. } => Err(ChainError::Reverted { output }),
        ExecutionResult::Halt { reason, .. } => Err(ChainError::Halted(format!("{reason:?}"))),
        success => Ok(success),
    }
}

/// Selector for a solidity function signature.
pub fn selector(sig: &str) -> [u8; 4] {
    keccak256(sig)[0..4]
        .try_into()
        .expect("selector is exactly 4 bytes")
}

impl ChainClient for EvmDevChain {
    fn transaction_count(&mut self, account: Address) -> Result<u64> {
        let info = self
            .db
            .basic(account)
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(info.map(|a| a.nonce).unwrap_or_default())
    }

    fn send_transaction(&mut self, from: Address, to: Address, value: U256) -> Result<PendingTx> {
        let result =
            self.transact_commit(from, TransactTo::Call(to), Bytes::new(), value, CALL_GAS_LIMIT)?;
        let receipt = TxReceipt {
            gas_used: result.gas_used(),
            status: result.is_success(),
        };

        let id = self.next_tx;
        self.next_tx += 1;
        self.receipts.insert(id, receipt);
        Ok(PendingTx(id))
    }

    fn wait(&mut self, tx: PendingTx, deadline: Deadline) -> Result<TxReceipt> {
        // Inclusion is immediate on the in-process chain, but an already
        // elapsed deadline still bounds the wait.
        if deadline.expired() {
            return Err(ChainError::InclusionTimeout);
        }
        self.receipts
            .remove(&tx.0)
            .ok_or_else(|| ChainError::Rpc(format!("unknown transaction handle {}", tx.0)))
    }

    fn code_at(&mut self, address: Address) -> Result<Bytes> {
        let info = self
            .db
            .basic(address)
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(info
            .and_then(|a| a.code)
            .map(|c| c.original_bytes())
            .unwrap_or_default())
    }
}

impl ContractFactory for EvmDevChain {
    fn deploy(
        &mut self,
        contract: &ContractId,
        params: &[DynSolValue],
        signer: Address,
        deadline: Deadline,
    ) -> Result<Deployment> {
        if deadline.expired() {
            return Err(ChainError::InclusionTimeout);
        }
        let mut initcode = contract.bytecode.to_vec();
        if !params.is_empty() {
            initcode.extend_from_slice(&DynSolValue::Tuple(params.to_vec()).abi_encode_params());
        }

        let result = self.transact_commit(
            signer,
            TransactTo::Create,
            initcode.into(),
            U256::ZERO,
            CREATE_GAS_LIMIT,
        )?;
        match result {
            ExecutionResult::Success {
                gas_used,
                output: Output::Create(_, Some(address)),
                ..
            } => {
                debug!(%address, contract = %contract.name, "contract created");
                Ok(Deployment {
                    address,
                    receipt: TxReceipt {
                        gas_used,
                        status: true,
                    },
                })
            }
            other => Err(ChainError::UnexpectedResult(format!("{other:?}"))),
        }
    }

    fn attach(
        &mut self,
        _contract: &ContractId,
        address: Address,
    ) -> Result<Box<dyn TokenView + '_>> {
        if self.code_at(address)?.is_empty() {
            return Err(ChainError::NoCode(address));
        }
        Ok(Box::new(EvmToken {
            chain: self,
            address,
        }))
    }
}

/// Read-only token handle doing selector-based calls against the dev chain.
struct EvmToken<'a> {
    chain: &'a mut EvmDevChain,
    address: Address,
}

impl EvmToken<'_> {
    fn view(&mut self, sig: &str, args: Vec<u8>) -> Result<Bytes> {
        let mut calldata = selector(sig).to_vec();
        calldata.extend(args);
        self.chain.call(self.address, calldata)
    }
}

impl TokenView for EvmToken<'_> {
    fn name(&mut self) -> Result<String> {
        let out = self.view("name()", vec![])?;
        Ok(String::abi_decode(&out, true)?)
    }

    fn symbol(&mut self) -> Result<String> {
        let out = self.view("symbol()", vec![])?;
        Ok(String::abi_decode(&out, true)?)
    }

    fn decimals(&mut self) -> Result<u8> {
        let out = self.view("decimals()", vec![])?;
        Ok(<sol_data::Uint<8> as SolType>::abi_decode(&out, true)?)
    }

    fn total_supply(&mut self) -> Result<U256> {
        let out = self.view("totalSupply()", vec![])?;
        Ok(U256::abi_decode(&out, true)?)
    }

    fn balance_of(&mut self, owner: Address) -> Result<U256> {
        let out = self.view("balanceOf(address)", owner.abi_encode())?;
        Ok(U256::abi_decode(&out, true)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{stub_initcode, ALICE, BOB};
    use alloy_primitives::bytes;

    fn funded_chain() -> EvmDevChain {
        let mut chain = EvmDevChain::new();
        chain.fund(ALICE, U256::from(1e18 as u64));
        chain
    }

    fn stub_contract() -> ContractId {
        ContractId::new("Stub", stub_initcode())
    }

    #[test]
    fn nonce_tracks_included_transactions() {
        let mut chain = funded_chain();
        assert_eq!(chain.transaction_count(ALICE).unwrap(), 0);

        for expected in 1..=3u64 {
            let tx = chain
                .send_transaction(ALICE, Address::ZERO, U256::ZERO)
                .unwrap();
            let receipt = chain.wait(tx, Deadline::none()).unwrap();
            assert!(receipt.status);
            assert_eq!(chain.transaction_count(ALICE).unwrap(), expected);
        }

        // Other accounts are untouched.
        assert_eq!(chain.transaction_count(BOB).unwrap(), 0);
    }

    #[test]
    fn create_uses_the_chains_own_address_derivation() {
        let mut chain = funded_chain();
        let tx = chain
            .send_transaction(ALICE, Address::ZERO, U256::ZERO)
            .unwrap();
        chain.wait(tx, Deadline::none()).unwrap();

        let deployment = chain
            .deploy(&stub_contract(), &[], ALICE, Deadline::none())
            .unwrap();
        assert_eq!(deployment.address, ALICE.create(1));
        assert!(!chain.code_at(deployment.address).unwrap().is_empty());
    }

    #[test]
    fn code_at_is_empty_for_fresh_addresses() {
        let mut chain = funded_chain();
        assert!(chain.code_at(BOB).unwrap().is_empty());
    }

    #[test]
    fn reverting_initcode_fails_the_deploy() {
        let mut chain = funded_chain();
        // PUSH1 0 PUSH1 0 REVERT
        let contract = ContractId::new("Reverter", bytes!("60006000fd"));
        let err = chain
            .deploy(&contract, &[], ALICE, Deadline::none())
            .unwrap_err();
        assert!(matches!(err, ChainError::Reverted { .. }));
    }

    #[test]
    fn elapsed_deadline_bounds_waits_and_deploys() {
        let mut chain = funded_chain();
        let expired = Deadline::after(std::time::Duration::ZERO);

        let tx = chain
            .send_transaction(ALICE, Address::ZERO, U256::ZERO)
            .unwrap();
        let err = chain.wait(tx, expired).unwrap_err();
        assert!(matches!(err, ChainError::InclusionTimeout));

        let err = chain
            .deploy(&stub_contract(), &[], ALICE, expired)
            .unwrap_err();
        assert!(matches!(err, ChainError::InclusionTimeout));
    }

    #[test]
    fn attach_requires_code() {
        let mut chain = funded_chain();
        let err = chain.attach(&stub_contract(), BOB).err().unwrap();
        assert!(matches!(err, ChainError::NoCode(addr) if addr == BOB));
    }
}
