//! Deterministic deployment orchestration.
//!
//! One run: predict the landing address, reconcile the deployer nonce to
//! the target slot, then either deploy the contract or report on the one
//! already there. State is re-derived from the chain on every invocation,
//! so a failed run leaves nothing behind and is safe to repeat. Two
//! concurrent runs against the same account race on the nonce and are a
//! usage precondition violation.

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, U256};
use swarm_chain::{ChainClient, ContractFactory, ContractId, Deadline, TxReceipt};
use tracing::info;

use crate::{
    error::{DeployError, Result},
    predict::predict_contract_address,
    reconcile::{reconcile_nonce, ReconciledNonce},
};

/// Immutable description of one deployment run, fixed from configuration
/// before any chain interaction.
#[derive(Debug, Clone)]
pub struct DeploymentTarget {
    pub network: String,
    pub deployer: Address,
    pub nonce: u64,
    pub contract: ContractId,
    pub params: Vec<DynSolValue>,
}

/// Read-only field snapshot of an already-deployed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSnapshot {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
    pub deployer_balance: U256,
}

/// Terminal result of one run. Failures travel on the `Err` channel.
#[derive(Debug, Clone)]
pub enum DeploymentOutcome {
    Deployed {
        address: Address,
        receipt: TxReceipt,
    },
    AlreadyDeployed {
        address: Address,
        snapshot: TokenSnapshot,
    },
}

impl DeploymentOutcome {
    pub fn address(&self) -> Address {
        match self {
            Self::Deployed { address, .. } | Self::AlreadyDeployed { address, .. } => *address,
        }
    }
}

/// Execute one deployment run against `chain`.
///
/// On the deploy path, the address reported by the factory must equal the
/// independently computed prediction; a mismatch means the predictor or the
/// chain's derivation assumptions are wrong and fails the run. On the attach
/// path, an empty code query at the predicted address fails the run before
/// any field is read, so no partial report is ever produced.
pub fn run<C>(
    chain: &mut C,
    target: &DeploymentTarget,
    deadline: Deadline,
) -> Result<DeploymentOutcome>
where
    C: ChainClient + ContractFactory,
{
    let predicted = predict_contract_address(target.deployer, target.nonce);
    info!(%predicted, network = %target.network, nonce = target.nonce, "predicted contract address");

    match reconcile_nonce(chain, target.deployer, target.nonce, deadline)? {
        ReconciledNonce::AtTarget => {
            info!(contract = %target.contract.name, nonce = target.nonce, "deploying contract");
            let deployment = chain
                .deploy(&target.contract, &target.params, target.deployer, deadline)
                .map_err(DeployError::submit)?;
            if deployment.address != predicted {
                return Err(DeployError::AddressMismatch {
                    predicted,
                    actual: deployment.address,
                });
            }
            Ok(DeploymentOutcome::Deployed {
                address: deployment.address,
                receipt: deployment.receipt,
            })
        }
        ReconciledNonce::Passed(current) => {
            info!(current, target = target.nonce, %predicted, "nonce already past target, attaching");
            let code = chain.code_at(predicted).map_err(DeployError::query)?;
            if code.is_empty() {
                return Err(DeployError::MissingCode(predicted));
            }
            let snapshot = read_snapshot(chain, &target.contract, predicted, target.deployer)?;
            Ok(DeploymentOutcome::AlreadyDeployed {
                address: predicted,
                snapshot,
            })
        }
    }
}

fn read_snapshot<F: ContractFactory>(
    factory: &mut F,
    contract: &ContractId,
    address: Address,
    deployer: Address,
) -> Result<TokenSnapshot> {
    let unreadable = |source| DeployError::UnreadableContract { address, source };

    let mut token = factory.attach(contract, address).map_err(unreadable)?;
    Ok(TokenSnapshot {
        name: token.name().map_err(unreadable)?,
        symbol: token.symbol().map_err(unreadable)?,
        decimals: token.decimals().map_err(unreadable)?,
        total_supply: token.total_supply().map_err(unreadable)?,
        deployer_balance: token.balance_of(deployer).map_err(unreadable)?,
    })
}
