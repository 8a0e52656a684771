//! Shared fixtures: funded test accounts, logger setup, a stub contract,
//! and a scriptable fake chain for driving the orchestrator without an EVM.

use std::{collections::HashMap, sync::Once, time::Duration};

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{address, bytes, Address, Bytes, U256};

use crate::{
    client::{ChainClient, ContractFactory, ContractId, Deadline, Deployment, PendingTx, TxReceipt},
    error::{ChainError, Result},
    TokenView,
};

static INIT: Once = Once::new();

pub const ALICE: Address = address!("000000000000000000000000000000000000000A");
pub const BOB: Address = address!("000000000000000000000000000000000000000B");
pub const CAROL: Address = address!("000000000000000000000000000000000000000C");

pub fn initialize_logger() {
    INIT.call_once(|| {
        let log_level = std::env::var("RUST_LOG").unwrap_or("INFO".to_owned());
        let tracing_sub = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(tracing_sub)
            .expect("Setting tracing subscriber failed");
    });
}

/// Creation bytecode for a stub contract whose runtime returns the constant
/// 42 for any call. Enough to occupy an address with real code.
pub fn stub_initcode() -> Bytes {
    bytes!("600a600c600039600a6000f3602a60005260206000f3")
}

/// Canned observational fields served by [`FakeChain::attach`].
#[derive(Debug, Clone)]
pub struct FakeTokenState {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
    pub balances: HashMap<Address, U256>,
}

impl Default for FakeTokenState {
    fn default() -> Self {
        Self {
            name: "Swarm".to_owned(),
            symbol: "SWM".to_owned(),
            decimals: 18,
            total_supply: U256::ZERO,
            balances: HashMap::new(),
        }
    }
}

/// Scripted chain double.
///
/// Nonces advance when a transaction's inclusion is waited on and CREATE
/// addresses follow the standard derivation unless overridden. A "stalled"
/// chain never includes anything: bounded waits block out their deadline
/// and report a timeout, and an unbounded wait is refused with a scripted
/// rpc error since it would otherwise block forever.
pub struct FakeChain {
    nonce: u64,
    next_tx: u64,
    stalled: bool,
    deploy_address: Option<Address>,
    code: HashMap<Address, Bytes>,
    token: FakeTokenState,
    /// Every plain transaction submitted, in order.
    pub sent: Vec<(Address, Address, U256)>,
    /// Contracts deployed through the factory, in order.
    pub deployed: Vec<String>,
}

impl FakeChain {
    pub fn with_nonce(nonce: u64) -> Self {
        Self {
            nonce,
            next_tx: 0,
            stalled: false,
            deploy_address: None,
            code: HashMap::new(),
            token: FakeTokenState::default(),
            sent: Vec::new(),
            deployed: Vec::new(),
        }
    }

    /// Never include anything; waits fail with a timeout.
    pub fn stalled(mut self) -> Self {
        self.stalled = true;
        self
    }

    /// Force the factory to report this address, ignoring the derivation.
    pub fn deploying_at(mut self, address: Address) -> Self {
        self.deploy_address = Some(address);
        self
    }

    pub fn with_code(mut self, address: Address, code: Bytes) -> Self {
        self.code.insert(address, code);
        self
    }

    pub fn with_token(mut self, token: FakeTokenState) -> Self {
        self.token = token;
        self
    }
}

// Block out the deadline the way a real wait on a dead network would, then
// report the timeout. Waiting unbounded would block forever, so that case is
// refused outright.
fn stalled_wait(deadline: Deadline) -> ChainError {
    loop {
        match deadline.remaining() {
            None => {
                return ChainError::Rpc(
                    "stalled chain never includes and no deadline was set".to_owned(),
                )
            }
            Some(left) if left.is_zero() => return ChainError::InclusionTimeout,
            Some(left) => std::thread::sleep(left.min(Duration::from_millis(1))),
        }
    }
}

impl ChainClient for FakeChain {
    fn transaction_count(&mut self, _account: Address) -> Result<u64> {
        Ok(self.nonce)
    }

    fn send_transaction(&mut self, from: Address, to: Address, value: U256) -> Result<PendingTx> {
        self.sent.push((from, to, value));
        let id = self.next_tx;
        self.next_tx += 1;
        Ok(PendingTx(id))
    }

    fn wait(&mut self, _tx: PendingTx, deadline: Deadline) -> Result<TxReceipt> {
        if self.stalled {
            return Err(stalled_wait(deadline));
        }
        self.nonce += 1;
        Ok(TxReceipt {
            gas_used: 21_000,
            status: true,
        })
    }

    fn code_at(&mut self, address: Address) -> Result<Bytes> {
        Ok(self.code.get(&address).cloned().unwrap_or_default())
    }
}

impl ContractFactory for FakeChain {
    fn deploy(
        &mut self,
        contract: &ContractId,
        _params: &[DynSolValue],
        signer: Address,
        deadline: Deadline,
    ) -> Result<Deployment> {
        if self.stalled {
            return Err(stalled_wait(deadline));
        }
        let address = self
            .deploy_address
            .unwrap_or_else(|| signer.create(self.nonce));
        self.nonce += 1;
        self.code.insert(address, contract.bytecode.clone());
        self.deployed.push(contract.name.clone());
        Ok(Deployment {
            address,
            receipt: TxReceipt {
                gas_used: 1_000_000,
                status: true,
            },
        })
    }

    fn attach(
        &mut self,
        _contract: &ContractId,
        address: Address,
    ) -> Result<Box<dyn TokenView + '_>> {
        if self.code.get(&address).map_or(true, |c| c.is_empty()) {
            return Err(ChainError::NoCode(address));
        }
        Ok(Box::new(FakeToken(self.token.clone())))
    }
}

struct FakeToken(FakeTokenState);

impl TokenView for FakeToken {
    fn name(&mut self) -> Result<String> {
        Ok(self.0.name.clone())
    }

    fn symbol(&mut self) -> Result<String> {
        Ok(self.0.symbol.clone())
    }

    fn decimals(&mut self) -> Result<u8> {
        Ok(self.0.decimals)
    }

    fn total_supply(&mut self) -> Result<U256> {
        Ok(self.0.total_supply)
    }

    fn balance_of(&mut self, owner: Address) -> Result<U256> {
        Ok(self.0.balances.get(&owner).copied().unwrap_or_default())
    }
}
