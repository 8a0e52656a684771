//! Nonce reconciliation state machine.

use std::cmp::Ordering;

use alloy_primitives::{Address, U256};
use swarm_chain::{ChainClient, Deadline};
use tracing::info;

use crate::error::{DeployError, Result};

/// Where an observed transaction count stands relative to the target slot.
///
/// The loop itself only surfaces [`ReconciledNonce`]; this type is exported
/// for embedders that classify raw nonce observations themselves, e.g. to
/// report progress before handing control to [`reconcile_nonce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceState {
    Behind(u64),
    AtTarget,
    Passed(u64),
}

impl NonceState {
    pub fn observe(current: u64, target: u64) -> Self {
        match current.cmp(&target) {
            Ordering::Less => Self::Behind(current),
            Ordering::Equal => Self::AtTarget,
            Ordering::Greater => Self::Passed(current),
        }
    }
}

/// Terminal states of the reconciliation loop. `Behind` is never terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciledNonce {
    /// The target slot is the account's next nonce: proceed to deploy.
    AtTarget,
    /// The slot was already spent, by a prior run or an external
    /// transaction. Informational, not an error.
    Passed(u64),
}

/// Drive the account's transaction count up to exactly `target`, or detect
/// that it has already passed it.
///
/// Each iteration re-reads the authoritative nonce, then sends one
/// zero-value filler transaction to the null address and blocks on its
/// inclusion (the loop's only suspension point). Nothing is cached between
/// polls, and nothing is sent when the first observation is already at or
/// past the target. Nonces are monotonic; an overshoot cannot be rolled
/// back, so the loop increments one slot at a time.
pub fn reconcile_nonce<C: ChainClient>(
    client: &mut C,
    account: Address,
    target: u64,
    deadline: Deadline,
) -> Result<ReconciledNonce> {
    loop {
        let current = client
            .transaction_count(account)
            .map_err(DeployError::query)?;
        match NonceState::observe(current, target) {
            NonceState::AtTarget => return Ok(ReconciledNonce::AtTarget),
            NonceState::Passed(current) => return Ok(ReconciledNonce::Passed(current)),
            NonceState::Behind(current) => {
                info!(current, target, "nonce too low, sending filler transaction");
                let tx = client
                    .send_transaction(account, Address::ZERO, U256::ZERO)
                    .map_err(DeployError::submit)?;
                client.wait(tx, deadline).map_err(DeployError::submit)?;
            }
        }
    }
}
