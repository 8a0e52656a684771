//! Deployment run errors
//!
//! Everything here is fatal for the current run and propagates to the top;
//! nothing is recovered locally. A re-run re-derives all state from the
//! chain, so retrying a failed invocation is always safe.

use alloy_primitives::Address;
use swarm_chain::ChainError;

use crate::config::ConfigError;

pub type Result<T> = core::result::Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Bad or missing configuration, caught before any chain interaction.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The chain could not be queried or reached.
    #[error("chain communication failed: {0}")]
    Chain(#[source] ChainError),
    /// An inclusion wait ran past its deadline. Safe to re-invoke.
    #[error("timed out waiting for transaction inclusion")]
    InclusionTimeout,
    /// A filler or deployment transaction was included but failed.
    #[error("transaction failed: {0}")]
    Transaction(#[source] ChainError),
    /// The factory reported a different address than the predictor.
    #[error("predicted address {predicted} does not match deployed address {actual}")]
    AddressMismatch { predicted: Address, actual: Address },
    /// The nonce slot was spent, but not on a contract creation.
    #[error("expected contract not found at predicted address {0}")]
    MissingCode(Address),
    /// Code exists at the predicted address but the token reads fail.
    #[error("contract at {address} does not answer as a token: {source}")]
    UnreadableContract { address: Address, source: ChainError },
}

impl DeployError {
    /// Classify the failure of a read-only chain query.
    pub(crate) fn query(err: ChainError) -> Self {
        match err {
            ChainError::InclusionTimeout => Self::InclusionTimeout,
            other => Self::Chain(other),
        }
    }

    /// Classify the failure of a submitted transaction.
    pub(crate) fn submit(err: ChainError) -> Self {
        match err {
            ChainError::InclusionTimeout => Self::InclusionTimeout,
            err @ (ChainError::Reverted { .. } | ChainError::Halted(_)) => Self::Transaction(err),
            other => Self::Chain(other),
        }
    }

    /// True for the consistency class: a logic or environment mismatch that
    /// must be investigated rather than retried.
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            Self::AddressMismatch { .. } | Self::MissingCode(_) | Self::UnreadableContract { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;

    #[test]
    fn timeouts_stay_distinct_from_rpc_failures() {
        assert!(matches!(
            DeployError::query(ChainError::InclusionTimeout),
            DeployError::InclusionTimeout
        ));
        assert!(matches!(
            DeployError::query(ChainError::Rpc("boom".into())),
            DeployError::Chain(_)
        ));
    }

    #[test]
    fn reverts_classify_as_transaction_failures() {
        let err = DeployError::submit(ChainError::Reverted {
            output: Bytes::new(),
        });
        assert!(matches!(err, DeployError::Transaction(_)));
        assert!(!err.is_consistency());
    }

    #[test]
    fn consistency_class_is_marked() {
        assert!(DeployError::MissingCode(Address::ZERO).is_consistency());
        assert!(DeployError::AddressMismatch {
            predicted: Address::ZERO,
            actual: Address::ZERO,
        }
        .is_consistency());
        assert!(!DeployError::InclusionTimeout.is_consistency());
    }
}
