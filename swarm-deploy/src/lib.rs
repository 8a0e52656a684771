pub mod config;
mod deploy;
mod error;
pub mod predict;
pub mod reconcile;

pub use deploy::{run, DeploymentOutcome, DeploymentTarget, TokenSnapshot};
pub use error::{DeployError, Result};
pub use predict::predict_contract_address;
pub use reconcile::{reconcile_nonce, NonceState, ReconciledNonce};
