use std::{path::PathBuf, time::Duration};

use alloy_primitives::{utils::format_units, U256};
use clap::Parser;
use swarm_chain::{ContractId, Deadline, EvmDevChain};
use swarm_deploy::{
    config::{ConfigError, DeployConfig},
    predict_contract_address, run, DeploymentOutcome, DeploymentTarget,
};

/// Deterministic SwarmToken deployment: reconcile the deployer nonce to the
/// configured slot, then deploy or report the already-deployed token.
#[derive(Debug, Parser)]
#[command(name = "swarm-deploy")]
struct Args {
    /// Network identifier from the configuration file.
    network: String,

    /// Path to the deployment configuration.
    #[arg(long, default_value = "deploy.toml")]
    config: PathBuf,

    /// Override the configured target nonce.
    #[arg(long, env = "DEPLOY_NONCE")]
    nonce: Option<u64>,

    /// Override the artifacts directory.
    #[arg(long)]
    artifacts: Option<PathBuf>,

    /// Bound each inclusion wait to this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn main() -> eyre::Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("info".to_owned());
    let tracing_sub = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(tracing_sub)?;

    let args = Args::parse();

    let config = DeployConfig::load(&args.config)?;
    let mut network = config.resolve(&args.network)?;
    if let Some(nonce) = args.nonce {
        network.nonce = nonce;
    }
    if let Some(dir) = args.artifacts {
        network.artifacts = dir;
    }

    // Remote signing and transport live in the surrounding tooling; this
    // binary only drives the in-process chain.
    if network.url.is_some() {
        return Err(ConfigError::RemoteBackend(network.network).into());
    }

    let target = DeploymentTarget {
        network: network.network.clone(),
        deployer: network.deployer,
        nonce: network.nonce,
        contract: ContractId::new(network.contract.clone(), network.load_bytecode()?),
        params: network.constructor_params()?,
    };

    let predicted = predict_contract_address(target.deployer, target.nonce);
    println!("predicted contract address: {predicted}");

    let mut chain = EvmDevChain::new();
    chain.fund(target.deployer, U256::from(10u64).pow(U256::from(20)));

    let deadline = match args.timeout_secs {
        Some(secs) => Deadline::after(Duration::from_secs(secs)),
        None => Deadline::none(),
    };

    match run(&mut chain, &target, deadline)? {
        DeploymentOutcome::Deployed { address, receipt } => {
            println!("Contract deployed at {address} (gas used: {})", receipt.gas_used);
        }
        DeploymentOutcome::AlreadyDeployed { address, snapshot } => {
            let supply = format_units(snapshot.total_supply, snapshot.decimals)
                .unwrap_or_else(|_| snapshot.total_supply.to_string());
            println!("Contract already deployed on {address}");
            println!("  name: {}", snapshot.name);
            println!("  symbol: {}", snapshot.symbol);
            println!("  decimals: {}", snapshot.decimals);
            println!("  total supply: {supply}");
            println!("  deployer balance: {}", snapshot.deployer_balance);
        }
    }

    Ok(())
}
