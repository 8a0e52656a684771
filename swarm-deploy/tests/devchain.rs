//! End-to-end runs against the revm-backed dev chain, where nonce tracking
//! and CREATE address derivation come from the EVM itself.

use alloy_primitives::U256;
use swarm_chain::{
    test_utils::{initialize_logger, stub_initcode, ALICE},
    ChainClient, ContractId, Deadline, EvmDevChain,
};
use swarm_deploy::{predict_contract_address, run, DeployError, DeploymentOutcome, DeploymentTarget};

fn target(nonce: u64) -> DeploymentTarget {
    initialize_logger();
    DeploymentTarget {
        network: "local".to_owned(),
        deployer: ALICE,
        nonce,
        contract: ContractId::new("SwarmToken", stub_initcode()),
        params: vec![],
    }
}

fn funded_chain() -> EvmDevChain {
    let mut chain = EvmDevChain::new();
    chain.fund(ALICE, U256::from(1e18 as u64));
    chain
}

#[test]
fn full_run_lands_on_the_predicted_address() {
    let target = target(3);
    let mut chain = funded_chain();

    let outcome = run(&mut chain, &target, Deadline::none()).unwrap();

    let predicted = predict_contract_address(ALICE, 3);
    match outcome {
        DeploymentOutcome::Deployed { address, receipt } => {
            assert_eq!(address, predicted, "revm derivation must agree");
            assert!(receipt.status);
        }
        other => panic!("expected deploy path, got {other:?}"),
    }

    // Three fillers plus the creation itself.
    assert_eq!(chain.transaction_count(ALICE).unwrap(), 4);
    assert!(!chain.code_at(predicted).unwrap().is_empty());
}

#[test]
fn rerun_takes_the_attach_path_and_rejects_a_non_token() {
    let target = target(0);
    let mut chain = funded_chain();

    run(&mut chain, &target, Deadline::none()).unwrap();

    // The stub occupies the slot but does not answer ERC20 views, so the
    // second run must fail the snapshot, not report garbage.
    let err = run(&mut chain, &target, Deadline::none()).unwrap_err();
    let predicted = predict_contract_address(ALICE, 0);
    assert!(
        matches!(err, DeployError::UnreadableContract { address, .. } if address == predicted),
        "got {err:?}"
    );
    assert!(err.is_consistency());
}

#[test]
fn slot_spent_on_a_plain_transfer_reports_missing_code() {
    let target = target(1);
    let mut chain = funded_chain();

    // Burn nonces 0 and 1 on plain transfers before the run starts.
    for _ in 0..2 {
        let tx = chain
            .send_transaction(ALICE, alloy_primitives::Address::ZERO, U256::ZERO)
            .unwrap();
        chain.wait(tx, Deadline::none()).unwrap();
    }

    let err = run(&mut chain, &target, Deadline::none()).unwrap_err();
    let predicted = predict_contract_address(ALICE, 1);
    assert!(matches!(err, DeployError::MissingCode(addr) if addr == predicted));
}
