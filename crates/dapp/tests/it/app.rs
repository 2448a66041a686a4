//! End-to-end tests of the event loop against a scripted wallet.

use std::{collections::BTreeSet, sync::Arc};

use alloy_primitives::Address;
use petshop::{Action, App, Status, View};
use petshop_test_utils::{
    MockWallet, petshoptest,
    accounts::{ALICE, BOB, CONTRACT},
    pet_adoption_artifact,
};
use petshop_wallets::RpcError;

fn app(prj: &petshop_test_utils::TestProject, wallet: &MockWallet) -> App {
    App::new(prj.config(), Some(Arc::new(wallet.clone())))
}

async fn connected(prj: &petshop_test_utils::TestProject, wallet: &MockWallet) -> App {
    let mut app = app(prj, wallet);
    app.dispatch(Action::ConnectRequested);
    app.settle().await;
    app
}

fn flags(view: &View) -> Vec<(u64, bool, bool)> {
    view.cards().iter().map(|card| (card.id, card.adopted, card.disabled)).collect()
}

petshoptest!(lists_catalog_with_adopted_pets, |prj, wallet| {
    wallet.set_adopted([1, 3]);
    let app = connected(&prj, &wallet).await;

    assert_eq!(app.state().status(), Status::Browsing);
    assert_eq!(
        flags(&app.view()),
        [(0, false, false), (1, true, true), (2, false, false), (3, true, true), (4, false, false)]
    );
    assert_eq!(wallet.count("eth_requestAccounts"), 1);
    assert_eq!(wallet.count("eth_call"), 1);
});

petshoptest!(adopts_pet, |prj, wallet| {
    let mut app = connected(&prj, &wallet).await;
    app.dispatch(Action::AdoptRequested(2));
    assert_eq!(app.state().status(), Status::AdoptionPending);
    assert!(app.view().cards().iter().all(|card| card.disabled));

    app.settle().await;
    assert_eq!(app.state().status(), Status::Browsing);
    assert_eq!(app.state().adopted(), Some(&BTreeSet::from([2])));
    assert_eq!(wallet.adopted(), [2]);
    assert_eq!(wallet.senders(), [ALICE]);
    assert!(app.view().banners().is_empty());
});

petshoptest!(no_wallet_is_terminal, |prj, wallet| {
    let mut app = App::new(prj.config(), None);
    assert_eq!(app.state().status(), Status::WalletMissing);

    app.dispatch(Action::ConnectRequested);
    app.settle().await;
    assert_eq!(app.view(), View::WalletMissing);
    assert!(wallet.methods().is_empty());
});

petshoptest!(switches_chain, |prj, wallet| {
    wallet.set_chain_id(1);
    let app = connected(&prj, &wallet).await;
    assert_eq!(app.state().status(), Status::Browsing);
    assert_eq!(
        wallet.methods()[..3],
        ["eth_requestAccounts", "eth_chainId", "wallet_switchEthereumChain"]
    );
});

petshoptest!(unknown_chain_keeps_disconnected, |prj, wallet| {
    wallet.set_chain_id(5);
    wallet.forget_other_chains();
    let app = connected(&prj, &wallet).await;
    assert_eq!(app.state().status(), Status::Disconnected);
    let notice = app.state().notice().unwrap();
    assert!(notice.starts_with("failed to switch to chain 31337"), "{notice}");
});

petshoptest!(declined_chain_switch_keeps_disconnected, |prj, wallet| {
    wallet.set_chain_id(1);
    wallet.reject_chain_switch(true);
    let mut app = connected(&prj, &wallet).await;
    assert_eq!(app.state().status(), Status::Disconnected);
    assert_eq!(app.state().notice(), Some("switching to chain 31337 was rejected"));
    assert_eq!(wallet.count("eth_call"), 0);

    wallet.reject_chain_switch(false);
    app.dispatch(Action::ConnectRequested);
    app.settle().await;
    assert_eq!(app.state().status(), Status::Browsing);
});

petshoptest!(rejected_connection, |prj, wallet| {
    wallet.reject_connection(true);
    let mut app = connected(&prj, &wallet).await;
    assert_eq!(app.state().status(), Status::Disconnected);
    assert_eq!(app.state().notice(), Some("the connection request was rejected"));
    assert_eq!(wallet.count("eth_chainId"), 0);

    wallet.reject_connection(false);
    app.dispatch(Action::ConnectRequested);
    app.settle().await;
    assert_eq!(app.state().status(), Status::Browsing);
});

petshoptest!(reverted_adoption_shows_error, |prj, wallet| {
    let mut app = connected(&prj, &wallet).await;
    // Someone else adopts the pet after the list was loaded.
    wallet.set_adopted([2]);
    app.dispatch(Action::AdoptRequested(2));
    app.settle().await;

    let session = app.state().session().unwrap();
    assert!(session.pending.is_none());
    let err = session.tx_error.as_deref().unwrap();
    assert!(err.contains("Pet is already adopted"), "{err}");
    assert!(app.state().adopted().unwrap().is_empty());
    assert!(app.view().to_string().starts_with("Error sending transaction: "));

    app.dispatch(Action::DismissError);
    assert!(app.view().banners().is_empty());
});

petshoptest!(rejected_transaction_shows_error, |prj, wallet| {
    let mut app = connected(&prj, &wallet).await;
    wallet.reject_next_send(RpcError::new(
        RpcError::USER_REJECTED,
        "MetaMask Tx Signature: User denied transaction signature.",
    ));
    app.dispatch(Action::AdoptRequested(0));
    app.settle().await;

    let session = app.state().session().unwrap();
    assert_eq!(
        session.tx_error.as_deref(),
        Some("MetaMask Tx Signature: User denied transaction signature.")
    );
    assert_eq!(wallet.count("eth_getTransactionReceipt"), 0);

    // The error outlives a later, successful adoption until it is dismissed.
    app.dispatch(Action::AdoptRequested(0));
    app.settle().await;
    assert_eq!(app.state().adopted(), Some(&BTreeSet::from([0])));
    let session = app.state().session().unwrap();
    assert_eq!(
        session.tx_error.as_deref(),
        Some("MetaMask Tx Signature: User denied transaction signature.")
    );

    app.dispatch(Action::DismissError);
    assert!(app.state().session().unwrap().tx_error.is_none());
    assert!(app.view().banners().is_empty());
});

petshoptest!(forced_revert_reports_reason, |prj, wallet| {
    let mut app = connected(&prj, &wallet).await;
    wallet.revert_next("Pet index out of bounds!");
    app.dispatch(Action::AdoptRequested(4));
    app.settle().await;

    let err = app.state().session().unwrap().tx_error.clone().unwrap();
    assert!(err.contains("Pet index out of bounds!"), "{err}");
    assert!(wallet.adopted().is_empty());
    assert!(app.state().adopted().unwrap().is_empty());
});

petshoptest!(second_adoption_while_pending_is_ignored, |prj, wallet| {
    let mut app = connected(&prj, &wallet).await;
    wallet.hold_receipts(true);
    app.dispatch(Action::AdoptRequested(1));
    app.dispatch(Action::AdoptRequested(2));
    app.wait_for(|state| state.session().unwrap().pending.unwrap().tx_hash.is_some()).await;
    assert_eq!(wallet.count("eth_sendTransaction"), 1);

    wallet.release_receipts();
    app.settle().await;
    assert_eq!(wallet.adopted(), [1]);
    assert_eq!(app.state().adopted(), Some(&BTreeSet::from([1])));
});

petshoptest!(account_change_while_pending_resets_session, |prj, wallet| {
    let mut app = connected(&prj, &wallet).await;
    let first = app.state().session().unwrap().generation;
    wallet.hold_receipts(true);
    app.dispatch(Action::AdoptRequested(1));
    app.wait_for(|state| state.session().unwrap().pending.unwrap().tx_hash.is_some()).await;

    wallet.emit_accounts([BOB]);
    app.wait_for(|state| state.session().is_some_and(|session| session.address == BOB)).await;
    let session = app.state().session().unwrap();
    assert!(session.generation > first);
    assert!(session.pending.is_none() && session.tx_error.is_none());

    // The old adoption resolves after the switch and must not touch the new session.
    wallet.release_receipts();
    app.settle().await;
    let session = app.state().session().unwrap();
    assert_eq!(session.address, BOB);
    assert!(session.pending.is_none());
    assert_eq!(app.state().status(), Status::Browsing);

    app.dispatch(Action::AdoptRequested(3));
    app.settle().await;
    assert_eq!(wallet.senders(), [ALICE, BOB]);
});

petshoptest!(empty_accounts_disconnect_and_reconnect, |prj, wallet| {
    let mut app = connected(&prj, &wallet).await;
    wallet.emit_accounts(Vec::<Address>::new());
    app.wait_for(|state| state.status() == Status::Disconnected).await;
    assert!(app.state().session().is_none());

    wallet.set_accounts([ALICE]);
    app.dispatch(Action::ConnectRequested);
    app.settle().await;
    assert_eq!(app.state().status(), Status::Browsing);
    // The account listener is registered once per connector.
    assert_eq!(wallet.subscriptions(), 1);
});

petshoptest!(read_failure_shows_empty_set, |prj, wallet| {
    wallet.set_adopted([1]);
    wallet.fail_reads(Some(RpcError::new(RpcError::DISCONNECTED, "disconnected")));
    let app = connected(&prj, &wallet).await;
    assert_eq!(app.state().status(), Status::Browsing);
    assert!(app.state().adopted().unwrap().is_empty());
});

petshoptest!(missing_deployment_is_reported, |prj, wallet| {
    prj.config_mut().network = "polygon_mumbai".to_string();
    let mut app = connected(&prj, &wallet).await;
    assert_eq!(app.state().status(), Status::Loading);
    let notice = app.state().notice().unwrap();
    assert!(notice.starts_with("failed to load contract"), "{notice}");
    assert_eq!(wallet.count("eth_call"), 0);

    // Once the contract is deployed there, connecting again binds it.
    prj.store()
        .write_deployment("polygon_mumbai", "PetAdoption", CONTRACT, &pet_adoption_artifact())
        .unwrap();
    app.dispatch(Action::ConnectRequested);
    app.settle().await;
    assert_eq!(app.state().status(), Status::Browsing);
    assert!(app.state().notice().is_none());
    assert_eq!(wallet.count("eth_call"), 1);
});
