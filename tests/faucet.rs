//! Treasury top-up with HTTP faucet and manual fallbacks.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::utils::parse_ether;

use testnet_wallet::blockchain::wallet::TreasuryWallet;
use testnet_wallet::config::{FaucetConfig, FaucetEndpointConfig, TokenFaucetConfig};
use testnet_wallet::faucet::{TopupOutcome, TopupStatus, TreasuryFaucet};
use testnet_wallet::WalletError;

mod common;
use common::{
    account, start_counting_backend, start_programmable_backend, MockConnection, MAINNET,
    SEPOLIA,
};

// Well-known development key; never funded on a real network.
const TREASURY_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn endpoint(name: &str, addr: SocketAddr) -> FaucetEndpointConfig {
    FaucetEndpointConfig {
        name: name.to_string(),
        url: format!("http://{}/faucet", addr),
    }
}

fn config(endpoints: Vec<FaucetEndpointConfig>) -> FaucetConfig {
    FaucetConfig {
        endpoints,
        token_endpoints: Vec::new(),
        manual_url: "https://faucet.example/?address={address}".to_string(),
        request_timeout_secs: 2,
        ..FaucetConfig::default()
    }
}

fn treasury() -> TreasuryWallet {
    TreasuryWallet::from_private_key(TREASURY_KEY).unwrap()
}

fn faucet(config: FaucetConfig, treasury: Option<TreasuryWallet>) -> TreasuryFaucet {
    TreasuryFaucet::new(config, treasury, SEPOLIA).unwrap()
}

#[tokio::test]
async fn test_treasury_funds_directly() {
    let (addr, hits) = start_counting_backend(200).await;
    let faucet = faucet(config(vec![endpoint("http", addr)]), Some(treasury()));
    let connection = MockConnection::new(None);
    connection.set_native_balance(parse_ether("1").unwrap());

    let outcome = faucet.request_topup(account(9), &connection).await.unwrap();

    let (amount, from) = match outcome {
        TopupOutcome::Treasury { amount, treasury, .. } => (amount, treasury),
        other => panic!("expected treasury outcome, got {:?}", other),
    };
    assert_eq!(amount, "0.1 ETH");
    assert_eq!(Some(from), faucet.treasury_address());

    let sent = connection.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].value, Some(parse_ether("0.1").unwrap()));
    assert_eq!(sent[0].gas, Some(21_000));
    assert!(sent[0].gas_price.is_some());
    assert_eq!(sent[0].from, Some(from));

    assert_eq!(hits.load(Ordering::SeqCst), 0, "HTTP faucets untouched");
    assert!(!faucet.can_request(), "Cooldown starts after success");
}

#[tokio::test]
async fn test_low_treasury_falls_back_to_http_faucet() {
    let (failing, failing_hits) = start_counting_backend(500).await;

    let bodies = Arc::new(Mutex::new(Vec::new()));
    let b = bodies.clone();
    let working = start_programmable_backend(move |body| {
        let b = b.clone();
        async move {
            b.lock().unwrap().push(body);
            (200, r#"{"ok":true}"#.to_string())
        }
    })
    .await;

    let faucet = faucet(
        config(vec![endpoint("broken", failing), endpoint("backup", working)]),
        Some(treasury()),
    );
    let connection = MockConnection::new(None);
    // 0.05 ETH is below the 0.1 ETH top-up.
    connection.set_native_balance(parse_ether("0.05").unwrap());

    let outcome = faucet.request_topup(account(9), &connection).await.unwrap();

    assert_eq!(
        outcome,
        TopupOutcome::Faucet {
            name: "backup".to_string()
        }
    );
    assert_eq!(connection.send_calls(), 0, "Treasury must not send when short");
    assert_eq!(failing_hits.load(Ordering::SeqCst), 1);

    let bodies = bodies.lock().unwrap();
    let body: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
    assert_eq!(body["address"], account(9).to_string());
    assert!(!faucet.can_request());
}

#[tokio::test]
async fn test_reverted_treasury_transfer_falls_back() {
    let (addr, hits) = start_counting_backend(200).await;
    let faucet = faucet(config(vec![endpoint("http", addr)]), Some(treasury()));
    let connection = MockConnection::new(None);
    connection.set_native_balance(parse_ether("1").unwrap());
    connection.set_revert(true);

    let outcome = faucet.request_topup(account(9), &connection).await.unwrap();

    assert_eq!(outcome, TopupOutcome::Faucet { name: "http".to_string() });
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_everything_failing_yields_manual_url() {
    let (addr, hits) = start_counting_backend(503).await;
    let faucet = faucet(config(vec![endpoint("down", addr)]), None);
    let connection = MockConnection::new(None);

    let outcome = faucet.request_topup(account(9), &connection).await.unwrap();

    assert_eq!(
        outcome,
        TopupOutcome::Manual {
            url: format!("https://faucet.example/?address={}", account(9))
        }
    );
    assert!(!outcome.is_success());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(faucet.can_request(), "A manual outcome does not start the cooldown");
}

#[tokio::test]
async fn test_treasury_info() {
    let connection = MockConnection::new(None);
    connection.set_native_balance(parse_ether("0.2").unwrap());

    let with_treasury = faucet(config(Vec::new()), Some(treasury()));
    let info = with_treasury.treasury_info(&connection).await;
    assert_eq!(info.balance, "0.200000000000000000");
    assert!(info.available);

    connection.set_native_balance(parse_ether("0.1").unwrap());
    assert!(!with_treasury.treasury_info(&connection).await.available, "Must exceed one top-up");

    let without = faucet(config(Vec::new()), None);
    let info = without.treasury_info(&connection).await;
    assert_eq!(info.balance, "0");
    assert!(!info.available);
}

#[tokio::test]
async fn test_token_faucets_report_per_token() {
    let (ok_addr, _) = start_counting_backend(200).await;
    let (bad_addr, bad_hits) = start_counting_backend(429).await;

    let bodies = Arc::new(Mutex::new(Vec::new()));
    let b = bodies.clone();
    let recording = start_programmable_backend(move |body| {
        let b = b.clone();
        async move {
            b.lock().unwrap().push(body);
            (404, String::new())
        }
    })
    .await;

    let mut cfg = config(Vec::new());
    cfg.network_label = "sepolia".to_string();
    cfg.token_endpoints = vec![
        TokenFaucetConfig {
            token: "WETH".to_string(),
            endpoints: vec![endpoint("weth-bad", bad_addr), endpoint("weth-ok", ok_addr)],
            manual_url: None,
        },
        TokenFaucetConfig {
            token: "USDC".to_string(),
            endpoints: vec![endpoint("usdc-recording", recording)],
            manual_url: None,
        },
    ];
    let faucet = faucet(cfg, None);

    let results = faucet.request_test_tokens(account(4)).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].token, "WETH");
    assert_eq!(results[0].faucet.as_deref(), Some("weth-ok"));
    assert!(results[0].error.is_none());
    assert_eq!(bad_hits.load(Ordering::SeqCst), 1);

    assert_eq!(results[1].token, "USDC");
    assert!(results[1].faucet.is_none());
    assert_eq!(results[1].error.as_deref(), Some("All faucets failed"));

    let bodies = bodies.lock().unwrap();
    let body: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
    assert_eq!(body["token"], "USDC");
    assert_eq!(body["network"], "sepolia");
    assert_eq!(body["address"], account(4).to_string());
}

#[tokio::test]
async fn test_token_without_accepting_faucet_gets_manual_page() {
    let (down, hits) = start_counting_backend(503).await;

    let mut cfg = config(Vec::new());
    cfg.token_endpoints = vec![
        TokenFaucetConfig {
            token: "LINK".to_string(),
            endpoints: Vec::new(),
            manual_url: Some("https://link.example/?address={address}".to_string()),
        },
        TokenFaucetConfig {
            token: "WETH".to_string(),
            endpoints: vec![endpoint("weth-down", down)],
            manual_url: Some("https://weth.example/{address}".to_string()),
        },
    ];
    let faucet = faucet(cfg, None);

    let results = faucet.request_test_tokens(account(4)).await.unwrap();

    assert_eq!(
        results[0].manual_url,
        Some(format!("https://link.example/?address={}", account(4)))
    );
    assert!(results[0].is_manual() && !results[0].is_success());
    assert!(results[0].error.is_none());

    assert_eq!(hits.load(Ordering::SeqCst), 1, "Endpoints are tried before the page");
    assert_eq!(
        results[1].manual_url,
        Some(format!("https://weth.example/{}", account(4)))
    );
}

#[tokio::test]
async fn test_wrong_network_refuses_topup() {
    let (addr, hits) = start_counting_backend(200).await;
    let faucet = faucet(config(vec![endpoint("http", addr)]), Some(treasury()));
    let connection = MockConnection::new(None);
    connection.set_native_balance(parse_ether("1").unwrap());
    connection.set_chain_id(MAINNET);

    let err = faucet
        .request_topup(account(9), &connection)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WalletError::UnsupportedNetwork {
            expected: 11_155_111,
            actual: 1,
        }
    );
    assert_eq!(connection.send_calls(), 0, "Nothing may be signed off-network");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(faucet.status(), TopupStatus::Error { error: err });
    assert!(faucet.can_request(), "A refused top-up does not start the cooldown");
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_topup_is_rejected() {
    let faucet = faucet(config(Vec::new()), Some(treasury()));
    let connection = MockConnection::new(None);
    connection.set_native_balance(parse_ether("1").unwrap());
    connection.set_receipt_delay(Duration::from_secs(1));

    let (first, second) = tokio::join!(
        faucet.request_topup(account(9), &connection),
        faucet.request_topup(account(9), &connection),
    );

    assert!(matches!(first, Ok(TopupOutcome::Treasury { .. })));
    assert_eq!(second, Err(WalletError::FaucetBusy));
    assert_eq!(connection.send_calls(), 1, "Treasury must pay out once");
    assert!(!faucet.is_requesting());

    // The flag is released once the first request finishes.
    let third = faucet.request_topup(account(9), &connection).await;
    assert!(third.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_topup_status_lifecycle() {
    let faucet = Arc::new(faucet(config(Vec::new()), Some(treasury())));
    let connection = MockConnection::new(None);
    connection.set_native_balance(parse_ether("1").unwrap());
    connection.set_receipt_delay(Duration::from_secs(1));

    let task = {
        let faucet = Arc::clone(&faucet);
        let connection = connection.clone();
        tokio::spawn(async move { faucet.request_topup(account(9), &connection).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(faucet.status(), TopupStatus::Requesting);
    assert!(faucet.is_requesting());

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(faucet.status(), TopupStatus::Done { outcome });

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(faucet.status().is_terminal(), "Too early to reset");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(faucet.status(), TopupStatus::Idle);
}

#[tokio::test]
async fn test_overlapping_token_requests_rejected() {
    let slow = start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        (200, String::new())
    })
    .await;

    let mut cfg = config(Vec::new());
    cfg.token_endpoints = vec![TokenFaucetConfig {
        token: "WETH".to_string(),
        endpoints: vec![endpoint("slow", slow)],
        manual_url: None,
    }];
    let faucet = faucet(cfg, None);

    let (first, second) = tokio::join!(
        faucet.request_test_tokens(account(4)),
        faucet.request_test_tokens(account(4)),
    );

    assert_eq!(first.unwrap()[0].faucet.as_deref(), Some("slow"));
    assert_eq!(second.unwrap_err(), WalletError::FaucetBusy);
    assert!(!faucet.is_requesting_tokens());
}
