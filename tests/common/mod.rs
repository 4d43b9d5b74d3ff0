//! Shared mocks for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use testnet_wallet::blockchain::connection::Connection;
use testnet_wallet::blockchain::types::{ChainId, ProviderFault, ProviderResult, ReceiptOutcome};
use testnet_wallet::provider::{ChainDescriptor, WalletEvent, WalletProvider};

pub const SEPOLIA: ChainId = ChainId(11_155_111);
pub const MAINNET: ChainId = ChainId(1);

pub fn account(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

async fn read_request_body(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        let Some(split) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..split]).to_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= split + 4 + length {
            return String::from_utf8_lossy(&buf[split + 4..split + 4 + length]).into_owned();
        }
    }
    String::new()
}

/// Start a programmable mock HTTP backend. The handler receives the request
/// body and returns a status and a body. Returns the bound address.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let request = read_request_body(&mut socket).await;
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Backend that always answers with `status`, counting hits.
pub async fn start_counting_backend(status: u16) -> (SocketAddr, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let h = hits.clone();
    let addr = start_programmable_backend(move |_| {
        let h = h.clone();
        async move {
            h.fetch_add(1, Ordering::SeqCst);
            (status, "{}".to_string())
        }
    })
    .await;
    (addr, hits)
}

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn word(value: U256) -> Bytes {
    Bytes::from(value.to_be_bytes::<32>().to_vec())
}

/// Scripted chain state shared by a connection and its signer-bound clones.
#[derive(Debug)]
pub struct ChainState {
    pub chain_id: Mutex<ChainId>,
    pub token_balance: Mutex<U256>,
    pub decimals: Mutex<u8>,
    pub native_balance: Mutex<U256>,
    pub gas_estimate: Mutex<u64>,
    pub gas_price: Mutex<u128>,
    pub revert: Mutex<bool>,
    pub estimate_delay: Mutex<Duration>,
    pub receipt_delay: Mutex<Duration>,
    pub fail_calls: Mutex<bool>,
    pub sent: Mutex<Vec<TransactionRequest>>,
    pub estimate_calls: AtomicU32,
    pub call_calls: AtomicU32,
    pub send_calls: AtomicU32,
    next_hash: AtomicU64,
}

impl Default for ChainState {
    fn default() -> Self {
        Self {
            chain_id: Mutex::new(SEPOLIA),
            token_balance: Mutex::new(U256::from(1_000_000_000u64)),
            decimals: Mutex::new(6),
            native_balance: Mutex::new(U256::from(10u64).pow(U256::from(18u64))),
            gas_estimate: Mutex::new(100_000),
            gas_price: Mutex::new(1_000_000_000),
            revert: Mutex::new(false),
            estimate_delay: Mutex::new(Duration::ZERO),
            receipt_delay: Mutex::new(Duration::ZERO),
            fail_calls: Mutex::new(false),
            sent: Mutex::new(Vec::new()),
            estimate_calls: AtomicU32::new(0),
            call_calls: AtomicU32::new(0),
            send_calls: AtomicU32::new(0),
            next_hash: AtomicU64::new(1),
        }
    }
}

/// In-memory [`Connection`] answering ERC-20 reads by selector.
#[derive(Debug, Clone)]
pub struct MockConnection {
    pub state: Arc<ChainState>,
    signer: Option<Address>,
}

impl MockConnection {
    pub fn new(signer: Option<Address>) -> Self {
        Self {
            state: Arc::new(ChainState::default()),
            signer,
        }
    }

    pub fn shared(state: Arc<ChainState>, signer: Option<Address>) -> Self {
        Self { state, signer }
    }

    pub fn set_token_balance(&self, value: U256) {
        *self.state.token_balance.lock().unwrap() = value;
    }

    pub fn set_native_balance(&self, value: U256) {
        *self.state.native_balance.lock().unwrap() = value;
    }

    pub fn set_gas_estimate(&self, value: u64) {
        *self.state.gas_estimate.lock().unwrap() = value;
    }

    pub fn set_revert(&self, value: bool) {
        *self.state.revert.lock().unwrap() = value;
    }

    pub fn set_estimate_delay(&self, value: Duration) {
        *self.state.estimate_delay.lock().unwrap() = value;
    }

    pub fn set_receipt_delay(&self, value: Duration) {
        *self.state.receipt_delay.lock().unwrap() = value;
    }

    pub fn set_chain_id(&self, value: ChainId) {
        *self.state.chain_id.lock().unwrap() = value;
    }

    pub fn set_fail_calls(&self, value: bool) {
        *self.state.fail_calls.lock().unwrap() = value;
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state.sent.lock().unwrap().clone()
    }

    pub fn estimate_calls(&self) -> u32 {
        self.state.estimate_calls.load(Ordering::SeqCst)
    }

    pub fn call_calls(&self) -> u32 {
        self.state.call_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> u32 {
        self.state.send_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn signer(&self) -> Option<Address> {
        self.signer
    }

    async fn chain_id(&self) -> ProviderResult<ChainId> {
        Ok(*self.state.chain_id.lock().unwrap())
    }

    async fn gas_price(&self) -> ProviderResult<u128> {
        Ok(*self.state.gas_price.lock().unwrap())
    }

    async fn native_balance(&self, _owner: Address) -> ProviderResult<U256> {
        Ok(*self.state.native_balance.lock().unwrap())
    }

    async fn call(&self, tx: TransactionRequest) -> ProviderResult<Bytes> {
        self.state.call_calls.fetch_add(1, Ordering::SeqCst);
        if *self.state.fail_calls.lock().unwrap() {
            return Err(ProviderFault::new(-32000, "execution reverted"));
        }
        let input = tx.input.input().cloned().unwrap_or_default();
        if input.len() < 4 {
            return Err(ProviderFault::message("empty calldata"));
        }
        let sel = &input[..4];
        if sel == selector("decimals()") {
            Ok(word(U256::from(*self.state.decimals.lock().unwrap())))
        } else if sel == selector("balanceOf(address)") {
            Ok(word(*self.state.token_balance.lock().unwrap()))
        } else {
            Err(ProviderFault::message("unknown selector"))
        }
    }

    async fn estimate_gas(&self, _tx: TransactionRequest) -> ProviderResult<u64> {
        self.state.estimate_calls.fetch_add(1, Ordering::SeqCst);
        let estimate = *self.state.gas_estimate.lock().unwrap();
        let delay = *self.state.estimate_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(estimate)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> ProviderResult<TxHash> {
        self.state.send_calls.fetch_add(1, Ordering::SeqCst);
        self.state.sent.lock().unwrap().push(tx);
        let n = self.state.next_hash.fetch_add(1, Ordering::SeqCst);
        Ok(TxHash::from(U256::from(n).to_be_bytes::<32>()))
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> ProviderResult<ReceiptOutcome> {
        let delay = *self.state.receipt_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if *self.state.revert.lock().unwrap() {
            Ok(ReceiptOutcome::Reverted { hash })
        } else {
            Ok(ReceiptOutcome::Success {
                hash,
                block_number: Some(1),
            })
        }
    }

    fn with_signer(&self, signer: PrivateKeySigner) -> ProviderResult<Arc<dyn Connection>> {
        Ok(Arc::new(MockConnection::shared(
            self.state.clone(),
            Some(signer.address()),
        )))
    }
}

/// Scripted browser wallet.
pub struct MockWallet {
    pub accounts: Mutex<Vec<Address>>,
    pub authorized: Mutex<Vec<Address>>,
    pub chain_id: Mutex<ChainId>,
    pub request_error: Mutex<Option<ProviderFault>>,
    pub switch_results: Mutex<VecDeque<ProviderResult<()>>>,
    pub switch_delay: Mutex<Duration>,
    pub added: Mutex<Vec<ChainDescriptor>>,
    pub switch_calls: AtomicU32,
    pub add_calls: AtomicU32,
    pub request_calls: AtomicU32,
    pub chain: Arc<ChainState>,
    events: broadcast::Sender<WalletEvent>,
}

impl MockWallet {
    /// Wallet with `accounts` unlocked on `chain_id`. Nothing is authorized
    /// until `request_accounts` succeeds.
    pub fn new(accounts: Vec<Address>, chain_id: ChainId) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            accounts: Mutex::new(accounts),
            authorized: Mutex::new(Vec::new()),
            chain_id: Mutex::new(chain_id),
            request_error: Mutex::new(None),
            switch_results: Mutex::new(VecDeque::new()),
            switch_delay: Mutex::new(Duration::ZERO),
            added: Mutex::new(Vec::new()),
            switch_calls: AtomicU32::new(0),
            add_calls: AtomicU32::new(0),
            request_calls: AtomicU32::new(0),
            chain: Arc::new(ChainState::default()),
            events,
        })
    }

    /// Same as `new`, with the accounts already authorized.
    pub fn authorized(accounts: Vec<Address>, chain_id: ChainId) -> Arc<Self> {
        let wallet = Self::new(accounts.clone(), chain_id);
        *wallet.authorized.lock().unwrap() = accounts;
        wallet
    }

    pub fn set_chain(&self, chain_id: ChainId) {
        *self.chain_id.lock().unwrap() = chain_id;
    }

    pub fn fail_requests(&self, fault: ProviderFault) {
        *self.request_error.lock().unwrap() = Some(fault);
    }

    pub fn push_switch_result(&self, result: ProviderResult<()>) {
        self.switch_results.lock().unwrap().push_back(result);
    }

    pub fn set_switch_delay(&self, delay: Duration) {
        *self.switch_delay.lock().unwrap() = delay;
    }

    pub fn emit(&self, event: WalletEvent) {
        let _ = self.events.send(event);
    }

    pub fn switch_calls(&self) -> u32 {
        self.switch_calls.load(Ordering::SeqCst)
    }

    pub fn add_calls(&self) -> u32 {
        self.add_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(fault) = self.request_error.lock().unwrap().clone() {
            return Err(fault);
        }
        let accounts = self.accounts.lock().unwrap().clone();
        *self.authorized.lock().unwrap() = accounts.clone();
        Ok(accounts)
    }

    async fn accounts(&self) -> ProviderResult<Vec<Address>> {
        Ok(self.authorized.lock().unwrap().clone())
    }

    async fn chain_id(&self) -> ProviderResult<ChainId> {
        Ok(*self.chain_id.lock().unwrap())
    }

    async fn switch_chain(&self, chain_id: ChainId) -> ProviderResult<()> {
        self.switch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.switch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let result = self.switch_results.lock().unwrap().pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.set_chain(chain_id);
        }
        result
    }

    async fn add_chain(&self, descriptor: &ChainDescriptor) -> ProviderResult<()> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        self.added.lock().unwrap().push(descriptor.clone());
        let chain_id = ChainId::parse(&descriptor.chain_id)?;
        self.set_chain(chain_id);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }

    fn connection(&self, account: Address) -> ProviderResult<Arc<dyn Connection>> {
        Ok(Arc::new(MockConnection::shared(self.chain.clone(), Some(account))))
    }
}
