//! ERC-20 calls encoded with alloy's `sol!` macro.
//!
//! Reads go through [`Connection::call`], writes are built as plain
//! [`TransactionRequest`]s so the caller controls gas settings.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::blockchain::connection::Connection;
use crate::blockchain::types::{ProviderFault, ProviderResult};

sol! {
    /// Minimal ERC-20 surface used by the wallet.
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// Handle to a deployed ERC-20 contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Erc20 {
    address: Address,
}

impl Erc20 {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn read_request(&self, data: Vec<u8>) -> TransactionRequest {
        TransactionRequest::default()
            .with_to(self.address)
            .with_input(Bytes::from(data))
    }

    fn decode_error(&self, what: &str, err: alloy::sol_types::Error) -> ProviderFault {
        ProviderFault::message(format!(
            "could not decode {} from token {}: {}",
            what, self.address, err
        ))
    }

    pub async fn name(&self, connection: &dyn Connection) -> ProviderResult<String> {
        let out = connection
            .call(self.read_request(IERC20::nameCall {}.abi_encode()))
            .await?;
        IERC20::nameCall::abi_decode_returns(&out).map_err(|e| self.decode_error("name", e))
    }

    pub async fn symbol(&self, connection: &dyn Connection) -> ProviderResult<String> {
        let out = connection
            .call(self.read_request(IERC20::symbolCall {}.abi_encode()))
            .await?;
        IERC20::symbolCall::abi_decode_returns(&out).map_err(|e| self.decode_error("symbol", e))
    }

    /// On-chain decimal count.
    pub async fn decimals(&self, connection: &dyn Connection) -> ProviderResult<u8> {
        let out = connection
            .call(self.read_request(IERC20::decimalsCall {}.abi_encode()))
            .await?;
        IERC20::decimalsCall::abi_decode_returns(&out)
            .map_err(|e| self.decode_error("decimals", e))
    }

    pub async fn balance_of(
        &self,
        connection: &dyn Connection,
        owner: Address,
    ) -> ProviderResult<U256> {
        let out = connection
            .call(self.read_request(IERC20::balanceOfCall { owner }.abi_encode()))
            .await?;
        IERC20::balanceOfCall::abi_decode_returns(&out)
            .map_err(|e| self.decode_error("balance", e))
    }

    /// Unsigned `transfer(to, amount)` transaction, without gas settings.
    pub fn transfer_request(
        &self,
        from: Option<Address>,
        to: Address,
        amount: U256,
    ) -> TransactionRequest {
        let tx = self.read_request(IERC20::transferCall { to, amount }.abi_encode());
        match from {
            Some(from) => tx.with_from(from),
            None => tx,
        }
    }
}
