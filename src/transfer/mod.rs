//! Token transfer subsystem.
//!
//! # Data Flow
//! ```text
//! TransferRequest ─→ request.rs (recipient, amount, token checks)
//!     → orchestrator.rs
//!         estimate_gas: decimals → units → estimateGas → gas price
//!         send_token:   network gate → balance check → estimate (+20%)
//!                       → send (legacy gas price) → receipt
//!     → history.rs (one record per successful hash)
//!
//! Form input ─→ estimator.rs (debounced, latest-input-wins estimate view)
//! ```

pub mod estimator;
pub mod history;
pub mod orchestrator;
pub mod request;

pub use estimator::{EstimateView, GasEstimator};
pub use history::{TransactionHistory, TransactionRecord, TransactionStatus};
pub use orchestrator::{TransferOrchestrator, TransferStatus};
pub use request::TransferRequest;
