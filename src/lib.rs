// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Chunkpay
//!
//! This library settles a payment by splitting it into one or more gateway
//! transactions bounded by a safe per-transaction ceiling, driving each
//! transaction through an external checkout flow, and adaptively shrinking
//! and re-queuing amounts the gateway rejects for exceeding its own
//! undisclosed, account-specific limit.
//!
//! ## Core Components
//!
//! - [`SettlementEngine`]: drives a [`PaymentRequest`] chunk by chunk
//! - [`ChunkQueue`]: the explicit work queue with its conservation invariant
//! - [`LimitRules`]: classifies provider error payloads as over-limit or not
//! - [`SettlementLedger`]: receipts, running total, and terminal [`Outcome`]
//! - [`ProgressHandle`]: poll-safe live progress for UIs
//!
//! ## Example
//!
//! Planning is pure and happens before any network call:
//!
//! ```
//! use chunkpay::ChunkQueue;
//! use rust_decimal_macros::dec;
//!
//! let queue = ChunkQueue::plan(dec!(60000), dec!(25000));
//! let amounts: Vec<_> = queue.iter().map(|c| c.amount()).collect();
//! assert_eq!(amounts, vec![dec!(25000), dec!(25000), dec!(10000)]);
//! ```
//!
//! A full run wires the engine to a backend and a checkout surface (here the
//! in-crate simulator):
//!
//! ```no_run
//! use chunkpay::sim::{SimulatedBackend, SimulatedCheckout};
//! use chunkpay::{PaymentRequest, SettlementConfig, SettlementEngine};
//! use rust_decimal_macros::dec;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), chunkpay::SettlementError> {
//! let backend = Arc::new(SimulatedBackend::new(dec!(20000)));
//! let checkout = Arc::new(SimulatedCheckout::approving());
//! let engine = SettlementEngine::new(backend, checkout, SettlementConfig::default())?;
//!
//! let request = PaymentRequest::new(dec!(60000), "cylinder refill")?;
//! let ledger = engine.settle(request).await;
//! assert!(ledger.is_fully_settled());
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! A settlement run is strictly sequential: never more than one chunk in
//! flight, because each chunk's outcome can change the next chunk's amount.
//! Only the progress handle is meant to be shared across tasks.

pub mod backend;
mod base;
pub mod classify;
mod chunk;
mod engine;
pub mod error;
mod gateway;
mod ledger;
mod progress;
mod queue;
mod request;
pub mod sim;

pub use backend::{BackendApi, BackendError, HttpBackend};
pub use base::{ChunkSeq, OrderId, PaymentId, PaymentSignature};
pub use chunk::{ChunkState, TransactionChunk};
pub use classify::LimitRules;
pub use engine::{SettlementConfig, SettlementEngine};
pub use error::SettlementError;
pub use gateway::{Checkout, CheckoutOutcome, CheckoutReceipt, CheckoutSession};
pub use ledger::{ChunkReceipt, Outcome, SettlementLedger};
pub use progress::{ProgressHandle, ProgressSnapshot, SettlementPhase};
pub use queue::ChunkQueue;
pub use request::PaymentRequest;
