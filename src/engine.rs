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

//! The settlement engine.
//!
//! Drives a [`PaymentRequest`] to completion by settling chunks strictly in
//! queue order: create a gateway order, open the checkout, verify the
//! payment, advance. Amount-limit rejections from either the backend or the
//! checkout are handled transparently by halving the chunk and
//! redistributing the remainder; everything else is terminal.
//!
//! # Sequencing
//!
//! At most one chunk is ever in flight. Each chunk's outcome (and possible
//! amount reduction) determines the next chunk's starting amount, so chunks
//! are settled one at a time with a fixed pacing delay between gateway
//! calls.
//!
//! # Irreversibility
//!
//! Settled chunks are real gateway charges and are never rolled back. Retry
//! attempts after a limit rejection are brand-new orders with no shared
//! idempotency key; a network partition during verification can therefore
//! leave a charge the backend never confirmed, which is surfaced as
//! [`SettlementError::VerificationFailed`] with the gateway payment id
//! preserved for reconciliation.

use crate::backend::{BackendApi, BackendError, CreateOrderRequest, VerifyRequest};
use crate::classify::{self, LimitRules};
use crate::error::SettlementError;
use crate::gateway::{Checkout, CheckoutOutcome, CheckoutSession};
use crate::ledger::{ChunkReceipt, Outcome, SettlementLedger};
use crate::progress::{ProgressHandle, SettlementPhase};
use crate::queue::ChunkQueue;
use crate::request::PaymentRequest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Tuning knobs for a settlement run.
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Safe per-transaction ceiling used to build the initial queue. Chosen
    /// well below known gateway maxima; the true account limit may still be
    /// lower and is discovered by halving.
    pub chunk_ceiling: Decimal,
    /// Smallest amount worth retrying after a limit rejection. A rejection
    /// at or below this floor is unrecoverable.
    pub retry_floor: Decimal,
    /// Delay between consecutive gateway calls (next chunk, or a halved
    /// retry of the same chunk).
    pub pacing: Duration,
    /// Business name shown on the checkout surface.
    pub display_name: String,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            chunk_ceiling: dec!(25000),
            retry_floor: dec!(1000),
            pacing: Duration::from_secs(1),
            display_name: "chunkpay".to_string(),
        }
    }
}

impl SettlementConfig {
    fn validate(&self) -> Result<(), SettlementError> {
        if self.chunk_ceiling <= Decimal::ZERO {
            return Err(SettlementError::Configuration {
                message: "chunk ceiling must be positive".into(),
            });
        }
        // Halving floors to whole units; a sub-unit floor could retry down
        // to zero-amount orders.
        if self.retry_floor < Decimal::ONE {
            return Err(SettlementError::Configuration {
                message: "retry floor must be at least one currency unit".into(),
            });
        }
        if self.retry_floor >= self.chunk_ceiling {
            return Err(SettlementError::Configuration {
                message: "retry floor must be below the chunk ceiling".into(),
            });
        }
        Ok(())
    }
}

/// Settlement orchestrator.
///
/// Holds the backend and checkout seams plus the limit-classification rules,
/// and exposes a progress handle the caller can poll from anywhere.
pub struct SettlementEngine {
    backend: Arc<dyn BackendApi>,
    checkout: Arc<dyn Checkout>,
    rules: LimitRules,
    config: SettlementConfig,
    progress: ProgressHandle,
}

impl SettlementEngine {
    /// Creates an engine over the given backend and checkout.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::Configuration`] when the config is
    /// unusable (non-positive ceiling, sub-unit floor, floor at or above the
    /// ceiling).
    pub fn new(
        backend: Arc<dyn BackendApi>,
        checkout: Arc<dyn Checkout>,
        config: SettlementConfig,
    ) -> Result<Self, SettlementError> {
        config.validate()?;
        Ok(Self {
            backend,
            checkout,
            rules: LimitRules::default(),
            config,
            progress: ProgressHandle::new(),
        })
    }

    /// Replaces the amount-limit classification rules, e.g. for a different
    /// payment provider.
    pub fn with_rules(mut self, rules: LimitRules) -> Self {
        self.rules = rules;
        self
    }

    /// Handle for polling live progress of this engine's runs.
    pub fn progress(&self) -> ProgressHandle {
        self.progress.clone()
    }

    /// Settles the request and returns the ledger with its terminal outcome.
    ///
    /// The queue is fully materialized before the first network call. On any
    /// terminal condition the ledger still carries every chunk that settled
    /// before the halt.
    pub async fn settle(&self, request: PaymentRequest) -> SettlementLedger {
        let mut queue = ChunkQueue::plan(request.amount(), self.config.chunk_ceiling);
        let mut receipts = Vec::new();

        info!(
            amount = %request.amount(),
            chunks = queue.len(),
            ceiling = %self.config.chunk_ceiling,
            "settlement started"
        );
        self.progress.update(|p| {
            *p = Default::default();
            p.chunks_total = queue.len() as u32;
        });

        let outcome = self.drive(&request, &mut queue, &mut receipts).await;

        let settled: Decimal = receipts.iter().map(|r| r.amount).sum();
        self.progress.update(|p| {
            p.settled_total = settled;
            p.phase = SettlementPhase::Finished;
        });
        match &outcome {
            Outcome::AllSettled => info!(%settled, "settlement complete"),
            Outcome::UserCancelled => {
                info!(%settled, outstanding = %(request.amount() - settled), "settlement cancelled by user")
            }
            Outcome::HardFailure(error) => {
                warn!(%settled, %error, "settlement halted")
            }
        }

        SettlementLedger::new(request.amount(), receipts, outcome)
    }

    async fn drive(
        &self,
        request: &PaymentRequest,
        queue: &mut ChunkQueue,
        receipts: &mut Vec<ChunkReceipt>,
    ) -> Outcome {
        let mut settled = Decimal::ZERO;

        while !queue.is_empty() {
            queue.assert_conserved(settled);

            let Some(front) = queue.front_mut() else {
                break;
            };
            let sequence = front.sequence();
            let amount = front.amount();
            front.begin();

            self.progress.update(|p| {
                p.chunk = sequence.0;
                p.chunks_total = (receipts.len() + queue.len()) as u32;
                p.chunk_amount = amount;
                p.settled_total = settled;
                p.phase = SettlementPhase::CreatingOrder;
            });
            debug!(%sequence, %amount, "creating gateway order");

            let create = CreateOrderRequest {
                amount,
                description: request.description().to_string(),
            };
            let order = match self.backend.create_order(&create).await {
                Ok(order) => order,
                Err(BackendError::Rejected(payload)) if self.rules.matches(&payload) => {
                    match self.split_or_halt(queue).await {
                        Ok(()) => continue,
                        Err(error) => return Outcome::HardFailure(error),
                    }
                }
                Err(BackendError::Rejected(payload)) => {
                    self.fail_front(queue);
                    return Outcome::HardFailure(SettlementError::OrderRejected {
                        message: classify::describe(&payload),
                    });
                }
                Err(BackendError::Transport(message)) => {
                    self.fail_front(queue);
                    return Outcome::HardFailure(SettlementError::Transport { message });
                }
            };

            self.progress
                .update(|p| p.phase = SettlementPhase::AwaitingCheckout);
            let session = CheckoutSession {
                key_id: order.key_id.clone(),
                order_id: order.order_id.clone(),
                amount: order.amount,
                currency: order.currency.clone(),
                display_name: self.config.display_name.clone(),
                description: request.description().to_string(),
            };

            match self.checkout.open(session).await {
                CheckoutOutcome::Completed(receipt) => {
                    self.progress.update(|p| p.phase = SettlementPhase::Verifying);
                    let verify = VerifyRequest {
                        order_id: receipt.order_id.clone(),
                        payment_id: receipt.payment_id.clone(),
                        signature: receipt.signature.clone(),
                        amount,
                        total_due: request.total_due(),
                        description: request.description().to_string(),
                    };
                    match self.backend.verify_payment(&verify).await {
                        Ok(confirmation) if confirmation.success => {
                            if let Some(mut chunk) = queue.pop_front() {
                                chunk.settle();
                            }
                            settled += amount;
                            receipts.push(ChunkReceipt {
                                sequence,
                                amount,
                                order_id: receipt.order_id,
                                payment_id: receipt.payment_id,
                                signature: receipt.signature,
                            });
                            info!(%sequence, %amount, %settled, "chunk settled");
                            self.progress.update(|p| p.settled_total = settled);

                            if !queue.is_empty() {
                                sleep(self.config.pacing).await;
                            }
                        }
                        Ok(_) => {
                            self.fail_front(queue);
                            return Outcome::HardFailure(SettlementError::VerificationFailed {
                                payment_id: receipt.payment_id,
                                message: "backend declined the settlement".into(),
                            });
                        }
                        Err(BackendError::Rejected(payload)) => {
                            self.fail_front(queue);
                            return Outcome::HardFailure(SettlementError::VerificationFailed {
                                payment_id: receipt.payment_id,
                                message: classify::describe(&payload),
                            });
                        }
                        // The charge may already exist at the gateway, so a
                        // transport failure here is a verification failure,
                        // not a retryable transport error.
                        Err(BackendError::Transport(message)) => {
                            self.fail_front(queue);
                            return Outcome::HardFailure(SettlementError::VerificationFailed {
                                payment_id: receipt.payment_id,
                                message,
                            });
                        }
                    }
                }
                CheckoutOutcome::Dismissed => {
                    self.fail_front(queue);
                    warn!(%sequence, "user dismissed the checkout");
                    return Outcome::UserCancelled;
                }
                CheckoutOutcome::Failed(payload) if self.rules.matches(&payload) => {
                    match self.split_or_halt(queue).await {
                        Ok(()) => continue,
                        Err(error) => return Outcome::HardFailure(error),
                    }
                }
                CheckoutOutcome::Failed(payload) => {
                    self.fail_front(queue);
                    return Outcome::HardFailure(SettlementError::CheckoutFailed {
                        message: classify::describe(&payload),
                    });
                }
            }
        }

        Outcome::AllSettled
    }

    /// Handles an amount-limit rejection of the front chunk: halve and pace
    /// if the amount is still above the retry floor, otherwise give up.
    async fn split_or_halt(&self, queue: &mut ChunkQueue) -> Result<(), SettlementError> {
        let Some(front) = queue.front_mut() else {
            return Ok(());
        };
        let sequence = front.sequence();

        if front.amount() <= self.config.retry_floor {
            front.fail();
            warn!(
                %sequence,
                amount = %front.amount(),
                floor = %self.config.retry_floor,
                "limit rejection at the retry floor; giving up"
            );
            return Err(SettlementError::AmountLimitExceeded {
                floor: self.config.retry_floor,
            });
        }

        let freed = queue.split_front();
        let halved = queue.front().map(|c| c.amount()).unwrap_or_default();
        warn!(%sequence, %halved, %freed, "over-limit rejection; halved and redistributed");
        self.progress.update(|p| {
            p.chunk_amount = halved;
            p.phase = SettlementPhase::RetryingSplit;
        });

        sleep(self.config.pacing).await;
        Ok(())
    }

    fn fail_front(&self, queue: &mut ChunkQueue) {
        if let Some(front) = queue.front_mut() {
            front.fail();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SettlementConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_ceiling_is_rejected() {
        let config = SettlementConfig {
            chunk_ceiling: Decimal::ZERO,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SettlementError::Configuration { .. })
        ));
    }

    #[test]
    fn sub_unit_floor_is_rejected() {
        let config = SettlementConfig {
            retry_floor: dec!(0.5),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SettlementError::Configuration { .. })
        ));
    }

    #[test]
    fn floor_at_ceiling_is_rejected() {
        let config = SettlementConfig {
            chunk_ceiling: dec!(1000),
            retry_floor: dec!(1000),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SettlementError::Configuration { .. })
        ));
    }
}
