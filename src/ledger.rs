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

//! The settlement ledger.
//!
//! One ledger per settlement run, held in memory only: the verified chunk
//! receipts, the running settled total, and the terminal outcome. Settled
//! chunks are irreversible gateway charges, so a run that ends in cancellation
//! or failure still reports everything that settled before the halt.

use crate::base::{ChunkSeq, OrderId, PaymentId, PaymentSignature};
use crate::error::SettlementError;
use rust_decimal::Decimal;
use serde::Serialize;

/// Proof that one chunk settled: the gateway artefacts plus the amount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkReceipt {
    pub sequence: ChunkSeq,
    pub amount: Decimal,
    pub order_id: OrderId,
    pub payment_id: PaymentId,
    pub signature: PaymentSignature,
}

/// How a settlement run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Every chunk settled; the full requested amount is paid.
    AllSettled,
    /// The user dismissed the checkout. Informational, not an error.
    UserCancelled,
    /// A terminal error halted the run before completion.
    HardFailure(SettlementError),
}

/// Aggregate result of one settlement run.
#[derive(Debug, Clone)]
pub struct SettlementLedger {
    requested: Decimal,
    receipts: Vec<ChunkReceipt>,
    settled_total: Decimal,
    outcome: Outcome,
}

impl SettlementLedger {
    pub(crate) fn new(requested: Decimal, receipts: Vec<ChunkReceipt>, outcome: Outcome) -> Self {
        let settled_total = receipts.iter().map(|r| r.amount).sum();
        Self {
            requested,
            receipts,
            settled_total,
            outcome,
        }
    }

    /// Amount the run was asked to settle.
    pub fn requested(&self) -> Decimal {
        self.requested
    }

    /// Sum of all verified chunk amounts.
    pub fn settled_total(&self) -> Decimal {
        self.settled_total
    }

    /// Amount that did not settle before the run halted.
    pub fn unsettled(&self) -> Decimal {
        self.requested - self.settled_total
    }

    /// Receipts in settlement order.
    pub fn receipts(&self) -> &[ChunkReceipt] {
        &self.receipts
    }

    /// Metadata of the last chunk that settled, if any did.
    pub fn last_receipt(&self) -> Option<&ChunkReceipt> {
        self.receipts.last()
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn is_fully_settled(&self) -> bool {
        matches!(self.outcome, Outcome::AllSettled)
    }
}
