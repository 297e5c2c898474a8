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

//! Settlement chunks.
//!
//! Chunks follow a state machine:
//! - [`Pending`] → [`InFlight`] (order submitted)
//! - [`InFlight`] → [`Settled`] (verified) or [`Failed`] (terminal error)
//! - [`InFlight`] → [`Pending`] (amount-limit rejection; the chunk re-enters
//!   the queue at half its amount)
//!
//! [`Pending`]: ChunkState::Pending
//! [`InFlight`]: ChunkState::InFlight
//! [`Settled`]: ChunkState::Settled
//! [`Failed`]: ChunkState::Failed

use crate::base::ChunkSeq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    InFlight,
    Settled,
    Failed,
}

/// One unit of work in the settlement queue.
///
/// The amount is mutable: it shrinks in place when the gateway rejects it
/// as over-limit, with the freed remainder redistributed by the queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionChunk {
    sequence: ChunkSeq,
    amount: Decimal,
    state: ChunkState,
}

impl TransactionChunk {
    pub(crate) fn new(sequence: ChunkSeq, amount: Decimal) -> Self {
        Self {
            sequence,
            amount,
            state: ChunkState::Pending,
        }
    }

    pub fn sequence(&self) -> ChunkSeq {
        self.sequence
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// Splits the current amount into a halved attempt and the freed
    /// remainder: `(floor(amount / 2), amount - floor(amount / 2))`.
    ///
    /// The two parts always sum to the original amount.
    pub fn halved(&self) -> (Decimal, Decimal) {
        let half = (self.amount / dec!(2)).floor();
        (half, self.amount - half)
    }

    pub(crate) fn begin(&mut self) {
        self.state = ChunkState::InFlight;
    }

    pub(crate) fn settle(&mut self) {
        self.state = ChunkState::Settled;
    }

    pub(crate) fn fail(&mut self) {
        self.state = ChunkState::Failed;
    }

    /// Shrinks the chunk to `amount` and returns it to [`ChunkState::Pending`]
    /// for a fresh attempt under the same sequence number.
    pub(crate) fn requeue_at(&mut self, amount: Decimal) {
        self.amount = amount;
        self.state = ChunkState::Pending;
    }

    pub(crate) fn absorb(&mut self, remainder: Decimal) {
        self.amount += remainder;
    }
}
