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

//! Live settlement progress.
//!
//! The engine publishes a snapshot at every state transition; callers keep a
//! cheap clone of the handle and poll it at any frequency without touching
//! engine internals. Reading never blocks the drive loop for longer than a
//! field copy.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Where the engine currently is within a settlement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettlementPhase {
    /// No run started yet.
    #[default]
    Idle,
    /// Requesting a gateway order for the current chunk.
    CreatingOrder,
    /// Checkout is open; waiting on the user.
    AwaitingCheckout,
    /// Confirming the payment with the backend.
    Verifying,
    /// Current chunk was halved after a limit rejection; about to retry.
    RetryingSplit,
    /// Terminal outcome reached.
    Finished,
}

/// Read-only view of a settlement run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressSnapshot {
    /// Sequence number of the chunk being worked (0 before the run starts).
    pub chunk: u32,
    /// Total chunks: settled plus still queued. Grows when a split appends.
    pub chunks_total: u32,
    /// Amount currently attempted for the active chunk.
    pub chunk_amount: Decimal,
    /// Sum of all verified chunk amounts so far.
    pub settled_total: Decimal,
    pub phase: SettlementPhase,
}

/// Shared handle to the progress of one engine's runs.
///
/// Cloning is cheap; all clones observe the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    inner: Arc<Mutex<ProgressSnapshot>>,
}

impl ProgressHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.inner.lock().clone()
    }

    pub(crate) fn update(&self, apply: impl FnOnce(&mut ProgressSnapshot)) {
        apply(&mut self.inner.lock());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn starts_idle_and_empty() {
        let handle = ProgressHandle::new();
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.phase, SettlementPhase::Idle);
        assert_eq!(snapshot.chunk, 0);
        assert_eq!(snapshot.settled_total, Decimal::ZERO);
    }

    #[test]
    fn clones_observe_the_same_snapshot() {
        let handle = ProgressHandle::new();
        let observer = handle.clone();

        handle.update(|p| {
            p.chunk = 2;
            p.chunks_total = 3;
            p.chunk_amount = dec!(25000);
            p.phase = SettlementPhase::AwaitingCheckout;
        });

        let seen = observer.snapshot();
        assert_eq!(seen.chunk, 2);
        assert_eq!(seen.chunks_total, 3);
        assert_eq!(seen.phase, SettlementPhase::AwaitingCheckout);
    }
}
