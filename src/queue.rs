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

//! The settlement work queue.
//!
//! An explicit, strictly sequential queue of [`TransactionChunk`]s. Only the
//! engine mutates it, always from the front; splitting only ever shrinks the
//! front chunk and grows (or appends) a later one, never reorders.
//!
//! # Invariant
//!
//! No currency is created or destroyed by splitting: at every point,
//! `settled + outstanding == planned total`.

use crate::base::ChunkSeq;
use crate::chunk::TransactionChunk;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Queue of pending settlement chunks, consumed front-first.
#[derive(Debug, Clone)]
pub struct ChunkQueue {
    chunks: VecDeque<TransactionChunk>,
    planned_total: Decimal,
    next_sequence: u32,
}

impl ChunkQueue {
    /// Builds the initial queue for `total` under a per-transaction
    /// `ceiling`: `ceil(total / ceiling)` chunks, each `min(remaining,
    /// ceiling)`.
    ///
    /// Pure: no network interaction, deterministic for a given input.
    ///
    /// # Panics
    ///
    /// Debug-asserts that both arguments are positive; callers validate the
    /// amount ([`PaymentRequest`]) and ceiling ([`SettlementConfig`]) first.
    ///
    /// [`PaymentRequest`]: crate::PaymentRequest
    /// [`SettlementConfig`]: crate::SettlementConfig
    pub fn plan(total: Decimal, ceiling: Decimal) -> Self {
        debug_assert!(total > Decimal::ZERO, "plan called with non-positive total");
        debug_assert!(
            ceiling > Decimal::ZERO,
            "plan called with non-positive ceiling"
        );

        let mut chunks = VecDeque::new();
        let mut remaining = total;
        let mut sequence = 0u32;
        while remaining > Decimal::ZERO {
            sequence += 1;
            let amount = remaining.min(ceiling);
            chunks.push_back(TransactionChunk::new(ChunkSeq(sequence), amount));
            remaining -= amount;
        }

        Self {
            chunks,
            planned_total: total,
            next_sequence: sequence,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total amount the queue was planned for, including chunks already
    /// consumed.
    pub fn planned_total(&self) -> Decimal {
        self.planned_total
    }

    /// Sum of all amounts still queued.
    pub fn outstanding(&self) -> Decimal {
        self.chunks.iter().map(TransactionChunk::amount).sum()
    }

    pub fn front(&self) -> Option<&TransactionChunk> {
        self.chunks.front()
    }

    pub(crate) fn front_mut(&mut self) -> Option<&mut TransactionChunk> {
        self.chunks.front_mut()
    }

    /// Removes and returns the front chunk once it has settled.
    pub fn pop_front(&mut self) -> Option<TransactionChunk> {
        self.chunks.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransactionChunk> {
        self.chunks.iter()
    }

    /// Halves the front chunk after an amount-limit rejection.
    ///
    /// The front chunk shrinks to `floor(amount / 2)` and goes back to
    /// pending; the freed remainder is added to the next queued chunk, or
    /// becomes a brand-new chunk appended at the tail when the front is the
    /// last one. Returns the freed amount.
    ///
    /// The queue never shrinks here, and the front chunk keeps its sequence
    /// number for labeling.
    pub fn split_front(&mut self) -> Decimal {
        let outstanding_before = self.outstanding();
        let Some(front) = self.chunks.front_mut() else {
            return Decimal::ZERO;
        };
        let (half, freed) = front.halved();
        front.requeue_at(half);

        if let Some(next) = self.chunks.get_mut(1) {
            next.absorb(freed);
        } else {
            self.next_sequence += 1;
            self.chunks
                .push_back(TransactionChunk::new(ChunkSeq(self.next_sequence), freed));
        }

        debug_assert_eq!(
            self.outstanding(),
            outstanding_before,
            "split must not change the outstanding total"
        );
        freed
    }

    /// Debug check of the conservation invariant against the amount already
    /// settled by the engine.
    pub(crate) fn assert_conserved(&self, settled: Decimal) {
        debug_assert_eq!(
            settled + self.outstanding(),
            self.planned_total,
            "conservation violated: settled {} + outstanding {} != planned {}",
            settled,
            self.outstanding(),
            self.planned_total
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkState;
    use rust_decimal_macros::dec;

    fn amounts(queue: &ChunkQueue) -> Vec<Decimal> {
        queue.iter().map(TransactionChunk::amount).collect()
    }

    #[test]
    fn plan_splits_at_the_ceiling() {
        let queue = ChunkQueue::plan(dec!(60000), dec!(25000));
        assert_eq!(amounts(&queue), vec![dec!(25000), dec!(25000), dec!(10000)]);
        assert_eq!(queue.outstanding(), dec!(60000));
    }

    #[test]
    fn plan_below_ceiling_is_a_single_chunk() {
        let queue = ChunkQueue::plan(dec!(800), dec!(25000));
        assert_eq!(amounts(&queue), vec![dec!(800)]);
    }

    #[test]
    fn plan_at_exact_multiple_has_no_tail_chunk() {
        let queue = ChunkQueue::plan(dec!(50000), dec!(25000));
        assert_eq!(amounts(&queue), vec![dec!(25000), dec!(25000)]);
    }

    #[test]
    fn plan_assigns_ascending_sequence_numbers() {
        let queue = ChunkQueue::plan(dec!(60000), dec!(25000));
        let sequences: Vec<u32> = queue.iter().map(|c| c.sequence().0).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[test]
    fn plan_is_deterministic() {
        let a = ChunkQueue::plan(dec!(123456.78), dec!(25000));
        let b = ChunkQueue::plan(dec!(123456.78), dec!(25000));
        assert_eq!(amounts(&a), amounts(&b));
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn split_front_pushes_remainder_to_next_chunk() {
        let mut queue = ChunkQueue::plan(dec!(60000), dec!(25000));
        let freed = queue.split_front();

        assert_eq!(freed, dec!(12500));
        assert_eq!(amounts(&queue), vec![dec!(12500), dec!(37500), dec!(10000)]);
        assert_eq!(queue.outstanding(), dec!(60000));
    }

    #[test]
    fn split_front_appends_when_front_is_last() {
        let mut queue = ChunkQueue::plan(dec!(25000), dec!(25000));
        assert_eq!(queue.len(), 1);

        queue.split_front();
        assert_eq!(amounts(&queue), vec![dec!(12500), dec!(12500)]);
        assert_eq!(queue.iter().map(|c| c.sequence().0).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn split_front_never_shrinks_the_queue() {
        let mut queue = ChunkQueue::plan(dec!(60000), dec!(25000));
        let before = queue.len();
        queue.split_front();
        assert!(queue.len() >= before);
    }

    #[test]
    fn split_front_resets_the_front_to_pending() {
        let mut queue = ChunkQueue::plan(dec!(60000), dec!(25000));
        queue.front_mut().unwrap().begin();
        queue.split_front();
        assert_eq!(queue.front().unwrap().state(), ChunkState::Pending);
    }

    #[test]
    fn repeated_splits_conserve_the_total() {
        let mut queue = ChunkQueue::plan(dec!(60000), dec!(25000));
        for _ in 0..4 {
            queue.split_front();
            assert_eq!(queue.outstanding(), dec!(60000));
        }
    }

    #[test]
    fn conservation_holds_across_settles_and_splits() {
        let mut queue = ChunkQueue::plan(dec!(60000), dec!(25000));
        let mut settled = Decimal::ZERO;

        let first = queue.pop_front().unwrap();
        settled += first.amount();
        queue.assert_conserved(settled);

        queue.split_front();
        assert_eq!(settled + queue.outstanding(), dec!(60000));
    }
}
