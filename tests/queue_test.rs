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

//! Chunk queue public API tests: planning, splitting, and the conservation
//! invariant across mixed settle/split sequences.

use chunkpay::{ChunkQueue, ChunkState};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn amounts(queue: &ChunkQueue) -> Vec<Decimal> {
    queue.iter().map(|c| c.amount()).collect()
}

#[test]
fn plan_covers_the_full_amount_in_ceiling_sized_chunks() {
    let queue = ChunkQueue::plan(dec!(60000), dec!(25000));
    assert_eq!(amounts(&queue), vec![dec!(25000), dec!(25000), dec!(10000)]);
    assert_eq!(queue.planned_total(), dec!(60000));
}

#[test]
fn plan_chunk_count_is_the_ceiling_division() {
    for (total, ceiling, expected) in [
        (dec!(1), dec!(25000), 1),
        (dec!(25000), dec!(25000), 1),
        (dec!(25001), dec!(25000), 2),
        (dec!(100000), dec!(25000), 4),
        (dec!(100001), dec!(25000), 5),
    ] {
        let queue = ChunkQueue::plan(total, ceiling);
        assert_eq!(queue.len(), expected, "plan({total}, {ceiling})");
        assert_eq!(queue.outstanding(), total);
    }
}

#[test]
fn plan_twice_with_identical_inputs_is_structurally_identical() {
    let a = ChunkQueue::plan(dec!(87654.32), dec!(25000));
    let b = ChunkQueue::plan(dec!(87654.32), dec!(25000));

    assert_eq!(a.len(), b.len());
    let pairs: Vec<_> = a.iter().zip(b.iter()).collect();
    for (left, right) in pairs {
        assert_eq!(left, right);
    }
}

#[test]
fn all_planned_chunks_start_pending() {
    let queue = ChunkQueue::plan(dec!(60000), dec!(25000));
    assert!(queue.iter().all(|c| c.state() == ChunkState::Pending));
}

#[test]
fn split_moves_the_remainder_to_the_next_chunk() {
    // A 25000 rejection becomes a 12500 attempt, the next chunk gaining the
    // freed 12500.
    let mut queue = ChunkQueue::plan(dec!(60000), dec!(25000));
    let freed = queue.split_front();

    assert_eq!(freed, dec!(12500));
    assert_eq!(amounts(&queue), vec![dec!(12500), dec!(37500), dec!(10000)]);
}

#[test]
fn split_of_the_last_chunk_appends_a_new_one() {
    let mut queue = ChunkQueue::plan(dec!(20000), dec!(25000));
    assert_eq!(queue.len(), 1);

    let freed = queue.split_front();
    assert_eq!(freed, dec!(10000));
    assert_eq!(amounts(&queue), vec![dec!(10000), dec!(10000)]);
    assert_eq!(
        queue.iter().map(|c| c.sequence().0).collect::<Vec<_>>(),
        vec![1, 2]
    );
}

#[test]
fn splitting_never_reorders_later_chunks() {
    let mut queue = ChunkQueue::plan(dec!(100000), dec!(25000));
    queue.split_front();
    let sequences: Vec<u32> = queue.iter().map(|c| c.sequence().0).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);
}

#[test]
fn conservation_holds_across_interleaved_settles_and_splits() {
    let mut queue = ChunkQueue::plan(dec!(60000), dec!(25000));
    let mut settled = Decimal::ZERO;

    // Settle the first chunk.
    let first = queue.pop_front().unwrap();
    settled += first.amount();
    assert_eq!(settled + queue.outstanding(), dec!(60000));

    // Two limit rejections on the new front.
    queue.split_front();
    assert_eq!(settled + queue.outstanding(), dec!(60000));
    queue.split_front();
    assert_eq!(settled + queue.outstanding(), dec!(60000));

    // Settle the shrunken front.
    let front = queue.pop_front().unwrap();
    settled += front.amount();
    assert_eq!(settled + queue.outstanding(), dec!(60000));
}

#[test]
fn chunk_count_is_monotonic_under_splits() {
    let mut queue = ChunkQueue::plan(dec!(60000), dec!(25000));
    let mut previous = queue.len();
    for _ in 0..6 {
        queue.split_front();
        assert!(queue.len() >= previous);
        previous = queue.len();
    }
}

#[test]
fn split_keeps_fractional_totals_intact() {
    let mut queue = ChunkQueue::plan(dec!(999.99), dec!(400));
    assert_eq!(queue.outstanding(), dec!(999.99));

    queue.split_front();
    assert_eq!(queue.outstanding(), dec!(999.99));
    // The halved attempt is floored to whole units; the fractional part
    // rides along in the freed remainder.
    assert_eq!(queue.front().unwrap().amount(), dec!(200));
}
