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

//! Payment request validation.
//!
//! A [`PaymentRequest`] is validated once at construction and immutable from
//! then on. Validation failures never reach the network.

use crate::error::SettlementError;
use rust_decimal::Decimal;

/// A validated intent to settle a payment.
///
/// Carries the amount to settle, the due ceiling it settles against, and a
/// free-text description forwarded to the gateway on every chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    amount: Decimal,
    total_due: Decimal,
    description: String,
}

impl PaymentRequest {
    /// Creates a request that settles the full outstanding due.
    ///
    /// # Errors
    ///
    /// Returns [`SettlementError::NonPositiveAmount`] if `total_due` is zero
    /// or negative.
    pub fn new(
        total_due: Decimal,
        description: impl Into<String>,
    ) -> Result<Self, SettlementError> {
        if total_due <= Decimal::ZERO {
            return Err(SettlementError::NonPositiveAmount);
        }
        Ok(Self {
            amount: total_due,
            total_due,
            description: description.into(),
        })
    }

    /// Creates a request that settles an explicit partial amount against
    /// the outstanding due.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::NonPositiveAmount`] if `amount` is zero or negative.
    /// - [`SettlementError::PartialExceedsDue`] if `amount > total_due`.
    pub fn partial(
        total_due: Decimal,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Result<Self, SettlementError> {
        if amount <= Decimal::ZERO {
            return Err(SettlementError::NonPositiveAmount);
        }
        if amount > total_due {
            return Err(SettlementError::PartialExceedsDue);
        }
        Ok(Self {
            amount,
            total_due,
            description: description.into(),
        })
    }

    /// Amount this request will settle.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    /// Due ceiling the backend enforces independently of chunking.
    pub fn total_due(&self) -> Decimal {
        self.total_due
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}
