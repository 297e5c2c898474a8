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

//! Error types for payment settlement.
//!
//! Every terminal failure of a settlement run maps to exactly one variant
//! here. Amount-limit rejections from the gateway are *not* represented:
//! they are recoverable and handled inside the engine by halving, and only
//! surface as [`SettlementError::AmountLimitExceeded`] once the retry floor
//! is breached.

use crate::base::PaymentId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Payment settlement errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettlementError {
    /// Requested amount is zero or negative
    #[error("payment amount must be positive")]
    NonPositiveAmount,

    /// Explicit partial amount is larger than the outstanding due
    #[error("partial amount exceeds the outstanding due")]
    PartialExceedsDue,

    /// The gateway keeps rejecting amounts at or below the retry floor;
    /// the account's per-transaction limit is unusually low
    #[error("gateway rejected an amount at the retry floor of {floor}; account transaction limit is unusually low")]
    AmountLimitExceeded { floor: Decimal },

    /// Backend refused to create an order for a reason other than the
    /// amount limit
    #[error("backend rejected the order: {message}")]
    OrderRejected { message: String },

    /// Checkout reported an unrecoverable error
    #[error("checkout failed: {message}")]
    CheckoutFailed { message: String },

    /// The gateway collected a payment that the backend could not confirm.
    /// The charge is real; surface this urgently and reconcile by payment id.
    #[error("payment {payment_id} completed at the gateway but could not be verified: {message}")]
    VerificationFailed {
        payment_id: PaymentId,
        message: String,
    },

    /// Backend unreachable, request timed out, or response was malformed
    #[error("backend request failed: {message}")]
    Transport { message: String },

    /// Settlement configuration is unusable (e.g. retry floor above the
    /// chunk ceiling)
    #[error("invalid settlement configuration: {message}")]
    Configuration { message: String },
}
