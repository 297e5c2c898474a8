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

//! The checkout seam.
//!
//! The third-party hosted payment flow is reduced to one operation: open a
//! checkout session for an order and wait for the user to finish with it.
//! Implementations are injected into the engine rather than reached through
//! ambient global state, so the orchestrator can be driven by a real SDK
//! binding, a test double, or the in-crate simulator interchangeably.

use crate::base::{OrderId, PaymentId, PaymentSignature};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Everything the hosted checkout needs to present a payment.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    /// Publishable gateway key the backend minted the order under.
    pub key_id: String,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub currency: String,
    /// Business name shown on the checkout surface.
    pub display_name: String,
    pub description: String,
}

/// Proof of a completed checkout, to be verified by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub payment_id: PaymentId,
    pub signature: PaymentSignature,
}

/// Terminal signal from an open checkout session.
///
/// The session is bounded only by user action: it stays open until the user
/// completes the payment, dismisses the surface, or the provider reports an
/// error.
#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    /// Payment collected; carries the proof for backend verification.
    Completed(CheckoutReceipt),
    /// User closed the checkout without paying.
    Dismissed,
    /// Provider-shaped error payload, fed to the amount-limit classifier.
    Failed(serde_json::Value),
}

/// A hosted checkout surface.
#[async_trait]
pub trait Checkout: Send + Sync {
    /// Opens the checkout for one order and resolves when the user is done.
    async fn open(&self, session: CheckoutSession) -> CheckoutOutcome;
}
