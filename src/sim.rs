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

//! In-process simulation of the backend and checkout.
//!
//! [`SimulatedBackend`] enforces a hidden per-transaction limit the way a
//! real gateway account does: callers only learn it by having orders
//! rejected. [`SimulatedCheckout`] stands in for the hosted payment surface
//! and can be scripted to dismiss or fail on a given attempt. Both are used
//! by the CLI's offline mode and by tests.

use crate::backend::{
    BackendApi, BackendError, CreateOrderRequest, GatewayOrder, VerifiedSettlement, VerifyRequest,
};
use crate::base::{OrderId, PaymentId, PaymentSignature};
use crate::gateway::{Checkout, CheckoutOutcome, CheckoutReceipt, CheckoutSession};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Backend double with an undisclosed per-transaction limit.
pub struct SimulatedBackend {
    hidden_limit: Decimal,
    currency: String,
    key_id: String,
    fail_verification: bool,
    orders: Mutex<HashMap<OrderId, Decimal>>,
    next_order: AtomicU32,
}

impl SimulatedBackend {
    /// A backend whose account rejects any single transaction above
    /// `hidden_limit`.
    pub fn new(hidden_limit: Decimal) -> Self {
        Self {
            hidden_limit,
            currency: "INR".to_string(),
            key_id: "key_sim".to_string(),
            fail_verification: false,
            orders: Mutex::new(HashMap::new()),
            next_order: AtomicU32::new(0),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Scripts every verification call to be declined.
    pub fn failing_verification(mut self) -> Self {
        self.fail_verification = true;
        self
    }

    /// Number of orders minted so far.
    pub fn orders_created(&self) -> u32 {
        self.next_order.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendApi for SimulatedBackend {
    async fn create_order(&self, order: &CreateOrderRequest) -> Result<GatewayOrder, BackendError> {
        if order.amount > self.hidden_limit {
            // Provider-shaped rejection, matching the default LimitRules.
            return Err(BackendError::Rejected(json!({
                "code": "BAD_REQUEST_ERROR",
                "description": "Amount exceeds maximum amount allowed."
            })));
        }

        let n = self.next_order.fetch_add(1, Ordering::SeqCst) + 1;
        let order_id = OrderId(format!("order_sim_{n}"));
        self.orders.lock().insert(order_id.clone(), order.amount);

        Ok(GatewayOrder {
            order_id,
            amount: order.amount,
            currency: self.currency.clone(),
            key_id: self.key_id.clone(),
        })
    }

    async fn verify_payment(
        &self,
        verify: &VerifyRequest,
    ) -> Result<VerifiedSettlement, BackendError> {
        if self.fail_verification {
            return Err(BackendError::Rejected(json!({
                "description": "signature mismatch"
            })));
        }

        let orders = self.orders.lock();
        match orders.get(&verify.order_id) {
            Some(amount) if *amount == verify.amount => Ok(VerifiedSettlement {
                success: true,
                metadata: serde_json::Map::new(),
            }),
            Some(_) => Err(BackendError::Rejected(json!({
                "description": "verified amount does not match the order"
            }))),
            None => Err(BackendError::Rejected(json!({
                "description": "unknown order"
            }))),
        }
    }
}

/// Checkout double: approves every session unless scripted otherwise.
pub struct SimulatedCheckout {
    /// Dismiss (user cancel) on this 1-based open attempt.
    dismiss_on: Option<u32>,
    /// Fail with this payload on this 1-based open attempt.
    fail_on: Option<(u32, serde_json::Value)>,
    opens: AtomicU32,
}

impl SimulatedCheckout {
    /// A checkout where the simulated user instantly approves everything.
    pub fn approving() -> Self {
        Self {
            dismiss_on: None,
            fail_on: None,
            opens: AtomicU32::new(0),
        }
    }

    /// Scripts the user to dismiss the checkout on the `attempt`-th open.
    pub fn dismissing_on(attempt: u32) -> Self {
        Self {
            dismiss_on: Some(attempt),
            ..Self::approving()
        }
    }

    /// Scripts the provider to raise `payload` on the `attempt`-th open.
    pub fn failing_on(attempt: u32, payload: serde_json::Value) -> Self {
        Self {
            fail_on: Some((attempt, payload)),
            ..Self::approving()
        }
    }

    /// Number of times the checkout has been opened.
    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Checkout for SimulatedCheckout {
    async fn open(&self, session: CheckoutSession) -> CheckoutOutcome {
        let attempt = self.opens.fetch_add(1, Ordering::SeqCst) + 1;

        if self.dismiss_on == Some(attempt) {
            return CheckoutOutcome::Dismissed;
        }
        if let Some((fail_at, payload)) = &self.fail_on {
            if *fail_at == attempt {
                return CheckoutOutcome::Failed(payload.clone());
            }
        }

        CheckoutOutcome::Completed(CheckoutReceipt {
            payment_id: PaymentId(format!("pay_sim_{attempt}")),
            signature: PaymentSignature(format!("sig_{}", session.order_id)),
            order_id: session.order_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn over_limit_order_is_rejected_with_a_classifiable_payload() {
        let backend = SimulatedBackend::new(dec!(20000));
        let result = backend
            .create_order(&CreateOrderRequest {
                amount: dec!(25000),
                description: "too big".into(),
            })
            .await;

        let Err(BackendError::Rejected(payload)) = result else {
            panic!("expected a rejection");
        };
        assert!(crate::classify::LimitRules::default().matches(&payload));
    }

    #[tokio::test]
    async fn verification_checks_the_order_amount() {
        let backend = SimulatedBackend::new(dec!(20000));
        let order = backend
            .create_order(&CreateOrderRequest {
                amount: dec!(10000),
                description: "ok".into(),
            })
            .await
            .unwrap();

        let verify = VerifyRequest {
            order_id: order.order_id.clone(),
            payment_id: PaymentId("pay_1".into()),
            signature: PaymentSignature("sig_1".into()),
            amount: dec!(9999),
            total_due: dec!(10000),
            description: "ok".into(),
        };
        assert!(backend.verify_payment(&verify).await.is_err());

        let verify = VerifyRequest {
            amount: dec!(10000),
            ..verify
        };
        assert!(backend.verify_payment(&verify).await.unwrap().success);
    }

    #[tokio::test]
    async fn checkout_dismisses_on_the_scripted_attempt() {
        let checkout = SimulatedCheckout::dismissing_on(2);
        let session = CheckoutSession {
            key_id: "key_sim".into(),
            order_id: OrderId("order_1".into()),
            amount: dec!(100),
            currency: "INR".into(),
            display_name: "test".into(),
            description: "test".into(),
        };

        assert!(matches!(
            checkout.open(session.clone()).await,
            CheckoutOutcome::Completed(_)
        ));
        assert!(matches!(
            checkout.open(session).await,
            CheckoutOutcome::Dismissed
        ));
    }
}
