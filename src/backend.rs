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

//! Backend API client.
//!
//! Two REST/JSON endpoints gate a settlement: order creation and payment
//! verification. Error bodies are surfaced as raw JSON so the amount-limit
//! classifier can inspect them before the engine decides between a halving
//! retry and a hard failure.

use crate::base::{OrderId, PaymentId, PaymentSignature};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Wire request for minting a gateway order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub amount: Decimal,
    pub description: String,
}

/// A gateway order minted by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrder {
    pub order_id: OrderId,
    pub amount: Decimal,
    pub currency: String,
    /// Publishable key the checkout must be opened with.
    pub key_id: String,
}

/// Wire request for verifying a completed checkout against the due ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub order_id: OrderId,
    pub payment_id: PaymentId,
    pub signature: PaymentSignature,
    pub amount: Decimal,
    pub total_due: Decimal,
    pub description: String,
}

/// Backend confirmation of a settled payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedSettlement {
    pub success: bool,
    /// Provider/backend metadata echoed back with the confirmation.
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, Value>,
}

/// Failures of a single backend call.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    /// The backend answered with an error body. The payload is kept raw for
    /// classification.
    #[error("backend rejected the request: {0}")]
    Rejected(Value),

    /// The backend could not be reached, timed out, or answered with
    /// something that is not JSON.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// The two backend operations a settlement run depends on.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn create_order(&self, order: &CreateOrderRequest) -> Result<GatewayOrder, BackendError>;

    async fn verify_payment(
        &self,
        verify: &VerifyRequest,
    ) -> Result<VerifiedSettlement, BackendError>;
}

/// Default request timeout for backend calls.
///
/// A hung backend call must not leave the settlement stuck in "processing"
/// forever; timeouts surface as [`BackendError::Transport`].
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ORDER_PATH: &str = "/payments/orders";
const VERIFY_PATH: &str = "/payments/verify";

/// HTTP implementation of [`BackendApi`] over the generic order-creation and
/// verification endpoints. Carries the session bearer token.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    token: String,
    order_path: String,
    verify_path: String,
}

impl HttpBackend {
    /// Builds a client for `base_url` authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transport`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    /// Same as [`HttpBackend::new`] with an explicit request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            order_path: ORDER_PATH.to_string(),
            verify_path: VERIFY_PATH.to_string(),
        })
    }

    /// Overrides the endpoint paths for backends with a different route
    /// layout.
    pub fn with_paths(mut self, order_path: impl Into<String>, verify_path: impl Into<String>) -> Self {
        self.order_path = order_path.into();
        self.verify_path = verify_path.into();
        self
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        // The backend reports failures both as non-2xx statuses and as 2xx
        // bodies carrying an `error` field; both paths keep the payload raw.
        if !status.is_success() {
            return Err(BackendError::Rejected(payload));
        }
        if let Some(error) = payload.get("error") {
            return Err(BackendError::Rejected(error.clone()));
        }

        serde_json::from_value(payload).map_err(|e| BackendError::Transport(e.to_string()))
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn create_order(&self, order: &CreateOrderRequest) -> Result<GatewayOrder, BackendError> {
        self.post_json(&self.order_path, order).await
    }

    async fn verify_payment(
        &self,
        verify: &VerifyRequest,
    ) -> Result<VerifiedSettlement, BackendError> {
        self.post_json(&self.verify_path, verify).await
    }
}
