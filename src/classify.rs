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

//! Amount-limit classification of gateway and backend error payloads.
//!
//! Gateways do not disclose their per-account transaction limit; they only
//! reject over-limit orders with provider-shaped error bodies. This module
//! decides, from a raw JSON payload, whether a rejection means "amount
//! exceeds an account-specific limit" (recoverable by halving) or anything
//! else (terminal).
//!
//! Matching is deliberately loose: structured codes where present, otherwise
//! case-insensitive phrase matching on description fields. A false positive
//! costs an unnecessary halving retry; a false negative turns a recoverable
//! rejection into a hard failure. Both are degraded behavior, not
//! correctness violations.

use serde_json::Value;

/// Description-ish fields providers put their human-readable reason in.
const MESSAGE_KEYS: [&str; 5] = ["description", "message", "reason", "error_description", "detail"];

/// Provider matching rules for amount-limit rejections.
///
/// One value per provider; swap it on the engine to support a different
/// gateway without touching orchestration.
#[derive(Debug, Clone)]
pub struct LimitRules {
    codes: Vec<String>,
    phrases: Vec<String>,
}

impl Default for LimitRules {
    fn default() -> Self {
        Self {
            codes: vec![
                "AMOUNT_LIMIT_EXCEEDED".into(),
                "MAX_AMOUNT_EXCEEDED".into(),
                "AMOUNT_EXCEEDS_MAXIMUM".into(),
            ],
            phrases: vec![
                "amount exceeds".into(),
                "exceeds maximum amount".into(),
                "maximum amount limit".into(),
                "above the maximum".into(),
            ],
        }
    }
}

impl LimitRules {
    /// Builds a custom rule set. Codes match exactly (case-insensitive);
    /// phrases match as case-insensitive substrings of description fields.
    pub fn new(
        codes: impl IntoIterator<Item = String>,
        phrases: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            codes: codes.into_iter().collect(),
            phrases: phrases.into_iter().collect(),
        }
    }

    /// Returns `true` when the payload represents an amount-over-limit
    /// rejection. Pure; safe to call on any payload shape.
    pub fn matches(&self, payload: &Value) -> bool {
        match payload {
            Value::String(text) => self.matches_phrase(text),
            Value::Object(map) => {
                if let Some(Value::String(code)) = map.get("code") {
                    if self.matches_code(code) {
                        return true;
                    }
                }
                for key in MESSAGE_KEYS {
                    if let Some(Value::String(text)) = map.get(key) {
                        if self.matches_phrase(text) {
                            return true;
                        }
                    }
                }
                // Providers commonly nest the real error one level down.
                if let Some(inner) = map.get("error") {
                    return self.matches(inner);
                }
                false
            }
            _ => false,
        }
    }

    fn matches_code(&self, code: &str) -> bool {
        self.codes.iter().any(|known| known.eq_ignore_ascii_case(code))
    }

    fn matches_phrase(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.phrases
            .iter()
            .any(|phrase| lowered.contains(&phrase.to_lowercase()))
    }
}

/// Extracts a human-readable message from a provider-shaped error payload,
/// for surfacing terminal failures upstream.
pub fn describe(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        Value::Object(map) => {
            for key in MESSAGE_KEYS {
                if let Some(Value::String(text)) = map.get(key) {
                    return text.clone();
                }
            }
            if let Some(inner) = map.get("error") {
                return describe(inner);
            }
            payload.to_string()
        }
        _ => payload.to_string(),
    }
}
