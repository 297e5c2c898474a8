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

use chunkpay::sim::{SimulatedBackend, SimulatedCheckout};
use chunkpay::{
    BackendApi, Checkout, HttpBackend, Outcome, PaymentRequest, SettlementConfig,
    SettlementEngine, SettlementError, SettlementLedger,
};
use clap::Parser;
use csv::Writer;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Chunkpay - settle a payment in gateway-sized transactions
///
/// Splits the requested amount under a safe per-transaction ceiling and
/// drives each chunk through order creation, checkout, and verification.
/// Without --backend the run targets an in-process simulated gateway whose
/// hidden limit can be set with --simulate-limit.
#[derive(Parser, Debug)]
#[command(name = "chunkpay")]
#[command(about = "Settle a payment in gateway-sized transactions", long_about = None)]
struct Args {
    /// Outstanding due to settle against
    #[arg(long)]
    due: Decimal,

    /// Partial amount to settle (defaults to the full due)
    #[arg(long)]
    amount: Option<Decimal>,

    /// Description forwarded to the gateway on every chunk
    #[arg(long, default_value = "Payment")]
    description: String,

    /// Safe per-transaction ceiling for the initial chunk plan
    #[arg(long, default_value = "25000")]
    ceiling: Decimal,

    /// Smallest amount worth retrying after a limit rejection
    #[arg(long, default_value = "1000")]
    floor: Decimal,

    /// Delay between gateway calls, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pacing_ms: u64,

    /// Backend base URL; omit to run against the in-process simulator
    #[arg(long)]
    backend: Option<String>,

    /// Bearer token for the backend session
    #[arg(long, default_value = "")]
    token: String,

    /// Hidden per-transaction limit enforced by the simulated gateway
    #[arg(long, default_value = "20000")]
    simulate_limit: Decimal,

    /// Simulate the user dismissing the checkout on the Nth transaction
    #[arg(long)]
    cancel_at: Option<u32>,

    /// Write the settlement ledger CSV here instead of stdout
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Validation happens before any network interaction.
    let request = match build_request(&args) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Invalid payment request: {}", e);
            process::exit(2);
        }
    };

    let config = SettlementConfig {
        chunk_ceiling: args.ceiling,
        retry_floor: args.floor,
        pacing: Duration::from_millis(args.pacing_ms),
        ..Default::default()
    };

    let checkout: Arc<dyn Checkout> = match args.cancel_at {
        Some(attempt) => Arc::new(SimulatedCheckout::dismissing_on(attempt)),
        None => Arc::new(SimulatedCheckout::approving()),
    };

    let backend: Arc<dyn BackendApi> = match &args.backend {
        Some(url) => match HttpBackend::new(url, &args.token) {
            Ok(backend) => Arc::new(backend),
            Err(e) => {
                eprintln!("Error building backend client: {}", e);
                process::exit(1);
            }
        },
        None => Arc::new(SimulatedBackend::new(args.simulate_limit)),
    };

    let engine = match SettlementEngine::new(backend, checkout, config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(2);
        }
    };

    let ledger = engine.settle(request).await;

    // Write the ledger CSV to the chosen sink.
    let result = match &args.output {
        Some(path) => match File::create(path) {
            Ok(file) => write_ledger(&ledger, file),
            Err(e) => {
                eprintln!("Error creating '{}': {}", path.display(), e);
                process::exit(1);
            }
        },
        None => write_ledger(&ledger, std::io::stdout()),
    };
    if let Err(e) = result {
        eprintln!("Error writing ledger: {}", e);
        process::exit(1);
    }

    match ledger.outcome() {
        Outcome::AllSettled => {
            eprintln!(
                "Settled {} across {} transaction(s)",
                ledger.settled_total(),
                ledger.receipts().len()
            );
        }
        Outcome::UserCancelled => {
            eprintln!(
                "Cancelled by user: settled {} of {}, {} outstanding",
                ledger.settled_total(),
                ledger.requested(),
                ledger.unsettled()
            );
        }
        Outcome::HardFailure(error) => {
            eprintln!(
                "Settlement halted: {} (settled {} of {})",
                error,
                ledger.settled_total(),
                ledger.requested()
            );
            process::exit(1);
        }
    }
}

/// Builds the validated payment request from CLI arguments.
fn build_request(args: &Args) -> Result<PaymentRequest, SettlementError> {
    match args.amount {
        Some(amount) => PaymentRequest::partial(args.due, amount, args.description.as_str()),
        None => PaymentRequest::new(args.due, args.description.as_str()),
    }
}

/// Writes settled chunk receipts as CSV.
///
/// # CSV Format
///
/// Columns: `sequence, amount, order_id, payment_id, signature`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
fn write_ledger<W: Write>(ledger: &SettlementLedger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for receipt in ledger.receipts() {
        wtr.serialize(receipt)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("chunkpay").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn full_due_is_the_default_amount() {
        let args = args(&["--due", "60000"]);
        let request = build_request(&args).unwrap();
        assert_eq!(request.amount(), dec!(60000));
        assert_eq!(request.total_due(), dec!(60000));
    }

    #[test]
    fn partial_amount_is_validated_against_the_due() {
        let args = args(&["--due", "60000", "--amount", "70000"]);
        assert_eq!(
            build_request(&args).unwrap_err(),
            SettlementError::PartialExceedsDue
        );
    }

    #[tokio::test]
    async fn ledger_csv_has_receipt_columns() {
        let engine = SettlementEngine::new(
            Arc::new(SimulatedBackend::new(dec!(50000))),
            Arc::new(SimulatedCheckout::approving()),
            SettlementConfig {
                pacing: Duration::ZERO,
                ..Default::default()
            },
        )
        .unwrap();
        let ledger = engine
            .settle(PaymentRequest::new(dec!(30000), "refill").unwrap())
            .await;

        let mut output = Vec::new();
        write_ledger(&ledger, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("sequence,amount,order_id,payment_id,signature"));
        assert_eq!(text.lines().count(), 3); // header + two receipts
    }
}
