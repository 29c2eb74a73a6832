//! Operator dashboard aggregates.
//!
//! A read-only projection over every customer with at least one pack. All
//! amounts are summed as decimals and rounded only when serialized.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use boxset_core::{Amount, PackLine};

use crate::db::{CustomerLedger, RepositoryError};
use crate::models::Customer;

/// Number of refund requests listed on the dashboard.
const RECENT_REQUESTS: usize = 10;

/// Per-line pack counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineStats {
    /// Packs purchased on this line.
    pub total: u64,
    /// Packs on this line held by customers who requested a refund.
    pub with_request: u64,
}

/// One entry of the recent refund requests list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentRequest {
    /// When the request was recorded.
    pub date: DateTime<Utc>,
    /// Amount counted for it.
    pub amount: Amount,
    /// Mélancolie packs.
    pub melancolie: u32,
    /// Symphonie packs.
    pub symphonie: u32,
}

/// Dashboard figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    /// Refund owed if every eligible customer asked.
    pub total_amount: Amount,
    /// Amount of the requests received so far.
    pub processed_amount: Amount,
    /// Computed amount of customers who have not asked yet.
    pub pending_amount: Amount,
    /// Processed amount divided by requests received, rounded.
    pub average_amount: i64,
    /// Customers with at least one pack.
    pub eligible_customers: usize,
    /// Customers who requested a refund.
    pub requests_received: usize,
    /// Customers who did not.
    pub awaiting_response: usize,
    /// `requests_received / eligible_customers` as a rounded percentage.
    pub response_rate: u64,
    /// Customers who completed a format choice.
    pub format_choices_completed: usize,
    /// Per-line totals.
    pub packs: BTreeMap<PackLine, LineStats>,
    /// Most recent refund requests, newest first.
    pub recent_requests: Vec<RecentRequest>,
}

/// Round-half-up percentage of `part` over `whole`; 0 when `whole` is 0.
fn percentage(part: usize, whole: usize) -> u64 {
    if whole == 0 {
        return 0;
    }
    let (Ok(part), Ok(whole)) = (u64::try_from(part), u64::try_from(whole)) else {
        return 0;
    };
    let (part, whole) = (u128::from(part), u128::from(whole));
    u64::try_from((part * 200 + whole) / (2 * whole)).unwrap_or(0)
}

/// Aggregate the dashboard over a set of customers.
///
/// Customers without packs are skipped, so the caller may pass the whole
/// ledger.
#[must_use]
pub fn compute_stats(customers: &[Customer]) -> StatsReport {
    let mut total_amount = Amount::ZERO;
    let mut processed_amount = Amount::ZERO;
    let mut pending_amount = Amount::ZERO;
    let mut eligible_customers = 0;
    let mut requests_received = 0;
    let mut format_choices_completed = 0;
    let mut packs: BTreeMap<PackLine, LineStats> = PackLine::ALL
        .into_iter()
        .map(|line| (line, LineStats::default()))
        .collect();
    let mut recent = Vec::new();

    for customer in customers.iter().filter(|c| c.packs.has_any()) {
        eligible_customers += 1;
        let computed = customer.computed_refund();
        total_amount = total_amount + computed;

        if customer.format_choice_completed {
            format_choices_completed += 1;
        }

        for (line, count) in customer.packs.iter() {
            let entry = packs.entry(line).or_default();
            entry.total += u64::from(count);
            if customer.refund_requested {
                entry.with_request += u64::from(count);
            }
        }

        if customer.refund_requested {
            requests_received += 1;
            let amount = customer.processed_amount();
            processed_amount = processed_amount + amount;
            if let Some(date) = customer.refund_requested_at {
                recent.push(RecentRequest {
                    date,
                    amount,
                    melancolie: customer.packs.melancolie,
                    symphonie: customer.packs.symphonie,
                });
            }
        } else {
            pending_amount = pending_amount + computed;
        }
    }

    recent.sort_by(|a, b| b.date.cmp(&a.date));
    recent.truncate(RECENT_REQUESTS);

    let average_amount = if requests_received == 0 {
        0
    } else {
        Amount::new(processed_amount.value() / Decimal::from(requests_received)).rounded()
    };

    StatsReport {
        total_amount,
        processed_amount,
        pending_amount,
        average_amount,
        eligible_customers,
        requests_received,
        awaiting_response: eligible_customers - requests_received,
        response_rate: percentage(requests_received, eligible_customers),
        format_choices_completed,
        packs,
        recent_requests: recent,
    }
}

/// Load the ledger and aggregate it.
///
/// # Errors
///
/// Returns the repository error if the ledger cannot be read.
#[instrument(skip_all)]
pub async fn load_stats<L: CustomerLedger>(ledger: &L) -> Result<StatsReport, RepositoryError> {
    let customers = ledger.list_customers_with_packs().await?;
    let report = compute_stats(&customers);
    tracing::debug!(
        eligible = report.eligible_customers,
        requests = report.requests_received,
        "Stats computed"
    );
    Ok(report)
}
