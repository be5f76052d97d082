//! Renewal and mid-period upgrade pricing for existing subscriptions.

use chrono::{DateTime, Utc};
use panelhub_models::billing::{OrderLineItem, SubscriptionRecord};
use rust_decimal::Decimal;
use serde::Serialize;

use super::pricing::{line_contribution, PlanResolver, PricingRules};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeQuote {
    /// Share of the current period not yet used, in [0, 1].
    pub remaining_ratio: Decimal,
    /// Value of the unused part of the current term.
    pub credit: Decimal,
    /// Full price of the target configuration for one term.
    pub new_term_cost: Decimal,
    /// What the customer pays now; never negative.
    pub amount_due: Decimal,
}

/// Fraction of `[start, end)` still ahead of `at`, measured in whole seconds.
pub fn remaining_ratio(start: DateTime<Utc>, end: DateTime<Utc>, at: DateTime<Utc>) -> Decimal {
    let period = (end - start).num_seconds();
    if period <= 0 {
        return Decimal::ZERO;
    }

    let remaining = (end - at).num_seconds().clamp(0, period);
    Decimal::from(remaining) / Decimal::from(period)
}

/// Price of renewing the subscription as currently configured.
pub fn renewal_quote<C>(record: &SubscriptionRecord, catalog: &C, rules: &PricingRules) -> Decimal
where
    C: PlanResolver + ?Sized,
{
    line_contribution(&record.line_item(), catalog, rules)
}

/// Price of switching to `target` at `at`, crediting the unused part of the current term.
pub fn upgrade_quote<C>(
    record: &SubscriptionRecord,
    target: &OrderLineItem,
    at: DateTime<Utc>,
    catalog: &C,
    rules: &PricingRules,
) -> UpgradeQuote
where
    C: PlanResolver + ?Sized,
{
    let ratio = remaining_ratio(record.current_period_start, record.current_period_end, at);
    let current_cost = line_contribution(&record.line_item(), catalog, rules);
    let credit = current_cost * ratio;
    let new_term_cost = line_contribution(target, catalog, rules);
    let amount_due = (new_term_cost - credit).max(Decimal::ZERO);

    tracing::debug!(
        subscription_id = %record.id,
        ratio = %ratio,
        credit = %credit,
        amount_due = %amount_due,
        "Upgrade quoted"
    );

    UpgradeQuote {
        remaining_ratio: ratio,
        credit,
        new_term_cost,
        amount_due,
    }
}
