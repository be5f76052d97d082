//! Billing domain events.
//!
//! Every event is serialized to JSON and logged under the `domain_event`
//! target, so a log pipeline can route them apart from diagnostic output.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const DOMAIN_EVENT_TARGET: &str = "domain_event";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionChange {
    Created,
    Updated,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuoteKind {
    Renewal,
    Upgrade,
}

/// How an event is reported: failures at `error`, skips at `debug`, the rest at `info`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
    Skipped,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BillingEvent {
    OrderPlaced {
        tenant_id: Uuid,
        lines: usize,
        total: String,
    },
    OrderRejected {
        tenant_id: Uuid,
        reason: String,
    },
    Subscription {
        change: SubscriptionChange,
        subscription_id: Uuid,
        tenant_id: Uuid,
        plan_id: String,
    },
    PlanUnresolved {
        plan_id: String,
    },
    Quote {
        kind: QuoteKind,
        subscription_id: Uuid,
        amount: String,
    },
}

impl BillingEvent {
    pub fn category(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } | Self::OrderRejected { .. } => "order",
            Self::Subscription { .. } => "subscription",
            Self::PlanUnresolved { .. } => "catalog",
            Self::Quote { .. } => "billing",
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            Self::OrderRejected { .. } => Outcome::Failure,
            Self::PlanUnresolved { .. } => Outcome::Skipped,
            _ => Outcome::Success,
        }
    }
}

/// An event stamped with its origin, as written to the log.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub category: &'static str,
    pub outcome: Outcome,
    #[serde(flatten)]
    pub event: BillingEvent,
}

impl EventRecord {
    pub fn new(service: impl Into<String>, event: BillingEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            service: service.into(),
            category: event.category(),
            outcome: event.outcome(),
            event,
        }
    }
}

pub fn emit(service: &str, event: BillingEvent) {
    let record = EventRecord::new(service, event);
    let json = serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_string());

    match record.outcome {
        Outcome::Success => tracing::info!(target: DOMAIN_EVENT_TARGET, category = record.category, "{}", json),
        Outcome::Failure => tracing::error!(target: DOMAIN_EVENT_TARGET, category = record.category, "{}", json),
        Outcome::Skipped => tracing::debug!(target: DOMAIN_EVENT_TARGET, category = record.category, "{}", json),
    }
}

pub fn log_order_placed(service: &str, tenant_id: Uuid, lines: usize, total: &str) {
    emit(
        service,
        BillingEvent::OrderPlaced {
            tenant_id,
            lines,
            total: total.to_string(),
        },
    );
}

pub fn log_order_rejected(service: &str, tenant_id: Uuid, reason: &str) {
    emit(
        service,
        BillingEvent::OrderRejected {
            tenant_id,
            reason: reason.to_string(),
        },
    );
}

pub fn log_subscription_event(
    service: &str,
    change: SubscriptionChange,
    subscription_id: Uuid,
    tenant_id: Uuid,
    plan_id: &str,
) {
    emit(
        service,
        BillingEvent::Subscription {
            change,
            subscription_id,
            tenant_id,
            plan_id: plan_id.to_string(),
        },
    );
}

pub fn log_catalog_miss(service: &str, plan_id: &str) {
    emit(
        service,
        BillingEvent::PlanUnresolved {
            plan_id: plan_id.to_string(),
        },
    );
}

/// Amount is the display string, currency included.
pub fn log_billing_quote(service: &str, kind: QuoteKind, subscription_id: Uuid, amount: &str) {
    emit(
        service,
        BillingEvent::Quote {
            kind,
            subscription_id,
            amount: amount.to_string(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_flattens_event_fields() {
        let tenant = Uuid::new_v4();
        let record = EventRecord::new(
            "billing",
            BillingEvent::Subscription {
                change: SubscriptionChange::Cancelled,
                subscription_id: Uuid::nil(),
                tenant_id: tenant,
                plan_id: "premium".to_string(),
            },
        );
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["service"], "billing");
        assert_eq!(json["category"], "subscription");
        assert_eq!(json["event"], "subscription");
        assert_eq!(json["change"], "cancelled");
        assert_eq!(json["tenant_id"], tenant.to_string());
        assert_eq!(json["outcome"], "success");
    }

    #[test]
    fn test_outcomes() {
        let rejected = BillingEvent::OrderRejected {
            tenant_id: Uuid::nil(),
            reason: "order is empty".to_string(),
        };
        assert_eq!(rejected.outcome(), Outcome::Failure);
        assert_eq!(rejected.category(), "order");

        let miss = BillingEvent::PlanUnresolved {
            plan_id: "platinum".to_string(),
        };
        assert_eq!(miss.outcome(), Outcome::Skipped);
        assert_eq!(miss.category(), "catalog");
    }

    #[test]
    fn test_quote_serializes_kind() {
        let record = EventRecord::new(
            "billing",
            BillingEvent::Quote {
                kind: QuoteKind::Upgrade,
                subscription_id: Uuid::nil(),
                amount: "46.00 USD".to_string(),
            },
        );
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["event"], "quote");
        assert_eq!(json["kind"], "upgrade");
        assert_eq!(json["amount"], "46.00 USD");
    }
}
