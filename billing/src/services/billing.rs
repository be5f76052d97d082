use chrono::{DateTime, Months, Utc};
use panelhub_config::PricingConfig;
use panelhub_models::billing::*;
use panelhub_observability::{
    log_billing_quote, log_catalog_miss, log_order_placed, log_order_rejected, log_subscription_event, log_timed,
    QuoteKind, SubscriptionChange,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::catalog::{CatalogService, PlanCatalog};
use super::order_builder::OrderDraft;
use super::pricing::{quote_order, OrderQuote, PricingRules};
use super::proration::{self, UpgradeQuote};
use super::subscription_store::{InMemorySubscriptionRepository, SubscriptionRepository};
use crate::errors::ServiceError;

pub const SERVICE_NAME: &str = "billing";

/// Entry point used by the order builders and subscription panels.
pub struct BillingService {
    catalogs: CatalogService,
    rules: PricingRules,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl BillingService {
    pub fn new(catalogs: CatalogService, rules: PricingRules, subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        Self {
            catalogs,
            rules,
            subscriptions,
        }
    }

    /// Built-in catalogs, the given pricing configuration and an in-memory store.
    pub fn in_memory(config: &PricingConfig) -> Self {
        Self::new(
            CatalogService::builtin(),
            PricingRules::from(config),
            Arc::new(InMemorySubscriptionRepository::new()),
        )
    }

    /// Like [`BillingService::in_memory`], with pricing read from `.env`, `PRICING_CONFIG_PATH` and `PRICING_*`.
    pub fn from_env() -> Result<Self, ServiceError> {
        let config = PricingConfig::from_env_path()?;
        Ok(Self::in_memory(&config))
    }

    pub fn catalogs(&self) -> &CatalogService {
        &self.catalogs
    }

    pub fn rules(&self) -> &PricingRules {
        &self.rules
    }

    pub fn get_subscription_plans(&self, product_line: ProductLine) -> Result<Vec<PlanCatalogEntry>, ServiceError> {
        Ok(self.catalogs.catalog(product_line)?.entries().cloned().collect())
    }

    pub fn new_order(&self, product_line: ProductLine) -> Result<OrderDraft, ServiceError> {
        Ok(OrderDraft::for_catalog(self.catalogs.catalog(product_line)?))
    }

    pub fn quote_order<'a>(&'a self, draft: &'a OrderDraft) -> Result<OrderQuote<'a>, ServiceError> {
        let catalog = self.catalogs.catalog(draft.product_line())?;
        let quote = log_timed!("quote_order", quote_order(draft.line_items(), catalog, &self.rules));
        for plan_id in quote.missing_plans() {
            log_catalog_miss(SERVICE_NAME, plan_id.as_str());
        }
        Ok(quote)
    }

    fn resolve_catalog(&self, plan_id: &PlanId) -> Result<&PlanCatalog, ServiceError> {
        self.catalogs
            .catalog_for(plan_id)
            .ok_or_else(|| ServiceError::NotFound(format!("plan {} does not exist", plan_id)))
    }

    pub fn get_subscription(&self, id: Uuid) -> Result<SubscriptionRecord, ServiceError> {
        self.subscriptions.get(id)
    }

    pub fn list_subscriptions(&self, tenant_id: Uuid) -> Result<Vec<SubscriptionRecord>, ServiceError> {
        self.subscriptions.list_for_tenant(tenant_id)
    }

    pub fn create_subscription(
        &self,
        tenant_id: Uuid,
        request: &CreateSubscriptionRequest,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionRecord, ServiceError> {
        let record = self.new_record(tenant_id, request, now)?;
        let record = self.subscriptions.insert(record)?;
        log_subscription_event(SERVICE_NAME, SubscriptionChange::Created, record.id, tenant_id, record.plan_id.as_str());
        Ok(record)
    }

    // Validated record ready to store; nothing is persisted here.
    fn new_record(
        &self,
        tenant_id: Uuid,
        request: &CreateSubscriptionRequest,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionRecord, ServiceError> {
        request.validate()?;
        self.resolve_catalog(&request.plan_id)?;

        Ok(SubscriptionRecord {
            id: Uuid::new_v4(),
            tenant_id,
            plan_id: request.plan_id.clone(),
            quantity: request.quantity,
            term_length: request.term_length,
            term_unit: request.term_unit,
            addon_enabled: request.addon_enabled,
            status: SubscriptionStatus::Active,
            current_period_start: now,
            current_period_end: period_end(now, request.term_unit, request.term_length)?,
            cancel_at_period_end: false,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Completes `draft` and opens one subscription per selected line.
    ///
    /// Either every line becomes a subscription or none does.
    pub fn place_order(
        &self,
        tenant_id: Uuid,
        draft: OrderDraft,
        now: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionRecord>, ServiceError> {
        let catalog = self.catalogs.catalog(draft.product_line())?;
        let total = draft.total(catalog, &self.rules);

        let pending = draft.complete().and_then(|lines| {
            lines
                .iter()
                .map(|line| self.new_record(tenant_id, &CreateSubscriptionRequest::from(line), now))
                .collect::<Result<Vec<_>, _>>()
        });
        let pending = match pending {
            Ok(pending) => pending,
            Err(e) => {
                log_order_rejected(SERVICE_NAME, tenant_id, &e.to_string());
                return Err(e);
            }
        };

        let mut records = Vec::with_capacity(pending.len());
        for record in pending {
            match self.subscriptions.insert(record) {
                Ok(stored) => records.push(stored),
                Err(e) => {
                    self.roll_back(&records);
                    log_order_rejected(SERVICE_NAME, tenant_id, &e.to_string());
                    return Err(e);
                }
            }
        }

        for record in &records {
            log_subscription_event(SERVICE_NAME, SubscriptionChange::Created, record.id, tenant_id, record.plan_id.as_str());
        }
        log_order_placed(SERVICE_NAME, tenant_id, records.len(), &self.rules.format_amount(total));
        Ok(records)
    }

    fn roll_back(&self, records: &[SubscriptionRecord]) {
        for record in records {
            if let Err(e) = self.subscriptions.delete(record.id) {
                tracing::error!(subscription_id = %record.id, error = %e, "Failed to roll back subscription");
            }
        }
    }

    /// Applies `request`; a term change restarts the period length from `current_period_start`.
    pub fn update_subscription(
        &self,
        id: Uuid,
        request: &UpdateSubscriptionRequest,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionRecord, ServiceError> {
        request.validate()?;
        let mut record = self.subscriptions.get(id)?;

        if record.status == SubscriptionStatus::Cancelled {
            return Err(ServiceError::BadRequest(format!("subscription {} is cancelled", id)));
        }

        if let Some(plan_id) = &request.plan_id {
            self.resolve_catalog(plan_id)?;
            record.plan_id = plan_id.clone();
        }
        if let Some(quantity) = request.quantity {
            record.quantity = quantity;
        }
        let term_length = request.term_length.unwrap_or(record.term_length);
        let term_unit = request.term_unit.unwrap_or(record.term_unit);
        if term_length != record.term_length || term_unit != record.term_unit {
            record.current_period_end = period_end(record.current_period_start, term_unit, term_length)?;
            record.term_length = term_length;
            record.term_unit = term_unit;
        }
        if let Some(addon_enabled) = request.addon_enabled {
            record.addon_enabled = addon_enabled;
        }
        record.updated_at = now;

        let record = self.subscriptions.update(record)?;
        log_subscription_event(SERVICE_NAME, SubscriptionChange::Updated, record.id, record.tenant_id, record.plan_id.as_str());
        Ok(record)
    }

    /// Cancels now, or flags the subscription to lapse when its period ends.
    pub fn cancel_subscription(&self, id: Uuid, at_period_end: bool, now: DateTime<Utc>) -> Result<SubscriptionRecord, ServiceError> {
        let mut record = self.subscriptions.get(id)?;

        if at_period_end {
            record.cancel_at_period_end = true;
        } else {
            record.status = SubscriptionStatus::Cancelled;
            record.cancelled_at = Some(now);
        }
        record.updated_at = now;

        let record = self.subscriptions.update(record)?;
        log_subscription_event(SERVICE_NAME, SubscriptionChange::Cancelled, record.id, record.tenant_id, record.plan_id.as_str());
        Ok(record)
    }

    pub fn renewal_quote(&self, id: Uuid) -> Result<rust_decimal::Decimal, ServiceError> {
        let record = self.subscriptions.get(id)?;
        let amount = proration::renewal_quote(&record, &self.catalogs, &self.rules);
        log_billing_quote(SERVICE_NAME, QuoteKind::Renewal, id, &self.rules.format_amount(amount));
        Ok(amount)
    }

    pub fn upgrade_quote(&self, id: Uuid, target: &OrderLineItem, at: DateTime<Utc>) -> Result<UpgradeQuote, ServiceError> {
        let record = self.subscriptions.get(id)?;
        self.resolve_catalog(&target.plan_id)?;

        let quote = proration::upgrade_quote(&record, target, at, &self.catalogs, &self.rules);
        log_billing_quote(SERVICE_NAME, QuoteKind::Upgrade, id, &self.rules.format_amount(quote.amount_due));
        Ok(quote)
    }
}

fn period_end(start: DateTime<Utc>, unit: TermUnit, length: i64) -> Result<DateTime<Utc>, ServiceError> {
    let months = u32::try_from(unit.months(length.max(1)))
        .map_err(|_| ServiceError::ValidationError(format!("term of {} {} is too long", length, unit)))?;

    start
        .checked_add_months(Months::new(months))
        .ok_or_else(|| ServiceError::ValidationError("subscription period overflows the calendar".to_string()))
}
