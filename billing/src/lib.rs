//! Billing logic behind the PanelHub order builders and subscription panels.

pub mod errors;
pub mod services;

pub use errors::ServiceError;
pub use services::billing::BillingService;
pub use services::catalog::{CatalogService, PlanCatalog, PlanLookup};
pub use services::order_builder::OrderDraft;
pub use services::pricing::{
    compute_order_total, line_contribution, quote_order, round_for_display, sum_contributions, LineQuote, OrderQuote, PlanResolver,
    PricingRules,
};
pub use services::proration::UpgradeQuote;
pub use services::subscription_store::{InMemorySubscriptionRepository, SubscriptionRepository};
