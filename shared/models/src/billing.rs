use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Stable identifier of a plan inside the catalog (e.g. `"business"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlanId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PlanId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductLine {
    EmailHosting,
    CloudEdge,
}

impl fmt::Display for ProductLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmailHosting => write!(f, "email_hosting"),
            Self::CloudEdge => write!(f, "cloud_edge"),
        }
    }
}

/// A priced tier of service. Catalog entries are read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanCatalogEntry {
    pub id: PlanId,
    pub name: String,
    /// Base price of one unit for one month.
    pub monthly_price: Decimal,
    pub features: Vec<String>,
    pub recommended: bool,
}

impl PlanCatalogEntry {
    pub fn new(id: impl Into<PlanId>, name: impl Into<String>, monthly_price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            monthly_price,
            features: Vec::new(),
            recommended: false,
        }
    }

    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    pub fn recommended(mut self) -> Self {
        self.recommended = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermUnit {
    #[default]
    Monthly,
    Yearly,
}

impl TermUnit {
    /// Number of calendar months covered by `length` terms of this unit.
    pub fn months(&self, length: i64) -> i64 {
        match self {
            Self::Monthly => length,
            Self::Yearly => length.saturating_mul(12),
        }
    }
}

impl fmt::Display for TermUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
        }
    }
}

/// One configured plan selection inside an order being built.
///
/// `quantity` and `term_length` are signed because they mirror editable
/// form fields that may transiently hold out-of-range values. Use the
/// `effective_*` accessors to read the clamped values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub plan_id: PlanId,
    pub quantity: i64,
    pub term_length: i64,
    pub term_unit: TermUnit,
    #[serde(default)]
    pub addon_enabled: bool,
}

impl OrderLineItem {
    /// A monthly, single-term line with the add-on disabled.
    pub fn new(plan_id: impl Into<PlanId>, quantity: i64) -> Self {
        Self {
            plan_id: plan_id.into(),
            quantity,
            term_length: 1,
            term_unit: TermUnit::Monthly,
            addon_enabled: false,
        }
    }

    pub fn monthly(mut self, term_length: i64) -> Self {
        self.term_unit = TermUnit::Monthly;
        self.term_length = term_length;
        self
    }

    pub fn yearly(mut self, term_length: i64) -> Self {
        self.term_unit = TermUnit::Yearly;
        self.term_length = term_length;
        self
    }

    pub fn with_addon(mut self, enabled: bool) -> Self {
        self.addon_enabled = enabled;
        self
    }

    pub fn effective_quantity(&self) -> i64 {
        self.quantity.max(0)
    }

    pub fn effective_term_length(&self) -> i64 {
        self.term_length.max(1)
    }

    /// Copy of this line with quantity and term length clamped into range.
    pub fn clamped(&self) -> Self {
        Self {
            quantity: self.effective_quantity(),
            term_length: self.effective_term_length(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Cancelled,
    Expired,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::PastDue => write!(f, "past_due"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub plan_id: PlanId,
    pub quantity: i64,
    pub term_length: i64,
    pub term_unit: TermUnit,
    pub addon_enabled: bool,
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRecord {
    /// The subscription's current configuration expressed as an order line.
    pub fn line_item(&self) -> OrderLineItem {
        OrderLineItem {
            plan_id: self.plan_id.clone(),
            quantity: self.quantity,
            term_length: self.term_length,
            term_unit: self.term_unit,
            addon_enabled: self.addon_enabled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSubscriptionRequest {
    pub plan_id: PlanId,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i64,
    #[validate(range(min = 1, max = 120, message = "Term length must be between 1 and 120"))]
    pub term_length: i64,
    pub term_unit: TermUnit,
    #[serde(default)]
    pub addon_enabled: bool,
}

impl From<&OrderLineItem> for CreateSubscriptionRequest {
    fn from(line: &OrderLineItem) -> Self {
        Self {
            plan_id: line.plan_id.clone(),
            quantity: line.quantity,
            term_length: line.term_length,
            term_unit: line.term_unit,
            addon_enabled: line.addon_enabled,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateSubscriptionRequest {
    pub plan_id: Option<PlanId>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i64>,
    #[validate(range(min = 1, max = 120, message = "Term length must be between 1 and 120"))]
    pub term_length: Option<i64>,
    pub term_unit: Option<TermUnit>,
    pub addon_enabled: Option<bool>,
}
