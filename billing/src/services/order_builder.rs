use panelhub_models::billing::{OrderLineItem, PlanId, ProductLine, TermUnit};
use rust_decimal::Decimal;

use super::catalog::PlanCatalog;
use super::pricing::{quote_order, OrderQuote, PricingRules};
use crate::errors::ServiceError;

/// Working state of an order builder screen.
///
/// Holds one line per catalog plan, all starting at quantity zero. Edits
/// are stored exactly as entered; clamping happens when the draft is
/// priced or summarized.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    product_line: ProductLine,
    lines: Vec<OrderLineItem>,
}

impl OrderDraft {
    pub fn for_catalog(catalog: &PlanCatalog) -> Self {
        Self {
            product_line: catalog.product_line(),
            lines: catalog
                .entries()
                .map(|entry| OrderLineItem::new(entry.id.clone(), 0))
                .collect(),
        }
    }

    pub fn product_line(&self) -> ProductLine {
        self.product_line
    }

    pub fn line_items(&self) -> &[OrderLineItem] {
        &self.lines
    }

    pub fn line(&self, plan_id: &PlanId) -> Option<&OrderLineItem> {
        self.lines.iter().find(|l| &l.plan_id == plan_id)
    }

    fn line_mut(&mut self, plan_id: &PlanId) -> Result<&mut OrderLineItem, ServiceError> {
        self.lines
            .iter_mut()
            .find(|l| &l.plan_id == plan_id)
            .ok_or_else(|| ServiceError::NotFound(format!("plan {} is not part of this order", plan_id)))
    }

    pub fn set_quantity(&mut self, plan_id: &PlanId, quantity: i64) -> Result<(), ServiceError> {
        self.line_mut(plan_id)?.quantity = quantity;
        Ok(())
    }

    pub fn set_term(&mut self, plan_id: &PlanId, term_length: i64, term_unit: TermUnit) -> Result<(), ServiceError> {
        let line = self.line_mut(plan_id)?;
        line.term_length = term_length;
        line.term_unit = term_unit;
        Ok(())
    }

    pub fn set_addon(&mut self, plan_id: &PlanId, enabled: bool) -> Result<(), ServiceError> {
        self.line_mut(plan_id)?.addon_enabled = enabled;
        Ok(())
    }

    /// Lines shown in the order summary: clamped, quantity above zero.
    pub fn visible_summary(&self) -> Vec<OrderLineItem> {
        self.lines
            .iter()
            .map(OrderLineItem::clamped)
            .filter(|l| l.quantity > 0)
            .collect()
    }

    /// True while nothing has been selected; submission stays disabled.
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.effective_quantity() == 0)
    }

    pub fn quote<'a>(&'a self, catalog: &'a PlanCatalog, rules: &PricingRules) -> OrderQuote<'a> {
        quote_order(&self.lines, catalog, rules)
    }

    pub fn total(&self, catalog: &PlanCatalog, rules: &PricingRules) -> Decimal {
        self.quote(catalog, rules).total
    }

    /// Finishes the draft, returning the lines to be billed.
    pub fn complete(self) -> Result<Vec<OrderLineItem>, ServiceError> {
        let lines = self.visible_summary();
        if lines.is_empty() {
            return Err(ServiceError::ValidationError("order is empty".to_string()));
        }
        Ok(lines)
    }
}
