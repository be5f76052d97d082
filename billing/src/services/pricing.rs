//! Order pricing calculator.
//!
//! Totals are recomputed from scratch on every call: the order builder
//! screens invoke this on each quantity, term or add-on change, and the
//! calculator never fails. Unknown plans and out-of-range numbers degrade
//! to a zero (or clamped) contribution instead of an error.

use panelhub_config::PricingConfig;
use panelhub_models::billing::{OrderLineItem, PlanCatalogEntry, PlanId, TermUnit};
use panelhub_observability::log_rule;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashSet;

use super::catalog::{CatalogService, PlanCatalog, PlanLookup};

const MONTHS_PER_YEAR: i64 = 12;

/// Anything that can turn a plan id into a catalog entry.
pub trait PlanResolver {
    fn resolve_plan(&self, plan_id: &PlanId) -> PlanLookup<'_>;
}

impl PlanResolver for PlanCatalog {
    fn resolve_plan(&self, plan_id: &PlanId) -> PlanLookup<'_> {
        self.resolve(plan_id)
    }
}

impl PlanResolver for CatalogService {
    fn resolve_plan(&self, plan_id: &PlanId) -> PlanLookup<'_> {
        self.resolve(plan_id)
    }
}

/// Discount and surcharge rules applied to every line.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingRules {
    pub annual_discount_rate: Decimal,
    pub addon_surcharge: Decimal,
    pub addon_excluded_plans: HashSet<PlanId>,
    pub currency: String,
}

impl PricingRules {
    pub fn addon_applies(&self, plan_id: &PlanId) -> bool {
        !self.addon_excluded_plans.contains(plan_id)
    }

    /// Multiplier applied to the monthly-equivalent price of yearly terms.
    pub fn annual_multiplier(&self) -> Decimal {
        Decimal::ONE - self.annual_discount_rate
    }

    /// Display-rounded amount with the currency code, e.g. `207.24 USD`.
    pub fn format_amount(&self, amount: Decimal) -> String {
        let mut rounded = round_for_display(amount);
        rounded.rescale(2);
        format!("{} {}", rounded, self.currency)
    }
}

impl From<&PricingConfig> for PricingRules {
    fn from(config: &PricingConfig) -> Self {
        Self {
            annual_discount_rate: config.annual_discount_rate,
            addon_surcharge: config.addon_surcharge,
            addon_excluded_plans: config
                .addon_excluded_plans
                .iter()
                .map(|id| PlanId::new(id.as_str()))
                .collect(),
            currency: config.currency.clone(),
        }
    }
}

impl Default for PricingRules {
    fn default() -> Self {
        Self::from(&PricingConfig::default())
    }
}

/// Priced view of one input line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineQuote<'a> {
    pub line: &'a OrderLineItem,
    pub lookup: PlanLookup<'a>,
    /// Monthly unit price including any add-on surcharge; zero when the plan is missing.
    pub unit_price: Decimal,
    pub contribution: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderQuote<'a> {
    pub lines: Vec<LineQuote<'a>>,
    pub total: Decimal,
}

impl<'a> OrderQuote<'a> {
    /// Lines whose plan id did not resolve.
    pub fn missing_plans(&self) -> Vec<&PlanId> {
        self.lines
            .iter()
            .filter(|l| l.lookup.is_missing())
            .map(|l| &l.line.plan_id)
            .collect()
    }
}

pub fn effective_unit_price(entry: &PlanCatalogEntry, addon_enabled: bool, rules: &PricingRules) -> Decimal {
    if !addon_enabled {
        return entry.monthly_price;
    }

    if rules.addon_applies(&entry.id) {
        log_rule!("addon_surcharge", applied, entry.id);
        entry.monthly_price.saturating_add(rules.addon_surcharge)
    } else {
        log_rule!("addon_surcharge", skipped, entry.id, "plan excluded");
        entry.monthly_price
    }
}

fn price_line<'a>(line: &'a OrderLineItem, lookup: PlanLookup<'a>, rules: &PricingRules) -> LineQuote<'a> {
    let Some(entry) = lookup.entry() else {
        tracing::trace!(plan_id = %line.plan_id, "Unknown plan contributes nothing");
        return LineQuote {
            line,
            lookup,
            unit_price: Decimal::ZERO,
            contribution: Decimal::ZERO,
        };
    };

    // Form fields can hold any i64; products past Decimal::MAX saturate.
    let unit_price = effective_unit_price(entry, line.addon_enabled, rules);
    let subtotal = unit_price.saturating_mul(Decimal::from(line.effective_quantity()));
    let term = Decimal::from(line.effective_term_length());

    let contribution = match line.term_unit {
        TermUnit::Monthly => subtotal.saturating_mul(term),
        TermUnit::Yearly => subtotal
            .saturating_mul(Decimal::from(MONTHS_PER_YEAR))
            .saturating_mul(term)
            .saturating_mul(rules.annual_multiplier()),
    };

    LineQuote {
        line,
        lookup,
        unit_price,
        contribution,
    }
}

/// Contribution of a single line to the order total.
pub fn line_contribution<C>(line: &OrderLineItem, catalog: &C, rules: &PricingRules) -> Decimal
where
    C: PlanResolver + ?Sized,
{
    price_line(line, catalog.resolve_plan(&line.plan_id), rules).contribution
}

pub fn quote_order<'a, C>(lines: &'a [OrderLineItem], catalog: &'a C, rules: &PricingRules) -> OrderQuote<'a>
where
    C: PlanResolver + ?Sized,
{
    let lines: Vec<LineQuote<'a>> = lines
        .iter()
        .map(|line| price_line(line, catalog.resolve_plan(&line.plan_id), rules))
        .collect();
    let total = sum_contributions(lines.iter().map(|l| l.contribution));

    tracing::debug!(lines = lines.len(), total = %total, "Order quoted");

    OrderQuote { lines, total }
}

/// Sums contributions, saturating at `Decimal::MAX` instead of overflowing.
pub fn sum_contributions<I>(contributions: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    contributions
        .into_iter()
        .fold(Decimal::ZERO, |total, amount| total.saturating_add(amount))
}

/// Exact (unrounded) total of all line contributions.
pub fn compute_order_total<C>(lines: &[OrderLineItem], catalog: &C, rules: &PricingRules) -> Decimal
where
    C: PlanResolver + ?Sized,
{
    quote_order(lines, catalog, rules).total
}

/// Two-decimal amount for display; halves round away from zero.
pub fn round_for_display(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rules() -> PricingRules {
        PricingRules::default()
    }

    fn catalog() -> PlanCatalog {
        PlanCatalog::email_hosting()
    }

    #[test]
    fn test_zero_quantity_contributes_nothing() {
        let catalog = catalog();
        for line in [
            OrderLineItem::new("business", 0),
            OrderLineItem::new("premium", 0).yearly(3).with_addon(true),
            OrderLineItem::new("enterprise", 0).monthly(12),
        ] {
            assert_eq!(line_contribution(&line, &catalog, &rules()), Decimal::ZERO);
        }
    }

    #[test]
    fn test_monthly_linearity() {
        let line = OrderLineItem::new("business", 2).monthly(3);
        assert_eq!(line_contribution(&line, &catalog(), &rules()), dec!(22.80));
    }

    #[test]
    fn test_yearly_discount() {
        let line = OrderLineItem::new("business", 1).yearly(1);
        let contribution = line_contribution(&line, &catalog(), &rules());
        assert_eq!(contribution, dec!(37.848));
        assert_eq!(round_for_display(contribution), dec!(37.85));
    }

    #[test]
    fn test_addon_on_eligible_plan() {
        let catalog = catalog();
        let entry = catalog.get(&"premium".into()).unwrap();
        assert_eq!(effective_unit_price(entry, true, &rules()), dec!(7.50));
        assert_eq!(effective_unit_price(entry, false, &rules()), dec!(5.50));
    }

    #[test]
    fn test_addon_ignored_on_excluded_plans() {
        let catalog = catalog();
        for id in ["light", "business"] {
            let with = OrderLineItem::new(id, 3).with_addon(true);
            let without = OrderLineItem::new(id, 3);
            assert_eq!(
                line_contribution(&with, &catalog, &rules()),
                line_contribution(&without, &catalog, &rules())
            );
        }
    }

    #[test]
    fn test_unknown_plan_is_tolerated() {
        let lines = vec![
            OrderLineItem::new("platinum", 4).yearly(2),
            OrderLineItem::new("light", 1),
        ];
        let catalog = catalog();
        let quote = quote_order(&lines, &catalog, &rules());
        assert_eq!(quote.total, dec!(1.80));
        assert_eq!(quote.lines[0].contribution, Decimal::ZERO);
        assert_eq!(quote.missing_plans(), vec![&PlanId::new("platinum")]);
    }

    #[test]
    fn test_end_to_end_order() {
        let lines = vec![
            OrderLineItem::new("light", 10).monthly(1),
            OrderLineItem::new("business", 5).yearly(1).with_addon(true),
        ];
        let catalog = catalog();
        let quote = quote_order(&lines, &catalog, &rules());

        assert_eq!(quote.lines[0].contribution, dec!(18.00));
        assert_eq!(quote.lines[1].unit_price, dec!(3.80));
        assert_eq!(round_for_display(quote.lines[1].contribution), dec!(189.24));
        assert_eq!(round_for_display(quote.total), dec!(207.24));
    }

    #[test]
    fn test_invalid_numbers_are_clamped() {
        let catalog = catalog();
        let negative = OrderLineItem::new("enterprise", -3);
        assert_eq!(line_contribution(&negative, &catalog, &rules()), Decimal::ZERO);

        let zero_term = OrderLineItem::new("business", 2).monthly(0);
        assert_eq!(line_contribution(&zero_term, &catalog, &rules()), dec!(7.60));

        let negative_years = OrderLineItem::new("business", 1).yearly(-2);
        assert_eq!(line_contribution(&negative_years, &catalog, &rules()), dec!(37.848));
    }

    #[test]
    fn test_huge_inputs_saturate_instead_of_overflowing() {
        let catalog = catalog();
        let yearly = OrderLineItem::new("enterprise", i64::MAX).yearly(i64::MAX);
        let monthly = OrderLineItem::new("premium", i64::MAX).monthly(i64::MAX).with_addon(true);

        let total = compute_order_total(&[yearly.clone()], &catalog, &rules());
        assert!(total > Decimal::ZERO);
        assert_eq!(line_contribution(&monthly, &catalog, &rules()), Decimal::MAX);

        let total = compute_order_total(&[yearly, monthly], &catalog, &rules());
        assert_eq!(total, Decimal::MAX);
        assert_eq!(round_for_display(total), Decimal::MAX);
    }

    #[test]
    fn test_sum_contributions_saturates() {
        assert_eq!(sum_contributions([dec!(1.25), dec!(2.50)]), dec!(3.75));
        assert_eq!(sum_contributions([Decimal::MAX, dec!(0.01)]), Decimal::MAX);
        assert_eq!(sum_contributions(Vec::new()), Decimal::ZERO);
    }

    #[test]
    fn test_empty_order_is_zero() {
        let total = compute_order_total(&[], &catalog(), &rules());
        assert_eq!(round_for_display(total), dec!(0.00));
    }

    #[test]
    fn test_rules_from_config() {
        let config = PricingConfig {
            annual_discount_rate: dec!(0.25),
            addon_surcharge: dec!(1.00),
            addon_excluded_plans: vec!["premium".to_string()],
            currency: "EUR".to_string(),
        };
        let rules = PricingRules::from(&config);
        let catalog = catalog();

        let yearly = OrderLineItem::new("light", 1).yearly(1);
        assert_eq!(line_contribution(&yearly, &catalog, &rules), dec!(16.20));

        let addon = OrderLineItem::new("business", 1).with_addon(true);
        assert_eq!(line_contribution(&addon, &catalog, &rules), dec!(4.80));

        let excluded = OrderLineItem::new("premium", 1).with_addon(true);
        assert_eq!(line_contribution(&excluded, &catalog, &rules), dec!(5.50));
    }

    #[test]
    fn test_format_amount_uses_configured_currency() {
        assert_eq!(rules().format_amount(dec!(207.2376)), "207.24 USD");

        let config = PricingConfig {
            currency: "EUR".to_string(),
            ..PricingConfig::default()
        };
        assert_eq!(PricingRules::from(&config).format_amount(dec!(1.5)), "1.50 EUR");
    }

    #[test]
    fn test_round_for_display_midpoint() {
        assert_eq!(round_for_display(dec!(1.005)), dec!(1.01));
        assert_eq!(round_for_display(dec!(1.004)), dec!(1.00));
    }

    #[test]
    fn test_catalog_service_resolves_any_product_line() {
        let service = CatalogService::builtin();
        let lines = vec![
            OrderLineItem::new("edge-pro", 2),
            OrderLineItem::new("premium", 1).with_addon(true),
        ];
        assert_eq!(compute_order_total(&lines, &service, &rules()), dec!(65.50));
    }
}
