//! Plan catalogs and the single lookup path for plan identifiers.

use indexmap::IndexMap;
use panelhub_models::billing::{PlanCatalogEntry, PlanId, ProductLine};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::errors::ServiceError;

/// Outcome of resolving a plan reference against a catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanLookup<'a> {
    Resolved(&'a PlanCatalogEntry),
    Missing,
}

impl<'a> PlanLookup<'a> {
    pub fn entry(&self) -> Option<&'a PlanCatalogEntry> {
        match *self {
            Self::Resolved(entry) => Some(entry),
            Self::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Plan definitions for one product line, kept in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanCatalog {
    product_line: ProductLine,
    entries: IndexMap<PlanId, PlanCatalogEntry>,
}

impl PlanCatalog {
    pub fn new(product_line: ProductLine, entries: Vec<PlanCatalogEntry>) -> Result<Self, ServiceError> {
        let mut map = IndexMap::with_capacity(entries.len());

        for entry in entries {
            if entry.monthly_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "plan {} has a negative monthly price",
                    entry.id
                )));
            }
            if map.contains_key(&entry.id) {
                return Err(ServiceError::Conflict(format!(
                    "plan {} is defined twice in the {} catalog",
                    entry.id, product_line
                )));
            }
            map.insert(entry.id.clone(), entry);
        }

        Ok(Self {
            product_line,
            entries: map,
        })
    }

    /// Mailbox plans sold per user seat.
    pub fn email_hosting() -> Self {
        Self::builtin(
            ProductLine::EmailHosting,
            vec![
                PlanCatalogEntry::new("light", "Light Plan", Decimal::new(180, 2))
                    .with_features(["5 GB mailbox", "Webmail access", "Basic spam filtering"]),
                PlanCatalogEntry::new("business", "Business Plan", Decimal::new(380, 2))
                    .with_features(["25 GB mailbox", "Custom domain", "Calendar and contacts"])
                    .recommended(),
                PlanCatalogEntry::new("premium", "Premium Plan", Decimal::new(550, 2))
                    .with_features(["50 GB mailbox", "Advanced threat protection", "Priority support"]),
                PlanCatalogEntry::new("enterprise", "Enterprise Plan", Decimal::new(890, 2))
                    .with_features(["100 GB mailbox", "Email archiving", "eDiscovery", "Dedicated account manager"]),
            ],
        )
    }

    /// CloudEdge instance sizes sold per node.
    pub fn cloud_edge() -> Self {
        Self::builtin(
            ProductLine::CloudEdge,
            vec![
                PlanCatalogEntry::new("edge-starter", "Edge Starter", Decimal::new(1200, 2))
                    .with_features(["1 vCPU", "2 GB RAM", "40 GB SSD"]),
                PlanCatalogEntry::new("edge-pro", "Edge Pro", Decimal::new(2900, 2))
                    .with_features(["2 vCPU", "8 GB RAM", "160 GB SSD", "Daily snapshots"])
                    .recommended(),
                PlanCatalogEntry::new("edge-scale", "Edge Scale", Decimal::new(7900, 2))
                    .with_features(["8 vCPU", "32 GB RAM", "640 GB NVMe", "Private networking"]),
            ],
        )
    }

    // Compiled-in tables are unique by construction.
    fn builtin(product_line: ProductLine, entries: Vec<PlanCatalogEntry>) -> Self {
        Self {
            product_line,
            entries: entries.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    pub fn product_line(&self) -> ProductLine {
        self.product_line
    }

    pub fn resolve(&self, plan_id: &PlanId) -> PlanLookup<'_> {
        match self.entries.get(plan_id) {
            Some(entry) => PlanLookup::Resolved(entry),
            None => PlanLookup::Missing,
        }
    }

    pub fn get(&self, plan_id: &PlanId) -> Option<&PlanCatalogEntry> {
        self.entries.get(plan_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &PlanCatalogEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every plan reference in the billing pages resolves through here.
#[derive(Debug, Clone, Default)]
pub struct CatalogService {
    catalogs: HashMap<ProductLine, PlanCatalog>,
}

impl CatalogService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service preloaded with the compiled-in email hosting and CloudEdge catalogs.
    pub fn builtin() -> Self {
        // Built-in plan ids are disjoint across product lines.
        let catalogs = [PlanCatalog::email_hosting(), PlanCatalog::cloud_edge()];
        Self {
            catalogs: catalogs.into_iter().map(|c| (c.product_line(), c)).collect(),
        }
    }

    /// Adds or replaces the catalog for its product line.
    ///
    /// A plan id may belong to one product line only, so a catalog reusing an
    /// id owned by another line is rejected with `Conflict`.
    pub fn register(&mut self, catalog: PlanCatalog) -> Result<(), ServiceError> {
        let line = catalog.product_line();
        for other in self.catalogs.values().filter(|c| c.product_line() != line) {
            if let Some(entry) = catalog.entries().find(|e| other.get(&e.id).is_some()) {
                return Err(ServiceError::Conflict(format!(
                    "plan {} is already defined in the {} catalog",
                    entry.id,
                    other.product_line()
                )));
            }
        }

        self.catalogs.insert(line, catalog);
        Ok(())
    }

    pub fn catalog(&self, product_line: ProductLine) -> Result<&PlanCatalog, ServiceError> {
        self.catalogs
            .get(&product_line)
            .ok_or_else(|| ServiceError::NotFound(format!("no catalog for {}", product_line)))
    }

    /// Finds the catalog that defines `plan_id`.
    pub fn catalog_for(&self, plan_id: &PlanId) -> Option<&PlanCatalog> {
        self.catalogs.values().find(|c| c.get(plan_id).is_some())
    }

    pub fn resolve(&self, plan_id: &PlanId) -> PlanLookup<'_> {
        self.catalog_for(plan_id)
            .map(|catalog| catalog.resolve(plan_id))
            .unwrap_or(PlanLookup::Missing)
    }

    pub fn product_line_of(&self, plan_id: &PlanId) -> Option<ProductLine> {
        self.catalog_for(plan_id).map(PlanCatalog::product_line)
    }
}
