//! Data models for the catalog.
//!
//! This module contains the core data structures that flow from the
//! market listing, through the detail fan-out, into the final report.

use crate::config::Config;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A product awaiting a detail lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    /// GraphQL node ID of the product (e.g. `ProductInfo:123`).
    pub product_id: String,
}

impl Candidate {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.product_id)
    }
}

/// One bounded page of the market listing.
#[derive(Debug, Clone, Default)]
pub struct CandidatePage {
    /// Candidates in listing order.
    pub candidates: Vec<Candidate>,
    /// Whether the market holds more variants than the page returned.
    pub has_next_page: bool,
    /// Cursor after the last returned node.
    pub end_cursor: Option<String>,
}

/// A single purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    /// Price in yen. Zero means free.
    pub price: i64,
    /// Whether a physical copy must be shipped.
    pub shipping_required: bool,
}

impl Variant {
    pub fn is_free(&self) -> bool {
        self.price == 0
    }
}

/// Full description of one product as returned by a detail fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    /// Stable product key (the market's database ID).
    pub product_key: String,
    pub name: String,
    /// Name of the circle that publishes the product.
    pub organization: String,
    /// Event at which the product first appeared.
    pub event_name: String,
    pub pages: u32,
    /// Variants in the order the market lists them.
    pub variants: Vec<Variant>,
}

impl DetailRecord {
    /// Returns the first variant priced at zero, if any.
    pub fn first_free_variant(&self) -> Option<&Variant> {
        self.variants.iter().find(|v| v.is_free())
    }
}

/// Report-ready projection of a product that has a free variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEntry {
    pub product_key: String,
    pub name: String,
    pub url: String,
    pub organization: String,
    pub price: i64,
    pub event_name: String,
    pub pages: u32,
    pub shipping_required: bool,
}

impl DisplayEntry {
    /// Builds an entry from the first free variant of `record`.
    ///
    /// Returns `None` when the record has no zero-price variant.
    pub fn from_record(record: &DetailRecord, product_base: &str) -> Option<Self> {
        let variant = record.first_free_variant()?;

        Some(Self {
            product_key: record.product_key.clone(),
            name: record.name.clone(),
            url: product_url(product_base, &record.product_key),
            organization: record.organization.clone(),
            price: variant.price,
            event_name: record.event_name.clone(),
            pages: record.pages,
            shipping_required: variant.shipping_required,
        })
    }

    /// Orders by organization, then event name, then name, then key.
    pub fn report_order(&self, other: &Self) -> std::cmp::Ordering {
        self.organization
            .cmp(&other.organization)
            .then_with(|| self.event_name.cmp(&other.event_name))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.product_key.cmp(&other.product_key))
    }
}

/// Canonical product page URL.
pub fn product_url(product_base: &str, product_key: &str) -> String {
    format!("{}/product/{}", product_base.trim_end_matches('/'), product_key)
}

/// Final, deterministically sorted sequence of free products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedReport {
    pub entries: Vec<DisplayEntry>,
}

impl OrderedReport {
    /// Sorts `entries` into report order.
    pub fn from_entries(mut entries: Vec<DisplayEntry>) -> Self {
        entries.sort_by(|a, b| a.report_order(b));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DisplayEntry> {
        self.entries.iter()
    }
}

/// Metadata about a catalog run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Marketplace origin that was queried.
    pub base_url: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of candidates returned by the listing.
    pub total_candidates: usize,
    /// Number of free products in the report.
    pub free_products: usize,
    /// Effective configuration of the run.
    pub config: Config,
    /// Wall-clock duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete catalog report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub books: OrderedReport,
}
