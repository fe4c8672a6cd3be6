//! GraphQL request and response payloads.

use super::error::CatalogError;
use crate::models::{Candidate, CandidatePage, DetailRecord, Variant};
use serde::{Deserialize, Serialize};
use tracing::warn;

const MARKET_DASHBOARD_QUERY: &str = r#"query MarketDashboardQuery($first: Int!, $after: String) {
  allProductVariants: productVariants(first: $first, after: $after, input: {route: "market"}) {
    pageInfo {
      hasNextPage
      endCursor
      __typename
    }
    nodes {
      id
      products(first: 1) {
        nodes {
          id
          databaseID
          name
          __typename
        }
        __typename
      }
      __typename
    }
    __typename
  }
}
"#;

const PRODUCT_INFO_QUERY: &str = r#"query ProductInfoQuery($productInfoID: ID!) {
  product(id: $productInfoID) {
    id
    databaseID
    name
    page
    firstAppearanceEventName
    organization {
      id
      name
      __typename
    }
    productVariants(first: 20, input: {route: "market"}) {
      nodes {
        id
        name
        price
        marketShippingRequired
        __typename
      }
      __typename
    }
    __typename
  }
}
"#;

/// A GraphQL POST body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest<V> {
    pub operation_name: &'static str,
    pub variables: V,
    pub query: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MarketDashboardVariables {
    pub first: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductInfoVariables {
    #[serde(rename = "productInfoID")]
    pub product_info_id: String,
}

/// Listing request for the first `first` market variants.
pub fn market_dashboard(first: usize) -> GraphQlRequest<MarketDashboardVariables> {
    GraphQlRequest {
        operation_name: "MarketDashboardQuery",
        variables: MarketDashboardVariables { first, after: None },
        query: MARKET_DASHBOARD_QUERY,
    }
}

/// Detail request for one product.
pub fn product_info(product_info_id: &str) -> GraphQlRequest<ProductInfoVariables> {
    GraphQlRequest {
        operation_name: "ProductInfoQuery",
        variables: ProductInfoVariables {
            product_info_id: product_info_id.to_string(),
        },
        query: PRODUCT_INFO_QUERY,
    }
}

/// A GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

impl<T> GraphQlResponse<T> {
    /// Unwrap `data`, turning an error-only response into `CatalogError::GraphQl`.
    pub fn into_data(self) -> Result<T, CatalogError> {
        if !self.errors.is_empty() {
            let messages: Vec<_> = self.errors.iter().map(|e| e.message.as_str()).collect();
            if self.data.is_none() {
                return Err(CatalogError::GraphQl(messages.join("; ")));
            }
            warn!("GraphQL returned partial data with errors: {}", messages.join("; "));
        }

        self.data
            .ok_or_else(|| CatalogError::GraphQl("response carried no data".to_string()))
    }
}

// === MarketDashboardQuery ===

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDashboard {
    pub all_product_variants: ProductVariantConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariantConnection {
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<ProductVariantNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductVariantNode {
    #[serde(default)]
    pub id: Option<String>,
    pub products: ProductConnection,
}

#[derive(Debug, Deserialize)]
pub struct ProductConnection {
    #[serde(default)]
    pub nodes: Vec<ProductRef>,
}

#[derive(Debug, Deserialize)]
pub struct ProductRef {
    pub id: String,
}

impl MarketDashboard {
    /// Collect the first product of every listed variant.
    pub fn into_page(self) -> CandidatePage {
        let connection = self.all_product_variants;

        let candidates = connection
            .nodes
            .into_iter()
            .filter_map(|node| match node.products.nodes.into_iter().next() {
                Some(product) => Some(Candidate::new(product.id)),
                None => {
                    warn!(
                        "Skipping variant {} with no product",
                        node.id.as_deref().unwrap_or("<unknown>")
                    );
                    None
                }
            })
            .collect();

        CandidatePage {
            candidates,
            has_next_page: connection.page_info.has_next_page,
            end_cursor: connection.page_info.end_cursor,
        }
    }
}

// === ProductInfoQuery ===

#[derive(Debug, Deserialize)]
pub struct ProductInfo {
    pub product: Option<Product>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "databaseID")]
    pub database_id: String,
    pub name: String,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub first_appearance_event_name: Option<String>,
    pub organization: Organization,
    pub product_variants: VariantConnection,
}

#[derive(Debug, Deserialize)]
pub struct Organization {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct VariantConnection {
    #[serde(default)]
    pub nodes: Vec<VariantNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantNode {
    #[serde(default)]
    pub name: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub market_shipping_required: bool,
}

impl From<Product> for DetailRecord {
    fn from(product: Product) -> Self {
        Self {
            product_key: product.database_id,
            name: product.name,
            organization: product.organization.name,
            event_name: product.first_appearance_event_name.unwrap_or_default(),
            pages: product.page.unwrap_or_default(),
            variants: product
                .product_variants
                .nodes
                .into_iter()
                .map(|v| Variant {
                    name: v.name.unwrap_or_default(),
                    price: v.price,
                    shipping_required: v.market_shipping_required,
                })
                .collect(),
        }
    }
}

impl ProductInfo {
    /// Convert into a `DetailRecord`, failing when the product is null.
    pub fn into_record(self, product_id: &str) -> Result<DetailRecord, CatalogError> {
        self.product
            .map(DetailRecord::from)
            .ok_or_else(|| CatalogError::ProductNotFound(product_id.to_string()))
    }
}
