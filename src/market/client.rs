//! Catalog query client.
//!
//! Thin request/response wrapper around the market's GraphQL endpoint.
//! Every call makes exactly one round trip and carries no retry logic.

use super::error::CatalogError;
use super::queries::{self, GraphQlRequest, GraphQlResponse, MarketDashboard, ProductInfo};
use super::session::{self, Session, XSRF_HEADER};
use crate::aggregate::DetailFetcher;
use crate::config::EndpointConfig;
use crate::models::{Candidate, CandidatePage, DetailRecord};
use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Client for the market's GraphQL API.
#[derive(Clone)]
pub struct MarketClient {
    http: reqwest::Client,
    jar: Arc<Jar>,
    market_url: Url,
    graphql_url: Url,
}

impl MarketClient {
    /// Create a client for the marketplace at `config.base_url`.
    pub fn new(config: &EndpointConfig) -> Result<Self, CatalogError> {
        let jar = Arc::new(Jar::default());

        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("freebooks/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let market_url = config.market_url()?;
        let graphql_url = config.graphql_url()?;
        debug!("GraphQL endpoint: {}", graphql_url);

        Ok(Self {
            http,
            jar,
            market_url,
            graphql_url,
        })
    }

    /// Bootstrap a session and obtain its anti-forgery token.
    pub async fn establish_session(&self) -> Result<Session, CatalogError> {
        session::establish(&self.http, &self.jar, &self.market_url).await
    }

    /// Fetch one page of up to `page_size` candidates.
    pub async fn list_candidates(
        &self,
        session: &Session,
        page_size: usize,
    ) -> Result<CandidatePage, CatalogError> {
        info!("Listing up to {} market variants", page_size);

        let response: GraphQlResponse<MarketDashboard> = self
            .post(session, &queries::market_dashboard(page_size))
            .await?;

        let page = response.into_data()?.into_page();
        debug!("Listing returned {} candidates", page.candidates.len());
        Ok(page)
    }

    /// Fetch the detail record for one candidate.
    pub async fn fetch_detail(
        &self,
        session: &Session,
        candidate: &Candidate,
    ) -> Result<DetailRecord, CatalogError> {
        let response: GraphQlResponse<ProductInfo> = self
            .post(session, &queries::product_info(&candidate.product_id))
            .await?;

        response.into_data()?.into_record(&candidate.product_id)
    }

    /// Pair this client with a session so it can serve as a `DetailFetcher`.
    pub fn bind(self, session: Session) -> SessionClient {
        SessionClient {
            client: self,
            session,
        }
    }

    async fn post<V, T>(
        &self,
        session: &Session,
        request: &GraphQlRequest<V>,
    ) -> Result<GraphQlResponse<T>, CatalogError>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.graphql_url.clone())
            .header(XSRF_HEADER, &session.xsrf_token)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// A `MarketClient` bound to an established session.
#[derive(Clone)]
pub struct SessionClient {
    client: MarketClient,
    session: Session,
}

#[async_trait]
impl DetailFetcher for SessionClient {
    async fn fetch_detail(&self, candidate: &Candidate) -> Result<DetailRecord, CatalogError> {
        self.client.fetch_detail(&self.session, candidate).await
    }
}
