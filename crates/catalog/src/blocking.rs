//! Blocking (synchronous) wrapper around the async catalog client.
//!
//! The pipeline is synchronous; this wrapper owns a single-threaded Tokio
//! runtime so callers never manage async themselves.

use crate::client::{Catalog, CatalogClient, CatalogClientOptions};
use crate::error::{CatalogError, Result};
use crate::models::{Item, ItemCollection, SearchParams};

/// Blocking wrapper around [`CatalogClient`].
pub struct BlockingCatalogClient {
    rt: tokio::runtime::Runtime,
    inner: CatalogClient,
}

impl BlockingCatalogClient {
    /// Create a new blocking catalog client.
    pub fn new(catalog: Catalog, options: CatalogClientOptions) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let inner = CatalogClient::new(catalog, options)?;
        Ok(Self { rt, inner })
    }

    /// The catalog this client is configured for.
    pub fn catalog(&self) -> &Catalog {
        self.inner.catalog()
    }

    /// Execute a single search request (blocking).
    pub fn search(&self, params: &SearchParams) -> Result<ItemCollection> {
        self.rt.block_on(self.inner.search(params))
    }

    /// Search with automatic pagination (blocking).
    pub fn search_all(&self, params: &SearchParams) -> Result<Vec<Item>> {
        self.rt.block_on(self.inner.search_all(params))
    }

    /// Sign an asset href for Planetary Computer (blocking).
    ///
    /// No-op for catalogs that do not require signing.
    pub fn sign_asset_href(&self, href: &str) -> Result<String> {
        self.rt.block_on(self.inner.sign_asset_href(href))
    }
}
