//! Product lookup and import.
//!
//! [`ProductService`] runs the fetch pipeline: normalize identifiers, consult
//! the response cache, sign and send a `GetItems` request, and store the raw
//! body when the write policy allows it. [`ProductImporter`] reuses the same
//! signed request path (never the cache) and turns each returned item into a
//! persisted record with meta values and a thumbnail.

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::repos::{CreateRecordParams, MediaImporter, RecordsRepo, RepoError};
use crate::cache::{CACHE_NAMESPACE, CACHE_TTL, CacheKey, ProductCache, should_store};
use crate::domain::identifiers::{
    IdentifierError, IdentifierInput, ProductId, ValidationPolicy, normalize,
};
use crate::domain::products::GetItemsResponse;
use crate::domain::region::Marketplace;
use crate::domain::slug::record_slug;
use crate::domain::types::{PostStatus, PostType};
use crate::infra::paapi::{
    Credentials, GET_ITEMS_PATH, GetItemsPayload, HttpTransport, RequestSigner, SignError,
    TransportError, UpstreamResponse, get_items_url,
};
use crate::util::clock::Clock;

/// Largest identifier batch accepted by an import.
pub const MAX_IMPORT_BATCH: usize = 10;

pub const NO_PRODUCT_FOUND: &str = "No product found.";
pub const IMPORT_SUCCESS: &str = "Product has been imported successfully.";
pub const CACHE_CLEARED: &str = "Cache cleared.";
pub const CACHE_CLEAR_FAILED: &str = "Error: the cache could not be cleared.";

pub const METRIC_UPSTREAM_REQUESTS: &str = "product_sync_upstream_requests_total";
pub const METRIC_IMPORTED_RECORDS: &str = "product_sync_imported_records_total";
pub const METRIC_IMAGE_FAILURES: &str = "product_sync_image_import_failures_total";

#[derive(Debug, Error)]
pub enum ProductError {
    #[error(transparent)]
    Validation(#[from] IdentifierError),
    #[error("You can import maximum {max} products at a time.")]
    BatchTooLarge { requested: usize, max: usize },
    #[error("failed to sign upstream request: {0}")]
    Signing(#[from] SignError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("upstream responded with status {status}")]
    Upstream { status: u16 },
    #[error("No product found.")]
    NoProductFound,
    #[error("failed to persist imported product: {0}")]
    Persistence(#[from] RepoError),
}

impl ProductError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProductError::Validation(_) | ProductError::BatchTooLarge { .. } => {
                StatusCode::BAD_REQUEST
            }
            ProductError::NoProductFound => StatusCode::NOT_FOUND,
            ProductError::Transport(TransportError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            ProductError::Transport(_) | ProductError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ProductError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProductError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn presentation_message(&self) -> &'static str {
        match self {
            ProductError::Validation(_) => "Invalid product identifiers",
            ProductError::BatchTooLarge { .. } => "You can import maximum 10 products at a time.",
            ProductError::NoProductFound | ProductError::Upstream { .. } => NO_PRODUCT_FOUND,
            ProductError::Transport(_) => "Product Advertising API is unreachable",
            ProductError::Persistence(_) => "Imported product could not be saved",
            ProductError::Signing(_) => "Unexpected error occurred",
        }
    }

    /// Message returned to API callers.
    pub fn public_message(&self) -> String {
        match self {
            ProductError::Validation(err) => err.to_string(),
            other => other.presentation_message().to_string(),
        }
    }
}

/// Credentials plus the marketplace they sign for.
#[derive(Debug, Clone)]
pub struct PaapiConfig {
    pub credentials: Credentials,
    pub marketplace: Marketplace,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    /// Connectivity check: bypass the cache for both read and write.
    pub test_connection: bool,
}

#[derive(Debug, Clone)]
pub struct FetchedProducts {
    pub ids: Vec<ProductId>,
    /// Malformed identifiers dropped before the lookup.
    pub rejected: Vec<String>,
    /// Raw upstream body, as cached.
    pub body: String,
    pub response: GetItemsResponse,
    pub from_cache: bool,
}

impl FetchedProducts {
    pub fn body_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared { removed: usize },
    Failed,
}

#[derive(Clone)]
pub struct ProductService {
    config: PaapiConfig,
    signer: RequestSigner,
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn ProductCache>,
    clock: Arc<dyn Clock>,
}

impl ProductService {
    pub fn new(
        config: PaapiConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn ProductCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let signer = RequestSigner::new(&config.credentials, config.marketplace.signing_region());
        Self {
            config,
            signer,
            transport,
            cache,
            clock,
        }
    }

    pub fn marketplace(&self) -> Marketplace {
        self.config.marketplace
    }

    pub async fn fetch_by_identifiers(
        &self,
        input: &IdentifierInput,
        options: FetchOptions,
    ) -> Result<FetchedProducts, ProductError> {
        let normalized = normalize(input);
        let rejected = normalized.rejected_values();
        if !rejected.is_empty() {
            warn!(
                target = "application::products::fetch_by_identifiers",
                rejected = ?rejected,
                "dropping malformed product identifiers"
            );
        }
        let ids = normalized.apply(ValidationPolicy::Lenient)?;
        let key = CacheKey::for_ids(&ids);

        if !options.test_connection {
            if let Some(fetched) = self.cached(&key, &ids, &rejected) {
                return Ok(fetched);
            }
        }

        let upstream = self.request_items(&ids).await?;
        let response = parse_items(&upstream)?;

        if should_store(ids.len(), options.test_connection) {
            if let Err(err) = self.cache.put(key.clone(), upstream.body.clone(), CACHE_TTL) {
                warn!(
                    target = "application::products::fetch_by_identifiers",
                    key = %key,
                    error = %err,
                    "failed to store upstream response"
                );
            }
        } else {
            debug!(
                target = "application::products::fetch_by_identifiers",
                key = %key,
                ids = ids.len(),
                test_connection = options.test_connection,
                "response not cached"
            );
        }

        Ok(FetchedProducts {
            ids,
            rejected,
            body: upstream.body,
            response,
            from_cache: false,
        })
    }

    fn cached(
        &self,
        key: &CacheKey,
        ids: &[ProductId],
        rejected: &[String],
    ) -> Option<FetchedProducts> {
        let entry = match self.cache.get(key) {
            Ok(entry) => entry?,
            Err(err) => {
                warn!(
                    target = "application::products::cached",
                    key = %key,
                    error = %err,
                    "cache lookup failed, falling back to upstream"
                );
                return None;
            }
        };

        let response = GetItemsResponse::parse(&entry.body)?;
        debug!(target = "application::products::cached", key = %key, "serving cached response");

        Some(FetchedProducts {
            ids: ids.to_vec(),
            rejected: rejected.to_vec(),
            body: entry.body,
            response,
            from_cache: true,
        })
    }

    /// Sign and send one `GetItems` request. Never touches the cache.
    pub async fn request_items(&self, ids: &[ProductId]) -> Result<UpstreamResponse, ProductError> {
        let marketplace = self.config.marketplace;
        let host = marketplace.host();
        let payload = GetItemsPayload::new(
            ids,
            marketplace.marketplace_domain(),
            self.config.credentials.partner_tag.clone(),
        );

        if !self.config.credentials.is_complete() {
            warn!(
                target = "application::products::request_items",
                "credentials incomplete, sending unsigned request"
            );
        }

        let signed = self
            .signer
            .sign("POST", GET_ITEMS_PATH, &host, &payload, self.clock.now())?;

        let started = Instant::now();
        let result = self
            .transport
            .post(&get_items_url(&host), &signed.headers, signed.body)
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                counter!(METRIC_UPSTREAM_REQUESTS, "outcome" => "response").increment(1);
                info!(
                    target = "application::products::request_items",
                    host = %host,
                    ids = payload.item_ids().len(),
                    status = response.status,
                    elapsed_ms,
                    "upstream responded"
                );
                Ok(response)
            }
            Err(err) => {
                counter!(METRIC_UPSTREAM_REQUESTS, "outcome" => "transport_error").increment(1);
                warn!(
                    target = "application::products::request_items",
                    host = %host,
                    error = %err,
                    elapsed_ms,
                    "upstream request failed"
                );
                Err(err.into())
            }
        }
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) -> ClearOutcome {
        match self.cache.clear(CACHE_NAMESPACE) {
            Ok(removed) => {
                info!(
                    target = "application::products::clear_cache",
                    removed, "product cache cleared"
                );
                ClearOutcome::Cleared { removed }
            }
            Err(err) => {
                warn!(
                    target = "application::products::clear_cache",
                    error = %err,
                    "failed to clear product cache"
                );
                ClearOutcome::Failed
            }
        }
    }
}

/// Accept only a 200 carrying at least one item.
fn parse_items(upstream: &UpstreamResponse) -> Result<GetItemsResponse, ProductError> {
    if !upstream.is_ok() {
        return Err(ProductError::Upstream {
            status: upstream.status,
        });
    }

    GetItemsResponse::parse(&upstream.body)
        .filter(|response| !response.items().is_empty())
        .ok_or(ProductError::NoProductFound)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub record_ids: Vec<Uuid>,
    /// Records created without a thumbnail (no image, or the image import failed).
    pub without_thumbnail: usize,
}

impl ImportSummary {
    pub fn imported(&self) -> usize {
        self.record_ids.len()
    }
}

#[derive(Clone)]
pub struct ProductImporter {
    products: Arc<ProductService>,
    records: Arc<dyn RecordsRepo>,
    media: Arc<dyn MediaImporter>,
}

impl ProductImporter {
    pub fn new(
        products: Arc<ProductService>,
        records: Arc<dyn RecordsRepo>,
        media: Arc<dyn MediaImporter>,
    ) -> Self {
        Self {
            products,
            records,
            media,
        }
    }

    pub async fn import_by_identifiers(
        &self,
        raw: &str,
        status: PostStatus,
        post_type: PostType,
    ) -> Result<ImportSummary, ProductError> {
        let input = IdentifierInput::Single(raw.to_string());
        let requested = input.token_count();
        if requested > MAX_IMPORT_BATCH {
            return Err(ProductError::BatchTooLarge {
                requested,
                max: MAX_IMPORT_BATCH,
            });
        }

        let ids = normalize(&input).apply(ValidationPolicy::Strict)?;
        let upstream = self.products.request_items(&ids).await?;
        let response = parse_items(&upstream)?;

        let drafts: Vec<_> = response
            .items()
            .iter()
            .map(|item| item.to_draft(status, post_type))
            .collect();
        let batch = drafts
            .iter()
            .map(|draft| CreateRecordParams {
                slug: record_slug(&draft.title, &draft.asin),
                title: draft.title.clone(),
                content: draft.content.clone(),
                status: draft.status,
                post_type: draft.post_type,
                meta: draft
                    .meta()
                    .into_iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
            })
            .collect();

        let records = self.records.create_records(batch).await?;
        counter!(METRIC_IMPORTED_RECORDS).increment(records.len() as u64);

        let mut summary = ImportSummary::default();
        for (record, draft) in records.iter().zip(&drafts) {
            if !self.attach_thumbnail(record.id, draft.image_url.as_deref()).await {
                summary.without_thumbnail += 1;
            }
            summary.record_ids.push(record.id);
        }

        info!(
            target = "application::products::import_by_identifiers",
            imported = summary.imported(),
            without_thumbnail = summary.without_thumbnail,
            status = %status,
            post_type = %post_type,
            "products imported"
        );

        Ok(summary)
    }

    /// Import the image and set it as thumbnail once. Failures are logged, never raised.
    async fn attach_thumbnail(&self, record_id: Uuid, image_url: Option<&str>) -> bool {
        let Some(url) = image_url else {
            return false;
        };

        let asset = match self.media.import_remote_image(url, record_id).await {
            Ok(asset) => asset,
            Err(err) => {
                counter!(METRIC_IMAGE_FAILURES).increment(1);
                warn!(
                    target = "application::products::attach_thumbnail",
                    record_id = %record_id,
                    url,
                    error = %err,
                    "image import failed"
                );
                return false;
            }
        };

        match self.records.set_thumbnail(record_id, asset.id).await {
            Ok(()) => true,
            Err(err) => {
                counter!(METRIC_IMAGE_FAILURES).increment(1);
                warn!(
                    target = "application::products::attach_thumbnail",
                    record_id = %record_id,
                    asset_id = %asset.id,
                    error = %err,
                    "failed to set thumbnail"
                );
                false
            }
        }
    }
}
