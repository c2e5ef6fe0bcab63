#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use time::{OffsetDateTime, macros::datetime};
use uuid::Uuid;

use product_sync::application::products::{PaapiConfig, ProductImporter, ProductService};
use product_sync::application::repos::{
    CreateRecordParams, MediaError, MediaImporter, RecordsRepo, RepoError,
};
use product_sync::cache::{
    CacheConfig, CacheEntry, CacheError, CacheKey, MemoryCacheStore, ProductCache,
};
use product_sync::domain::entities::{AssetRecord, ProductRecord, RecordMeta};
use product_sync::domain::region::Marketplace;
use product_sync::infra::paapi::{Credentials, HttpTransport, TransportError, UpstreamResponse};
use product_sync::util::clock::{Clock, ManualClock};

pub const SAMPLE_BODY: &str = r#"{
    "ItemsResult": {
        "Items": [{
            "ASIN": "B08N5WRWNW",
            "DetailPageURL": "https://www.amazon.com/dp/B08N5WRWNW?tag=example-20",
            "Images": {"Primary": {"Large": {"URL": "https://m.media-amazon.com/images/I/large.jpg", "Height": 500, "Width": 500}}},
            "ItemInfo": {
                "Title": {"DisplayValue": "Echo Dot (4th Gen)", "Label": "Title"},
                "Features": {"DisplayValues": ["Compact speaker", "Voice control"]}
            },
            "Offers": {"Listings": [{"Price": {"Amount": 19.99, "Currency": "USD", "DisplayAmount": "$19.99", "Savings": {"Amount": 5.0}}}]}
        }]
    }
}"#;

/// Two products; the second has neither image nor offers.
pub const TWO_ITEM_BODY: &str = r#"{
    "ItemsResult": {
        "Items": [
            {
                "ASIN": "B08N5WRWNW",
                "DetailPageURL": "https://www.amazon.com/dp/B08N5WRWNW",
                "ItemInfo": {"Title": {"DisplayValue": "Echo Dot (4th Gen)"}}
            },
            {
                "ASIN": "B07XJ8C8F5",
                "DetailPageURL": "https://www.amazon.com/dp/B07XJ8C8F5",
                "ItemInfo": {"Title": {"DisplayValue": "Fire TV Stick"}}
            }
        ]
    }
}"#;

pub const EMPTY_BODY: &str = r#"{"Errors":[{"Code":"InvalidParameterValue","Message":"ItemId is invalid."}]}"#;

pub fn start_time() -> OffsetDateTime {
    datetime!(2026-03-01 09:30:00 UTC)
}

/// One recorded `post` call.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl SentRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Replays one canned response (or error) for every call and records what was sent.
pub struct FakeTransport {
    response: Mutex<Result<UpstreamResponse, TransportError>>,
    sent: Mutex<Vec<SentRequest>>,
}

impl FakeTransport {
    pub fn responding(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(UpstreamResponse {
                status,
                body: body.to_string(),
            })),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(err: TransportError) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Err(err)),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Vec<u8>,
    ) -> Result<UpstreamResponse, TransportError> {
        self.sent.lock().unwrap().push(SentRequest {
            url: url.to_string(),
            headers: headers.to_vec(),
            body,
        });
        match &*self.response.lock().unwrap() {
            Ok(response) => Ok(response.clone()),
            Err(TransportError::Timeout) => Err(TransportError::Timeout),
            Err(TransportError::Failed(message)) => Err(TransportError::Failed(message.clone())),
        }
    }
}

/// In-memory records store. A batch is applied all-or-nothing, like the
/// transactional Postgres store.
#[derive(Default)]
pub struct FakeRecords {
    pub records: Mutex<Vec<ProductRecord>>,
    pub meta: Mutex<Vec<RecordMeta>>,
    /// Fail when the batch reaches this record (1-based).
    pub fail_at: Option<usize>,
}

impl FakeRecords {
    pub fn meta_value(&self, record_id: Uuid, key: &str) -> Option<String> {
        self.meta
            .lock()
            .unwrap()
            .iter()
            .find(|meta| meta.record_id == record_id && meta.meta_key == key)
            .map(|meta| meta.meta_value.clone())
    }
}

#[async_trait]
impl RecordsRepo for FakeRecords {
    async fn create_records(
        &self,
        batch: Vec<CreateRecordParams>,
    ) -> Result<Vec<ProductRecord>, RepoError> {
        let now = start_time();
        let mut created = Vec::new();
        let mut meta = Vec::new();

        for (index, params) in batch.into_iter().enumerate() {
            if self.fail_at == Some(index + 1) {
                return Err(RepoError::Timeout);
            }
            let record = ProductRecord {
                id: Uuid::new_v4(),
                slug: params.slug,
                title: params.title,
                content: params.content,
                status: params.status,
                post_type: params.post_type,
                thumbnail_asset_id: None,
                created_at: now,
                updated_at: now,
            };
            meta.extend(params.meta.into_iter().map(|(key, value)| RecordMeta {
                record_id: record.id,
                meta_key: key,
                meta_value: value,
            }));
            created.push(record);
        }

        self.records.lock().unwrap().extend(created.iter().cloned());
        self.meta.lock().unwrap().extend(meta);
        Ok(created)
    }

    async fn set_thumbnail(&self, record_id: Uuid, asset_id: Uuid) -> Result<(), RepoError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|record| record.id == record_id)
            .ok_or(RepoError::NotFound)?;
        record.thumbnail_asset_id = Some(asset_id);
        Ok(())
    }

    async fn find_record(&self, id: Uuid) -> Result<Option<ProductRecord>, RepoError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }

    async fn list_meta(&self, record_id: Uuid) -> Result<Vec<RecordMeta>, RepoError> {
        Ok(self
            .meta
            .lock()
            .unwrap()
            .iter()
            .filter(|meta| meta.record_id == record_id)
            .cloned()
            .collect())
    }
}

/// Media importer that either registers a fake asset or fails every download.
pub struct FakeMedia {
    pub fail: bool,
    pub requested: Mutex<Vec<String>>,
}

impl FakeMedia {
    pub fn working() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            requested: Mutex::new(Vec::new()),
        })
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            requested: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MediaImporter for FakeMedia {
    async fn import_remote_image(
        &self,
        url: &str,
        record_id: Uuid,
    ) -> Result<AssetRecord, MediaError> {
        self.requested.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(MediaError::Status {
                url: url.to_string(),
                status: 404,
            });
        }
        Ok(AssetRecord {
            id: Uuid::new_v4(),
            record_id: Some(record_id),
            source_url: url.to_string(),
            filename: "large.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            size_bytes: 1024,
            checksum: "0".repeat(64),
            stored_path: "2026/03/01/large.jpg".to_string(),
            width: Some(500),
            height: Some(500),
            created_at: start_time(),
        })
    }
}

/// Cache whose backend is down: every call errors.
pub struct FailingCache;

impl ProductCache for FailingCache {
    fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        Err(CacheError::Unavailable("backend down".to_string()))
    }

    fn put(&self, _key: CacheKey, _body: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("backend down".to_string()))
    }

    fn clear(&self, _prefix: &str) -> Result<usize, CacheError> {
        Err(CacheError::Unavailable("backend down".to_string()))
    }
}

pub fn credentials() -> Credentials {
    Credentials::new(
        "AKIDEXAMPLE",
        "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
        "example-20",
    )
}

pub struct Harness {
    pub service: Arc<ProductService>,
    pub transport: Arc<FakeTransport>,
    pub cache: Arc<MemoryCacheStore>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(transport: Arc<FakeTransport>) -> Harness {
    harness_with_cache(transport, CacheConfig::default())
}

pub fn harness_with_cache(transport: Arc<FakeTransport>, cache: CacheConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(start_time()));
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let cache = Arc::new(MemoryCacheStore::new(&cache, dyn_clock.clone()));
    let service = Arc::new(ProductService::new(
        PaapiConfig {
            credentials: credentials(),
            marketplace: Marketplace::lookup("com"),
        },
        transport.clone(),
        cache.clone(),
        dyn_clock,
    ));

    Harness {
        service,
        transport,
        cache,
        clock,
    }
}

pub fn importer(
    service: Arc<ProductService>,
    records: Arc<FakeRecords>,
    media: Arc<FakeMedia>,
) -> Arc<ProductImporter> {
    Arc::new(ProductImporter::new(service, records, media))
}

/// Service over an arbitrary cache backend.
pub fn service_with_cache(
    transport: Arc<FakeTransport>,
    cache: Arc<dyn ProductCache>,
) -> Arc<ProductService> {
    Arc::new(ProductService::new(
        PaapiConfig {
            credentials: credentials(),
            marketplace: Marketplace::lookup("com"),
        },
        transport,
        cache,
        Arc::new(ManualClock::new(start_time())),
    ))
}
