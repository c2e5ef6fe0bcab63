use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        AssetsRepo, CreateAssetParams, CreateRecordParams, RecordsRepo, RepoError,
    },
    domain::{
        entities::{AssetRecord, ProductRecord, RecordMeta},
        types::{PostStatus, PostType},
    },
};

use super::{PostgresRepositories, map_sqlx_error};

const SLUG_CONSTRAINT: &str = "product_records_slug_key";
/// Suffixed slugs tried before giving up on a colliding title.
const MAX_SLUG_ATTEMPTS: u32 = 50;

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    slug: String,
    title: String,
    content: String,
    status: PostStatus,
    post_type: PostType,
    thumbnail_asset_id: Option<Uuid>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<RecordRow> for ProductRecord {
    fn from(row: RecordRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            content: row.content,
            status: row.status,
            post_type: row.post_type,
            thumbnail_asset_id: row.thumbnail_asset_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MetaRow {
    record_id: Uuid,
    meta_key: String,
    meta_value: String,
}

#[derive(sqlx::FromRow)]
struct AssetRow {
    id: Uuid,
    record_id: Option<Uuid>,
    source_url: String,
    filename: String,
    content_type: String,
    size_bytes: i64,
    checksum: String,
    stored_path: String,
    width: Option<i32>,
    height: Option<i32>,
    created_at: OffsetDateTime,
}

impl From<AssetRow> for AssetRecord {
    fn from(row: AssetRow) -> Self {
        Self {
            id: row.id,
            record_id: row.record_id,
            source_url: row.source_url,
            filename: row.filename,
            content_type: row.content_type,
            size_bytes: row.size_bytes,
            checksum: row.checksum,
            stored_path: row.stored_path,
            width: row.width,
            height: row.height,
            created_at: row.created_at,
        }
    }
}

fn candidate_slug(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{base}-{}", attempt + 1)
    }
}

impl PostgresRepositories {
    /// Insert under the first free candidate slug. `ON CONFLICT DO NOTHING` keeps the
    /// surrounding transaction usable when a candidate is taken.
    async fn insert_record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        params: &CreateRecordParams,
    ) -> Result<ProductRecord, RepoError> {
        for attempt in 0..MAX_SLUG_ATTEMPTS {
            let slug = candidate_slug(&params.slug, attempt);
            let row = sqlx::query_as::<_, RecordRow>(
                r#"
                INSERT INTO product_records (id, slug, title, content, status, post_type)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT ON CONSTRAINT product_records_slug_key DO NOTHING
                RETURNING id, slug, title, content, status, post_type, thumbnail_asset_id,
                          created_at, updated_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&slug)
            .bind(&params.title)
            .bind(&params.content)
            .bind(params.status)
            .bind(params.post_type)
            .fetch_optional(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

            if let Some(row) = row {
                return Ok(row.into());
            }
        }

        Err(RepoError::Duplicate {
            constraint: SLUG_CONSTRAINT.to_string(),
        })
    }

    async fn insert_meta(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record_id: Uuid,
        meta: &[(String, String)],
    ) -> Result<(), RepoError> {
        for (key, value) in meta {
            sqlx::query(
                r#"
                INSERT INTO record_meta (record_id, meta_key, meta_value)
                VALUES ($1, $2, $3)
                ON CONFLICT (record_id, meta_key) DO UPDATE SET meta_value = EXCLUDED.meta_value
                "#,
            )
            .bind(record_id)
            .bind(key)
            .bind(value)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;
        }

        Ok(())
    }
}

#[async_trait]
impl RecordsRepo for PostgresRepositories {
    async fn create_records(
        &self,
        batch: Vec<CreateRecordParams>,
    ) -> Result<Vec<ProductRecord>, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        let mut created = Vec::with_capacity(batch.len());

        for params in &batch {
            let record = self.insert_record(&mut tx, params).await?;
            self.insert_meta(&mut tx, record.id, &params.meta).await?;
            created.push(record);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(created)
    }

    async fn set_thumbnail(&self, record_id: Uuid, asset_id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE product_records
            SET thumbnail_asset_id = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(record_id)
        .bind(asset_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }

    async fn find_record(&self, id: Uuid) -> Result<Option<ProductRecord>, RepoError> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT id, slug, title, content, status, post_type, thumbnail_asset_id,
                   created_at, updated_at
            FROM product_records
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ProductRecord::from))
    }

    async fn list_meta(&self, record_id: Uuid) -> Result<Vec<RecordMeta>, RepoError> {
        let rows = sqlx::query_as::<_, MetaRow>(
            r#"
            SELECT record_id, meta_key, meta_value
            FROM record_meta
            WHERE record_id = $1
            ORDER BY meta_key
            "#,
        )
        .bind(record_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| RecordMeta {
                record_id: row.record_id,
                meta_key: row.meta_key,
                meta_value: row.meta_value,
            })
            .collect())
    }
}

#[async_trait]
impl AssetsRepo for PostgresRepositories {
    async fn create_asset(&self, params: CreateAssetParams) -> Result<AssetRecord, RepoError> {
        let row = sqlx::query_as::<_, AssetRow>(
            r#"
            INSERT INTO assets (id, record_id, source_url, filename, content_type, size_bytes,
                                checksum, stored_path, width, height)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, record_id, source_url, filename, content_type, size_bytes, checksum,
                      stored_path, width, height, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.record_id)
        .bind(&params.source_url)
        .bind(&params.filename)
        .bind(&params.content_type)
        .bind(params.size_bytes)
        .bind(&params.checksum)
        .bind(&params.stored_path)
        .bind(params.width)
        .bind(params.height)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}
