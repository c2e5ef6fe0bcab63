use std::sync::Arc;

use crate::application::products::{ProductImporter, ProductService};
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct ApiState {
    pub products: Arc<ProductService>,
    /// Absent when no database is configured; imports then answer 503.
    pub importer: Option<Arc<ProductImporter>>,
    pub admin_token: Option<Arc<str>>,
    pub db: Option<Arc<PostgresRepositories>>,
}

impl ApiState {
    pub fn new(products: Arc<ProductService>) -> Self {
        Self {
            products,
            importer: None,
            admin_token: None,
            db: None,
        }
    }

    pub fn with_importer(mut self, importer: Arc<ProductImporter>) -> Self {
        self.importer = Some(importer);
        self
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token.map(Arc::from);
        self
    }

    pub fn with_db(mut self, db: Arc<PostgresRepositories>) -> Self {
        self.db = Some(db);
        self
    }
}
