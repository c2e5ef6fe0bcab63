use std::{future::IntoFuture, process, sync::Arc};

use product_sync::{
    application::{
        error::AppError,
        products::{FetchOptions, PaapiConfig, ProductError, ProductImporter, ProductService},
        repos::RecordsRepo,
    },
    cache::{CacheConfig, MemoryCacheStore},
    config,
    domain::{
        identifiers::IdentifierInput,
        products::{META_ASIN, META_PRICE},
        region::Marketplace,
    },
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        media::{MediaStorage, RemoteMediaImporter},
        paapi::{Credentials, ReqwestTransport},
        telemetry,
    },
    util::clock::{Clock, SystemClock},
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use uuid::Uuid;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Fetch(args) => run_fetch(settings, args).await,
        config::Command::Import(args) => run_import(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let products = build_product_service(&settings)?;
    let mut state =
        ApiState::new(products.clone()).with_admin_token(settings.server.admin_token.clone());

    match init_repositories(&settings).await {
        Ok(db) => {
            let importer = build_importer(&settings, products, db.clone())?;
            state = state.with_importer(importer).with_db(db);
        }
        Err(AppError::Infra(err)) if err.is_not_configured() => {
            warn!(
                target = "product_sync::serve",
                reason = %err,
                "imports disabled"
            );
        }
        Err(err) => return Err(err),
    }

    serve_http(&settings, state).await
}

async fn run_fetch(settings: config::Settings, args: config::FetchArgs) -> Result<(), AppError> {
    let products = build_product_service(&settings)?;
    let input = IdentifierInput::from(args.ids.as_str());
    let options = FetchOptions {
        test_connection: args.test_connection,
    };

    let fetched = products.fetch_by_identifiers(&input, options).await?;
    let body = fetched
        .body_json()
        .map_err(|err| AppError::unexpected(format!("upstream body is not JSON: {err}")))?;
    let rendered = serde_json::to_string_pretty(&body)
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    println!("{rendered}");
    Ok(())
}

async fn run_import(settings: config::Settings, args: config::ImportArgs) -> Result<(), AppError> {
    let products = build_product_service(&settings)?;
    let db = init_repositories(&settings).await?;
    let importer = build_importer(&settings, products, db.clone())?;

    let summary = importer
        .import_by_identifiers(&args.ids, args.post_status, args.post_type)
        .await?;

    for record_id in &summary.record_ids {
        print_record(db.as_ref(), *record_id).await?;
    }
    info!(
        target = "product_sync::import",
        imported = summary.imported(),
        without_thumbnail = summary.without_thumbnail,
        "import finished"
    );
    Ok(())
}

/// One tab-separated line per record: id, slug, asin, price.
async fn print_record(records: &dyn RecordsRepo, record_id: Uuid) -> Result<(), AppError> {
    let record = records
        .find_record(record_id)
        .await
        .map_err(ProductError::from)?
        .ok_or_else(|| AppError::unexpected(format!("imported record {record_id} vanished")))?;
    let meta = records
        .list_meta(record_id)
        .await
        .map_err(ProductError::from)?;
    let value = |key: &str| {
        meta.iter()
            .find(|entry| entry.meta_key == key)
            .map(|entry| entry.meta_value.as_str())
            .unwrap_or_default()
    };

    println!(
        "{}\t{}\t{}\t{}",
        record.id,
        record.slug,
        value(META_ASIN),
        value(META_PRICE)
    );
    Ok(())
}

fn build_product_service(settings: &config::Settings) -> Result<Arc<ProductService>, AppError> {
    let paapi = &settings.paapi;

    let marketplace = match Marketplace::try_lookup(&paapi.region) {
        Some(marketplace) => marketplace,
        None => {
            let fallback = Marketplace::lookup(&paapi.region);
            warn!(
                target = "product_sync::config",
                region = %paapi.region,
                fallback = fallback.locale(),
                "unknown marketplace locale"
            );
            fallback
        }
    };

    let credentials = Credentials::new(
        paapi.access_key.clone(),
        paapi.secret_key.clone(),
        paapi.partner_tag.clone(),
    );
    if !credentials.is_complete() {
        warn!(
            target = "product_sync::config",
            "paapi credentials are incomplete; upstream requests will be rejected"
        );
    }

    let transport =
        ReqwestTransport::new(paapi.timeout, paapi.connect_timeout).map_err(InfraError::from)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = MemoryCacheStore::new(&CacheConfig::from(&settings.cache), clock.clone());
    let cache_enabled = cache.is_enabled();

    let service = ProductService::new(
        PaapiConfig {
            credentials,
            marketplace,
        },
        Arc::new(transport),
        Arc::new(cache),
        clock,
    );
    info!(
        target = "product_sync::config",
        locale = service.marketplace().locale(),
        host = %service.marketplace().host(),
        cache_enabled,
        "product service ready"
    );

    Ok(Arc::new(service))
}

fn build_importer(
    settings: &config::Settings,
    products: Arc<ProductService>,
    db: Arc<PostgresRepositories>,
) -> Result<Arc<ProductImporter>, AppError> {
    let storage = MediaStorage::new(settings.media.directory.clone()).map_err(InfraError::from)?;
    info!(
        target = "product_sync::media",
        directory = %storage.root().display(),
        "media storage ready"
    );

    let media = RemoteMediaImporter::new(
        storage,
        db.clone(),
        settings.media.max_image_bytes.get(),
        settings.paapi.timeout,
    )
    .map_err(InfraError::from)?;

    Ok(Arc::new(ProductImporter::new(
        products,
        db,
        Arc::new(media),
    )))
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::from)?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::migration(err.to_string()))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "product_sync::serve",
        addr = %settings.server.addr,
        "listening"
    );

    let shutdown = Arc::new(Notify::new());
    let trigger = shutdown.clone();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            trigger.notify_one();
        })
        .into_future();

    let grace = settings.server.graceful_shutdown;
    let deadline = async move {
        shutdown.notified().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = deadline => {
            warn!(
                target = "product_sync::serve",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out, dropping open connections"
            );
        }
    }

    Ok(())
}

async fn wait_for_shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "product_sync::serve",
            error = %err,
            "failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
    info!(target = "product_sync::serve", "shutdown signal received");
}
