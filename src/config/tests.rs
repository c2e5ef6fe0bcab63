use super::*;
use crate::domain::types::{PostStatus, PostType};

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        logging: LoggingOverrides {
            log_level: Some("debug".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_cover_every_section() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert!(settings.server.admin_token.is_none());
    assert!(settings.database.url.is_none());
    assert_eq!(settings.paapi.region, "com");
    assert_eq!(settings.paapi.timeout, Duration::from_secs(10));
    assert_eq!(settings.paapi.connect_timeout, Duration::from_secs(5));
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.capacity.get(), DEFAULT_CACHE_CAPACITY);
    assert_eq!(settings.media.max_image_bytes.get(), 10 * 1024 * 1024);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = LoggingOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_logging_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn paapi_credentials_are_trimmed_and_region_overridable() {
    let mut raw = RawSettings::default();
    raw.paapi.access_key = Some("  AKIDEXAMPLE ".to_string());
    raw.paapi.partner_tag = Some("tag-20".to_string());
    raw.apply_paapi_overrides(&PaapiOverrides {
        paapi_region: Some("co.uk".to_string()),
        paapi_timeout_seconds: Some(20),
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.paapi.access_key, "AKIDEXAMPLE");
    assert_eq!(settings.paapi.secret_key, "");
    assert_eq!(settings.paapi.region, "co.uk");
    assert_eq!(settings.paapi.timeout, Duration::from_secs(20));
}

#[test]
fn paapi_debug_redacts_secret() {
    let mut raw = RawSettings::default();
    raw.paapi.secret_key = Some("wJalrXUtnFEMI".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");

    let rendered = format!("{:?}", settings.paapi);
    assert!(!rendered.contains("wJalrXUtnFEMI"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn blank_admin_token_is_treated_as_unset() {
    let mut raw = RawSettings::default();
    raw.server.admin_token = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.server.admin_token.is_none());
}

#[test]
fn zero_cache_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.capacity = Some(0);

    let err = Settings::from_raw(raw).expect_err("capacity must be positive");
    assert!(matches!(err, LoadError::Invalid { key: "cache.capacity", .. }));
}

#[test]
fn connect_timeout_cannot_exceed_request_timeout() {
    let mut raw = RawSettings::default();
    raw.paapi.timeout_seconds = Some(3);
    raw.paapi.connect_timeout_seconds = Some(5);

    let err = Settings::from_raw(raw).expect_err("connect timeout too large");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "paapi.connect_timeout_seconds",
            ..
        }
    ));
}

#[test]
fn ipv6_hosts_are_bracketed() {
    let mut raw = RawSettings::default();
    raw.server.host = Some("::1".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.server.addr.is_ipv6());
}

#[test]
fn invalid_log_level_is_reported() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["product-sync"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_fetch_arguments() {
    let args = CliArgs::parse_from([
        "product-sync",
        "fetch",
        "B08N5WRWNW,B07XJ8C8F5",
        "--test-connection",
        "--paapi-region",
        "de",
    ]);

    match args.command.expect("fetch command") {
        Command::Fetch(fetch) => {
            assert_eq!(fetch.ids, "B08N5WRWNW,B07XJ8C8F5");
            assert!(fetch.test_connection);
            assert_eq!(fetch.paapi.paapi_region.as_deref(), Some("de"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_import_arguments() {
    let args = CliArgs::parse_from([
        "product-sync",
        "import",
        "B08N5WRWNW",
        "--post-status",
        "draft",
        "--post-type",
        "page",
        "--database-url",
        "postgres://example",
    ]);

    match args.command.expect("import command") {
        Command::Import(import) => {
            assert_eq!(import.post_status, PostStatus::Draft);
            assert_eq!(import.post_type, PostType::Page);
            assert_eq!(
                import.storage.database_url.as_deref(),
                Some("postgres://example")
            );
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn import_defaults_to_published_posts() {
    let args = CliArgs::parse_from(["product-sync", "import", "B08N5WRWNW"]);
    match args.command.expect("import command") {
        Command::Import(import) => {
            assert_eq!(import.post_status, PostStatus::Publish);
            assert_eq!(import.post_type, PostType::Post);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn import_rejects_unknown_post_status() {
    let result = CliArgs::try_parse_from([
        "product-sync",
        "import",
        "B08N5WRWNW",
        "--post-status",
        "archived",
    ]);
    assert!(result.is_err());
}
