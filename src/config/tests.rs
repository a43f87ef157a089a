use clap::Parser;

use super::*;

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:8000");
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(30));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert_eq!(settings.logging.format, LogFormat::Compact);
    assert!(settings.database.url.is_none());
    assert_eq!(settings.database.max_connections.get(), 8);
    assert_eq!(settings.feed.page_size.get(), 10);
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.index_ttl_seconds.get(), 20);
    assert_eq!(settings.cache.response_limit.get(), 64);
    assert_eq!(settings.uploads.directory, PathBuf::from("media"));
    assert_eq!(
        settings.uploads.max_request_bytes.get(),
        DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES
    );
    assert_eq!(settings.auth.login_path, "/auth/login/");
    assert!(settings.auth.session_ttl.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.feed.page_size = Some(20);

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        feed_page_size: Some(5),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.feed.page_size.get(), 5);
}

#[test]
fn blank_database_url_means_in_memory() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn zero_sizes_are_rejected() {
    let mut raw = RawSettings::default();
    raw.feed.page_size = Some(0);
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "feed.page_size"),
        other => panic!("unexpected {other:?}"),
    }

    let mut raw = RawSettings::default();
    raw.cache.index_ttl_seconds = Some(0);
    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "cache.index_ttl_seconds"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn bad_log_level_and_host_are_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "logging.level",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.server.host = Some("not a host".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "server.host",
            ..
        })
    ));
}

#[test]
fn session_ttl_is_expressed_in_hours() {
    let mut raw = RawSettings::default();
    raw.auth.session_ttl_hours = Some(2);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.auth.session_ttl, Some(Duration::from_secs(7200)));
}

#[test]
fn login_path_must_stay_on_site() {
    let mut raw = RawSettings::default();
    raw.auth.login_path = Some("//evil.example/login".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.apply_serve_overrides(&ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.logging.format, LogFormat::Json);
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["yatube"]);
    assert!(args.command.is_none());
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "yatube",
        "serve",
        "--server-port",
        "9000",
        "--cache-enabled",
        "false",
        "--uploads-directory",
        "/tmp/media",
    ]);
    match args.command {
        Some(Command::Serve(serve)) => {
            assert_eq!(serve.overrides.server_port, Some(9000));
            assert_eq!(serve.overrides.cache_enabled, Some(false));
            assert_eq!(
                serve.overrides.uploads_directory,
                Some(PathBuf::from("/tmp/media"))
            );
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn parse_management_commands() {
    let args = CliArgs::parse_from(["yatube", "users", "create", "auth"]);
    assert!(matches!(
        args.command,
        Some(Command::Users(UsersCommand::Create(ref create))) if create.username == "auth"
    ));

    let args = CliArgs::parse_from([
        "yatube",
        "groups",
        "create",
        "--title",
        "Cats",
        "--database-url",
        "postgres://localhost/yatube",
    ]);
    match args.command {
        Some(Command::Groups(GroupsCommand::Create(create))) => {
            assert_eq!(create.title, "Cats");
            assert!(create.slug.is_none());
            assert_eq!(create.description, "");
            assert_eq!(
                create.database.database_url.as_deref(),
                Some("postgres://localhost/yatube")
            );
        }
        other => panic!("unexpected command {other:?}"),
    }

    let args = CliArgs::parse_from(["yatube", "sessions", "issue", "auth"]);
    assert!(matches!(
        args.command,
        Some(Command::Sessions(SessionsCommand::Issue(ref issue))) if issue.username == "auth"
    ));
}

#[test]
fn database_override_applies_to_management_commands() {
    let args = CliArgs::parse_from([
        "yatube",
        "sessions",
        "issue",
        "auth",
        "--database-url",
        "postgres://db/yatube",
    ]);
    let mut raw = RawSettings::default();
    raw.apply_command(args.command.as_ref());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings.database.url.as_deref(),
        Some("postgres://db/yatube")
    );
}
