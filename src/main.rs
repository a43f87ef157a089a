use std::{future::IntoFuture, process, sync::Arc};

use tokio::{signal, sync::Notify};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{
        error::AppError,
        groups::{GroupError, GroupInput, GroupService},
        repos::Repositories,
        sessions::{SessionError, SessionService},
        users::{UserError, UserService},
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState, RouterOptions},
        memory::MemoryRepositories,
        telemetry,
        uploads::UploadStorage,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let chain = error_chain(error);
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?chain, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?chain, "application error");
    });
}

fn error_chain(error: &AppError) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = std::error::Error::source(error);
    while let Some(inner) = current {
        chain.push(inner.to_string());
        current = inner.source();
    }
    chain
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
        config::Command::Users(config::UsersCommand::Create(args)) => {
            run_create_user(settings, args).await
        }
        config::Command::Groups(config::GroupsCommand::Create(args)) => {
            run_create_group(settings, args).await
        }
        config::Command::Groups(config::GroupsCommand::List(_)) => run_list_groups(settings).await,
        config::Command::Sessions(config::SessionsCommand::Issue(args)) => {
            run_issue_session(settings, args).await
        }
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let upload_storage = Arc::new(
        UploadStorage::new(settings.uploads.directory.clone()).map_err(|source| {
            InfraError::MediaRoot {
                path: settings.uploads.directory.clone(),
                source,
            }
        })?,
    );
    let options = RouterOptions::from(&settings);

    let state = match settings.database.url.as_deref() {
        Some(url) => {
            let repositories = connect_postgres(url, &settings).await?;
            HttpState::new(repositories, upload_storage, &options)
        }
        None => {
            warn!(
                target = "yatube::serve",
                "no database url configured; serving from the in-memory store"
            );
            HttpState::new(Arc::new(MemoryRepositories::new()), upload_storage, &options)
        }
    };

    serve_http(&settings, state).await
}

async fn connect_postgres(
    url: &str,
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::Connect)?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::Migrate)?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

/// Management commands only make sense against a persistent store.
async fn management_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let url = settings
        .database
        .url
        .as_deref()
        .ok_or(InfraError::DatabaseRequired)?;
    connect_postgres(url, settings).await
}

async fn run_create_user(
    settings: config::Settings,
    args: config::CreateUserArgs,
) -> Result<(), AppError> {
    let repositories = management_repositories(&settings).await?;
    let users = UserService::new(repositories);

    let user = users
        .register(&args.username)
        .await
        .map_err(|err| match err {
            UserError::Domain(domain) => AppError::from(domain),
            UserError::Repo(repo) => AppError::from(repo),
            other => AppError::validation(other.to_string()),
        })?;

    info!(target = "yatube::cli", user_id = user.id, username = %user.username, "user created");
    println!("{}\t{}", user.id, user.username);
    Ok(())
}

async fn run_create_group(
    settings: config::Settings,
    args: config::CreateGroupArgs,
) -> Result<(), AppError> {
    let repositories = management_repositories(&settings).await?;
    let groups = GroupService::new(repositories);

    let group = groups
        .create(GroupInput {
            title: args.title,
            slug: args.slug,
            description: args.description,
        })
        .await
        .map_err(group_error_to_app)?;

    info!(target = "yatube::cli", group_id = group.id, slug = %group.slug, "group created");
    println!("{}\t{}\t{}", group.id, group.slug, group.title);
    Ok(())
}

async fn run_list_groups(settings: config::Settings) -> Result<(), AppError> {
    let repositories = management_repositories(&settings).await?;
    let groups = GroupService::new(repositories);

    for group in groups.list().await.map_err(group_error_to_app)? {
        println!("{}\t{}\t{}", group.id, group.slug, group.title);
    }
    Ok(())
}

async fn run_issue_session(
    settings: config::Settings,
    args: config::IssueSessionArgs,
) -> Result<(), AppError> {
    let repositories = management_repositories(&settings).await?;
    let session_ttl = settings
        .auth
        .session_ttl
        .and_then(|ttl| time::Duration::try_from(ttl).ok());
    let sessions = session_service(repositories).with_ttl(session_ttl);

    let issued = sessions
        .issue(&args.username)
        .await
        .map_err(|err| match err {
            SessionError::Repo(repo) => AppError::from(repo),
            other => AppError::validation(other.to_string()),
        })?;

    info!(
        target = "yatube::cli",
        session_id = issued.record.id,
        user_id = issued.user.id,
        "session issued"
    );
    println!("{}", issued.token);
    Ok(())
}

fn session_service<R: Repositories>(repositories: Arc<R>) -> SessionService {
    SessionService::new(repositories.clone(), repositories)
}

fn group_error_to_app(err: GroupError) -> AppError {
    match err {
        GroupError::Repo(repo) => AppError::from(repo),
        GroupError::NotFound => AppError::NotFound,
        GroupError::Invalid(errors) => AppError::validation(errors.to_string()),
    }
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let addr = settings.server.addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| InfraError::Bind { addr, source })?;
    info!(target = "yatube::serve", addr = %settings.server.addr, "listening");

    let shutdown = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move { shutdown.notified().await }
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            return result.map_err(|err| AppError::unexpected(format!("server error: {err}")));
        }
        () = shutdown_signal() => shutdown.notify_one(),
    }

    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(_) => {
            warn!(
                target = "yatube::serve",
                grace_seconds = settings.server.graceful_shutdown.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(target = "yatube::serve", error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(target = "yatube::serve", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!(target = "yatube::serve", "received Ctrl+C, shutting down"),
        () = terminate => info!(target = "yatube::serve", "received SIGTERM, shutting down"),
    }
}
