//! imghost - personal image hosting admin.
//!
//! This binary runs the HTTP API, checks provider connectivity, and drives the
//! API from the terminal.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imghost::{
    client::{
        events, AdminClient, DeployPoller, EventSender, GalleryModel, PollOutcome, SessionFile,
        UiEvent, UploadFile, UploadTarget, Uploader,
    },
    config::{AdminAction, AdminConfig, CheckConfig, Cli, Command, ProviderConfig, ServeConfig},
    content::{ContentRoot, GitHubContentStore, ImageLibrary},
    create_router, ClientError, CloudflareCdn, RouterConfig, SessionAuth, TokenPolicy,
};

/// Timeout for every outbound HTTP request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config).await,
        Command::Admin(config) => run_admin(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let providers = &config.providers;

    info!("imghost v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Repository: {}", providers.github_repo);
    info!("  Content root: {}", providers.content_root);
    info!("  Pages project: {}", providers.pages_project);
    info!(
        "  Upload limit: {}MB",
        config.max_upload_bytes / (1024 * 1024)
    );

    match config.token_policy {
        TokenPolicy::AnyBearer => {
            warn!("  Token policy: any-bearer - any nonempty bearer token is accepted");
            warn!("        Restrict to issued tokens: --token-policy issued");
        }
        TokenPolicy::Issued => info!("  Token policy: issued"),
    }

    let http = match build_http_client() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (library, cdn) = build_providers(http, providers);
    let auth = SessionAuth::new(&config.admin_password, config.token_policy);

    let router_config = RouterConfig::new()
        .with_tracing(!config.no_tracing)
        .with_max_upload_bytes(config.max_upload_bytes);
    let router = create_router(library, cdn, auth, router_config);

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/", addr);
    info!(
        "    curl -X POST http://{}/api/login -H 'Content-Type: application/json' -d '{{\"password\":\"...\"}}'",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "imghost=debug,tower_http=debug"
    } else {
        "imghost=info,tower_http=info"
    };
    init_logging_with(env_filter);
}

fn init_logging_with(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()
}

/// Build the content library and CDN provider from the provider settings.
fn build_providers(
    http: reqwest::Client,
    providers: &ProviderConfig,
) -> (ImageLibrary<GitHubContentStore>, CloudflareCdn) {
    let store = GitHubContentStore::new(
        http.clone(),
        &providers.github_api_url,
        &providers.github_repo,
        &providers.github_token,
    );
    let library = ImageLibrary::with_root(store, ContentRoot::new(&providers.content_root));

    let cdn = CloudflareCdn::new(
        http,
        &providers.cf_api_url,
        &providers.cf_api_token,
        &providers.cf_zone_id,
        &providers.cf_account_id,
    )
    .with_project(&providers.pages_project);

    (library, cdn)
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    // Initialize minimal logging for check command
    if config.verbose {
        init_logging(true);
    }

    println!("imghost Configuration Check");
    println!("═════════════════════════════════");
    println!();

    let providers = &config.providers;
    if let Err(e) = providers.validate() {
        println!("✗ Configuration: {}", e);
        return ExitCode::FAILURE;
    }
    println!("✓ Repository: {}", providers.github_repo);
    println!("✓ Content root: {}", providers.content_root);
    println!("✓ Pages project: {}", providers.pages_project);
    println!();

    let http = match build_http_client() {
        Ok(client) => client,
        Err(e) => {
            println!("✗ HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let (library, cdn) = build_providers(http, providers);

    // Test GitHub connectivity
    print!("Testing GitHub contents API... ");
    let folders = match library.list_folders().await {
        Ok(folders) => {
            println!("✓ success ({} folder(s))", folders.len());
            folders
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Please check:");
            println!("  - The token can read and write repository contents");
            println!(
                "  - '{}' exists in {}",
                providers.content_root, providers.github_repo
            );
            return ExitCode::FAILURE;
        }
    };

    // Test Cloudflare connectivity
    print!("Testing Cloudflare Pages project... ");
    if let Err(e) = cdn.check_project().await {
        println!("✗ failed");
        println!();
        println!("Error: {}", e);
        println!();
        println!("Please check:");
        println!("  - The API token has Pages and cache purge permissions");
        println!(
            "  - The project '{}' exists in account {}",
            providers.pages_project, providers.cf_account_id
        );
        return ExitCode::FAILURE;
    }
    println!("✓ found");

    // List folders if requested
    if config.list_folders {
        println!();
        println!("Folders under {}:", providers.content_root);
        println!("─────────────────");
        if folders.is_empty() {
            println!("  (no folders found)");
        } else {
            for folder in &folders {
                println!("  {}", folder);
            }
        }
    }

    println!();
    println!("═════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}

// =============================================================================
// Admin Command
// =============================================================================

async fn run_admin(config: AdminConfig) -> ExitCode {
    init_logging_with("imghost=warn");

    let (tx, mut rx) = events::channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            render_event(&event);
        }
    });

    let result = run_admin_action(config, tx).await;

    // Every sender is gone once the action returns; flush what is left
    let _ = printer.await;

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn render_event(event: &UiEvent) {
    match event {
        UiEvent::DeployControl { .. } | UiEvent::SelectionChanged { .. } => {}
        UiEvent::LoadFailed { .. } => eprintln!("{}", event),
        _ => println!("{}", event),
    }
}

fn notice(events: &EventSender, message: String) {
    let _ = events.send(UiEvent::Notice { message });
}

/// Run one admin action. `Ok(false)` means it ran but did not fully succeed.
async fn run_admin_action(config: AdminConfig, events: EventSender) -> Result<bool, ClientError> {
    let session_file = SessionFile::new(&config.session_file);
    let session = session_file.load().await?;
    let mut client = AdminClient::new(build_http_client()?, &config.api_url, &config.image_domain)?
        .with_session(session);

    match config.action {
        AdminAction::Login { password } => {
            client.login(&password).await?;
            session_file.save(client.session()).await?;
            notice(
                &events,
                format!("Logged in (session saved to {})", session_file.path().display()),
            );
            return Ok(true);
        }
        AdminAction::Logout => {
            client.logout();
            session_file.clear().await?;
            notice(&events, "Logged out".to_string());
            return Ok(true);
        }
        AdminAction::Verify => {
            let valid = client.verify().await;
            notice(
                &events,
                if valid {
                    "Session is valid".to_string()
                } else {
                    "Session is not valid; log in again".to_string()
                },
            );
            return Ok(valid);
        }
        _ => {}
    }

    let needs_domain = matches!(
        config.action,
        AdminAction::Images { .. }
            | AdminAction::Upload { .. }
            | AdminAction::Delete { .. }
            | AdminAction::Purge
    );
    if needs_domain && config.image_domain.trim().is_empty() {
        return Err(ClientError::InvalidInput(
            "Image domain is required. Set --image-domain or IMGHOST_IMAGE_DOMAIN".to_string(),
        ));
    }

    let api = Arc::new(client);
    let mut gallery = GalleryModel::new(Arc::clone(&api), events.clone());

    match config.action {
        AdminAction::Folders => {
            gallery.load_folders().await?;
            Ok(true)
        }
        AdminAction::Images { path, page, search } => {
            gallery.set_location(path, page, search.as_deref().unwrap_or(""));
            gallery.load_images().await?;
            for image in gallery.images() {
                notice(
                    &events,
                    format!("  {:<40} {:>10} bytes  {}", image.name, image.size, image.url),
                );
            }
            let window = gallery.page_window();
            if !window.is_empty() {
                let pages: Vec<String> = window.iter().map(u32::to_string).collect();
                notice(&events, format!("Pages: {}", pages.join(" ")));
            }
            Ok(true)
        }
        AdminAction::Upload {
            files,
            path,
            new_folder,
        } => {
            let mut queued = Vec::with_capacity(files.len());
            for file in &files {
                queued.push(UploadFile::from_path(file).await?);
            }
            let target = match new_folder {
                Some(name) => UploadTarget::NewFolder(name),
                None => UploadTarget::Existing(path),
            };

            let report = Uploader::new(Arc::clone(&api), events.clone())
                .upload(queued, &target)
                .await?;
            for uploaded in &report.uploaded {
                notice(&events, format!("  {}  {}", uploaded.name, uploaded.url));
            }
            for (name, message) in &report.batch.failed {
                notice(&events, format!("  failed {}: {}", name, message));
            }
            Ok(report.batch.is_clean())
        }
        AdminAction::Delete { names, path } => {
            gallery.set_location(path, 1, "");
            let report = gallery.delete_files(&names).await;
            for (target, message) in &report.failed {
                notice(&events, format!("  failed {}: {}", target, message));
            }
            Ok(report.is_clean())
        }
        AdminAction::Purge => {
            gallery.purge_cache().await?;
            Ok(true)
        }
        AdminAction::Deploy => {
            let poller = DeployPoller::new(Arc::clone(&api), events.clone());
            let Some(mut handle) = poller.start().await? else {
                return Ok(false);
            };

            let joined = tokio::select! {
                joined = &mut handle => joined,
                _ = tokio::signal::ctrl_c() => {
                    poller.cancel().await;
                    handle.await
                }
            };
            let outcome = joined.map_err(|e| {
                ClientError::InvalidInput(format!("Deployment monitor stopped: {}", e))
            })?;
            Ok(matches!(outcome, PollOutcome::Completed { .. }))
        }
        AdminAction::Login { .. } | AdminAction::Logout | AdminAction::Verify => Ok(true),
    }
}
