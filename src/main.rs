// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use tutka_scanner::api::{create_router, ApiState};
use tutka_scanner::config::AppConfig;
use tutka_scanner::coordinator::DeepScanCoordinator;
use tutka_scanner::http_client::HttpClient;
use tutka_scanner::store::PostgresRequestStore;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    print!("\x1b[96m");
    println!("   __         __  __");
    println!("  / /___  __ / /_/ /______ _");
    println!(" / __/ / / // __/ //_/ __ `/");
    println!("/ /_/ /_/ // /_/ ,< / /_/ /");
    println!("\\__/\\__,_/ \\__/_/|_|\\__,_/");
    print!("\x1b[0m");
    println!();
    print!("\x1b[1m");
    println!("   Attack Surface Reconnaissance Engine");
    print!("\x1b[0m");
    println!();

    info!("Tutka Reconnaissance Engine v{} - Starting", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("tutka-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())?;

    Ok(())
}

async fn async_main() -> Result<()> {
    let config = AppConfig::from_env()?;

    if !config.database.enabled {
        anyhow::bail!("DATABASE_URL must be set; scan requests live in PostgreSQL");
    }

    let store = Arc::new(PostgresRequestStore::new(&config.database).await?);
    store.init_schema().await?;

    let http = Arc::new(HttpClient::new(config.scanner.http_timeout_secs)?);

    let coordinator = Arc::new(DeepScanCoordinator::new(
        store,
        http.clone(),
        &config.collaborators,
        &config.scanner,
        config.weights,
    ));
    info!("[SUCCESS] Deep scan coordinator initialized");

    let state = Arc::new(ApiState {
        coordinator,
        http,
        service_token: config.collaborators.service_token.clone(),
        session_service_url: config.collaborators.session_service_url.clone(),
    });

    let router = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("[SUCCESS] Trigger API listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
