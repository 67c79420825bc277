//! Render server
//!
//! Serves PNG renders of native scenes at `GET /api/v1/render?sceneId=<n>`.
//! Renderers are released after the HTTP server has drained in-flight
//! requests.

mod config;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use clap::{value_parser, Arg, Command};
use frame_bridge::{Config, RenderConfig, RenderEndpoint};

use config::ServerConfig;

#[cfg(not(feature = "native-ffi"))]
type Engine = frame_bridge::native::SoftwareEngine;

#[cfg(feature = "native-ffi")]
type Engine = frame_bridge::native::FfiEngine;

#[cfg(not(feature = "native-ffi"))]
fn build_engine(_render: &RenderConfig) -> Engine {
    log::info!("Using in-process software engine");
    Engine::default()
}

#[cfg(feature = "native-ffi")]
fn build_engine(render: &RenderConfig) -> Engine {
    log::info!("Using native rendering library");
    match render.transfer {
        frame_bridge::TransferStrategy::PreferBulk => Engine::new().with_bulk_access(),
        frame_bridge::TransferStrategy::PerChannel => Engine::new(),
    }
}

fn load_config() -> Result<ServerConfig> {
    let matches = Command::new("render_server")
        .about("Serves PNG renders of native scenes over HTTP")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .help("Port to listen on (overrides LISTENING_PORT)"),
        )
        .get_matches();

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ServerConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    config.apply_env().context("Invalid environment")?;
    if let Some(port) = matches.get_one::<u16>("port") {
        config.listening_port = *port;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[actix_web::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    frame_bridge::logging::init_with_default_filter(&config.log_filter);

    let engine = Arc::new(build_engine(&config.render));
    let endpoint = web::Data::new(RenderEndpoint::new(engine, &config.render));

    log::info!(
        "Listening on {}:{}",
        config.bind_address,
        config.listening_port
    );

    let app_data = endpoint.clone();
    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(app_data.clone())
            .configure(routes::configure::<Engine>)
    });
    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }

    server
        .bind((config.bind_address.as_str(), config.listening_port))
        .with_context(|| {
            format!(
                "Failed to bind {}:{}",
                config.bind_address, config.listening_port
            )
        })?
        .run()
        .await
        .context("HTTP server failed")?;

    let released = endpoint.shutdown();
    log::info!("Server stopped, released {} renderer(s)", released);
    Ok(())
}
