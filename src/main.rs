use std::sync::Arc;

use jsonrpc_dispatch::{
    build_app, config::Config, logging, rpc::Dispatcher, services::HelloService, AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;

    let dispatcher = Dispatcher::with_policy(config.duplicate_policy());
    dispatcher.register("HelloService", Arc::new(HelloService))?;

    let bind_socket = config.bind_socket()?;
    let service_count = dispatcher.registry().len();
    let state = AppState::new(
        Arc::new(dispatcher),
        config.rpc_path.clone(),
        config.request_timeout,
    );
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        rpc_path = %config.rpc_path,
        services = service_count,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
