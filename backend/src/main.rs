//! Backend entry-point: configuration, runtime assembly, HTTP wiring.

use actix_web::{web, App, HttpServer};
use ortho_config::OrthoConfig as _;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use portfolio_backend::inbound::http;
use portfolio_backend::server::{self, AppSettings};
use portfolio_backend::Trace;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().map_err(std::io::Error::other)?;
    let runtime = server::build(&settings).await.map_err(std::io::Error::other)?;

    let state = web::Data::new(runtime.state.clone());
    let bind_addr = runtime.bind_addr.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Trace)
            .service(web::scope("/api/v1").configure(http::configure))
    })
    .bind(bind_addr)?
    .run()
    .await
}
