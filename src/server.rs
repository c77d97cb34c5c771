use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{self, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::any;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::handler::LikeHandler;
use crate::protocol::{Request, Response};

/// HTTP server invoking the like handler
pub struct Server {
  listener: TcpListener,
  local_addr: SocketAddr,
  router: Router,
}

impl Server {
  /// Bind to `addr` and mount `handler` on `route` for every method
  pub async fn bind(addr: &str, route: &str, handler: Arc<LikeHandler>) -> std::io::Result<Self> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("HTTP server bound to {}", local_addr);

    Ok(Self {
      listener,
      local_addr,
      router: build_router(route, handler),
    })
  }

  /// Get local listening address
  pub fn local_addr(&self) -> SocketAddr {
    self.local_addr
  }

  /// Serve until Ctrl-C
  pub async fn run(self) -> std::io::Result<()> {
    self.run_until(shutdown_signal()).await
  }

  /// Serve until `shutdown` resolves, letting in-flight requests finish
  pub async fn run_until<F>(self, shutdown: F) -> std::io::Result<()>
  where
    F: Future<Output = ()> + Send + 'static,
  {
    info!("Server started, listening on {}", self.local_addr);
    axum::serve(self.listener, self.router)
      .with_graceful_shutdown(shutdown)
      .await?;
    info!("Server on {} stopped", self.local_addr);
    Ok(())
  }
}

pub fn build_router(route: &str, handler: Arc<LikeHandler>) -> Router {
  Router::new()
    .route(route, any(invoke))
    .with_state(handler)
}

async fn invoke(State(handler): State<Arc<LikeHandler>>, method: http::Method) -> Response {
  handler.handle(&Request::new(method.as_str())).await
}

impl IntoResponse for Response {
  fn into_response(self) -> axum::response::Response {
    let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
  }
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!("Failed to listen for shutdown signal: {}", e);
    std::future::pending::<()>().await;
  }
  info!("Shutdown signal received");
}
