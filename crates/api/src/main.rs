use meshmart_api::app::{self, ApiConfig};

#[tokio::main]
async fn main() {
    meshmart_observability::init();

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });

    let callback_secret = std::env::var("CALLBACK_SECRET").ok();
    if callback_secret.is_none() {
        tracing::warn!("CALLBACK_SECRET not set; payment callback endpoint is unauthenticated");
    }

    let app = app::build_app(ApiConfig {
        jwt_secret,
        callback_secret,
    })
    .await;

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
