use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;

use requisitions::database::{create_database_pool, seed_admin};
use requisitions::notify::{LogNotifier, Notifier, WebhookNotifier};
use requisitions::storage::{BlobStore, FsBlobStore};
use requisitions::store::RequisitionStore;
use requisitions::{create_router, AppState};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://requisitions.db".to_string());
    let db = create_database_pool(&database_url)
        .await
        .expect("failed to open database");

    let admin_password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());
    seed_admin(&db, &admin_password)
        .await
        .expect("failed to seed admin user");

    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    let photo_dir = PathBuf::from(env::var("PHOTO_DIR").unwrap_or_else(|_| "photos".to_string()));
    let base_url = env::var("PUBLIC_BASE_URL")
        .unwrap_or_else(|_| format!("http://localhost:{}", port));
    let blobs: Arc<dyn BlobStore> = Arc::new(
        FsBlobStore::new(&photo_dir, &base_url).expect("failed to create photo directory"),
    );

    let email_to = env::var("NOTIFY_EMAIL_TO")
        .unwrap_or_else(|_| "supervisaomontagemipatinga@gmail.com".to_string());
    let notifier: Arc<dyn Notifier> = match env::var("NOTIFY_WEBHOOK_URL") {
        Ok(url) => Arc::new(WebhookNotifier::new(url, email_to)),
        Err(_) => Arc::new(LogNotifier),
    };

    let lock_timeout = env::var("LOCK_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(45);

    let store = RequisitionStore::new(
        db.clone(),
        Duration::from_secs(lock_timeout),
        blobs.clone(),
        notifier,
    );
    let state = AppState { db, store, blobs };

    let app = create_router(state, &photo_dir);

    log::info!("requisitions server starting on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind port");
    axum::serve(listener, app).await.expect("server error");
}
