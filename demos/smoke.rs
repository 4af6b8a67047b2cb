//! End-to-end smoke run against a Subspace backend
//!
//! ## Usage
//!
//! ```bash
//! export API_BASE_URL=http://localhost:8080/api/v1
//! export WEBSOCKET_URL=ws://localhost:8080/ws
//! cargo run --example smoke -- user-123
//! ```

use std::sync::Arc;
use std::time::Duration;
use subspace_client::auth::InMemoryCredentialStore;
use subspace_client::observability::{init_logging, LogLevel, LoggingConfig};
use subspace_client::realtime::{FnHandler, RealtimeChannel};
use subspace_client::services::{MessageService, MessageServiceTrait, UserService, UserServiceTrait};
use subspace_client::{ClientConfig, NetworkError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&LoggingConfig::new().with_level(LogLevel::Debug))?;

    let user_id = std::env::args().nth(1).unwrap_or_else(|| "user-123".to_string());

    let config = ClientConfig::from_env()?;
    let credentials = Arc::new(InMemoryCredentialStore::new());
    let client = subspace_client::create_client(config.clone(), credentials)?;

    println!("Subspace Smoke Run");
    println!("==================\n");

    let users = UserService::new(client.clone());
    match users.fetch_user(&user_id).await {
        Ok(user) => println!("User: {} ({})", user.display_name(), user.initials()),
        Err(e) => report(&e),
    }

    match MessageService::new(client).fetch_messages(&user_id).await {
        Ok(messages) => println!("Messages: {}", messages.len()),
        Err(e) => report(&e),
    }

    let handler = FnHandler::new()
        .on_connect(|| println!("Realtime connected"))
        .on_envelope(|envelope| println!("Realtime {}: {:?}", envelope.kind(), envelope.payload()));

    let channel = RealtimeChannel::from_config(&config).with_handler(Arc::new(handler));
    channel.connect(user_id).await;

    tokio::time::sleep(Duration::from_secs(10)).await;
    channel.disconnect().await;

    Ok(())
}

fn report(error: &NetworkError) {
    eprintln!("{} [{}]", error, error.error_code());
    eprintln!("  {}", error.failure_reason());
    eprintln!("  {}", error.recovery_suggestion());
}
