//! End-to-end run of the chat client against the in-memory store.

use std::{env, sync::Arc, time::Duration};

use chat_core::{ConnectionState, Identity};
use chat_platform::{InMemoryAuthProvider, InMemoryStore};
use chat_realtime::{ChatClient, ChatClientConfig, SendDisposition};
use tracing::{info, warn};

mod logging;

#[tokio::main]
async fn main() {
    logging::init();

    let config = match ChatClientConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid chat configuration: {err}");
            std::process::exit(1);
        }
    };

    let user_id = env::var("CHAT_SMOKE_USER").unwrap_or_else(|_| "smoke-user".to_owned());
    let display_name = env::var("CHAT_SMOKE_NAME").ok();

    let store = InMemoryStore::new();
    let auth = InMemoryAuthProvider::new();
    let client = Arc::new(ChatClient::new(Arc::new(store.clone()), config));
    client.attach_auth(&auth);

    let mut state_rx = client.subscribe_state();
    let watcher = tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let state = *state_rx.borrow_and_update();
            info!(?state, "observed connection state");
        }
    });

    auth.sign_in(Identity::new(user_id, display_name));
    report(&client, client.send_message("hello from the smoke run"));
    report(&client, client.send_message("   "));

    store.set_connected(false);
    report(&client, client.send_message("sent while offline"));
    store.set_connected(true);
    report(&client, client.send_message("back online"));

    for message in client.messages().iter() {
        println!(
            "[{}] {}: {}",
            message.timestamp_ms, message.author_name, message.content
        );
    }
    println!("state: {:?}", client.connection_state());

    auth.sign_out();
    if client.connection_state() != ConnectionState::Disconnected {
        warn!(state = ?client.connection_state(), "client still attached after sign-out");
    }

    drop(client);
    let _ = tokio::time::timeout(Duration::from_secs(1), watcher).await;
}

fn report(client: &ChatClient, disposition: SendDisposition) {
    match disposition {
        SendDisposition::Submitted => info!(state = ?client.connection_state(), "message submitted"),
        other => warn!(?other, "message not sent"),
    }
}
