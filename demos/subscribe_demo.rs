//! Minimal live subscribe session.
//!
//! ```sh
//! cargo run --example subscribe_demo -- <origin> <subscribe-key> <channel>
//! ```

use std::sync::Arc;
use std::time::Duration;

use pubsub_rs::{
    ClientConfig, EventListener, MessageEvent, PresenceEvent, Status, SubscribeOperation,
    SubscriptionManager,
};

struct Printer;

impl EventListener for Printer {
    fn status(&self, status: &Status) {
        println!("[status] {:?} (error: {})", status.category, status.error);
    }

    fn message(&self, message: &MessageEvent) {
        println!("[{}] {}", message.channel, message.payload);
    }

    fn presence(&self, event: &PresenceEvent) {
        println!(
            "[presence:{}] {} {:?}",
            event.channel, event.action, event.uuid
        );
    }
}

#[tokio::main]
async fn main() -> pubsub_rs::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pubsub_rs=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let origin = args.next().unwrap_or_else(|| "ps.pndsn.com".into());
    let subscribe_key = args.next().unwrap_or_else(|| "demo".into());
    let channel = args.next().unwrap_or_else(|| "hello_world".into());

    let manager = SubscriptionManager::with_default_transport(
        ClientConfig::new(origin, subscribe_key).with_heartbeat_interval(30),
    )?;
    manager.add_listener(Arc::new(Printer));
    manager.subscribe(SubscribeOperation::channels([channel]).with_presence());

    println!("listening; ctrl-c to quit");
    tokio::signal::ctrl_c()
        .await
        .map_err(pubsub_rs::PubSubError::Io)?;

    manager.unsubscribe_all();
    tokio::time::sleep(Duration::from_millis(200)).await;
    manager.destroy(true);
    Ok(())
}
