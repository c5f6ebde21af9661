//! # Example: basic_emit
//!
//! Minimal example of prioritized synchronous and asynchronous listeners.
//!
//! Demonstrates how to:
//! - Register listeners with [`ListenerSpec::builder`].
//! - Emit an event with a typed payload.
//! - Unregister a listener by its handle.
//!
//! ## Flow
//! ```text
//! emit("user.created")
//!     ├─► audit    (sync, priority 10)  inline
//!     ├─► metrics  (sync, priority 0)   inline
//!     └─► mailer   (async, priority 5)  spawned, awaited after the walk
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=eventvisor=debug cargo run --example basic_emit
//! ```

use std::time::Duration;

use eventvisor::{Dispatcher, DispatcherConfig, Event, ListenerError, ListenerSpec};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct UserCreated {
    id: u64,
    email: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("eventvisor=info".parse()?))
        .init();

    // 1. One dispatcher per process, shared by Arc
    let dispatcher = Dispatcher::builder(DispatcherConfig::default()).build();

    // 2. Register listeners
    dispatcher
        .register(
            ListenerSpec::builder("user.created")
                .with_name("audit")
                .with_priority(10)
                .build(|ev: Event| async move {
                    if let Some(user) = ev.payload::<UserCreated>() {
                        println!("[audit]   seq={} user={}", ev.seq, user.id);
                    }
                    Ok::<(), ListenerError>(())
                }),
        )
        .await?;

    let mailer = dispatcher
        .register(
            ListenerSpec::builder("user.created")
                .with_name("mailer")
                .with_priority(5)
                .async_mode()
                .build(|ev: Event| async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    if let Some(user) = ev.payload::<UserCreated>() {
                        println!("[mailer]  welcome mail sent to {}", user.email);
                    }
                    Ok::<(), ListenerError>(())
                }),
        )
        .await?;

    dispatcher
        .register(
            ListenerSpec::builder("user.created")
                .with_name("metrics")
                .build(|_ev: Event| async move {
                    println!("[metrics] users_created += 1");
                    Ok::<(), ListenerError>(())
                }),
        )
        .await?;

    // 3. Emit
    let ctx = CancellationToken::new();
    let user = UserCreated {
        id: 1,
        email: "ada@example.com".into(),
    };
    dispatcher.emit("user.created", user, &ctx).await?;

    // 4. Unregister the mailer and emit again
    dispatcher.unregister(&mailer).await?;
    let user = UserCreated {
        id: 2,
        email: "grace@example.com".into(),
    };
    dispatcher.emit("user.created", user, &ctx).await?;

    println!(
        "listeners left for user.created: {}",
        dispatcher.listener_count("user.created").await
    );
    Ok(())
}
