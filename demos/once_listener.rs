//! # Example: once_listener
//!
//! A once-listener fires on the first successful emit and is then removed,
//! while a regular listener keeps firing.
//!
//! ## Run
//! ```bash
//! cargo run --example once_listener
//! ```

use eventvisor::{Dispatcher, DispatcherConfig, Event, ListenerError, ListenerSpec};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("eventvisor=info".parse()?))
        .init();

    let dispatcher = Dispatcher::builder(DispatcherConfig::default()).build();

    let warmup = dispatcher
        .register(
            ListenerSpec::builder("app.ready")
                .with_name("warmup")
                .with_priority(100)
                .once()
                .build(|_ev: Event| async move {
                    println!("[warmup] priming caches (runs once)");
                    Ok::<(), ListenerError>(())
                }),
        )
        .await?;

    dispatcher
        .register(
            ListenerSpec::builder("app.ready")
                .with_name("heartbeat")
                .build(|ev: Event| async move {
                    println!("[heartbeat] seq={}", ev.seq);
                    Ok::<(), ListenerError>(())
                }),
        )
        .await?;

    let ctx = CancellationToken::new();
    for _ in 0..3 {
        dispatcher.emit("app.ready", (), &ctx).await?;
    }

    // Already removed after its first run.
    if let Err(e) = dispatcher.unregister(&warmup).await {
        println!("unregister warmup: {e}");
    }
    println!("events with listeners: {:?}", dispatcher.event_names().await);
    Ok(())
}
