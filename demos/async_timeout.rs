//! # Example: async_timeout
//!
//! Shows how the dispatcher bounds async listeners.
//!
//! - `slow` sleeps far longer than the configured timeout: the emit reports
//!   `DispatchError::Timeout` after ~200ms and the listener sees its token cancelled.
//! - `fast` completes normally and is not affected by its sibling's timeout.
//! - A second emit is cancelled by the caller.
//!
//! ## Run
//! ```bash
//! cargo run --example async_timeout
//! ```

use std::time::{Duration, Instant};

use eventvisor::{DispatchError, Dispatcher, DispatcherConfig, Event, ListenerError, ListenerSpec};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("eventvisor=info".parse()?))
        .init();

    let dispatcher = Dispatcher::builder(DispatcherConfig::default())
        .with_async_timeout(Duration::from_millis(200))
        .build();

    dispatcher
        .register(
            ListenerSpec::builder("report.requested")
                .with_name("slow")
                .with_priority(5)
                .async_mode()
                .build(|ev: Event| async move {
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(10)) => println!("[slow] finished"),
                        _ = ev.cancellation().cancelled() => println!("[slow] abandoned, stopping"),
                    }
                    Ok::<(), ListenerError>(())
                }),
        )
        .await?;

    dispatcher
        .register(
            ListenerSpec::builder("report.requested")
                .with_name("fast")
                .async_mode()
                .build(|_ev: Event| async move {
                    println!("[fast] done");
                    Ok::<(), ListenerError>(())
                }),
        )
        .await?;

    let started = Instant::now();
    match dispatcher
        .emit("report.requested", (), &CancellationToken::new())
        .await
    {
        Err(DispatchError::Timeout { event, timeout }) => {
            println!("timeout on {event} after {timeout:?} (elapsed {:?})", started.elapsed());
        }
        other => println!("unexpected: {other:?}"),
    }

    let ctx = CancellationToken::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });
    if let Err(e) = dispatcher.emit("report.requested", (), &ctx).await {
        println!("second emit: {} ({})", e, e.as_label());
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
