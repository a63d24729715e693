//! Demo: a scripted engine on the loopback transport.
//!
//! Plays both sides of the bridge conversation: the front end drives
//! the facade while a spawned task acts as the engine, answering
//! invocations and streaming task events.
//!
//! ```sh
//! cargo run --example loopback_engine
//! ```

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tether_bridge::testing::LoopbackTransport;
use tether_bridge::{BridgeConfig, ControlId, EngineBridge, InvokeArgs, TaskObserver, Transport};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let transport = Arc::new(LoopbackTransport::new());
    let bridge = Arc::new(EngineBridge::new(
        ControlId::named("confetti"),
        Arc::clone(&transport) as Arc<dyn Transport>,
        BridgeConfig::default(),
    ));

    // The scripted engine: answer the first correlated invocation,
    // then stream the task it is asked to start.
    let engine = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        let transport = Arc::clone(&transport);
        async move {
            loop {
                let sent = transport.sent_invocations();
                if let Some(call) = sent.iter().find(|c| c.name == "play") {
                    let token = call.token.unwrap();
                    let reply = serde_json::to_vec(&json!({
                        "token": token.uuid().to_string(),
                        "ok": true,
                        "result": {"playing": true},
                    }))
                    .unwrap();
                    bridge.on_engine_message("method_result", &reply).unwrap();
                    break;
                }
                tokio::task::yield_now().await;
            }

            loop {
                let sent = transport.sent_invocations();
                if let Some(call) = sent.iter().find(|c| c.name == "start_task") {
                    let token = call.args["token"].clone();
                    let total: u64 = call.args["total_steps"].parse().unwrap();
                    for step in 1..=total {
                        let event = serde_json::to_vec(&json!({
                            "token": token,
                            "status": "progress",
                            "step": step,
                            "total_steps": total,
                        }))
                        .unwrap();
                        bridge.on_engine_message("task_update", &event).unwrap();
                    }
                    let done = serde_json::to_vec(&json!({
                        "token": token,
                        "status": "complete",
                        "emitted": total * 40,
                    }))
                    .unwrap();
                    bridge.on_engine_message("task_update", &done).unwrap();
                    break;
                }
                tokio::task::yield_now().await;
            }
        }
    });

    // Waited invocation with a deadline
    let result = bridge
        .invoke("play", InvokeArgs::new(), true, Some(Duration::from_secs(1)))
        .await?;
    println!("play replied: {result}");

    // Shared value: local write, then an engine overwrite
    bridge.write_shared(Some("A".to_string()))?;
    bridge.on_engine_message("changed", br#"{"value": "B"}"#)?;
    println!("shared value after engine change: {:?}", bridge.read_shared());

    // Task stream
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    bridge.start_task(
        3,
        TaskObserver::new()
            .on_progress(|event| {
                println!(
                    "task progress {}/{}",
                    event.step.unwrap_or(0),
                    event.total_steps.unwrap_or(0)
                );
            })
            .on_complete(move |payload| {
                println!("task complete: {payload}");
                let _ = done_tx.send(());
            }),
    )?;
    done_rx.await?;

    engine.await?;
    Ok(())
}
