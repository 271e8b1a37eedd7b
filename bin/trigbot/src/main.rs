use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{AdviceSink, ChannelSink, MarketEvent};
use paper::PaperSink;
use router::TriggerRouter;
use trigger::TriggerFileConfig;

/// Replay harness: loads a trigger file, feeds JSON-lines market events
/// through the router, and records every advice that fires.
#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let (triggers_path, events_path) = parse_args();

    // ── Triggers ──────────────────────────────────────────────────────────────
    let file = match TriggerFileConfig::load(&triggers_path) {
        Ok(f) => f,
        Err(e) => {
            error!(path = %triggers_path, error = %e, "Failed to load trigger file");
            std::process::exit(2);
        }
    };
    info!(path = %triggers_path, triggers = file.triggers.len(), "TrigBot starting");

    let (channel_sink, mut advice_rx) = ChannelSink::new();
    let sink: Arc<dyn AdviceSink> = Arc::new(channel_sink);

    let router = match TriggerRouter::from_records(&file.triggers, sink.clone()) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Bad trigger configuration");
            std::process::exit(2);
        }
    };
    // the triggers inside the router now hold the only advice senders
    drop(sink);

    // ── Channels & tasks ──────────────────────────────────────────────────────
    let (market_tx, market_rx) = broadcast::channel::<MarketEvent>(1024);
    let router_task = tokio::spawn(router.run(market_rx));

    let ledger = Arc::new(PaperSink::new());
    let ledger_task = {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            while let Some(advice) = advice_rx.recv().await {
                if let Err(e) = ledger.submit(advice) {
                    warn!(error = %e, "Failed to record advice");
                }
            }
        })
    };

    // ── Event feed ────────────────────────────────────────────────────────────
    let reader: Box<dyn AsyncBufRead + Unpin> = match &events_path {
        Some(path) => match tokio::fs::File::open(path).await {
            Ok(f) => Box::new(BufReader::new(f)),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to open events file");
                std::process::exit(2);
            }
        },
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut fed = 0usize;
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<MarketEvent>(line) {
                    Ok(event) => {
                        let _ = market_tx.send(event);
                        fed += 1;
                    }
                    Err(e) => warn!(error = %e, "Skipping malformed event line"),
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "Event feed read error");
                break;
            }
        }
    }

    // Closing the broadcast lets the router drain and exit; dropping the
    // router drops the triggers, which ends the advice channel.
    drop(market_tx);
    let _ = router_task.await;
    let _ = ledger_task.await;

    info!(events = fed, advices = ledger.count(), "Replay complete");
}

fn parse_args() -> (String, Option<String>) {
    let mut triggers = None;
    let mut events = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--triggers" => triggers = args.next(),
            "--events" => events = args.next(),
            _ => usage(),
        }
    }
    match triggers {
        Some(t) => (t, events),
        None => usage(),
    }
}

fn usage() -> ! {
    eprintln!("usage: trigbot --triggers <file> [--events <file>]");
    eprintln!("       events are JSON lines on stdin when --events is not given");
    std::process::exit(2);
}
