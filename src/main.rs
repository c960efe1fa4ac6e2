use anyhow::Result;
use clap::Parser;
use rover_console::{
    BackendClient, CaptureSource, CaptureSourceFactory, Config, ConnectionStatus, Role,
    VoiceConsole, QUICK_COMMANDS,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// Conversational console for a remotely controlled vehicle.
#[derive(Debug, Parser)]
#[command(name = "rover-console", version)]
struct Args {
    /// Configuration file (TOML), loaded if present.
    #[arg(long, default_value = "config/rover-console")]
    config: String,

    /// Override the backend base URL from the configuration.
    #[arg(long)]
    backend_url: Option<String>,

    /// Replay a generated tone instead of opening the microphone.
    #[arg(long)]
    scripted: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(url) = args.backend_url {
        cfg.backend.base_url = url;
    }

    let client = Arc::new(BackendClient::new(
        &cfg.backend.base_url,
        cfg.backend.request_timeout(),
    )?);

    let source = if args.scripted {
        CaptureSourceFactory::create(
            CaptureSource::Scripted(demo_script(&cfg)),
            cfg.capture_config(),
        )
    } else {
        CaptureSourceFactory::create(CaptureSource::Microphone, cfg.capture_config())
    };

    let console = Arc::new(VoiceConsole::new(client, source, cfg.scheduler_config()));

    if let Err(e) = console.connect().await {
        warn!("backend session unavailable, running degraded: {e}");
    }
    print_tail(&console, 1).await;

    // Echo interim drafts as they arrive.
    let mut draft_rx = console.draft();
    tokio::spawn(async move {
        while draft_rx.changed().await.is_ok() {
            let draft = draft_rx.borrow_and_update().clone();
            if let Some(text) = draft {
                println!("  … {text}");
            }
        }
    });

    println!("type a command, or :record / :stop / :quick / :reset / :quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "" => {}
                    ":quit" | ":q" => break,
                    ":record" => match console.start_voice().await {
                        Ok(()) => println!("listening… (:stop to send)"),
                        Err(e) => println!("cannot record: {e}"),
                    },
                    ":stop" => match console.stop_voice().await {
                        Ok(Some(_)) => print_tail(&console, 2).await,
                        Ok(None) => println!("(nothing captured)"),
                        Err(e) => println!("transcription failed: {e}"),
                    },
                    ":reset" => {
                        console.reset().await;
                        println!("(chat cleared)");
                    }
                    ":quick" => {
                        for command in QUICK_COMMANDS {
                            println!("  {command}");
                        }
                    }
                    text => {
                        console.send(text).await;
                        print_tail(&console, 2).await;
                    }
                }
            }
        }
    }

    // Both :quit and ctrl-c land here; the session end is idempotent.
    console.shutdown().await;
    Ok(())
}

async fn print_tail(console: &VoiceConsole, count: usize) {
    let messages = console.messages().await;
    for message in messages.iter().rev().take(count).rev() {
        let speaker = match message.role {
            Role::User => "you",
            Role::Bot => "car",
        };
        let marker = if message.is_error { " !" } else { "" };
        println!(
            "[{}] {speaker}{marker}: {}",
            message.timestamp.format("%H:%M:%S"),
            message.text
        );
    }
    if console.connection() == ConnectionStatus::Disconnected {
        println!("(vehicle link down)");
    }
}

/// A short square-wave take for the --scripted source.
fn demo_script(cfg: &Config) -> Vec<Vec<i16>> {
    let chunk_samples = cfg.capture_config().samples_per_chunk();
    (0..20)
        .map(|i| {
            let level = if i % 2 == 0 { 4000i16 } else { -4000i16 };
            vec![level; chunk_samples]
        })
        .collect()
}
