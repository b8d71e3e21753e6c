use std::env;
use std::fs::File;
use std::io;
use std::process::ExitCode;

use tokio_stream::wrappers::ReceiverStream;
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use warikan::csv::{read_actions, write_balances, write_settlements};
use warikan::snapshot::{self, DebouncedSaver};
use warikan::{Settings, Warikan, WarikanState};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: warikan <actions.csv> [--balances]");
        return ExitCode::FAILURE;
    };
    let show_balances = args.any(|arg| arg == "--balances");

    if !path.ends_with(".csv") {
        warn!(path, "input file seems to not be a csv file");
    }

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!(reason = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) => {
            error!(path, reason = %e, "failed to open input");
            return ExitCode::FAILURE;
        }
    };

    let state = match &settings.storage_path {
        Some(storage) => snapshot::load(storage, &settings.limits),
        None => WarikanState::default(),
    };
    let saver = settings
        .storage_path
        .clone()
        .map(|storage| DebouncedSaver::spawn(storage, settings.persist_debounce()));

    let mut engine = Warikan::from_state(state, settings.limits.clone())
        .with_cache_capacity(settings.cache_capacity);
    if let Some(saver) = &saver {
        engine = engine.with_saver(saver.handle());
    }

    let (action_sender, action_receiver) = tokio::sync::mpsc::channel(16);

    tokio::spawn(async move {
        for result in read_actions(file) {
            match result {
                Ok(action) => {
                    if action_sender.send(action).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    engine.run(ReceiverStream::new(action_receiver)).await;

    if let Some(saver) = saver {
        saver.shutdown().await;
    }

    if let Err(e) = engine.check_setup() {
        warn!(reason = %e, "event setup is incomplete");
    }
    for balance in engine.balances() {
        info!(
            member = %balance.member_name,
            balance = %balance.balance,
            status = %balance.status,
            "balance"
        );
    }

    let written = if show_balances {
        write_balances(io::stdout().lock(), &engine.balances())
    } else {
        write_settlements(io::stdout().lock(), &engine.settlements())
    };
    if let Err(e) = written {
        error!(reason = %e, "failed to write output");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
