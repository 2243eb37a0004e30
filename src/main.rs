use std::process::ExitCode;

use boardsync_core::{AppError, Config};
use boardsync_services::{BoardState, BoardStore, GitHubClient, StoreGateway, SyncEngine};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = boardsync_core::init() {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "boardsync failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let sync_requested = std::env::args().skip(1).any(|arg| arg == "--sync");
    let (config, _) = Config::load_validated()?;

    let store = BoardStore::open(&config.database.path, &config.board)?;
    let gateway = StoreGateway::new(store);

    let engine = match GitHubClient::from_config(&config.github) {
        Ok(client) => Some(SyncEngine::new(client, gateway.clone())),
        Err(e) => {
            tracing::warn!(error = %e, "GitHub sync disabled");
            None
        }
    };

    let mut board = BoardState::new(gateway, engine);
    board.load().await?;

    if sync_requested {
        if board.has_sync() {
            let report = board.sync_github().await?;
            println!("Synced {} issue(s)", report.processed);
            for name in &report.failed_projects {
                println!("  failed: {name}");
            }
        } else {
            println!("Set [github] token or GITHUB_TOKEN to sync issues");
        }
    }

    // Full board; the project filter would hide tasks without a project.
    for column in board.columns() {
        let marker = if column.is_terminal() { " (done)" } else { "" };
        println!("{}{} - {} task(s)", column.title, marker, column.tasks.len());
        for task in &column.tasks {
            match task.github_issue_number {
                Some(number) => println!("  #{number} {}", task.content),
                None => println!("  {}", task.content),
            }
        }
    }

    Ok(())
}
