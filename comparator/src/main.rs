use std::io::{self, BufRead, Write};

use clap::Parser;
use learning_rules::CancelToken;
use log::{info, warn};
use tokio::{signal, task};

use comparator::configs::Cli;

/// Asks on the terminal whether an interrupted training should stop.
fn confirm_termination() -> bool {
    print!("terminate? [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim(), "y" | "Y"),
        Err(e) => {
            warn!("could not read the answer: {e}");
            false
        }
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let token = CancelToken::new();

    let listener = token.clone();
    tokio::spawn(async move {
        while signal::ctrl_c().await.is_ok() {
            info!("received SIGINT");
            listener.request();
        }
    });

    task::spawn_blocking(move || comparator::run(&cli, token, confirm_termination))
        .await
        .map_err(|e| io::Error::other(format!("training join error: {e}")))??;

    Ok(())
}
