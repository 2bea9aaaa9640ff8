//! `hirewatch-client` -- terminal front end for the Hirewatch control server.
//!
//! Streams the server's log lines, tracks the connection with automatic
//! reconnection, and lets the user start and stop monitoring.
//!
//! # Environment variables
//!
//! | Variable                    | Default                 | Description                     |
//! |-----------------------------|-------------------------|---------------------------------|
//! | `HIREWATCH_SERVER_URL`      | `http://localhost:3000` | Control server base URL         |
//! | `STATUS_POLL_INTERVAL_SECS` | `5`                     | Seconds between status polls    |
//! | `HIRING_SITE_PREFIX`        | `https://hiring.amazon` | Required prefix for job links   |

use hirewatch_client::config::ClientConfig;
use hirewatch_client::session::{self, SessionCommand, SessionUpdate};
use hirewatch_client::ui::{self, Form, UiCommand};
use hirewatch_core::log_entry::{LogEntry, SessionLog};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hirewatch_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid client configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(server = %config.server_url, "Starting hirewatch-client");

    let prefix = config.hiring_site_prefix.clone();
    let mut session = session::spawn(config);
    let mut form = Form::default();
    let mut log = SessionLog::new();

    println!("{}", ui::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read stdin");
                        break;
                    }
                };
                let command = match ui::parse_command(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                if command == UiCommand::Quit {
                    break;
                }
                if let Some(command) = dispatch(command, &mut form, &mut log, &prefix) {
                    if !session.send(command) {
                        tracing::error!("Session ended unexpectedly");
                        break;
                    }
                }
            }
            update = session.next_update() => match update {
                Some(SessionUpdate::Log(entry)) => {
                    print_entry(&entry);
                    log.push(entry);
                }
                Some(SessionUpdate::Status(status)) => println!("-- {} --", status.status_line()),
                None => break,
            },
        }
    }

    session.shutdown().await;
}

/// Handle local commands; returns the command for the session, if any.
fn dispatch(
    command: UiCommand,
    form: &mut Form,
    log: &mut SessionLog,
    prefix: &str,
) -> Option<SessionCommand> {
    match command {
        UiCommand::AddLink(link) => {
            form.add_link(link);
            None
        }
        UiCommand::AddPosition(position) => {
            form.add_position(position);
            None
        }
        UiCommand::ShowFields => {
            print!("{}", form.describe());
            None
        }
        UiCommand::Reset => {
            form.reset();
            None
        }
        UiCommand::Start => {
            let validation = form.validate(prefix);
            if validation.is_valid() {
                Some(SessionCommand::Start {
                    links: form.links.clone(),
                    positions: form.positions.clone(),
                })
            } else {
                for line in ui::format_violations(&validation) {
                    println!("{line}");
                }
                None
            }
        }
        UiCommand::Stop => Some(SessionCommand::Stop),
        UiCommand::Status => Some(SessionCommand::RefreshStatus),
        UiCommand::Reconnect => Some(SessionCommand::Reconnect),
        UiCommand::ShowLog => {
            log.entries().iter().for_each(print_entry);
            None
        }
        UiCommand::Clear => {
            log.clear();
            None
        }
        UiCommand::Help => {
            println!("{}", ui::HELP);
            None
        }
        UiCommand::Quit => None,
    }
}

fn print_entry(entry: &LogEntry) {
    println!("[{}] {}", entry.timestamp, entry.message);
}
