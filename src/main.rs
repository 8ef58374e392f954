// SPDX-License-Identifier: MIT
use clap::{CommandFactory, Parser};
use rag_translate::{console, render, ClientConfig, Direction, Outcome, RagService, Session};

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<std::path::PathBuf>,

    /// Backend base URL, overrides config and RAG_BACKEND_URL
    #[arg(short, long, value_name = "URL")]
    backend: Option<String>,

    /// API key forwarded to the backend
    #[arg(short = 'k', long, value_name = "KEY")]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show glossary index status
    Status,
    /// Upload glossary spreadsheet and build the index
    Upload {
        /// Sheet to read, first sheet if omitted
        #[arg(short, long)]
        sheet: Option<String>,
        /// Glossary spreadsheet (.xlsx, .xls)
        input: std::path::PathBuf,
    },
    /// Translate text using the glossary index
    Translate {
        /// Translation direction, en2ar or ar2en
        #[arg(short, long)]
        direction: Option<Direction>,
        /// Text to translate
        text: Vec<String>,
    },
    /// Interactive session
    Interactive,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::io::Result<std::process::ExitCode> {
    env_logger::init();

    // parse commandline
    let cli = Cli::parse();

    // Load client config
    let mut config = if let Some(cfg_file) = cli.config {
        ClientConfig::with_config(&cfg_file)?
    } else {
        ClientConfig::new()?
    };
    if let Some(api_key) = cli.api_key {
        config.set_api_key(api_key);
    }
    let rag = match cli.backend {
        Some(url) => RagService::new(url),
        None => RagService::with_config(&config),
    };
    log::debug!("Backend {}", rag.base_url());
    let session = Session::new(rag);

    let succeeded = match cli.command {
        Some(Commands::Status) => {
            if let Some(status) = session.probe_status().await {
                println!("{}", render::status_line(&status));
                true
            } else {
                println!("Index status unknown");
                false
            }
        }
        Some(Commands::Upload { sheet, input }) => {
            let outcome = session
                .submit_upload(Some(input.as_path()), sheet.as_deref(), config.api_key())
                .await;
            report(&session, outcome.as_ref().map(Outcome::is_success))
        }
        Some(Commands::Translate { direction, text }) => {
            let text = text.join(" ");
            let direction = direction.unwrap_or_else(|| config.direction());
            let outcome = session
                .submit_query(&text, direction, config.api_key())
                .await;
            report(&session, outcome.as_ref().map(Outcome::is_success))
        }
        Some(Commands::Interactive) => {
            let form = console::Form {
                api_key: config.api_key().map(str::to_string),
                direction: config.direction(),
                sheet_name: None,
            };
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            console::run(&session, form, stdin, &mut std::io::stdout()).await?;
            true
        }
        _ => {
            // Print help
            Cli::command().print_help()?;
            true
        }
    };

    Ok(if succeeded {
        std::process::ExitCode::SUCCESS
    } else {
        std::process::ExitCode::FAILURE
    })
}

/// Print settled state, error notice to stderr
fn report(session: &Session, settled: Option<bool>) -> bool {
    let state = session.state();
    match (settled, &state.notice) {
        (Some(false), Some(notice)) => {
            eprintln!("{}", notice);
            false
        }
        (Some(_), _) => {
            println!("{}", render::render(&state));
            true
        }
        // nothing to send
        (None, _) => true,
    }
}
