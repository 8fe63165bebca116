//! # lokql CLI
//!
//! Ask your Loki logs questions in plain English.
//!
//! Usage:
//!   lokql                       # interactive loop
//!   lokql <question>            # one-shot
//!
//! Examples:
//!   lokql "Show me the last 100 system logs from the last 30 minutes"
//!   lokql "Count errors by application in the last hour"
//!
//! Configuration comes from the environment (and a `.env` file if present);
//! `LOKQL_PROVIDER` selects the LLM backend: ollama, openai, or azure.

use std::io::{BufRead, Write};

use clap::Parser;
use lokql_agent::{Agent, AgentConfig};
use lokql_core::config::Config;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lokql")]
#[command(author, version, about = "Natural-language queries against Grafana Loki")]
struct Cli {
    /// Question to answer (interactive loop when omitted)
    #[arg(trailing_var_arg = true)]
    question: Vec<String>,

    /// Show tool activity while the agent works
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only print the final answer
    #[arg(short, long)]
    quiet: bool,
}

fn print_banner() {
    println!("--- Loki Log Query Agent ---");
    println!("Ask questions about your logs in plain English. Examples:");
    println!("  - 'Show me the last 100 system logs from the last 30 minutes.'");
    println!("  - 'Find all error messages in nginx logs from yesterday.'");
    println!("  - 'Count errors by application in the last hour.'");
    println!("Type 'exit' to quit.");
}

async fn run_loop(agent: &mut Agent, quiet: bool) {
    if !quiet {
        print_banner();
    }

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("\n> ");
        let _ = std::io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            // EOF or a broken pipe both end the session cleanly.
            _ => break,
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        match agent.ask(input).await {
            Ok(answer) => {
                if quiet {
                    println!("{}", answer);
                } else {
                    println!("\n--- Answer ---\n{}\n--------------", answer);
                }
            }
            // Per-turn failures are printed and the loop continues.
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    if !quiet {
        println!("Goodbye!");
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Configuration problems are fatal before the loop starts.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let agent_config = AgentConfig {
        verbose: cli.verbose && !cli.quiet,
        ..AgentConfig::default()
    };
    let mut agent = match Agent::with_config(&config, agent_config) {
        Ok(agent) => agent,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if !cli.question.is_empty() {
        let question = cli.question.join(" ");
        match agent.ask(&question).await {
            Ok(answer) => println!("{}", answer),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    run_loop(&mut agent, cli.quiet).await;
}
