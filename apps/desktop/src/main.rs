use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{markup, view::ActivityCard, ApiError, DirectoryClient, HttpActivitiesApi};

#[derive(Parser, Debug)]
#[command(about = "Command-line client for the activity sign-up service")]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the activity directory.
    List {
        /// Print the rendered HTML fragment instead of plain text.
        #[arg(long)]
        html: bool,
        /// Print the raw directory JSON instead of plain text.
        #[arg(long, conflicts_with = "html")]
        json: bool,
    },
    /// Register an email for an activity.
    Signup {
        #[arg(long)]
        activity: String,
        #[arg(long)]
        email: String,
    },
    /// Remove an email from an activity's roster.
    Unregister {
        #[arg(long)]
        activity: String,
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let api = HttpActivitiesApi::new(&args.server_url)?;
    let client = DirectoryClient::new(Arc::new(api));

    match args.command {
        Command::List { html, json } => {
            client.reload_directory().await?;
            let directory = client.directory().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&directory)?);
                return Ok(());
            }
            let cards = ActivityCard::from_directory(&directory);
            if html {
                println!("{}", markup::render_activity_cards(&cards)?);
                return Ok(());
            }
            for card in &cards {
                println!("{} ({} spots left)", card.name, card.spots_left);
                println!("  {}", card.description);
                println!("  Schedule: {}", card.schedule);
                if card.participants.is_empty() {
                    println!("  No participants yet");
                } else {
                    for email in &card.participants {
                        println!("  - {email}");
                    }
                }
            }
        }
        Command::Signup { activity, email } => match client.sign_up(&activity, &email).await {
            Ok(message) => println!("{message}"),
            Err(ApiError::Rejected {
                detail: Some(detail),
                ..
            }) => bail!(detail),
            Err(err) => return Err(err.into()),
        },
        Command::Unregister { activity, email } => {
            match client.unregister(&activity, &email).await {
                Ok(message) => println!("{message}"),
                Err(ApiError::Rejected {
                    detail: Some(detail),
                    ..
                }) => bail!(detail),
                Err(err) => return Err(err.into()),
            }
        }
    }

    Ok(())
}
