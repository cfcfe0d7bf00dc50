//! Command-line channel adapter.
//!
//! Parses one game operation from the command line, calls the driving ports
//! and renders the outcome as JSON. Binary wiring (runtime, store selection,
//! output streams) stays in `main.rs`.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};

use crate::domain::ports::{ConquestCommand, ConquestQuery};
use crate::domain::{Channel, Error, LoginCredentials, ScoreEntry, SessionToken};

/// `field-conquest` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "field-conquest",
    about = "Claim fields on a shared million-field grid across four channels",
    version
)]
pub struct Cli {
    /// Use a process-local store instead of Redis.
    ///
    /// State lives only for this one invocation, so users and tokens do not
    /// carry over between commands; useful for `ping` and smoke checks.
    #[arg(long)]
    pub in_memory: bool,
    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// One game operation.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Check that the store answers.
    Ping,
    /// Create a user.
    Register { username: String, password: String },
    /// Obtain a session token.
    Login { username: String, password: String },
    /// Claim a field on a channel.
    Conquer {
        token: String,
        #[arg(allow_negative_numbers = true)]
        field_id: i64,
        channel: Channel,
    },
    /// List every field the session's user has claimed on a channel.
    Claims { token: String, channel: Channel },
    /// Show current owners of fields `start..=end` on every channel.
    Map {
        #[arg(allow_negative_numbers = true)]
        start: i64,
        #[arg(allow_negative_numbers = true)]
        end: i64,
    },
    /// Show claim counters for every user.
    Scoreboard {
        /// Order by total claims, highest first.
        #[arg(long)]
        ranked: bool,
    },
    /// List registered users.
    Users { token: String },
}

fn new_account(username: &str, password: &str) -> Result<LoginCredentials, Error> {
    LoginCredentials::try_from_parts(username, password)
        .map_err(|err| Error::invalid_argument(err.to_string()))
}

fn existing_account(username: &str, password: &str) -> Result<LoginCredentials, Error> {
    LoginCredentials::for_existing(username, password)
        .map_err(|_| Error::invalid_credentials("invalid username or password"))
}

fn render<T: Serialize>(value: &T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|err| Error::internal(format!("render output: {err}")))
}

/// Run `command` against the driving ports and return its JSON rendering.
pub async fn dispatch<C, Q>(command: Command, commands: &C, queries: &Q) -> Result<Value, Error>
where
    C: ConquestCommand + ?Sized,
    Q: ConquestQuery + ?Sized,
{
    match command {
        Command::Ping => {
            queries.ping().await?;
            Ok(json!({ "status": "ok" }))
        }
        Command::Register { username, password } => {
            let user = commands.register(&new_account(&username, &password)?).await?;
            render(&user)
        }
        Command::Login { username, password } => {
            let token = commands.login(&existing_account(&username, &password)?).await?;
            Ok(json!({ "token": token.as_str() }))
        }
        Command::Conquer {
            token,
            field_id,
            channel,
        } => {
            commands
                .conquer(&SessionToken::from_presented(token), field_id, channel)
                .await?;
            Ok(json!({ "fieldId": field_id, "channel": channel, "conquered": true }))
        }
        Command::Claims { token, channel } => {
            let fields = queries
                .user_claims(&SessionToken::from_presented(token), channel)
                .await?;
            Ok(json!({ "channel": channel, "fields": render(&fields)? }))
        }
        Command::Map { start, end } => render(&queries.map(start, end).await?),
        Command::Scoreboard { ranked } => {
            let entries = queries.scoreboard().await?;
            let entries = if ranked {
                ScoreEntry::ranked(entries)
            } else {
                entries
            };
            render(&entries)
        }
        Command::Users { token } => {
            render(&queries.user_list(&SessionToken::from_presented(token)).await?)
        }
    }
}
