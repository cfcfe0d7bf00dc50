//! `field-conquest` entry-point: runs one game operation and prints JSON.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use serde_json::Value;
use tokio::runtime::Builder;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt};

use field_conquest::config::ConquestSettings;
use field_conquest::domain::ports::ConquestStore;
use field_conquest::domain::{ConquestService, Error};
use field_conquest::inbound::cli::{Cli, Command, dispatch};
use field_conquest::outbound::memory::InMemoryConquestStore;
use field_conquest::outbound::redis::{RedisConquestStore, RedisPool};

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let settings = ConquestSettings::load_from_environment()
        .map_err(|err| eyre!("load configuration: {err}"))?;

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(async_main(cli, settings))
}

async fn async_main(cli: Cli, settings: ConquestSettings) -> Result<ExitCode> {
    let outcome = if cli.in_memory {
        run(Arc::new(InMemoryConquestStore::new()), &settings, cli.command).await
    } else {
        let pool = RedisPool::new(settings.pool_config())
            .await
            .wrap_err_with(|| format!("connect to {}", settings.redis_url()))?;
        run(Arc::new(RedisConquestStore::new(pool)), &settings, cli.command).await
    };

    match outcome {
        Ok(value) => {
            emit(&mut io::stdout().lock(), &value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            debug!(code = ?err.code(), error = %err, "operation failed");
            let value = serde_json::to_value(&err).wrap_err("render error")?;
            emit(&mut io::stderr().lock(), &value)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run<S>(
    store: Arc<S>,
    settings: &ConquestSettings,
    command: Command,
) -> Result<Value, Error>
where
    S: ConquestStore + 'static,
{
    let service = ConquestService::with_token_ttl(store, settings.token_ttl());
    dispatch(command, &service, &service).await
}

fn emit(out: &mut impl Write, value: &Value) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).wrap_err("write output")?;
    writeln!(out).wrap_err("write output")?;
    Ok(())
}
