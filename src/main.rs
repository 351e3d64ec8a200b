//! crudkit - admin CLI for a unified GraphQL CRUD API
//!
//! Reads configuration from the environment (and `.env`), runs one command
//! and prints the result as JSON on stdout. Logs go to stderr.

mod cli;

use anyhow::{Context, Result};
use serde_json::{Value as JsonValue, json};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crudkit::graphql::SelectArgs;
use crudkit::{ClientConfig, Crud, GraphqlClient, QueryArgs, Record};

use crate::cli::{CliOptions, Command, USAGE};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crudkit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let options = CliOptions::from_args()?;
    if options.command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = ClientConfig::from_env()?;
    let client = GraphqlClient::from_config(&config).context("Failed to build GraphQL client")?;
    tracing::debug!(command = ?options.command, "Running command");

    let output = run(&client, options).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(client: &GraphqlClient, options: CliOptions) -> Result<JsonValue> {
    let args = QueryArgs {
        filter: options.filter.clone(),
        order_by: options.order_by.clone(),
        page: options.page,
        limit: options.limit,
        ..Default::default()
    };

    let output = match options.command {
        Command::Models => json!(client.available_models().await?),
        Command::FindMany { model } => {
            let crud = Crud::<Record>::new(client, model.as_str());
            json!(crud.find_many(args).await?)
        }
        Command::Find { model, id } => {
            let crud = Crud::<Record>::new(client, model.as_str());
            let record = crud
                .find_unique(&JsonValue::String(id.clone()), SelectArgs::default())
                .await?;
            record.with_context(|| format!("{} {} not found", model, id))?
        }
        Command::Page { model } => {
            let crud = Crud::<Record>::new(client, model.as_str());
            let args = QueryArgs {
                page: Some(args.page.unwrap_or(1)),
                limit: Some(args.limit.unwrap_or(client.default_page_size())),
                ..args
            };
            json!(crud.find_many_paginated(args).await?)
        }
        Command::Count { model } => {
            let crud = Crud::<Record>::new(client, model.as_str());
            json!({ "count": crud.count(options.filter).await? })
        }
        Command::Delete { model, id } => {
            let crud = Crud::<Record>::new(client, model.as_str());
            crud.delete_one(&JsonValue::String(id), None).await?
        }
        Command::ClearCache => client.clear_server_cache().await?,
        Command::Help => json!(USAGE),
    };
    Ok(output)
}
