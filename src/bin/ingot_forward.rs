//! ingot-forward: Replay queue messages into a JSON Lines store
//!
//! Store names and body handling come from the same environment variables
//! the forwarders read in production (a `.env` file is honored).
//!
//! Usage:
//!   # Replay a Lambda SQS event into ./out/SqsMessages.jsonl
//!   ingot-forward sqs event.json --output-dir ./out
//!
//!   # Replay Service Bus messages (JSON array or one message per line)
//!   CosmosDbConnectionString=local ingot-forward service-bus messages.jsonl -o ./out

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use ingot::config::{ServiceBusConfig, SqsConfig, COSMOS_CONNECTION_VAR};
use ingot::forward::{
    JsonlStore, MessageActions, ServiceBusForwarder, ServiceBusMessage, SettlementError, SqsEvent,
    SqsForwarder,
};
use serde_json::Value;
use std::fs::File;
use std::io::{stdin, BufReader, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ingot-forward")]
#[command(about = "Replay queue messages into a JSON Lines store", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory receiving one .jsonl file per table or container
    #[arg(long, short = 'o', global = true, default_value = ".")]
    output_dir: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Forward the records of a Lambda SQS event
    Sqs {
        /// Event file (use stdin if omitted)
        #[arg(value_name = "FILE")]
        input: Option<String>,

        /// Override DYNAMODB_TABLE_NAME
        #[arg(long)]
        table: Option<String>,
    },

    /// Forward Service Bus messages
    ServiceBus {
        /// Messages file (use stdin if omitted)
        #[arg(value_name = "FILE")]
        input: Option<String>,

        /// Override CosmosDbContainerName
        #[arg(long)]
        container: Option<String>,
    },
}

/// Counts settlements instead of talking to a broker
#[derive(Default)]
struct ReplayActions {
    completed: AtomicUsize,
    abandoned: AtomicUsize,
}

#[async_trait]
impl MessageActions for ReplayActions {
    async fn complete(&self, message: &ServiceBusMessage) -> Result<(), SettlementError> {
        info!(message_id = %message.message_id, "completed");
        self.completed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn abandon(&self, message: &ServiceBusMessage) -> Result<(), SettlementError> {
        info!(message_id = %message.message_id, "abandoned");
        self.abandoned.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    ingot::bootstrap::init_tracing();
    ingot::bootstrap::load_dotenv();
    let args = Args::parse();

    let store = JsonlStore::new(&args.output_dir).context("Failed to create output directory")?;
    let store = Arc::new(store);

    let failed = match args.command {
        Command::Sqs { input, table } => {
            let mut config = SqsConfig::from_env()?;
            if let Some(table) = table {
                config.table_name = table;
            }

            let event: SqsEvent = serde_json::from_slice(&read_input(input.as_deref())?)
                .context("Failed to parse SQS event")?;

            let forwarder = SqsForwarder::new(store.clone(), config);
            let response = forwarder.handle_event(&event).await;
            println!("{}", serde_json::to_string(&response)?);
            response.batch_item_failures.len()
        }
        Command::ServiceBus { input, container } => {
            let mut config = ServiceBusConfig::from_env()
                .with_context(|| {
                    format!("{} must be set (any value works for a replay)", COSMOS_CONNECTION_VAR)
                })?;
            if let Some(container) = container {
                config.container_name = container;
            }

            let messages = parse_service_bus_messages(&read_input(input.as_deref())?)?;

            let forwarder = ServiceBusForwarder::new(store.clone(), config);
            let actions = ReplayActions::default();
            for message in &messages {
                forwarder.handle(message, &actions).await?;
            }

            info!(
                completed = actions.completed.load(Ordering::Relaxed),
                abandoned = actions.abandoned.load(Ordering::Relaxed),
                "replay finished"
            );
            actions.abandoned.load(Ordering::Relaxed)
        }
    };

    store.flush()?;

    if failed > 0 {
        bail!("{} message(s) failed to forward", failed);
    }
    Ok(())
}

fn read_input(path: Option<&str>) -> Result<Vec<u8>> {
    let mut reader: Box<dyn Read> = match path {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path))?,
        )),
        None => Box::new(stdin()),
    };

    let mut content = Vec::new();
    reader.read_to_end(&mut content).context("Failed to read input")?;
    Ok(content)
}

/// Accepts a JSON array of messages or a stream of message objects
fn parse_service_bus_messages(content: &[u8]) -> Result<Vec<ServiceBusMessage>> {
    let stream = serde_json::Deserializer::from_slice(content).into_iter::<Value>();

    let mut messages = Vec::new();
    for value in stream {
        match value.context("Failed to parse Service Bus messages")? {
            Value::Array(items) => {
                for item in items {
                    messages.push(serde_json::from_value(item)?);
                }
            }
            item => messages.push(serde_json::from_value(item)?),
        }
    }
    Ok(messages)
}
