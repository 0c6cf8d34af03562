use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};

use walletlab::catalog;
use walletlab::config;
use walletlab::core::{EditorSession, ExecutionOutcome, FinalityState, OperationKind, Signer};
use walletlab::domain::chain::Chain;
use walletlab::domain::coerce;
use walletlab::logging;

const SNAPSHOT_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Parser)]
#[command(
    name = "walletlab",
    version,
    about = "walletlab: import, edit and submit wallet request templates on Flow, EVM, Solana and Aptos"
)]
struct Args {
    /// Chain to work with (flow, evm, solana, aptos). Defaults to the config's default chain
    #[arg(long, global = true)]
    chain: Option<Chain>,

    /// Override the chain's endpoint (JSON-RPC, Flow access API or Aptos node URL)
    #[arg(long, global = true)]
    rpc: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the built-in templates of a chain
    Templates,

    /// Coerce one raw value into its chain-native form
    Coerce {
        /// Type name in the chain's vocabulary, e.g. UFix64 or vector<u8>
        #[arg(long)]
        kind: String,

        #[arg(long)]
        value: String,
    },

    /// Import a template, apply edits, submit it and wait for the result
    Run {
        /// `<group>/<name>` or a bare template name
        #[arg(long)]
        template: Option<String>,

        /// Start from an empty editor of this kind instead of a template
        #[arg(long, value_parser = parse_kind)]
        kind: Option<OperationKind>,

        /// Argument value, `name=value` or `<index>=value`
        #[arg(long = "arg", value_parser = parse_pair)]
        args: Vec<(String, String)>,

        /// Auxiliary info value, `key=value`
        #[arg(long = "info", value_parser = parse_pair)]
        info: Vec<(String, String)>,

        /// Extra transaction signer, `address:private_key`
        #[arg(long = "signer", value_parser = parse_signer)]
        signers: Vec<Signer>,

        /// Replace the script or transaction body with this file's content
        #[arg(long)]
        body: Option<std::path::PathBuf>,

        /// Request a signature for the transaction
        #[arg(long)]
        sign: bool,

        /// Print the submit result without waiting for the transaction to seal
        #[arg(long)]
        no_wait: bool,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

fn parse_signer(raw: &str) -> Result<Signer, String> {
    raw.split_once(':')
        .map(|(address, key)| Signer {
            address: address.trim().to_string(),
            private_key: key.trim().to_string(),
        })
        .ok_or_else(|| format!("expected address:private_key, got '{raw}'"))
}

fn parse_kind(raw: &str) -> Result<OperationKind, String> {
    let wanted = raw.trim().replace('-', "_").to_lowercase();
    OperationKind::ALL
        .into_iter()
        .find(|kind| {
            serde_json::to_value(kind)
                .ok()
                .and_then(|v| v.as_str().map(|s| s == wanted))
                .unwrap_or(false)
        })
        .ok_or_else(|| format!("unknown operation kind '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;
    let args = Args::parse();

    let mut config = config::load();
    let chain = args.chain.unwrap_or_else(|| config.default_chain());
    if let Some(rpc) = &args.rpc {
        config.set_endpoint(chain, rpc.clone());
    }
    debug!(%chain, endpoint = config.endpoint(chain), "Resolved chain");

    match args.command {
        Command::Templates => list_templates(chain, &config),
        Command::Coerce { kind, value } => {
            let native = coerce::coerce(chain.coercer(), &kind, &value)?;
            println!("{}", serde_json::to_string_pretty(&native.to_json())?);
            Ok(())
        }
        Command::Run {
            template,
            kind,
            args,
            info,
            signers,
            body,
            sign,
            no_wait,
        } => {
            let connection = catalog::connect(chain, &config)?;
            let mut session = EditorSession::new(connection.context, connection.catalog);

            if let Some(kind) = kind {
                if !session.select_kind(kind) {
                    bail!("{} is not available on {}", kind, chain);
                }
            }
            if let Some(path) = template.as_deref() {
                if !session.import(path) {
                    bail!("no template '{}' on {}", path, chain);
                }
            }
            for (name, value) in args {
                apply_argument(&mut session, &name, value)?;
            }
            for (key, value) in info {
                if !session.auxiliary_mut().set_any(&key, value) {
                    bail!("the template has no info entry '{}'", key);
                }
            }
            if let Some(path) = body {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                session.set_body(text);
            }
            let mut all_signers = config.signers();
            all_signers.extend(signers);
            session.set_signers(all_signers);
            if sign {
                session.set_should_sign(true);
            }

            run(&mut session, !no_wait).await
        }
    }
}

fn list_templates(chain: Chain, config: &config::Config) -> Result<()> {
    let connection = catalog::connect(chain, config)?;
    let catalog = connection.catalog;
    for group in catalog.list_groups() {
        println!("{}", group.title);
        for (name, template) in &group.templates {
            let availability = if catalog.profile.is_enabled(template.kind) {
                ""
            } else {
                " (tab disabled)"
            };
            match &template.description {
                Some(description) => println!(
                    "  {}/{}  [{}]{}  {}",
                    group.title, name, template.kind, availability, description
                ),
                None => println!("  {}/{}  [{}]{}", group.title, name, template.kind, availability),
            }
        }
    }
    Ok(())
}

fn apply_argument(session: &mut EditorSession, name: &str, value: String) -> Result<()> {
    let arguments = session.arguments_mut();
    if let Ok(index) = name.parse::<usize>() {
        return arguments
            .set_value(index, value)
            .map_err(|e| anyhow!("argument {}: {}", index, e));
    }
    if arguments.set_named(name, value) {
        Ok(())
    } else {
        bail!("the template has no argument named '{}'", name)
    }
}

async fn run(session: &mut EditorSession, wait: bool) -> Result<()> {
    let outcome = session.submit().await;
    print_view(session);

    match outcome {
        ExecutionOutcome::Error(err) => bail!("{}", err),
        ExecutionOutcome::TransactionHandle(handle) if wait => {
            info!(transaction = %handle.transaction_id, "Waiting for the transaction to seal");
            match follow(session).await {
                FinalityState::Failed { error, .. } => bail!("{}", error),
                FinalityState::Sealed { .. } => print_view(session),
                state => {
                    debug!(?state, "Status feed ended before sealing");
                    print_view(session);
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Print each new snapshot until the observation settles
async fn follow(session: &EditorSession) -> FinalityState {
    let wait = session.wait_for_finality();
    tokio::pin!(wait);
    let mut ticker = tokio::time::interval(SNAPSHOT_POLL);
    let mut last: Option<Value> = None;
    loop {
        tokio::select! {
            state = &mut wait => return state,
            _ = ticker.tick() => {
                let Some(snapshot) = session.latest_snapshot() else {
                    continue;
                };
                if last.as_ref() != Some(&snapshot.payload) {
                    println!("[{}] {}", snapshot.received_at.format("%H:%M:%S"), snapshot.payload);
                    last = Some(snapshot.payload);
                }
            }
        }
    }
}

fn print_view(session: &EditorSession) {
    let view = session.display();
    println!("{}", view.title);
    if !view.body.is_empty() {
        println!("{}", view.body);
    }
}

