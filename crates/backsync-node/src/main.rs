mod constants;
mod peer;
mod server;

use anyhow::{anyhow, Context};
use backsync_core::{chain::Chain, hash_hex, parse_hash, Block, Transaction};
use backsync_engine::{fetch_block, BackwardChain, BackwardSyncContext, BackwardSyncDriver, SyncConfig};
use backsync_storage::SledStore;
use clap::{Parser, Subcommand};
use constants::{TREE_SYNC_BLOCKS, TREE_SYNC_CHAIN, TREE_SYNC_HEADERS};
use peer::HttpPeer;
use server::{router, AppState};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Data directory for sled
    #[arg(long, default_value = "./data")]
    data_dir: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Serve headers and blocks to syncing peers
    Serve {
        /// Address to listen on, e.g. 127.0.0.1:8080
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: String,
    },
    /// Append `count` generated blocks on top of the local tip
    Seed {
        #[arg(long, default_value_t = 50)]
        count: u64,
        /// Mixed into extra_data so separate nodes produce distinct chains
        #[arg(long, default_value = "seed")]
        salt: String,
    },
    /// Walk back from a trusted block on `peer` until the local chain is reached
    Sync {
        /// Base URL of the peer, e.g. http://127.0.0.1:8080
        #[arg(long)]
        peer: String,
        /// Hex hash of the trusted block
        #[arg(long)]
        trusted: String,
        /// JSON file with a SyncConfig; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        batch_size: Option<u32>,
        #[arg(long)]
        max_retries: Option<u32>,
        #[arg(long)]
        retry_delay_ms: Option<u64>,
    },
    /// Print the local chain head
    Head,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let store = Arc::new(SledStore::open(&args.data_dir)?);
    let chain = Chain::new(store.clone());
    chain.ensure_genesis()?;

    match args.cmd {
        Cmd::Serve { listen } => serve(chain, &listen).await?,
        Cmd::Seed { count, salt } => {
            let height = seed_blocks(&chain, count, salt.as_bytes())?;
            info!(count, height, "seeded blocks");
        }
        Cmd::Sync {
            peer,
            trusted,
            config,
            batch_size,
            max_retries,
            retry_delay_ms,
        } => {
            let mut config = match config {
                Some(path) => {
                    let raw = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("reading {}", path.display()))?;
                    serde_json::from_slice::<SyncConfig>(&raw)
                        .with_context(|| format!("parsing {}", path.display()))?
                }
                None => SyncConfig::default(),
            };
            if let Some(v) = batch_size {
                config.batch_size = v;
            }
            if let Some(v) = max_retries {
                config.max_retries = v;
            }
            if let Some(v) = retry_delay_ms {
                config.retry_delay_ms = v;
            }
            sync(&store, chain, &peer, &trusted, config).await?;
        }
        Cmd::Head => {
            let (height, hash) = chain.tip()?;
            let hash = hash.as_ref().map(hash_hex).unwrap_or_default();
            println!("{height} {hash}");
        }
    }

    Ok(())
}

async fn serve(chain: Chain<SledStore>, listen: &str) -> anyhow::Result<()> {
    let app = router(AppState { chain });
    let addr: SocketAddr = listen.parse()?;
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

async fn sync(
    store: &SledStore,
    chain: Chain<SledStore>,
    peer_url: &str,
    trusted: &str,
    config: SyncConfig,
) -> anyhow::Result<()> {
    let trusted = parse_hash(trusted)?;
    let peer = Arc::new(HttpPeer::new(peer_url)?);
    let block = fetch_block(peer.as_ref(), trusted, &config).await?;

    let segment = Arc::new(BackwardChain::with_storage(
        Arc::new(store.kv_tree(TREE_SYNC_HEADERS)?),
        Arc::new(store.kv_tree(TREE_SYNC_BLOCKS)?),
        Arc::new(store.kv_tree(TREE_SYNC_CHAIN)?),
    ));
    segment.append_trusted_block(&block)?;
    info!(number = block.number(), hash = %hash_hex(&trusted), peer = peer_url, "syncing to trusted block");

    let context = Arc::new(BackwardSyncContext::new(chain.clone(), peer, config));
    let driver = BackwardSyncDriver::new(context, segment);
    let imported = driver.run(&chain).await?;

    let (height, _) = chain.tip()?;
    info!(imported, height, "sync complete");
    Ok(())
}

/// Append `count` blocks with one synthetic transfer each. Returns the new height.
pub(crate) fn seed_blocks(chain: &Chain<SledStore>, count: u64, salt: &[u8]) -> anyhow::Result<u64> {
    let (mut height, tip) = chain.tip()?;
    let mut parent = tip.ok_or_else(|| anyhow!("chain has no genesis"))?;
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs();
    for _ in 0..count {
        height += 1;
        let tx = Transaction {
            from: "faucet".into(),
            to: format!("acct-{height}"),
            amount: height,
            timestamp: now,
        };
        let block = Block::new(height, parent, vec![tx], now, salt.to_vec());
        chain.append_block(&block)?;
        parent = block.hash();
    }
    Ok(height)
}
