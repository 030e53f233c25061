//! Mining service
//!
//! Runs mining requests one at a time on a blocking worker so the async
//! runtime keeps serving gossip and HTTP while a nonce search is underway.
//! When the ledger moves under an in-flight search the attempt is abandoned
//! and restarted on the new tip.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::consensus::{next_difficulty, Block};
use crate::mining::{Miner, MiningResult};
use crate::storage::{Ledger, LedgerError};

/// Maximum queued mining requests
const REQUEST_QUEUE_DEPTH: usize = 64;

/// Mining errors
#[derive(Debug, Error)]
pub enum MiningError {
    #[error("Mining cancelled: node is shutting down")]
    Cancelled,
    #[error("Mining worker unavailable")]
    WorkerUnavailable,
    #[error("Mined block rejected: {0}")]
    Rejected(LedgerError),
}

struct MineRequest {
    data: String,
    respond: oneshot::Sender<Result<Block, MiningError>>,
}

/// Handle to the mining worker
#[derive(Clone)]
pub struct MiningService {
    requests: mpsc::Sender<MineRequest>,
    miner: Miner,
    shutdown: Arc<AtomicBool>,
}

impl MiningService {
    /// Start the worker task on the current runtime
    pub fn spawn(ledger: Arc<Ledger>) -> Self {
        let (requests, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let miner = Miner::new();
        let shutdown = Arc::new(AtomicBool::new(false));

        tokio::spawn(run(ledger, miner.clone(), Arc::clone(&shutdown), rx));

        Self {
            requests,
            miner,
            shutdown,
        }
    }

    /// Mine `data` into a new block appended to the ledger
    pub async fn mine(&self, data: String) -> Result<Block, MiningError> {
        let (respond, response) = oneshot::channel();
        self.requests
            .send(MineRequest { data, respond })
            .await
            .map_err(|_| MiningError::WorkerUnavailable)?;
        response.await.map_err(|_| MiningError::WorkerUnavailable)?
    }

    /// Abandon the in-flight search and refuse further work
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.miner.stop();
    }
}

async fn run(
    ledger: Arc<Ledger>,
    miner: Miner,
    shutdown: Arc<AtomicBool>,
    mut rx: mpsc::Receiver<MineRequest>,
) {
    while let Some(request) = rx.recv().await {
        let result = mine_until_appended(&ledger, &miner, &shutdown, request.data).await;
        let _ = request.respond.send(result);
    }
    debug!("Mining worker stopped");
}

/// Wait for the search to finish, stopping it if the ledger changes first
async fn await_attempt(
    mut job: tokio::task::JoinHandle<MiningResult>,
    versions: &mut watch::Receiver<u64>,
    miner: &Miner,
) -> Result<MiningResult, MiningError> {
    loop {
        tokio::select! {
            result = &mut job => {
                return result.map_err(|_| MiningError::WorkerUnavailable);
            }
            changed = versions.changed() => {
                if changed.is_err() {
                    return (&mut job).await.map_err(|_| MiningError::WorkerUnavailable);
                }
                debug!("Chain changed while mining; abandoning attempt");
                miner.stop();
            }
        }
    }
}

async fn mine_until_appended(
    ledger: &Ledger,
    miner: &Miner,
    shutdown: &AtomicBool,
    data: String,
) -> Result<Block, MiningError> {
    let mut versions = ledger.subscribe();

    loop {
        // Reset before checking shutdown so a concurrent stop is never lost
        miner.reset();
        if shutdown.load(Ordering::SeqCst) {
            return Err(MiningError::Cancelled);
        }

        versions.borrow_and_update();
        let version = ledger.version();
        let chain = ledger.snapshot();
        let Some(tip) = chain.last().cloned() else {
            return Err(MiningError::WorkerUnavailable);
        };
        let difficulty = next_difficulty(&chain);

        debug!(index = tip.index + 1, difficulty, "Starting mining attempt");
        let job_miner = miner.clone();
        let job_data = data.clone();
        let job = tokio::task::spawn_blocking(move || {
            job_miner.mine_block(&tip, job_data, difficulty)
        });

        match await_attempt(job, &mut versions, miner).await? {
            MiningResult::Success(block) => match ledger.append(block.clone()) {
                Ok(()) => {
                    info!(index = block.index, hash = %block.hash, nonce = block.nonce, "Mined block");
                    return Ok(block);
                }
                Err(err) if ledger.version() != version => {
                    warn!("Mined block went stale ({}); retrying on new tip", err);
                }
                Err(err) => return Err(MiningError::Rejected(err)),
            },
            MiningResult::Interrupted => {
                debug!("Mining attempt interrupted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{genesis_block, validate_new_block};
    use crate::crypto::hash_matches_difficulty;
    use std::time::Duration;

    /// A genuine difficulty-26 successor of genesis
    fn heavy_block() -> Block {
        let genesis = genesis_block();
        Block::new(
            1,
            genesis.hash.clone(),
            genesis.timestamp + 10,
            "heavy".into(),
            26,
            34_631_965,
        )
    }

    #[tokio::test]
    async fn test_mine_appends_to_ledger() {
        let ledger = Arc::new(Ledger::new());
        let service = MiningService::spawn(Arc::clone(&ledger));

        let genesis = ledger.latest_block();
        let block = service.mine("payload".into()).await.unwrap();

        assert_eq!(block.data, "payload");
        assert!(validate_new_block(&block, &genesis).is_ok());
        assert_eq!(ledger.latest_block(), block);
    }

    #[tokio::test]
    async fn test_requests_are_serialized() {
        let ledger = Arc::new(Ledger::new());
        let service = MiningService::spawn(Arc::clone(&ledger));

        let (a, b) = tokio::join!(service.mine("a".into()), service.mine("b".into()));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.index, b.index);
        assert_eq!(ledger.len(), 3);
    }

    #[tokio::test]
    async fn test_chain_change_restarts_on_new_tip() {
        let ledger = Arc::new(Ledger::new());
        let heavy = heavy_block();
        assert!(hash_matches_difficulty(&heavy.hash, 26));
        ledger.append(heavy.clone()).unwrap();

        let service = MiningService::spawn(Arc::clone(&ledger));
        let pending = tokio::spawn({
            let service = service.clone();
            async move { service.mine("ours".into()).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let external = match Miner::new().mine_block(&heavy, "theirs".into(), 0) {
            MiningResult::Success(block) => block,
            MiningResult::Interrupted => panic!("miner was not stopped"),
        };
        ledger.append(external.clone()).unwrap();

        let block = tokio::time::timeout(Duration::from_secs(10), pending)
            .await
            .expect("search was not abandoned")
            .unwrap()
            .unwrap();

        assert_eq!(block.index, heavy.index + 2);
        assert_eq!(block.previous_hash, external.hash);
        assert_eq!(block.difficulty, 0);
        assert_eq!(ledger.latest_block(), block);
    }

    #[tokio::test]
    async fn test_shutdown_cancels() {
        let ledger = Arc::new(Ledger::new());
        let service = MiningService::spawn(Arc::clone(&ledger));
        service.shutdown();

        assert!(matches!(
            service.mine("late".into()).await,
            Err(MiningError::Cancelled)
        ));
        assert_eq!(ledger.len(), 1);
    }
}
