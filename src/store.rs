use crate::models::{BetType, Pick};
use crate::shiva::ShivaRun;
use crate::utils::data::{load_from_cache, save_to_cache};
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::{Mutex, RwLock};

/// Runs kept by the file store; older ones are dropped
const MAX_STORED_RUNS: usize = 500;

/// Where picks and wizard runs are kept.
/// There is at most one pick per (capper, game, bet type).
#[async_trait]
pub trait PickStore: Send + Sync {
    async fn find_pick(&self, capper_id: &str, game_id: &str, bet_type: BetType)
        -> Result<Option<Pick>>;
    async fn save_pick(&self, pick: &Pick) -> Result<()>;
    /// Replace a stored pick with the same id
    async fn update_pick(&self, pick: &Pick) -> Result<()>;
    /// Picks, newest first, optionally for one capper
    async fn list_picks(&self, capper_id: Option<&str>) -> Result<Vec<Pick>>;
    async fn save_run(&self, run: &ShivaRun) -> Result<()>;
    /// Most recent runs, newest first
    async fn latest_runs(&self, limit: usize) -> Result<Vec<ShivaRun>>;
}

fn same_slot(pick: &Pick, capper_id: &str, game_id: &str, bet_type: BetType) -> bool {
    pick.capper_id == capper_id && pick.game_id == game_id && pick.bet_type == bet_type
}

fn insert_pick(picks: &mut Vec<Pick>, pick: &Pick) -> Result<()> {
    if picks
        .iter()
        .any(|p| p.id == pick.id || same_slot(p, &pick.capper_id, &pick.game_id, pick.bet_type))
    {
        anyhow::bail!(
            "{} already has a {} pick for game {}",
            pick.capper_id,
            pick.bet_type,
            pick.game_id
        );
    }
    picks.push(pick.clone());
    Ok(())
}

fn replace_pick(picks: &mut [Pick], pick: &Pick) -> Result<()> {
    match picks.iter_mut().find(|p| p.id == pick.id) {
        Some(stored) => {
            *stored = pick.clone();
            Ok(())
        }
        None => anyhow::bail!("No stored pick with id {}", pick.id),
    }
}

fn newest_picks(picks: &[Pick], capper_id: Option<&str>) -> Vec<Pick> {
    let mut picks: Vec<Pick> = picks
        .iter()
        .filter(|p| capper_id.map_or(true, |id| p.capper_id == id))
        .cloned()
        .collect();
    picks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    picks
}

fn newest_runs(runs: &[ShivaRun], limit: usize) -> Vec<ShivaRun> {
    runs.iter().rev().take(limit).cloned().collect()
}

#[derive(Default)]
pub struct MemoryStore {
    picks: RwLock<Vec<Pick>>,
    runs: RwLock<Vec<ShivaRun>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PickStore for MemoryStore {
    async fn find_pick(
        &self,
        capper_id: &str,
        game_id: &str,
        bet_type: BetType,
    ) -> Result<Option<Pick>> {
        let picks = self.picks.read().await;
        Ok(picks
            .iter()
            .find(|p| same_slot(p, capper_id, game_id, bet_type))
            .cloned())
    }

    async fn save_pick(&self, pick: &Pick) -> Result<()> {
        insert_pick(&mut *self.picks.write().await, pick)
    }

    async fn update_pick(&self, pick: &Pick) -> Result<()> {
        replace_pick(&mut self.picks.write().await, pick)
    }

    async fn list_picks(&self, capper_id: Option<&str>) -> Result<Vec<Pick>> {
        Ok(newest_picks(&self.picks.read().await, capper_id))
    }

    async fn save_run(&self, run: &ShivaRun) -> Result<()> {
        self.runs.write().await.push(run.clone());
        Ok(())
    }

    async fn latest_runs(&self, limit: usize) -> Result<Vec<ShivaRun>> {
        Ok(newest_runs(&self.runs.read().await, limit))
    }
}

/// `picks.json` and `runs.json` under a directory
pub struct JsonFileStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    fn picks_file(&self) -> PathBuf {
        self.dir.join("picks.json")
    }

    fn runs_file(&self) -> PathBuf {
        self.dir.join("runs.json")
    }

    fn load_picks(&self) -> Result<Vec<Pick>> {
        let path = self.picks_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        load_from_cache(path)
    }

    fn load_runs(&self) -> Result<Vec<ShivaRun>> {
        let path = self.runs_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        load_from_cache(path)
    }
}

#[async_trait]
impl PickStore for JsonFileStore {
    async fn find_pick(
        &self,
        capper_id: &str,
        game_id: &str,
        bet_type: BetType,
    ) -> Result<Option<Pick>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load_picks()?
            .into_iter()
            .find(|p| same_slot(p, capper_id, game_id, bet_type)))
    }

    async fn save_pick(&self, pick: &Pick) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut picks = self.load_picks()?;
        insert_pick(&mut picks, pick)?;
        save_to_cache(&picks, self.picks_file())
    }

    async fn update_pick(&self, pick: &Pick) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut picks = self.load_picks()?;
        replace_pick(&mut picks, pick)?;
        save_to_cache(&picks, self.picks_file())
    }

    async fn list_picks(&self, capper_id: Option<&str>) -> Result<Vec<Pick>> {
        let _guard = self.lock.lock().await;
        Ok(newest_picks(&self.load_picks()?, capper_id))
    }

    async fn save_run(&self, run: &ShivaRun) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut runs = self.load_runs()?;
        runs.push(run.clone());
        if runs.len() > MAX_STORED_RUNS {
            runs.drain(..runs.len() - MAX_STORED_RUNS);
        }
        save_to_cache(&runs, self.runs_file())
    }

    async fn latest_runs(&self, limit: usize) -> Result<Vec<ShivaRun>> {
        let _guard = self.lock.lock().await;
        Ok(newest_runs(&self.load_runs()?, limit))
    }
}
