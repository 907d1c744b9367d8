use std::{
    collections::{BTreeMap, HashMap},
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use backoff::ExponentialBackoffBuilder;
use chrono::{DateTime, Utc};
use poise::serenity_prelude::{GuildId, UserId};
use serde::{Deserialize, Serialize};
use tokio::{
    fs,
    io::AsyncWriteExt,
    sync::{mpsc, oneshot},
};
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRecord {
    pub guild: GuildId,
    pub user: UserId,
    pub points: u64,
    /// Rounds won or solved, per game.
    pub activities: BTreeMap<String, u64>,
    pub updated: DateTime<Utc>,
}

impl PointRecord {
    fn new(guild: GuildId, user: UserId) -> Self {
        Self {
            guild,
            user,
            points: 0,
            activities: BTreeMap::new(),
            updated: Utc::now(),
        }
    }

    pub fn activity(&self, name: &str) -> u64 {
        self.activities.get(name).copied().unwrap_or(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("couldn't read point ledger at {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("point ledger at {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The award went through in memory and will be written with the next
    /// request.
    #[error("couldn't save point ledger, award kept in memory: {source}")]
    Persist {
        record: Box<PointRecord>,
        #[source]
        source: io::Error,
    },

    #[error("couldn't save point ledger: {0}")]
    Flush(#[source] io::Error),

    #[error("point ledger writer has shut down")]
    Closed,
}

enum Request {
    Award {
        guild: GuildId,
        user: UserId,
        activity: String,
        amount: u64,
        reply: oneshot::Sender<Result<PointRecord, LedgerError>>,
    },
    Get {
        guild: GuildId,
        user: UserId,
        reply: oneshot::Sender<Option<PointRecord>>,
    },
    Leaderboard {
        guild: GuildId,
        limit: usize,
        reply: oneshot::Sender<Vec<PointRecord>>,
    },
    Flush {
        reply: oneshot::Sender<Result<(), LedgerError>>,
    },
}

/// Durable points per guild member.
///
/// One writer task owns the records; every call is queued to it, so awards
/// from concurrent rounds never interleave.
#[derive(Debug, Clone)]
pub struct PointLedger {
    requests: mpsc::Sender<Request>,
}

impl PointLedger {
    /// Loads the ledger file (a missing file is an empty ledger) and spawns
    /// the writer. Failed writes are retried for up to `retry`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>, retry: Duration) -> Result<Self, LedgerError> {
        let store = Store::load(path.as_ref(), retry).await?;
        info!(records = store.records.len(), "opened point ledger");

        let (requests, rx) = mpsc::channel(64);
        tokio::spawn(store.run(rx));

        Ok(Self { requests })
    }

    pub async fn award(
        &self,
        guild: GuildId,
        user: UserId,
        activity: &str,
        amount: u64,
    ) -> Result<PointRecord, LedgerError> {
        self.request(|reply| Request::Award {
            guild,
            user,
            activity: activity.to_owned(),
            amount,
            reply,
        })
        .await?
    }

    pub async fn get(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> Result<Option<PointRecord>, LedgerError> {
        self.request(|reply| Request::Get { guild, user, reply }).await
    }

    /// Highest totals first; ties go to the lower user id.
    pub async fn leaderboard(
        &self,
        guild: GuildId,
        limit: usize,
    ) -> Result<Vec<PointRecord>, LedgerError> {
        self.request(|reply| Request::Leaderboard {
            guild,
            limit,
            reply,
        })
        .await
    }

    pub async fn flush(&self) -> Result<(), LedgerError> {
        self.request(|reply| Request::Flush { reply }).await?
    }

    async fn request<T>(
        &self,
        request: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, LedgerError> {
        let (reply, response) = oneshot::channel();

        self.requests
            .send(request(reply))
            .await
            .map_err(|_| LedgerError::Closed)?;

        response.await.map_err(|_| LedgerError::Closed)
    }
}

struct Store {
    path: PathBuf,
    retry: Duration,
    records: HashMap<(GuildId, UserId), PointRecord>,
    /// Set when the last write failed.
    dirty: bool,
}

impl Store {
    async fn load(path: &Path, retry: Duration) -> Result<Self, LedgerError> {
        let records = match fs::read_to_string(path).await {
            Ok(text) => serde_json::from_str::<Vec<PointRecord>>(&text).map_err(|source| {
                LedgerError::Corrupt {
                    path: path.to_owned(),
                    source,
                }
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!("no point ledger yet, starting empty");

                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)
                        .await
                        .map_err(|source| LedgerError::Load {
                            path: path.to_owned(),
                            source,
                        })?;
                }

                Vec::new()
            }
            Err(source) => {
                return Err(LedgerError::Load {
                    path: path.to_owned(),
                    source,
                })
            }
        };

        Ok(Self {
            path: path.to_owned(),
            retry,
            records: records
                .into_iter()
                .map(|record| ((record.guild, record.user), record))
                .collect(),
            dirty: false,
        })
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Request>) {
        while let Some(request) = rx.recv().await {
            if self.dirty && !matches!(request, Request::Flush { .. }) {
                match self.persist().await {
                    Ok(()) => info!("flushed pending awards"),
                    Err(err) => error!("{err}, awards still pending"),
                }
            }

            match request {
                Request::Award {
                    guild,
                    user,
                    activity,
                    amount,
                    reply,
                } => {
                    let result = self.award(guild, user, &activity, amount).await;
                    let _ = reply.send(result);
                }
                Request::Get { guild, user, reply } => {
                    let _ = reply.send(self.records.get(&(guild, user)).cloned());
                }
                Request::Leaderboard {
                    guild,
                    limit,
                    reply,
                } => {
                    let _ = reply.send(self.leaderboard(guild, limit));
                }
                Request::Flush { reply } => {
                    let result = match self.dirty {
                        true => self.persist().await.map_err(LedgerError::Flush),
                        false => Ok(()),
                    };
                    let _ = reply.send(result);
                }
            }
        }

        debug!("point ledger writer shutting down");

        if self.dirty {
            if let Err(err) = self.persist().await {
                error!("{err}, pending awards lost");
            }
        }
    }

    async fn award(
        &mut self,
        guild: GuildId,
        user: UserId,
        activity: &str,
        amount: u64,
    ) -> Result<PointRecord, LedgerError> {
        let record = self
            .records
            .entry((guild, user))
            .or_insert_with(|| PointRecord::new(guild, user));

        record.points = record.points.saturating_add(amount);
        *record.activities.entry(activity.to_owned()).or_default() += 1;
        record.updated = Utc::now();

        let record = record.clone();
        debug!(%guild, %user, activity, amount, total = record.points, "awarded points");

        match self.persist().await {
            Ok(()) => Ok(record),
            Err(source) => {
                error!(%source, "couldn't save point ledger");

                Err(LedgerError::Persist {
                    record: Box::new(record),
                    source,
                })
            }
        }
    }

    fn leaderboard(&self, guild: GuildId, limit: usize) -> Vec<PointRecord> {
        let mut ranked: Vec<&PointRecord> = self
            .records
            .values()
            .filter(|record| record.guild == guild)
            .collect();

        ranked.sort_by(|a, b| b.points.cmp(&a.points).then(a.user.cmp(&b.user)));
        ranked.into_iter().take(limit).cloned().collect()
    }

    /// Writes every record, retrying with backoff. Leaves the store dirty if
    /// that still fails.
    async fn persist(&mut self) -> io::Result<()> {
        let mut snapshot: Vec<&PointRecord> = self.records.values().collect();
        snapshot.sort_by_key(|record| (record.guild, record.user));

        let json = serde_json::to_string_pretty(&snapshot)?;

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(100))
            .with_max_elapsed_time(Some(self.retry))
            .build();

        let path = &self.path;
        let result = backoff::future::retry_notify(
            policy,
            || async { write_atomic(path, &json).await.map_err(backoff::Error::transient) },
            |err: io::Error, wait: Duration| warn!("{err}, retrying in {wait:?}..."),
        )
        .await;

        self.dirty = result.is_err();
        result
    }
}

/// Writes next to the target and syncs it to disk, then renames over the
/// target.
async fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");

    let mut file = fs::File::create(&tmp).await?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp, path).await
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const RETRY: Duration = Duration::from_millis(50);

    fn guild() -> GuildId {
        GuildId::new(1)
    }

    #[tokio::test]
    async fn award_creates_and_accumulates() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ledger = PointLedger::open(dir.path().join("points.json"), RETRY)
            .await
            .expect("fresh ledger");

        assert_eq!(ledger.get(guild(), UserId::new(5)).await.expect("open"), None);

        ledger
            .award(guild(), UserId::new(5), "prefix_race", 10)
            .await
            .expect("saved");
        let record = ledger
            .award(guild(), UserId::new(5), "unscramble", 3)
            .await
            .expect("saved");

        assert_eq!(record.points, 13);
        assert_eq!(record.activity("prefix_race"), 1);
        assert_eq!(record.activity("unscramble"), 1);
        assert_eq!(record.activity("rhyme_race"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_awards_both_land() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ledger = PointLedger::open(dir.path().join("points.json"), RETRY)
            .await
            .expect("fresh ledger");
        let user = UserId::new(5);

        let (a, b) = tokio::join!(
            ledger.award(guild(), user, "prefix_race", 10),
            ledger.award(guild(), user, "word_search", 5),
        );
        a.expect("saved");
        b.expect("saved");

        let record = ledger
            .get(guild(), user)
            .await
            .expect("open")
            .expect("awarded");
        assert_eq!(record.points, 15);
        assert_eq!(record.activity("prefix_race"), 1);
        assert_eq!(record.activity("word_search"), 1);
    }

    #[tokio::test]
    async fn atomic_write_replaces_the_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("points.json");

        write_atomic(&path, "[1]").await.expect("first write");
        write_atomic(&path, "[2]").await.expect("second write");

        assert_eq!(std::fs::read_to_string(&path).expect("written"), "[2]");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn survives_reopening() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("points.json");

        {
            let ledger = PointLedger::open(&path, RETRY).await.expect("fresh ledger");
            ledger
                .award(guild(), UserId::new(7), "rhyme_race", 10)
                .await
                .expect("saved");
        }

        let ledger = PointLedger::open(&path, RETRY).await.expect("existing ledger");
        let record = ledger
            .get(guild(), UserId::new(7))
            .await
            .expect("open")
            .expect("persisted");

        assert_eq!(record.points, 10);
        assert_eq!(record.activity("rhyme_race"), 1);
        assert!(!dir.path().join("points.json.tmp").exists());
    }

    #[tokio::test]
    async fn leaderboard_orders_by_points_then_user() {
        let dir = tempfile::tempdir().expect("temp dir");
        let ledger = PointLedger::open(dir.path().join("points.json"), RETRY)
            .await
            .expect("fresh ledger");

        for (user, amount) in [(3, 5), (2, 10), (1, 5)] {
            ledger
                .award(guild(), UserId::new(user), "prefix_race", amount)
                .await
                .expect("saved");
        }
        ledger
            .award(GuildId::new(2), UserId::new(9), "prefix_race", 100)
            .await
            .expect("saved");

        let board: Vec<(UserId, u64)> = ledger
            .leaderboard(guild(), 10)
            .await
            .expect("open")
            .into_iter()
            .map(|record| (record.user, record.points))
            .collect();

        assert_eq!(
            board,
            [
                (UserId::new(2), 10),
                (UserId::new(1), 5),
                (UserId::new(3), 5)
            ]
        );
    }

    #[tokio::test]
    async fn failed_write_keeps_the_award() {
        let dir = tempfile::tempdir().expect("temp dir");
        let data = dir.path().join("data");
        let path = data.join("points.json");

        let ledger = PointLedger::open(&path, RETRY).await.expect("fresh ledger");
        std::fs::remove_dir_all(&data).expect("remove data dir");

        let err = ledger
            .award(guild(), UserId::new(5), "unscramble", 10)
            .await
            .expect_err("nowhere to write");

        let LedgerError::Persist { record, .. } = err else {
            panic!("expected a persistence error, got {err:?}");
        };
        assert_eq!(record.points, 10);

        // still there in memory
        let kept = ledger
            .get(guild(), UserId::new(5))
            .await
            .expect("open")
            .expect("kept");
        assert_eq!(kept.points, 10);

        std::fs::create_dir_all(&data).expect("recreate data dir");
        ledger.flush().await.expect("flushed");

        let saved: Vec<PointRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("written"))
                .expect("valid json");
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].points, 10);
    }
}
