//! SQLite Persistent State Store
//!
//! Durable storage that survives service restarts. Records are stored as
//! JSON documents keyed by their natural id; status and height columns are
//! kept alongside for inspection and indexing.
//! Uses connection pooling via r2d2.

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Transaction};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use super::traits::{Record, Snapshot, StateStore, StorageError, StorageResult};
use crate::bridge::NonceCounters;
use crate::relay::{BlockHeader, ChainTip};
use crate::types::{AccountId, BlockHash, BurnRequest, IssueRequest, Vault, VaultId};

const META_CHAIN_TIP: &str = "chain_tip";
const META_RELAYERS: &str = "relayers";
const META_EXCHANGE_RATE: &str = "exchange_rate";
const META_COUNTERS: &str = "counters";

/// Chain tip row: the tip plus the checkpoint it descends from
#[derive(Serialize, Deserialize)]
struct TipRow {
    tip: ChainTip,
    checkpoint: BlockHash,
}

fn db_err(e: rusqlite::Error) -> StorageError {
    StorageError::Database(e.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, StorageError> {
    Ok(serde_json::to_string(value)?)
}

fn from_json<T: DeserializeOwned>(data: &str) -> Result<T, StorageError> {
    Ok(serde_json::from_str(data)?)
}

/// SQLite-backed state store with connection pooling
pub struct SqliteStateStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStateStore {
    /// Open (or create) the database at `db_path` and run migrations
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations()?;

        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations()?;

        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        self.pool
            .get()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn run_migrations(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS headers (
                hash TEXT PRIMARY KEY,
                height INTEGER NOT NULL,
                data TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS vaults (
                id TEXT PRIMARY KEY,
                active INTEGER NOT NULL,
                data TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS issues (
                nonce INTEGER PRIMARY KEY,
                status TEXT NOT NULL,
                data TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS burns (
                nonce INTEGER PRIMARY KEY,
                status TEXT NOT NULL,
                data TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS payouts (
                account TEXT PRIMARY KEY,
                amount TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_headers_height ON headers(height);
            CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
            CREATE INDEX IF NOT EXISTS idx_burns_status ON burns(status);
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    // Synchronous helpers for the trait implementations

    fn put_meta(tx: &Transaction, key: &str, data: String) -> Result<(), StorageError> {
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, data) VALUES (?1, ?2)",
            params![key, data],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn write_record(tx: &Transaction, record: &Record) -> Result<(), StorageError> {
        match record {
            Record::Header(header) => {
                tx.execute(
                    "INSERT OR REPLACE INTO headers (hash, height, data) VALUES (?1, ?2, ?3)",
                    params![header.hash.to_hex(), header.height as i64, to_json(header)?],
                )
                .map_err(db_err)?;
            }
            Record::ChainTip { tip, checkpoint } => {
                let row = TipRow {
                    tip: tip.clone(),
                    checkpoint: *checkpoint,
                };
                Self::put_meta(tx, META_CHAIN_TIP, to_json(&row)?)?;
            }
            Record::Relayers(relayers) => {
                Self::put_meta(tx, META_RELAYERS, to_json(relayers)?)?;
            }
            Record::Vault(vault) => {
                tx.execute(
                    "INSERT OR REPLACE INTO vaults (id, active, data) VALUES (?1, ?2, ?3)",
                    params![vault.id.to_hex(), vault.active, to_json(vault)?],
                )
                .map_err(db_err)?;
            }
            Record::ExchangeRate(rate) => {
                Self::put_meta(tx, META_EXCHANGE_RATE, rate.to_string())?;
            }
            Record::Issue(issue) => {
                tx.execute(
                    "INSERT OR REPLACE INTO issues (nonce, status, data) VALUES (?1, ?2, ?3)",
                    params![issue.nonce() as i64, issue.status.to_string(), to_json(issue)?],
                )
                .map_err(db_err)?;
            }
            Record::Burn(burn) => {
                tx.execute(
                    "INSERT OR REPLACE INTO burns (nonce, status, data) VALUES (?1, ?2, ?3)",
                    params![burn.nonce as i64, burn.status.to_string(), to_json(burn)?],
                )
                .map_err(db_err)?;
            }
            Record::Payout(account, 0) => {
                tx.execute(
                    "DELETE FROM payouts WHERE account = ?1",
                    params![account.to_hex()],
                )
                .map_err(db_err)?;
            }
            Record::Payout(account, amount) => {
                // u128 does not fit an INTEGER column
                tx.execute(
                    "INSERT OR REPLACE INTO payouts (account, amount) VALUES (?1, ?2)",
                    params![account.to_hex(), amount.to_string()],
                )
                .map_err(db_err)?;
            }
            Record::Counters(counters) => {
                Self::put_meta(tx, META_COUNTERS, to_json(counters)?)?;
            }
        }
        Ok(())
    }

    fn write_batch_sync(&self, records: &[Record]) -> Result<(), StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;
        for record in records {
            Self::write_record(&tx, record)?;
        }
        tx.commit().map_err(db_err)?;
        Ok(())
    }

    /// Every `data` column of a table, in primary key order
    fn load_table<T: DeserializeOwned>(&self, sql: &str) -> Result<Vec<T>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        rows.iter().map(|data| from_json(data)).collect()
    }

    fn get_meta(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT data FROM meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)
    }

    fn get_data(&self, sql: &str, key: rusqlite::types::Value) -> Result<Option<String>, StorageError> {
        let conn = self.conn()?;
        conn.query_row(sql, params![key], |row| row.get(0))
            .optional()
            .map_err(db_err)
    }

    fn load_payouts(&self) -> Result<HashMap<AccountId, u128>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT account, amount FROM payouts")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        let mut payouts = HashMap::new();
        for (account, amount) in rows {
            let mut bytes = [0u8; 32];
            hex::decode_to_slice(&account, &mut bytes)
                .map_err(|e| StorageError::InvalidData(format!("payout account: {}", e)))?;
            let amount = amount
                .parse::<u128>()
                .map_err(|e| StorageError::InvalidData(format!("payout amount: {}", e)))?;
            payouts.insert(AccountId(bytes), amount);
        }
        Ok(payouts)
    }

    fn load_sync(&self) -> Result<Snapshot, StorageError> {
        let (tip, checkpoint) = match self.get_meta(META_CHAIN_TIP)? {
            Some(data) => {
                let row: TipRow = from_json(&data)?;
                (Some(row.tip), Some(row.checkpoint))
            }
            None => (None, None),
        };
        let relayers: BTreeSet<AccountId> = match self.get_meta(META_RELAYERS)? {
            Some(data) => from_json(&data)?,
            None => BTreeSet::new(),
        };
        let exchange_rate = self
            .get_meta(META_EXCHANGE_RATE)?
            .map(|data| {
                data.parse::<u128>()
                    .map_err(|e| StorageError::InvalidData(format!("exchange rate: {}", e)))
            })
            .transpose()?;
        let counters: Option<NonceCounters> = self
            .get_meta(META_COUNTERS)?
            .map(|data| from_json(&data))
            .transpose()?;

        Ok(Snapshot {
            headers: self.load_table("SELECT data FROM headers ORDER BY hash")?,
            tip,
            checkpoint,
            relayers,
            vaults: self.load_table("SELECT data FROM vaults ORDER BY id")?,
            exchange_rate,
            issues: self.load_table("SELECT data FROM issues ORDER BY nonce")?,
            burns: self.load_table("SELECT data FROM burns ORDER BY nonce")?,
            payouts: self.load_payouts()?,
            counters,
        })
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn write_batch(&self, records: &[Record]) -> StorageResult<()> {
        self.write_batch_sync(records)
    }

    async fn load(&self) -> StorageResult<Snapshot> {
        self.load_sync()
    }

    async fn get_header(&self, hash: &BlockHash) -> StorageResult<Option<BlockHeader>> {
        self.get_data(
            "SELECT data FROM headers WHERE hash = ?1",
            hash.to_hex().into(),
        )?
        .map(|data| from_json(&data))
        .transpose()
    }

    async fn get_vault(&self, id: &VaultId) -> StorageResult<Option<Vault>> {
        self.get_data("SELECT data FROM vaults WHERE id = ?1", id.to_hex().into())?
            .map(|data| from_json(&data))
            .transpose()
    }

    async fn get_issue(&self, nonce: u64) -> StorageResult<Option<IssueRequest>> {
        self.get_data(
            "SELECT data FROM issues WHERE nonce = ?1",
            (nonce as i64).into(),
        )?
        .map(|data| from_json(&data))
        .transpose()
    }

    async fn get_burn(&self, nonce: u64) -> StorageResult<Option<BurnRequest>> {
        self.get_data(
            "SELECT data FROM burns WHERE nonce = ?1",
            (nonce as i64).into(),
        )?
        .map(|data| from_json(&data))
        .transpose()
    }
}
