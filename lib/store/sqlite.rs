use crate::config::Options;
use crate::error::{Error, Result};
use crate::meta::{FileInfo, FileMeta, FileOptions};
use crate::store::Backend;
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, Transaction};
use std::path::PathBuf;
use std::time::Duration;

/// schema steps, `PRAGMA user_version` records how many were applied
const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS block_file (
        containerid TEXT NOT NULL,
        name TEXT NOT NULL,
        maxsize INTEGER NOT NULL,
        circular INTEGER NOT NULL,
        size INTEGER NOT NULL,
        createdts INTEGER NOT NULL,
        modts INTEGER NOT NULL,
        meta TEXT NOT NULL,
        PRIMARY KEY (containerid, name)
    );
    CREATE TABLE IF NOT EXISTS block_data (
        containerid TEXT NOT NULL,
        name TEXT NOT NULL,
        blockidx INTEGER NOT NULL,
        data BLOB NOT NULL,
        PRIMARY KEY (containerid, name, blockidx)
    );",
    "ALTER TABLE block_file ADD COLUMN structured INTEGER NOT NULL DEFAULT 0;",
];

const FILE_COLS: &str = "containerid, name, maxsize, circular, structured, size, createdts, modts, meta";

/// Single connection sqlite backend.
///
/// Every call takes the connection lock, so at most one transaction is in
/// flight per process. Callers wait at most `op_timeout` for it.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    op_timeout: Duration,
    path: Option<PathBuf>,
}

fn row_to_info(row: &Row<'_>) -> rusqlite::Result<(FileInfo, String)> {
    let opts = FileOptions {
        max_size: row.get::<_, i64>(2)? as u64,
        circular: row.get(3)?,
        structured: row.get(4)?,
    };
    let info = FileInfo {
        container: row.get(0)?,
        name: row.get(1)?,
        size: row.get::<_, i64>(5)? as u64,
        created_ts: row.get(6)?,
        mod_ts: row.get(7)?,
        opts,
        meta: FileMeta::new(),
    };
    Ok((info, row.get(8)?))
}

fn decode(pairs: Vec<(FileInfo, String)>) -> Result<Vec<FileInfo>> {
    let mut r = Vec::with_capacity(pairs.len());
    for (mut info, meta) in pairs {
        info.meta = serde_json::from_str(&meta)?;
        r.push(info);
    }
    Ok(r)
}

impl SqliteStore {
    pub fn open(opt: &Options) -> Result<Self> {
        let conn = match &opt.db_path {
            Some(p) => Connection::open(p)?,
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(opt.busy_timeout)?;
        if opt.db_path.is_some() {
            let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get(0))?;
            log::debug!("journal_mode {}", mode);
        }
        let s = Self {
            conn: Mutex::new(conn),
            op_timeout: opt.op_timeout,
            path: opt.db_path.clone(),
        };
        s.migrate()?;
        log::info!("opened block store {}", s.describe());
        Ok(s)
    }

    pub fn describe(&self) -> String {
        match &self.path {
            Some(p) => p.display().to_string(),
            None => ":memory:".to_string(),
        }
    }

    fn with_conn<R>(&self, f: impl FnOnce(&mut Connection) -> Result<R>) -> Result<R> {
        let mut conn = self
            .conn
            .try_lock_for(self.op_timeout)
            .ok_or(Error::Timeout(self.op_timeout))?;
        f(&mut conn)
    }

    fn with_tx<R>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<R>) -> Result<R> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let r = f(&tx)?;
            tx.commit()?;
            Ok(r)
        })
    }

    pub fn schema_version(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let v: i64 = conn.pragma_query_value(None, "user_version", |r| r.get(0))?;
            Ok(v as usize)
        })
    }

    /// apply the schema steps not applied yet
    pub fn migrate(&self) -> Result<()> {
        let cur = self.schema_version()?;
        if cur > MIGRATIONS.len() {
            return Err(Error::InvalidConfig(format!(
                "store schema version {} is newer than supported {}",
                cur,
                MIGRATIONS.len()
            )));
        }
        if cur == MIGRATIONS.len() {
            return Ok(());
        }
        self.with_tx(|tx| {
            for step in &MIGRATIONS[cur..] {
                tx.execute_batch(step)?;
            }
            tx.pragma_update(None, "user_version", MIGRATIONS.len() as i64)?;
            Ok(())
        })?;
        log::info!("block store migration done, version {} -> {}", cur, MIGRATIONS.len());
        Ok(())
    }

    /// every stored block of a file, in index order
    pub fn blocks(&self, container: &str, name: &str) -> Result<Vec<(u64, Vec<u8>)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT blockidx, data FROM block_data WHERE containerid = ?1 AND name = ?2 ORDER BY blockidx",
            )?;
            let rows = stmt.query_map(params![container, name], |r| {
                Ok((r.get::<_, i64>(0)? as u64, r.get::<_, Vec<u8>>(1)?))
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    fn select_files(&self, filter: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<FileInfo>> {
        let sql = format!("SELECT {} FROM block_file {}", FILE_COLS, filter);
        let pairs = self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(args, row_to_info)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        decode(pairs)
    }
}

impl Backend for SqliteStore {
    fn insert_file(&self, info: &FileInfo) -> Result<()> {
        let meta = serde_json::to_string(&info.meta)?;
        let sql = format!(
            "INSERT INTO block_file ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            FILE_COLS
        );
        let r = self.with_conn(|conn| {
            conn.execute(
                &sql,
                params![
                    info.container,
                    info.name,
                    info.opts.max_size as i64,
                    info.opts.circular,
                    info.opts.structured,
                    info.size as i64,
                    info.created_ts,
                    info.mod_ts,
                    meta
                ],
            )?;
            Ok(())
        });
        match r {
            Err(Error::Db(rusqlite::Error::SqliteFailure(e, _))) if e.code == ErrorCode::ConstraintViolation => {
                Err(Error::exists(&info.container, &info.name))
            }
            r => r,
        }
    }

    fn get_file(&self, container: &str, name: &str) -> Result<Option<FileInfo>> {
        let mut v = self.select_files("WHERE containerid = ?1 AND name = ?2", &[&container, &name])?;
        Ok(v.pop())
    }

    fn persist(&self, info: &FileInfo, blocks: &[(u64, &[u8])]) -> Result<bool> {
        let meta = serde_json::to_string(&info.meta)?;
        self.with_tx(|tx| {
            let n = tx.execute(
                "UPDATE block_file SET maxsize = ?3, circular = ?4, structured = ?5, size = ?6, createdts = ?7, modts = ?8, meta = ?9
                 WHERE containerid = ?1 AND name = ?2",
                params![
                    info.container,
                    info.name,
                    info.opts.max_size as i64,
                    info.opts.circular,
                    info.opts.structured,
                    info.size as i64,
                    info.created_ts,
                    info.mod_ts,
                    meta
                ],
            )?;
            if n == 0 {
                return Ok(false);
            }
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO block_data (containerid, name, blockidx, data) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (idx, data) in blocks {
                stmt.execute(params![info.container, info.name, *idx as i64, data])?;
            }
            Ok(true)
        })
    }

    fn load_block(&self, container: &str, name: &str, idx: u64) -> Result<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT data FROM block_data WHERE containerid = ?1 AND name = ?2 AND blockidx = ?3",
            )?;
            Ok(stmt
                .query_row(params![container, name, idx as i64], |r| r.get::<_, Vec<u8>>(0))
                .optional()?)
        })
    }

    fn delete_file(&self, container: &str, name: &str) -> Result<bool> {
        self.with_tx(|tx| {
            tx.execute(
                "DELETE FROM block_data WHERE containerid = ?1 AND name = ?2",
                params![container, name],
            )?;
            let n = tx.execute(
                "DELETE FROM block_file WHERE containerid = ?1 AND name = ?2",
                params![container, name],
            )?;
            Ok(n > 0)
        })
    }

    fn delete_container(&self, container: &str) -> Result<usize> {
        self.with_tx(|tx| {
            tx.execute("DELETE FROM block_data WHERE containerid = ?1", params![container])?;
            Ok(tx.execute("DELETE FROM block_file WHERE containerid = ?1", params![container])?)
        })
    }

    fn list_files(&self, container: &str) -> Result<Vec<FileInfo>> {
        self.select_files("WHERE containerid = ?1 ORDER BY name", &[&container])
    }

    fn list_all_files(&self) -> Result<Vec<FileInfo>> {
        self.select_files("ORDER BY containerid, name", &[])
    }

    fn container_ids(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached("SELECT DISTINCT containerid FROM block_file ORDER BY containerid")?;
            let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }
}
