#![forbid(unsafe_code)]

//! SQLite-backed chart store. Each table keeps its key columns plus the row
//! as a JSON document; every stage write is one transaction.

use std::path::Path;

use bazi_kernel_contracts::chart::{CalcVersion, ChartId, RulesetId};
use bazi_kernel_contracts::deling::{DelingOutcome, DelingResult, ElementStateRow};
use bazi_kernel_contracts::geju::{GejuCandidate, GejuFormation, GejuOutcome, GejuSummary};
use bazi_kernel_contracts::hanzao::{HanZaoDetail, HanZaoOutcome, HanZaoSummary};
use bazi_kernel_contracts::rootqi::{
    RootQiDetail, RootQiOutcome, RootQiSummary, TongGenDetail, TongGenReport, TouGanDetail,
    TouGanReport,
};
use bazi_kernel_contracts::ruleset::RulesetBundle;
use bazi_kernel_contracts::yongshen::{ElementScoreRow, YongShenOutcome, YongShenResult};
use bazi_kernel_contracts::Validate;
use rusqlite::{params, Connection, OptionalExtension, ToSql, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::StorageError;
use crate::repo::{
    DelingRepo, GejuRepo, HanZaoRepo, RootQiRepo, RulesetStore, TongGenRepo, TouGanRepo,
    YongShenRepo,
};
use crate::tables;
use crate::validate_all;

pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS bazi_deling_result (
    chart_id   TEXT NOT NULL,
    ruleset_id TEXT NOT NULL,
    row_json   TEXT NOT NULL,
    PRIMARY KEY (chart_id, ruleset_id)
);
CREATE TABLE IF NOT EXISTS bazi_deling_snapshot (
    chart_id   TEXT NOT NULL,
    ruleset_id TEXT NOT NULL,
    element    TEXT NOT NULL,
    row_json   TEXT NOT NULL,
    PRIMARY KEY (chart_id, ruleset_id, element)
);
CREATE TABLE IF NOT EXISTS bazi_rootqi_detail (
    chart_id TEXT NOT NULL, seq INTEGER NOT NULL, row_json TEXT NOT NULL,
    PRIMARY KEY (chart_id, seq)
);
CREATE TABLE IF NOT EXISTS bazi_rootqi_summary (
    chart_id TEXT NOT NULL, seq INTEGER NOT NULL, row_json TEXT NOT NULL,
    PRIMARY KEY (chart_id, seq)
);
CREATE TABLE IF NOT EXISTS bazi_tonggen_detail (
    chart_id TEXT NOT NULL, seq INTEGER NOT NULL, row_json TEXT NOT NULL,
    PRIMARY KEY (chart_id, seq)
);
CREATE TABLE IF NOT EXISTS bazi_tougan_detail (
    chart_id TEXT NOT NULL, seq INTEGER NOT NULL, row_json TEXT NOT NULL,
    PRIMARY KEY (chart_id, seq)
);
CREATE TABLE IF NOT EXISTS bazi_hanzao_detail (
    chart_id TEXT NOT NULL, seq INTEGER NOT NULL, row_json TEXT NOT NULL,
    PRIMARY KEY (chart_id, seq)
);
CREATE TABLE IF NOT EXISTS bazi_hanzao_summary (
    chart_id TEXT PRIMARY KEY, row_json TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS bazi_geju_candidate (
    chart_id TEXT NOT NULL, seq INTEGER NOT NULL, row_json TEXT NOT NULL,
    PRIMARY KEY (chart_id, seq)
);
CREATE TABLE IF NOT EXISTS bazi_geju_formation (
    chart_id TEXT NOT NULL, seq INTEGER NOT NULL, row_json TEXT NOT NULL,
    PRIMARY KEY (chart_id, seq)
);
CREATE TABLE IF NOT EXISTS bazi_geju_summary (
    chart_id TEXT PRIMARY KEY, row_json TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS bazi_yongshen_result (
    chart_id     TEXT NOT NULL,
    calc_version TEXT NOT NULL,
    row_json     TEXT NOT NULL,
    PRIMARY KEY (chart_id, calc_version)
);
CREATE TABLE IF NOT EXISTS bazi_element_score (
    chart_id     TEXT NOT NULL,
    calc_version TEXT NOT NULL,
    element      TEXT NOT NULL,
    row_json     TEXT NOT NULL,
    PRIMARY KEY (chart_id, calc_version, element)
);
CREATE TABLE IF NOT EXISTS rulesets (
    ruleset_id  TEXT PRIMARY KEY,
    bundle_json TEXT NOT NULL
);
";

pub struct SqliteChartStore {
    conn: Connection,
    schema_version: u32,
}

impl SqliteChartStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        let mut store = Self {
            conn,
            schema_version: 0,
        };
        store.migrate()?;
        Ok(store)
    }

    /// Brings the schema up to `SCHEMA_VERSION`. A store already at that
    /// version is left untouched.
    pub fn migrate(&mut self) -> Result<u32, StorageError> {
        let current: u32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if current < SCHEMA_VERSION {
            let tx = self.conn.transaction()?;
            tx.execute_batch(SCHEMA_V1)?;
            tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
            tx.commit()?;
            debug!(from = current, to = SCHEMA_VERSION, "chart store migrated");
        }
        self.schema_version = SCHEMA_VERSION.max(current);
        Ok(self.schema_version)
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Drops one of the chart tables. Unknown names are ignored.
    pub fn drop_table(&mut self, name: &str) -> Result<(), StorageError> {
        if let Some(table) = tables::lookup(name) {
            self.conn
                .execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
        }
        Ok(())
    }

    pub fn has_table(&self, name: &str) -> Result<bool, StorageError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

fn to_doc<T: Serialize>(row: &T) -> Result<String, StorageError> {
    Ok(serde_json::to_string(row)?)
}

fn from_docs<T: DeserializeOwned>(docs: Vec<String>) -> Result<Vec<T>, StorageError> {
    docs.iter()
        .map(|d| serde_json::from_str(d).map_err(StorageError::from))
        .collect()
}

/// Delete-then-insert of one chart's ordered rows.
fn replace_chart_rows<T: Serialize>(
    tx: &Transaction<'_>,
    table: &'static str,
    chart_id: &ChartId,
    rows: &[T],
) -> Result<(), StorageError> {
    tx.execute(
        &format!("DELETE FROM {table} WHERE chart_id = ?1"),
        params![chart_id.as_str()],
    )?;
    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {table} (chart_id, seq, row_json) VALUES (?1, ?2, ?3)"
    ))?;
    for (seq, row) in rows.iter().enumerate() {
        stmt.execute(params![chart_id.as_str(), seq as i64, to_doc(row)?])?;
    }
    Ok(())
}

fn upsert_chart_doc<T: Serialize>(
    tx: &Transaction<'_>,
    table: &'static str,
    chart_id: &ChartId,
    row: &T,
) -> Result<(), StorageError> {
    tx.execute(
        &format!(
            "INSERT INTO {table} (chart_id, row_json) VALUES (?1, ?2)
             ON CONFLICT(chart_id) DO UPDATE SET row_json = excluded.row_json"
        ),
        params![chart_id.as_str(), to_doc(row)?],
    )?;
    Ok(())
}

fn load_docs<T: DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    args: &[&dyn ToSql],
) -> Result<Vec<T>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let docs = stmt
        .query_map(args, |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    from_docs(docs)
}

fn load_doc<T: DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    args: &[&dyn ToSql],
) -> Result<Option<T>, StorageError> {
    let doc: Option<String> = conn
        .query_row(sql, args, |row| row.get(0))
        .optional()?;
    match doc {
        Some(d) => Ok(Some(serde_json::from_str(&d)?)),
        None => Ok(None),
    }
}

fn load_chart_rows<T: DeserializeOwned>(
    conn: &Connection,
    table: &'static str,
    chart_id: &ChartId,
) -> Result<Vec<T>, StorageError> {
    load_docs(
        conn,
        &format!("SELECT row_json FROM {table} WHERE chart_id = ?1 ORDER BY seq"),
        &[&chart_id.as_str()],
    )
}

fn load_chart_doc<T: DeserializeOwned>(
    conn: &Connection,
    table: &'static str,
    chart_id: &ChartId,
) -> Result<Option<T>, StorageError> {
    load_doc(
        conn,
        &format!("SELECT row_json FROM {table} WHERE chart_id = ?1"),
        &[&chart_id.as_str()],
    )
}

impl DelingRepo for SqliteChartStore {
    fn save_deling_outcome(&mut self, outcome: &DelingOutcome) -> Result<(), StorageError> {
        let r = &outcome.result;
        r.validate()?;
        let tx = self.conn.transaction()?;
        for row in &outcome.snapshot {
            tx.execute(
                "INSERT INTO bazi_deling_snapshot (chart_id, ruleset_id, element, row_json)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(chart_id, ruleset_id, element)
                 DO UPDATE SET row_json = excluded.row_json",
                params![
                    row.chart_id.as_str(),
                    row.ruleset_id.as_str(),
                    row.element_state.element.as_char().to_string(),
                    to_doc(row)?
                ],
            )?;
        }
        tx.execute(
            "INSERT INTO bazi_deling_result (chart_id, ruleset_id, row_json)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(chart_id, ruleset_id) DO UPDATE SET row_json = excluded.row_json",
            params![r.chart_id.as_str(), r.ruleset_id.as_str(), to_doc(r)?],
        )?;
        tx.commit()?;
        debug!(chart_id = %r.chart_id, ruleset_id = %r.ruleset_id, "deling rows upserted");
        Ok(())
    }

    fn deling_result_row(
        &self,
        chart_id: &ChartId,
        ruleset_id: &RulesetId,
    ) -> Result<Option<DelingResult>, StorageError> {
        load_doc(
            &self.conn,
            "SELECT row_json FROM bazi_deling_result WHERE chart_id = ?1 AND ruleset_id = ?2",
            &[&chart_id.as_str(), &ruleset_id.as_str()],
        )
    }

    fn element_state_rows(
        &self,
        chart_id: &ChartId,
        ruleset_id: &RulesetId,
    ) -> Result<Vec<ElementStateRow>, StorageError> {
        let mut rows: Vec<ElementStateRow> = load_docs(
            &self.conn,
            "SELECT row_json FROM bazi_deling_snapshot WHERE chart_id = ?1 AND ruleset_id = ?2",
            &[&chart_id.as_str(), &ruleset_id.as_str()],
        )?;
        rows.sort_by_key(|r| r.element_state.element);
        Ok(rows)
    }
}

impl RootQiRepo for SqliteChartStore {
    fn replace_rootqi_rows(
        &mut self,
        chart_id: &ChartId,
        outcome: &RootQiOutcome,
    ) -> Result<(), StorageError> {
        validate_all(&outcome.details)?;
        let tx = self.conn.transaction()?;
        replace_chart_rows(&tx, tables::ROOTQI_DETAIL, chart_id, &outcome.details)?;
        replace_chart_rows(&tx, tables::ROOTQI_SUMMARY, chart_id, &outcome.summaries)?;
        tx.commit()?;
        Ok(())
    }

    fn rootqi_detail_rows(&self, chart_id: &ChartId) -> Result<Vec<RootQiDetail>, StorageError> {
        load_chart_rows(&self.conn, tables::ROOTQI_DETAIL, chart_id)
    }

    fn rootqi_summary_rows(
        &self,
        chart_id: &ChartId,
    ) -> Result<Vec<RootQiSummary>, StorageError> {
        load_chart_rows(&self.conn, tables::ROOTQI_SUMMARY, chart_id)
    }
}

impl TongGenRepo for SqliteChartStore {
    fn replace_tonggen_rows(&mut self, report: &TongGenReport) -> Result<(), StorageError> {
        validate_all(&report.details)?;
        let tx = self.conn.transaction()?;
        replace_chart_rows(&tx, tables::TONGGEN_DETAIL, &report.chart_id, &report.details)?;
        tx.commit()?;
        Ok(())
    }

    fn tonggen_rows(&self, chart_id: &ChartId) -> Result<Vec<TongGenDetail>, StorageError> {
        load_chart_rows(&self.conn, tables::TONGGEN_DETAIL, chart_id)
    }
}

impl TouGanRepo for SqliteChartStore {
    fn replace_tougan_rows(&mut self, report: &TouGanReport) -> Result<(), StorageError> {
        validate_all(&report.details)?;
        let tx = self.conn.transaction()?;
        replace_chart_rows(&tx, tables::TOUGAN_DETAIL, &report.chart_id, &report.details)?;
        tx.commit()?;
        Ok(())
    }

    fn tougan_rows(&self, chart_id: &ChartId) -> Result<Vec<TouGanDetail>, StorageError> {
        load_chart_rows(&self.conn, tables::TOUGAN_DETAIL, chart_id)
    }
}

impl HanZaoRepo for SqliteChartStore {
    fn replace_hanzao_rows(&mut self, outcome: &HanZaoOutcome) -> Result<(), StorageError> {
        outcome.summary.validate()?;
        let chart_id = &outcome.summary.chart_id;
        let tx = self.conn.transaction()?;
        replace_chart_rows(&tx, tables::HANZAO_DETAIL, chart_id, &outcome.details)?;
        upsert_chart_doc(&tx, tables::HANZAO_SUMMARY, chart_id, &outcome.summary)?;
        tx.commit()?;
        Ok(())
    }

    fn hanzao_detail_rows(&self, chart_id: &ChartId) -> Result<Vec<HanZaoDetail>, StorageError> {
        load_chart_rows(&self.conn, tables::HANZAO_DETAIL, chart_id)
    }

    fn hanzao_summary_row(
        &self,
        chart_id: &ChartId,
    ) -> Result<Option<HanZaoSummary>, StorageError> {
        load_chart_doc(&self.conn, tables::HANZAO_SUMMARY, chart_id)
    }
}

impl GejuRepo for SqliteChartStore {
    fn replace_geju_rows(&mut self, outcome: &GejuOutcome) -> Result<(), StorageError> {
        validate_all(&outcome.candidates)?;
        outcome.summary.validate()?;
        let chart_id = &outcome.summary.chart_id;
        let tx = self.conn.transaction()?;
        replace_chart_rows(&tx, tables::GEJU_CANDIDATE, chart_id, &outcome.candidates)?;
        replace_chart_rows(&tx, tables::GEJU_FORMATION, chart_id, &outcome.formations)?;
        upsert_chart_doc(&tx, tables::GEJU_SUMMARY, chart_id, &outcome.summary)?;
        tx.commit()?;
        Ok(())
    }

    fn geju_candidate_rows(
        &self,
        chart_id: &ChartId,
    ) -> Result<Vec<GejuCandidate>, StorageError> {
        load_chart_rows(&self.conn, tables::GEJU_CANDIDATE, chart_id)
    }

    fn geju_formation_rows(
        &self,
        chart_id: &ChartId,
    ) -> Result<Vec<GejuFormation>, StorageError> {
        load_chart_rows(&self.conn, tables::GEJU_FORMATION, chart_id)
    }

    fn geju_summary_row(&self, chart_id: &ChartId) -> Result<Option<GejuSummary>, StorageError> {
        load_chart_doc(&self.conn, tables::GEJU_SUMMARY, chart_id)
    }
}

impl YongShenRepo for SqliteChartStore {
    fn replace_yongshen_rows(&mut self, outcome: &YongShenOutcome) -> Result<(), StorageError> {
        let r = &outcome.result;
        r.validate()?;
        validate_all(&outcome.scores)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO bazi_yongshen_result (chart_id, calc_version, row_json)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(chart_id, calc_version) DO UPDATE SET row_json = excluded.row_json",
            params![r.chart_id.as_str(), r.calc_version.as_str(), to_doc(r)?],
        )?;
        tx.execute(
            "DELETE FROM bazi_element_score WHERE chart_id = ?1 AND calc_version = ?2",
            params![r.chart_id.as_str(), r.calc_version.as_str()],
        )?;
        for row in &outcome.scores {
            tx.execute(
                "INSERT INTO bazi_element_score (chart_id, calc_version, element, row_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    row.chart_id.as_str(),
                    row.calc_version.as_str(),
                    row.element.as_char().to_string(),
                    to_doc(row)?
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn yongshen_result_row(
        &self,
        chart_id: &ChartId,
        calc_version: &CalcVersion,
    ) -> Result<Option<YongShenResult>, StorageError> {
        load_doc(
            &self.conn,
            "SELECT row_json FROM bazi_yongshen_result WHERE chart_id = ?1 AND calc_version = ?2",
            &[&chart_id.as_str(), &calc_version.as_str()],
        )
    }

    fn element_score_rows(
        &self,
        chart_id: &ChartId,
        calc_version: &CalcVersion,
    ) -> Result<Vec<ElementScoreRow>, StorageError> {
        let mut rows: Vec<ElementScoreRow> = load_docs(
            &self.conn,
            "SELECT row_json FROM bazi_element_score WHERE chart_id = ?1 AND calc_version = ?2",
            &[&chart_id.as_str(), &calc_version.as_str()],
        )?;
        rows.sort_by_key(|r| r.element);
        Ok(rows)
    }
}

impl RulesetStore for SqliteChartStore {
    fn put_ruleset(&mut self, bundle: &RulesetBundle) -> Result<(), StorageError> {
        bundle.validate()?;
        self.conn.execute(
            "INSERT INTO rulesets (ruleset_id, bundle_json) VALUES (?1, ?2)
             ON CONFLICT(ruleset_id) DO UPDATE SET bundle_json = excluded.bundle_json",
            params![bundle.ruleset_id.as_str(), to_doc(bundle)?],
        )?;
        Ok(())
    }

    fn get_ruleset(&self, ruleset_id: &RulesetId) -> Result<Option<RulesetBundle>, StorageError> {
        load_doc(
            &self.conn,
            "SELECT bundle_json FROM rulesets WHERE ruleset_id = ?1",
            &[&ruleset_id.as_str()],
        )
    }

    fn ruleset_ids(&self) -> Result<Vec<RulesetId>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT ruleset_id FROM rulesets ORDER BY ruleset_id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        ids.into_iter()
            .map(|id| RulesetId::new(id).map_err(StorageError::from))
            .collect()
    }
}
