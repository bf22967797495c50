// SQLデータベースアダプター
//
// sqlx の AnyPool を使用して Database トレイトを実装します。
// リビジョンは schema_revision テーブルに1変更1行で記録し、
// 最大のバージョンを現在のリビジョンとして扱います。

use crate::adapters::sql_splitter::split_sql_statements;
use crate::core::config::Dialect;
use crate::core::database::Database;
use crate::core::error::DatabaseError;
use crate::core::naming::REVISION_TABLE;
use crate::core::schema_change::SchemaChange;
use crate::core::script::{sql_checksum, SimpleScript};
use crate::core::version::DatabaseVersion;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::any::AnyRow;
use sqlx::{Any, AnyPool, Row, Transaction};
use tokio::sync::Mutex;
use tracing::debug;

/// リビジョン記録
///
/// schema_revision テーブルの1行に対応します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionRecord {
    /// 適用されたバージョン
    pub version: DatabaseVersion,
    /// 適用日時
    pub applied_at: DateTime<Utc>,
    /// 前進スクリプトのチェックサム
    pub checksum: String,
}

/// SQLデータベース
///
/// 開いているトランザクションがあればその上で、なければプール上で文を実行します。
pub struct SqlDatabase {
    pool: AnyPool,
    dialect: Dialect,
    transaction: Mutex<Option<Transaction<'static, Any>>>,
}

impl SqlDatabase {
    /// 新しいSqlDatabaseを作成
    pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
        Self {
            pool,
            dialect,
            transaction: Mutex::new(None),
        }
    }

    /// 接続プール
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// データベース方言
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// リビジョン記録テーブル作成SQLを生成
    pub fn generate_create_revision_table_sql(&self) -> String {
        match self.dialect {
            Dialect::PostgreSQL | Dialect::MySQL => format!(
                r#"CREATE TABLE IF NOT EXISTS {} (
    major BIGINT NOT NULL,
    minor BIGINT NOT NULL,
    point BIGINT NOT NULL,
    step BIGINT NOT NULL,
    applied_at VARCHAR(64) NOT NULL,
    checksum VARCHAR(64) NOT NULL,
    PRIMARY KEY (major, minor, point, step)
)"#,
                REVISION_TABLE
            ),
            Dialect::SQLite => format!(
                r#"CREATE TABLE IF NOT EXISTS {} (
    major INTEGER NOT NULL,
    minor INTEGER NOT NULL,
    point INTEGER NOT NULL,
    step INTEGER NOT NULL,
    applied_at TEXT NOT NULL,
    checksum TEXT NOT NULL,
    PRIMARY KEY (major, minor, point, step)
)"#,
                REVISION_TABLE
            ),
        }
    }

    /// リビジョン記録のINSERT SQLを生成（パラメータバインド用）
    pub fn generate_record_revision_sql(&self) -> String {
        let placeholders = match self.dialect {
            Dialect::PostgreSQL => "$1, $2, $3, $4, $5, $6".to_string(),
            Dialect::MySQL | Dialect::SQLite => "?, ?, ?, ?, ?, ?".to_string(),
        };
        format!(
            "INSERT INTO {} (major, minor, point, step, applied_at, checksum) VALUES ({})",
            REVISION_TABLE, placeholders
        )
    }

    /// 現在のリビジョン取得SQLを生成
    pub fn generate_current_revision_sql(&self) -> String {
        format!(
            "SELECT major, minor, point, step FROM {} ORDER BY major DESC, minor DESC, point DESC, step DESC LIMIT 1",
            REVISION_TABLE
        )
    }

    /// リビジョン履歴取得SQLを生成
    pub fn generate_revision_history_sql(&self) -> String {
        format!(
            "SELECT major, minor, point, step, applied_at, checksum FROM {} ORDER BY major, minor, point, step",
            REVISION_TABLE
        )
    }

    /// リビジョン記録テーブルを作成（存在しない場合）
    pub async fn ensure_revision_table(&self) -> Result<(), DatabaseError> {
        let sql = self.generate_create_revision_table_sql();
        self.execute_sql(&sql).await
    }

    /// 適用済みリビジョンの履歴を昇順で取得
    pub async fn revision_history(&self) -> Result<Vec<RevisionRecord>, DatabaseError> {
        let sql = self.generate_revision_history_sql();

        let mut guard = self.transaction.lock().await;
        let rows = match guard.as_mut() {
            Some(tx) => sqlx::query(&sql).fetch_all(&mut **tx).await,
            None => sqlx::query(&sql).fetch_all(&self.pool).await,
        }
        .map_err(|e| DatabaseError::Query {
            message: format!("Failed to read revision history: {}", e),
            sql: Some(sql.clone()),
        })?;

        rows.iter()
            .map(|row| -> Result<RevisionRecord, DatabaseError> {
                let version = decode_version(row)?;
                let applied_at_str: String = row.try_get(4).map_err(decode_error)?;
                let checksum: String = row.try_get(5).map_err(decode_error)?;

                // RFC3339形式の日時文字列をパース
                let applied_at = DateTime::parse_from_rfc3339(&applied_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| DatabaseError::InvalidRevision {
                        message: format!("invalid applied_at '{}': {}", applied_at_str, e),
                    })?;

                Ok(RevisionRecord {
                    version,
                    applied_at,
                    checksum,
                })
            })
            .collect()
    }

    /// 1つの文を実行
    async fn execute_sql(&self, sql: &str) -> Result<(), DatabaseError> {
        let mut guard = self.transaction.lock().await;
        match guard.as_mut() {
            Some(tx) => sqlx::query(sql).execute(&mut **tx).await,
            None => sqlx::query(sql).execute(&self.pool).await,
        }
        .map(|_| ())
        .map_err(|e| DatabaseError::Query {
            message: format!("Failed to execute SQL: {}", e),
            sql: Some(sql.to_string()),
        })
    }

    /// スクリプトを文に分割して順に実行
    async fn execute_statements(&self, sql: &str) -> Result<(), DatabaseError> {
        for statement in split_sql_statements(sql, self.dialect) {
            self.execute_sql(&statement).await?;
        }
        Ok(())
    }

    /// リビジョンを記録
    async fn record_revision(
        &self,
        version: DatabaseVersion,
        checksum: &str,
    ) -> Result<(), DatabaseError> {
        let sql = self.generate_record_revision_sql();
        let query = sqlx::query(&sql)
            .bind(i64::from(version.major))
            .bind(i64::from(version.minor))
            .bind(i64::from(version.point))
            .bind(i64::from(version.step))
            .bind(Utc::now().to_rfc3339())
            .bind(checksum.to_string());

        let mut guard = self.transaction.lock().await;
        match guard.as_mut() {
            Some(tx) => query.execute(&mut **tx).await,
            None => query.execute(&self.pool).await,
        }
        .map(|_| ())
        .map_err(|e| DatabaseError::Query {
            message: format!("Failed to record revision {}: {}", version, e),
            sql: Some(sql.clone()),
        })
    }
}

fn decode_error(e: sqlx::Error) -> DatabaseError {
    DatabaseError::InvalidRevision {
        message: e.to_string(),
    }
}

fn decode_component(row: &AnyRow, index: usize) -> Result<u32, DatabaseError> {
    let value: i64 = row.try_get(index).map_err(decode_error)?;
    u32::try_from(value).map_err(|_| DatabaseError::InvalidRevision {
        message: format!("version component {} is out of range", value),
    })
}

fn decode_version(row: &AnyRow) -> Result<DatabaseVersion, DatabaseError> {
    Ok(DatabaseVersion::new(
        decode_component(row, 0)?,
        decode_component(row, 1)?,
        decode_component(row, 2)?,
        decode_component(row, 3)?,
    ))
}

#[async_trait]
impl Database for SqlDatabase {
    async fn revision(&self) -> Result<DatabaseVersion, DatabaseError> {
        let sql = self.generate_current_revision_sql();

        let mut guard = self.transaction.lock().await;
        let row = match guard.as_mut() {
            Some(tx) => sqlx::query(&sql).fetch_optional(&mut **tx).await,
            None => sqlx::query(&sql).fetch_optional(&self.pool).await,
        }
        .map_err(|e| DatabaseError::Query {
            message: format!("Failed to read current revision: {}", e),
            sql: Some(sql.clone()),
        })?;

        match row {
            Some(row) => decode_version(&row),
            None => Ok(DatabaseVersion::ZERO),
        }
    }

    async fn execute_update(&self, change: &dyn SchemaChange) -> Result<(), DatabaseError> {
        let script = change.forward_script();
        let sql = script.read_sql()?;
        debug!(version = %change.version(), script = %script.name(), "Executing forward script");

        self.execute_statements(&sql).await?;
        self.record_revision(change.version(), &sql_checksum(&sql))
            .await
    }

    async fn execute_script(&self, script: &dyn SimpleScript) -> Result<(), DatabaseError> {
        let sql = script.read_sql()?;
        debug!(script = %script.name(), "Executing script");
        self.execute_statements(&sql).await
    }

    async fn begin_transaction(&self) -> Result<(), DatabaseError> {
        let mut guard = self.transaction.lock().await;
        if guard.is_some() {
            return Err(DatabaseError::Transaction {
                message: "A transaction is already open".to_string(),
            });
        }

        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::Transaction {
                message: format!("Failed to start transaction: {}", e),
            })?;
        *guard = Some(tx);
        Ok(())
    }

    async fn commit(&self) -> Result<(), DatabaseError> {
        let tx = self
            .transaction
            .lock()
            .await
            .take()
            .ok_or_else(|| DatabaseError::Transaction {
                message: "No open transaction to commit".to_string(),
            })?;

        tx.commit().await.map_err(|e| DatabaseError::Transaction {
            message: format!("Failed to commit transaction: {}", e),
        })
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        let tx = self
            .transaction
            .lock()
            .await
            .take()
            .ok_or_else(|| DatabaseError::Transaction {
                message: "No open transaction to roll back".to_string(),
            })?;

        tx.rollback().await.map_err(|e| DatabaseError::Transaction {
            message: format!("Failed to roll back transaction: {}", e),
        })
    }
}
