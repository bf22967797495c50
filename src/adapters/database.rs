// データベース接続アダプター
//
// SQLxを使用したデータベース接続の管理を行います。
// PostgreSQL、MySQL、SQLiteに対応した統一されたインターフェースを提供します。

use crate::adapters::connection_string::build_connection_string;
use crate::core::config::{DatabaseConfig, Dialect};
use crate::core::error::DatabaseError;
use sqlx::pool::PoolOptions;
use sqlx::{Any, AnyPool};
use std::time::Duration;
use tracing::debug;

/// 既定の接続取得タイムアウト（秒）
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// データベース接続サービス
///
/// データベース接続プールの初期化と管理を行います。
#[derive(Debug, Clone, Default)]
pub struct DatabaseConnectionService {}

impl DatabaseConnectionService {
    /// 新しいDatabaseConnectionServiceを作成
    pub fn new() -> Self {
        Self {}
    }

    /// データベース接続プールを作成
    ///
    /// # Arguments
    ///
    /// * `dialect` - データベース方言
    /// * `config` - データベース設定
    ///
    /// # Returns
    ///
    /// 接続プールまたはエラー
    pub async fn create_pool(
        &self,
        dialect: Dialect,
        config: &DatabaseConfig,
    ) -> Result<AnyPool, DatabaseError> {
        sqlx::any::install_default_drivers();

        let connection_string = build_connection_string(dialect, config);
        debug!(dialect = %dialect, database = %config.database, "Connecting to database");

        self.create_pool_options(config.timeout)
            .connect(&connection_string)
            .await
            .map_err(|e| DatabaseError::Connection {
                message: format!("Failed to create connection pool for {}", dialect),
                cause: e.to_string(),
            })
    }

    /// プールオプションを作成
    ///
    /// 更新は1本の接続上で順番に行うため、接続数は1に制限します。
    pub fn create_pool_options(&self, timeout_secs: Option<u64>) -> PoolOptions<Any> {
        let timeout = timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        PoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(timeout))
    }

    /// 接続プールを閉じる
    pub async fn close_pool(&self, pool: AnyPool) {
        pool.close().await;
    }
}
