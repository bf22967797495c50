// データベース更新サービス
//
// 検出済みのスキーマ変更のうち、現在のリビジョンより新しく上限バージョン以内のものを
// 昇順に1つずつ適用し、最後に常時実行スクリプトを実行します。
// - 一括モード: 全ての変更を1つのトランザクションで適用し、最後に1回だけコミット
// - 増分モード: 変更ごとにトランザクションを開始・コミット

use crate::core::config::UpdateOptions;
use crate::core::database::Database;
use crate::core::error::{DatabaseError, UpdateError};
use crate::core::logger::UpdateLogger;
use crate::core::schema_change::SchemaChange;
use crate::core::script::SimpleScript;
use crate::core::version::DatabaseVersion;
use crate::services::always_run::ProvideAlwaysRunScripts;
use crate::services::change_provider::ProvideSchemaChanges;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// コミット時に出力するメッセージ
pub const COMMIT_MESSAGE: &str = "Committing transaction...";

/// 更新結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    /// 更新開始時のリビジョン
    pub starting_revision: DatabaseVersion,
    /// 適用したバージョン（昇順）
    pub applied: Vec<DatabaseVersion>,
    /// 実行した常時実行スクリプト数
    pub always_run_count: usize,
}

impl UpdateReport {
    /// 適用した変更数
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// 更新後のリビジョン
    pub fn final_revision(&self) -> DatabaseVersion {
        self.applied
            .last()
            .copied()
            .unwrap_or(self.starting_revision)
    }
}

/// データベース更新サービス
///
/// 協調オブジェクトは全てコンストラクタで注入します。
pub struct DatabaseUpdater {
    change_provider: Arc<dyn ProvideSchemaChanges>,
    always_run_provider: Arc<dyn ProvideAlwaysRunScripts>,
    database: Arc<dyn Database>,
    logger: Arc<dyn UpdateLogger>,
    options: UpdateOptions,
}

impl DatabaseUpdater {
    /// 新しいDatabaseUpdaterを作成
    pub fn new(
        change_provider: Arc<dyn ProvideSchemaChanges>,
        always_run_provider: Arc<dyn ProvideAlwaysRunScripts>,
        database: Arc<dyn Database>,
        logger: Arc<dyn UpdateLogger>,
        options: UpdateOptions,
    ) -> Self {
        Self {
            change_provider,
            always_run_provider,
            database,
            logger,
            options,
        }
    }

    /// 未適用の変更を適用し、常時実行スクリプトを実行する
    ///
    /// # Returns
    ///
    /// 開始リビジョンと適用したバージョンの一覧
    ///
    /// # Errors
    ///
    /// - 変更または常時実行スクリプトの検出に失敗した場合（何も適用されない）
    /// - 変更の適用に失敗した場合（以降の変更と常時実行スクリプトは実行されない）
    /// - 常時実行スクリプトの実行に失敗した場合
    pub async fn apply_updates(&self) -> Result<UpdateReport, UpdateError> {
        self.logger.info("About to update database...");

        // 検出はデータベースに触れる前に全て終える
        let changes = self.change_provider.get_all_changes()?;
        let scripts = self.always_run_provider.get_scripts()?;
        let current = self
            .database
            .revision()
            .await
            .map_err(UpdateError::Database)?;
        debug!(
            revision = %current,
            available = changes.len(),
            always_run = scripts.len(),
            "Inspected database revision"
        );

        if let Some(target) = self.options.target_revision {
            if target < current {
                warn!(
                    target = %target,
                    revision = %current,
                    "Target revision is below the current revision; no changes will be applied"
                );
            }
        }

        let pending: Vec<&dyn SchemaChange> = changes
            .iter()
            .map(|change| change.as_ref())
            .filter(|change| {
                change.needs_to_be_applied_to(current) && self.options.allows(change.version())
            })
            .collect();
        debug!(pending = pending.len(), "Selected pending changes");

        let applied = if self.options.use_incremental_transactions {
            self.apply_incrementally(&pending).await?
        } else {
            self.apply_in_single_transaction(&pending).await?
        };

        let always_run_count = self
            .run_always_run_scripts(&scripts, applied.last().copied())
            .await?;

        Ok(UpdateReport {
            starting_revision: current,
            applied,
            always_run_count,
        })
    }

    /// 変更ごとにトランザクションを開始・コミットして適用
    async fn apply_incrementally(
        &self,
        pending: &[&dyn SchemaChange],
    ) -> Result<Vec<DatabaseVersion>, UpdateError> {
        let mut applied = Vec::with_capacity(pending.len());

        for change in pending {
            let version = change.version();
            let last_applied = applied.last().copied();
            let failed = |source: DatabaseError| UpdateError::Execution {
                failed_version: version,
                last_applied,
                source,
            };

            self.log_applying(version);
            self.database.begin_transaction().await.map_err(failed)?;

            if let Err(source) = self.database.execute_update(*change).await {
                self.rollback_after_failure(version).await;
                return Err(failed(source));
            }

            self.logger.info(COMMIT_MESSAGE);
            self.database.commit().await.map_err(failed)?;
            applied.push(version);
        }

        Ok(applied)
    }

    /// 全ての変更を1つのトランザクションで適用
    async fn apply_in_single_transaction(
        &self,
        pending: &[&dyn SchemaChange],
    ) -> Result<Vec<DatabaseVersion>, UpdateError> {
        let (Some(first), Some(last)) = (pending.first(), pending.last()) else {
            return Ok(Vec::new());
        };

        // 一括モードではコミット前の失敗は全てロールバックされるため、確定済みバージョンは常にない
        let failed = |version: DatabaseVersion| {
            move |source: DatabaseError| UpdateError::Execution {
                failed_version: version,
                last_applied: None,
                source,
            }
        };

        self.database
            .begin_transaction()
            .await
            .map_err(failed(first.version()))?;

        for change in pending {
            let version = change.version();
            self.log_applying(version);

            if let Err(source) = self.database.execute_update(*change).await {
                self.rollback_after_failure(version).await;
                return Err(failed(version)(source));
            }
        }

        self.logger.info(COMMIT_MESSAGE);
        self.database
            .commit()
            .await
            .map_err(failed(last.version()))?;

        Ok(pending.iter().map(|change| change.version()).collect())
    }

    /// 常時実行スクリプトを検出順に実行
    async fn run_always_run_scripts(
        &self,
        scripts: &[Box<dyn SimpleScript>],
        last_applied: Option<DatabaseVersion>,
    ) -> Result<usize, UpdateError> {
        for script in scripts {
            let name = script.name();
            self.logger
                .info(&format!("Running always-run script {}...", name));
            self.database
                .execute_script(script.as_ref())
                .await
                .map_err(|source| UpdateError::AlwaysRun {
                    script: name.clone(),
                    last_applied,
                    source,
                })?;
        }

        Ok(scripts.len())
    }

    fn log_applying(&self, version: DatabaseVersion) {
        self.logger.info(&format!(
            "Applying update for database version {}...",
            version
        ));
    }

    /// 失敗時のロールバック（元のエラーを優先し、ロールバックの失敗は警告に留める）
    async fn rollback_after_failure(&self, version: DatabaseVersion) {
        if let Err(e) = self.database.rollback().await {
            warn!(version = %version, error = %e, "Failed to roll back transaction");
        }
    }
}
