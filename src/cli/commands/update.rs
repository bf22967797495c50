// updateコマンドハンドラー
//
// スキーマ変更の適用機能を実装します。
// - 設定ファイルとCLIフラグから更新オプションを決定
// - データベース接続とリビジョン記録テーブルの準備
// - DatabaseUpdater による変更の適用と常時実行スクリプトの実行

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::config::UpdateOptions;
use crate::core::database::Database;
use crate::core::logger::TracingLogger;
use crate::core::version::DatabaseVersion;
use crate::services::database_updater::{DatabaseUpdater, UpdateReport};
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// updateコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutput {
    /// 更新結果
    #[serde(flatten)]
    pub report: UpdateReport,
    /// 更新後のリビジョン
    pub final_revision: DatabaseVersion,
}

impl CommandOutput for UpdateOutput {
    fn to_text(&self) -> String {
        let mut output = String::new();

        if self.report.applied.is_empty() {
            output.push_str(&format!(
                "{} (revision {})\n",
                "No pending schema changes".green(),
                self.report.starting_revision
            ));
        } else {
            for version in &self.report.applied {
                output.push_str(&format!("{} Applied {}\n", "✓".green(), version));
            }
            output.push_str(&format!(
                "\n{} {} change(s): {} -> {}\n",
                "Updated database:".bold(),
                self.report.applied_count(),
                self.report.starting_revision,
                self.final_revision.to_string().cyan()
            ));
        }

        output.push_str(&format!(
            "Ran {} always-run script(s)",
            self.report.always_run_count
        ));
        output
    }
}

/// updateコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct UpdateCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: String,
    /// 適用の上限バージョン（設定ファイルより優先）
    pub target: Option<String>,
    /// 変更ごとにコミットするかどうか（設定ファイルの値と論理和）
    pub incremental: bool,
    /// タイムアウト（秒）
    pub timeout: Option<u64>,
    /// 出力フォーマット
    pub format: OutputFormat,
}

impl UpdateCommand {
    /// 設定ファイルのオプションにCLIフラグを重ねる
    ///
    /// # Errors
    ///
    /// `--target` がバージョンとして解釈できない場合
    pub fn resolve_options(&self, base: UpdateOptions) -> Result<UpdateOptions> {
        let mut options = base;

        if let Some(target) = &self.target {
            let target: DatabaseVersion = target
                .parse()
                .with_context(|| format!("Invalid --target value '{}'", target))?;
            options = options.with_target_revision(Some(target));
        }
        if self.incremental {
            options = options.with_incremental_transactions(true);
        }

        Ok(options)
    }
}

/// updateコマンドハンドラー
#[derive(Debug, Default)]
pub struct UpdateCommandHandler {}

impl UpdateCommandHandler {
    /// 新しいUpdateCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// updateコマンドを実行
    ///
    /// # Arguments
    ///
    /// * `command` - updateコマンドのパラメータ
    ///
    /// # Returns
    ///
    /// 成功時は適用結果のサマリー、失敗時はエラーメッセージ
    pub async fn execute(&self, command: &UpdateCommand) -> Result<String> {
        let context = CommandContext::load_with_config(
            command.project_path.clone(),
            command.config_path.clone(),
        )?;

        // 設定エラーは変更の検出前に報告する
        let options = command.resolve_options(context.config.update_options())?;
        info!(
            env = %command.env,
            target = ?options.target_revision.map(|v| v.to_string()),
            incremental = options.use_incremental_transactions,
            "Starting database update"
        );

        let database = Arc::new(
            context
                .connect_database(&command.env, command.timeout)
                .await?,
        );

        let updater = DatabaseUpdater::new(
            Arc::new(context.change_provider()),
            Arc::new(context.always_run_provider()),
            Arc::clone(&database) as Arc<dyn Database>,
            Arc::new(TracingLogger::new()),
            options,
        );

        let result = updater.apply_updates().await;
        database.pool().close().await;
        let report = result.with_context(|| "Failed to update database")?;

        let output = UpdateOutput {
            final_revision: report.final_revision(),
            report,
        };
        render_output(&output, &command.format)
    }
}
