// statusコマンドハンドラー
//
// データベースの現在のリビジョンと未適用の変更を表示します。
// - データベース接続とリビジョン記録テーブルの読み込み
// - 検出済みの変更との照合（上限バージョンを考慮）

use crate::adapters::sql_database::RevisionRecord;
use crate::cli::command_context::CommandContext;
use crate::cli::commands::list::ChangeEntry;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::database::Database;
use crate::core::version::DatabaseVersion;
use crate::services::change_provider::ProvideSchemaChanges;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// statusコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    /// 現在のリビジョン
    pub revision: DatabaseVersion,
    /// 適用の上限バージョン
    pub target_revision: Option<DatabaseVersion>,
    /// 未適用の変更（適用順）
    pub pending: Vec<ChangeEntry>,
    /// 適用済みリビジョンの履歴
    pub history: Vec<RevisionRecord>,
}

impl CommandOutput for StatusOutput {
    fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{} {}\n",
            "Current revision:".bold(),
            self.revision.to_string().cyan()
        ));
        if let Some(target) = self.target_revision {
            output.push_str(&format!("{} {}\n", "Target revision:".bold(), target));
            if target < self.revision {
                output.push_str(&format!(
                    "{}\n",
                    "⚠ Target revision is below the current revision".yellow()
                ));
            }
        }
        output.push_str(&format!(
            "{} {}\n",
            "Applied revisions:".bold(),
            self.history.len()
        ));

        if self.pending.is_empty() {
            output.push_str(&format!("\n{}", "✓ Database is up to date".green()));
            return output;
        }

        output.push_str(&format!(
            "\n{} ({})\n",
            "Pending changes".bold(),
            self.pending.len()
        ));
        for change in &self.pending {
            output.push_str(&format!("  {} {}\n", "•".yellow(), change.to_line()));
        }

        output.trim_end().to_string()
    }
}

/// statusコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct StatusCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: String,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// statusコマンドハンドラー
#[derive(Debug, Default)]
pub struct StatusCommandHandler {}

impl StatusCommandHandler {
    /// 新しいStatusCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// statusコマンドを実行
    ///
    /// # Arguments
    ///
    /// * `command` - statusコマンドのパラメータ
    ///
    /// # Returns
    ///
    /// 成功時は現在のリビジョンと未適用の変更、失敗時はエラーメッセージ
    pub async fn execute(&self, command: &StatusCommand) -> Result<String> {
        let context = CommandContext::load_with_config(
            command.project_path.clone(),
            command.config_path.clone(),
        )?;
        let options = context.config.update_options();

        let changes = context
            .change_provider()
            .get_all_changes()
            .with_context(|| "Failed to load schema changes")?;

        let database = context.connect_database(&command.env, None).await?;
        let revision = database
            .revision()
            .await
            .with_context(|| "Failed to read database revision")?;
        let history = database
            .revision_history()
            .await
            .with_context(|| "Failed to read revision history")?;
        debug!(revision = %revision, applied = history.len(), "Loaded database revision");

        let pending = changes
            .iter()
            .filter(|change| {
                change.needs_to_be_applied_to(revision) && options.allows(change.version())
            })
            .map(|change| ChangeEntry::from_change(change.as_ref()))
            .collect();

        let output = StatusOutput {
            revision,
            target_revision: options.target_revision,
            pending,
            history,
        };

        let rendered = render_output(&output, &command.format);
        database.pool().close().await;
        rendered
    }
}
