// listコマンドハンドラー
//
// データベースに接続せずにスキーマ変更の連鎖を検出・検証し、
// 常時実行スクリプトと合わせて一覧表示します。

use crate::cli::command_context::CommandContext;
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::schema_change::SchemaChange;
use crate::core::script::SimpleScript;
use crate::core::version::DatabaseVersion;
use crate::services::always_run::ProvideAlwaysRunScripts;
use crate::services::change_provider::ProvideSchemaChanges;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// スキーマ変更エントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEntry {
    pub previous_version: DatabaseVersion,
    pub version: DatabaseVersion,
    pub description: Option<String>,
}

impl ChangeEntry {
    /// スキーマ変更からエントリを作成
    pub fn from_change(change: &dyn SchemaChange) -> Self {
        Self {
            previous_version: change.previous_version(),
            version: change.version(),
            description: change.description().map(str::to_string),
        }
    }

    /// 一覧表示用の1行
    pub fn to_line(&self) -> String {
        match &self.description {
            Some(description) => format!(
                "{} <- {}  {}",
                self.version, self.previous_version, description
            ),
            None => format!("{} <- {}", self.version, self.previous_version),
        }
    }
}

/// listコマンドの出力構造体
#[derive(Debug, Clone, Serialize)]
pub struct ListOutput {
    /// スキーマ変更一覧（バージョン昇順）
    pub changes: Vec<ChangeEntry>,
    /// 常時実行スクリプト一覧（実行順）
    pub always_run: Vec<String>,
}

impl CommandOutput for ListOutput {
    fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{} ({})\n",
            "Schema changes".bold(),
            self.changes.len()
        ));
        if self.changes.is_empty() {
            output.push_str("  (none)\n");
        }
        for change in &self.changes {
            output.push_str(&format!("  {}\n", change.to_line()));
        }

        output.push_str(&format!(
            "\n{} ({})\n",
            "Always-run scripts".bold(),
            self.always_run.len()
        ));
        if self.always_run.is_empty() {
            output.push_str("  (none)\n");
        }
        for script in &self.always_run {
            output.push_str(&format!("  {}\n", script));
        }

        output.push_str(&format!("\n{}", "✓ Change chain is valid".green()));
        output
    }
}

/// listコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct ListCommand {
    /// プロジェクトのルートパス
    pub project_path: PathBuf,
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// listコマンドハンドラー
#[derive(Debug, Default)]
pub struct ListCommandHandler {}

impl ListCommandHandler {
    /// 新しいListCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// listコマンドを実行
    ///
    /// # Arguments
    ///
    /// * `command` - listコマンドのパラメータ
    ///
    /// # Returns
    ///
    /// 成功時は変更一覧、連鎖が壊れている場合はエラー
    pub fn execute(&self, command: &ListCommand) -> Result<String> {
        let context = CommandContext::load_with_config(
            command.project_path.clone(),
            command.config_path.clone(),
        )?;

        let changes = context
            .change_provider()
            .get_all_changes()
            .with_context(|| "Failed to load schema changes")?;
        let scripts = context
            .always_run_provider()
            .get_scripts()
            .with_context(|| "Failed to load always-run scripts")?;
        debug!(
            changes = changes.len(),
            always_run = scripts.len(),
            "Loaded change sources"
        );

        let output = ListOutput {
            changes: changes
                .iter()
                .map(|change| ChangeEntry::from_change(change.as_ref()))
                .collect(),
            always_run: scripts.iter().map(|script| script.name()).collect(),
        };

        render_output(&output, &command.format)
    }
}
