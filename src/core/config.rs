// 設定ファイル管理
//
// プロジェクトの設定ファイル（YAML形式）の読み込み、検証、
// 環境別のデータベース接続設定と更新オプションの管理を行います。

use crate::core::naming::{DEFAULT_ALWAYS_RUN_DIR, DEFAULT_CHANGE_SCRIPTS_DIR};
use crate::core::version::DatabaseVersion;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

/// データベース方言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[serde(rename = "postgresql")]
    PostgreSQL,
    #[serde(rename = "mysql")]
    MySQL,
    #[serde(rename = "sqlite")]
    SQLite,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::PostgreSQL => write!(f, "postgresql"),
            Dialect::MySQL => write!(f, "mysql"),
            Dialect::SQLite => write!(f, "sqlite"),
        }
    }
}

/// 更新オプション
///
/// 更新エンジンのコンストラクタへ明示的に渡す設定値です。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// 適用の上限バージョン（Noneの場合は全て適用）
    pub target_revision: Option<DatabaseVersion>,
    /// 変更ごとにコミットするかどうか
    pub use_incremental_transactions: bool,
}

impl UpdateOptions {
    /// 既定のオプション（上限なし、一括コミット）
    pub fn new() -> Self {
        Self::default()
    }

    /// 上限バージョンを指定
    pub fn with_target_revision(mut self, target: Option<DatabaseVersion>) -> Self {
        self.target_revision = target;
        self
    }

    /// 変更ごとのコミットを指定
    pub fn with_incremental_transactions(mut self, enabled: bool) -> Self {
        self.use_incremental_transactions = enabled;
        self
    }

    /// 指定バージョンが上限以内かどうか
    pub fn allows(&self, version: DatabaseVersion) -> bool {
        self.target_revision.map_or(true, |target| version <= target)
    }
}

/// プロジェクト設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 設定ファイルのバージョン
    pub version: String,

    /// データベース方言
    pub dialect: Dialect,

    /// スキーマ変更ディレクトリ
    #[serde(default = "default_change_scripts_dir")]
    pub change_scripts_dir: PathBuf,

    /// 常時実行スクリプトディレクトリ
    #[serde(default = "default_always_run_dir")]
    pub always_run_dir: PathBuf,

    /// 適用の上限バージョン
    #[serde(default)]
    pub target_revision: Option<DatabaseVersion>,

    /// 変更ごとにコミットするかどうか
    #[serde(default)]
    pub use_incremental_transactions: bool,

    /// 環境別のデータベース設定
    pub environments: HashMap<String, DatabaseConfig>,
}

fn default_change_scripts_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CHANGE_SCRIPTS_DIR)
}

fn default_always_run_dir() -> PathBuf {
    PathBuf::from(DEFAULT_ALWAYS_RUN_DIR)
}

impl Config {
    /// デフォルトの設定ファイルパス
    pub const DEFAULT_CONFIG_PATH: &'static str = crate::core::naming::CONFIG_FILE;

    /// 指定された環境のデータベース設定を取得
    pub fn get_database_config(&self, environment: &str) -> Result<DatabaseConfig> {
        self.environments.get(environment).cloned().ok_or_else(|| {
            anyhow!(
                "Environment '{}' not found. Available environments: {:?}",
                environment,
                self.environments.keys().collect::<Vec<_>>()
            )
        })
    }

    /// 設定ファイルの更新オプション
    pub fn update_options(&self) -> UpdateOptions {
        UpdateOptions::new()
            .with_target_revision(self.target_revision)
            .with_incremental_transactions(self.use_incremental_transactions)
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> Result<()> {
        // バージョンチェック
        if self.version.is_empty() {
            return Err(anyhow!("Config file version is not specified"));
        }

        // 環境設定チェック
        if self.environments.is_empty() {
            return Err(anyhow!(
                "At least one environment configuration is required"
            ));
        }

        if self.change_scripts_dir.as_os_str().is_empty() {
            return Err(anyhow!("change_scripts_dir must not be empty"));
        }

        // 各環境のデータベース設定を検証
        for (env_name, db_config) in &self.environments {
            db_config
                .validate()
                .with_context(|| format!("Invalid config for environment '{}'", env_name))?;
        }

        Ok(())
    }
}

/// std::str::FromStrトレイトの実装
impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(yaml: &str) -> Result<Self, Self::Err> {
        serde_saphyr::from_str(yaml).with_context(|| "Failed to parse config file")
    }
}

/// データベース接続設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// ホスト名（SQLiteの場合は不要）
    #[serde(default = "default_host")]
    pub host: String,

    /// ポート番号（省略時は方言の既定値）
    #[serde(default)]
    pub port: Option<u16>,

    /// データベース名（SQLiteの場合はファイルパス）
    pub database: String,

    /// ユーザー名
    pub user: Option<String>,

    /// パスワード
    pub password: Option<String>,

    /// 接続タイムアウト（秒）
    pub timeout: Option<u64>,
}

fn default_host() -> String {
    "localhost".to_string()
}

impl DatabaseConfig {
    /// Validate database configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(anyhow!("Database name is not specified"));
        }

        Ok(())
    }

    /// 方言に応じたポート番号
    pub fn port_or_default(&self, dialect: Dialect) -> u16 {
        self.port.unwrap_or(match dialect {
            Dialect::PostgreSQL => 5432,
            Dialect::MySQL => 3306,
            Dialect::SQLite => 0,
        })
    }
}
