// コマンド共通コンテキスト
//
// 設定ファイル読み込みやパス解決の重複をCLI層で集約する。

use crate::adapters::database::DatabaseConnectionService;
use crate::adapters::sql_database::SqlDatabase;
use crate::core::config::{Config, DatabaseConfig, Dialect};
use crate::services::always_run::FileSystemAlwaysRunScriptProvider;
use crate::services::change_provider::FileSystemSchemaChangeProvider;
use crate::services::config_loader::ConfigLoader;
use crate::services::database_config_resolver::DatabaseConfigResolver;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// CLIコマンド共通の実行コンテキスト
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub project_path: PathBuf,
    pub config_path: PathBuf,
    pub config: Config,
}

impl CommandContext {
    /// プロジェクトルートから設定を読み込んでコンテキストを作成
    pub fn load(project_path: PathBuf) -> Result<Self> {
        Self::load_with_config(project_path, None)
    }

    /// カスタム設定ファイルパスを指定してコンテキストを作成
    pub fn load_with_config(
        project_path: PathBuf,
        custom_config_path: Option<PathBuf>,
    ) -> Result<Self> {
        let config_path = custom_config_path
            .unwrap_or_else(|| project_path.join(Config::DEFAULT_CONFIG_PATH));

        if !config_path.exists() {
            return Err(anyhow!("Config file not found: {:?}", config_path));
        }

        let config =
            ConfigLoader::from_file(&config_path).with_context(|| "Failed to read config file")?;

        Ok(Self {
            project_path,
            config_path,
            config,
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_path.join(path)
        }
    }

    /// スキーマ変更ディレクトリの絶対パス
    pub fn change_scripts_dir(&self) -> PathBuf {
        self.resolve(&self.config.change_scripts_dir)
    }

    /// 常時実行スクリプトディレクトリの絶対パス
    pub fn always_run_dir(&self) -> PathBuf {
        self.resolve(&self.config.always_run_dir)
    }

    /// スキーマ変更プロバイダー
    pub fn change_provider(&self) -> FileSystemSchemaChangeProvider {
        FileSystemSchemaChangeProvider::new(self.change_scripts_dir())
    }

    /// 常時実行スクリプトプロバイダー
    pub fn always_run_provider(&self) -> FileSystemAlwaysRunScriptProvider {
        FileSystemAlwaysRunScriptProvider::new(self.always_run_dir())
    }

    /// 環境に応じたデータベース設定を取得（環境変数上書き込み）
    pub fn database_config(&self, env: &str) -> Result<DatabaseConfig> {
        let config = self
            .config
            .get_database_config(env)
            .with_context(|| format!("Config for environment '{}' not found", env))?;
        Ok(DatabaseConfigResolver::apply_env_overrides(&config))
    }

    /// データベース方言を取得
    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// タイムアウト付きでDB接続を確立し、リビジョン記録テーブルを作成（未作成の場合）
    pub async fn connect_database(&self, env: &str, timeout: Option<u64>) -> Result<SqlDatabase> {
        let mut db_config = self.database_config(env)?;
        if let Some(t) = timeout {
            db_config.timeout = Some(t);
        }

        let pool = DatabaseConnectionService::new()
            .create_pool(self.config.dialect, &db_config)
            .await
            .with_context(|| "Failed to connect to database")?;

        let database = SqlDatabase::new(pool, self.config.dialect);
        database
            .ensure_revision_table()
            .await
            .with_context(|| "Failed to create revision table")?;

        Ok(database)
    }
}
