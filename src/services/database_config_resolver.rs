// データベース設定の解決サービス
//
// 環境変数による上書きをCLI/サービス層で扱い、coreは純粋な構造体に保つ。

use crate::core::config::DatabaseConfig;

/// データベース設定の解決ユーティリティ
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfigResolver;

impl DatabaseConfigResolver {
    /// 環境変数による上書きを適用
    pub fn apply_env_overrides(base: &DatabaseConfig) -> DatabaseConfig {
        Self::apply_overrides(base, |key| std::env::var(key).ok())
    }

    /// 任意の値取得関数で上書きを適用
    pub fn apply_overrides<F>(base: &DatabaseConfig, lookup: F) -> DatabaseConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = base.clone();

        if let Some(host) = lookup("DB_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("DB_PORT") {
            if let Ok(port_num) = port.parse::<u16>() {
                config.port = Some(port_num);
            }
        }
        if let Some(database) = lookup("DB_DATABASE") {
            config.database = database;
        }
        if let Some(user) = lookup("DB_USER") {
            config.user = Some(user);
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            config.password = Some(password);
        }

        config
    }
}
