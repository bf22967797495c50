// 接続文字列ビルダー
//
// DatabaseConfig と Dialect から接続文字列を生成する。

use crate::core::config::{DatabaseConfig, Dialect};
use urlencoding::encode;

/// 接続文字列を生成
pub fn build_connection_string(dialect: Dialect, config: &DatabaseConfig) -> String {
    let port = config.port_or_default(dialect);
    match dialect {
        Dialect::PostgreSQL => {
            let user = config.user.as_deref().unwrap_or("postgres");
            format!(
                "postgresql://{}@{}:{}/{}",
                auth(user, config.password.as_deref()),
                config.host,
                port,
                config.database
            )
        }
        Dialect::MySQL => {
            let user = config.user.as_deref().unwrap_or("root");
            format!(
                "mysql://{}@{}:{}/{}",
                auth(user, config.password.as_deref()),
                config.host,
                port,
                config.database
            )
        }
        // ファイルが無ければ作成する
        Dialect::SQLite => format!("sqlite://{}?mode=rwc", config.database),
    }
}

/// ユーザー名とパスワードはURLエンコードする
fn auth(user: &str, password: Option<&str>) -> String {
    let encoded_user = encode(user);
    match password {
        Some(password) if !password.is_empty() => {
            format!("{}:{}", encoded_user, encode(password))
        }
        _ => encoded_user.into_owned(),
    }
}
