// エラー型定義
//
// アプリケーション全体で使用されるカスタムエラー型を提供します。
// thiserrorを使用して、VersionParseError, DiscoveryError, DatabaseError,
// IoError, UpdateError を定義します。

use crate::core::version::DatabaseVersion;
use std::path::PathBuf;
use thiserror::Error;

/// バージョン解析エラー
///
/// `major.minor.point.step` 形式でない文字列を解析した場合に発生します。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid database version '{input}': {reason}")]
pub struct VersionParseError {
    /// 解析対象の文字列
    pub input: String,
    /// 失敗理由
    pub reason: String,
}

impl VersionParseError {
    /// 新しいバージョン解析エラーを作成
    pub fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// 検出エラー
///
/// スキーマ変更の検出・順序付け時に発生するエラーを表現します。
/// いずれもデータベースへの変更が行われる前に発生します。
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Change source directory not found
    #[error("Change script directory not found: {path}")]
    DirectoryNotFound {
        /// ディレクトリパス
        path: PathBuf,
    },

    /// Folder name does not encode `{previous}_{version}`
    #[error("Invalid schema change folder name '{name}': {reason}")]
    InvalidFolderName {
        /// フォルダ名
        name: String,
        /// 不正な理由
        reason: String,
    },

    /// Two changes declare the same version
    #[error("Duplicate schema change version {version} (scripts: '{first}' and '{second}')")]
    DuplicateVersion {
        /// 重複したバージョン
        version: DatabaseVersion,
        /// 1つ目の変更
        first: String,
        /// 2つ目の変更
        second: String,
    },

    /// Previous-version linkage has a gap or a branch
    #[error(
        "Broken schema change chain at version {version}: expected previous version {expected}, found {actual}"
    )]
    BrokenChain {
        /// 連鎖が途切れた変更のバージョン
        version: DatabaseVersion,
        /// 期待される前バージョン
        expected: DatabaseVersion,
        /// 実際に宣言された前バージョン
        actual: DatabaseVersion,
    },

    /// A change does not advance past its own previous version
    #[error("Schema change {version} does not advance past its previous version {previous_version}")]
    NonAdvancingChange {
        /// 変更のバージョン
        version: DatabaseVersion,
        /// 宣言された前バージョン
        previous_version: DatabaseVersion,
    },

    /// A change folder lacks its forward or backward script
    #[error("Schema change folder {folder} is missing required script '{file}'")]
    MissingScript {
        /// 変更フォルダ
        folder: PathBuf,
        /// 見つからないファイル名
        file: String,
    },

    /// Filesystem read error
    #[error("Failed to read {path} (cause: {cause})")]
    Io {
        /// 対象パス
        path: PathBuf,
        /// エラー原因
        cause: String,
    },
}

impl DiscoveryError {
    /// ディレクトリ未検出エラーかどうか
    pub fn is_directory_not_found(&self) -> bool {
        matches!(self, DiscoveryError::DirectoryNotFound { .. })
    }

    /// フォルダ名不正エラーかどうか
    pub fn is_invalid_folder_name(&self) -> bool {
        matches!(self, DiscoveryError::InvalidFolderName { .. })
    }

    /// バージョン重複エラーかどうか
    pub fn is_duplicate_version(&self) -> bool {
        matches!(self, DiscoveryError::DuplicateVersion { .. })
    }

    /// 連鎖不整合エラーかどうか
    pub fn is_broken_chain(&self) -> bool {
        matches!(self, DiscoveryError::BrokenChain { .. })
    }

    /// 前バージョン以下の変更エラーかどうか
    pub fn is_non_advancing_change(&self) -> bool {
        matches!(self, DiscoveryError::NonAdvancingChange { .. })
    }

    /// スクリプト欠落エラーかどうか
    pub fn is_missing_script(&self) -> bool {
        matches!(self, DiscoveryError::MissingScript { .. })
    }
}

/// データベースエラー
///
/// データベース操作時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection error
    #[error("Database connection error: {message} (cause: {cause})")]
    Connection {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Query execution error
    #[error("Query execution error: {message}")]
    Query {
        /// エラーメッセージ
        message: String,
        /// 失敗したSQL
        sql: Option<String>,
    },

    /// Transaction error
    #[error("Transaction error: {message}")]
    Transaction {
        /// エラーメッセージ
        message: String,
    },

    /// Stored revision cannot be represented as a version
    #[error("Invalid revision stored in database: {message}")]
    InvalidRevision {
        /// エラーメッセージ
        message: String,
    },

    /// Script could not be loaded
    #[error("Script error: {0}")]
    Script(#[from] IoError),
}

impl DatabaseError {
    /// 接続エラーかどうか
    pub fn is_connection(&self) -> bool {
        matches!(self, DatabaseError::Connection { .. })
    }

    /// クエリエラーかどうか
    pub fn is_query(&self) -> bool {
        matches!(self, DatabaseError::Query { .. })
    }

    /// トランザクションエラーかどうか
    pub fn is_transaction(&self) -> bool {
        matches!(self, DatabaseError::Transaction { .. })
    }

    /// 失敗したSQL文を取得
    pub fn sql(&self) -> Option<&str> {
        match self {
            DatabaseError::Query { sql, .. } => sql.as_deref(),
            _ => None,
        }
    }
}

/// I/Oエラー
///
/// スクリプトファイル操作時に発生するエラーを表現します。
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound {
        /// ファイルパス
        path: String,
    },

    /// File read error
    #[error("Failed to read file: {path} (cause: {cause})")]
    FileRead {
        /// ファイルパス
        path: String,
        /// エラー原因
        cause: String,
    },
}

impl IoError {
    /// ファイルが見つからないエラーかどうか
    pub fn is_file_not_found(&self) -> bool {
        matches!(self, IoError::FileNotFound { .. })
    }

    /// ファイル読み込みエラーかどうか
    pub fn is_file_read(&self) -> bool {
        matches!(self, IoError::FileRead { .. })
    }
}

/// 更新エラー
///
/// 更新処理全体の失敗を表現します。
/// どこまで適用が進んだかを保持し、運用者が再開地点を判断できるようにします。
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Changes could not be discovered; nothing was applied
    #[error("Schema change discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Database could not be inspected or a transaction could not be opened
    #[error("Database error: {0}")]
    Database(#[source] DatabaseError),

    /// A versioned change failed
    #[error(
        "Failed to apply update for database version {failed_version} (last applied version: {}): {source}",
        format_last_applied(.last_applied)
    )]
    Execution {
        /// 失敗した変更のバージョン
        failed_version: DatabaseVersion,
        /// 確定済みの最終バージョン（なければ開始時点のリビジョンのまま）
        last_applied: Option<DatabaseVersion>,
        /// エラー原因
        #[source]
        source: DatabaseError,
    },

    /// An always-run script failed after the versioned changes were committed
    #[error(
        "Failed to execute always-run script '{script}' (last applied version: {}): {source}",
        format_last_applied(.last_applied)
    )]
    AlwaysRun {
        /// スクリプト名
        script: String,
        /// この実行で確定済みの最終バージョン
        last_applied: Option<DatabaseVersion>,
        /// エラー原因
        #[source]
        source: DatabaseError,
    },
}

impl UpdateError {
    /// 検出エラーかどうか
    pub fn is_discovery(&self) -> bool {
        matches!(self, UpdateError::Discovery(_))
    }

    /// 変更適用エラーかどうか
    pub fn is_execution(&self) -> bool {
        matches!(self, UpdateError::Execution { .. })
    }

    /// 常時実行スクリプトのエラーかどうか
    pub fn is_always_run(&self) -> bool {
        matches!(self, UpdateError::AlwaysRun { .. })
    }

    /// 確定済みの最終バージョンを取得
    pub fn last_applied(&self) -> Option<DatabaseVersion> {
        match self {
            UpdateError::Execution { last_applied, .. }
            | UpdateError::AlwaysRun { last_applied, .. } => *last_applied,
            _ => None,
        }
    }
}

fn format_last_applied(version: &Option<DatabaseVersion>) -> String {
    version.map_or_else(|| "none".to_string(), |v| v.to_string())
}
