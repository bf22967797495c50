// スクリプト成果物
//
// SQLスクリプトの参照を抽象化します。
// ファイルに保存されたスクリプトとメモリ上のスクリプトの2種類を提供します。

use crate::core::error::IoError;
use sha2::{Digest, Sha256};
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

/// 単純なSQLスクリプト
///
/// バージョンを持たず、内容を読み出せることだけを要求します。
pub trait SimpleScript: Debug + Send + Sync {
    /// 表示用の名前
    fn name(&self) -> String;

    /// SQL本文を読み込む
    fn read_sql(&self) -> Result<String, IoError>;

    /// SQL本文のSHA-256チェックサム（16進数）
    fn checksum(&self) -> Result<String, IoError> {
        Ok(sql_checksum(&self.read_sql()?))
    }
}

/// SQL本文のSHA-256チェックサムを計算
pub fn sql_checksum(sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// ファイルに保存されたスクリプト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileScript {
    path: PathBuf,
}

impl FileScript {
    /// 新しいFileScriptを作成
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// スクリプトファイルのパス
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SimpleScript for FileScript {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn read_sql(&self) -> Result<String, IoError> {
        if !self.path.exists() {
            return Err(IoError::FileNotFound {
                path: self.path.display().to_string(),
            });
        }

        fs::read_to_string(&self.path).map_err(|e| IoError::FileRead {
            path: self.path.display().to_string(),
            cause: e.to_string(),
        })
    }
}

/// メモリ上に保持されたスクリプト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineScript {
    name: String,
    sql: String,
}

impl InlineScript {
    /// 新しいInlineScriptを作成
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

impl SimpleScript for InlineScript {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn read_sql(&self) -> Result<String, IoError> {
        Ok(self.sql.clone())
    }
}
