// 常時実行スクリプトプロバイダー
//
// リビジョンに関係なく毎回実行するスクリプトを検出します。
// バージョンによる絞り込みは行わず、ファイル名順の安定した順序で返します。

use crate::core::error::DiscoveryError;
use crate::core::script::{FileScript, InlineScript, SimpleScript};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 常時実行スクリプトの提供元
pub trait ProvideAlwaysRunScripts: Send + Sync {
    /// 実行順に並んだスクリプトを取得
    fn get_scripts(&self) -> Result<Vec<Box<dyn SimpleScript>>, DiscoveryError>;
}

/// ファイルシステム上の常時実行スクリプトプロバイダー
///
/// ディレクトリ直下の `*.sql` ファイルをファイル名順に返します。
/// ディレクトリが存在しない場合は空のリストを返します。
#[derive(Debug, Clone)]
pub struct FileSystemAlwaysRunScriptProvider {
    dir: PathBuf,
}

impl FileSystemAlwaysRunScriptProvider {
    /// 新しいFileSystemAlwaysRunScriptProviderを作成
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn is_sql_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
}

impl ProvideAlwaysRunScripts for FileSystemAlwaysRunScriptProvider {
    fn get_scripts(&self) -> Result<Vec<Box<dyn SimpleScript>>, DiscoveryError> {
        if !self.dir.exists() {
            debug!(dir = %self.dir.display(), "Always-run script directory not found, skipping");
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| DiscoveryError::Io {
            path: self.dir.clone(),
            cause: e.to_string(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DiscoveryError::Io {
                path: self.dir.clone(),
                cause: e.to_string(),
            })?;
            let path = entry.path();
            if is_sql_file(&path) {
                paths.push(path);
            }
        }

        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        debug!(count = paths.len(), "Discovered always-run scripts");

        Ok(paths
            .into_iter()
            .map(|path| Box::new(FileScript::new(path)) as Box<dyn SimpleScript>)
            .collect())
    }
}

/// メモリ上の常時実行スクリプトプロバイダー
#[derive(Debug, Clone, Default)]
pub struct InMemoryAlwaysRunScriptProvider {
    scripts: Vec<InlineScript>,
}

impl InMemoryAlwaysRunScriptProvider {
    /// 新しいInMemoryAlwaysRunScriptProviderを作成
    pub fn new(scripts: Vec<InlineScript>) -> Self {
        Self { scripts }
    }
}

impl ProvideAlwaysRunScripts for InMemoryAlwaysRunScriptProvider {
    fn get_scripts(&self) -> Result<Vec<Box<dyn SimpleScript>>, DiscoveryError> {
        Ok(self
            .scripts
            .iter()
            .cloned()
            .map(|s| Box::new(s) as Box<dyn SimpleScript>)
            .collect())
    }
}
