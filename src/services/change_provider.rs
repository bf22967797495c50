// スキーマ変更プロバイダー
//
// 変更ソースから全てのスキーマ変更を検出し、バージョン昇順に並べ、
// 前バージョンの連鎖が途切れていないことを検証します。

use crate::core::error::{DiscoveryError, VersionParseError};
use crate::core::naming::{BACKWARD_SCRIPT_FILE, FORWARD_SCRIPT_FILE};
use crate::core::schema_change::{FileSchemaChange, InMemorySchemaChange, SchemaChange};
use crate::core::version::DatabaseVersion;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// フォルダ名の形式: `{previous}_{version}` または `{previous}_{version}_{description}`
static CHANGE_FOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+\.\d+\.\d+\.\d+)_(\d+\.\d+\.\d+\.\d+)(?:_(.+))?$")
        .expect("change folder pattern is valid")
});

/// スキーマ変更の提供元
pub trait ProvideSchemaChanges: Send + Sync {
    /// 全てのスキーマ変更をバージョン昇順で取得
    fn get_all_changes(&self) -> Result<Vec<Box<dyn SchemaChange>>, DiscoveryError>;
}

/// ファイルシステム上のスキーマ変更プロバイダー
///
/// ルートディレクトリ直下の1フォルダを1つの変更として扱います。
#[derive(Debug, Clone)]
pub struct FileSystemSchemaChangeProvider {
    root: PathBuf,
}

impl FileSystemSchemaChangeProvider {
    /// 新しいFileSystemSchemaChangeProviderを作成
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// ルート直下の変更フォルダをファイル名順に列挙
    fn change_folders(&self) -> Result<Vec<(String, PathBuf)>, DiscoveryError> {
        if !self.root.is_dir() {
            return Err(DiscoveryError::DirectoryNotFound {
                path: self.root.clone(),
            });
        }

        let entries = fs::read_dir(&self.root).map_err(|e| DiscoveryError::Io {
            path: self.root.clone(),
            cause: e.to_string(),
        })?;

        let mut folders = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DiscoveryError::Io {
                path: self.root.clone(),
                cause: e.to_string(),
            })?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();

            // .で始まるディレクトリはスキップ
            if name.starts_with('.') {
                continue;
            }

            folders.push((name, path));
        }

        folders.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(folders)
    }

    /// 1つの変更フォルダからFileSchemaChangeを作成
    fn load_change(&self, name: &str, path: &Path) -> Result<FileSchemaChange, DiscoveryError> {
        let (previous_version, version, description) = parse_change_folder_name(name)?;

        let folder = fs::canonicalize(path).map_err(|e| DiscoveryError::Io {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;

        for file in [FORWARD_SCRIPT_FILE, BACKWARD_SCRIPT_FILE] {
            if !folder.join(file).is_file() {
                return Err(DiscoveryError::MissingScript {
                    folder,
                    file: file.to_string(),
                });
            }
        }

        Ok(FileSchemaChange::new(
            previous_version,
            version,
            description,
            folder,
        ))
    }
}

impl ProvideSchemaChanges for FileSystemSchemaChangeProvider {
    fn get_all_changes(&self) -> Result<Vec<Box<dyn SchemaChange>>, DiscoveryError> {
        let mut changes: Vec<Box<dyn SchemaChange>> = Vec::new();
        for (name, path) in self.change_folders()? {
            let change = self.load_change(&name, &path)?;
            debug!(
                folder = %name,
                version = %change.version(),
                previous_version = %change.previous_version(),
                "Discovered schema change"
            );
            changes.push(Box::new(change));
        }

        order_and_validate(changes)
    }
}

/// メモリ上のスキーマ変更プロバイダー
#[derive(Debug, Clone, Default)]
pub struct InMemorySchemaChangeProvider {
    changes: Vec<InMemorySchemaChange>,
}

impl InMemorySchemaChangeProvider {
    /// 新しいInMemorySchemaChangeProviderを作成
    pub fn new(changes: Vec<InMemorySchemaChange>) -> Self {
        Self { changes }
    }
}

impl ProvideSchemaChanges for InMemorySchemaChangeProvider {
    fn get_all_changes(&self) -> Result<Vec<Box<dyn SchemaChange>>, DiscoveryError> {
        let changes = self
            .changes
            .iter()
            .cloned()
            .map(|c| Box::new(c) as Box<dyn SchemaChange>)
            .collect();
        order_and_validate(changes)
    }
}

/// フォルダ名から (前バージョン, バージョン, 説明) を取り出す
///
/// # Errors
///
/// 形式が一致しない場合、またはバージョンが範囲外の場合は InvalidFolderName
pub fn parse_change_folder_name(
    name: &str,
) -> Result<(DatabaseVersion, DatabaseVersion, Option<String>), DiscoveryError> {
    let invalid = |reason: String| DiscoveryError::InvalidFolderName {
        name: name.to_string(),
        reason,
    };

    let captures = CHANGE_FOLDER_REGEX.captures(name).ok_or_else(|| {
        invalid("expected '{previous}_{version}' or '{previous}_{version}_{description}'".to_string())
    })?;

    let previous_version: DatabaseVersion = captures[1]
        .parse()
        .map_err(|e: VersionParseError| invalid(e.to_string()))?;
    let version: DatabaseVersion = captures[2]
        .parse()
        .map_err(|e: VersionParseError| invalid(e.to_string()))?;
    let description = captures.get(3).map(|m| m.as_str().to_string());

    Ok((previous_version, version, description))
}

/// バージョン昇順に並べ替え、連鎖を検証する
pub fn order_and_validate(
    mut changes: Vec<Box<dyn SchemaChange>>,
) -> Result<Vec<Box<dyn SchemaChange>>, DiscoveryError> {
    changes.sort_by_key(|c| c.version());
    validate_chain(&changes)?;
    Ok(changes)
}

/// 昇順に並んだ変更列が1本の途切れない連鎖であることを検証する
///
/// - 同じバージョンが2つあれば DuplicateVersion
/// - 前バージョンが自身のバージョン以上であれば NonAdvancingChange
/// - 前バージョンが直前の変更のバージョンと一致しなければ BrokenChain
pub fn validate_chain(changes: &[Box<dyn SchemaChange>]) -> Result<(), DiscoveryError> {
    for change in changes {
        if change.previous_version() >= change.version() {
            return Err(DiscoveryError::NonAdvancingChange {
                version: change.version(),
                previous_version: change.previous_version(),
            });
        }
    }

    for pair in changes.windows(2) {
        let (prior, current) = (&pair[0], &pair[1]);

        if prior.version() == current.version() {
            return Err(DiscoveryError::DuplicateVersion {
                version: current.version(),
                first: prior.forward_script().name(),
                second: current.forward_script().name(),
            });
        }

        if current.previous_version() != prior.version() {
            return Err(DiscoveryError::BrokenChain {
                version: current.version(),
                expected: prior.version(),
                actual: current.previous_version(),
            });
        }
    }

    Ok(())
}
