// スキーマ変更ドメインモデル
//
// 1つのスキーマ変更（前進スクリプトと後退スクリプトの組）を表現します。
// フォルダに保存された変更とメモリ上の変更の2種類を提供します。

use crate::core::naming::{BACKWARD_SCRIPT_FILE, FORWARD_SCRIPT_FILE};
use crate::core::script::{FileScript, InlineScript, SimpleScript};
use crate::core::version::DatabaseVersion;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// スキーマ変更
///
/// `previous_version()` の上に適用され、データベースを `version()` へ進めます。
pub trait SchemaChange: Debug + Send + Sync {
    /// この変更を適用した後のバージョン
    fn version(&self) -> DatabaseVersion;

    /// この変更が前提とするバージョン
    fn previous_version(&self) -> DatabaseVersion;

    /// 前進スクリプト
    fn forward_script(&self) -> &dyn SimpleScript;

    /// 後退スクリプト
    fn backward_script(&self) -> &dyn SimpleScript;

    /// 説明（フォルダ名から取得できた場合）
    fn description(&self) -> Option<&str> {
        None
    }

    /// 現在のリビジョンに対してこの変更を適用する必要があるか
    fn needs_to_be_applied_to(&self, current: DatabaseVersion) -> bool {
        self.version() > current
    }
}

/// フォルダに保存されたスキーマ変更
///
/// フォルダには `Forward.sql` と `Back.sql` が含まれます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSchemaChange {
    version: DatabaseVersion,
    previous_version: DatabaseVersion,
    description: Option<String>,
    path_to_schema_change_folder: PathBuf,
    forward: FileScript,
    backward: FileScript,
}

impl FileSchemaChange {
    /// 新しいFileSchemaChangeを作成
    ///
    /// # Arguments
    ///
    /// * `previous_version` - 前提とするバージョン
    /// * `version` - 適用後のバージョン
    /// * `description` - 説明
    /// * `folder` - 変更フォルダの絶対パス
    pub fn new(
        previous_version: DatabaseVersion,
        version: DatabaseVersion,
        description: Option<String>,
        folder: PathBuf,
    ) -> Self {
        let forward = FileScript::new(folder.join(FORWARD_SCRIPT_FILE));
        let backward = FileScript::new(folder.join(BACKWARD_SCRIPT_FILE));
        Self {
            version,
            previous_version,
            description,
            path_to_schema_change_folder: folder,
            forward,
            backward,
        }
    }

    /// 変更フォルダのパス
    pub fn path_to_schema_change_folder(&self) -> &Path {
        &self.path_to_schema_change_folder
    }
}

impl SchemaChange for FileSchemaChange {
    fn version(&self) -> DatabaseVersion {
        self.version
    }

    fn previous_version(&self) -> DatabaseVersion {
        self.previous_version
    }

    fn forward_script(&self) -> &dyn SimpleScript {
        &self.forward
    }

    fn backward_script(&self) -> &dyn SimpleScript {
        &self.backward
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// メモリ上のスキーマ変更
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemorySchemaChange {
    version: DatabaseVersion,
    previous_version: DatabaseVersion,
    forward: InlineScript,
    backward: InlineScript,
}

impl InMemorySchemaChange {
    /// 新しいInMemorySchemaChangeを作成
    pub fn new(
        previous_version: DatabaseVersion,
        version: DatabaseVersion,
        forward_sql: impl Into<String>,
        backward_sql: impl Into<String>,
    ) -> Self {
        Self {
            version,
            previous_version,
            forward: InlineScript::new(format!("{} forward", version), forward_sql),
            backward: InlineScript::new(format!("{} back", version), backward_sql),
        }
    }
}

impl SchemaChange for InMemorySchemaChange {
    fn version(&self) -> DatabaseVersion {
        self.version
    }

    fn previous_version(&self) -> DatabaseVersion {
        self.previous_version
    }

    fn forward_script(&self) -> &dyn SimpleScript {
        &self.forward
    }

    fn backward_script(&self) -> &dyn SimpleScript {
        &self.backward
    }
}
