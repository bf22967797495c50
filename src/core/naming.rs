// 命名ポリシー
//
// アプリケーション名とファイル規約の単一ソースを提供します。

/// 現行アプリケーション名
pub const APP_NAME: &str = "schema-manager";

/// 既定の設定ファイル名
pub const CONFIG_FILE: &str = ".schema-manager.yaml";

/// 前進スクリプトのファイル名
pub const FORWARD_SCRIPT_FILE: &str = "Forward.sql";

/// 後退スクリプトのファイル名
pub const BACKWARD_SCRIPT_FILE: &str = "Back.sql";

/// リビジョン記録テーブル名
pub const REVISION_TABLE: &str = "schema_revision";

/// 既定のスキーマ変更ディレクトリ
pub const DEFAULT_CHANGE_SCRIPTS_DIR: &str = "ChangeScripts";

/// 既定の常時実行スクリプトディレクトリ
pub const DEFAULT_ALWAYS_RUN_DIR: &str = "AlwaysRun";
