// 更新対象データベースのインターフェース
//
// 更新エンジンが必要とする操作だけを定義します。
// 接続やドライバの詳細は adapters 層の実装に閉じ込めます。

use crate::core::error::DatabaseError;
use crate::core::schema_change::SchemaChange;
use crate::core::script::SimpleScript;
use crate::core::version::DatabaseVersion;
use async_trait::async_trait;

/// 更新対象データベース
///
/// リビジョンの読み取り、変更の適用、トランザクション制御を抽象化します。
#[async_trait]
pub trait Database: Send + Sync {
    /// 現在のリビジョンを取得（キャッシュせず毎回問い合わせる）
    async fn revision(&self) -> Result<DatabaseVersion, DatabaseError>;

    /// スキーマ変更を適用
    ///
    /// 前進スクリプトを実行し、リビジョンを `change.version()` へ進めます。
    async fn execute_update(&self, change: &dyn SchemaChange) -> Result<(), DatabaseError>;

    /// 単純なスクリプトを実行
    async fn execute_script(&self, script: &dyn SimpleScript) -> Result<(), DatabaseError>;

    /// トランザクションを開始
    async fn begin_transaction(&self) -> Result<(), DatabaseError>;

    /// トランザクションをコミット
    async fn commit(&self) -> Result<(), DatabaseError>;

    /// トランザクションをロールバック
    async fn rollback(&self) -> Result<(), DatabaseError>;
}
