// 進捗ログ出力
//
// 更新エンジンが出力する進捗メッセージのインターフェース。
// 既定の実装は tracing へ転送します。

use tracing::info;

/// 進捗メッセージの出力先
pub trait UpdateLogger: Send + Sync {
    /// 情報メッセージを出力
    fn info(&self, message: &str);
}

/// tracing へ転送するロガー
#[derive(Debug, Clone, Default)]
pub struct TracingLogger;

impl TracingLogger {
    /// 新しいTracingLoggerを作成
    pub fn new() -> Self {
        Self
    }
}

impl UpdateLogger for TracingLogger {
    fn info(&self, message: &str) {
        info!(target: "schema_manager::update", "{}", message);
    }
}
