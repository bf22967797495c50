// Core Domain
// バージョン、スキーマ変更、スクリプト、設定、エラーの純粋なドメインモデル

pub mod config;
pub mod database;
pub mod error;
pub mod logger;
pub mod naming;
pub mod schema_change;
pub mod script;
pub mod version;
