// schema-managerライブラリのエントリーポイント
//
// モジュール構造:
// - cli: CLIレイヤー（ユーザー入力の受付とコマンドルーティング）
// - core: コアドメイン（バージョン、スキーマ変更、スクリプト、エラー、設定）
// - adapters: データベースへのアクセスを抽象化
// - services: 変更の検出と更新エンジン

pub mod adapters;
pub mod cli;
pub mod core;
pub mod services;
