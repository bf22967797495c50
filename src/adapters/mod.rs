// Adapters
// データベースとファイルシステムへのアクセスを抽象化

pub mod connection_string;
pub mod database;
pub mod sql_database;
pub mod sql_splitter;
