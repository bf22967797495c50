// Services Layer
// ドメインロジックを実行するサービス層

pub mod always_run;
pub mod change_provider;
pub mod config_loader;
pub mod database_config_resolver;
pub mod database_updater;
