use anyhow::{Context, Result};
use clap::Parser;
use colored::control as color_control;
use schema_manager::cli::commands::list::{ListCommand, ListCommandHandler};
use schema_manager::cli::commands::status::{StatusCommand, StatusCommandHandler};
use schema_manager::cli::commands::update::{UpdateCommand, UpdateCommandHandler};
use schema_manager::cli::{Cli, Commands};
use std::env;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    sqlx::any::install_default_drivers();

    // CLIをパースして実行
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // 非同期ランタイムを作成して実行
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create Tokio runtime")
        .unwrap_or_else(|e| {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        });

    let result = runtime.block_on(run_command(cli));

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// トレーシングを初期化する
///
/// RUST_LOG が設定されていればそれを優先し、なければ --verbose に応じて既定レベルを決める。
/// 標準出力はコマンド出力（JSONを含む）に使うため、ログは標準エラーに書き出す。
fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "schema_manager=debug"
    } else {
        "schema_manager=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// コマンドを実行する
async fn run_command(cli: Cli) -> Result<String> {
    // --no-color フラグの処理
    if cli.no_color {
        color_control::set_override(false);
    }

    // プロジェクトのルートパスを取得
    let project_path = env::current_dir()?;

    // --config フラグの処理（絶対パスに変換）
    let config_path: Option<PathBuf> = cli.config.map(|p| {
        if p.is_absolute() {
            p
        } else {
            project_path.join(p)
        }
    });

    match cli.command {
        Commands::Update {
            env,
            target,
            incremental,
            timeout,
        } => {
            let handler = UpdateCommandHandler::new();
            let command = UpdateCommand {
                project_path,
                config_path,
                env,
                target,
                incremental,
                timeout,
                format: cli.format,
            };
            handler.execute(&command).await
        }

        Commands::Status { env } => {
            let handler = StatusCommandHandler::new();
            let command = StatusCommand {
                project_path,
                config_path,
                env,
                format: cli.format,
            };
            handler.execute(&command).await
        }

        Commands::List => {
            let handler = ListCommandHandler::new();
            let command = ListCommand {
                project_path,
                config_path,
                format: cli.format,
            };
            handler.execute(&command)
        }
    }
}
