use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use mailer::app::{print_job, Application};
use mailer::ShutdownManager;
use mailer_config::{AppConfig, LogFormat};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);
    let config = AppConfig::load(config_path).context("加载配置失败")?;

    let log_level = matches
        .get_one::<String>("log-level")
        .cloned()
        .unwrap_or_else(|| config.observability.log_level.clone());
    let log_format = match matches.get_one::<String>("log-format") {
        Some(format) => format.parse::<LogFormat>().map_err(|e| anyhow::anyhow!(e))?,
        None => config.observability.log_format,
    };
    init_logging(&log_level, log_format)?;

    let app = Application::new(config).await?;
    let result = run_command(&app, &matches).await;
    app.close().await;

    if let Err(e) = &result {
        error!("命令执行失败: {e:#}");
    }
    result
}

fn build_cli() -> Command {
    Command::new("mailer")
        .version("1.0.0")
        .about("批量测试邮件发送与完成状态追踪")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .global(true),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"])
                .global(true),
        )
        .subcommand(
            Command::new("seed").about("写入测试收件人").arg(
                Arg::new("count")
                    .short('n')
                    .long("count")
                    .value_name("N")
                    .value_parser(clap::value_parser!(usize))
                    .required(true),
            ),
        )
        .subcommand(
            Command::new("send")
                .about("随机抽取收件人并批量发送")
                .arg(
                    Arg::new("count")
                        .short('n')
                        .long("count")
                        .value_name("N")
                        .value_parser(clap::value_parser!(u64))
                        .required(true),
                )
                .arg(
                    Arg::new("simulate-failures")
                        .long("simulate-failures")
                        .help("按配置的概率注入发送失败")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("wait")
                        .short('w')
                        .long("wait")
                        .help("打印发送进度直到任务结束")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("status").about("查看邮件任务状态").arg(
                Arg::new("id")
                    .long("id")
                    .value_name("ID")
                    .value_parser(clap::value_parser!(i64))
                    .required(true),
            ),
        )
}

async fn run_command(app: &Application, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("seed", args)) => {
            let count = args.get_one::<usize>("count").copied().unwrap_or_default();
            let inserted = app.seed(count).await?;
            println!("新增收件人 {inserted} 个");
        }
        Some(("send", args)) => {
            let count = args.get_one::<u64>("count").copied().unwrap_or_default();
            let simulate_failures = args.get_flag("simulate-failures");
            let show_progress = args.get_flag("wait");

            let shutdown_manager = ShutdownManager::new();
            let signal_manager = shutdown_manager.clone();
            let signal_task = tokio::spawn(async move {
                wait_for_shutdown_signal().await;
                info!("收到关闭信号，开始优雅关闭...");
                signal_manager.shutdown().await;
            });

            let job = app
                .send(count, simulate_failures, show_progress, &shutdown_manager)
                .await;
            signal_task.abort();

            print_job(&job?);
        }
        Some(("status", args)) => {
            let id = args.get_one::<i64>("id").copied().unwrap_or_default();
            print_job(&app.status(id).await?);
        }
        _ => return Err(anyhow::anyhow!("未知的子命令")),
    }

    Ok(())
}

fn init_logging(log_level: &str, log_format: LogFormat) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("初始化JSON日志格式失败")?,
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
            .context("初始化Pretty日志格式失败")?,
    }

    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
