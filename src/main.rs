//! sslrenew 主程序入口
//!
//! 解析命令行参数并分发到对应的子命令处理器。

use anyhow::Result;
use clap::Parser;

use sslrenew::acme::IssueOptions;
use sslrenew::cli::{Args, Commands};
use sslrenew::commands;

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();
    commands::init_logging(args.verbose.unwrap_or(1));

    // 处理子命令
    match args.command {
        Commands::Acme {
            config,
            domain,
            server,
            days,
            staging,
            force,
            renew,
            renew_all,
        } => {
            let opts = IssueOptions {
                days,
                server,
                staging,
                force,
                renew,
                renew_all,
            };
            commands::handle_acme(&config, &domain, opts).await
        }
        Commands::Reload {
            config,
            domain,
            cert_dir,
        } => commands::handle_reload(&config, &domain, cert_dir).await,
    }
}
