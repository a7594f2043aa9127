//! CLI argument definitions for sslrenew
//!
//! This module contains all command-line argument parsing logic.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// sslrenew - 命令行参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// 日志级别 (0=warn, 1=info, 2=debug, 3=trace)
    #[arg(short, long)]
    pub verbose: Option<u8>,
}

/// 子命令
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 调用 acme.sh 为域名签发或续期证书
    Acme {
        /// 配置文件路径
        #[arg(short, long, default_value = "config.json")]
        config: String,

        /// 域名
        #[arg(short, long)]
        domain: String,

        /// 证书服务商 (letsencrypt、zerossl 等)
        #[arg(long)]
        server: Option<String>,

        /// 证书有效天数
        #[arg(long)]
        days: Option<u32>,

        /// 使用测试环境签发
        #[arg(long)]
        staging: bool,

        /// 强制重新签发
        #[arg(long)]
        force: bool,

        /// 续期单个域名
        #[arg(long)]
        renew: bool,

        /// 续期全部域名
        #[arg(long)]
        renew_all: bool,
    },

    /// 打包证书并部署到配置中的目标服务器
    Reload {
        /// 配置文件路径
        #[arg(short, long, default_value = "config.json")]
        config: String,

        /// 域名
        #[arg(short, long)]
        domain: String,

        /// 证书目录 (缺省时依次取配置项、可执行文件目录下的 cert_zip)
        #[arg(long)]
        cert_dir: Option<PathBuf>,
    },
}
