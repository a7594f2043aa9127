//! 证书签发模块
//!
//! 封装本机 acme.sh 的调用: 按记录的 DNS 服务商注入 API 凭据，
//! 为域名及其泛域名申请证书。凭据只进入子进程环境。

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::info;

use crate::config::TargetRecord;

/// acme.sh 的固定安装路径
pub const ACME_SH_PATH: &str = "/root/.acme.sh/acme.sh";

/// 签发选项，全部可选
#[derive(Debug, Default)]
pub struct IssueOptions {
    /// 证书有效天数
    pub days: Option<u32>,
    /// 证书服务商 (letsencrypt、zerossl 等)
    pub server: Option<String>,
    /// 使用测试环境
    pub staging: bool,
    /// 强制重新签发
    pub force: bool,
    /// 续期单个域名
    pub renew: bool,
    /// 续期全部域名
    pub renew_all: bool,
}

/// 组装 acme.sh 参数，域名同时带上泛域名
pub fn build_args(domain: &str, dns_provider: &str, opts: &IssueOptions) -> Vec<String> {
    let mut args = vec![
        "--issue".to_string(),
        "--dns".to_string(),
        dns_provider.to_string(),
        "-d".to_string(),
        domain.to_string(),
        "-d".to_string(),
        format!("*.{}", domain),
    ];

    if let Some(days) = opts.days {
        args.push("--days".to_string());
        args.push(days.to_string());
    }
    if let Some(server) = &opts.server {
        args.push("--server".to_string());
        args.push(server.clone());
    }
    if opts.staging {
        args.push("--staging".to_string());
    }
    if opts.force {
        args.push("--force".to_string());
    }
    if opts.renew {
        args.push("--renew".to_string());
    }
    if opts.renew_all {
        args.push("--renew-all".to_string());
    }
    args
}

/// DNS 服务商对应的 API 凭据环境变量
///
/// 未知服务商返回空表，依赖 acme.sh 已保存的账户配置。
pub fn provider_env(provider: &str, key: &str, secret: &str) -> Vec<(String, String)> {
    let names = match provider {
        // 阿里云
        "dns_ali" => Some(("Ali_Key", "Ali_Secret")),
        // 腾讯云
        "dns_tencent" => Some(("TENCENTCLOUD_SECRET_ID", "TENCENTCLOUD_SECRET_KEY")),
        // 华为云
        "dns_huaweicloud" => Some(("HUAWEICLOUD_ACCESS_KEY", "HUAWEICLOUD_SECRET_KEY")),
        // 火山引擎
        "dns_volcengine" => Some(("VOLC_ACCESSKEY", "VOLC_SECRETKEY")),
        _ => None,
    };

    match names {
        Some((key_name, secret_name)) => vec![
            (key_name.to_string(), key.to_string()),
            (secret_name.to_string(), secret.to_string()),
        ],
        None => Vec::new(),
    }
}

/// 为记录对应的域名调用 acme.sh 签发证书
///
/// 子进程继承本进程的标准输入输出，acme.sh 的交互与进度
/// 直接展示给用户。
pub async fn issue(record: &TargetRecord, opts: &IssueOptions) -> Result<()> {
    let args = build_args(&record.domain, &record.dns_provider, opts);
    let envs = provider_env(
        &record.dns_provider,
        &record.access_key,
        &record.access_secret,
    );
    if envs.is_empty() {
        info!(
            "未识别的 DNS 服务商 {:?}，使用 acme.sh 已有配置",
            record.dns_provider
        );
    }

    info!("调用: {} {}", ACME_SH_PATH, args.join(" "));
    let status = Command::new(ACME_SH_PATH)
        .args(&args)
        .envs(envs)
        .status()
        .await
        .with_context(|| format!("执行 {} 失败", ACME_SH_PATH))?;

    if !status.success() {
        bail!("acme.sh 退出异常: {}", status);
    }

    info!("证书签发完成: {}", record.domain);
    Ok(())
}
