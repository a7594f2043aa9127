//! Command handlers for sslrenew subcommands
//!
//! This module contains handlers for certificate issuance and deployment.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::acme::{self, IssueOptions};
use crate::archive::ArchiveBuilder;
use crate::config::Config;
use crate::deploy;

/// Initialize logging with the specified verbosity level
pub fn init_logging(verbose: u8) {
    use std::str::FromStr;
    use tracing::Level;

    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let level = Level::from_str(log_level).unwrap_or(Level::INFO);

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(level)
        .init();
}

/// Handle the acme subcommand
pub async fn handle_acme(config_path: &str, domain: &str, opts: IssueOptions) -> Result<()> {
    let config = Config::load(config_path)?;
    if config.records.is_empty() {
        bail!("配置中没有任何记录");
    }

    let record = config
        .first_enabled(domain)
        .with_context(|| format!("配置中找不到域名 {} 的启用记录", domain))?;

    println!(
        "🔐 为 {} 签发证书 (DNS 服务商: {})",
        domain, record.dns_provider
    );
    acme::issue(record, &opts).await?;
    println!("✅ 证书签发完成: {}", domain);

    Ok(())
}

/// Handle the reload subcommand
pub async fn handle_reload(
    config_path: &str,
    domain: &str,
    cert_dir: Option<PathBuf>,
) -> Result<()> {
    let config = Config::load(config_path)?;
    if config.records.is_empty() {
        bail!("配置中没有任何记录");
    }

    let cert_dir = config.resolve_cert_dir(cert_dir.as_deref());
    std::fs::create_dir_all(&cert_dir)
        .with_context(|| format!("创建目录失败: {}", cert_dir.display()))?;

    // 打包 <domain>.key 与 <domain>.pem
    let archive_path = cert_dir.join(format!("{}.tar.gz", domain));
    println!("📦 打包中: {}", archive_path.display());
    let archive = ArchiveBuilder::new()
        .entry(cert_dir.join(format!("{}.key", domain)), None)
        .entry(cert_dir.join(format!("{}.pem", domain)), None)
        .build(&archive_path)?;
    println!("📦 打包完成: {}", archive.path().display());

    let targets = deploy::resolve_targets(&config.records, domain);
    if targets.is_empty() {
        println!("⚠ 配置中没有域名 {} 的启用目标，跳过部署", domain);
        return Ok(());
    }

    let outcomes = deploy::deploy_all(&targets, &archive)
        .await
        .with_context(|| format!("读取归档失败: {}", archive.path().display()))?;

    print_summary(&outcomes);

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        bail!("{} 台目标部署失败", failed);
    }

    Ok(())
}

/// 打印每台目标的部署结果汇总
fn print_summary(outcomes: &[deploy::TargetOutcome]) {
    println!();
    println!("部署结果:");
    for outcome in outcomes {
        match &outcome.result {
            Ok(()) => println!("  ✅ {}", outcome.label),
            Err(e) => println!("  ❌ {}: {}", outcome.label, e),
        }
    }

    let ok = outcomes.iter().filter(|o| o.is_ok()).count();
    println!(
        "共 {} 台，成功 {}，失败 {}",
        outcomes.len(),
        ok,
        outcomes.len() - ok
    );
}
