//! 配置管理模块
//!
//! 负责加载部署配置文件 (config.json)：每条记录描述一个域名到一台
//! 目标服务器的部署关系，同一域名允许出现多条记录。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// 部署配置文件
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// 证书源目录 (打包前证书文件所在位置)
    #[serde(default)]
    pub cert_source_dir: Option<PathBuf>,
    /// 部署记录列表
    #[serde(default)]
    pub records: Vec<TargetRecord>,
}

/// 认证方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// 私钥认证 (默认)
    #[default]
    Key,
    /// 密码认证
    Password,
}

/// 单条部署记录
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetRecord {
    /// 证书域名
    pub domain: String,
    /// 记录名称 (仅用于日志)
    #[serde(default)]
    pub name: String,
    /// 目标主机地址
    #[serde(default)]
    pub host: String,
    /// SSH 端口 (未设置时默认 22)
    #[serde(default)]
    pub port: Option<u16>,
    /// SSH 用户 (未设置时默认 root)
    #[serde(default)]
    pub user: String,
    /// 认证方式
    #[serde(default)]
    pub auth_mode: AuthMode,
    /// 凭据: key 模式下是私钥路径，password 模式下是密码
    #[serde(default)]
    pub credential: Option<String>,
    /// 证书部署目录 (为空时只上传压缩包，不执行命令序列)
    #[serde(default)]
    pub remote_dir: String,
    /// 证书就位后执行的重载命令
    #[serde(default)]
    pub reload_cmd: String,
    /// 是否启用该记录
    #[serde(default)]
    pub enabled: bool,
    /// DNS 服务商 (仅签发时使用, 如 dns_ali)
    #[serde(default)]
    pub dns_provider: String,
    /// DNS 服务商 AccessKey (仅签发时使用)
    #[serde(default)]
    pub access_key: String,
    /// DNS 服务商 AccessSecret (仅签发时使用)
    #[serde(default)]
    pub access_secret: String,
}

impl Config {
    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("读取配置文件失败 {}: {}", path.display(), e))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow!("配置文件解析失败 {}: {}", path.display(), e))?;

        tracing::debug!("配置加载成功: {} ({} 条记录)", path.display(), config.records.len());
        Ok(config)
    }

    /// 返回该域名第一条启用的记录 (签发时取 DNS 凭据用)
    pub fn first_enabled(&self, domain: &str) -> Option<&TargetRecord> {
        self.records.iter().find(|r| r.domain == domain && r.enabled)
    }

    /// 解析证书源目录
    ///
    /// 优先级: 命令行指定 > 配置文件 > 可执行文件所在目录下的 cert_zip
    pub fn resolve_cert_dir(&self, cli_dir: Option<&Path>) -> PathBuf {
        if let Some(dir) = cli_dir {
            return dir.to_path_buf();
        }

        if let Some(ref dir) = self.cert_source_dir {
            if !dir.as_os_str().is_empty() {
                return dir.clone();
            }
        }

        match std::env::current_exe() {
            Ok(exe) => exe
                .parent()
                .map(|p| p.join("cert_zip"))
                .unwrap_or_else(|| PathBuf::from("/tmp/cert_zip")),
            Err(_) => PathBuf::from("/tmp/cert_zip"),
        }
    }
}
