//! 部署目标解析
//!
//! 从配置记录中筛选指定域名的启用条目，按 (host, port, user, remote_dir)
//! 四元组去重，保持首次出现的顺序。

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::debug;

use crate::config::{AuthMode, TargetRecord};
use crate::deploy::session::{SecureString, SshAuth, DEFAULT_PORT, DEFAULT_USER};

/// 一台待部署的目标服务器
pub struct DeploymentTarget {
    /// 展示名称，缺省时标签退化为 host:port
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub remote_dir: String,
    pub reload_cmd: String,
    pub auth: SshAuth,
}

impl DeploymentTarget {
    /// 日志与结果汇总里使用的标签
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("{}:{}", self.host, self.port)
        } else {
            self.name.clone()
        }
    }
}

/// 解析某域名的部署目标列表
///
/// 过滤未启用与域名不匹配的记录；端口缺省为 22，用户缺省为 root。
/// 相同 (host, port, user, remote_dir) 的记录只保留第一条。
pub fn resolve_targets(records: &[TargetRecord], domain: &str) -> Vec<DeploymentTarget> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for record in records {
        if !record.enabled || record.domain != domain {
            continue;
        }

        let port = record.port.unwrap_or(DEFAULT_PORT);
        let user = if record.user.is_empty() {
            DEFAULT_USER.to_string()
        } else {
            record.user.clone()
        };

        let key = (
            record.host.clone(),
            port,
            user.clone(),
            record.remote_dir.clone(),
        );
        if !seen.insert(key) {
            debug!(
                "跳过重复目标: {}@{}:{} {}",
                user, record.host, port, record.remote_dir
            );
            continue;
        }

        let auth = match record.auth_mode {
            AuthMode::Key => SshAuth::Key {
                path: record
                    .credential
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from),
            },
            AuthMode::Password => SshAuth::Password(SecureString::new(
                record.credential.clone().unwrap_or_default(),
            )),
        };

        targets.push(DeploymentTarget {
            name: record.name.clone(),
            host: record.host.clone(),
            port,
            user,
            remote_dir: record.remote_dir.clone(),
            reload_cmd: record.reload_cmd.clone(),
            auth,
        });
    }

    targets
}
