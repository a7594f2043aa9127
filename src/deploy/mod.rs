//! 远程部署模块
//!
//! 通过 SSH 将证书归档部署到一组目标服务器
//!
//! # 功能
//!
//! - SSH 连接管理（支持公钥和密码认证）
//! - scp 协议文件上传
//! - 远程解压、权限收紧与服务重载
//! - 多目标顺序部署与结果汇总
//!
//! # 使用示例
//!
//! ```bash
//! # 将 you.com 的证书部署到配置中的所有目标
//! sslrenew reload --domain you.com
//!
//! # 指定证书目录
//! sslrenew reload --domain you.com --cert-dir /data/cert_zip
//! ```

mod orchestrator;
mod runner;
mod session;
mod target;
#[cfg(test)]
mod testserver;
mod transfer;

pub use orchestrator::{command_sequence, deploy_all, TargetOutcome, REMOTE_STAGING_DIR};
pub use runner::{exec_command, run_sequence, CommandResult};
pub use session::{
    resolve_key_path, RemoteSession, SecureString, SshAuth, CONNECT_TIMEOUT, DEFAULT_PORT,
    DEFAULT_USER,
};
pub use target::{resolve_targets, DeploymentTarget};
pub use transfer::{encode_control_line, push, ARCHIVE_MODE};
