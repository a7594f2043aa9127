//! SSH 会话管理
//!
//! 建立到目标服务器的 SSH 连接，支持密钥与密码两种认证方式，
//! 连接与认证整体受 30 秒超时约束。部署面向批量受控机器，
//! 不校验服务器主机密钥。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{Channel, Disconnect};
use russh_keys::key;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::error::ConnectError;

/// 连接与认证的整体超时
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// 默认 SSH 端口
pub const DEFAULT_PORT: u16 = 22;
/// 默认登录用户
pub const DEFAULT_USER: &str = "root";

/// 安全字符串包装，在 Drop 时自动清除内存
pub struct SecureString(String);

impl SecureString {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Drop for SecureString {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// SSH 认证方式
pub enum SshAuth {
    /// 公钥认证，未指定路径时探测默认密钥位置
    Key { path: Option<PathBuf> },
    /// 密码认证
    Password(SecureString),
}

/// 接受任意服务器主机密钥
struct AcceptAll;

#[async_trait]
impl client::Handler for AcceptAll {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// 目标服务器的 SSH 会话
///
/// 命令执行与文件传输各自打开独立通道，会话本身只负责
/// 连接生命周期。
pub struct RemoteSession {
    handle: Handle<AcceptAll>,
    addr: String,
}

impl RemoteSession {
    /// 建立 SSH 连接并完成认证
    pub async fn connect(
        host: &str,
        port: u16,
        user: &str,
        auth: &SshAuth,
    ) -> Result<Self, ConnectError> {
        let addr = format!("{}:{}", host, port);
        info!("连接到 {}@{}...", user, addr);

        let fut = Self::connect_inner(host, port, user, auth, &addr);
        match tokio::time::timeout(CONNECT_TIMEOUT, fut).await {
            Ok(result) => result,
            Err(_) => Err(ConnectError::Timeout {
                addr,
                timeout_secs: CONNECT_TIMEOUT.as_secs(),
            }),
        }
    }

    async fn connect_inner(
        host: &str,
        port: u16,
        user: &str,
        auth: &SshAuth,
        addr: &str,
    ) -> Result<Self, ConnectError> {
        let config = Arc::new(client::Config::default());
        let mut handle = client::connect(config, (host, port), AcceptAll)
            .await
            .map_err(|source| ConnectError::Connect {
                addr: addr.to_string(),
                source,
            })?;

        let authenticated = match auth {
            SshAuth::Key { path } => {
                let key_path = resolve_key_path(path.as_deref());
                info!("使用公钥认证: {}", key_path.display());
                let pair = russh_keys::load_secret_key(&key_path, None).map_err(|source| {
                    ConnectError::Key {
                        path: key_path.clone(),
                        source,
                    }
                })?;
                handle
                    .authenticate_publickey(user, Arc::new(pair))
                    .await
                    .map_err(|source| ConnectError::Connect {
                        addr: addr.to_string(),
                        source,
                    })?
            }
            SshAuth::Password(password) => {
                info!("使用密码认证");
                handle
                    .authenticate_password(user, password.as_str())
                    .await
                    .map_err(|source| ConnectError::Connect {
                        addr: addr.to_string(),
                        source,
                    })?
            }
        };

        if !authenticated {
            return Err(ConnectError::AuthFailed {
                user: user.to_string(),
                addr: addr.to_string(),
            });
        }

        info!("SSH 连接成功: {}", addr);
        Ok(Self {
            handle,
            addr: addr.to_string(),
        })
    }

    /// 会话地址标签
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// 打开一个新的会话通道
    pub(crate) async fn open_channel(&mut self) -> Result<Channel<client::Msg>, russh::Error> {
        self.handle.channel_open_session().await
    }

    /// 关闭连接，失败只记录日志
    pub async fn close(&mut self) {
        if let Err(e) = self
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            debug!("断开 {} 连接时出错: {}", self.addr, e);
        }
    }
}

/// 解析私钥路径
///
/// 优先使用指定路径；否则按 id_ed25519、id_rsa、id_ecdsa 顺序探测
/// ~/.ssh，全部缺失时退回 /root/.ssh/id_rsa。
pub fn resolve_key_path(path: Option<&Path>) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }

    if let Some(home) = dirs::home_dir() {
        let ssh_dir = home.join(".ssh");
        for name in ["id_ed25519", "id_rsa", "id_ecdsa"] {
            let key_path = ssh_dir.join(name);
            if key_path.exists() {
                debug!("检测到 SSH 密钥: {}", key_path.display());
                return key_path;
            }
        }
    }

    warn!("未检测到任何 SSH 密钥，使用默认路径");
    PathBuf::from("/root/.ssh/id_rsa")
}
