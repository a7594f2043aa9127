//! 错误类型定义
//!
//! 按故障域划分错误类别：打包错误是致命的（所有目标共用同一个压缩包），
//! 连接、传输、命令错误按目标隔离，只影响当前目标。

use std::path::PathBuf;
use thiserror::Error;

/// 证书打包错误
///
/// 打包失败时没有任何目标可以部署，整个运行直接终止。
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// 待打包的源路径不存在
    #[error("源文件不存在: {}", .0.display())]
    NotFound(PathBuf),

    /// 创建输出文件或读写过程中的 I/O 失败
    #[error("打包读写失败: {0}")]
    Io(#[from] std::io::Error),
}

/// SSH 连接错误
///
/// 按目标隔离：记录日志后跳过该目标，继续处理下一个。
#[derive(Debug, Error)]
pub enum ConnectError {
    /// 连接或认证超过时限
    #[error("连接 {addr} 超时 ({timeout_secs} 秒)")]
    Timeout { addr: String, timeout_secs: u64 },

    /// TCP 连接或 SSH 握手失败
    #[error("连接 {addr} 失败: {source}")]
    Connect {
        addr: String,
        #[source]
        source: russh::Error,
    },

    /// 私钥文件读取或解析失败
    #[error("读取 SSH 私钥失败 {}: {source}", .path.display())]
    Key {
        path: PathBuf,
        #[source]
        source: russh_keys::Error,
    },

    /// 服务端拒绝了提供的凭据
    #[error("{user}@{addr} 认证失败")]
    AuthFailed { user: String, addr: String },
}

/// 压缩包传输错误
///
/// 按目标隔离。写入侧与等待侧任一失败都视为传输失败。
#[derive(Debug, Error)]
pub enum TransferError {
    /// SSH 会话层错误
    #[error("SSH 会话错误: {0}")]
    Session(#[from] russh::Error),

    /// 向远端输入流写入协议帧失败
    #[error("写入传输流失败: {0}")]
    Write(#[source] std::io::Error),

    /// 远端接收命令以非零状态退出
    #[error("远端接收命令退出码 {code}")]
    Receiver { code: u32 },

    /// 远端接收命令在返回退出状态前关闭了通道
    #[error("远端接收命令未返回退出状态")]
    NoExitStatus,
}

/// 远程命令执行错误
///
/// 首个失败的命令中断该目标余下的序列，已执行命令的效果保留。
#[derive(Debug, Error)]
pub enum CommandError {
    /// SSH 会话层错误
    #[error("SSH 会话错误: {0}")]
    Session(#[from] russh::Error),

    /// 命令以非零状态退出
    #[error("命令执行失败 (退出码 {code}): {command}: {stderr}")]
    Failed {
        command: String,
        code: u32,
        stderr: String,
    },

    /// 通道在返回退出状态前关闭
    #[error("命令未返回退出状态: {command}")]
    NoExitStatus { command: String },
}

/// 单个目标的部署错误
///
/// 汇总三类按目标隔离的错误，用于逐目标的结果聚合。
#[derive(Debug, Error)]
pub enum TargetError {
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_not_found_display() {
        let err = ArchiveError::NotFound(PathBuf::from("/tmp/cert_zip/you.com.key"));
        assert_eq!(err.to_string(), "源文件不存在: /tmp/cert_zip/you.com.key");
    }

    #[test]
    fn test_command_failed_display() {
        let err = CommandError::Failed {
            command: "sudo systemctl reload nginx".to_string(),
            code: 1,
            stderr: "nginx.service not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "命令执行失败 (退出码 1): sudo systemctl reload nginx: nginx.service not found"
        );
    }

    #[test]
    fn test_target_error_is_transparent() {
        let err = TargetError::from(ConnectError::AuthFailed {
            user: "root".to_string(),
            addr: "1.2.3.4:22".to_string(),
        });
        assert_eq!(err.to_string(), "root@1.2.3.4:22 认证失败");
    }
}
