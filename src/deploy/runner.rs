//! 远程命令执行
//!
//! 每条命令在独立的会话通道上执行，捕获标准输出、标准错误和
//! 退出状态。序列执行遇到首个失败立即停止。

use russh::ChannelMsg;
use tracing::{debug, info};

use crate::deploy::session::RemoteSession;
use crate::error::CommandError;

/// 单条命令的执行结果
#[derive(Debug, Default)]
pub struct CommandResult {
    /// 远端退出码，通道未上报时为 None
    pub exit_status: Option<u32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    /// 退出码为 0 视为成功
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }
}

/// 执行单条远程命令并收集输出
pub async fn exec_command(
    session: &mut RemoteSession,
    command: &str,
) -> Result<CommandResult, CommandError> {
    debug!("执行命令: {}", command);

    let mut channel = session.open_channel().await?;
    channel.exec(true, command).await?;

    let mut result = CommandResult::default();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
            ChannelMsg::ExtendedData { ref data, ext } if ext == 1 => {
                stderr.extend_from_slice(data)
            }
            ChannelMsg::ExitStatus { exit_status } => result.exit_status = Some(exit_status),
            _ => {}
        }
    }
    result.stdout = String::from_utf8_lossy(&stdout).into_owned();
    result.stderr = String::from_utf8_lossy(&stderr).into_owned();

    if !result.success() {
        debug!("命令返回非零状态: {:?}", result.exit_status);
        if !result.stderr.is_empty() {
            debug!("stderr: {}", result.stderr.trim());
        }
    }

    Ok(result)
}

/// 依序执行命令列表
///
/// 空白命令直接跳过，不开通道；任一命令失败即停止，错误中
/// 带上命令本身、退出码与 stderr。
pub async fn run_sequence(
    session: &mut RemoteSession,
    commands: &[String],
) -> Result<(), CommandError> {
    for command in commands {
        if is_blank(command) {
            continue;
        }

        info!("[{}] 执行: {}", session.addr(), command);
        let result = exec_command(session, command).await?;
        if !result.stdout.trim().is_empty() {
            info!("{}", result.stdout.trim());
        }

        match result.exit_status {
            Some(0) => {}
            Some(code) => {
                return Err(CommandError::Failed {
                    command: command.clone(),
                    code,
                    stderr: result.stderr.trim().to_string(),
                })
            }
            None => {
                return Err(CommandError::NoExitStatus {
                    command: command.clone(),
                })
            }
        }
    }
    Ok(())
}

fn is_blank(command: &str) -> bool {
    command.trim().is_empty()
}
