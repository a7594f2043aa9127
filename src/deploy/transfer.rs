//! 文件传输
//!
//! 通过远端 `scp -t` 接收模式上传归档。协议为单条控制行
//! `C<权限> <长度> <文件名>\n`，随后是文件内容和一个 `\0` 结束符。
//! 写入在独立任务中进行，与等待接收端退出状态并发，写入结果
//! 经 oneshot 通道带回并优先于退出状态判定。

use std::io;
use std::sync::Arc;

use russh::ChannelMsg;
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::oneshot;
use tracing::debug;

use crate::deploy::session::RemoteSession;
use crate::error::TransferError;

/// 上传时远端文件的权限位
pub const ARCHIVE_MODE: u32 = 0o644;

/// 构造 scp 控制行，权限位保留低 12 位
pub fn encode_control_line(mode: u32, len: usize, name: &str) -> String {
    format!("C{:04o} {} {}\n", mode & 0o7777, len, name)
}

/// 上传一段内容到远端目录
///
/// 内容以 `Arc` 共享，同一份归档可推送到多个目标而无需复制。
pub async fn push(
    session: &mut RemoteSession,
    payload: Arc<Vec<u8>>,
    name: &str,
    mode: u32,
    remote_dir: &str,
) -> Result<(), TransferError> {
    debug!("上传 {} ({} 字节) 到 {}", name, payload.len(), remote_dir);

    let mut channel = session.open_channel().await?;
    channel
        .exec(true, format!("/usr/bin/scp -t {}", remote_dir))
        .await?;

    // 写入端: 控制行 + 内容 + 结束符，结果经 oneshot 带回
    let (tx_io, rx_io) = tokio::io::duplex(32 * 1024);
    let (done_tx, done_rx) = oneshot::channel();
    let control = encode_control_line(mode, payload.len(), name);
    let writer_payload = Arc::clone(&payload);
    tokio::spawn(async move {
        let result = write_frame(tx_io, control, writer_payload).await;
        let _ = done_tx.send(result);
    });

    // 数据全部送出后才发 EOF，再等待接收端收尾
    channel.data(rx_io).await?;
    channel.eof().await?;

    let mut status = None;
    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::ExitStatus { exit_status } => status = Some(exit_status),
            // scp 的应答字节不参与判定
            ChannelMsg::Data { .. } | ChannelMsg::ExtendedData { .. } => {}
            _ => {}
        }
    }

    // 写入端错误优先于接收端退出状态
    match done_rx.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(TransferError::Write(e)),
        Err(_) => {
            return Err(TransferError::Write(io::Error::new(
                io::ErrorKind::Other,
                "写入任务中断",
            )))
        }
    }

    match status {
        Some(0) => {
            debug!("上传完成: {}", name);
            Ok(())
        }
        Some(code) => Err(TransferError::Receiver { code }),
        None => Err(TransferError::NoExitStatus),
    }
}

/// 按协议顺序写出完整帧并关闭写入端
async fn write_frame(
    mut tx: DuplexStream,
    control: String,
    payload: Arc<Vec<u8>>,
) -> io::Result<()> {
    tx.write_all(control.as_bytes()).await?;
    tx.write_all(&payload).await?;
    tx.write_all(&[0u8]).await?;
    tx.shutdown().await?;
    Ok(())
}
