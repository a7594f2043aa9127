//! 部署编排
//!
//! 将归档依次部署到每台目标服务器: 建立连接、上传归档、执行
//! 解压与重载命令。单台失败不影响后续目标，所有结果汇总返回。

use std::io;
use std::sync::Arc;

use tracing::{error, info};

use crate::archive::Archive;
use crate::deploy::runner;
use crate::deploy::session::RemoteSession;
use crate::deploy::target::DeploymentTarget;
use crate::deploy::transfer::{self, ARCHIVE_MODE};
use crate::error::{ArchiveError, TargetError};

/// 归档在远端的暂存目录
pub const REMOTE_STAGING_DIR: &str = "/tmp";

/// 单台目标的部署结果
#[derive(Debug)]
pub struct TargetOutcome {
    pub label: String,
    pub result: Result<(), TargetError>,
}

impl TargetOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// 解压与重载的命令序列
///
/// 顺序固定: 建目录、解压、收紧私钥权限、放宽证书权限、重载
/// 服务、回显成功标记。重载命令为空时由执行层跳过。
pub fn command_sequence(remote_dir: &str, archive_name: &str, reload_cmd: &str) -> Vec<String> {
    vec![
        format!("sudo mkdir -p {}", remote_dir),
        format!(
            "sudo tar -xzvf {}/{} -C {}",
            REMOTE_STAGING_DIR, archive_name, remote_dir
        ),
        format!(
            "sudo find {} -name '*.key' -exec chmod 600 {{}} \\;",
            remote_dir
        ),
        format!(
            "sudo find {} -name '*.pem' -exec chmod 644 {{}} \\;",
            remote_dir
        ),
        reload_cmd.to_string(),
        "echo \"✅ 证书部署成功。\"".to_string(),
    ]
}

/// 将归档部署到所有目标
///
/// 归档内容只读取一次，经 `Arc` 在目标间共享；读取失败整个运行
/// 终止。目标逐台处理，失败记录后继续下一台。
pub async fn deploy_all(
    targets: &[DeploymentTarget],
    archive: &Archive,
) -> Result<Vec<TargetOutcome>, ArchiveError> {
    let payload = match tokio::fs::read(archive.path()).await {
        Ok(bytes) => Arc::new(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ArchiveError::NotFound(archive.path().to_path_buf()))
        }
        Err(e) => return Err(ArchiveError::Io(e)),
    };
    let archive_name = archive.file_name();

    let mut outcomes = Vec::with_capacity(targets.len());
    for target in targets {
        info!(
            "=== 部署到服务器: {} ({}) ===",
            target.label(),
            target.remote_dir
        );

        let result = deploy_one(target, Arc::clone(&payload), &archive_name).await;
        match &result {
            Ok(()) => info!("服务器 {} 部署成功", target.label()),
            Err(e) => error!("部署 {} 失败: {}", target.label(), e),
        }
        outcomes.push(TargetOutcome {
            label: target.label(),
            result,
        });
    }
    Ok(outcomes)
}

async fn deploy_one(
    target: &DeploymentTarget,
    payload: Arc<Vec<u8>>,
    archive_name: &str,
) -> Result<(), TargetError> {
    let mut session =
        RemoteSession::connect(&target.host, target.port, &target.user, &target.auth).await?;

    let result = deploy_steps(&mut session, target, payload, archive_name).await;
    // 无论成败都先断开连接
    session.close().await;
    result
}

async fn deploy_steps(
    session: &mut RemoteSession,
    target: &DeploymentTarget,
    payload: Arc<Vec<u8>>,
    archive_name: &str,
) -> Result<(), TargetError> {
    transfer::push(
        session,
        payload,
        archive_name,
        ARCHIVE_MODE,
        REMOTE_STAGING_DIR,
    )
    .await?;

    // 未配置部署目录时只上传，不执行解压与重载
    if target.remote_dir.is_empty() {
        info!("{} 未配置部署目录，跳过命令阶段", target.label());
        return Ok(());
    }

    let commands = command_sequence(&target.remote_dir, archive_name, &target.reload_cmd);
    runner::run_sequence(session, &commands).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveBuilder;
    use std::path::Path;

    fn build_archive(dir: &Path) -> Archive {
        let key = dir.join("you.com.key");
        std::fs::write(&key, b"k").unwrap();
        ArchiveBuilder::new()
            .entry(&key, None)
            .build(&dir.join("you.com.tar.gz"))
            .unwrap()
    }

    #[test]
    fn test_command_sequence_contents() {
        let commands = command_sequence(
            "/etc/nginx/ssl",
            "you.com.tar.gz",
            "sudo systemctl reload nginx",
        );
        assert_eq!(
            commands,
            vec![
                "sudo mkdir -p /etc/nginx/ssl".to_string(),
                "sudo tar -xzvf /tmp/you.com.tar.gz -C /etc/nginx/ssl".to_string(),
                "sudo find /etc/nginx/ssl -name '*.key' -exec chmod 600 {} \\;".to_string(),
                "sudo find /etc/nginx/ssl -name '*.pem' -exec chmod 644 {} \\;".to_string(),
                "sudo systemctl reload nginx".to_string(),
                "echo \"✅ 证书部署成功。\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_command_sequence_blank_reload_stays_in_place() {
        // 空的重载命令保留在序列里，由执行层跳过
        let commands = command_sequence("/opt/certs", "a.tar.gz", "");
        assert_eq!(commands.len(), 6);
        assert!(commands[4].is_empty());
    }

    #[tokio::test]
    async fn test_deploy_all_no_targets() {
        let dir = tempfile::tempdir().unwrap();
        let archive = build_archive(dir.path());

        let outcomes = deploy_all(&[], &archive).await.unwrap();
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_deploy_all_missing_archive_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let archive = build_archive(dir.path());
        std::fs::remove_file(archive.path()).unwrap();

        let err = deploy_all(&[], &archive).await.unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_deploy_all_continues_past_connect_failures() {
        use crate::deploy::session::SshAuth;

        let dir = tempfile::tempdir().unwrap();
        let archive = build_archive(dir.path());

        // 本机 1 端口无人监听，连接立即被拒
        let unreachable = |name: &str| DeploymentTarget {
            name: name.to_string(),
            host: "127.0.0.1".to_string(),
            port: 1,
            user: "root".to_string(),
            remote_dir: "/tmp".to_string(),
            reload_cmd: String::new(),
            auth: SshAuth::Key {
                path: Some("/nonexistent/key".into()),
            },
        };
        let targets = vec![unreachable("web-1"), unreachable("web-2")];

        let outcomes = deploy_all(&targets, &archive).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        // 第一台失败不中断循环，两台都有结果且保持顺序
        assert!(!outcomes[0].is_ok());
        assert!(!outcomes[1].is_ok());
        assert_eq!(outcomes[0].label, "web-1");
        assert_eq!(outcomes[1].label, "web-2");
    }
}
