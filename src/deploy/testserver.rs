//! 测试用内嵌 SSH 服务器
//!
//! 在回环地址上运行一个最小的 SSH 服务端：密码认证，exec 请求按
//! 预设脚本应答，scp 接收通道收到的字节原样记录，供部署各模块的
//! 端到端测试断言。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use russh::server::{Auth, Handler, Msg, Server, Session};
use russh::{Channel, ChannelId, CryptoVec};
use russh_keys::key::KeyPair;
use tokio::net::TcpListener;

use crate::deploy::session::{RemoteSession, SecureString, SshAuth};

pub const TEST_USER: &str = "root";
pub const TEST_PASSWORD: &str = "loopback-secret";

/// 单条命令的预设应答
#[derive(Clone)]
pub struct ScriptedReply {
    pub stdout: &'static str,
    pub stderr: &'static str,
    pub exit_status: u32,
}

impl ScriptedReply {
    pub fn ok(stdout: &'static str) -> Self {
        Self {
            stdout,
            stderr: "",
            exit_status: 0,
        }
    }

    pub fn fail(exit_status: u32, stderr: &'static str) -> Self {
        Self {
            stdout: "",
            stderr,
            exit_status,
        }
    }
}

/// 服务端记录：收到的 exec 命令与 scp 通道的原始字节
#[derive(Default)]
pub struct Recorded {
    pub commands: Vec<String>,
    pub sink_bytes: Vec<u8>,
}

/// 在随机端口启动服务器，返回端口与共享记录
pub async fn spawn(
    replies: HashMap<String, ScriptedReply>,
    sink_exit: u32,
) -> (u16, Arc<Mutex<Recorded>>) {
    let config = Arc::new(russh::server::Config {
        keys: vec![KeyPair::generate_ed25519().expect("generate ed25519 host key")],
        ..Default::default()
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let mut server = TestServer {
        replies: Arc::new(replies),
        recorded: Arc::clone(&recorded),
        sink_exit,
    };
    tokio::spawn(async move {
        let _ = server.run_on_socket(config, &listener).await;
    });

    (port, recorded)
}

/// 以测试凭据建立到服务器的会话
pub async fn connect(port: u16) -> RemoteSession {
    let auth = SshAuth::Password(SecureString::new(TEST_PASSWORD.to_string()));
    RemoteSession::connect("127.0.0.1", port, TEST_USER, &auth)
        .await
        .unwrap()
}

struct TestServer {
    replies: Arc<HashMap<String, ScriptedReply>>,
    recorded: Arc<Mutex<Recorded>>,
    sink_exit: u32,
}

impl Server for TestServer {
    type Handler = TestHandler;

    fn new_client(&mut self, _peer_addr: Option<std::net::SocketAddr>) -> Self::Handler {
        TestHandler {
            replies: Arc::clone(&self.replies),
            recorded: Arc::clone(&self.recorded),
            sink_exit: self.sink_exit,
            sink_channel: None,
        }
    }
}

struct TestHandler {
    replies: Arc<HashMap<String, ScriptedReply>>,
    recorded: Arc<Mutex<Recorded>>,
    sink_exit: u32,
    sink_channel: Option<ChannelId>,
}

#[async_trait]
impl Handler for TestHandler {
    type Error = russh::Error;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        if user == TEST_USER && password == TEST_PASSWORD {
            Ok(Auth::Accept)
        } else {
            Ok(Auth::Reject {
                proceed_with_methods: None,
            })
        }
    }

    async fn channel_open_session(
        &mut self,
        _channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }

    async fn exec_request(
        &mut self,
        channel_id: ChannelId,
        data: &[u8],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        let command = String::from_utf8_lossy(data).into_owned();
        self.recorded.lock().unwrap().commands.push(command.clone());
        session.channel_success(channel_id);

        // scp 接收端：持续收数据，收到 EOF 后才上报退出状态
        if command.starts_with("/usr/bin/scp -t ") {
            self.sink_channel = Some(channel_id);
            return Ok(());
        }

        match self.replies.get(&command) {
            Some(reply) => {
                if !reply.stdout.is_empty() {
                    session.data(channel_id, CryptoVec::from(reply.stdout.as_bytes().to_vec()));
                }
                if !reply.stderr.is_empty() {
                    session.extended_data(
                        channel_id,
                        1,
                        CryptoVec::from(reply.stderr.as_bytes().to_vec()),
                    );
                }
                session.exit_status_request(channel_id, reply.exit_status);
            }
            None => session.exit_status_request(channel_id, 127),
        }
        session.close(channel_id);
        Ok(())
    }

    async fn data(
        &mut self,
        channel_id: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if self.sink_channel == Some(channel_id) {
            self.recorded.lock().unwrap().sink_bytes.extend_from_slice(data);
        }
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        channel_id: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if self.sink_channel == Some(channel_id) {
            self.sink_channel = None;
            session.exit_status_request(channel_id, self.sink_exit);
            session.close(channel_id);
        }
        Ok(())
    }
}
