//! sslrenew - SSL 证书签发与批量部署工具库
//!
//! 提供证书签发 (acme.sh 封装)、打包和 SSH 批量部署功能

pub mod acme;
pub mod archive;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

// 远程部署模块 - SSH 连接、上传与命令执行
pub mod deploy;
