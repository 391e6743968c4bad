//! 为 JavaScript 应用生成 Dockerfile
//!
//! `node` 模式直接在 Node 镜像中构建并运行；`static` 模式先构建缓存镜像，
//! 再从缓存镜像中复制产物到 nginx 镜像。

mod dockerfile;
mod secrets;

pub use dockerfile::{
    cache_image, generate, generate_cache_stage, generate_cache_stage_with, generate_with,
};
pub use secrets::{BuildSecret, PlainSecretSource, SecretSource};

use crate::constants::buildpack;
use crate::{DockyardError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 部署模式
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    #[default]
    Node,
    Static,
}

impl DeployMode {
    /// 未指定基础镜像时使用的镜像
    pub fn default_base_image(&self) -> &'static str {
        match self {
            DeployMode::Node => buildpack::DEFAULT_NODE_IMAGE,
            DeployMode::Static => buildpack::DEFAULT_STATIC_IMAGE,
        }
    }
}

/// Dockerfile 生成配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DockerBuildConfig {
    pub application_id: String,
    pub image_tag: String,
    #[serde(default)]
    pub base_image: Option<String>,
    /// static 模式缓存阶段使用的构建镜像
    #[serde(default)]
    pub base_build_image: Option<String>,
    #[serde(default)]
    pub install_command: Option<String>,
    #[serde(default)]
    pub build_command: Option<String>,
    #[serde(default)]
    pub start_command: Option<String>,
    /// 构建产物目录（相对 /app），static 模式必填
    #[serde(default)]
    pub publish_directory: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub deploy_mode: DeployMode,
    #[serde(default)]
    pub secrets: Vec<BuildSecret>,
    /// 0 表示不是 PR 部署
    #[serde(default)]
    pub pull_request_id: u64,
}

impl DockerBuildConfig {
    /// 从 TOML 文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DockerBuildConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn base_image(&self) -> &str {
        self.base_image
            .as_deref()
            .filter(|image| !image.trim().is_empty())
            .unwrap_or_else(|| self.deploy_mode.default_base_image())
    }

    pub fn is_pull_request(&self) -> bool {
        self.pull_request_id != 0
    }

    fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| DockyardError::buildpack(format!("缺少 {name}")))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.application_id.trim().is_empty() {
            return Err(DockyardError::buildpack("缺少 application_id"));
        }
        if self.image_tag.trim().is_empty() {
            return Err(DockyardError::buildpack("缺少 image_tag"));
        }
        Ok(())
    }
}
