use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 构建期变量
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BuildSecret {
    pub name: String,
    pub value: String,
    /// 是否在构建阶段可见
    #[serde(default)]
    pub is_build_secret: bool,
    /// 是否只用于 PR 部署
    #[serde(default)]
    pub is_pr_secret: bool,
}

impl fmt::Debug for BuildSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildSecret")
            .field("name", &self.name)
            .field("value", &"***")
            .field("is_build_secret", &self.is_build_secret)
            .field("is_pr_secret", &self.is_pr_secret)
            .finish()
    }
}

impl BuildSecret {
    /// 本次部署是否需要以 ARG 形式传入
    pub fn applies_to(&self, is_pull_request: bool) -> bool {
        self.is_build_secret && self.is_pr_secret == is_pull_request
    }
}

/// 解析构建变量的实际值
///
/// 只定义接口，镜像构建时的密钥注入由调用方实现。
pub trait SecretSource: Send + Sync {
    fn resolve(&self, secret: &BuildSecret) -> Result<String>;
}

/// 直接使用配置中的值
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainSecretSource;

impl SecretSource for PlainSecretSource {
    fn resolve(&self, secret: &BuildSecret) -> Result<String> {
        Ok(secret.value.clone())
    }
}
