use super::secrets::{PlainSecretSource, SecretSource};
use super::{DeployMode, DockerBuildConfig};
use crate::constants::buildpack;
use crate::{DockyardError, Result};
use tracing::debug;

/// 逐行拼接 Dockerfile 指令
#[derive(Debug, Default)]
struct Dockerfile {
    lines: Vec<String>,
}

impl Dockerfile {
    fn push(&mut self, instruction: impl Into<String>) -> &mut Self {
        self.lines.push(instruction.into());
        self
    }

    fn header(&mut self, config: &DockerBuildConfig, workdir: &str) -> &mut Self {
        self.push(format!("FROM {}", config.base_image()))
            .push(format!("WORKDIR {workdir}"))
            .push(format!(
                "LABEL {}={}",
                buildpack::APPLICATION_LABEL,
                config.application_id
            ))
    }

    fn build_args(
        &mut self,
        config: &DockerBuildConfig,
        source: &dyn SecretSource,
    ) -> Result<&mut Self> {
        let is_pull_request = config.is_pull_request();
        for secret in config
            .secrets
            .iter()
            .filter(|secret| secret.applies_to(is_pull_request))
        {
            let value = source.resolve(secret)?;
            self.push(format!("ARG {}={}", secret.name, value));
        }
        Ok(self)
    }

    fn run_if_present(&mut self, command: &Option<String>) -> &mut Self {
        if let Some(command) = command.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            self.push(format!("RUN {command}"));
        }
        self
    }

    fn finish(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// 缓存镜像名：`<application_id>:<image_tag>-cache`
pub fn cache_image(config: &DockerBuildConfig) -> String {
    format!(
        "{}:{}{}",
        config.application_id,
        config.image_tag,
        buildpack::CACHE_TAG_SUFFIX
    )
}

/// 生成部署用 Dockerfile，构建变量按原值写入
pub fn generate(config: &DockerBuildConfig) -> Result<String> {
    generate_with(config, &PlainSecretSource)
}

/// 生成部署用 Dockerfile，构建变量的值由 `source` 解析
pub fn generate_with(config: &DockerBuildConfig, source: &dyn SecretSource) -> Result<String> {
    config.validate()?;
    debug!(
        application_id = %config.application_id,
        mode = ?config.deploy_mode,
        "生成 Dockerfile"
    );

    match config.deploy_mode {
        DeployMode::Node => node(config, source),
        DeployMode::Static => static_site(config),
    }
}

fn node(config: &DockerBuildConfig, source: &dyn SecretSource) -> Result<String> {
    let start = DockerBuildConfig::require(&config.start_command, "start_command")?;
    let port = config
        .port
        .ok_or_else(|| DockyardError::buildpack("缺少 port"))?;

    let mut file = Dockerfile::default();
    file.header(config, buildpack::APP_DIR);
    file.build_args(config, source)?;
    file.push("COPY . ./")
        .run_if_present(&config.install_command)
        .run_if_present(&config.build_command)
        .push(format!("EXPOSE {port}"))
        .push(format!("CMD {start}"));
    Ok(file.finish())
}

fn static_site(config: &DockerBuildConfig) -> Result<String> {
    let publish = DockerBuildConfig::require(&config.publish_directory, "publish_directory")?;
    let publish = publish.trim_matches('/');

    let mut file = Dockerfile::default();
    file.header(config, buildpack::STATIC_ROOT)
        .push(format!(
            "COPY --from={} {}/{} ./",
            cache_image(config),
            buildpack::APP_DIR,
            publish
        ))
        .push(format!("EXPOSE {}", buildpack::STATIC_PORT));
    Ok(file.finish())
}

/// 生成 static 模式所需的缓存镜像 Dockerfile
///
/// 缓存阶段优先使用 `base_build_image`；static 模式下 `base_image` 属于最终的 nginx 阶段，
/// 因此未指定时回退到默认 Node 镜像。
pub fn generate_cache_stage(config: &DockerBuildConfig) -> Result<String> {
    generate_cache_stage_with(config, &PlainSecretSource)
}

/// 生成缓存镜像 Dockerfile，构建变量的值由 `source` 解析
pub fn generate_cache_stage_with(
    config: &DockerBuildConfig,
    source: &dyn SecretSource,
) -> Result<String> {
    config.validate()?;

    let stage_config = DockerBuildConfig {
        base_image: Some(cache_base_image(config).to_string()),
        ..config.clone()
    };

    let mut file = Dockerfile::default();
    file.header(&stage_config, buildpack::APP_DIR);
    file.build_args(config, source)?;
    file.push("COPY . ./")
        .run_if_present(&config.install_command)
        .run_if_present(&config.build_command);
    Ok(file.finish())
}

fn cache_base_image(config: &DockerBuildConfig) -> &str {
    if let Some(image) = config
        .base_build_image
        .as_deref()
        .filter(|image| !image.trim().is_empty())
    {
        return image;
    }
    match config.deploy_mode {
        DeployMode::Node => config.base_image(),
        DeployMode::Static => buildpack::DEFAULT_NODE_IMAGE,
    }
}
