use anyhow::{Context, Result};
use dockyard_core::buildpack::{self, DockerBuildConfig};
use std::path::Path;
use tracing::{info, instrument};

/// 生成 Dockerfile
///
/// `cache` 为 true 时生成缓存镜像阶段，并提示缓存镜像名。
#[instrument]
pub fn generate_dockerfile(file: &Path, cache: bool, output: Option<&Path>) -> Result<()> {
    let config = DockerBuildConfig::load_from_file(file)
        .with_context(|| format!("读取构建配置失败: {}", file.display()))?;

    let dockerfile = if cache {
        info!("🏗️  缓存镜像: {}", buildpack::cache_image(&config));
        buildpack::generate_cache_stage(&config)?
    } else {
        buildpack::generate(&config)?
    };

    match output {
        Some(path) => {
            std::fs::write(path, &dockerfile)
                .with_context(|| format!("写入 Dockerfile 失败: {}", path.display()))?;
            info!("✅ 已生成 {}", path.display());
        }
        None => print!("{dockerfile}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("build.toml");
        std::fs::write(
            &config,
            "application_id = \"web\"\nimage_tag = \"v1\"\nstart_command = \"node server.js\"\nport = 8080\n",
        )
        .unwrap();
        let output = dir.path().join("Dockerfile");

        generate_dockerfile(&config, false, Some(&output)).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("FROM node:lts\n"));
        assert!(text.ends_with("EXPOSE 8080\nCMD node server.js\n"));
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = generate_dockerfile(&dir.path().join("nope.toml"), false, None);
        assert!(result.is_err());
    }
}
