use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    database::DatabaseConfig,
    dispatcher_worker::{DispatcherConfig, WorkerConfig},
    logging::ObservabilityConfig,
    sender::SenderConfig,
};
use crate::validation::ConfigValidator;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub dispatcher: DispatcherConfig,
    pub worker: WorkerConfig,
    pub sender: SenderConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 按 默认值 -> TOML 文件 -> MAILER_* 环境变量 的顺序叠加加载配置
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let defaults =
            ConfigBuilder::try_from(&AppConfig::default()).context("构建默认配置失败")?;
        let mut builder = ConfigBuilder::builder().add_source(defaults);

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = ["config/mailer.toml", "mailer.toml", "/etc/mailer/config.toml"];

            if let Some(path) = default_paths.iter().find(|p| Path::new(p).exists()) {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("MAILER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        self.database.validate()?;
        self.dispatcher.validate()?;
        self.worker.validate()?;
        self.sender.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}
