use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CFG_PATH: &str = "config/default";
const LOCAL_CFG_PATH: &str = "config/local";
const ENV_PREFIX: &str = "DDZ";

/// 按优先级从低到高合并：内置默认值、配置文件、`DDZ_` 开头的环境变量
///
/// 环境变量用 `__` 分隔层级，例如 `DDZ_ROOM__KEY`、`DDZ_SERVER__BIND_ADDR`。
pub fn load() -> Result<Settings, ConfigError> {
    let defaults = Settings::default();
    Config::builder()
        .set_default("server.bind_addr", defaults.server.bind_addr)?
        .set_default("room.id", defaults.room.id)?
        .set_default("room.key", defaults.room.key)?
        .set_default("logging.filter", defaults.logging.filter)?
        .add_source(File::with_name(DEFAULT_CFG_PATH).required(false))
        .add_source(File::with_name(LOCAL_CFG_PATH).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub room: RoomSettings,
    #[serde(default)]
    pub logging: Logging,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub bind_addr: String,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            bind_addr: "0.0.0.0:3000".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomSettings {
    /// 唯一开放的房间
    pub id: String,
    /// 入座密钥，按字符串完全相等校验
    pub key: String,
}

impl Default for RoomSettings {
    fn default() -> Self {
        RoomSettings {
            id: doudizhu_core::MAIN_ROOM.into(),
            key: "ddz-2025".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    /// `tracing_subscriber::EnvFilter` 语法，`RUST_LOG` 优先
    pub filter: String,
}

impl Default for Logging {
    fn default() -> Self {
        Logging {
            filter: "info".into(),
        }
    }
}
