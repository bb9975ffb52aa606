//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `PLUTO__*` 覆盖（双下划线表示嵌套，如 `PLUTO__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub comms: CommsSection,
    #[serde(default)]
    pub db: DbSection,
    #[serde(default)]
    pub predictions: PredictionsSection,
    #[serde(default)]
    pub tools: ToolsSection,
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：deepseek / openai / ollama；凭证缺失时退回 mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// 联网检索模型名（仅 openai 后端；配置后才支持增强模式）
    pub search_model: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            model: "deepseek-chat".to_string(),
            base_url: None,
            search_model: None,
            request_timeout_secs: 60,
        }
    }
}

/// [comms] 段：通信协议的滚动历史
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommsSection {
    /// 滚动历史保留轮数
    pub history_turns: usize,
}

impl Default for CommsSection {
    fn default() -> Self {
        Self { history_turns: 5 }
    }
}

/// [db] 段：SQLite 路径
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DbSection {
    /// 未设置时用 ./pluto.db
    pub path: Option<PathBuf>,
}

impl DbSection {
    pub fn path_or_default(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from("pluto.db"))
    }
}

/// [predictions] 段：每日预测任务
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictionsSection {
    pub daily_hour: u32,
    pub daily_minute: u32,
    /// 单日批次失败的最大重试次数
    pub max_retries: u32,
}

impl Default for PredictionsSection {
    fn default() -> Self {
        Self {
            daily_hour: 9,
            daily_minute: 30,
            max_retries: 2,
        }
    }
}

/// [tools] 段：web search 工具与 Twitter 发帖
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ToolsSection {
    #[serde(default)]
    pub web_search: WebSearchSection,
    #[serde(default)]
    pub twitter: TwitterSection,
}

/// [tools.web_search] 段：抓取 URL 的超时、最大字符数、允许的域名白名单
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSearchSection {
    pub timeout_secs: u64,
    pub max_result_chars: usize,
    pub allowed_domains: Vec<String>,
}

impl Default for WebSearchSection {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_result_chars: 8000,
            allowed_domains: vec![
                "www.espn.com".into(),
                "www.nba.com".into(),
                "stats.nba.com".into(),
                "www.basketball-reference.com".into(),
                "sports.yahoo.com".into(),
                "bleacherreport.com".into(),
                "www.cbssports.com".into(),
                "www.theringer.com".into(),
                "www.actionnetwork.com".into(),
                "www.rotowire.com".into(),
                "en.wikipedia.org".into(),
            ],
        }
    }
}

/// [tools.twitter] 段：API 地址（Bearer Token 从环境变量 TWITTER_BEARER_TOKEN 读取）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TwitterSection {
    pub api_base: String,
}

impl Default for TwitterSection {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com/2".to_string(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 PLUTO__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 PLUTO__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name));
            break;
        }
    }

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("PLUTO")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
