//! Pluto - NBA 预测智能体系统
//!
//! 模块划分：
//! - **parser**: Schema 驱动的结构化响应恢复（策略级联，永不抛错）
//! - **memory**: 通信协议的滚动对话历史
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Ollama / Mock）
//! - **agency**: Agent 基座、通信协议、人格倾向、会话、工具、推理引擎与编排
//! - **agents**: 具体 Agent（球员预测 / 比赛预测 / Twitter 发帖）
//! - **predictions**: 上下文接口、请求阶段状态机与响应类型
//! - **db**: SQLite 工作单元与预测记录仓储
//! - **scheduler**: 每日定时与固定间隔作业
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **observability**: tracing 初始化

pub mod agency;
pub mod agents;
pub mod config;
pub mod db;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod parser;
pub mod predictions;
pub mod scheduler;
