// ==========================================
// 血液配送收货系统 - 配置层
// ==========================================
// 职责: 规则名称、轮询间隔、表单限制等配置,支持文件/环境变量覆写
// ==========================================

pub mod config_manager;
pub mod error;
pub mod workflow_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, default_config_path, ConfigManager};
pub use error::{ConfigError, ConfigResult};
pub use workflow_config_trait::{WorkflowConfigReader, WorkflowSettings};
