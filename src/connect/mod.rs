//! Kafka Connect：JDBC source connector 的幂等注册
//!
//! 模块划分：
//! - config：ConnectorConfig / IngestMode 及校验
//! - registrar：ConnectorRegistrar（GET 查询 → 缺失时 POST 创建）

mod config;
mod registrar;

pub use config::{ConnectorConfig, IngestMode};
pub use registrar::{ConnectorRegistrar, RegistrationOutcome, RegistrationState};
