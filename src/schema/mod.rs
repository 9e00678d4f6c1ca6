//! Schema registry：注册 key/value schema 并按 registry wire format 封装载荷
//!
//! - client：FormatRegistryClient（REST 注册 + (subject, schema)→id 缓存）
//! - Schema：待注册的 JSON Schema 文本

mod client;

pub use client::{FormatRegistryClient, MAGIC_BYTE, frame};

/// `schemaType` sent with every registration; payloads are serialized with serde_json.
pub const SCHEMA_TYPE: &str = "JSON";

/// A JSON Schema document registered under a topic's key or value subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    definition: String,
}

impl Schema {
    pub fn new(definition: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
        }
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }
}

pub fn key_subject(topic: &str) -> String {
    format!("{topic}-key")
}

pub fn value_subject(topic: &str) -> String {
    format!("{topic}-value")
}
