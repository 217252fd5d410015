//! Script execution contract between the bridge and the engine.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::locator::ResourceLocator;

/// Script text plus the line it starts at in its source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptSnippet {
    pub script: String,
    pub line_offset: u32,
}

/// One script execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptRequest {
    pub script: String,
    /// File the script came from; relative requires resolve against it.
    pub file_name: ResourceLocator,
    /// Variables visible to the script when it starts.
    pub variables: Map<String, Value>,
    pub line_offset: u32,
}

impl ScriptRequest {
    /// Request with no initial variables, starting at line 0.
    pub fn standalone(script: String, file_name: ResourceLocator) -> Self {
        Self {
            script,
            file_name,
            variables: Map::new(),
            line_offset: 0,
        }
    }
}

/// Engine capability that runs scripts.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    async fn execute_script(&self, request: ScriptRequest) -> Result<()>;
}
