// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Tool Manager (§4.4): owns the map from `ToolRequestId` to `ToolInstance`,
//! dispatches concurrent tool execution, and reassembles results in source
//! order regardless of completion order.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;

use agentcore_model::{MessageId, ThreadId, ToolRequestId, ToolResultOutcome};

use crate::instance::{ToolInstance, ToolInstanceState};
use crate::permission::{PermissionDecision, PermissionGate};
use crate::registry::ToolRegistry;
use crate::tool::{ToolCall, ToolExecution};

#[derive(Debug, Error)]
pub enum ToolManagerError {
    #[error("tool request {0} is already tracked")]
    AlreadyInitialized(ToolRequestId),
    #[error("unknown tool request {0}")]
    UnknownRequest(ToolRequestId),
}

/// The result handed back to the Agent for one resolved `tool_use`.
#[derive(Debug, Clone)]
pub struct ProviderToolResult {
    pub id: ToolRequestId,
    pub result: ToolResultOutcome,
}

pub struct ToolManager {
    registry: Arc<ToolRegistry>,
    gate: Arc<PermissionGate>,
    instances: HashMap<ToolRequestId, ToolInstance>,
    tasks: HashMap<ToolRequestId, JoinHandle<ToolExecution>>,
    /// `(name, args)` for requests parked in `PendingUserAction`, kept around
    /// so `approve` has something to dispatch once the user grants it.
    pending: HashMap<ToolRequestId, (String, Value)>,
}

impl ToolManager {
    pub fn new(registry: Arc<ToolRegistry>, gate: Arc<PermissionGate>) -> Self {
        Self {
            registry,
            gate,
            instances: HashMap::new(),
            tasks: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// Register a new `tool_use` invocation and begin executing it.
    ///
    /// Tools are single-threaded-cooperative from the Agent's point of view
    /// but run as independent tasks (§5) so multiple `tool_use` blocks in
    /// one assistant message execute concurrently.
    pub fn init(
        &mut self,
        id: ToolRequestId,
        _thread_id: ThreadId,
        _message_id: MessageId,
        name: String,
        args: Value,
        thread_id_for_instance: ThreadId,
    ) -> Result<(), ToolManagerError> {
        if self.instances.contains_key(&id) {
            return Err(ToolManagerError::AlreadyInitialized(id));
        }

        let mut instance = ToolInstance::new(id.clone(), thread_id_for_instance);
        let tool = self.registry.get(&name);

        let decision = match (&tool, tool.as_ref().map(|t| t.is_read_only()).unwrap_or(false)) {
            (Some(_), true) => PermissionDecision::Allow,
            (Some(_), false) => self.decide_permission(&name, &args),
            (None, _) => PermissionDecision::Allow, // surfaced as unknown-tool error below
        };

        match decision {
            PermissionDecision::Deny => {
                instance.complete(ToolResultOutcome::Err(format!("permission denied for tool {name}")));
                self.instances.insert(id, instance);
                return Ok(());
            }
            PermissionDecision::RequireApproval => {
                instance.request_approval();
                self.pending.insert(id.clone(), (name, args));
                self.instances.insert(id, instance);
                // `approve` looks up `name`/`args` from `self.pending` and
                // spawns the task once the user grants permission.
                return Ok(());
            }
            PermissionDecision::Allow => {
                instance.start_processing();
            }
        }

        self.spawn(id, instance, name, args);
        Ok(())
    }

    /// Best-effort permission classification. Tools that do not declare a
    /// subject (pure queries, `get_file`) are always allowed through.
    fn decide_permission(&self, name: &str, args: &Value) -> PermissionDecision {
        match name {
            "insert" | "replace" => args
                .get("file_path")
                .and_then(|v| v.as_str())
                .map(|p| self.gate.can_write(std::path::Path::new(p)))
                .unwrap_or(PermissionDecision::RequireApproval),
            "bash_command" => args
                .get("command")
                .and_then(|v| v.as_str())
                .map(|c| self.gate.can_run(c))
                .unwrap_or(PermissionDecision::RequireApproval),
            _ => PermissionDecision::Allow,
        }
    }

    fn spawn(&mut self, id: ToolRequestId, instance: ToolInstance, name: String, args: Value) {
        let registry = Arc::clone(&self.registry);
        let handle = tokio::spawn(async move {
            let call = ToolCall { name, args };
            registry.execute(&call).await
        });
        self.instances.insert(id.clone(), instance);
        self.tasks.insert(id, handle);
    }

    /// Called once the user grants approval for a `pending-user-action` tool.
    /// Transitions the instance to `Processing` and spawns its execution task.
    pub fn approve(&mut self, id: &ToolRequestId) -> Result<(), ToolManagerError> {
        if !self.instances.contains_key(id) {
            return Err(ToolManagerError::UnknownRequest(id.clone()));
        }
        let (name, args) = self
            .pending
            .remove(id)
            .ok_or_else(|| ToolManagerError::UnknownRequest(id.clone()))?;
        let mut instance = self.instances.remove(id).unwrap();
        instance.approve();
        self.spawn(id.clone(), instance, name, args);
        Ok(())
    }

    pub fn get(&self, id: &ToolRequestId) -> Option<&ToolInstance> {
        self.instances.get(id)
    }

    /// Resolve once every instance in `ids` is done, or abort_all() is called
    /// concurrently. Preserves the input order of `ids` in the output.
    pub async fn await_completion(&mut self, ids: &[ToolRequestId]) -> Vec<ProviderToolResult> {
        for id in ids {
            if let Some(handle) = self.tasks.remove(id) {
                let exec = handle.await.unwrap_or_else(|e| ToolExecution::err(format!("tool task panicked: {e}")));
                if let Some(instance) = self.instances.get_mut(id) {
                    instance.complete(exec.into_outcome());
                }
            }
        }
        ids.iter()
            .map(|id| {
                let result = self
                    .instances
                    .get(id)
                    .and_then(|i| i.result().cloned())
                    .unwrap_or_else(|| ToolResultOutcome::Err("tool never resolved".into()));
                ProviderToolResult { id: id.clone(), result }
            })
            .collect()
    }

    /// Abort every not-done instance, synthesizing `err("user aborted")`.
    pub fn abort_all(&mut self) {
        for handle in self.tasks.values() {
            handle.abort();
        }
        self.tasks.clear();
        for instance in self.instances.values_mut() {
            instance.abort();
        }
    }
}
