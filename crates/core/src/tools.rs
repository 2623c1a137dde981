//! Tool dispatch for speech-agent tool calls.
//!
//! The speech agent asks for mailbox work by name; the dispatcher maps that
//! name to a registered handler and always hands back a well-formed,
//! correlated outcome. An unknown tool or a failed handler degrades to a
//! spoken apology with `is_error` set, never an error that could stall the
//! voice conversation.

use crate::driver::{LABEL_INBOX, LABEL_UNREAD, MailDriver, MailThread};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Parameters attached to a tool call, as sent by the speech agent.
pub type ToolParams = serde_json::Map<String, Value>;

/// The correlated result of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub tool_call_id: String,
    pub result: String,
    pub is_error: bool,
}

const APOLOGY: &str = "I'm sorry, I had trouble with that request. Please try again.";

/// One named capability the agent may invoke.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, params: &ToolParams) -> Result<String>;
}

/// Per-call table of tool name to handler.
#[derive(Default)]
pub struct ToolDispatcher {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Executes `name` and returns an outcome correlated by `tool_call_id`.
    pub async fn execute(&self, name: &str, tool_call_id: &str, params: &ToolParams) -> ToolOutcome {
        let Some(handler) = self.handlers.get(name) else {
            warn!(tool = %name, "Tool call for unregistered tool");
            return ToolOutcome {
                tool_call_id: tool_call_id.to_string(),
                result: format!("I'm sorry, I can't do that. I don't have a tool called {name}."),
                is_error: true,
            };
        };

        match handler.call(params).await {
            Ok(result) => {
                info!(tool = %name, id = %tool_call_id, "Tool call completed");
                ToolOutcome {
                    tool_call_id: tool_call_id.to_string(),
                    result,
                    is_error: false,
                }
            }
            Err(e) => {
                error!(tool = %name, id = %tool_call_id, error = ?e, "Tool call failed");
                ToolOutcome {
                    tool_call_id: tool_call_id.to_string(),
                    result: APOLOGY.to_string(),
                    is_error: true,
                }
            }
        }
    }
}

// --- Parameter helpers ---
//
// The agent sends parameter values as strings, numbers, or booleans depending
// on how the caller phrased things, so numeric and boolean extraction accepts
// both forms.

fn str_param<'a>(params: &'a ToolParams, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

fn require_str<'a>(params: &'a ToolParams, key: &str) -> Result<&'a str> {
    str_param(params, key).with_context(|| format!("Missing required parameter {key:?}"))
}

fn int_param(params: &ToolParams, key: &str) -> Option<u64> {
    match params.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn bool_param(params: &ToolParams, key: &str) -> Option<bool> {
    match params.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn describe_thread(thread: &MailThread) -> String {
    let sender = thread.sender.as_deref().unwrap_or("an unknown sender");
    let subject = thread.subject.as_deref().unwrap_or("no subject");
    match &thread.snippet {
        Some(snippet) => format!("From {sender}, subject: {subject}. It says: {snippet}"),
        None => format!("From {sender}, subject: {subject}."),
    }
}

// --- Mailbox tool set ---

struct ListEmails {
    driver: Arc<dyn MailDriver>,
}

#[async_trait]
impl ToolHandler for ListEmails {
    async fn call(&self, params: &ToolParams) -> Result<String> {
        let query = str_param(params, "query");
        let max_results = int_param(params, "max_results").unwrap_or(5).clamp(1, 10) as usize;
        let page = self.driver.list_threads(query, max_results).await?;

        if page.threads.is_empty() {
            return Ok("There are no matching emails.".to_string());
        }
        let mut lines = vec![format!(
            "Here are the {} most recent matching emails.",
            page.threads.len()
        )];
        for (index, thread) in page.threads.iter().enumerate() {
            let summary = thread
                .snippet
                .as_deref()
                .or(thread.subject.as_deref())
                .unwrap_or("no preview available");
            lines.push(format!(
                "Email {} (id {}): {}",
                index + 1,
                thread.id,
                summary
            ));
        }
        Ok(lines.join(" "))
    }
}

struct ReadEmail {
    driver: Arc<dyn MailDriver>,
}

#[async_trait]
impl ToolHandler for ReadEmail {
    async fn call(&self, params: &ToolParams) -> Result<String> {
        let thread_id = require_str(params, "email_id")?;
        let thread = self.driver.get_thread(thread_id).await?;
        Ok(describe_thread(&thread))
    }
}

struct ArchiveEmail {
    driver: Arc<dyn MailDriver>,
}

#[async_trait]
impl ToolHandler for ArchiveEmail {
    async fn call(&self, params: &ToolParams) -> Result<String> {
        let thread_id = require_str(params, "email_id")?;
        self.driver
            .modify_labels(thread_id, &[], &[LABEL_INBOX.to_string()])
            .await?;
        Ok("Done, I archived that email.".to_string())
    }
}

struct MarkEmail {
    driver: Arc<dyn MailDriver>,
}

#[async_trait]
impl ToolHandler for MarkEmail {
    async fn call(&self, params: &ToolParams) -> Result<String> {
        let thread_id = require_str(params, "email_id")?;
        let Some(read) = bool_param(params, "read") else {
            bail!("Missing required parameter \"read\"");
        };
        let unread_label = [LABEL_UNREAD.to_string()];
        let (add, remove): (&[String], &[String]) = if read {
            (&[], &unread_label)
        } else {
            (&unread_label, &[])
        };
        self.driver.modify_labels(thread_id, add, remove).await?;
        Ok(if read {
            "Done, I marked that email as read.".to_string()
        } else {
            "Done, I marked that email as unread.".to_string()
        })
    }
}

struct LabelEmail {
    driver: Arc<dyn MailDriver>,
}

#[async_trait]
impl ToolHandler for LabelEmail {
    async fn call(&self, params: &ToolParams) -> Result<String> {
        let thread_id = require_str(params, "email_id")?;
        let name = require_str(params, "label")?;
        let label = self.driver.create_label(name).await?;
        self.driver
            .modify_labels(thread_id, &[label.id], &[])
            .await?;
        Ok(format!("Done, I filed that email under {}.", label.name))
    }
}

/// Builds the per-call tool table over a mail driver carrying the caller's
/// credentials.
pub fn mailbox_tools(driver: Arc<dyn MailDriver>) -> ToolDispatcher {
    let mut dispatcher = ToolDispatcher::new();
    dispatcher.register(
        "list_emails",
        Arc::new(ListEmails {
            driver: driver.clone(),
        }),
    );
    dispatcher.register(
        "read_email",
        Arc::new(ReadEmail {
            driver: driver.clone(),
        }),
    );
    dispatcher.register(
        "archive_email",
        Arc::new(ArchiveEmail {
            driver: driver.clone(),
        }),
    );
    dispatcher.register(
        "mark_email",
        Arc::new(MarkEmail {
            driver: driver.clone(),
        }),
    );
    dispatcher.register("label_email", Arc::new(LabelEmail { driver }));
    dispatcher
}
