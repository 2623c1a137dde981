//! Mail driver capability.
//!
//! Tool handlers reach the caller's mailbox exclusively through the
//! [`MailDriver`] trait, so the concrete mail backend stays swappable and the
//! tool set can be tested against an in-memory fake. [`HttpMailDriver`] is the
//! Gmail-style REST implementation used in production, authenticated with the
//! call-scoped access token resolved at call setup.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Well-known label for the inbox; removing it archives a thread.
pub const LABEL_INBOX: &str = "INBOX";
/// Well-known label marking a thread unread.
pub const LABEL_UNREAD: &str = "UNREAD";

/// A mail thread as the tools see it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MailThread {
    pub id: String,
    pub subject: Option<String>,
    pub sender: Option<String>,
    pub snippet: Option<String>,
    pub unread: bool,
}

/// One page of thread summaries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadPage {
    pub threads: Vec<MailThread>,
}

/// A user-visible label.
#[derive(Debug, Clone, PartialEq)]
pub struct MailLabel {
    pub id: String,
    pub name: String,
}

/// The mailbox operations a call session may perform.
#[async_trait]
pub trait MailDriver: Send + Sync {
    /// Lists the most recent threads, optionally narrowed by a search query.
    async fn list_threads(&self, query: Option<&str>, max_results: usize) -> Result<ThreadPage>;

    /// Fetches one thread with enough metadata to read it out loud.
    async fn get_thread(&self, thread_id: &str) -> Result<MailThread>;

    /// Adds and removes label ids on a thread.
    async fn modify_labels(&self, thread_id: &str, add: &[String], remove: &[String])
    -> Result<()>;

    /// Creates a label and returns it.
    async fn create_label(&self, name: &str) -> Result<MailLabel>;
}

/// Gmail-style REST implementation of [`MailDriver`].
pub struct HttpMailDriver {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl HttpMailDriver {
    pub fn new(http: reqwest::Client, base_url: String, access_token: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/users/me/{}", self.base_url, path)
    }
}

// Wire shapes for the mail API; kept private to the driver so the rest of the
// crate only ever sees the domain types above.

#[derive(Deserialize)]
struct ThreadListResponse {
    #[serde(default)]
    threads: Vec<ThreadStub>,
}

#[derive(Deserialize)]
struct ThreadStub {
    id: String,
    #[serde(default)]
    snippet: Option<String>,
}

#[derive(Deserialize)]
struct ThreadResource {
    id: String,
    #[serde(default)]
    messages: Vec<MessageResource>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageResource {
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    label_ids: Vec<String>,
    #[serde(default)]
    payload: Option<MessagePayload>,
}

#[derive(Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<MessageHeader>,
}

#[derive(Deserialize)]
struct MessageHeader {
    name: String,
    value: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifyThreadRequest<'a> {
    add_label_ids: &'a [String],
    remove_label_ids: &'a [String],
}

#[derive(Serialize)]
struct CreateLabelRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct LabelResource {
    id: String,
    name: String,
}

fn header_value(message: &MessageResource, name: &str) -> Option<String> {
    message.payload.as_ref().and_then(|p| {
        p.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
    })
}

#[async_trait]
impl MailDriver for HttpMailDriver {
    async fn list_threads(&self, query: Option<&str>, max_results: usize) -> Result<ThreadPage> {
        let mut request = self
            .http
            .get(self.url("threads"))
            .bearer_auth(&self.access_token)
            .query(&[("maxResults", max_results.to_string())]);
        if let Some(query) = query {
            request = request.query(&[("q", query)]);
        }
        let response: ThreadListResponse = request
            .send()
            .await
            .context("Mail API request failed")?
            .error_for_status()
            .context("Mail API rejected thread listing")?
            .json()
            .await
            .context("Malformed thread listing response")?;

        Ok(ThreadPage {
            threads: response
                .threads
                .into_iter()
                .map(|stub| MailThread {
                    id: stub.id,
                    snippet: stub.snippet,
                    ..MailThread::default()
                })
                .collect(),
        })
    }

    async fn get_thread(&self, thread_id: &str) -> Result<MailThread> {
        let resource: ThreadResource = self
            .http
            .get(self.url(&format!("threads/{thread_id}")))
            .bearer_auth(&self.access_token)
            .query(&[("format", "metadata")])
            .send()
            .await
            .context("Mail API request failed")?
            .error_for_status()
            .with_context(|| format!("Mail API rejected fetch of thread {thread_id}"))?
            .json()
            .await
            .context("Malformed thread response")?;

        let first = resource.messages.first();
        let last = resource.messages.last();
        Ok(MailThread {
            id: resource.id,
            subject: first.and_then(|m| header_value(m, "Subject")),
            sender: first.and_then(|m| header_value(m, "From")),
            snippet: last.and_then(|m| m.snippet.clone()),
            unread: resource
                .messages
                .iter()
                .any(|m| m.label_ids.iter().any(|l| l == LABEL_UNREAD)),
        })
    }

    async fn modify_labels(
        &self,
        thread_id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<()> {
        self.http
            .post(self.url(&format!("threads/{thread_id}/modify")))
            .bearer_auth(&self.access_token)
            .json(&ModifyThreadRequest {
                add_label_ids: add,
                remove_label_ids: remove,
            })
            .send()
            .await
            .context("Mail API request failed")?
            .error_for_status()
            .with_context(|| format!("Mail API rejected label change on thread {thread_id}"))?;
        Ok(())
    }

    async fn create_label(&self, name: &str) -> Result<MailLabel> {
        let label: LabelResource = self
            .http
            .post(self.url("labels"))
            .bearer_auth(&self.access_token)
            .json(&CreateLabelRequest { name })
            .send()
            .await
            .context("Mail API request failed")?
            .error_for_status()
            .with_context(|| format!("Mail API rejected creation of label {name:?}"))?
            .json()
            .await
            .context("Malformed label response")?;
        Ok(MailLabel {
            id: label.id,
            name: label.name,
        })
    }
}
