//! Telephony provider call control.
//!
//! Sessions need two things from the provider's REST API: the caller's phone
//! number for a call, and the ability to mark the call completed at teardown.
//! Both sit behind [`CallControl`] so session logic can be exercised with a
//! counting fake.

use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Call-scoped operations against the telephony provider.
#[async_trait]
pub trait CallControl: Send + Sync {
    /// Looks up the phone number that originated the call.
    async fn caller_number(&self, call_sid: &str) -> Result<String>;

    /// Marks the call completed so the provider hangs up cleanly.
    async fn complete_call(&self, call_sid: &str) -> Result<()>;
}

/// [`CallControl`] backed by the Twilio REST API.
pub struct TwilioCallControl {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
}

impl TwilioCallControl {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
        }
    }

    fn call_url(&self, call_sid: &str) -> String {
        format!(
            "{TWILIO_API_BASE}/2010-04-01/Accounts/{}/Calls/{call_sid}.json",
            self.account_sid
        )
    }
}

#[derive(Deserialize)]
struct CallResource {
    from: String,
}

#[async_trait]
impl CallControl for TwilioCallControl {
    async fn caller_number(&self, call_sid: &str) -> Result<String> {
        let call: CallResource = self
            .http
            .get(self.call_url(call_sid))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .context("Call lookup request failed")?
            .error_for_status()
            .with_context(|| format!("Provider rejected lookup of call {call_sid}"))?
            .json()
            .await
            .context("Malformed call resource")?;
        Ok(call.from)
    }

    async fn complete_call(&self, call_sid: &str) -> Result<()> {
        self.http
            .post(self.call_url(call_sid))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("Status", "completed")])
            .send()
            .await
            .context("Call completion request failed")?
            .error_for_status()
            .with_context(|| format!("Provider rejected completion of call {call_sid}"))?;
        Ok(())
    }
}
