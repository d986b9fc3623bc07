use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use url::Url;

use crate::http::{ApiRequest, FORM_CONTENT_TYPE, JSON_CONTENT_TYPE, SLACK_TIMEOUT, Transport};
use crate::settings::SlackSettings;
use crate::window::ReportWindow;
use crate::{AppError, Result};

const HISTORY_PAGE_LIMIT: u32 = 100;

/// A channel message as returned by `conversations.history`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Sender id; empty for some bot and system messages
    #[serde(default, rename = "user")]
    pub sender_id: String,
    #[serde(default)]
    pub text: String,
    /// Slack timestamp, "seconds.microseconds"
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub reply_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub real_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    ok: bool,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    error: String,
    #[serde(default)]
    needed: String,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct UsersListResponse {
    ok: bool,
    #[serde(default)]
    members: Vec<Member>,
    #[serde(default)]
    error: String,
    #[serde(default)]
    needed: String,
}

/// Slack Web API client for the two calls a report needs.
pub struct SlackClient<'a, T: Transport> {
    transport: &'a T,
    settings: &'a SlackSettings,
}

impl<'a, T: Transport> SlackClient<'a, T> {
    pub fn new(transport: &'a T, settings: &'a SlackSettings) -> Self {
        Self { transport, settings }
    }

    fn endpoint(&self, method: &str) -> Result<Url> {
        let base = if self.settings.api_base_url.ends_with('/') {
            self.settings.api_base_url.clone()
        } else {
            format!("{}/", self.settings.api_base_url)
        };
        Url::parse(&base)
            .and_then(|b| b.join(method))
            .map_err(|e| AppError::InvalidConfig(format!("slack.api-base-url: {}", e)))
    }

    /// Every member of the workspace, in a single `users.list` call.
    pub fn fetch_members(&self) -> Result<Vec<Member>> {
        let request = ApiRequest::get(self.endpoint("users.list")?, SLACK_TIMEOUT)
            .with_content_type(FORM_CONTENT_TYPE)
            .with_bearer(&self.settings.bot_token);

        let body = self.transport.execute(&request)?;
        let response: UsersListResponse =
            decode(&body).map_err(|e| AppError::Directory(format!("users.list: {}", e)))?;

        if !response.ok {
            return Err(AppError::Directory(AppError::slack_detail(
                &response.error,
                &response.needed,
            )));
        }

        tracing::info!(members = response.members.len(), "fetched workspace members");
        Ok(response.members)
    }

    /// All messages of `channel_id` in the window, following `next_cursor` until it is empty.
    pub fn fetch_history(&self, channel_id: &str, window: &ReportWindow) -> Result<Vec<Message>> {
        let mut url = self.endpoint("conversations.history")?;
        url.query_pairs_mut()
            .append_pair("channel", channel_id)
            .append_pair("inclusive", "true")
            .append_pair("include_all_metadata", "true")
            .append_pair("limit", &HISTORY_PAGE_LIMIT.to_string())
            .append_pair("start", &window.start.timestamp().to_string())
            .append_pair("end", &window.end.timestamp().to_string());

        let mut all_messages = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page = 0usize;

        loop {
            let mut page_url = url.clone();
            if let Some(cursor) = &cursor {
                page_url.query_pairs_mut().append_pair("cursor", cursor);
            }

            let request = ApiRequest::get(page_url, SLACK_TIMEOUT)
                .with_content_type(JSON_CONTENT_TYPE)
                .with_bearer(&self.settings.user_token);

            let body = self.transport.execute(&request)?;
            let response: HistoryResponse = decode(&body)
                .map_err(|e| AppError::SlackApi(format!("conversations.history: {}", e)))?;

            if !response.ok {
                return Err(AppError::SlackApi(AppError::slack_detail(
                    &response.error,
                    &response.needed,
                )));
            }

            page += 1;
            tracing::debug!(page, messages = response.messages.len(), "fetched history page");
            all_messages.extend(response.messages);

            match response.response_metadata {
                Some(meta) if !meta.next_cursor.is_empty() => cursor = Some(meta.next_cursor),
                _ => break,
            }
        }

        tracing::info!(
            pages = page,
            messages = all_messages.len(),
            channel = channel_id,
            "fetched channel history"
        );
        Ok(all_messages)
    }
}

fn decode<R: DeserializeOwned>(body: &[u8]) -> std::result::Result<R, serde_json::Error> {
    serde_json::from_slice(body)
}
