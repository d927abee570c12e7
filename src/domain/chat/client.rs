//! REST client for the chat service

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{ChatError, GroupMembership, IdentityResolver};
use crate::config::ChatConfig;

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GroupMemberResponse {
    id: String,
}

/// Resolves identities and group members through the chat REST API
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    api_base_url: String,
    bot_token: Option<String>,
}

impl ChatClient {
    pub fn new(config: &ChatConfig) -> Result<Self, ChatError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }

    fn as_bot(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bot_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn list_users(&self) -> Result<Vec<UserResponse>, ChatError> {
        let res = self.as_bot(self.client.get(self.url("users"))).send().await?;
        check_status(res.status(), "users")?;
        Ok(res.json().await?)
    }
}

fn check_status(status: StatusCode, what: &str) -> Result<(), ChatError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ChatError::Unauthorized),
        s if !s.is_success() => Err(ChatError::Http(format!("GET {} returned {}", what, s))),
        _ => Ok(()),
    }
}

#[async_trait]
impl IdentityResolver for ChatClient {
    /// Asks the chat service who owns `credential`; the user name is the identity
    #[instrument(skip_all)]
    async fn resolve(&self, credential: &str) -> Result<String, ChatError> {
        let res = self
            .client
            .get(self.url("users/me"))
            .bearer_auth(credential)
            .send()
            .await?;
        check_status(res.status(), "users/me")?;

        let me: UserResponse = res.json().await?;
        debug!(user = %me.name, "identity resolved");
        Ok(me.name)
    }
}

#[async_trait]
impl GroupMembership for ChatClient {
    #[instrument(skip(self))]
    async fn members(&self, group_id: &str) -> Result<Vec<String>, ChatError> {
        let res = self
            .as_bot(self.client.get(self.url(&format!("groups/{}/members", group_id))))
            .send()
            .await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Err(ChatError::GroupNotFound(group_id.to_string()));
        }
        check_status(res.status(), "group members")?;
        let members: Vec<GroupMemberResponse> = res.json().await?;

        // Members come back as user ids; identities are user names
        let users = self.list_users().await?;
        let names: HashMap<&str, &str> = users
            .iter()
            .map(|u| (u.id.as_str(), u.name.as_str()))
            .collect();

        Ok(members
            .iter()
            .filter_map(|m| names.get(m.id.as_str()).map(|name| name.to_string()))
            .collect())
    }
}
