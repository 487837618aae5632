//! HTTP implementation of the [`Transport`] contract.
//!
//! Builds the wire endpoints over a shared `reqwest` client:
//!
//! - `GET /v2/subscribe/{sub_key}/{channels}/0` (long-poll)
//! - `GET /v2/presence/sub-key/{sub_key}/channel/{channels}/heartbeat`
//! - `GET /v2/presence/sub-key/{sub_key}/channel/{channels}/leave`
//! - `GET /time/0` (reconnection probe)
//!
//! Failures never unwind out of the trait methods; they are folded into
//! the returned [`Status`] so the subscribe loop can dispatch on
//! category.

use async_trait::async_trait;
use url::Url;

use crate::core::config::ClientConfig;
use crate::core::error::{PubSubError, Result};
use crate::core::transport::{SubscribeOutcome, SubscribeRequest, Transport};
use crate::core::types::{Operation, Status, StatusCategory, SubscribeEnvelope, PRESENCE_SUFFIX};

/// Placeholder path segment when subscribing to channel groups only.
const EMPTY_CHANNEL_LIST: &str = ",";

/// `reqwest`-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Build a transport for the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .map_err(|e| PubSubError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> Result<Url> {
        let scheme = if self.config.tls_enabled {
            "https"
        } else {
            "http"
        };
        Ok(Url::parse(&format!("{}://{}", scheme, self.config.origin))?)
    }

    fn channel_segment(channels: &[String]) -> String {
        if channels.is_empty() {
            EMPTY_CHANNEL_LIST.to_string()
        } else {
            channels.join(",")
        }
    }

    fn status(
        &self,
        category: StatusCategory,
        error: bool,
        status_code: u16,
        operation: Operation,
        request_url: Option<&Url>,
    ) -> Status {
        let mut status = Status::new(category, error);
        status.status_code = status_code;
        status.operation = Some(operation);
        status.auth_key = self.config.auth_key.clone();
        status.origin = Some(self.config.origin.clone());
        status.tls_enabled = self.config.tls_enabled;
        status.client_request = request_url.map(|u| u.to_string());
        status
    }

    /// Map a completed-but-unsuccessful HTTP response onto a category.
    fn categorize_http_status(code: u16) -> StatusCategory {
        match code {
            400 => StatusCategory::BadRequest,
            401 | 403 => StatusCategory::AccessDenied,
            414 => StatusCategory::UriTooLong,
            _ => StatusCategory::Unknown,
        }
    }

    /// Map a transport-level send failure onto a category.
    fn categorize_send_error(err: &reqwest::Error) -> StatusCategory {
        if err.is_timeout() {
            StatusCategory::Timeout
        } else {
            StatusCategory::UnexpectedDisconnect
        }
    }

    fn subscribe_url(&self, request: &SubscribeRequest) -> Result<Url> {
        let mut url = self.base_url()?;
        let channels = Self::channel_segment(&request.channels);
        url.path_segments_mut()
            .map_err(|_| PubSubError::Config("origin cannot be a base URL".into()))?
            .extend([
                "v2",
                "subscribe",
                self.config.subscribe_key.as_str(),
                channels.as_str(),
                "0",
            ]);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("tt", &request.timetoken.to_string());
            if let Some(region) = &request.region {
                query.append_pair("tr", region);
            }
            if !request.channel_groups.is_empty() {
                query.append_pair("channel-group", &request.channel_groups.join(","));
            }
            if let Some(filter) = &request.filter_expression {
                query.append_pair("filter-expr", filter);
            }
            if !request.state.is_empty() {
                query.append_pair("state", &serde_json::to_string(&request.state)?);
            }
            if let Some(auth) = &self.config.auth_key {
                query.append_pair("auth", auth);
            }
        }

        Ok(url)
    }

    fn presence_url(&self, action: &str, channels: &[String], groups: &[String]) -> Result<Url> {
        let mut url = self.base_url()?;
        let channels = Self::channel_segment(channels);
        url.path_segments_mut()
            .map_err(|_| PubSubError::Config("origin cannot be a base URL".into()))?
            .extend([
                "v2",
                "presence",
                "sub-key",
                self.config.subscribe_key.as_str(),
                "channel",
                channels.as_str(),
                action,
            ]);

        {
            let mut query = url.query_pairs_mut();
            if !groups.is_empty() {
                query.append_pair("channel-group", &groups.join(","));
            }
            if let Some(auth) = &self.config.auth_key {
                query.append_pair("auth", auth);
            }
        }

        Ok(url)
    }

    /// Run a presence control call and fold the outcome into a status.
    async fn control_call(
        &self,
        action: &str,
        operation: Operation,
        channels: &[String],
        groups: &[String],
    ) -> Status {
        let url = match self.presence_url(action, channels, groups) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(action, error = %e, "failed to build presence URL");
                return self.status(StatusCategory::BadRequest, true, 0, operation, None);
            }
        };

        let response = self
            .client
            .get(url.clone())
            .timeout(self.config.request_timeout)
            .send()
            .await;

        let mut status = match response {
            Ok(response) => {
                let code = response.status().as_u16();
                if response.status().is_success() {
                    self.status(StatusCategory::Acknowledgment, false, code, operation, Some(&url))
                } else {
                    let category = Self::categorize_http_status(code);
                    self.status(category, true, code, operation, Some(&url))
                }
            }
            Err(e) => {
                let category = Self::categorize_send_error(&e);
                self.status(category, true, 0, operation, Some(&url))
            }
        };

        status.affected_channels = channels.to_vec();
        status.affected_channel_groups = groups.to_vec();
        status
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn subscribe(&self, request: SubscribeRequest) -> SubscribeOutcome {
        let url = match self.subscribe_url(&request) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "failed to build subscribe URL");
                let status =
                    self.status(StatusCategory::BadRequest, true, 0, Operation::Subscribe, None);
                return SubscribeOutcome {
                    envelope: None,
                    status,
                };
            }
        };
        tracing::debug!(%url, "issuing subscribe long-poll");

        let response = self
            .client
            .get(url.clone())
            .timeout(self.config.subscribe_timeout)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                let category = Self::categorize_send_error(&e);
                tracing::debug!(error = %e, ?category, "subscribe call failed");
                let status = self.status(category, true, 0, Operation::Subscribe, Some(&url));
                return SubscribeOutcome {
                    envelope: None,
                    status,
                };
            }
        };

        let code = response.status().as_u16();
        if !response.status().is_success() {
            let category = Self::categorize_http_status(code);
            let mut status = self.status(category, true, code, Operation::Subscribe, Some(&url));
            if category == StatusCategory::AccessDenied {
                // The server refuses the whole request; report the plain
                // channel names so they can be parked individually.
                status.affected_channels = request
                    .channels
                    .iter()
                    .filter(|c| !c.ends_with(PRESENCE_SUFFIX))
                    .cloned()
                    .collect();
                status.affected_channel_groups = request
                    .channel_groups
                    .iter()
                    .filter(|g| !g.ends_with(PRESENCE_SUFFIX))
                    .cloned()
                    .collect();
            }
            return SubscribeOutcome {
                envelope: None,
                status,
            };
        }

        match response.json::<SubscribeEnvelope>().await {
            Ok(envelope) => {
                let status = self.status(
                    StatusCategory::Acknowledgment,
                    false,
                    code,
                    Operation::Subscribe,
                    Some(&url),
                );
                SubscribeOutcome {
                    envelope: Some(envelope),
                    status,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not decode subscribe envelope");
                let status = self.status(
                    StatusCategory::MalformedResponse,
                    true,
                    code,
                    Operation::Subscribe,
                    Some(&url),
                );
                SubscribeOutcome {
                    envelope: None,
                    status,
                }
            }
        }
    }

    async fn heartbeat(&self, channels: &[String], channel_groups: &[String]) -> Status {
        self.control_call("heartbeat", Operation::Heartbeat, channels, channel_groups)
            .await
    }

    async fn leave(&self, channels: &[String], channel_groups: &[String]) -> Status {
        self.control_call("leave", Operation::Leave, channels, channel_groups)
            .await
    }

    async fn probe(&self) -> Result<()> {
        let mut url = self.base_url()?;
        url.path_segments_mut()
            .map_err(|_| PubSubError::Config("origin cannot be a base URL".into()))?
            .extend(["time", "0"]);

        let response = self
            .client
            .get(url)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PubSubError::Timeout
                } else {
                    PubSubError::Http(e.to_string())
                }
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(PubSubError::Http(format!(
                "probe returned {}",
                response.status()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> HttpTransport {
        HttpTransport::new(ClientConfig::new("ps.example.com", "sub-key")).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(HttpTransport::new(ClientConfig::default()).is_err());
    }

    #[test]
    fn test_subscribe_url_shape() {
        let request = SubscribeRequest {
            channels: vec!["a".into(), "b".into()],
            channel_groups: vec!["g".into()],
            timetoken: 1000,
            region: Some("4".into()),
            filter_expression: Some("uuid != 'me'".into()),
            ..Default::default()
        };
        let url = transport().subscribe_url(&request).unwrap();
        assert_eq!(url.path(), "/v2/subscribe/sub-key/a,b/0");
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("tt".into(), "1000".into())));
        assert!(query.contains(&("tr".into(), "4".into())));
        assert!(query.contains(&("channel-group".into(), "g".into())));
    }

    #[test]
    fn test_subscribe_url_group_only_uses_placeholder() {
        let request = SubscribeRequest {
            channel_groups: vec!["g".into()],
            ..Default::default()
        };
        let url = transport().subscribe_url(&request).unwrap();
        assert_eq!(url.path(), "/v2/subscribe/sub-key/,/0");
    }

    #[test]
    fn test_presence_url_shape() {
        let url = transport()
            .presence_url("leave", &["a".into()], &["g".into()])
            .unwrap();
        assert_eq!(url.path(), "/v2/presence/sub-key/sub-key/channel/a/leave");
        assert!(url.query().unwrap().contains("channel-group=g"));
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            HttpTransport::categorize_http_status(400),
            StatusCategory::BadRequest
        );
        assert_eq!(
            HttpTransport::categorize_http_status(403),
            StatusCategory::AccessDenied
        );
        assert_eq!(
            HttpTransport::categorize_http_status(414),
            StatusCategory::UriTooLong
        );
        assert_eq!(
            HttpTransport::categorize_http_status(500),
            StatusCategory::Unknown
        );
    }
}
