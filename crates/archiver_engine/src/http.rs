use std::time::Duration;

/// Transport settings shared by every outbound HTTP client.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            user_agent: format!("slack-archiver/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientSettings {
    pub(crate) fn build_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .user_agent(self.user_agent.clone())
            .build()
    }
}

/// Joins an API base such as `https://slack.com/api` with a path, tolerating
/// trailing and leading slashes.
pub(crate) fn join_base(base: &str, path: &str) -> Result<url::Url, url::ParseError> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url::Url::parse(&joined)
}
