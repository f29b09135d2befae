use thiserror::Error;
use url::Url;

/// Why a page could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} on {url}")]
    Status { url: Url, status: u16 },

    #[error("DNS lookup failed for {url}")]
    Dns { url: Url },

    #[error("timed out fetching {url}")]
    Timeout { url: Url },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("browser failed on {url}: {message}")]
    Browser { url: Url, message: String },
}

/// What the crawler does with a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Put the same request back on the frontier
    Resubmit,
    /// Log it and move on
    Drop,
}

impl FetchError {
    /// Build a [`FetchError`] from a client error
    pub fn from_reqwest(url: &Url, err: reqwest::Error) -> Self {
        let url = url.clone();
        if err.is_timeout() || (err.is_connect() && chain_mentions(&err, &["timed out"])) {
            return FetchError::Timeout { url };
        }
        if chain_mentions(&err, DNS_MARKERS) {
            return FetchError::Dns { url };
        }
        if let Some(status) = err.status() {
            return FetchError::Status {
                url,
                status: status.as_u16(),
            };
        }
        FetchError::Transport { url, source: err }
    }

    /// Build a [`FetchError`] from a headless browser error
    pub fn from_browser(url: &Url, err: &anyhow::Error) -> Self {
        let url = url.clone();
        let message = format!("{:#}", err);
        let lowered = message.to_lowercase();
        if lowered.contains("err_name_not_resolved") {
            FetchError::Dns { url }
        } else if lowered.contains("timeout") || lowered.contains("timed out") {
            FetchError::Timeout { url }
        } else {
            FetchError::Browser { url, message }
        }
    }

    pub fn url(&self) -> &Url {
        match self {
            FetchError::Status { url, .. }
            | FetchError::Dns { url }
            | FetchError::Timeout { url }
            | FetchError::Transport { url, .. }
            | FetchError::Browser { url, .. } => url,
        }
    }

    /// Non-2xx responses are retried; unreachable hosts and timeouts are not
    pub fn disposition(&self) -> Disposition {
        match self {
            FetchError::Status { .. } => Disposition::Resubmit,
            FetchError::Dns { .. }
            | FetchError::Timeout { .. }
            | FetchError::Transport { .. }
            | FetchError::Browser { .. } => Disposition::Drop,
        }
    }
}

const DNS_MARKERS: &[&str] = &["dns error", "failed to lookup address", "name or service not known"];

fn chain_mentions(err: &(dyn std::error::Error + 'static), markers: &[&str]) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        let message = err.to_string().to_lowercase();
        if markers.iter().any(|marker| message.contains(marker)) {
            return true;
        }
        current = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://www.zillow.com/homes/").unwrap()
    }

    #[test]
    fn test_dispositions() {
        let status = FetchError::Status { url: url(), status: 503 };
        assert_eq!(status.disposition(), Disposition::Resubmit);
        assert_eq!(FetchError::Dns { url: url() }.disposition(), Disposition::Drop);
        assert_eq!(FetchError::Timeout { url: url() }.disposition(), Disposition::Drop);
        assert_eq!(status.url(), &url());
        assert_eq!(status.to_string(), "HTTP 503 on https://www.zillow.com/homes/");
    }

    #[test]
    fn test_browser_errors_are_classified() {
        let dns = anyhow::anyhow!("Navigate failed: net::ERR_NAME_NOT_RESOLVED");
        assert!(matches!(FetchError::from_browser(&url(), &dns), FetchError::Dns { .. }));

        let timeout = anyhow::anyhow!("The event waited for never came").context("Timeout");
        assert!(matches!(FetchError::from_browser(&url(), &timeout), FetchError::Timeout { .. }));

        let other = anyhow::anyhow!("tab crashed");
        match FetchError::from_browser(&url(), &other) {
            FetchError::Browser { message, .. } => assert_eq!(message, "tab crashed"),
            err => panic!("unexpected {:?}", err),
        }
    }
}
