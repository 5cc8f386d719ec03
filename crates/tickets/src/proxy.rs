//! Proxy-granting ticket delivery.
//!
//! A proxying service receives its proxy-granting ticket out of band: the
//! ticket core calls the service's https callback with the ticket id and an
//! IOU, and hands only the IOU back in the validation response. The
//! transport lives behind [`ProxyCallbackClient`] so the core carries no
//! HTTP stack; `casticket-http` provides the reqwest implementation.

use async_trait::async_trait;
use url::Url;

use crate::error::BoxError;

/// Query parameter carrying the IOU.
pub const PGT_IOU_PARAMETER: &str = "pgtIou";

/// Query parameter carrying the proxy-granting ticket id.
pub const PGT_ID_PARAMETER: &str = "pgtId";

/// Sends proxy-granting tickets to proxy callbacks.
#[async_trait]
pub trait ProxyCallbackClient: Send + Sync {
    /// Calls `url` and reports whether the callback accepted the ticket.
    ///
    /// # Errors
    ///
    /// Any transport failure or unacceptable response.
    async fn send(&self, url: &Url) -> Result<(), BoxError>;
}

/// Appends the IOU and ticket id to a proxy callback.
///
/// Existing query parameters are preserved.
///
/// ```
/// use casticket::proxy::callback_url;
/// use url::Url;
///
/// let proxy_id = Url::parse("https://proxy.example.org/cb?app=1").unwrap();
/// let url = callback_url(&proxy_id, "PGTIOU-1-a", "PGT-1-b");
/// assert_eq!(url.as_str(), "https://proxy.example.org/cb?app=1&pgtIou=PGTIOU-1-a&pgtId=PGT-1-b");
/// ```
#[must_use]
pub fn callback_url(proxy_id: &Url, pgt_iou: &str, pgt_id: &str) -> Url {
    let mut url = proxy_id.clone();
    url.query_pairs_mut().append_pair(PGT_IOU_PARAMETER, pgt_iou).append_pair(PGT_ID_PARAMETER, pgt_id);
    url
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::no_query("https://p.example.org/cb", "https://p.example.org/cb?pgtIou=IOU&pgtId=PGT-1")]
    #[case::existing_query("https://p.example.org/cb?a=b", "https://p.example.org/cb?a=b&pgtIou=IOU&pgtId=PGT-1")]
    #[case::with_port("https://p.example.org:8443/", "https://p.example.org:8443/?pgtIou=IOU&pgtId=PGT-1")]
    fn appends_parameters(#[case] proxy_id: &str, #[case] expected: &str) {
        let url = callback_url(&Url::parse(proxy_id).expect("url"), "IOU", "PGT-1");
        assert_eq!(url.as_str(), expected);
    }

    #[test]
    fn reserved_characters_are_encoded() {
        let url = callback_url(&Url::parse("https://p.example.org/cb").expect("url"), "a&b", "c=d");
        assert_eq!(url.query(), Some("pgtIou=a%26b&pgtId=c%3Dd"));
    }
}
