use pom::utf8::{any, end, one_of, seq, sym, Parser};
use url::Url;

use crate::{error::Error, event::MessageEvent, utils::BoxFuture};

use super::{Dispatch, Evaluator};

/// Host that reaches the container host from inside a container.
pub const BRIDGE_HOST: &str = "host.docker.internal";

/// `http(s)://localhost` or `http(s)://127.0.0.1`, yielding the explicit
/// `:port` and whatever follows the authority.
fn loopback<'a>() -> Parser<'a, (Option<&'a str>, Option<&'a str>)> {
    let scheme = seq("https://") | seq("http://");
    let host = seq("localhost") | seq("127.0.0.1");
    let port = (sym(':') + one_of("0123456789").repeat(1..)).collect().opt();
    let rest = (one_of("/?#") + any().repeat(0..)).collect().opt();

    (scheme * host * port + rest - end()).name("loopback url")
}

/// Points loopback evaluator addresses at the container bridge so a
/// listener running in a container can reach a sibling process on the host.
///
/// Works on the raw text: the scheme is forced to `http` and an explicit
/// port is kept as written, even when it is the default for `https`.
pub fn rewrite_loopback(raw: &str) -> String {
    match loopback().parse(raw.as_bytes()) {
        Ok((port, rest)) => format!(
            "http://{BRIDGE_HOST}{}{}",
            port.unwrap_or_default(),
            rest.unwrap_or_default()
        ),
        Err(_) => raw.to_owned(),
    }
}

pub struct LocalEvaluator {
    http: reqwest::Client,
    url: Option<Url>,
}

impl LocalEvaluator {
    pub fn new(http: reqwest::Client, url: Option<Url>) -> Self {
        Self { http, url }
    }

    /// Builds the evaluator from a configured address, pointing loopback
    /// addresses at [`BRIDGE_HOST`].
    pub fn bridged(http: reqwest::Client, raw: Option<&str>) -> eyre::Result<Self> {
        let url = raw
            .map(|raw| Url::parse(&rewrite_loopback(raw)))
            .transpose()?;

        Ok(Self::new(http, url))
    }
}

impl Evaluator for LocalEvaluator {
    fn dispatch<'a>(&'a self, event: &'a MessageEvent) -> BoxFuture<'a, Result<Dispatch, Error>> {
        Box::pin(async move {
            let url = self
                .url
                .clone()
                .ok_or_else(|| Error::missing_config("LOCAL_EVALUATOR_URL"))?;

            let body = serde_json::to_vec(event)?;

            tracing::info!(%url, "calling local evaluator");

            let request = self
                .http
                .post(url.clone())
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);

            tokio::spawn(async move {
                match request.send().await.and_then(|r| r.error_for_status()) {
                    Ok(response) => {
                        tracing::debug!(%url, status = %response.status(), "local evaluator responded")
                    }
                    Err(e) => {
                        tracing::error!(%url, error = %e, "error sending request to local evaluator")
                    }
                }
            });

            tracing::info!("local evaluator request sent asynchronously");

            Ok(Dispatch::Detached)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::prelude::*;

    use super::*;

    #[test]
    fn test_rewrite_localhost() {
        assert_eq!(
            rewrite_loopback("http://localhost:9000/evaluate"),
            "http://host.docker.internal:9000/evaluate"
        );
        assert_eq!(
            rewrite_loopback("https://localhost:9000/evaluate?x=1"),
            "http://host.docker.internal:9000/evaluate?x=1"
        );
        assert_eq!(rewrite_loopback("http://localhost"), "http://host.docker.internal");
    }

    #[test]
    fn test_rewrite_keeps_default_https_port() {
        assert_eq!(
            rewrite_loopback("https://localhost:443/run"),
            "http://host.docker.internal:443/run"
        );

        let evaluator =
            LocalEvaluator::bridged(reqwest::Client::new(), Some("https://localhost:443/run"))
                .unwrap();
        let url = evaluator.url.unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.port(), Some(443));
    }

    #[test]
    fn test_rewrite_loopback_ip() {
        assert_eq!(
            rewrite_loopback("http://127.0.0.1:3000/"),
            "http://host.docker.internal:3000/"
        );
        assert_eq!(
            rewrite_loopback("http://127.0.0.1/run"),
            "http://host.docker.internal/run"
        );
    }

    #[test]
    fn test_rewrite_leaves_other_hosts() {
        for url in [
            "https://evaluator.internal:8443/run",
            "http://10.0.0.5:80/",
            "http://localhost.example.com/run",
            "http://127.0.0.10/run",
            "ftp://localhost/run",
        ] {
            assert_eq!(rewrite_loopback(url), url);
        }
    }

    #[test]
    fn test_bridged_rejects_garbage() {
        assert!(LocalEvaluator::bridged(reqwest::Client::new(), Some("not a url")).is_err());
        assert!(LocalEvaluator::bridged(reqwest::Client::new(), None)
            .unwrap()
            .url
            .is_none());
    }

    #[tokio::test]
    async fn test_missing_url_is_config_error() {
        let evaluator = LocalEvaluator::new(reqwest::Client::new(), None);
        let event = MessageEvent::new("C1", "101", "<@BOT> help");

        assert!(matches!(
            evaluator.dispatch(&event).await,
            Err(Error::MissingConfig {
                name: "LOCAL_EVALUATOR_URL"
            })
        ));
    }

    #[tokio::test]
    async fn test_detached_post_carries_event() {
        let server = MockServer::start();
        let evaluate = server.mock(|when, then| {
            when.method(POST)
                .path("/evaluate")
                .header("content-type", "application/json")
                .body_includes("\"channel\":\"C1\"")
                .body_includes("\"thread_ts\":\"101\"");
            then.status(200);
        });

        let url = Url::parse(&server.url("/evaluate")).unwrap();
        let evaluator = LocalEvaluator::new(reqwest::Client::new(), Some(url));

        let mut event = MessageEvent::new("C1", "101", "<@BOT> help");
        event.enrich(None);

        assert_eq!(evaluator.dispatch(&event).await.unwrap(), Dispatch::Detached);

        for _ in 0..100 {
            if evaluate.calls() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        evaluate.assert_calls(1);
    }
}
