use std::sync::OnceLock;
use std::time::Duration;

use crate::runtime::ReadinessProbe;

fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            // Per-request timeout well under the orchestrator's poll
            // interval so a hung connect does not eat the attempt budget.
            .timeout(Duration::from_secs(2))
            .build()
            .expect("failed to build reqwest client")
    })
}

/// Readiness = an HTTP 200 from the bound port. Anything else, including
/// a refused connection while the server is still booting, counts as
/// "not yet ready" and is never escalated.
#[derive(Debug, Default, Clone)]
pub struct HttpProbe;

#[async_trait::async_trait]
impl ReadinessProbe for HttpProbe {
    async fn is_ready(&self, port: u16) -> bool {
        let url = format!("http://127.0.0.1:{port}/");
        match http_client().get(&url).send().await {
            Ok(resp) => resp.status() == reqwest::StatusCode::OK,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unbound_port_is_not_ready() {
        // Port 1 is never bound in test environments.
        let probe = HttpProbe;
        assert!(!probe.is_ready(1).await);
    }
}
