//! Business logic calling a downstream HTTP endpoint.

use tracing::{debug, instrument};

use crate::error::{CallError, CallResult, Service};

const UPPER_PATH: &str = "/upper?word=anything";

/// `GET {base_url}/upper?word=anything` and return the body as text.
///
/// The status code is not inspected.
///
/// # Errors
///
/// Returns [`CallError::Connection`] when the server cannot be reached and
/// [`CallError::Driver`] for any other transport failure.
#[instrument(level = "debug", skip_all, fields(base_url = %base_url))]
pub async fn http_client_call(base_url: &str) -> CallResult<String> {
    let url = format!("{}{UPPER_PATH}", base_url.trim_end_matches('/'));
    let response = reqwest::get(&url).await.map_err(|err| {
        if err.is_connect() {
            CallError::connection(Service::Http, err)
        } else {
            CallError::driver("http get", err)
        }
    })?;
    debug!(status = %response.status(), "received response");
    response
        .text()
        .await
        .map_err(|err| CallError::driver("read response body", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn closed_port() -> std::io::Result<u16> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        drop(listener);
        Ok(port)
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() -> anyhow::Result<()> {
        let port = closed_port()?;
        let err = http_client_call(&format!("http://127.0.0.1:{port}"))
            .await
            .expect_err("nothing is listening");
        assert!(matches!(
            err,
            CallError::Connection {
                service: Service::Http,
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_url_is_a_driver_error() {
        let err = http_client_call("not a url")
            .await
            .expect_err("url should not parse");
        assert!(matches!(err, CallError::Driver { operation: "http get", .. }));
    }
}
