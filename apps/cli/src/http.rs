//! `LinkClient` backed by reqwest.

use std::time::Duration;

use fieldlink_connection::{BoxFuture, LinkClient, LinkError, LinkRequest, LinkResponse, Method};

/// Plain-HTTP client for the sensor's embedded server.
pub struct HttpLink {
    http: reqwest::Client,
}

impl HttpLink {
    /// Creates a client. `connect_timeout` bounds TCP connection setup for
    /// every request.
    pub fn new(connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            // The sensor is on a private link; a system proxy would never reach it.
            .no_proxy()
            .build()?;
        Ok(Self { http })
    }

    async fn start(&self, request: LinkRequest) -> Result<reqwest::Response, LinkError> {
        let read_timeout = request.read_timeout;
        let mut builder = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
        }
        .timeout(read_timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        builder.send().await.map_err(|e| map_error(e, read_timeout))
    }
}

impl LinkClient for HttpLink {
    fn send(&self, request: LinkRequest) -> BoxFuture<'_, Result<LinkResponse, LinkError>> {
        Box::pin(async move {
            let read_timeout = request.read_timeout;
            let resp = self.start(request).await?;
            let status = resp.status().as_u16();
            let headers = collect_headers(&resp);
            let body = resp
                .bytes()
                .await
                .map_err(|e| map_error(e, read_timeout))?
                .to_vec();
            Ok(LinkResponse {
                status,
                headers,
                body,
            })
        })
    }

    fn download<'a>(
        &'a self,
        request: LinkRequest,
        on_fraction: &'a (dyn Fn(f64) + Send + Sync),
    ) -> BoxFuture<'a, Result<LinkResponse, LinkError>> {
        Box::pin(async move {
            let read_timeout = request.read_timeout;
            let mut resp = self.start(request).await?;
            let status = resp.status().as_u16();
            let headers = collect_headers(&resp);
            let expected = resp.content_length().filter(|&n| n > 0);

            let mut body = Vec::with_capacity(expected.unwrap_or(0).min(64 * 1024 * 1024) as usize);
            while let Some(chunk) = resp
                .chunk()
                .await
                .map_err(|e| map_error(e, read_timeout))?
            {
                body.extend_from_slice(&chunk);
                if let Some(total) = expected {
                    on_fraction((body.len() as f64 / total as f64).min(1.0));
                }
            }

            if (200..300).contains(&status) {
                on_fraction(1.0);
            }
            Ok(LinkResponse {
                status,
                headers,
                body,
            })
        })
    }
}

fn collect_headers(resp: &reqwest::Response) -> Vec<(String, String)> {
    resp.headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn map_error(err: reqwest::Error, read_timeout: Duration) -> LinkError {
    if err.is_timeout() {
        LinkError::Timeout(read_timeout)
    } else if err.is_connect() {
        LinkError::Connect(err.to_string())
    } else {
        LinkError::Io(err.to_string())
    }
}
