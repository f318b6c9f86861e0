//! HTTP access to the roster resource.

use crate::error::RosterError;
use crate::model::{HeaderMode, RosterConfig, Student};
use crate::roster;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::StatusCode;

const ACCESS_TOKEN_HEADER: &str = "x-access-token";

#[derive(Clone)]
pub struct RosterClient {
    http: reqwest::Client,
    url: reqwest::Url,
    header: HeaderMode,
    gzip_upload: bool,
}

impl RosterClient {
    pub fn new(cfg: &RosterConfig) -> Result<Self> {
        let url =
            reqwest::Url::parse(&cfg.url).with_context(|| format!("invalid url {}", cfg.url))?;

        let mut headers = HeaderMap::new();
        if let Some(token) = cfg.token.as_deref() {
            let mut value = HeaderValue::from_str(token).context("invalid access token")?;
            value.set_sensitive(true);
            headers.insert(ACCESS_TOKEN_HEADER, value);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .default_headers(headers);
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build http client")?;

        Ok(Self {
            http,
            url,
            header: cfg.header,
            gzip_upload: cfg.gzip_upload,
        })
    }

    pub fn url(&self) -> &reqwest::Url {
        &self.url
    }

    /// GET the roster and parse it into records.
    pub async fn fetch_students(&self) -> Result<Vec<Student>> {
        tracing::debug!(url = %self.url, "fetching roster");
        let resp = self
            .http
            .get(self.url.clone())
            .header(ACCEPT, "application/json, text/plain")
            .send()
            .await
            .context("roster request failed")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RosterError::Status {
                method: "GET",
                url: self.url.to_string(),
                status,
            }
            .into());
        }

        let body = resp.text().await.context("read roster body")?;
        let students = roster::parse_body(&body, self.header).map_err(RosterError::from)?;
        tracing::info!(count = students.len(), bytes = body.len(), "roster fetched");
        Ok(students)
    }

    /// PUT the records back as a JSON array.
    pub async fn upload_students(&self, students: &[Student]) -> Result<StatusCode> {
        let body = roster::encode_upload(students, self.gzip_upload)?;
        tracing::debug!(
            url = %self.url,
            count = students.len(),
            bytes = body.bytes.len(),
            encoding = body.content_encoding.unwrap_or("identity"),
            "uploading roster"
        );

        let mut req = self
            .http
            .put(self.url.clone())
            .header(CONTENT_TYPE, "application/json");
        if let Some(encoding) = body.content_encoding {
            req = req.header(CONTENT_ENCODING, encoding);
        }
        let resp = req
            .body(body.bytes)
            .send()
            .await
            .context("roster upload failed")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RosterError::Status {
                method: "PUT",
                url: self.url.to_string(),
                status,
            }
            .into());
        }
        tracing::info!(count = students.len(), %status, "roster uploaded");
        Ok(status)
    }
}


#[cfg(test)]
mod tests {
    use super::test_server::{self, TOKEN};
    use super::*;

    #[tokio::test]
    async fn fetch_parses_json_wrapped_csv() {
        let (url, _) = test_server::spawn().await;
        let client = RosterClient::new(&test_server::config(&url, Some(TOKEN))).unwrap();
        let students = client.fetch_students().await.unwrap();
        assert_eq!(students.len(), 3);
        assert_eq!(students[0].first_name, "Zoe");
        assert_eq!(students[2].ip_address, "10.0.0.3");
    }

    #[tokio::test]
    async fn fetch_without_token_reports_status() {
        let (url, _) = test_server::spawn().await;
        let client = RosterClient::new(&test_server::config(&url, None)).unwrap();
        let err = client.fetch_students().await.unwrap_err();
        match err.downcast_ref::<RosterError>() {
            Some(RosterError::Status { status, method, .. }) => {
                assert_eq!(*status, StatusCode::UNAUTHORIZED);
                assert_eq!(*method, "GET");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_sends_gzipped_json() {
        let (url, recorded) = test_server::spawn().await;
        let client = RosterClient::new(&test_server::config(&url, Some(TOKEN))).unwrap();
        let mut students = client.fetch_students().await.unwrap();
        crate::roster::sort_students(
            &mut students,
            crate::model::SortKey::FirstName,
            crate::model::SortOrder::Ascending,
        );
        let status = client.upload_students(&students).await.unwrap();
        assert_eq!(status, StatusCode::OK);

        let uploads = recorded.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        let names: Vec<_> = uploads[0].iter().map(|s| s.first_name.as_str()).collect();
        assert_eq!(names, ["Amy", "Bob", "Zoe"]);
    }

    #[tokio::test]
    async fn upload_uncompressed_when_disabled() {
        let (url, recorded) = test_server::spawn().await;
        let mut cfg = test_server::config(&url, Some(TOKEN));
        cfg.gzip_upload = false;
        let client = RosterClient::new(&cfg).unwrap();
        client.upload_students(&[Student::default()]).await.unwrap();
        assert_eq!(recorded.uploads.lock().unwrap()[0].len(), 1);
    }

    #[tokio::test]
    async fn missing_resource_is_an_error() {
        let (url, _) = test_server::spawn().await;
        let url = url.replace("/roster", "/missing");
        let client = RosterClient::new(&test_server::config(&url, Some(TOKEN))).unwrap();
        assert!(client.fetch_students().await.is_err());
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(RosterClient::new(&test_server::config("not a url", None)).is_err());
    }
}
