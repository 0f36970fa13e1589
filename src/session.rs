//! Internal mailbox API operations.
//!
//! This module wraps the REST calls of the mailbox service with proper error
//! handling. State checks and error absorption live in [`crate::client`].

use crate::config::Endpoints;
use crate::error::{Error, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, instrument};

/// HTTP access to one mailbox service.
#[derive(Debug, Clone)]
pub(crate) struct RemoteMailbox {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl RemoteMailbox {
    pub(crate) fn new(http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    /// Fetches at most `limit` raw records of `address`, in service order.
    #[instrument(name = "session::fetch_records", skip(self, token))]
    pub(crate) async fn fetch_records(
        &self,
        address: &str,
        token: &SecretString,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let url = self.endpoints.mailbox_url(address);

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, bearer(token))
            .send()
            .await
            .map_err(|source| Error::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::UnexpectedStatus { url, status });
        }

        let mut records: Vec<Value> = response
            .json()
            .await
            .map_err(|source| Error::DecodeResponse {
                url: url.clone(),
                source,
            })?;

        debug!(record_count = records.len(), "Fetched mailbox records");

        records.truncate(limit);
        Ok(records)
    }

    /// Deletes one message. Only a `200 OK` counts as success.
    #[instrument(name = "session::delete_record", skip(self, token))]
    pub(crate) async fn delete_record(
        &self,
        address: &str,
        id: &str,
        token: &SecretString,
    ) -> Result<()> {
        let url = self.endpoints.message_url(address, id);

        let response = self
            .http
            .delete(&url)
            .header(AUTHORIZATION, bearer(token))
            .send()
            .await
            .map_err(|source| Error::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::UnexpectedStatus { url, status });
        }

        debug!("Deleted message");
        Ok(())
    }
}

fn bearer(token: &SecretString) -> String {
    format!("bearer {}", token.expose_secret())
}
