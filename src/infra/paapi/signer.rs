//! AWS Signature Version 4 (`AWS4-HMAC-SHA256`) for PA-API requests.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{OffsetDateTime, UtcOffset, macros::format_description};

use super::payload::GetItemsPayload;
use super::{GET_ITEMS_TARGET, SERVICE_NAME};

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const CONTENT_ENCODING: &str = "amz-1.0";
const CONTENT_TYPE: &str = "application/json";
const TERMINATOR: &str = "aws4_request";

#[derive(Debug, Error)]
pub enum SignError {
    #[error("failed to serialize request payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("failed to format request timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("invalid signing key length")]
    KeyLength,
}

/// API credentials. `Debug` never prints the secret.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub partner_tag: String,
}

impl Credentials {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        partner_tag: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            partner_tag: partner_tag.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.access_key.trim().is_empty()
            && !self.secret_key.trim().is_empty()
            && !self.partner_tag.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("partner_tag", &self.partner_tag)
            .finish()
    }
}

/// Headers and body ready to send. Header names are lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl SignedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: Credentials,
    region: String,
    service: String,
}

impl RequestSigner {
    pub fn new(credentials: &Credentials, region: impl Into<String>) -> Self {
        Self {
            credentials: credentials.clone(),
            region: region.into(),
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Sign `payload` for `method path` on `host` at `timestamp`.
    ///
    /// With incomplete credentials the request is still built but carries no
    /// `authorization` header; upstream rejects it.
    pub fn sign(
        &self,
        method: &str,
        path: &str,
        host: &str,
        payload: &GetItemsPayload,
        timestamp: OffsetDateTime,
    ) -> Result<SignedRequest, SignError> {
        let body = payload.canonical_bytes()?;
        let amz_date = amz_date(timestamp)?;
        let date_stamp = &amz_date[..8];

        let mut headers = vec![
            ("content-encoding".to_string(), CONTENT_ENCODING.to_string()),
            ("content-type".to_string(), CONTENT_TYPE.to_string()),
            ("host".to_string(), host.to_string()),
            ("x-amz-date".to_string(), amz_date.clone()),
            ("x-amz-target".to_string(), GET_ITEMS_TARGET.to_string()),
        ];

        if self.credentials.is_complete() {
            let signed_headers = signed_header_names(&headers);
            let canonical = canonical_request(method, path, &headers, &signed_headers, &body);
            let scope = self.credential_scope(date_stamp);
            let to_sign = string_to_sign(&amz_date, &scope, &canonical);
            let signing_key = derive_signing_key(
                &self.credentials.secret_key,
                date_stamp,
                &self.region,
                &self.service,
            )?;
            let signature = hex::encode(hmac_sha256(&signing_key, to_sign.as_bytes())?);

            headers.push((
                "authorization".to_string(),
                format!(
                    "{ALGORITHM} Credential={}/{scope},SignedHeaders={signed_headers},Signature={signature}",
                    self.credentials.access_key
                ),
            ));
        }

        Ok(SignedRequest { headers, body })
    }

    fn credential_scope(&self, date_stamp: &str) -> String {
        format!(
            "{date_stamp}/{}/{}/{TERMINATOR}",
            self.region, self.service
        )
    }
}

/// `YYYYMMDDTHHMMSSZ` in UTC.
pub fn amz_date(timestamp: OffsetDateTime) -> Result<String, time::error::Format> {
    timestamp
        .to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year][month][day]T[hour][minute][second]Z"
        ))
}

fn signed_header_names(headers: &[(String, String)]) -> String {
    let mut names: Vec<&str> = headers.iter().map(|(name, _)| name.as_str()).collect();
    names.sort_unstable();
    names.join(";")
}

pub(crate) fn canonical_request(
    method: &str,
    path: &str,
    headers: &[(String, String)],
    signed_headers: &str,
    body: &[u8],
) -> String {
    let mut sorted: Vec<&(String, String)> = headers.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = sorted
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name.to_ascii_lowercase(), value.trim()))
        .collect();

    format!(
        "{method}\n{path}\n\n{canonical_headers}\n{signed_headers}\n{}",
        hex::encode(Sha256::digest(body))
    )
}

fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    )
}

pub(crate) fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, SignError> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, TERMINATOR.as_bytes())
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>, SignError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|_| SignError::KeyLength)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}
