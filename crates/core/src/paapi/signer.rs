//! AWS Signature Version 4 for PA-API requests.
//!
//! Only `host` and `x-amz-date` are signed. The query string is passed through as given
//! (PA-API calls use an empty one).

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const SIGNED_HEADERS: &str = "host;x-amz-date";
pub const TERMINATOR: &str = "aws4_request";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct Signer {
    access_key: String,
    secret_key: String,
    region: String,
    service: String,
}

#[derive(Debug, Clone, Copy)]
pub struct SigningRequest<'a> {
    pub method: &'a str,
    pub uri: &'a str,
    pub query: &'a str,
    pub host: &'a str,
    pub payload: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// Value for the `x-amz-date` header; identical to the timestamp that was signed.
    pub amz_date: String,
    pub authorization: String,
}

impl Signer {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            region: region.into(),
            service: service.into(),
        }
    }

    pub fn sign(&self, req: &SigningRequest<'_>, at: DateTime<Utc>) -> SignedHeaders {
        let amz_date = at.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = at.format("%Y%m%d").to_string();
        let scope = credential_scope(&date_stamp, &self.region, &self.service);

        let canonical = canonical_request(req, &amz_date);
        let to_sign = string_to_sign(&amz_date, &scope, &canonical);
        let key = derive_signing_key(&self.secret_key, &date_stamp, &self.region, &self.service);
        let signature = hex::encode(hmac_sha256(&key, to_sign.as_bytes()));

        SignedHeaders {
            authorization: format!(
                "{ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
                self.access_key
            ),
            amz_date,
        }
    }
}

pub fn credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{date_stamp}/{region}/{service}/{TERMINATOR}")
}

pub fn canonical_request(req: &SigningRequest<'_>, amz_date: &str) -> String {
    let canonical_headers = format!("host:{}\nx-amz-date:{amz_date}\n", req.host);
    format!(
        "{}\n{}\n{}\n{canonical_headers}\n{SIGNED_HEADERS}\n{}",
        req.method,
        req.uri,
        req.query,
        sha256_hex(req.payload.as_bytes())
    )
}

pub fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    )
}

/// kDate -> kRegion -> kService -> kSigning.
pub fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, TERMINATOR.as_bytes())
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC is defined for keys of any length.
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac key of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const EXAMPLE_SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    fn vanilla() -> SigningRequest<'static> {
        SigningRequest {
            method: "GET",
            uri: "/",
            query: "",
            host: "example.amazonaws.com",
            payload: "",
        }
    }

    #[test]
    fn derives_published_signing_key() {
        let key = derive_signing_key(EXAMPLE_SECRET, "20120215", "us-east-1", "iam");
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn empty_payload_hash() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn canonical_request_matches_get_vanilla() {
        let canonical = canonical_request(&vanilla(), "20150830T123600Z");
        assert_eq!(
            canonical,
            "GET\n/\n\nhost:example.amazonaws.com\nx-amz-date:20150830T123600Z\n\nhost;x-amz-date\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            sha256_hex(canonical.as_bytes()),
            "bb579772317eb040ac9ed261061d46c1f17a8133879d6129b6e1c25292927e63"
        );
    }

    #[test]
    fn signs_get_vanilla() {
        let signer = Signer::new("AKIDEXAMPLE", EXAMPLE_SECRET, "us-east-1", "service");
        let at = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();
        let signed = signer.sign(&vanilla(), at);

        assert_eq!(signed.amz_date, "20150830T123600Z");
        assert_eq!(
            signed.authorization,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
    }

    #[test]
    fn signature_depends_on_payload() {
        let signer = Signer::new("AKID", "secret", "us-east-1", "ProductAdvertisingAPI");
        let at = Utc.with_ymd_and_hms(2026, 10, 14, 8, 0, 0).unwrap();
        let base = SigningRequest {
            method: "POST",
            uri: "/paapi5/getitems",
            query: "",
            host: "webservices.amazon.com",
            payload: "{\"ItemIds\":[\"B000123ABC\"]}",
        };
        let other = SigningRequest {
            payload: "{\"ItemIds\":[\"B000123ABD\"]}",
            ..base
        };

        let a = signer.sign(&base, at);
        let b = signer.sign(&other, at);
        assert_ne!(a.authorization, b.authorization);
        assert_eq!(a, signer.sign(&base, at));
        assert!(a
            .authorization
            .contains("Credential=AKID/20261014/us-east-1/ProductAdvertisingAPI/aws4_request"));
    }
}
