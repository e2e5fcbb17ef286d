//! Slack request signing.
//!
//! Slack signs each webhook with `v0=hex(hmac_sha256(secret, "v0:{ts}:{body}"))`
//! in `X-Slack-Signature`, alongside the `X-Slack-Request-Timestamp` it used.

use actix_web::{http::header::HeaderMap, FromRequest};
use hmac::{Hmac, Mac};
use pom::utf8::{any, end, one_of, seq, sym, Parser};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::{error::Error, utils::to_pom_error};

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_VERSION: &str = "v0";

/// Requests older or newer than this many seconds are rejected.
pub const MAX_CLOCK_SKEW_SECS: i64 = 60 * 5;

pub fn signature<'a>() -> Parser<'a, &'a str> {
    let digest = one_of("0123456789abcdefABCDEF").repeat(64..65).collect();

    (seq(SIGNATURE_VERSION) * sym('=') * digest - end()).name("slack signature")
}

pub fn timestamp<'a>() -> Parser<'a, i64> {
    let seconds = Parser::new(|bytes, position| {
        let len = bytes[position..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();

        let value = std::str::from_utf8(&bytes[position..position + len])
            .map_err(|e| to_pom_error(e, position, "Invalid UTF-8"))?
            .parse::<i64>()
            .map_err(|e| to_pom_error(e, position, "Invalid timestamp"))?;

        Ok((value, position + len))
    });

    (seconds - end()).name("request timestamp")
}

/// `Authorization: Bearer <token>`, used to guard the queue record endpoint.
pub fn bearer<'a>() -> Parser<'a, &'a str> {
    let tag = seq("Bearer");
    let space = sym(' ').repeat(1..);
    let rest = any().repeat(1..).collect();

    ((tag + space) * rest - end()).name("bearer auth")
}

/// Checks an `Authorization` header against the expected bearer token.
pub fn check_bearer(headers: &HeaderMap, expected: &SecretString) -> Result<(), Error> {
    let value = headers
        .get(actix_web::http::header::AUTHORIZATION)
        .ok_or_else(|| Error::missing_header("authorization"))?
        .to_str()
        .map_err(|_| Error::invalid_header("authorization"))?;

    let token = bearer()
        .parse(value.as_bytes())
        .map_err(|_| Error::invalid_header("authorization"))?;

    // Both sides go through the MAC so the comparison is constant time.
    let key = expected.expose_secret().as_bytes();
    let reference = token_mac(key, key)?.finalize().into_bytes();

    token_mac(key, token.as_bytes())?
        .verify_slice(&reference)
        .map_err(|_| Error::Unauthorized)
}

fn token_mac(key: &[u8], token: &[u8]) -> Result<Hmac<Sha256>, Error> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(Error::internal)?;
    mac.update(token);
    Ok(mac)
}

/// Computes the `X-Slack-Signature` value for a request.
pub fn sign(secret: &[u8], timestamp: i64, body: &[u8]) -> Result<String, Error> {
    let mac = mac_for(secret, timestamp, body)?;
    Ok(format!(
        "{SIGNATURE_VERSION}={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn mac_for(secret: &[u8], timestamp: i64, body: &[u8]) -> Result<Hmac<Sha256>, Error> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(Error::internal)?;
    mac.update(format!("{SIGNATURE_VERSION}:{timestamp}:").as_bytes());
    mac.update(body);
    Ok(mac)
}

/// Signature headers extracted from an inbound webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub timestamp: i64,
    pub signature: Vec<u8>,
}

impl SignedRequest {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, Error> {
        fn header<'h>(headers: &'h HeaderMap, name: &str) -> Result<&'h str, Error> {
            headers
                .get(name)
                .ok_or_else(|| Error::missing_header(name))?
                .to_str()
                .map_err(|_| Error::invalid_header(name))
        }

        let timestamp = timestamp()
            .parse(header(headers, TIMESTAMP_HEADER)?.as_bytes())
            .map_err(|_| Error::invalid_header(TIMESTAMP_HEADER))?;

        let signature = signature()
            .parse(header(headers, SIGNATURE_HEADER)?.as_bytes())
            .map_err(|_| Error::invalid_header(SIGNATURE_HEADER))
            .and_then(|digest| {
                hex::decode(digest).map_err(|_| Error::invalid_header(SIGNATURE_HEADER))
            })?;

        Ok(Self {
            timestamp,
            signature,
        })
    }

    /// Checks the timestamp window, then the signature over `body`.
    pub fn verify(&self, secret: &SecretString, body: &[u8], now: i64) -> Result<(), Error> {
        if (now - self.timestamp).abs() > MAX_CLOCK_SKEW_SECS {
            return Err(Error::StaleRequest);
        }

        mac_for(secret.expose_secret().as_bytes(), self.timestamp, body)?
            .verify_slice(&self.signature)
            .map_err(|_| Error::Unauthorized)
    }
}

impl FromRequest for SignedRequest {
    type Error = Error;

    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &actix_web::HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        std::future::ready(Self::from_headers(req.headers()))
    }
}
