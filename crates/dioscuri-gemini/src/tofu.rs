//! Trust-on-first-use certificate pinning
//!
//! Gemini capsules mostly use self-signed certificates, so instead of a
//! CA chain the first public key seen for a `host:port` is pinned:
//! - Unknown host → pin it and accept
//! - Pin still valid → accept only the same key
//! - Pin expired → accept the same key and extend the pin, refuse others

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rusqlite::types::Type;
use rusqlite::OptionalExtension;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, SignatureScheme};
use serde::Serialize;
use sha2::{Digest, Sha256};

use dioscuri_storage::Database;

use crate::{Result, TrustError};

/// A pinned host key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnownHost {
    pub host: String,
    /// SHA-256 of the SubjectPublicKeyInfo, lowercase hex
    pub fingerprint: String,
    pub not_after: DateTime<Utc>,
    pub first_seen: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The parts of a server certificate that pinning looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedCertificate {
    pub fingerprint: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl PresentedCertificate {
    pub fn from_der(der: &[u8]) -> std::result::Result<Self, TrustError> {
        let (_, cert) =
            x509_parser::parse_x509_certificate(der).map_err(|_| TrustError::InvalidCertificate)?;

        let validity = cert.validity();
        let not_before = DateTime::from_timestamp(validity.not_before.timestamp(), 0)
            .ok_or(TrustError::InvalidCertificate)?;
        let not_after = DateTime::from_timestamp(validity.not_after.timestamp(), 0)
            .ok_or(TrustError::InvalidCertificate)?;

        Ok(Self {
            fingerprint: fingerprint(cert.public_key().raw),
            not_before,
            not_after,
        })
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    /// First contact; the key is now pinned
    TrustedNew,
    /// Matches an unexpired pin
    Trusted,
    /// Matches an expired pin, whose expiry is moved forward
    Renewed,
}

/// Decide whether `presented` may be trusted for a host pinned as `known`
pub fn evaluate(
    host: &str,
    presented: &PresentedCertificate,
    known: Option<&KnownHost>,
    now: DateTime<Utc>,
) -> std::result::Result<TrustDecision, TrustError> {
    if !presented.is_valid_at(now) {
        return Err(TrustError::Expired);
    }

    let Some(known) = known else {
        return Ok(TrustDecision::TrustedNew);
    };

    if known.fingerprint != presented.fingerprint {
        return Err(TrustError::KeyMismatch(host.to_string()));
    }

    if known.not_after < now {
        Ok(TrustDecision::Renewed)
    } else {
        Ok(TrustDecision::Trusted)
    }
}

fn fingerprint(spki: &[u8]) -> String {
    Sha256::digest(spki)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Pinned keys stored in the `known_hosts` table
#[derive(Clone)]
pub struct KnownHosts {
    db: Database,
    /// Pins seen by this process; a match here skips the database
    cache: Arc<RwLock<HashMap<String, KnownHost>>>,
}

impl KnownHosts {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn get(&self, host: &str) -> Result<Option<KnownHost>> {
        Ok(self.db.with_connection(|conn| {
            let entry = conn
                .query_row(
                    "SELECT host, fingerprint, not_after, first_seen, updated_at
                     FROM known_hosts WHERE host = ?1",
                    [host],
                    row_to_known_host,
                )
                .optional()?;
            Ok(entry)
        })?)
    }

    pub fn list(&self) -> Result<Vec<KnownHost>> {
        Ok(self.db.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT host, fingerprint, not_after, first_seen, updated_at
                 FROM known_hosts ORDER BY host",
            )?;
            let entries = stmt
                .query_map([], row_to_known_host)?
                .filter_map(|r| r.ok())
                .collect();
            Ok(entries)
        })?)
    }

    /// Drop a pin so the next certificate for `host` is trusted afresh
    pub fn forget(&self, host: &str) -> Result<bool> {
        self.cache.write().remove(host);
        Ok(self.db.with_connection(|conn| {
            let removed = conn.execute("DELETE FROM known_hosts WHERE host = ?1", [host])?;
            Ok(removed > 0)
        })?)
    }

    /// Check a presented certificate against the pin for `host`, pinning
    /// or renewing as needed
    pub fn check(&self, host: &str, der: &[u8], now: DateTime<Utc>) -> Result<TrustDecision> {
        let presented = PresentedCertificate::from_der(der)?;
        self.check_presented(host, &presented, now)
    }

    pub fn check_presented(
        &self,
        host: &str,
        presented: &PresentedCertificate,
        now: DateTime<Utc>,
    ) -> Result<TrustDecision> {
        if let Some(known) = self.cache.read().get(host) {
            if evaluate(host, presented, Some(known), now) == Ok(TrustDecision::Trusted) {
                tracing::debug!(host, "Certificate matches cached pin");
                return Ok(TrustDecision::Trusted);
            }
        }

        let (decision, pin) = self.db.transaction(|conn| {
            let known = conn
                .query_row(
                    "SELECT host, fingerprint, not_after, first_seen, updated_at
                     FROM known_hosts WHERE host = ?1",
                    [host],
                    row_to_known_host,
                )
                .optional()?;

            let decision = evaluate(host, presented, known.as_ref(), now);
            let now_str = now.to_rfc3339();
            let pin = match decision {
                Ok(TrustDecision::TrustedNew) => {
                    conn.execute(
                        "INSERT INTO known_hosts (host, fingerprint, not_after, first_seen, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?4)",
                        rusqlite::params![
                            host,
                            presented.fingerprint,
                            presented.not_after.to_rfc3339(),
                            now_str
                        ],
                    )?;
                    Some(KnownHost {
                        host: host.to_string(),
                        fingerprint: presented.fingerprint.clone(),
                        not_after: presented.not_after,
                        first_seen: now,
                        updated_at: now,
                    })
                }
                Ok(TrustDecision::Renewed) => {
                    conn.execute(
                        "UPDATE known_hosts SET not_after = ?1, updated_at = ?2 WHERE host = ?3",
                        rusqlite::params![presented.not_after.to_rfc3339(), now_str, host],
                    )?;
                    known.map(|known| KnownHost {
                        not_after: presented.not_after,
                        updated_at: now,
                        ..known
                    })
                }
                Ok(TrustDecision::Trusted) | Err(_) => known,
            };
            Ok((decision, pin))
        })?;

        if let Some(pin) = pin {
            self.cache.write().insert(host.to_string(), pin);
        }

        match &decision {
            Ok(TrustDecision::TrustedNew) => tracing::info!(host, "Pinned new host certificate"),
            Ok(TrustDecision::Renewed) => tracing::info!(host, "Renewed expired pin"),
            Ok(TrustDecision::Trusted) => tracing::debug!(host, "Certificate matches pin"),
            Err(reason) => tracing::warn!(host, %reason, "Rejected certificate"),
        }

        Ok(decision?)
    }
}

fn row_to_known_host(row: &rusqlite::Row<'_>) -> rusqlite::Result<KnownHost> {
    let parse = |idx: usize| -> rusqlite::Result<DateTime<Utc>> {
        let raw: String = row.get(idx)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })
    };

    Ok(KnownHost {
        host: row.get(0)?,
        fingerprint: row.get(1)?,
        not_after: parse(2)?,
        first_seen: parse(3)?,
        updated_at: parse(4)?,
    })
}

/// rustls verifier that defers trust to [`KnownHosts`]
///
/// Handshake signatures are still checked against the presented key.
pub(crate) struct TofuVerifier {
    known_hosts: KnownHosts,
    host: String,
    provider: Arc<CryptoProvider>,
    rejection: Mutex<Option<TrustError>>,
}

impl TofuVerifier {
    pub(crate) fn new(known_hosts: KnownHosts, host: String, provider: Arc<CryptoProvider>) -> Self {
        Self {
            known_hosts,
            host,
            provider,
            rejection: Mutex::new(None),
        }
    }

    /// Why the last handshake was refused, if pinning refused it
    pub(crate) fn take_rejection(&self) -> Option<TrustError> {
        self.rejection.lock().take()
    }
}

impl fmt::Debug for TofuVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TofuVerifier")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl ServerCertVerifier for TofuVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let now = i64::try_from(now.as_secs())
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now);

        match self.known_hosts.check(&self.host, end_entity.as_ref(), now) {
            Ok(_) => Ok(ServerCertVerified::assertion()),
            Err(crate::GeminiError::Untrusted(reason)) => {
                let error = match reason {
                    TrustError::InvalidCertificate => CertificateError::BadEncoding,
                    TrustError::Expired => CertificateError::Expired,
                    TrustError::KeyMismatch(_) => CertificateError::ApplicationVerificationFailure,
                };
                *self.rejection.lock() = Some(reason);
                Err(rustls::Error::InvalidCertificate(error))
            }
            Err(other) => Err(rustls::Error::General(other.to_string())),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
