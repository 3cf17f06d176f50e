// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Probe Primitives
 * Single-shot, best-effort network probes: TCP connect, DNS lookups,
 * TLS SAN extraction, Certificate Transparency queries
 *
 * Every primitive runs at most once per invocation. Timeout racing is
 * the executor's job; a timed out probe is abandoned, not killed.
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod executor;

use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioResolver;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::debug;
use x509_parser::prelude::*;

use crate::errors::{NetworkError, ScanError, ScanResult};
use crate::http_client::HttpClient;

static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?(\.[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?)+$")
        .expect("hostname regex")
});

static EMBEDDED_HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-z0-9][a-z0-9.-]*\.[a-z]{2,}").expect("embedded hostname regex")
});

/// Lowercase, strip wildcard markers and stray dots
pub fn normalize_hostname(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .trim_start_matches("*.")
        .trim_start_matches('*')
        .trim_start_matches('.')
        .trim_end_matches('.')
        .to_string()
}

/// True subdomain check: `host` is below `domain`, not equal to it
pub fn is_subdomain_of(host: &str, domain: &str) -> bool {
    host != domain && host.ends_with(&format!(".{}", domain))
}

pub fn is_well_formed_hostname(host: &str) -> bool {
    host.len() <= 253 && HOSTNAME_RE.is_match(host)
}

/// Extract hostnames belonging to `domain` from free-form text such as
/// TXT record payloads (SPF includes, verification entries, ...)
pub fn extract_domain_hostnames(text: &str, domain: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    EMBEDDED_HOSTNAME_RE
        .find_iter(&lowered)
        .map(|m| normalize_hostname(m.as_str()))
        .filter(|h| is_subdomain_of(h, domain) && is_well_formed_hostname(h))
        .collect()
}

/// Build a resolver against the system DNS configuration
pub fn system_resolver() -> ScanResult<TokioResolver> {
    let resolver = TokioResolver::builder(TokioConnectionProvider::default())
        .map_err(|e| {
            ScanError::Network(NetworkError::Other(format!(
                "failed to build resolver: {}",
                e
            )))
        })?
        .build();
    Ok(resolver)
}

/// TCP connect test against a single socket address
pub async fn tcp_connect(addr: SocketAddr, connect_timeout: Duration) -> ScanResult<()> {
    match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => Err(
            ScanError::Network(NetworkError::ConnectionRefused {
                endpoint: addr.to_string(),
            }),
        ),
        Ok(Err(e)) => Err(ScanError::Network(NetworkError::ConnectionFailed {
            endpoint: addr.to_string(),
            reason: e.to_string(),
        })),
        Err(_) => Err(ScanError::Timeout {
            duration: connect_timeout,
        }),
    }
}

/// TCP connect test by hostname, for candidates that only resolved to an
/// alias. The OS resolver supplies the address.
pub async fn tcp_connect_host(host: &str, port: u16, connect_timeout: Duration) -> ScanResult<()> {
    match timeout(connect_timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => Err(
            ScanError::Network(NetworkError::ConnectionRefused {
                endpoint: format!("{}:{}", host, port),
            }),
        ),
        Ok(Err(e)) => Err(ScanError::Network(NetworkError::ConnectionFailed {
            endpoint: format!("{}:{}", host, port),
            reason: e.to_string(),
        })),
        Err(_) => Err(ScanError::Timeout {
            duration: connect_timeout,
        }),
    }
}

/// Resolution result of the fallback chain
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedHost {
    Address(IpAddr),
    Alias(String),
}

impl ResolvedHost {
    pub fn address(&self) -> Option<IpAddr> {
        match self {
            ResolvedHost::Address(ip) => Some(*ip),
            ResolvedHost::Alias(_) => None,
        }
    }
}

/// Ordered fallback chain for host resolution, evaluated short-circuit:
/// A record, else AAAA, else CNAME.
const HOST_RESOLUTION_CHAIN: [RecordType; 3] =
    [RecordType::A, RecordType::AAAA, RecordType::CNAME];

pub async fn resolve_host(resolver: &TokioResolver, host: &str) -> ScanResult<ResolvedHost> {
    for record_type in HOST_RESOLUTION_CHAIN {
        let lookup = match resolver.lookup(host, record_type).await {
            Ok(lookup) => lookup,
            Err(_) => continue,
        };

        for record in lookup.iter() {
            match record {
                RData::A(a) => return Ok(ResolvedHost::Address(IpAddr::V4(a.0))),
                RData::AAAA(aaaa) => return Ok(ResolvedHost::Address(IpAddr::V6(aaaa.0))),
                RData::CNAME(cname) => {
                    return Ok(ResolvedHost::Alias(normalize_hostname(
                        &cname.0.to_utf8(),
                    )))
                }
                _ => continue,
            }
        }
    }

    Err(ScanError::Network(NetworkError::DnsResolutionFailed {
        host: host.to_string(),
        reason: "no A, AAAA or CNAME record".to_string(),
    }))
}

/// MX exchange hostnames for a domain; absence is an empty list
pub async fn lookup_mx(resolver: &TokioResolver, domain: &str) -> Vec<String> {
    match resolver.mx_lookup(domain).await {
        Ok(response) => response
            .iter()
            .map(|mx| normalize_hostname(&mx.exchange().to_utf8()))
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// TXT record payloads for a domain; absence is an empty list
pub async fn lookup_txt(resolver: &TokioResolver, domain: &str) -> Vec<String> {
    match resolver.txt_lookup(domain).await {
        Ok(response) => response
            .iter()
            .flat_map(|txt| txt.iter())
            .map(|data| String::from_utf8_lossy(data).to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Reverse DNS lookup for an address
pub async fn reverse_lookup(resolver: &TokioResolver, ip: IpAddr) -> ScanResult<Vec<String>> {
    let response = resolver.reverse_lookup(ip).await.map_err(|e| {
        ScanError::Network(NetworkError::DnsResolutionFailed {
            host: ip.to_string(),
            reason: e.to_string(),
        })
    })?;

    Ok(response
        .iter()
        .map(|name| normalize_hostname(&name.to_string()))
        .collect())
}

/// Certificate verifier that accepts every chain. Discovery reads the
/// certificate content; it does not establish trust.
#[derive(Debug)]
struct NoVerification {
    provider: rustls::crypto::CryptoProvider,
}

impl NoVerification {
    fn new() -> Self {
        Self {
            provider: rustls::crypto::ring::default_provider(),
        }
    }
}

impl rustls::client::danger::ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// TLS handshake to `host:port` and Subject Alternative Name extraction.
/// Chain validation is skipped: the goal is hostname discovery, not trust.
pub async fn tls_san(host: &str, port: u16, handshake_timeout: Duration) -> ScanResult<Vec<String>> {
    let verifier = NoVerification::new();
    let provider = Arc::new(verifier.provider.clone());

    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| {
            ScanError::Network(NetworkError::TlsHandshakeFailed {
                host: host.to_string(),
                reason: e.to_string(),
            })
        })?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();

    let connector = TlsConnector::from(Arc::new(config));

    let server_name = rustls::pki_types::ServerName::try_from(host.to_string()).map_err(|_| {
        ScanError::Network(NetworkError::InvalidUrl {
            url: host.to_string(),
        })
    })?;

    let host_owned = host.to_string();
    let handshake = async move {
        let tcp = TcpStream::connect((host_owned.as_str(), port))
            .await
            .map_err(|e| {
                ScanError::Network(NetworkError::ConnectionFailed {
                    endpoint: format!("{}:{}", host_owned, port),
                    reason: e.to_string(),
                })
            })?;
        connector.connect(server_name, tcp).await.map_err(|e| {
            ScanError::Network(NetworkError::TlsHandshakeFailed {
                host: host_owned.clone(),
                reason: e.to_string(),
            })
        })
    };

    let stream = timeout(handshake_timeout, handshake)
        .await
        .map_err(|_| ScanError::Timeout {
            duration: handshake_timeout,
        })??;

    let (_, session) = stream.get_ref();
    let certs = session
        .peer_certificates()
        .ok_or_else(|| {
            ScanError::Network(NetworkError::TlsHandshakeFailed {
                host: host.to_string(),
                reason: "no peer certificate presented".to_string(),
            })
        })?;

    let cert = certs.first().ok_or_else(|| {
        ScanError::Network(NetworkError::TlsHandshakeFailed {
            host: host.to_string(),
            reason: "empty certificate chain".to_string(),
        })
    })?;

    let (_, parsed) = X509Certificate::from_der(cert.as_ref()).map_err(|e| {
        ScanError::Network(NetworkError::TlsHandshakeFailed {
            host: host.to_string(),
            reason: format!("certificate parse failure: {}", e),
        })
    })?;

    let mut names = Vec::new();
    for extension in parsed.extensions() {
        if let ParsedExtension::SubjectAlternativeName(san) = extension.parsed_extension() {
            for general_name in &san.general_names {
                if let GeneralName::DNSName(dns) = general_name {
                    names.push(dns.to_string());
                }
            }
        }
    }

    debug!("SAN extraction for {}: {} names", host, names.len());
    Ok(names)
}

/// One Certificate Transparency log entry from crt.sh
#[derive(Debug, Deserialize)]
struct CertTransparencyEntry {
    name_value: String,
}

/// Query a public CT log search service for `*.domain` certificates.
/// A single best-effort call; the caller owns the timeout race.
pub async fn ct_lookup(http: &HttpClient, domain: &str) -> ScanResult<Vec<String>> {
    let url = format!("https://crt.sh/?q=%.{}&output=json", domain);

    let response = http.get(&url).await?;

    if response.status_code != 200 {
        return Err(ScanError::UpstreamFailure {
            service: "crt.sh".to_string(),
            reason: format!("status {}", response.status_code),
        });
    }

    let entries: Vec<CertTransparencyEntry> =
        serde_json::from_str(&response.body).map_err(|e| ScanError::UpstreamFailure {
            service: "crt.sh".to_string(),
            reason: format!("unparseable response: {}", e),
        })?;

    Ok(parse_ct_names(&entries, domain))
}

fn parse_ct_names(entries: &[CertTransparencyEntry], domain: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for entry in entries {
        for line in entry.name_value.lines() {
            let cleaned = normalize_hostname(line);
            if cleaned.contains('*') {
                continue;
            }
            if is_subdomain_of(&cleaned, domain)
                && is_well_formed_hostname(&cleaned)
                && !names.contains(&cleaned)
            {
                names.push(cleaned);
            }
        }
    }

    names
}
