//! TLS tunnel upgrade
//!
//! Wraps an established proxy tunnel in TLS using rustls (pure Rust, easy
//! static linking). Certificate name matching uses the destination
//! hostname, not the proxy's.

use super::TlsStream;
use crate::config::TlsOptions;
use crate::error::ProxyError;
use std::io::BufReader;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_rustls::TlsConnector;

/// Upgrades tunneled connections to TLS
#[derive(Clone)]
pub struct TlsUpgrader {
    connector: TlsConnector,
}

impl std::fmt::Debug for TlsUpgrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsUpgrader").finish()
    }
}

impl TlsUpgrader {
    /// Build an upgrader from TLS options
    pub fn new(options: &TlsOptions) -> Result<Self, ProxyError> {
        let tls_config = if options.danger_accept_invalid_certs {
            // Certificate validation disabled, test use only
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth()
        } else {
            let mut root_store = RootCertStore::empty();

            let native_certs = rustls_native_certs::load_native_certs();
            for cert in native_certs.certs {
                root_store.add(cert).ok();
            }

            if let Some(ref root_path) = options.trusted_root {
                let file = std::fs::File::open(root_path).map_err(|e| {
                    ProxyError::Tls(format!(
                        "failed to open certificate file {}: {}",
                        root_path.display(),
                        e
                    ))
                })?;
                let mut reader = BufReader::new(file);
                let certs = rustls_pemfile::certs(&mut reader)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        ProxyError::Tls(format!(
                            "failed to parse certificates from {}: {}",
                            root_path.display(),
                            e
                        ))
                    })?;
                for cert in certs {
                    root_store.add(cert).map_err(|e| {
                        ProxyError::Tls(format!("failed to add certificate to store: {}", e))
                    })?;
                }
            }

            ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth()
        };

        Ok(TlsUpgrader {
            connector: TlsConnector::from(Arc::new(tls_config)),
        })
    }

    /// Perform the TLS handshake over an already-established tunnel,
    /// validating the certificate against the destination hostname
    pub async fn upgrade(
        &self,
        stream: TcpStream,
        hostname: &str,
    ) -> Result<TlsStream, ProxyError> {
        let server_name = ServerName::try_from(hostname.to_string())
            .map_err(|_| ProxyError::Tls(format!("invalid hostname: {}", hostname)))?;

        let tls_stream = self
            .connector
            .connect(server_name, stream)
            .await
            .map_err(|e| ProxyError::Tls(format!("TLS handshake failed with {}: {}", hostname, e)))?;

        tracing::debug!(hostname, "TLS tunnel established");
        Ok(tls_stream)
    }
}

/// Certificate verifier that accepts all certificates (dangerous!)
#[derive(Debug)]
struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}
