//! mTLS identity loading (spec §4.6: "each node has an identity equal to
//! the Common Name of its X.509 certificate... connections are mutually
//! TLS-authenticated").

use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use crate::error::ClusterError;

#[derive(Debug, Clone)]
pub struct TlsIdentity {
    pub cert_file: String,
    pub key_file: String,
    pub ca_file: String,
}

impl TlsIdentity {
    pub fn validate(&self) -> Result<(), ClusterError> {
        for (label, path) in [("certificate", &self.cert_file), ("key", &self.key_file), ("ca", &self.ca_file)] {
            if !Path::new(path).exists() {
                return Err(ClusterError::Tls(format!("{label} file not found: {path}")));
            }
        }
        Ok(())
    }

    fn load_certs(path: &str) -> Result<Vec<rustls::Certificate>, ClusterError> {
        let data = fs::read(path)?;
        let mut reader = BufReader::new(data.as_slice());
        rustls_pemfile::certs(&mut reader)
            .map_err(|e| ClusterError::Tls(format!("failed to parse certificate {path}: {e}")))
            .map(|raw| raw.into_iter().map(rustls::Certificate).collect())
    }

    fn load_key(&self) -> Result<rustls::PrivateKey, ClusterError> {
        let data = fs::read(&self.key_file)?;
        let mut reader = BufReader::new(data.as_slice());
        let keys = rustls_pemfile::pkcs8_private_keys(&mut reader)
            .map_err(|e| ClusterError::Tls(format!("failed to parse private key {}: {e}", self.key_file)))?;
        keys.into_iter()
            .next()
            .map(rustls::PrivateKey)
            .ok_or_else(|| ClusterError::Tls(format!("no private keys found in {}", self.key_file)))
    }

    /// A mutually-authenticated server config: presents our cert/key and
    /// requires the peer present one signed by our configured CA.
    pub fn server_config(&self) -> Result<Arc<rustls::ServerConfig>, ClusterError> {
        self.validate()?;
        let certs = Self::load_certs(&self.cert_file)?;
        let key = self.load_key()?;

        let mut roots = rustls::RootCertStore::empty();
        for ca_cert in Self::load_certs(&self.ca_file)? {
            roots
                .add(&ca_cert)
                .map_err(|e| ClusterError::Tls(format!("failed to add CA certificate: {e}")))?;
        }
        let verifier = rustls::server::AllowAnyAuthenticatedClient::new(roots);

        let config = rustls::ServerConfig::builder()
            .with_safe_defaults()
            .with_client_cert_verifier(Arc::new(verifier))
            .with_single_cert(certs, key)
            .map_err(|e| ClusterError::Tls(format!("failed to build server TLS config: {e}")))?;
        Ok(Arc::new(config))
    }

    /// A mutually-authenticated client config for outbound peer connections.
    pub fn client_config(&self) -> Result<Arc<rustls::ClientConfig>, ClusterError> {
        self.validate()?;
        let certs = Self::load_certs(&self.cert_file)?;
        let key = self.load_key()?;

        let mut roots = rustls::RootCertStore::empty();
        for ca_cert in Self::load_certs(&self.ca_file)? {
            roots
                .add(&ca_cert)
                .map_err(|e| ClusterError::Tls(format!("failed to add CA certificate: {e}")))?;
        }

        let config = rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_single_cert(certs, key)
            .map_err(|e| ClusterError::Tls(format!("failed to build client TLS config: {e}")))?;
        Ok(Arc::new(config))
    }
}
