use crate::transport::TransportError;

/// Errors surfaced by the SAMS client.
#[derive(Debug, thiserror::Error)]
pub enum SamsError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("not logged in to SAMS")]
    NotAuthenticated,
    #[error("no phenopacket found for patient {0}")]
    NotFound(String),
    #[error("transport error: {0}")]
    Transport(TransportError),
    #[error("malformed phenopacket: {0}")]
    MalformedDocument(#[from] phenopacket::PhenopacketError),
}

impl From<TransportError> for SamsError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Rejected => {
                SamsError::Authentication("credentials rejected by SAMS".into())
            }
            TransportError::SessionExpired => SamsError::NotAuthenticated,
            TransportError::NotFound(patient_id) => SamsError::NotFound(patient_id),
            TransportError::Malformed(source) => SamsError::MalformedDocument(source),
            other => SamsError::Transport(other),
        }
    }
}

pub type SamsResult<T> = std::result::Result<T, SamsError>;
