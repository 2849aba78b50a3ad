//! Error taxonomy for the external-interface layer (spec §7): a malformed
//! command line or an unknown verb is logged and discarded, never fatal.

#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    #[error("unknown verb: {0}")]
    UnknownVerb(String),

    #[error("verb {verb} expects {min}..={max} arguments, got {got}")]
    ArgCount { verb: String, min: usize, max: usize, got: usize },

    #[error("target not found: {0}")]
    TargetNotFound(String),

    #[error("invalid argument for {verb}: {detail}")]
    InvalidArgument { verb: String, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
