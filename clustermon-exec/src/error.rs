#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("unknown macro '{0}'")]
    UnknownMacro(String),
    #[error("macro recursion limit exceeded while expanding '{0}'")]
    RecursionLimit(String),
    #[error("failed to spawn check process: {0}")]
    Spawn(#[from] std::io::Error),
}
