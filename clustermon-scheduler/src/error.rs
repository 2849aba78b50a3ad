#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("checkable {0} is not present in the object store")]
    UnknownCheckable(String),
}
