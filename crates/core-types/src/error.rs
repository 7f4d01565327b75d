use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Unknown check status '{0}', expected PASS or FAIL")]
    UnknownStatus(String),
}
