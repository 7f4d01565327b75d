use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The check needs an input the caller did not supply (e.g. no raw rows).
    #[error("No {0} supplied to the validator")]
    MissingInput(&'static str),

    #[error("Check panicked: {0}")]
    Panicked(String),
}
