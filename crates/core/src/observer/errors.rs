use thiserror::Error;

/// Errors raised by the Observer Bus itself (not by the handlers it dispatches to,
/// which never propagate their errors to the producer of the change — §4.5, §7).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("no such subscription")]
    UnknownSubscription,
}

impl ObserverError {
    pub fn code(&self) -> &'static str {
        "observer-error"
    }
}

impl From<ObserverError> for crate::Error {
    fn from(err: ObserverError) -> Self {
        crate::Error::Observer(err)
    }
}
