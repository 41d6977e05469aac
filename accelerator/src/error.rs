use accelerator_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcceleratorError<E> {
    /// The wrapped handler failed; nothing was cached.
    #[error("Handler error: {0}")]
    Handler(E),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl<E> AcceleratorError<E> {
    pub fn into_handler_error(self) -> Option<E> {
        match self {
            Self::Handler(e) => Some(e),
            Self::Store(_) => None,
        }
    }
}
