#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    #[error(transparent)]
    Subscriber(#[from] phx_subscriber::Error),

    #[error("write update: {0}")]
    Output(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ListenResult<T> = Result<T, ListenError>;
