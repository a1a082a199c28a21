#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error("Factory failed: {0}")]
    Factory(anyhow::Error),
}

impl From<anyhow::Error> for InstantiateErrorKind {
    fn from(err: anyhow::Error) -> Self {
        Self::Factory(err)
    }
}
