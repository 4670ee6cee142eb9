use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureUnavailable {
    #[error("no player matches '{0}'")]
    EntityNotFound(String),
    #[error("'{query}' matches several players: {candidates:?}")]
    AmbiguousEntity {
        query: String,
        candidates: Vec<String>,
    },
    #[error("only {available} usable recent games, need {required}")]
    NoRecentGames { available: usize, required: usize },
    #[error("stats provider unavailable: {0}")]
    ProviderUnavailable(String),
}

impl FeatureUnavailable {
    /// Every variant reads as "no features for this request" to a caller
    /// that only needs to skip it; the variant says what to do about it.
    pub fn is_no_data(&self) -> bool {
        true
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FeatureUnavailable::ProviderUnavailable(_))
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("player '{0}' not found")]
    Unresolved(String),
    #[error("player '{query}' is ambiguous: {candidates:?}")]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },
    #[error("transient provider failure: {0}")]
    Transient(String),
    #[error("provider failure: {0}")]
    Fatal(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

impl From<ProviderError> for FeatureUnavailable {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unresolved(name) => FeatureUnavailable::EntityNotFound(name),
            ProviderError::Ambiguous { query, candidates } => {
                FeatureUnavailable::AmbiguousEntity { query, candidates }
            }
            other => FeatureUnavailable::ProviderUnavailable(other.to_string()),
        }
    }
}
