//! Domain error types.

/// Top-level error type for papertrader.
#[derive(Debug, thiserror::Error)]
pub enum PapertraderError {
    #[error("invalid quantity {quantity}: must be positive")]
    InvalidQuantity { quantity: f64 },

    #[error("insufficient cash: required {required:.2}, available {available:.2}")]
    InsufficientCash { required: f64, available: f64 },

    #[error("insufficient quantity of {symbol}: requested {requested}, held {held}")]
    InsufficientQuantity {
        symbol: String,
        requested: f64,
        held: f64,
    },

    #[error("no open position for {symbol}")]
    NoPosition { symbol: String },

    #[error("price unavailable for {symbol}: {reason}")]
    PriceUnavailable { symbol: String, reason: String },

    #[error("persistence unavailable: {reason}")]
    PersistenceUnavailable { reason: String },

    #[error("series too short for {symbol}: have {bars} bars, need {minimum}")]
    SeriesTooShort {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("http error: {reason}")]
    Http { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PapertraderError {
    /// The four trade-validation kinds surface to callers verbatim;
    /// everything else is infrastructure and recovered near its source.
    pub fn is_trade_rejection(&self) -> bool {
        matches!(
            self,
            PapertraderError::InvalidQuantity { .. }
                | PapertraderError::InsufficientCash { .. }
                | PapertraderError::InsufficientQuantity { .. }
                | PapertraderError::NoPosition { .. }
        )
    }
}

impl From<&PapertraderError> for std::process::ExitCode {
    fn from(err: &PapertraderError) -> Self {
        let code: u8 = match err {
            PapertraderError::Io(_) | PapertraderError::Http { .. } => 1,
            PapertraderError::ConfigParse { .. }
            | PapertraderError::ConfigMissing { .. }
            | PapertraderError::ConfigInvalid { .. } => 2,
            PapertraderError::Database { .. }
            | PapertraderError::DatabaseQuery { .. }
            | PapertraderError::PersistenceUnavailable { .. } => 3,
            PapertraderError::InvalidQuantity { .. }
            | PapertraderError::InsufficientCash { .. }
            | PapertraderError::InsufficientQuantity { .. }
            | PapertraderError::NoPosition { .. } => 4,
            PapertraderError::PriceUnavailable { .. }
            | PapertraderError::SeriesTooShort { .. }
            | PapertraderError::UnknownStrategy { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
