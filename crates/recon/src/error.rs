use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (overlapping columns, bad threshold, etc.).
    ConfigValidation(String),
    /// Header row does not fit the configured column layout.
    MalformedHeader { source: String, detail: String },
    /// Data row with the wrong width or an unparseable year.
    MalformedRow { source: String, row: usize, detail: String },
    /// Country catalog is missing required columns or carries duplicate codes.
    Catalog(String),
    /// IO error (file read, write, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MalformedHeader { source, detail } => {
                write!(f, "{source}: malformed header: {detail}")
            }
            Self::MalformedRow { source, row, detail } => {
                write!(f, "{source}, row {row}: {detail}")
            }
            Self::Catalog(msg) => write!(f, "country catalog error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl ReconError {
    /// True for errors caused by the shape of an input table rather than by
    /// the environment (missing files) or the config.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Self::MalformedHeader { .. } | Self::MalformedRow { .. })
    }
}
