use thiserror::Error;

/// Why a single decoder line could not be turned into an observation
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("unresolvable field `{field}` (expected string or number), got: {value}")]
    UnresolvableField { field: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("line {line}: {source}")]
    Decode {
        line: u64,
        #[source]
        source: DecodeError,
    },

    #[error("stream processor already finished ({0})")]
    StreamFinished(String),

    #[error("input read error: {0}")]
    Input(#[from] std::io::Error),

    #[error("subprocess error: {0}")]
    Subprocess(String),

    #[error("metrics exporter error: {0}")]
    Metrics(String),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
