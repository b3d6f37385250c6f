use crate::config::ConfigError;
use crate::rewrite::Stage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("{stage}: anchor matched {count} locations, expected at most 1")]
    AmbiguousMatch { stage: Stage, count: usize },

    #[error("{stage}: brace depth went negative at line {line}")]
    NegativeBraceDepth { stage: Stage, line: usize },

    #[error("{stage}: parenthesis depth went negative at line {line}")]
    NegativeParenDepth { stage: Stage, line: usize },

    #[error("{stage}: wrapper opened at line {line} is never closed")]
    UnterminatedWrap { stage: Stage, line: usize },

    #[error("{stage}: invalid pattern: {source}")]
    InvalidPattern {
        stage: Stage,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
