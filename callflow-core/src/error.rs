use thiserror::Error;

use crate::board::BoardError;

#[derive(Error, Debug)]
pub enum CallflowError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Board error: {0}")]
    Board(#[from] BoardError),
}
