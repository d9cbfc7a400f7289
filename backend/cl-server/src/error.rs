use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Config error: {0}")]
    Config(#[from] cl_config::ConfigError),

    #[error("Channel layer error: {0}")]
    Layer(#[from] cl_layer::LayerError),

    #[error("Consumer error: {0}")]
    Consumer(#[from] cl_ws::WsError),

    #[error("Logger error: {message}")]
    Logger { message: String },

    #[error("Metrics exporter error: {message}")]
    Metrics { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
