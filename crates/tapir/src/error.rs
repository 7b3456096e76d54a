#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] tapir_graphlib::Error),
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },
    #[error("parameter {name} is out of range: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("vertex not found: {vertex}")]
    VertexNotFound { vertex: String },
}

pub type Result<T> = std::result::Result<T, Error>;
