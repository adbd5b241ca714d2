use thiserror::Error;

use crate::id::Uuid;
use crate::types::TypeKind;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("type `{0}` is not registered")]
    UnknownType(String),
    #[error("type `{name}` is registered as a {actual}, not a {expected}")]
    WrongKind {
        name: String,
        expected: TypeKind,
        actual: TypeKind,
    },
    #[error("resource {id} is cached as `{cached}`, requested `{requested}`")]
    TypeMismatch {
        id: Uuid,
        cached: &'static str,
        requested: &'static str,
    },
    #[error("resource {0} is not loaded")]
    NotLoaded(Uuid),
    #[error("entity {0} is not live in a world")]
    EntityNotLive(Uuid),
    #[error("malformed data: {0}")]
    Malformed(String),
    #[error("logging setup failed: {0}")]
    Logging(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
