/// Crate-level error type, following the split the teacher uses between a
/// typed `thiserror` boundary for constructors and `anyhow` for ergonomic
/// `bail!` sites inside `validate()` methods.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unknown initial condition id '{0}'")]
    UnknownInitialCondition(i64),

    #[error("unknown coriolis method '{0}'")]
    UnknownCoriolisMethod(String),

    #[error("unknown advection scheme '{0}'")]
    UnknownScheme(String),

    #[error("ischeme=slice requires a centred (alpha = dt/2) off-centering parameter")]
    SliceRequiresCentred,

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Config(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
