#[derive(thiserror::Error, Debug)]
pub enum RepairError {
    #[error("archive is missing required member '{0}'")]
    MissingRequiredFileError(String),
    #[error("malformed row data in '{table}': {msg}")]
    MalformedRowError { table: String, msg: String },
    #[error("failed reading archive '{path}': {msg}")]
    ArchiveReadError { path: String, msg: String },
    #[error("failed writing archive '{path}': {msg}")]
    ArchiveWriteError { path: String, msg: String },
    #[error("failed decoding table '{table}': {msg}")]
    TableCodecError { table: String, msg: String },
    #[error("failed reading repair defaults: {0}")]
    ConfigReadError(#[from] config::ConfigError),
    #[error("{0}")]
    OtherError(String),
}
