use thiserror::Error;

#[derive(Error, Debug)]
pub enum KvError {
    #[error("kv connection error: {0}")]
    Connection(String),
    #[error("kv command error: {0}")]
    Command(String),
}

pub type KvResult<T> = Result<T, KvError>;
