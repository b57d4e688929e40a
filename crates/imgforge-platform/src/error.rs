#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("command '{cmd}' failed: {source}")]
    CommandFailed { cmd: String, source: std::io::Error },

    #[error("command '{cmd}' exited with status {code:?}: {stderr}")]
    NonZeroExit { cmd: String, code: Option<i32>, stderr: String },

    #[error("no home directory could be determined")]
    NoHome,
}

pub type Result<T> = std::result::Result<T, Error>;
