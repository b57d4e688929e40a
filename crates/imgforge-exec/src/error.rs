#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An external tool exited non-zero; carries the tool name (spec §7
    /// ExecError).
    #[error("'{tool}' failed: {source}")]
    ToolFailed { tool: String, #[source] source: imgforge_platform::Error },

    #[error("'{tool}' failed: {source}")]
    PxzcatFailed { tool: &'static str, #[source] source: imgforge_pxzcat::Error },

    #[error(transparent)]
    Fs(#[from] imgforge_fs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("plan step {index} ({task}) requires a size target but none was set")]
    MissingSize { index: usize, task: String },

    #[error("plan step {index} ({task}) requires a format target but none was set")]
    MissingFormat { index: usize, task: String },

    #[error("plan step {index} ({task}) requires a filename target but none was set")]
    MissingFilename { index: usize, task: String },

    #[error("plan step {index} would Convert from an autodetected format while the input is still the unmodified cached template")]
    UnsafeAutodetectOnTemplate { index: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
