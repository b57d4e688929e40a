use thiserror::Error;

/// Every way a repository index can be malformed (spec §7: `CorruptIndex`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("duplicate section for (name={name}, arch={arch})")]
    DuplicateSection { name: String, arch: String },

    #[error("repeated key `{field}[{subkey}]` in section [{section}]")]
    RepeatedSubkey {
        section: String,
        field: String,
        subkey: String,
    },

    #[error("`file` value in section [{section}] is empty, absolute, or a URI: {value}")]
    BadFilePath { section: String, value: String },

    #[error("section [{section}] is missing required key `{key}`")]
    MissingKey { section: String, key: String },

    #[error("could not parse `{key}` in section [{section}]: {value}")]
    UnparsableValue {
        section: String,
        key: String,
        value: String,
    },

    #[error("malformed simple-streams document: {reason}")]
    MalformedSimpleStreams { reason: String },

    #[error("index URI has no usable base: {0}")]
    BadIndexUri(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;
