#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transition catalog is closed and every reachable tag combination
    /// this tool's CLI can request has a path to it, so hitting this is
    /// treated as an internal consistency bug rather than user error.
    #[error("no plan reaches the goal within max_depth={max_depth}")]
    NoPlan { max_depth: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
