/// A download phase, reported to an optional progress callback (SPEC_FULL
/// §4: structured progress reporting, grounded on the teacher's
/// `Progress`/`FetchPhase` shape in `pulith-fetch::data`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Downloading,
    Committing,
}

#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub phase: Phase,
    pub bytes_downloaded: u64,
    pub total_bytes: Option<u64>,
}

pub type ProgressFn<'a> = dyn Fn(Progress) + 'a;
