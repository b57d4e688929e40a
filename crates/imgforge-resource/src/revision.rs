use std::cmp::Ordering;
use std::fmt;

/// A template's version label at a fixed `(name, arch)`. Either an integer
/// or an opaque string; when comparing a revision of one kind against the
/// other, the integer side is coerced to its decimal-string form and the
/// comparison proceeds as a string comparison (spec §3, §8-I8).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Revision {
    Int(u64),
    Str(String),
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Int(n) => write!(f, "{n}"),
            Revision::Str(s) => write!(f, "{s}"),
        }
    }
}

impl PartialOrd for Revision {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Revision {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Revision::Int(a), Revision::Int(b)) => a.cmp(b),
            (Revision::Str(a), Revision::Str(b)) => a.cmp(b),
            (Revision::Int(a), Revision::Str(b)) => a.to_string().cmp(b),
            (Revision::Str(a), Revision::Int(b)) => a.as_str().cmp(b.to_string().as_str()),
        }
    }
}

impl Revision {
    pub fn parse(s: &str) -> Self {
        match s.parse::<u64>() {
            Ok(n) => Revision::Int(n),
            Err(_) => Revision::Str(s.to_string()),
        }
    }
}
