use std::path::PathBuf;

/// The planner's state: a fixed record rather than a dynamic map, since the
/// keys are drawn from a closed set of five symbols (design note §9).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    pub template: bool,
    pub filename: Option<PathBuf>,
    pub size: Option<u64>,
    pub format: Option<String>,
    pub xz: bool,
}

impl TagSet {
    pub fn new() -> Self { Self::default() }

    pub fn with_template(mut self, template: bool) -> Self {
        self.template = template;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_xz(mut self, xz: bool) -> Self {
        self.xz = xz;
        self
    }

    /// A goal is satisfied when every `must_have` field that is `Some`/`true`
    /// in `goal` matches this tag set, and every field `must_not_have` marks
    /// as forbidden is absent here.
    pub fn satisfies(&self, must_have: &Goal, must_not_have: &Goal) -> bool {
        if must_have.template && !self.template {
            return false;
        }
        if let Some(f) = &must_have.filename
            && self.filename.as_ref() != Some(f)
        {
            return false;
        }
        if let Some(s) = must_have.size
            && self.size != Some(s)
        {
            return false;
        }
        if let Some(f) = &must_have.format
            && self.format.as_ref() != Some(f)
        {
            return false;
        }
        if must_have.xz && !self.xz {
            return false;
        }

        if must_not_have.template && self.template {
            return false;
        }
        if must_not_have.xz && self.xz {
            return false;
        }
        true
    }
}

/// A partial tag set used to express a planner goal: only the fields that
/// matter are set.
#[derive(Debug, Clone, Default)]
pub struct Goal {
    pub template: bool,
    pub filename: Option<PathBuf>,
    pub size: Option<u64>,
    pub format: Option<String>,
    pub xz: bool,
}

impl Goal {
    pub fn new() -> Self { Self::default() }

    pub fn with_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}
