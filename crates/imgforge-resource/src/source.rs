use imgforge_platform::ProxyPolicy;
use imgforge_verify::KeyDescriptor;
use url::Url;

/// Which index grammar a source speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    Native,
    SimpleStreams,
}

/// A configured repository, loaded once at startup and immutable thereafter
/// (spec §3).
#[derive(Debug, Clone)]
pub struct RepoSource {
    pub name: String,
    pub uri: Url,
    pub key: KeyDescriptor,
    pub proxy: ProxyPolicy,
    pub format: FormatTag,
}

impl RepoSource {
    pub fn new(name: impl Into<String>, uri: Url) -> Self {
        Self {
            name: name.into(),
            uri,
            key: KeyDescriptor::NoKey,
            proxy: ProxyPolicy::System,
            format: FormatTag::Native,
        }
    }

    pub fn with_key(mut self, key: KeyDescriptor) -> Self {
        self.key = key;
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyPolicy) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_format(mut self, format: FormatTag) -> Self {
        self.format = format;
        self
    }
}
