/// A repository's or source's proxy policy, as configured in a source
/// descriptor (`proxy=` key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyPolicy {
    /// No proxy; the relevant scheme variable is explicitly blanked and all
    /// hosts are added to `no_proxy`.
    Unset,
    /// Leave the ambient environment (whatever the calling shell has set)
    /// untouched.
    System,
    /// Force the scheme variable to this value.
    Forced(String),
}

impl Default for ProxyPolicy {
    fn default() -> Self { ProxyPolicy::System }
}

/// HTTP-adjacent schemes a transfer tool may be invoked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
    Ftp,
}

impl Scheme {
    fn env_var(self) -> &'static str {
        match self {
            Scheme::Http => "http_proxy",
            Scheme::Https => "https_proxy",
            Scheme::Ftp => "ftp_proxy",
        }
    }
}

/// The environment variable assignments that should be applied to a transfer
/// command's environment for `scheme`, per spec §4.1.
pub fn envelope(policy: &ProxyPolicy, scheme: Scheme) -> Vec<(String, String)> {
    match policy {
        ProxyPolicy::Unset => vec![
            (scheme.env_var().to_string(), String::new()),
            ("no_proxy".to_string(), "*".to_string()),
        ],
        ProxyPolicy::System => Vec::new(),
        ProxyPolicy::Forced(value) => vec![(scheme.env_var().to_string(), value.clone())],
    }
}
