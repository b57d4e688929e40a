//! The `--capabilities` machine-readable exit path (spec §6: "Machine-readable
//! mode prints a fixed capability list and exits 0").

use serde_json::json;

/// A fixed description of what this build of the tool supports. Static
/// rather than probed at runtime, since the capability list describes the
/// core's compiled-in feature set, not the host environment.
pub fn report() -> serde_json::Value {
    json!({
        "name": "imgforge",
        "version": env!("CARGO_PKG_VERSION"),
        "index_formats": ["native", "simple-streams"],
        "checksum_kinds": ["sha256", "sha512"],
        "transitions": ["Copy", "Rename", "Pxzcat", "Virt_resize", "Disk_resize", "Convert"],
        "customize_ops": [
            "write", "upload", "edit", "delete", "scrub", "firstboot",
            "run-script", "mkdir", "install", "root-password",
        ],
        "pxzcat_backend": pxzcat_backend(),
        "guest_fs_backend": "external-collaborator",
    })
}

fn pxzcat_backend() -> &'static str {
    if cfg!(feature = "lzma") { "lzma" } else { "xzcat" }
}
