/// Knobs the Orchestrator supplies that the Planner's tag sets don't carry:
/// which partition/LV to expand, which external tool binaries to invoke,
/// and the output's cleanup policy.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// True when the requested output path is a block device: disables
    /// `--no-sparse`'s opposite (forces it on) and disables delete-on-failure
    /// cleanup, since a block device can't be unlinked.
    pub output_is_block_device: bool,
    /// Defaults to true; false for block-device outputs or when the user
    /// opts out (spec §4.9 cleanup discipline).
    pub delete_output_on_failure: bool,
    /// `virt-resize --expand <device>`, carried over from the chosen
    /// entry's `expand` field.
    pub expand: Option<String>,
    /// `virt-resize --lv-expand <lv>`.
    pub lv_expand: Option<String>,
    pub qemu_img: String,
    pub virt_resize: String,
    pub cp: String,
    pub mv: String,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            output_is_block_device: false,
            delete_output_on_failure: true,
            expand: None,
            lv_expand: None,
            qemu_img: "qemu-img".to_string(),
            virt_resize: "virt-resize".to_string(),
            cp: "cp".to_string(),
            mv: "mv".to_string(),
        }
    }
}

impl ExecOptions {
    /// Block-device outputs can never be safely unlinked on failure; this
    /// keeps that rule in one place rather than re-checked at every call
    /// site.
    pub fn effective_delete_on_failure(&self) -> bool {
        self.delete_output_on_failure && !self.output_is_block_device
    }
}
