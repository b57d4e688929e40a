//! Carries out a [`Plan`] step by step (spec §4.9), mapping each task to an
//! external image tool invocation or, for `Pxzcat`, an in-process call.

use std::path::{Path, PathBuf};

use imgforge_plan::{Plan, Task};
use imgforge_platform::Command;
use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::options::ExecOptions;

/// Round a size up to the next 512-byte sector boundary, the granularity
/// `Disk_resize`'s in-place resize accepts.
fn round_up_512(size: u64) -> u64 { size.div_ceil(512) * 512 }

pub struct Executor {
    options: ExecOptions,
}

impl Executor {
    pub fn new(options: ExecOptions) -> Self { Self { options } }

    /// Run every step of `plan`, starting from `initial_path` (the file the
    /// plan's `initial` tag set describes). Returns the final output path.
    #[instrument(skip(self, plan), fields(steps = plan.steps.len()))]
    pub fn run(&self, plan: &Plan, initial_path: &Path) -> Result<PathBuf> {
        let mut current_path = initial_path.to_path_buf();
        let mut current_format = plan.initial.format.clone();
        let mut prev_template = plan.initial.template;

        for (index, step) in plan.steps.iter().enumerate() {
            // Each arm of run_step is responsible for cleaning up its own
            // target on failure, since that target (a fresh file for most
            // tasks, `current_path` itself for Disk_resize) isn't known to
            // this loop until the step succeeds.
            let (next_path, next_format) =
                self.run_step(index, step, &current_path, current_format.as_deref(), prev_template)?;
            current_path = next_path;
            current_format = next_format;
            prev_template = step.tags.template;
        }

        Ok(current_path)
    }

    fn run_step(
        &self,
        index: usize,
        step: &imgforge_plan::PlanStep,
        current_path: &Path,
        current_format: Option<&str>,
        prev_template: bool,
    ) -> Result<(PathBuf, Option<String>)> {
        let task_name = step.task.to_string();
        info!(index, task = %step.task, weight = step.weight, "executing plan step");

        match step.task {
            Task::Copy => {
                let target = require_filename(step, index, &task_name)?;
                self.guard(&target);
                self.on_target_failure(&target, || {
                    Command::new(&self.options.cp)
                        .arg(current_path)
                        .arg(&target)
                        .run()
                        .map_err(|source| Error::ToolFailed { tool: self.options.cp.clone(), source })
                })
                .map(|_| (target, current_format.map(str::to_string)))
            }
            Task::Rename => {
                let target = require_filename(step, index, &task_name)?;
                self.guard(&target);
                self.on_target_failure(&target, || {
                    Command::new(&self.options.mv)
                        .arg(current_path)
                        .arg(&target)
                        .run()
                        .map_err(|source| Error::ToolFailed { tool: self.options.mv.clone(), source })
                })
                .map(|_| (target, current_format.map(str::to_string)))
            }
            Task::Pxzcat => {
                let target = require_filename(step, index, &task_name)?;
                self.guard(&target);
                self.on_target_failure(&target, || {
                    imgforge_pxzcat::pxzcat(current_path, &target)
                        .map_err(|source| Error::PxzcatFailed { tool: "pxzcat", source })
                })
                .map(|_| (target, step.tags.format.clone()))
            }
            Task::VirtResize => {
                let target = require_filename(step, index, &task_name)?;
                let out_format = require_format(step, index, &task_name)?;
                let out_size = require_size(step, index, &task_name)?;
                self.guard(&target);

                self.on_target_failure(&target, || {
                    let mut create = Command::new(&self.options.qemu_img).arg("create").arg("-f").arg(&out_format);
                    if out_format == "qcow2" {
                        create = create.arg("-o").arg("preallocation=metadata");
                    }
                    create = create.arg(&target).arg(out_size.to_string());
                    create.run().map_err(|source| Error::ToolFailed { tool: self.options.qemu_img.clone(), source })?;

                    let in_format = current_format.unwrap_or("raw");
                    let mut resize = Command::new(&self.options.virt_resize)
                        .arg(format!("--format={in_format}"))
                        .arg(format!("--output-format={out_format}"));
                    if let Some(expand) = &self.options.expand {
                        resize = resize.arg("--expand").arg(expand);
                    }
                    if let Some(lv) = &self.options.lv_expand {
                        resize = resize.arg("--lv-expand").arg(lv);
                    }
                    resize = resize.arg("--unknown-filesystems=error");
                    if self.options.output_is_block_device {
                        resize = resize.arg("--no-sparse");
                    }
                    resize = resize.arg(current_path).arg(&target);
                    resize.run().map_err(|source| Error::ToolFailed { tool: self.options.virt_resize.clone(), source })
                })
                .map(|_| (target, Some(out_format)))
            }
            Task::DiskResize => {
                let out_size = require_size(step, index, &task_name)?;
                let rounded = round_up_512(out_size);
                self.on_target_failure(current_path, || {
                    Command::new(&self.options.qemu_img)
                        .arg("resize")
                        .arg(current_path)
                        .arg(rounded.to_string())
                        .run()
                        .map_err(|source| Error::ToolFailed { tool: self.options.qemu_img.clone(), source })
                })
                .map(|_| (current_path.to_path_buf(), current_format.map(str::to_string)))
            }
            Task::Convert => {
                let target = require_filename(step, index, &task_name)?;
                let out_format = require_format(step, index, &task_name)?;
                if current_format.is_none() && prev_template {
                    return Err(Error::UnsafeAutodetectOnTemplate { index });
                }
                self.guard(&target);

                self.on_target_failure(&target, || {
                    let mut convert = Command::new(&self.options.qemu_img).arg("convert");
                    if let Some(in_format) = current_format {
                        convert = convert.arg("-f").arg(in_format);
                    }
                    convert = convert.arg("-O").arg(&out_format).arg(current_path).arg(&target);
                    convert.run().map_err(|source| Error::ToolFailed { tool: self.options.qemu_img.clone(), source })
                })
                .map(|_| (target, Some(out_format)))
            }
        }
    }

    /// Register best-effort removal of `path` so a SIGINT mid-step doesn't
    /// leave a partial file behind, mirroring the registered cleanup for
    /// cache downloads and scoped keyrings.
    fn guard(&self, path: &Path) {
        if self.options.effective_delete_on_failure() {
            let path = path.to_path_buf();
            imgforge_fs::register_cleanup(move || remove_best_effort(&path));
        }
    }

    /// Run `f`; if it fails, remove `target` immediately (rather than
    /// waiting for a signal to drain the cleanup registry) before
    /// propagating the error.
    fn on_target_failure<T>(&self, target: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
        f().inspect_err(|_| {
            if self.options.effective_delete_on_failure() {
                remove_best_effort(target);
            }
        })
    }
}

fn remove_best_effort(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove partial output");
        }
    }
}

fn require_filename(step: &imgforge_plan::PlanStep, index: usize, task: &str) -> Result<PathBuf> {
    step.tags.filename.clone().ok_or_else(|| Error::MissingFilename { index, task: task.to_string() })
}

fn require_format(step: &imgforge_plan::PlanStep, index: usize, task: &str) -> Result<String> {
    step.tags.format.clone().ok_or_else(|| Error::MissingFormat { index, task: task.to_string() })
}

fn require_size(step: &imgforge_plan::PlanStep, index: usize, task: &str) -> Result<u64> {
    step.tags.size.ok_or_else(|| Error::MissingSize { index, task: task.to_string() })
}
