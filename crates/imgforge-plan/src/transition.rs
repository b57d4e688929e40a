//! The transition catalog (spec §4.8): every task the planner may schedule,
//! the tag-set precondition that gates it, and the tag-set it produces.

use std::path::{Path, PathBuf};

use imgforge_resource::{Goal, TagSet};

/// One task the Executor knows how to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Copy,
    Rename,
    Pxzcat,
    VirtResize,
    DiskResize,
    Convert,
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Task::Copy => "Copy",
            Task::Rename => "Rename",
            Task::Pxzcat => "Pxzcat",
            Task::VirtResize => "Virt_resize",
            Task::DiskResize => "Disk_resize",
            Task::Convert => "Convert",
        };
        f.write_str(s)
    }
}

/// `Virt_resize`'s precondition requires at least this much growth to be
/// worth a filesystem-expanding resize; `Disk_resize`'s complementary
/// precondition caps it to growth that still fits in the container's
/// existing headroom. Modeled as one shared constant rather than two
/// separately-tuned transitions (see DESIGN.md).
pub const HEADROOM_BYTES: u64 = 256 * 1024 * 1024;

/// Context a transition needs beyond the current tag set: the goal's target
/// values, whether the output path is a block device, and a source of fresh
/// temporary filenames for non-terminal steps.
pub struct TransitionCtx<'a> {
    pub goal: &'a Goal,
    pub output_is_block_device: bool,
}

impl<'a> TransitionCtx<'a> {
    /// The filename a transition should write to: the user's requested
    /// output when the goal names one (every terminal step must end there
    /// anyway, so non-terminal steps using it too is harmless to search
    /// correctness), else a generated cache-scoped temporary.
    fn target_filename(&self, next_temp: &mut dyn FnMut() -> PathBuf) -> PathBuf {
        match &self.goal.filename {
            Some(f) => f.clone(),
            None => next_temp(),
        }
    }
}

/// Every task applicable to `tags`, paired with its weight and resulting
/// tag set. `next_temp` is called at most once per applicable transition
/// that needs a temporary filename.
pub fn transitions(tags: &TagSet, ctx: &TransitionCtx, next_temp: &mut dyn FnMut() -> PathBuf) -> Vec<(Task, u32, TagSet)> {
    let mut out = Vec::with_capacity(6);

    // Copy: always applicable. The only way to produce a standalone file
    // while a Template tag is still set, since Rename is forbidden on the
    // canonical cache entry.
    {
        let mut next = tags.clone();
        next.template = false;
        next.filename = Some(ctx.target_filename(next_temp));
        out.push((Task::Copy, 50, next));
    }

    // Rename: free, but only once nothing still depends on the file living
    // under its current (possibly cache-owned) name, and never onto a block
    // device (a block device can't be renamed onto).
    if !tags.template && !ctx.output_is_block_device {
        let mut next = tags.clone();
        next.filename = Some(ctx.target_filename(next_temp));
        out.push((Task::Rename, 0, next));
    }

    // Pxzcat: unwraps the xz container around a raw disk image. The
    // content was always raw underneath the compression, so format becomes
    // (or stays) "raw" here rather than via a separate Convert step.
    if tags.xz {
        let mut next = tags.clone();
        next.xz = false;
        next.template = false;
        next.format = Some("raw".to_string());
        next.filename = Some(ctx.target_filename(next_temp));
        out.push((Task::Pxzcat, 80, next));
    }

    // Virt_resize: filesystem-expanding resize, only worth its cost for
    // growth clearing the headroom threshold.
    if !tags.xz {
        if let Some(goal_size) = ctx.goal.size {
            let current = tags.size.unwrap_or(0);
            if goal_size >= current.saturating_add(HEADROOM_BYTES) {
                let mut next = tags.clone();
                next.template = false;
                next.size = Some(goal_size);
                if let Some(format) = &ctx.goal.format {
                    next.format = Some(format.clone());
                }
                next.filename = Some(ctx.target_filename(next_temp));
                out.push((Task::VirtResize, 100, next));
            }
        }
    }

    // Disk_resize: in-place container resize, no filesystem expansion;
    // only fits growth within the container's existing headroom.
    if !tags.xz && !tags.template && tags.format.is_some() {
        if let Some(goal_size) = ctx.goal.size {
            let current = tags.size.unwrap_or(0);
            if goal_size > current && goal_size <= current.saturating_add(HEADROOM_BYTES) {
                let mut next = tags.clone();
                next.size = Some(goal_size);
                out.push((Task::DiskResize, 60, next));
            }
        }
    }

    // Convert: reformats without resizing.
    if !tags.xz {
        if let Some(format) = &ctx.goal.format {
            if tags.format.as_deref() != Some(format.as_str()) {
                let mut next = tags.clone();
                next.template = false;
                next.format = Some(format.clone());
                next.filename = Some(ctx.target_filename(next_temp));
                out.push((Task::Convert, 60, next));
            }
        }
    }

    out
}

/// Tests construct tag sets and goals directly; `goal_path` is a small
/// helper so test goals read naturally.
pub fn goal_path(p: &str) -> PathBuf {
    Path::new(p).to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(goal: &Goal) -> TransitionCtx<'_> {
        TransitionCtx { goal, output_is_block_device: false }
    }

    #[test]
    fn copy_is_always_offered() {
        let tags = TagSet::new();
        let goal = Goal::new();
        let mut temp = || goal_path("/tmp/a");
        let ts = transitions(&tags, &ctx(&goal), &mut temp);
        assert!(ts.iter().any(|(t, ..)| *t == Task::Copy));
    }

    #[test]
    fn rename_unavailable_while_template_is_set() {
        let tags = TagSet::new().with_template(true);
        let goal = Goal::new();
        let mut temp = || goal_path("/tmp/a");
        let ts = transitions(&tags, &ctx(&goal), &mut temp);
        assert!(!ts.iter().any(|(t, ..)| *t == Task::Rename));
    }

    #[test]
    fn pxzcat_sets_raw_format_and_clears_xz_and_template() {
        let tags = TagSet::new().with_template(true).with_xz(true).with_size(1_073_741_824);
        let goal = Goal::new().with_filename("out.img");
        let mut temp = || goal_path("/tmp/a");
        let ts = transitions(&tags, &ctx(&goal), &mut temp);
        let (_, weight, next) = ts.iter().find(|(t, ..)| *t == Task::Pxzcat).unwrap();
        assert_eq!(*weight, 80);
        assert!(!next.xz);
        assert!(!next.template);
        assert_eq!(next.format.as_deref(), Some("raw"));
        assert_eq!(next.filename, Some(goal_path("out.img")));
    }

    #[test]
    fn virt_resize_requires_clearing_the_headroom_threshold() {
        let tags = TagSet::new().with_size(1_073_741_824).with_format("raw");
        let small_goal = Goal::new().with_size(1_073_741_824 + HEADROOM_BYTES - 1);
        let mut temp = || goal_path("/tmp/a");
        assert!(!transitions(&tags, &ctx(&small_goal), &mut temp).iter().any(|(t, ..)| *t == Task::VirtResize));

        let big_goal = Goal::new().with_size(2_147_483_648);
        assert!(transitions(&tags, &ctx(&big_goal), &mut temp).iter().any(|(t, ..)| *t == Task::VirtResize));
    }

    #[test]
    fn disk_resize_is_excluded_once_growth_exceeds_headroom() {
        let tags = TagSet::new().with_size(1_073_741_824).with_format("raw");
        let goal = Goal::new().with_size(2_147_483_648);
        let mut temp = || goal_path("/tmp/a");
        assert!(!transitions(&tags, &ctx(&goal), &mut temp).iter().any(|(t, ..)| *t == Task::DiskResize));
    }
}
