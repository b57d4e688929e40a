//! The bounded best-first search itself (spec §4.8): a priority queue over
//! partial plans ordered by cumulative weight, ties broken by insertion
//! order so two runs over the same inputs always return the same plan.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::path::PathBuf;

use imgforge_resource::{Goal, TagSet};
use tracing::{debug, instrument, trace};

use crate::error::{Error, Result};
use crate::transition::{transitions, Task, TransitionCtx};

/// One scheduled task and the tag set it leaves the build in.
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub task: Task,
    pub weight: u32,
    pub tags: TagSet,
}

/// A sequence of steps that carries `initial` to a tag set satisfying the
/// goal, in minimum-weight order.
#[derive(Debug, Clone)]
pub struct Plan {
    pub initial: TagSet,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn total_weight(&self) -> u32 { self.steps.iter().map(|s| s.weight).sum() }

    /// The tag set the build is in after the whole plan runs; the empty
    /// plan's final state is simply `initial`.
    pub fn final_tags(&self) -> &TagSet { self.steps.last().map(|s| &s.tags).unwrap_or(&self.initial) }
}

struct Node {
    cumulative_weight: u32,
    order: u64,
    tags: TagSet,
    steps: Vec<PlanStep>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool { self.cumulative_weight == other.cumulative_weight && self.order == other.order }
}
impl Eq for Node {}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse the weight comparison so the
        // cheapest node is "greatest" and pops first, with the
        // earliest-inserted node winning ties.
        other.cumulative_weight.cmp(&self.cumulative_weight).then_with(|| other.order.cmp(&self.order))
    }
}
impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

/// Run the search. `next_temp` mints a fresh temporary filename for any
/// transition that needs one and the goal doesn't pin a final filename.
#[instrument(skip(initial, must_have, must_not_have, next_temp), fields(max_depth))]
pub fn plan(
    initial: TagSet,
    must_have: &Goal,
    must_not_have: &Goal,
    output_is_block_device: bool,
    max_depth: u32,
    mut next_temp: impl FnMut() -> PathBuf,
) -> Result<Plan> {
    let ctx = TransitionCtx { goal: must_have, output_is_block_device };
    let mut order_counter: u64 = 0;
    let mut heap = BinaryHeap::new();

    heap.push(Node { cumulative_weight: 0, order: order_counter, tags: initial.clone(), steps: Vec::new() });
    order_counter += 1;

    while let Some(node) = heap.pop() {
        trace!(depth = node.steps.len(), weight = node.cumulative_weight, "considering node");
        if node.tags.satisfies(must_have, must_not_have) {
            debug!(steps = node.steps.len(), total_weight = node.cumulative_weight, "plan found");
            return Ok(Plan { initial, steps: node.steps });
        }
        if node.steps.len() as u32 >= max_depth {
            continue;
        }
        for (task, weight, new_tags) in transitions(&node.tags, &ctx, &mut next_temp) {
            let mut steps = node.steps.clone();
            steps.push(PlanStep { task, weight, tags: new_tags.clone() });
            heap.push(Node {
                cumulative_weight: node.cumulative_weight + weight,
                order: order_counter,
                tags: new_tags,
                steps,
            });
            order_counter += 1;
        }
    }

    Err(Error::NoPlan { max_depth })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::HEADROOM_BYTES;

    fn temp() -> impl FnMut() -> PathBuf { let mut n = 0u32; move || { n += 1; PathBuf::from(format!("/tmp/step-{n}")) } }

    #[test]
    fn finds_a_single_pxzcat_step_over_copy_then_pxzcat() {
        let initial = TagSet::new().with_template(true).with_xz(true).with_size(1_073_741_824);
        let must_have = Goal::new().with_filename("out.img").with_size(1_073_741_824).with_format("raw");
        let must_not_have = Goal { template: true, xz: true, ..Goal::new() };

        let result = plan(initial, &must_have, &must_not_have, false, 8, temp()).unwrap();
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].task, Task::Pxzcat);
        assert_eq!(result.total_weight(), 80);
    }

    #[test]
    fn growth_beyond_headroom_uses_virt_resize_not_disk_resize() {
        let initial = TagSet::new().with_size(1_073_741_824).with_format("raw");
        let must_have = Goal::new().with_size(1_073_741_824 + HEADROOM_BYTES + 1);
        let must_not_have = Goal::new();

        let result = plan(initial, &must_have, &must_not_have, false, 8, temp()).unwrap();
        assert!(result.steps.iter().any(|s| s.task == Task::VirtResize));
        assert!(!result.steps.iter().any(|s| s.task == Task::DiskResize));
    }

    #[test]
    fn small_growth_prefers_disk_resize_over_virt_resize() {
        let initial = TagSet::new().with_size(1_073_741_824).with_format("raw");
        let must_have = Goal::new().with_size(1_073_741_824 + 1024);
        let must_not_have = Goal::new();

        let result = plan(initial, &must_have, &must_not_have, false, 8, temp()).unwrap();
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].task, Task::DiskResize);
        assert_eq!(result.total_weight(), 60);
    }

    #[test]
    fn unreachable_goal_within_depth_reports_no_plan() {
        let initial = TagSet::new().with_template(true).with_xz(true);
        let must_have = Goal::new().with_format("vhd");
        let must_not_have = Goal { xz: true, ..Goal::new() };

        let err = plan(initial, &must_have, &must_not_have, false, 0, temp()).unwrap_err();
        assert!(matches!(err, Error::NoPlan { max_depth: 0 }));
    }

    #[test]
    fn already_satisfied_goal_returns_the_empty_plan() {
        let initial = TagSet::new().with_filename("out.img");
        let must_have = Goal::new().with_filename("out.img");
        let must_not_have = Goal::new();

        let result = plan(initial, &must_have, &must_not_have, false, 8, temp()).unwrap();
        assert!(result.steps.is_empty());
    }
}
