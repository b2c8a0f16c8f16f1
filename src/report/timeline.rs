use crate::result::{NodeId, ResultNode, ResultTree};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Position of a child's bar inside its parent's bar, in percent
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub offset_percent: f64,
    pub duration_percent: f64,
}

impl Segment {
    pub const EMPTY: Segment = Segment {
        offset_percent: 0.0,
        duration_percent: 0.0,
    };

    pub const FULL: Segment = Segment {
        offset_percent: 0.0,
        duration_percent: 100.0,
    };

    /// Space left on the bar after the offset and the segment itself.
    pub fn filler_percent(&self) -> f64 {
        clamp_percent(100.0 - self.offset_percent - self.duration_percent)
    }
}

/// Segments of all children of `parent`, in sibling order.
///
/// A parent without a stop date is measured up to `now`.
pub fn segments(tree: &ResultTree, parent: NodeId, now: DateTime<Utc>) -> Vec<(NodeId, Segment)> {
    let parent_node = &tree[parent];
    tree.children(parent)
        .map(|(id, child)| (id, segment_for(parent_node, child, now)))
        .collect()
}

pub fn segment_for(parent: &ResultNode, child: &ResultNode, now: DateTime<Utc>) -> Segment {
    let (Some(parent_start), Some(child_start)) = (parent.start_date, child.start_date) else {
        return Segment::EMPTY;
    };

    let parent_duration = millis_between(parent_start, parent.stop_date.unwrap_or(now));
    if parent_duration <= 0.0 {
        return Segment::EMPTY;
    }

    let child_duration = millis_between(child_start, child.stop_date.unwrap_or(now));
    Segment {
        offset_percent: percent_of(millis_between(parent_start, child_start), parent_duration),
        duration_percent: percent_of(child_duration, parent_duration),
    }
}

/// `part / total * 100`, clamped to `[0, 100]`. Zero for a degenerate total.
pub fn percent_of(part: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    clamp_percent(part / total * 100.0)
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64
}
