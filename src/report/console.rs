use super::classify::DisplayState;
use super::timeline::Segment;
use super::types::{AnnotatedNode, RunReport, TreeSummary};
use colored::{ColoredString, Colorize};

const BAR_FILL: &str = "█";
const BAR_GAP: &str = "·";

/// Render a run report as an indented tree with a timeline bar under each child.
///
/// Children of collapsed nodes are left out.
pub fn render(report: &RunReport, bar_width: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{} Run {}\n",
        "▶".green().bold(),
        report.run_id.cyan()
    ));
    render_node(&mut out, &report.root, 0, bar_width);
    render_summary(&mut out, &report.summary);
    out
}

fn render_node(out: &mut String, node: &AnnotatedNode, depth: usize, bar_width: usize) {
    let indent = "    ".repeat(depth);
    let marker = if node.children.is_empty() {
        " "
    } else if node.expanded {
        "▾"
    } else {
        "▸"
    };

    let mut line = format!(
        "{}{} {} {} [{}]",
        indent,
        marker,
        state_icon(node.display_state),
        node.name.bold(),
        paint(node.display_state, node.display_state.label())
    );
    if !node.children.is_empty() {
        let noun = node
            .kind
            .child()
            .map(|kind| kind.label())
            .unwrap_or("node");
        line.push_str(&format!(" {} {}s", node.children.len(), noun));
    }
    if let Some(secs) = node.duration_secs {
        line.push_str(&format!(" {}", format!("{:.1} sec", secs).dimmed()));
    }
    if node.warning_exceeded {
        if let Some(limit) = node.warning_time {
            line.push_str(&format!(
                " {}",
                format!("Warningtime of {} sec exceeded", limit).yellow()
            ));
        }
    }
    out.push_str(&line);
    out.push('\n');

    if depth > 0 && bar_width > 0 {
        out.push_str(&format!(
            "{}    {}\n",
            indent,
            timeline_bar(&node.segment, node.display_state, bar_width)
        ));
    }

    if let Some(exception) = &node.exception {
        out.push_str(&format!(
            "{}    {} {}\n",
            indent,
            "!".red().bold(),
            exception.detail_message.red()
        ));
        if let Some(url) = &node.screenshot_url {
            out.push_str(&format!("{}    screenshot: {}\n", indent, url.underline()));
        }
        if node.show_stack_trace {
            for frame in exception.stack_trace.lines() {
                out.push_str(&format!("{}      {}\n", indent, frame.dimmed()));
            }
        }
    }

    if node.expanded {
        for child in &node.children {
            render_node(out, child, depth + 1, bar_width);
        }
    }
}

fn render_summary(out: &mut String, summary: &TreeSummary) {
    let status = if summary.finished {
        "finished".green()
    } else {
        "running".blue()
    };
    out.push_str(&format!("\n{} Run {}\n", "■".blue().bold(), status));
    out.push_str(&format!(
        "  {} cases, {} steps, {} actions\n",
        summary.cases, summary.steps, summary.actions
    ));
    out.push_str(&format!(
        "  {} ok, {} warning, {} error, {} running\n",
        summary.ok.to_string().green(),
        summary.warning.to_string().yellow(),
        summary.error.to_string().red(),
        summary.running.to_string().blue()
    ));
    if let Some(secs) = summary.total_duration_secs {
        out.push_str(&format!("  Duration: {:.1} sec\n", secs));
    }
}

/// Bar cells for the leading gap, the segment and the trailing gap.
///
/// Both gaps are scaled from their percentages and the segment takes the
/// remaining cells. A non-empty segment always gets at least one cell while
/// there is room.
pub fn bar_cells(segment: &Segment, width: usize) -> (usize, usize, usize) {
    let scale = |percent: f64| ((percent / 100.0) * width as f64).round() as usize;
    let lead = scale(segment.offset_percent).min(width);
    let mut tail = scale(segment.filler_percent()).min(width - lead);
    let mut fill = width - lead - tail;
    if fill == 0 && segment.duration_percent > 0.0 && tail > 0 {
        tail -= 1;
        fill = 1;
    }
    (lead, fill, tail)
}

fn timeline_bar(segment: &Segment, state: DisplayState, width: usize) -> String {
    let (lead, fill, tail) = bar_cells(segment, width);
    format!(
        "{}{}{}",
        BAR_GAP.repeat(lead).dimmed(),
        paint(state, &BAR_FILL.repeat(fill)),
        BAR_GAP.repeat(tail).dimmed()
    )
}

fn state_icon(state: DisplayState) -> ColoredString {
    match state {
        DisplayState::Ok => "✓".green(),
        DisplayState::Running => "⋯".blue(),
        DisplayState::Warning => "⚠".yellow(),
        DisplayState::Error => "✗".red(),
    }
}

fn paint(state: DisplayState, text: &str) -> ColoredString {
    match state {
        DisplayState::Ok => text.green(),
        DisplayState::Running => text.blue(),
        DisplayState::Warning => text.yellow(),
        DisplayState::Error => text.red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{build_report, ViewState};
    use crate::result::{NodeKind, ResultState, ResultTree};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_bar_cells() {
        let a = Segment {
            offset_percent: 10.0,
            duration_percent: 20.0,
        };
        let b = Segment {
            offset_percent: 60.0,
            duration_percent: 30.0,
        };
        assert_eq!(bar_cells(&a, 10), (1, 2, 7));
        assert_eq!(bar_cells(&b, 10), (6, 3, 1));
        assert_eq!(bar_cells(&Segment::FULL, 40), (0, 40, 0));
        assert_eq!(bar_cells(&Segment::EMPTY, 40), (0, 0, 40));

        // Clamped independently, the segment overruns the bar
        let late = Segment {
            offset_percent: 90.0,
            duration_percent: 30.0,
        };
        assert_eq!(bar_cells(&late, 10), (9, 1, 0));
    }

    #[test]
    fn test_tiny_segment_stays_visible() {
        let tiny = Segment {
            offset_percent: 50.0,
            duration_percent: 0.5,
        };
        assert_eq!(bar_cells(&tiny, 10), (5, 1, 4));

        let at_end = Segment {
            offset_percent: 100.0,
            duration_percent: 0.5,
        };
        assert_eq!(bar_cells(&at_end, 10), (10, 0, 0));
    }

    #[test]
    fn test_render_hides_collapsed_children() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let mut tree = ResultTree::started("checkout", start);
        let case = tree.push_child(tree.root(), "pay by card", NodeKind::Case);
        tree.push_child(case, "enter card", NodeKind::Step);
        {
            let node = tree.node_mut(case);
            node.start_date = Some(start);
            node.stop_date = Some(start + Duration::seconds(3));
            node.state = ResultState::Ok;
        }

        let mut view = ViewState::new();
        view.set_expanded(tree.root(), true);
        let now = start + Duration::seconds(5);

        let text = render(&build_report("run-1", &tree, &view, now), 20);
        assert!(text.contains("checkout"));
        assert!(text.contains("pay by card"));
        assert!(text.contains("1 steps"));
        assert!(!text.contains("enter card"));

        view.expand_all(&tree);
        let text = render(&build_report("run-1", &tree, &view, now), 20);
        assert!(text.contains("enter card"));
    }
}
