#![forbid(unsafe_code)]

//! Column-range resolution and ellipsis budgeting.

/// Sentinel for "no upper bound" in column space.
pub const UNBOUNDED: usize = usize::MAX;

/// A resolved, clamped column range plus cut flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedBounds {
    pub start: usize,
    pub end: usize,
    /// Columns exist before `start`.
    pub cut_start: bool,
    /// Columns exist after `end`.
    pub cut_end: bool,
    /// The range is empty; the slice is `""` regardless of content.
    pub empty: bool,
}

/// Resolve signed, optionally absent indices against a known total
/// width. Negative indices count back from the end; the range clamps
/// to `[0, total_width]` and collapses to empty when inverted.
#[must_use]
pub fn resolve(start: isize, end: Option<isize>, total_width: usize) -> ResolvedBounds {
    let total = total_width as isize;
    let from = if start < 0 {
        total.saturating_add(start)
    } else {
        start
    };
    let to = match end {
        None => total,
        Some(e) if e < 0 => total.saturating_add(e),
        Some(e) => e,
    };
    let from = from.max(0);
    let to = to.min(total);
    if to <= from {
        return ResolvedBounds {
            start: 0,
            end: 0,
            cut_start: false,
            cut_end: false,
            empty: true,
        };
    }
    ResolvedBounds {
        start: from as usize,
        end: to as usize,
        cut_start: from > 0,
        cut_end: (to as usize) < total_width,
        empty: false,
    }
}

/// What is known about the end cut when the ellipsis budget is drawn.
#[derive(Debug, Clone, Copy)]
pub struct EndCut {
    /// Whether the cut-at-end fact is known up front (a total-width
    /// pre-pass ran, or the end is unbounded).
    pub known: bool,
    /// When known: whether content actually extends past `end`.
    pub hint: bool,
}

/// The ellipsis plan for one emission: adjusted bounds, which sides get
/// an ellipsis, and the speculative budget for lazy end-cut detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EllipsisPlan {
    pub start: usize,
    /// Possibly [`UNBOUNDED`].
    pub end: usize,
    pub lead: bool,
    pub trail: bool,
    /// Nonzero only when the end cut is not yet known: columns between
    /// `end` and the original bound that are emitted speculatively and
    /// kept only if no cut materializes.
    pub spec_budget: usize,
    /// The range is too narrow for content plus ellipsis; the output
    /// is the ellipsis string verbatim.
    pub verbatim: bool,
}

/// Carve the ellipsis out of the visible budget. An ellipsis is only
/// reserved on a side that is actually cut, and only when it leaves at
/// least one column of content.
#[must_use]
pub fn plan_ellipsis(
    start: usize,
    end: usize,
    ellipsis_width: usize,
    cut_start: bool,
    end_cut: EndCut,
) -> EllipsisPlan {
    let mut plan = EllipsisPlan {
        start,
        end,
        lead: false,
        trail: false,
        spec_budget: 0,
        verbatim: false,
    };
    if ellipsis_width == 0 {
        return plan;
    }
    let span = if end == UNBOUNDED {
        UNBOUNDED - start
    } else {
        end - start
    };
    if cut_start && ellipsis_width < span {
        plan.lead = true;
        plan.start += ellipsis_width;
    }
    if end != UNBOUNDED {
        let remaining = end - plan.start;
        if end_cut.known {
            if end_cut.hint && ellipsis_width < remaining {
                plan.trail = true;
                plan.end -= ellipsis_width;
            }
        } else if ellipsis_width < remaining {
            plan.trail = true;
            plan.spec_budget = ellipsis_width;
            plan.end -= ellipsis_width;
        }
    }
    if end_cut.known && (cut_start || end_cut.hint) && !plan.lead && !plan.trail {
        plan.verbatim = true;
    }
    plan
}
