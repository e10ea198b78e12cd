//! Drawdown episode detection.

use crate::domain::drawdown::DrawdownEpisode;
use crate::domain::error::TearsheetError;
use crate::domain::series::{DatedValue, ReturnSeries};

/// Episodes of the compounded curve, deepest first, at most `top`.
///
/// An episode opens at the last running high before the curve drops, its
/// valley is the lowest point before recovery, and it recovers on the first
/// date the curve regains the high. Episodes still open at the last date
/// have no recovery date.
pub fn gen_drawdown_table(
    returns: &ReturnSeries,
    top: usize,
) -> Result<Vec<DrawdownEpisode>, TearsheetError> {
    if returns.is_empty() {
        return Err(TearsheetError::missing_data(format!(
            "{} has no returns",
            returns.label()
        )));
    }
    let cum = returns.cum_returns(1.0);
    let points = cum.points();

    let mut episodes = Vec::new();
    let mut peak_idx = 0usize;
    let mut valley_idx: Option<usize> = None;

    for (i, p) in points.iter().enumerate().skip(1) {
        let peak = points[peak_idx].value;
        match valley_idx {
            None if p.value >= peak => peak_idx = i,
            None => valley_idx = Some(i),
            Some(v) if p.value >= peak => {
                episodes.push(episode(points, peak_idx, v, Some(i)));
                valley_idx = None;
                peak_idx = i;
            }
            Some(v) => {
                if p.value < points[v].value {
                    valley_idx = Some(i);
                }
            }
        }
    }
    if let Some(v) = valley_idx {
        episodes.push(episode(points, peak_idx, v, None));
    }

    episodes.sort_by(|a, b| {
        b.depth
            .total_cmp(&a.depth)
            .then_with(|| a.peak_date.cmp(&b.peak_date))
    });
    episodes.truncate(top);
    Ok(episodes)
}

fn episode(
    points: &[DatedValue],
    peak: usize,
    valley: usize,
    recovery: Option<usize>,
) -> DrawdownEpisode {
    let (high, low) = (points[peak].value, points[valley].value);
    DrawdownEpisode {
        peak_date: points[peak].date,
        valley_date: points[valley].date,
        recovery_date: recovery.map(|r| points[r].date),
        depth: if high > 0.0 { (high - low) / high } else { 0.0 },
    }
}
