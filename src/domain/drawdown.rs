//! Drawdown episodes and their shaded intervals.

use chrono::NaiveDate;

use crate::domain::error::TearsheetError;
use crate::domain::series::CumulativeReturnSeries;

/// One peak-to-valley(-to-recovery) episode. `recovery_date` is `None` while
/// the drawdown is still open at the last observed date.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownEpisode {
    pub peak_date: NaiveDate,
    pub valley_date: NaiveDate,
    pub recovery_date: Option<NaiveDate>,
    /// Fractional loss from peak to valley, positive.
    pub depth: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadedInterval {
    pub rank: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub color: String,
    /// Set when `end` was substituted for a missing recovery date.
    pub open: bool,
}

const PALETTE_DARK: (f64, f64, f64) = (45.0, 30.0, 62.0);
const PALETTE_LIGHT: (f64, f64, f64) = (222.0, 205.0, 195.0);

/// Ordered palette of `n` colours from darkest to lightest.
pub fn rank_palette(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
            let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
            format!(
                "#{:02x}{:02x}{:02x}",
                lerp(PALETTE_DARK.0, PALETTE_LIGHT.0),
                lerp(PALETTE_DARK.1, PALETTE_LIGHT.1),
                lerp(PALETTE_DARK.2, PALETTE_LIGHT.2)
            )
        })
        .collect()
}

/// Turn ranked episodes into shaded intervals. An unrecovered episode is
/// shaded through the last date of `cum_returns`.
pub fn shade_episodes(
    episodes: &[DrawdownEpisode],
    cum_returns: &CumulativeReturnSeries,
    top: usize,
) -> Result<Vec<ShadedInterval>, TearsheetError> {
    if episodes.len() > top {
        return Err(TearsheetError::invalid_input(format!(
            "{} drawdown episodes supplied but top is {}",
            episodes.len(),
            top
        )));
    }
    let last_date = cum_returns
        .last_date()
        .ok_or_else(|| TearsheetError::missing_data("cumulative returns are empty"))?;

    let palette = rank_palette(episodes.len());
    episodes
        .iter()
        .zip(palette)
        .enumerate()
        .map(|(rank, (episode, color))| {
            let end = episode.recovery_date.unwrap_or(last_date);
            if end < episode.peak_date {
                return Err(TearsheetError::invalid_input(format!(
                    "drawdown ends {} before its peak {}",
                    end, episode.peak_date
                )));
            }
            Ok(ShadedInterval {
                rank,
                start: episode.peak_date,
                end,
                color,
                open: episode.recovery_date.is_none(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::TimeSeries;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn cum() -> TimeSeries {
        TimeSeries::from_pairs(&[
            (d(2020, 1, 1), 1.0),
            (d(2020, 6, 1), 0.9),
            (d(2020, 12, 31), 0.95),
        ])
        .unwrap()
    }

    fn episode(peak: NaiveDate, recovery: Option<NaiveDate>, depth: f64) -> DrawdownEpisode {
        DrawdownEpisode {
            peak_date: peak,
            valley_date: peak,
            recovery_date: recovery,
            depth,
        }
    }

    #[test]
    fn open_episode_shades_to_last_date() {
        let episodes = vec![episode(d(2020, 3, 1), None, 0.2)];
        let shaded = shade_episodes(&episodes, &cum(), 10).unwrap();
        assert_eq!(shaded[0].start, d(2020, 3, 1));
        assert_eq!(shaded[0].end, d(2020, 12, 31));
        assert!(shaded[0].open);
    }

    #[test]
    fn recovered_episode_keeps_recovery() {
        let episodes = vec![episode(d(2020, 3, 1), Some(d(2020, 4, 1)), 0.2)];
        let shaded = shade_episodes(&episodes, &cum(), 10).unwrap();
        assert_eq!(shaded[0].end, d(2020, 4, 1));
        assert!(!shaded[0].open);
    }

    #[test]
    fn most_severe_gets_darkest_colour() {
        let episodes = vec![
            episode(d(2020, 1, 1), Some(d(2020, 2, 1)), 0.3),
            episode(d(2020, 3, 1), Some(d(2020, 4, 1)), 0.2),
            episode(d(2020, 5, 1), None, 0.1),
        ];
        let shaded = shade_episodes(&episodes, &cum(), 3).unwrap();
        let palette = rank_palette(3);
        assert_eq!(shaded[0].color, palette[0]);
        assert_eq!(shaded[0].color, "#2d1e3e");
        assert_eq!(shaded[2].color, "#decdc3");
        assert_eq!(shaded.iter().map(|s| s.rank).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn overlapping_episodes_shade_independently() {
        let episodes = vec![
            episode(d(2020, 1, 1), Some(d(2020, 6, 1)), 0.3),
            episode(d(2020, 3, 1), Some(d(2020, 4, 1)), 0.2),
        ];
        let shaded = shade_episodes(&episodes, &cum(), 5).unwrap();
        assert_eq!(shaded.len(), 2);
    }

    #[test]
    fn too_many_episodes_is_invalid() {
        let episodes = vec![episode(d(2020, 1, 1), None, 0.3), episode(d(2020, 2, 1), None, 0.2)];
        let err = shade_episodes(&episodes, &cum(), 1).unwrap_err();
        assert!(matches!(err, TearsheetError::InvalidInput { .. }));
    }

    #[test]
    fn empty_series_is_missing_data() {
        let episodes = vec![episode(d(2020, 1, 1), None, 0.3)];
        let err = shade_episodes(&episodes, &TimeSeries::default(), 5).unwrap_err();
        assert!(matches!(err, TearsheetError::MissingData { .. }));
    }
}
