//! Retained-mode plotting surface rendered to inline SVG.
//!
//! Chart routines draw into the [`Axes`] they are handed. Limits are
//! autoscaled from the drawn data unless fixed with [`Axes::set_ylim`];
//! vertical spans never take part in autoscaling.

use chrono::{Datelike, NaiveDate};

pub const WIDTH: f64 = 576.0;
pub const HEIGHT: f64 = 288.0;
pub const PADDING: f64 = 36.0;
const LEFT_PADDING: f64 = 52.0;
const TITLE_HEIGHT: f64 = 18.0;
const Y_MARGIN: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub color: String,
    pub width: f64,
    pub alpha: f64,
    /// SVG dash pattern, e.g. `"4 3"`.
    pub dash: Option<String>,
}

impl LineStyle {
    pub fn solid(color: &str, width: f64) -> Self {
        Self {
            color: color.to_string(),
            width,
            alpha: 1.0,
            dash: None,
        }
    }

    pub fn dashed(color: &str, width: f64) -> Self {
        Self {
            dash: Some("4 3".to_string()),
            ..Self::solid(color, width)
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillStyle {
    pub color: String,
    pub alpha: f64,
}

impl FillStyle {
    pub fn new(color: &str, alpha: f64) -> Self {
        Self {
            color: color.to_string(),
            alpha,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegendLoc {
    #[default]
    Best,
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickFormat {
    #[default]
    Number,
    /// Fractions shown as percentages.
    Percent,
    /// Values already in percent.
    PercentValue,
    Dates,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Artist {
    Line {
        xs: Vec<f64>,
        ys: Vec<f64>,
        style: LineStyle,
        label: Option<String>,
    },
    FillBetween {
        xs: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        style: FillStyle,
        label: Option<String>,
    },
    HLine {
        y: f64,
        style: LineStyle,
        label: Option<String>,
    },
    VLine {
        x: f64,
        style: LineStyle,
        label: Option<String>,
    },
    /// Full-height shading between two x positions.
    VSpan { x0: f64, x1: f64, style: FillStyle },
    Bars {
        positions: Vec<f64>,
        lengths: Vec<f64>,
        width: f64,
        horizontal: bool,
        style: FillStyle,
        label: Option<String>,
    },
    Box {
        x: f64,
        min: f64,
        q1: f64,
        median: f64,
        q3: f64,
        max: f64,
        style: FillStyle,
    },
}

type Extent = Option<(f64, f64)>;

fn merge(a: Extent, lo: f64, hi: f64) -> Extent {
    if !lo.is_finite() || !hi.is_finite() {
        return a;
    }
    Some(match a {
        Some((l, h)) => (l.min(lo), h.max(hi)),
        None => (lo, hi),
    })
}

fn span_of(values: &[f64]) -> Extent {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| merge(acc, v, v))
}

impl Artist {
    /// Data extent along (x, y) used for autoscaling.
    fn extent(&self) -> (Extent, Extent) {
        match self {
            Artist::Line { xs, ys, .. } => (span_of(xs), span_of(ys)),
            Artist::FillBetween {
                xs, lower, upper, ..
            } => {
                let y = span_of(lower).and_then(|(l, h)| merge(span_of(upper), l, h));
                (span_of(xs), y.or(span_of(lower)))
            }
            Artist::HLine { y, .. } => (None, merge(None, *y, *y)),
            Artist::VLine { x, .. } => (merge(None, *x, *x), None),
            Artist::VSpan { .. } => (None, None),
            Artist::Bars {
                positions,
                lengths,
                width,
                horizontal,
                ..
            } => {
                let pos = span_of(positions).map(|(l, h)| (l - width / 2.0, h + width / 2.0));
                let len = span_of(lengths).and_then(|(l, h)| merge(Some((0.0, 0.0)), l, h));
                if *horizontal { (len, pos) } else { (pos, len) }
            }
            Artist::Box { x, min, max, .. } => {
                (merge(None, x - 0.5, x + 0.5), merge(None, *min, *max))
            }
        }
    }

    fn legend_entry(&self) -> Option<(&str, &str, Option<&str>)> {
        match self {
            Artist::Line { style, label, .. }
            | Artist::HLine { style, label, .. }
            | Artist::VLine { style, label, .. } => label
                .as_deref()
                .map(|l| (l, style.color.as_str(), style.dash.as_deref())),
            Artist::FillBetween { style, label, .. } | Artist::Bars { style, label, .. } => {
                label.as_deref().map(|l| (l, style.color.as_str(), None))
            }
            _ => None,
        }
    }
}

/// Day number used as the x coordinate of a date.
pub fn date_coord(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

pub fn date_coords(dates: &[NaiveDate]) -> Vec<f64> {
    dates.iter().map(|&d| date_coord(d)).collect()
}

pub(crate) fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Debug, Clone, Default)]
pub struct Axes {
    title: String,
    xlabel: Option<String>,
    ylabel: Option<String>,
    artists: Vec<Artist>,
    ylim: Option<(f64, f64)>,
    x_format: TickFormat,
    y_format: TickFormat,
    x_categories: Option<Vec<(f64, String)>>,
    y_categories: Option<Vec<(f64, String)>>,
    legend: LegendLoc,
}

impl Axes {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artists(&self) -> &[Artist] {
        &self.artists
    }

    pub fn set_xlabel(&mut self, label: impl Into<String>) {
        self.xlabel = Some(label.into());
    }

    pub fn set_ylabel(&mut self, label: impl Into<String>) {
        self.ylabel = Some(label.into());
    }

    pub fn set_x_format(&mut self, format: TickFormat) {
        self.x_format = format;
    }

    pub fn set_y_format(&mut self, format: TickFormat) {
        self.y_format = format;
    }

    pub fn set_x_categories(&mut self, ticks: Vec<(f64, String)>) {
        self.x_categories = Some(ticks);
    }

    pub fn set_y_categories(&mut self, ticks: Vec<(f64, String)>) {
        self.y_categories = Some(ticks);
    }

    pub fn set_legend(&mut self, loc: LegendLoc) {
        self.legend = loc;
    }

    /// Fix the y range. Later artists no longer rescale the axis.
    pub fn set_ylim(&mut self, lo: f64, hi: f64) {
        self.ylim = Some((lo, hi));
    }

    pub fn plot(&mut self, xs: Vec<f64>, ys: Vec<f64>, style: LineStyle, label: Option<&str>) {
        self.artists.push(Artist::Line {
            xs,
            ys,
            style,
            label: label.map(String::from),
        });
    }

    pub fn plot_dates(
        &mut self,
        dates: &[NaiveDate],
        ys: Vec<f64>,
        style: LineStyle,
        label: Option<&str>,
    ) {
        self.x_format = TickFormat::Dates;
        self.plot(date_coords(dates), ys, style, label);
    }

    pub fn fill_between(
        &mut self,
        xs: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
        style: FillStyle,
        label: Option<&str>,
    ) {
        self.artists.push(Artist::FillBetween {
            xs,
            lower,
            upper,
            style,
            label: label.map(String::from),
        });
    }

    pub fn fill_between_dates(
        &mut self,
        dates: &[NaiveDate],
        lower: Vec<f64>,
        upper: Vec<f64>,
        style: FillStyle,
        label: Option<&str>,
    ) {
        self.x_format = TickFormat::Dates;
        self.fill_between(date_coords(dates), lower, upper, style, label);
    }

    pub fn axhline(&mut self, y: f64, style: LineStyle, label: Option<&str>) {
        self.artists.push(Artist::HLine {
            y,
            style,
            label: label.map(String::from),
        });
    }

    pub fn axvline(&mut self, x: f64, style: LineStyle, label: Option<&str>) {
        self.artists.push(Artist::VLine {
            x,
            style,
            label: label.map(String::from),
        });
    }

    pub fn axvspan_dates(&mut self, start: NaiveDate, end: NaiveDate, style: FillStyle) {
        self.artists.push(Artist::VSpan {
            x0: date_coord(start),
            x1: date_coord(end),
            style,
        });
    }

    pub fn bar(
        &mut self,
        positions: Vec<f64>,
        heights: Vec<f64>,
        width: f64,
        style: FillStyle,
        label: Option<&str>,
    ) {
        self.artists.push(Artist::Bars {
            positions,
            lengths: heights,
            width,
            horizontal: false,
            style,
            label: label.map(String::from),
        });
    }

    pub fn barh(&mut self, positions: Vec<f64>, lengths: Vec<f64>, height: f64, style: FillStyle) {
        self.artists.push(Artist::Bars {
            positions,
            lengths,
            width: height,
            horizontal: true,
            style,
            label: None,
        });
    }

    pub fn boxplot(
        &mut self,
        x: f64,
        stats: crate::domain::aggregation::BoxStats,
        style: FillStyle,
    ) {
        self.artists.push(Artist::Box {
            x,
            min: stats.min,
            q1: stats.q1,
            median: stats.median,
            q3: stats.q3,
            max: stats.max,
            style,
        });
    }

    fn data_limits(&self) -> (Extent, Extent) {
        self.artists.iter().fold((None, None), |(x, y), artist| {
            let (ax, ay) = artist.extent();
            (
                ax.and_then(|(l, h)| merge(x, l, h)).or(x),
                ay.and_then(|(l, h)| merge(y, l, h)).or(y),
            )
        })
    }

    /// Current y range: the fixed range if set, otherwise the autoscaled
    /// data range with a small margin.
    pub fn ylim(&self) -> (f64, f64) {
        if let Some(lim) = self.ylim {
            return lim;
        }
        let (lo, hi) = self.data_limits().1.unwrap_or((0.0, 1.0));
        if lo == hi {
            let pad = if lo == 0.0 { 0.5 } else { lo.abs() * 0.1 };
            return (lo - pad, hi + pad);
        }
        let margin = (hi - lo) * Y_MARGIN;
        (lo - margin, hi + margin)
    }

    pub fn xlim(&self) -> (f64, f64) {
        match self.data_limits().0 {
            Some((lo, hi)) if lo < hi => (lo, hi),
            Some((lo, _)) => (lo - 0.5, lo + 0.5),
            None => (0.0, 1.0),
        }
    }

    /// Render this panel at vertical offset `top`.
    fn render(&self, svg: &mut String, top: f64) {
        let (x0, x1) = self.xlim();
        let (y0, y1) = self.ylim();
        let left = LEFT_PADDING;
        let right = WIDTH - PADDING / 2.0;
        let plot_top = top + PADDING / 2.0 + TITLE_HEIGHT;
        let plot_bottom = top + HEIGHT - PADDING;

        let sx = |x: f64| left + (x.clamp(x0, x1) - x0) / (x1 - x0) * (right - left);
        let sy = |y: f64| {
            let norm = (y.clamp(y0, y1) - y0) / (y1 - y0);
            plot_bottom - norm * (plot_bottom - plot_top)
        };

        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle" class="ts-title">{title}</text>"#,
            x = WIDTH / 2.0,
            y = top + PADDING / 2.0 + 4.0,
            title = escape(&self.title)
        ));
        svg.push_str(&format!(
            r##"<rect x="{left:.2}" y="{t:.2}" width="{w:.2}" height="{h:.2}" fill="none" stroke="#cccccc" stroke-width="1" />"##,
            t = plot_top,
            w = right - left,
            h = plot_bottom - plot_top
        ));

        let y_ticks = match &self.y_categories {
            Some(cats) => cats.clone(),
            None => nice_ticks(y0, y1)
                .into_iter()
                .map(|v| (v, format_tick(v, self.y_format)))
                .collect(),
        };
        for (v, label) in y_ticks {
            if v < y0 || v > y1 {
                continue;
            }
            let y = sy(v);
            svg.push_str(&format!(
                r##"<line x1="{left:.2}" y1="{y:.2}" x2="{right:.2}" y2="{y:.2}" stroke="#eeeeee" stroke-width="0.5" /><text x="{tx:.2}" y="{ty:.2}" text-anchor="end">{label}</text>"##,
                tx = left - 4.0,
                ty = y + 3.0,
                label = escape(&label)
            ));
        }

        let x_ticks = match &self.x_categories {
            Some(cats) => cats.clone(),
            None => nice_ticks(x0, x1)
                .into_iter()
                .map(|v| (v, format_tick(v, self.x_format)))
                .collect(),
        };
        for (v, label) in x_ticks {
            if v < x0 || v > x1 {
                continue;
            }
            let x = sx(v);
            svg.push_str(&format!(
                r##"<line x1="{x:.2}" y1="{b:.2}" x2="{x:.2}" y2="{b2:.2}" stroke="#cccccc" stroke-width="1" /><text x="{x:.2}" y="{ty:.2}" text-anchor="middle">{label}</text>"##,
                b = plot_bottom,
                b2 = plot_bottom + 4.0,
                ty = plot_bottom + 15.0,
                label = escape(&label)
            ));
        }

        if let Some(label) = &self.ylabel {
            svg.push_str(&format!(
                r#"<text x="10" y="{y:.2}" text-anchor="middle" transform="rotate(-90 10 {y:.2})">{label}</text>"#,
                y = (plot_top + plot_bottom) / 2.0,
                label = escape(label)
            ));
        }
        if let Some(label) = &self.xlabel {
            svg.push_str(&format!(
                r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
                x = (left + right) / 2.0,
                y = top + HEIGHT - 6.0,
                label = escape(label)
            ));
        }

        for artist in &self.artists {
            match artist {
                Artist::VSpan { x0: a, x1: b, style } => {
                    let (xa, xb) = (sx(*a), sx(*b));
                    svg.push_str(&format!(
                        r#"<rect x="{x:.2}" y="{t:.2}" width="{w:.2}" height="{h:.2}" fill="{color}" fill-opacity="{alpha}" />"#,
                        x = xa.min(xb),
                        t = plot_top,
                        w = (xb - xa).abs().max(1.0),
                        h = plot_bottom - plot_top,
                        color = style.color,
                        alpha = style.alpha
                    ));
                }
                Artist::FillBetween {
                    xs, lower, upper, style, ..
                } => {
                    let mut pts: Vec<String> = xs
                        .iter()
                        .zip(upper)
                        .map(|(&x, &y)| format!("{:.2},{:.2}", sx(x), sy(y)))
                        .collect();
                    pts.extend(
                        xs.iter()
                            .zip(lower)
                            .rev()
                            .map(|(&x, &y)| format!("{:.2},{:.2}", sx(x), sy(y))),
                    );
                    svg.push_str(&format!(
                        r#"<polygon points="{pts}" fill="{color}" fill-opacity="{alpha}" stroke="none" />"#,
                        pts = pts.join(" "),
                        color = style.color,
                        alpha = style.alpha
                    ));
                }
                Artist::Line { xs, ys, style, .. } => {
                    let pts: Vec<String> = xs
                        .iter()
                        .zip(ys)
                        .filter(|(_, y)| y.is_finite())
                        .map(|(&x, &y)| format!("{:.2},{:.2}", sx(x), sy(y)))
                        .collect();
                    if !pts.is_empty() {
                        svg.push_str(&format!(
                            r#"<polyline fill="none" points="{pts}" {stroke} />"#,
                            pts = pts.join(" "),
                            stroke = stroke_attrs(style)
                        ));
                    }
                }
                Artist::HLine { y, style, .. } => {
                    if *y >= y0 && *y <= y1 {
                        svg.push_str(&format!(
                            r#"<line x1="{left:.2}" y1="{yy:.2}" x2="{right:.2}" y2="{yy:.2}" {stroke} />"#,
                            yy = sy(*y),
                            stroke = stroke_attrs(style)
                        ));
                    }
                }
                Artist::VLine { x, style, .. } => {
                    if *x >= x0 && *x <= x1 {
                        svg.push_str(&format!(
                            r#"<line x1="{xx:.2}" y1="{plot_top:.2}" x2="{xx:.2}" y2="{plot_bottom:.2}" {stroke} />"#,
                            xx = sx(*x),
                            stroke = stroke_attrs(style)
                        ));
                    }
                }
                Artist::Bars {
                    positions,
                    lengths,
                    width,
                    horizontal,
                    style,
                    ..
                } => {
                    for (&p, &l) in positions.iter().zip(lengths) {
                        let (rx, ry, rw, rh) = if *horizontal {
                            let (a, b) = (sx(0.0), sx(l));
                            let (c, d) = (sy(p + width / 2.0), sy(p - width / 2.0));
                            (a.min(b), c.min(d), (b - a).abs(), (d - c).abs())
                        } else {
                            let (a, b) = (sx(p - width / 2.0), sx(p + width / 2.0));
                            let (c, d) = (sy(l), sy(0.0));
                            (a.min(b), c.min(d), (b - a).abs(), (d - c).abs())
                        };
                        svg.push_str(&format!(
                            r#"<rect x="{rx:.2}" y="{ry:.2}" width="{rw:.2}" height="{rh:.2}" fill="{color}" fill-opacity="{alpha}" />"#,
                            color = style.color,
                            alpha = style.alpha
                        ));
                    }
                }
                Artist::Box {
                    x,
                    min,
                    q1,
                    median,
                    q3,
                    max,
                    style,
                } => {
                    let (xl, xc, xr) = (sx(x - 0.25), sx(*x), sx(x + 0.25));
                    svg.push_str(&format!(
                        r##"<line x1="{xc:.2}" y1="{ymin:.2}" x2="{xc:.2}" y2="{ymax:.2}" stroke="#555555" stroke-width="1" /><rect x="{xl:.2}" y="{yq3:.2}" width="{w:.2}" height="{h:.2}" fill="{color}" fill-opacity="{alpha}" stroke="#555555" /><line x1="{xl:.2}" y1="{ymed:.2}" x2="{xr:.2}" y2="{ymed:.2}" stroke="#222222" stroke-width="1.5" />"##,
                        ymin = sy(*min),
                        ymax = sy(*max),
                        yq3 = sy(*q3),
                        w = xr - xl,
                        h = (sy(*q1) - sy(*q3)).abs(),
                        ymed = sy(*median),
                        color = style.color,
                        alpha = style.alpha
                    ));
                }
            }
        }

        self.render_legend(svg, left, right, plot_top, plot_bottom);
    }

    fn render_legend(&self, svg: &mut String, left: f64, right: f64, top: f64, bottom: f64) {
        let entries: Vec<_> = self.artists.iter().filter_map(Artist::legend_entry).collect();
        if entries.is_empty() || self.legend == LegendLoc::Hidden {
            return;
        }
        let box_height = entries.len() as f64 * 12.0 + 4.0;
        let (x, y) = match self.legend {
            LegendLoc::UpperRight => (right - 130.0, top + 4.0),
            LegendLoc::LowerLeft => (left + 6.0, bottom - box_height - 4.0),
            LegendLoc::LowerRight => (right - 130.0, bottom - box_height - 4.0),
            LegendLoc::Best | LegendLoc::UpperLeft | LegendLoc::Hidden => (left + 6.0, top + 4.0),
        };
        svg.push_str(&format!(
            r##"<rect x="{x:.2}" y="{y:.2}" width="124" height="{box_height:.2}" fill="#ffffff" fill-opacity="0.8" />"##
        ));
        for (i, (label, color, dash)) in entries.iter().enumerate() {
            let ly = y + 10.0 + i as f64 * 12.0;
            svg.push_str(&format!(
                r#"<line x1="{x1:.2}" y1="{yl:.2}" x2="{x2:.2}" y2="{yl:.2}" stroke="{color}" stroke-width="2" stroke-dasharray="{dash}" /><text x="{tx:.2}" y="{ty:.2}">{label}</text>"#,
                x1 = x + 4.0,
                x2 = x + 20.0,
                yl = ly - 3.0,
                dash = dash.unwrap_or("0"),
                tx = x + 24.0,
                ty = ly,
                label = escape(label)
            ));
        }
    }
}

fn stroke_attrs(style: &LineStyle) -> String {
    format!(
        r#"stroke="{}" stroke-width="{}" stroke-opacity="{}" stroke-dasharray="{}""#,
        style.color,
        style.width,
        style.alpha,
        style.dash.as_deref().unwrap_or("0")
    )
}

/// Round tick positions covering `[lo, hi]`, stepping by 1, 2 or 5 times a
/// power of ten.
pub fn nice_ticks(lo: f64, hi: f64) -> Vec<f64> {
    if !(lo.is_finite() && hi.is_finite()) || hi <= lo {
        return Vec::new();
    }
    let raw = (hi - lo) / 5.0;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

fn format_tick(value: f64, format: TickFormat) -> String {
    match format {
        TickFormat::Dates => NaiveDate::from_num_days_from_ce_opt(value.round() as i32)
            .map(|d| d.format("%Y-%m").to_string())
            .unwrap_or_default(),
        TickFormat::Percent => format!("{:.0}%", value * 100.0),
        TickFormat::PercentValue => format!("{value:.0}%"),
        TickFormat::Number => {
            if value.abs() >= 100.0 || value == value.trunc() {
                format!("{value:.0}")
            } else {
                let s = format!("{value:.3}");
                s.trim_end_matches('0').to_string()
            }
        }
    }
}

/// Stack of panels sharing one SVG element.
#[derive(Debug, Clone, Default)]
pub struct Figure {
    axes: Vec<Axes>,
}

impl Figure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_axes(&mut self, title: impl Into<String>) -> &mut Axes {
        self.axes.push(Axes::new(title));
        let idx = self.axes.len() - 1;
        &mut self.axes[idx]
    }

    pub fn axes(&self) -> &[Axes] {
        &self.axes
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn to_svg(&self) -> String {
        let height = HEIGHT * self.axes.len().max(1) as f64;
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" class="ts-figure"><style>text{{font-family:Arial,sans-serif;font-size:10px;fill:#555}} .ts-title{{font-size:12px;fill:#222}}</style>"#,
            w = WIDTH,
            h = height
        );
        for (i, ax) in self.axes.iter().enumerate() {
            ax.render(&mut svg, i as f64 * HEIGHT);
        }
        svg.push_str("</svg>");
        svg
    }
}
