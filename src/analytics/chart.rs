use serde::{Deserialize, Serialize};

/// グラフの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    GroupedBar,
    Pie,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub color: Option<String>,
}

impl ChartSeries {
    pub fn new(name: impl Into<String>, labels: Vec<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            labels,
            values,
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// 描画ライブラリに渡すグラフ仕様
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub y_axis_title: Option<String>,
    pub series: Vec<ChartSeries>,
    pub height: u32,
    pub show_legend: bool,
}

pub const NEGATIVE_COLOR: &str = "#ff6b6b";
pub const POSITIVE_COLOR: &str = "#51cf66";

const DEFAULT_HEIGHT: u32 = 400;
const PIE_HOLE: f64 = 0.3;

impl ChartSpec {
    pub fn bar(title: impl Into<String>) -> Self {
        Self::new(ChartKind::Bar, title, false)
    }

    pub fn grouped_bar(title: impl Into<String>) -> Self {
        Self::new(ChartKind::GroupedBar, title, true)
    }

    pub fn pie(title: impl Into<String>) -> Self {
        Self::new(ChartKind::Pie, title, true)
    }

    fn new(kind: ChartKind, title: impl Into<String>, show_legend: bool) -> Self {
        Self {
            kind,
            title: title.into(),
            y_axis_title: None,
            series: Vec::new(),
            height: DEFAULT_HEIGHT,
            show_legend,
        }
    }

    pub fn with_y_axis(mut self, title: impl Into<String>) -> Self {
        self.y_axis_title = Some(title.into());
        self
    }

    pub fn with_series(mut self, series: ChartSeries) -> Self {
        self.series.push(series);
        self
    }

    /// Plotly.jsのfigure（data + layout）として表現
    pub fn to_plotly(&self) -> serde_json::Value {
        let data: Vec<serde_json::Value> = self
            .series
            .iter()
            .map(|series| match self.kind {
                ChartKind::Pie => serde_json::json!({
                    "type": "pie",
                    "name": series.name,
                    "labels": series.labels,
                    "values": series.values,
                    "hole": PIE_HOLE,
                }),
                ChartKind::Bar | ChartKind::GroupedBar => {
                    let mut trace = serde_json::json!({
                        "type": "bar",
                        "name": series.name,
                        "x": series.labels,
                        "y": series.values,
                    });
                    if let Some(color) = &series.color {
                        trace["marker"] = serde_json::json!({ "color": color });
                    }
                    trace
                }
            })
            .collect();

        let mut layout = serde_json::json!({
            "title": self.title,
            "height": self.height,
            "showlegend": self.show_legend,
        });
        if self.kind != ChartKind::Pie {
            layout["xaxis"] = serde_json::json!({ "title": "" });
            layout["yaxis"] = serde_json::json!({ "title": self.y_axis_title });
        }
        if self.kind == ChartKind::GroupedBar {
            layout["barmode"] = serde_json::json!("group");
        }

        serde_json::json!({ "data": data, "layout": layout })
    }
}
