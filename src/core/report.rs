//! Plain-text renderers for the toolkit-style console output.
//!
//! Both renderers produce exactly the characters the deployment toolkit prints, so
//! their output can be compared byte for byte. Widths are counted in characters.

pub const BOX_WIDTH: usize = 80;

/// Minimum content width of the first table column
pub const RESOURCE_COLUMN_WIDTH: usize = 30;

/// A titled table with heavy header borders and light body borders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn column_widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let floor = if i == 0 { RESOURCE_COLUMN_WIDTH } else { 0 };
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| char_len(cell))
                    .chain([char_len(header), floor])
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Total width of every bordered line
    pub fn width(&self) -> usize {
        let widths = self.column_widths();
        widths.iter().map(|w| w + 2).sum::<usize>() + widths.len() + 1
    }

    pub fn lines(&self) -> Vec<String> {
        let widths = self.column_widths();
        let padding = self.width().saturating_sub(char_len(&self.title)) / 2;

        let mut lines = vec![format!("{}{}", " ".repeat(padding), self.title)];
        lines.push(rule(&widths, '┏', '━', '┳', '┓'));
        lines.push(cells(&widths, &self.headers, '┃'));
        lines.push(rule(&widths, '┡', '━', '╇', '┩'));
        for row in &self.rows {
            lines.push(cells(&widths, row, '│'));
        }
        lines.push(rule(&widths, '└', '─', '┴', '┘'));
        lines
    }

    pub fn render(&self) -> String {
        self.lines().join("\n")
    }
}

fn rule(widths: &[usize], left: char, fill: char, join: char, right: char) -> String {
    let segments: Vec<String> = widths
        .iter()
        .map(|w| fill.to_string().repeat(w + 2))
        .collect();
    format!("{left}{}{right}", segments.join(&join.to_string()))
}

fn cells(widths: &[usize], values: &[String], border: char) -> String {
    let segments: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            let value = values.get(i).map(String::as_str).unwrap_or("");
            format!(" {} ", pad_left(value, w))
        })
        .collect();
    format!("{border}{}{border}", segments.join(&border.to_string()))
}

/// Rounded box of [`BOX_WIDTH`] columns around `lines`. An empty line stays empty.
pub fn boxed<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let inner = BOX_WIDTH - 2;
    let mut out = Vec::with_capacity(lines.len() + 2);
    out.push(format!("╭{}╮", "─".repeat(inner)));
    for line in lines {
        let line = line.as_ref();
        let content = if line.is_empty() {
            "│".to_string()
        } else {
            format!("│ {line}")
        };
        out.push(format!("{}│", pad_right(&content, BOX_WIDTH - 1)));
    }
    out.push(format!("╰{}╯", "─".repeat(inner)));
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn pad_left(s: &str, width: usize) -> String {
    format!("{}{s}", " ".repeat(width.saturating_sub(char_len(s))))
}

fn pad_right(s: &str, width: usize) -> String {
    format!("{s}{}", " ".repeat(width.saturating_sub(char_len(s))))
}
