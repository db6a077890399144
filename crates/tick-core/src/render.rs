use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::task::Statistics;
use crate::view::ViewModel;

pub const EMPTY_STATE: &str = "No tasks yet. Add one above!";
pub const CLEAR_HINT: &str = "Run `clear` to remove completed tasks.";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true) && io::stdout().is_terminal();
        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, view, stats))]
    pub fn print_view<W: Write>(
        &self,
        mut out: W,
        view: &ViewModel,
        stats: &Statistics,
    ) -> anyhow::Result<()> {
        if view.is_empty {
            writeln!(out, "{EMPTY_STATE}")?;
        } else {
            let headers = vec!["ID".to_string(), "Done".to_string(), "Task".to_string()];
            let rows = view
                .rows
                .iter()
                .map(|row| {
                    let id = self.paint(&row.id.to_string(), "33");
                    let (mark, text) = if row.completed {
                        (self.paint("[x]", "32"), self.paint(&row.text, "2;9"))
                    } else {
                        ("[ ]".to_string(), row.text.clone())
                    };
                    vec![id, mark, text]
                })
                .collect();
            write_table(&mut out, headers, rows)?;
        }

        writeln!(out)?;
        self.print_stats(&mut out, stats)?;
        if view.can_clear_completed() {
            writeln!(out, "{}", self.paint(CLEAR_HINT, "2"))?;
        }
        Ok(())
    }

    pub fn print_stats<W: Write>(&self, mut out: W, stats: &Statistics) -> anyhow::Result<()> {
        writeln!(
            out,
            "Total: {}  Completed: {}  Pending: {}",
            stats.total, stats.completed, stats.pending
        )?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let last = column_count.saturating_sub(1);
    for (idx, header) in headers.iter().enumerate() {
        if idx == last {
            writeln!(writer, "{header}")?;
        } else {
            write!(writer, "{:width$} ", header, width = widths[idx])?;
        }
    }

    for (idx, width) in widths.iter().enumerate() {
        if idx == last {
            writeln!(writer, "{:-<width$}", "", width = *width)?;
        } else {
            write!(writer, "{:-<width$} ", "", width = *width)?;
        }
    }

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if idx == last {
                writeln!(writer, "{cell}")?;
                continue;
            }
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{CLEAR_HINT, EMPTY_STATE, Renderer, strip_ansi};
    use crate::config::Config;
    use crate::store::TaskStore;
    use crate::view::project;

    fn render(store: &TaskStore) -> String {
        let mut buf = Vec::new();
        Renderer::plain()
            .print_view(&mut buf, &project(store.tasks()), &store.statistics())
            .expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn empty_store_shows_placeholder_and_counters() {
        let out = render(&TaskStore::new());
        assert_eq!(out, format!("{EMPTY_STATE}\n\nTotal: 0  Completed: 0  Pending: 0\n"));
    }

    #[test]
    fn rows_are_aligned() {
        let mut store = TaskStore::new();
        for n in 1..=10 {
            store.add(&format!("task {n}")).expect("add");
        }
        store.toggle_completion(10).expect("toggle");

        let out = render(&store);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "ID Done Task");
        assert_eq!(lines[1], "-- ---- -------");
        assert_eq!(lines[2], "1  [ ]  task 1");
        assert_eq!(lines[11], "10 [x]  task 10");
        assert_eq!(lines[13], "Total: 10  Completed: 1  Pending: 9");
        assert_eq!(lines[14], CLEAR_HINT);
    }

    #[test]
    fn clear_hint_needs_a_completed_task() {
        let mut store = TaskStore::new();
        store.add("a").expect("add");
        assert!(!render(&store).contains(CLEAR_HINT));

        store.toggle_completion(1).expect("toggle");
        assert!(render(&store).ends_with(&format!("{CLEAR_HINT}\n")));
    }

    #[test]
    fn color_setting_uses_config_booleans() {
        let mut cfg = Config::default();
        cfg.apply_overrides(vec![("color".to_string(), "y".to_string())]);
        assert!(Renderer::new(&cfg).is_ok());

        cfg.apply_overrides(vec![("color".to_string(), "sometimes".to_string())]);
        let err = Renderer::new(&cfg).expect_err("invalid color");
        assert!(err.to_string().contains("invalid color setting: sometimes"));
    }

    #[test]
    fn strip_ansi_removes_escape_sequences() {
        assert_eq!(strip_ansi("\x1b[33m12\x1b[0m"), "12");
    }
}
