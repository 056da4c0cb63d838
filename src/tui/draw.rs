use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, Table,
        TableState,
    },
};

use super::{App, InputMode};
use crate::catalog::{Difficulty, RadarType};
use crate::filter::FilterSpec;
use crate::sort::ColumnId;
use crate::stats;

const STATS_HEIGHT: u16 = 10;
const FILTER_HEIGHT: u16 = 5;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let filter_open = app.stores.filter.get().radar_filter_expanded;
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(if filter_open { FILTER_HEIGHT } else { 0 }),
            Constraint::Min(4),
            Constraint::Length(if app.show_stats { STATS_HEIGHT } else { 0 }),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_header(frame, layout[0], app);
    if filter_open {
        draw_filters(frame, layout[1], app.stores.filter.get());
    }
    draw_table(frame, layout[2], app);
    if app.show_stats {
        draw_stats(frame, layout[3], app);
    }
    draw_footer(frame, layout[4], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let catalog = app.stores.catalog.get();
    let sort = match app.stores.sort.get().primary() {
        Some(key) => format!("{} {}", key.id.label(), if key.desc { "▼" } else { "▲" }),
        None => "unsorted".to_string(),
    };
    let loaded = catalog
        .loaded_at
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "not loaded".to_string());

    let line = Line::from(vec![
        Span::styled(" radarview ", Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::raw(" "),
        Span::styled(catalog.play_mode.code(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            "  {} / {} charts  sort: {sort}  {loaded}",
            app.view.len(),
            catalog.charts.len(),
        )),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_filters(frame: &mut Frame, area: Rect, filter: &FilterSpec) {
    let difficulties: Vec<Span> = Difficulty::ALL
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let style = if filter.difficulties.contains(d) {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Span::styled(format!("{}:{} ", i + 1, d.name()), style)
        })
        .collect();

    let bound = |lo: &str, hi: &str| {
        if lo.is_empty() && hi.is_empty() {
            "any".to_string()
        } else {
            format!("{lo}-{hi}")
        }
    };
    let radar: Vec<String> = RadarType::ALL
        .iter()
        .map(|&kind| {
            let r = filter.radar_filters.get(kind);
            format!("{} {}-{}", kind.label(), r.min, r.max)
        })
        .collect();

    let lines = vec![
        Line::from(difficulties),
        Line::from(format!(
            "Lv {}-{}  BPM {}  Notes {}  Search \"{}\"",
            filter.level_min,
            filter.level_max,
            bound(&filter.bpm_min, &filter.bpm_max),
            bound(&filter.notes_min, &filter.notes_max),
            filter.search_text,
        )),
        Line::from(radar.join("  ")),
    ];
    let block = Block::default().borders(Borders::ALL).title("Filters");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn column_width(column: ColumnId) -> Constraint {
    match column {
        ColumnId::Title => Constraint::Min(20),
        ColumnId::Difficulty => Constraint::Length(4),
        ColumnId::Level => Constraint::Length(3),
        ColumnId::Bpm => Constraint::Length(9),
        ColumnId::NoteCount => Constraint::Length(6),
        _ => Constraint::Length(7),
    }
}

fn draw_table(frame: &mut Frame, area: Rect, app: &mut App) {
    // Borders plus the header row.
    app.viewport_height = usize::from(area.height.saturating_sub(3)).max(1);

    let catalog = app.stores.catalog.snapshot();
    let block = Block::default().borders(Borders::ALL).title(format!(
        "Charts ({})",
        catalog.play_mode
    ));

    if app.view.is_empty() {
        let message = if catalog.loading {
            "Loading…".to_string()
        } else if let (Some(err), true) = (&catalog.error, catalog.charts.is_empty()) {
            format!("Could not load the catalog: {err}\nPress r to retry.")
        } else if catalog.charts.is_empty() {
            "No charts loaded.".to_string()
        } else {
            "No charts match the current filters.".to_string()
        };
        frame.render_widget(Paragraph::new(message).block(block), area);
        return;
    }

    let columns = app.stores.columns.get().ordered();
    let sort = app.stores.sort.get();
    let header = Row::new(columns.iter().enumerate().map(|(i, &column)| {
        let arrow = match sort.direction_of(column) {
            Some(false) => " ▲",
            Some(true) => " ▼",
            None => "",
        };
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if i == app.column_cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        Cell::from(format!("{}{arrow}", column.label())).style(style)
    }));

    let window = app.window();
    let rows: Vec<Row> = app
        .view
        .slice(window.range())
        .map(|(_, chart)| Row::new(columns.iter().map(|c| Cell::from(c.cell_text(chart)))))
        .collect();

    let mut state = TableState::default()
        .with_offset(app.scroll.offset.saturating_sub(window.start))
        .with_selected(Some(app.scroll.cursor.saturating_sub(window.start)));
    let table = Table::new(rows, columns.iter().map(|&c| column_width(c)))
        .header(header)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(table, area, &mut state);

    let mut scrollbar = ScrollbarState::new(app.view.len())
        .position(app.scroll.offset)
        .viewport_content_length(app.viewport_height);
    frame.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight),
        area.inner(Margin { vertical: 1, horizontal: 0 }),
        &mut scrollbar,
    );
}

fn draw_stats(frame: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default().borders(Borders::ALL);
    let Some(summary) = app.stats() else {
        frame.render_widget(Paragraph::new("No rows.").block(block.title("Statistics")), area);
        return;
    };

    let row = |label: &str, s: &stats::Summary| {
        Row::new(vec![
            Cell::from(label.to_string()),
            Cell::from(format!("{:.2}", s.mean)),
            Cell::from(format!("{:.2}", s.median)),
            Cell::from(format!("{:.2}", s.min)),
            Cell::from(format!("{:.2}", s.max)),
        ])
    };
    let mut rows = vec![row("Notes#", &summary.note_count)];
    rows.extend(summary.radar.iter().map(|(kind, s)| row(kind.label(), s)));

    let header = Row::new(["", "Mean", "Median", "Min", "Max"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let widths = [
        Constraint::Length(8),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(9),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(block.title(format!("Statistics ({} charts)", summary.count)));
    frame.render_widget(table, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    let catalog = app.stores.catalog.get();
    let line = match &app.input {
        InputMode::Search(text) => Line::from(format!("/{text}")),
        InputMode::Command(text) => Line::from(format!(":{text}")),
        InputMode::Normal => match (&catalog.error, &app.status) {
            (Some(err), _) if !catalog.loading => Line::from(Span::styled(
                format!("Error: {err} (r to retry)"),
                Style::default().fg(Color::Red),
            )),
            (_, Some(status)) => Line::from(status.as_str()),
            _ => Line::from(Span::styled(
                "q quit  / search  : command  Tab SP/DP  1-5 difficulty  ←→ column  s sort  f filters  S stats  x clear  r reload",
                Style::default().fg(Color::DarkGray),
            )),
        },
    };
    frame.render_widget(Paragraph::new(line), area);
}
