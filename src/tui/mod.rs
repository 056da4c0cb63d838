//! Interactive catalog browser.

mod draw;

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::catalog::{Difficulty, PlayMode};
use crate::command::Command;
use crate::debounce::Debouncer;
use crate::prefs::{PrefStore, Preferences};
use crate::sort::ColumnId;
use crate::source::DatasetSource;
use crate::stats::{self, CatalogStats};
use crate::store::{self, CatalogAction, FilterAction, RowView, SortAction, Stores};
use crate::window::{ScrollState, Window};

const TICK: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search(String),
    Command(String),
}

/// Browser session state, independent of the terminal.
pub struct App {
    pub stores: Stores,
    pub view: RowView,
    pub scroll: ScrollState,
    pub search: Debouncer<String>,
    pub input: InputMode,
    /// Index into the visible columns.
    pub column_cursor: usize,
    pub show_stats: bool,
    pub status: Option<String>,
    pub overscan: usize,
    pub viewport_height: usize,
    refresh_requested: bool,
    saved: Preferences,
    /// Statistics of the current rows, filled on first use after a sync.
    stats: Option<Option<CatalogStats>>,
    query_stamp: Option<(u64, u64, PlayMode)>,
    quit: bool,
}

impl App {
    pub fn new(stores: Stores, debounce: Duration, overscan: usize) -> Self {
        let saved = Preferences::from_stores(&stores);
        let mut app = Self {
            stores,
            view: RowView::default(),
            scroll: ScrollState::default(),
            search: Debouncer::new(debounce),
            input: InputMode::Normal,
            column_cursor: 0,
            show_stats: false,
            status: Some("Loading…".to_string()),
            overscan,
            viewport_height: 20,
            refresh_requested: true,
            saved,
            stats: None,
            query_stamp: None,
            quit: false,
        };
        app.sync();
        app
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Recompute rows after any store change. A new filter, sort or mode
    /// starts from the top; a refreshed record set keeps the cursor.
    pub fn sync(&mut self) {
        if !self.view.sync(&self.stores) {
            return;
        }
        self.stats = None;
        let stamp = (
            self.stores.filter.revision(),
            self.stores.sort.revision(),
            self.stores.catalog.get().play_mode,
        );
        if self.query_stamp == Some(stamp) {
            self.scroll.set_len(self.view.len(), self.viewport_height);
        } else {
            self.scroll.reset(self.view.len());
            self.query_stamp = Some(stamp);
        }
        let columns = self.stores.columns.get().ordered().len();
        self.column_cursor = self.column_cursor.min(columns.saturating_sub(1));
    }

    pub fn window(&self) -> Window {
        self.scroll.window(self.viewport_height, self.overscan)
    }

    pub fn stats(&mut self) -> Option<&CatalogStats> {
        let view = &self.view;
        self.stats.get_or_insert_with(|| stats::compute(&view.all())).as_ref()
    }

    pub fn focused_column(&self) -> Option<ColumnId> {
        self.stores.columns.get().ordered().get(self.column_cursor).copied()
    }

    /// Commit debounced search text once its quiet period has passed.
    pub fn tick(&mut self, now: Instant) {
        if let Some(text) = self.search.poll(now) {
            self.stores.filter.dispatch(FilterAction::SetSearchText(text));
        }
        self.sync();
    }

    pub fn take_refresh_request(&mut self) -> bool {
        std::mem::take(&mut self.refresh_requested)
    }

    pub fn refresh(&mut self, source: &dyn DatasetSource) {
        match store::refresh(&mut self.stores.catalog, source) {
            Ok(count) => self.status = Some(format!("Loaded {count} charts")),
            // The error itself is kept on the catalog state.
            Err(_) => self.status = None,
        }
        self.sync();
    }

    /// Persist preferences if they changed since the last save.
    pub fn save_preferences(&mut self, prefs: &PrefStore) -> crate::prefs::Result<bool> {
        let current = Preferences::from_stores(&self.stores);
        if current == self.saved {
            return Ok(false);
        }
        prefs.save_all(&current)?;
        self.saved = current;
        Ok(true)
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit = true;
            return;
        }
        match std::mem::replace(&mut self.input, InputMode::Normal) {
            InputMode::Normal => self.handle_normal(key),
            InputMode::Search(text) => self.handle_search(key, text, now),
            InputMode::Command(text) => self.handle_command(key, text),
        }
        self.sync();
    }

    fn handle_normal(&mut self, key: KeyEvent) {
        let page = self.viewport_height.max(1) as isize;
        let height = self.viewport_height;
        match key.code {
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Char('/') => {
                let text = self
                    .search
                    .pending()
                    .cloned()
                    .unwrap_or_else(|| self.stores.filter.get().search_text.clone());
                self.input = InputMode::Search(text);
            }
            KeyCode::Char(':') => self.input = InputMode::Command(String::new()),
            KeyCode::Tab => {
                self.stores.catalog.dispatch(CatalogAction::TogglePlayMode);
            }
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                let d = Difficulty::ALL[idx];
                self.stores.filter.dispatch(FilterAction::ToggleDifficulty(d));
            }
            KeyCode::Char('s') => {
                if let Some(column) = self.focused_column() {
                    self.stores.sort.dispatch(SortAction::ToggleColumn(column));
                }
            }
            KeyCode::Char('x') => {
                self.search.cancel();
                self.stores.filter.dispatch(FilterAction::Reset);
            }
            KeyCode::Char('f') => {
                self.stores.filter.dispatch(FilterAction::ToggleRadarExpanded);
            }
            KeyCode::Char('S') => self.show_stats = !self.show_stats,
            KeyCode::Char('r') => {
                self.refresh_requested = true;
                self.status = Some("Loading…".to_string());
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.column_cursor = self.column_cursor.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                let columns = self.stores.columns.get().ordered().len();
                self.column_cursor = (self.column_cursor + 1).min(columns.saturating_sub(1));
            }
            KeyCode::Down | KeyCode::Char('j') => self.scroll.move_cursor(1, height),
            KeyCode::Up | KeyCode::Char('k') => self.scroll.move_cursor(-1, height),
            KeyCode::PageDown => self.scroll.move_cursor(page, height),
            KeyCode::PageUp => self.scroll.move_cursor(-page, height),
            KeyCode::Home | KeyCode::Char('g') => self.scroll.cursor_to_start(),
            KeyCode::End | KeyCode::Char('G') => self.scroll.cursor_to_end(height),
            _ => {}
        }
    }

    fn handle_search(&mut self, key: KeyEvent, mut text: String, now: Instant) {
        match key.code {
            KeyCode::Enter => {
                self.search.cancel();
                self.stores.filter.dispatch(FilterAction::SetSearchText(text));
            }
            // Leave search; text already applied stays, pending text is dropped.
            KeyCode::Esc => {
                self.search.cancel();
            }
            KeyCode::Backspace => {
                text.pop();
                self.search.push(text.clone(), now);
                self.input = InputMode::Search(text);
            }
            KeyCode::Char(c) => {
                text.push(c);
                self.search.push(text.clone(), now);
                self.input = InputMode::Search(text);
            }
            _ => self.input = InputMode::Search(text),
        }
    }

    fn handle_command(&mut self, key: KeyEvent, mut text: String) {
        match key.code {
            KeyCode::Enter => match text.parse::<Command>() {
                Ok(command) => {
                    self.status = None;
                    command.apply(&mut self.stores);
                }
                Err(e) => self.status = Some(e.to_string()),
            },
            KeyCode::Esc => {}
            KeyCode::Backspace => {
                text.pop();
                self.input = InputMode::Command(text);
            }
            KeyCode::Char(c) => {
                text.push(c);
                self.input = InputMode::Command(text);
            }
            _ => self.input = InputMode::Command(text),
        }
    }
}

/// Run the browser until the user quits. Preferences are saved after every
/// change and once more on exit.
pub fn run(mut app: App, source: &dyn DatasetSource, prefs: &PrefStore) -> Result<()> {
    let mut terminal = setup_terminal()?;

    let loop_result: Result<()> = (|| -> Result<()> {
        loop {
            terminal.draw(|frame| draw::draw(frame, &mut app))?;

            if app.take_refresh_request() {
                app.refresh(source);
                continue;
            }

            let now = Instant::now();
            let timeout = app.search.remaining(now).map_or(TICK, |left| left.min(TICK));
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    app.handle_key(key, Instant::now());
                }
            }
            app.tick(Instant::now());

            if let Err(e) = app.save_preferences(prefs) {
                log::warn!("Failed to save preferences: {e}");
            }
            if app.should_quit() {
                break Ok(());
            }
        }
    })();

    let restore_result = restore_terminal(terminal);

    match (loop_result, restore_result) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(loop_err), Ok(())) => Err(loop_err),
        (Ok(()), Err(restore_err)) => Err(restore_err),
        (Err(loop_err), Err(restore_err)) => Err(loop_err.context(restore_err.to_string())),
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;
    Ok(terminal)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ChartData, RadarData};
    use crate::catalog::raw::RawDatasets;
    use crate::source::FetchError;
    use chrono::Utc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn chart(id: &str, title: &str, mode: PlayMode, d: Difficulty, level: u32) -> ChartData {
        ChartData::new(id, title, mode, d, level, 500, "150", RadarData::default())
    }

    fn loaded_app(n: usize) -> App {
        let mut stores = Stores::default();
        let charts = (0..n)
            .map(|i| chart(&i.to_string(), &format!("Song {i:03}"), PlayMode::Single, Difficulty::Another, 10))
            .chain([chart("dp", "Double Song", PlayMode::Double, Difficulty::Hyper, 8)])
            .collect();
        stores
            .catalog
            .dispatch(CatalogAction::RefreshSucceeded { charts, at: Utc::now() });
        let mut app = App::new(stores, Duration::from_millis(300), 2);
        app.viewport_height = 10;
        app
    }

    struct FailingSource;

    impl DatasetSource for FailingSource {
        fn describe(&self) -> String {
            "nowhere".into()
        }

        fn fetch_all(&self) -> Result<RawDatasets, FetchError> {
            Err(FetchError::Json {
                name: "title.json".into(),
                source: serde_json::from_str::<u8>("x").unwrap_err(),
            })
        }
    }

    #[test]
    fn test_initial_rows_and_refresh_request() {
        let mut app = loaded_app(30);
        assert_eq!(app.view.len(), 30);
        assert!(app.take_refresh_request());
        assert!(!app.take_refresh_request());
    }

    #[test]
    fn test_cursor_movement_and_window() {
        let mut app = loaded_app(100);
        let now = Instant::now();
        app.handle_key(key(KeyCode::PageDown), now);
        app.handle_key(key(KeyCode::PageDown), now);
        assert_eq!(app.scroll.cursor, 20);
        let w = app.window();
        assert!(w.start <= app.scroll.offset);
        assert!(w.len() <= app.viewport_height + 1 + 2 * app.overscan);

        app.handle_key(key(KeyCode::End), now);
        assert_eq!(app.scroll.cursor, 99);
        app.handle_key(key(KeyCode::Home), now);
        assert_eq!((app.scroll.cursor, app.scroll.offset), (0, 0));
    }

    #[test]
    fn test_search_is_debounced() {
        let mut app = loaded_app(20);
        let t0 = Instant::now();
        app.handle_key(key(KeyCode::Char('/')), t0);
        for c in "song 01".chars() {
            app.handle_key(key(KeyCode::Char(c)), t0);
        }
        assert_eq!(app.view.len(), 20);

        app.tick(t0 + Duration::from_millis(100));
        assert_eq!(app.stores.filter.get().search_text, "");

        app.tick(t0 + Duration::from_millis(300));
        assert_eq!(app.stores.filter.get().search_text, "song 01");
        assert_eq!(app.view.len(), 10);
        assert_eq!(app.input, InputMode::Search("song 01".into()));
    }

    #[test]
    fn test_search_enter_commits_immediately() {
        let mut app = loaded_app(20);
        let now = Instant::now();
        app.handle_key(key(KeyCode::Char('/')), now);
        app.handle_key(key(KeyCode::Char('7')), now);
        app.handle_key(key(KeyCode::Enter), now);
        assert_eq!(app.input, InputMode::Normal);
        assert_eq!(app.view.len(), 2);
        assert!(app.search.pending().is_none());
    }

    #[test]
    fn test_search_escape_drops_pending_text() {
        let mut app = loaded_app(20);
        let t0 = Instant::now();
        app.handle_key(key(KeyCode::Char('/')), t0);
        app.handle_key(key(KeyCode::Char('x')), t0);
        app.handle_key(key(KeyCode::Esc), t0);
        app.tick(t0 + Duration::from_millis(400));
        assert_eq!(app.input, InputMode::Normal);
        assert_eq!(app.stores.filter.get().search_text, "");
        assert_eq!(app.view.len(), 20);
    }

    #[test]
    fn test_stats_follow_current_rows() {
        let mut app = loaded_app(20);
        assert_eq!(app.stats().map(|s| s.count), Some(20));
        assert!(app.stats.is_some());

        app.handle_key(key(KeyCode::Char('/')), Instant::now());
        app.handle_key(key(KeyCode::Char('7')), Instant::now());
        app.handle_key(key(KeyCode::Enter), Instant::now());
        assert!(app.stats.is_none());
        assert_eq!(app.stats().map(|s| s.count), Some(2));

        app.handle_key(key(KeyCode::Char('/')), Instant::now());
        app.handle_key(key(KeyCode::Char('z')), Instant::now());
        app.handle_key(key(KeyCode::Enter), Instant::now());
        assert!(app.stats().is_none());
    }

    #[test]
    fn test_filter_change_resets_scroll() {
        let mut app = loaded_app(50);
        let now = Instant::now();
        app.handle_key(key(KeyCode::End), now);
        assert!(app.scroll.offset > 0);
        app.handle_key(key(KeyCode::Char('4')), now);
        assert!(app.view.is_empty());
        assert_eq!((app.scroll.cursor, app.scroll.offset), (0, 0));
        app.handle_key(key(KeyCode::Char('4')), now);
        assert_eq!(app.view.len(), 50);
    }

    #[test]
    fn test_tab_switches_mode() {
        let mut app = loaded_app(5);
        app.handle_key(key(KeyCode::Tab), Instant::now());
        assert_eq!(app.stores.catalog.get().play_mode, PlayMode::Double);
        assert_eq!(app.view.len(), 1);
        assert_eq!(app.view.get(0).map(|c| c.song_id.as_str()), Some("dp"));
    }

    #[test]
    fn test_sort_focused_column() {
        let mut app = loaded_app(5);
        let now = Instant::now();
        app.handle_key(key(KeyCode::Right), now);
        assert_eq!(app.focused_column(), Some(ColumnId::Difficulty));
        app.handle_key(key(KeyCode::Left), now);
        app.handle_key(key(KeyCode::Char('s')), now);
        assert_eq!(app.stores.sort.get().direction_of(ColumnId::Title), Some(true));
        assert_eq!(app.view.get(0).map(|c| c.title.as_str()), Some("Song 004"));
    }

    #[test]
    fn test_command_mode() {
        let mut app = loaded_app(5);
        let now = Instant::now();
        app.handle_key(key(KeyCode::Char(':')), now);
        for c in "level 11-12".chars() {
            app.handle_key(key(KeyCode::Char(c)), now);
        }
        app.handle_key(key(KeyCode::Enter), now);
        assert_eq!(app.view.len(), 0);

        app.handle_key(key(KeyCode::Char(':')), now);
        for c in "bogus".chars() {
            app.handle_key(key(KeyCode::Char(c)), now);
        }
        app.handle_key(key(KeyCode::Enter), now);
        assert_eq!(app.status.as_deref(), Some("Unknown command 'bogus'"));
    }

    #[test]
    fn test_failed_refresh_keeps_rows() {
        let mut app = loaded_app(12);
        app.refresh(&FailingSource);
        assert_eq!(app.view.len(), 12);
        assert!(app.stores.catalog.get().error.is_some());
        assert!(!app.stores.catalog.get().loading);
    }

    #[test]
    fn test_save_preferences_only_on_change() {
        let prefs = PrefStore::open_in_memory().unwrap();
        let mut app = loaded_app(3);
        assert!(!app.save_preferences(&prefs).unwrap());
        app.handle_key(key(KeyCode::Tab), Instant::now());
        assert!(app.save_preferences(&prefs).unwrap());
        assert!(!app.save_preferences(&prefs).unwrap());
        assert_eq!(prefs.load_all().unwrap().play_mode, PlayMode::Double);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = loaded_app(1);
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), Instant::now());
        assert!(app.should_quit());
    }
}
