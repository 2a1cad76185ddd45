use crate::autosave::AutosaveClock;
use crate::editor::{is_line_break, Editor};
use crate::highlight::{Highlighter, KEYWORD_COLOR};
use crate::palette::{parse_color, UiPalette, PRESET_COLORS};
use crate::project::{self, Project};
use crate::settings::{Settings, SettingsStore};
use anyhow::Result;
use crossterm::event::{
    self, DisableBracketedPaste, DisableFocusChange, EnableBracketedPaste, EnableFocusChange,
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Clear, List, ListItem, ListState, Paragraph};
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthChar;

const SETTINGS_ITEMS: &[&str] = &["Choose Color", "Choose Folder", "Save Settings"];
const CUSTOM_COLOR_ITEM: &str = "Custom...";

pub struct AppOptions {
    pub settings: SettingsStore,
    pub file: Option<PathBuf>,
    pub autosave_interval: Duration,
}

pub fn run_app(options: AppOptions) -> Result<()> {
    let mut app = App::new(options.settings, options.autosave_interval, Instant::now())?;
    if let Some(file) = options.file {
        app.open_project(&file);
    }

    let mut terminal = setup_terminal()?;
    let _guard = TerminalGuard;

    let tick_rate = Duration::from_millis(50);

    loop {
        let size = terminal.size()?;
        let layout = app.layout(size);
        app.ensure_cursor_visible(layout.editor_height);

        terminal.draw(|f| ui(f, &mut app, &layout))?;

        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key, layout.editor_height) {
                        break;
                    }
                }
                Event::Paste(text) => app.paste(&text),
                Event::FocusLost => app.rehighlight(),
                _ => {}
            }
        }

        app.tick(Instant::now());
    }

    tracing::info!("editor closed");
    Ok(())
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = stdout.execute(DisableBracketedPaste);
        let _ = stdout.execute(DisableFocusChange);
        let _ = stdout.execute(LeaveAlternateScreen);
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    OpenFile,
    NewProject,
    OutputFolder,
    CustomColor,
}

impl Prompt {
    fn label(self) -> &'static str {
        match self {
            Prompt::OpenFile => "Open .bat file: ",
            Prompt::NewProject => "New project path: ",
            Prompt::OutputFolder => "Output folder: ",
            Prompt::CustomColor => "Background color (#rrggbb): ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Edit,
    Prompt(Prompt),
    Settings,
    ColorPicker,
    Notice,
}

struct LayoutInfo {
    main: Rect,
    editor: Rect,
    status: Rect,
    hints: Rect,
    editor_width: u16,
    editor_height: u16,
}

pub struct App {
    store: SettingsStore,
    settings: Settings,
    ui: UiPalette,
    base_style: Style,
    editor: Editor,
    highlighter: Highlighter,
    project: Project,
    clock: AutosaveClock,
    countdown: String,
    mode: Mode,
    input: String,
    settings_selected: usize,
    color_selected: usize,
    notice: Option<String>,
    status: Option<String>,
    edit_scroll: usize,
    editor_lines: Vec<Line<'static>>,
    editor_cache_dirty: bool,
}

impl App {
    pub fn new(store: SettingsStore, autosave_interval: Duration, now: Instant) -> Result<Self> {
        let settings = store.load()?;
        project::ensure_output_folder(&store.resolve_output_folder(&settings.output_folder))?;
        let ui = UiPalette::from_background(&settings.background_color);
        let clock = AutosaveClock::new(autosave_interval, now);
        let countdown = clock.countdown_label(now);
        tracing::info!(
            settings = %store.path().display(),
            output = %settings.output_folder.display(),
            interval = clock.interval().as_secs(),
            "editor started"
        );

        Ok(Self {
            store,
            settings,
            ui,
            base_style: base_style(ui),
            editor: Editor::new(),
            highlighter: Highlighter::new(),
            project: Project::default(),
            clock,
            countdown,
            mode: Mode::Edit,
            input: String::new(),
            settings_selected: 0,
            color_selected: 0,
            notice: None,
            status: None,
            edit_scroll: 0,
            editor_lines: Vec::new(),
            editor_cache_dirty: true,
        })
    }

    fn layout(&self, size: Rect) -> LayoutInfo {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(size);
        let editor = vertical[0];

        LayoutInfo {
            main: editor,
            editor,
            status: vertical[1],
            hints: vertical[2],
            editor_width: editor.width.saturating_sub(2).max(1),
            editor_height: editor.height.saturating_sub(2).max(1),
        }
    }

    /// Advances the autosave clock; saves when it comes due.
    pub fn tick(&mut self, now: Instant) {
        if self.clock.poll(now) {
            self.save_project(true);
        }
        self.countdown = self.clock.countdown_label(now);
    }

    pub fn rehighlight(&mut self) {
        let text = self.editor.text();
        self.highlighter.rescan(&text);
        self.editor_cache_dirty = true;
    }

    fn handle_key(&mut self, key: KeyEvent, content_height: u16) -> bool {
        match self.mode {
            Mode::Edit => self.handle_edit_input(key, content_height),
            Mode::Prompt(prompt) => {
                self.handle_prompt_input(prompt, key);
                false
            }
            Mode::Settings => {
                self.handle_settings_input(key);
                false
            }
            Mode::ColorPicker => {
                self.handle_color_picker(key);
                false
            }
            Mode::Notice => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                    self.notice = None;
                    self.mode = Mode::Edit;
                }
                false
            }
        }
    }

    fn handle_edit_input(&mut self, key: KeyEvent, content_height: u16) -> bool {
        // AltGr arrives as CONTROL | ALT on Windows and types characters like `\` and `@`.
        if key.modifiers.contains(KeyModifiers::CONTROL) && !key.modifiers.contains(KeyModifiers::ALT) {
            match key.code {
                KeyCode::Char('q') => return true,
                KeyCode::Char('s') => self.save_project(false),
                KeyCode::Char('n') => self.start_prompt(Prompt::NewProject),
                KeyCode::Char('o') => self.start_prompt(Prompt::OpenFile),
                KeyCode::Char('t') => {
                    self.settings_selected = 0;
                    self.mode = Mode::Settings;
                }
                KeyCode::Char('z') => {
                    self.editor.undo();
                }
                KeyCode::Char('y') => {
                    self.editor.redo();
                }
                _ => {}
            }
            self.rehighlight();
            return false;
        }

        match key.code {
            KeyCode::Left => self.editor.move_cursor_left(),
            KeyCode::Right => self.editor.move_cursor_right(),
            KeyCode::Up => self.editor.move_cursor_up(),
            KeyCode::Down => self.editor.move_cursor_down(),
            KeyCode::PageUp => self.editor.move_cursor_lines(-(content_height as isize)),
            KeyCode::PageDown => self.editor.move_cursor_lines(content_height as isize),
            KeyCode::Home => self.editor.move_cursor_line_start(),
            KeyCode::End => self.editor.move_cursor_line_end(),
            KeyCode::Backspace => self.editor.backspace(),
            KeyCode::Delete => self.editor.delete(),
            KeyCode::Enter => self.editor.insert_char('\n'),
            KeyCode::Tab => self.editor.insert_char('\t'),
            KeyCode::Char(c) => self.editor.insert_char(c),
            _ => {}
        }
        self.rehighlight();
        false
    }

    fn paste(&mut self, text: &str) {
        match self.mode {
            Mode::Edit => {
                self.editor.insert_str(text);
                self.rehighlight();
            }
            Mode::Prompt(_) => self.input.push_str(text.trim_end_matches(['\n', '\r'])),
            _ => {}
        }
    }

    fn start_prompt(&mut self, prompt: Prompt) {
        self.input.clear();
        self.mode = Mode::Prompt(prompt);
    }

    fn handle_prompt_input(&mut self, prompt: Prompt, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.input.clear();
                self.finish_prompt(prompt, None);
            }
            KeyCode::Enter => {
                let value = std::mem::take(&mut self.input);
                let value = value.trim();
                let value = (!value.is_empty()).then_some(value);
                self.finish_prompt(prompt, value);
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.input.push(c);
            }
            _ => {}
        }
    }

    fn finish_prompt(&mut self, prompt: Prompt, value: Option<&str>) {
        match prompt {
            Prompt::OpenFile => {
                self.mode = Mode::Edit;
                if let Some(path) = value {
                    self.open_project(Path::new(path));
                }
            }
            Prompt::NewProject => {
                self.mode = Mode::Edit;
                self.new_project(value.unwrap_or_default());
            }
            Prompt::OutputFolder => {
                self.mode = Mode::Settings;
                if let Some(folder) = value {
                    self.set_output_folder(PathBuf::from(folder));
                }
            }
            Prompt::CustomColor => {
                self.mode = Mode::Settings;
                if let Some(color) = value {
                    self.set_background_color(color);
                }
            }
        }
    }

    fn handle_settings_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Edit,
            KeyCode::Up => self.settings_selected = self.settings_selected.saturating_sub(1),
            KeyCode::Down => {
                self.settings_selected = (self.settings_selected + 1).min(SETTINGS_ITEMS.len() - 1)
            }
            KeyCode::Enter => match self.settings_selected {
                0 => {
                    self.color_selected = PRESET_COLORS
                        .iter()
                        .position(|c| *c == self.settings.background_color)
                        .unwrap_or(0);
                    self.mode = Mode::ColorPicker;
                }
                1 => self.start_prompt(Prompt::OutputFolder),
                _ => {
                    self.persist_settings();
                    self.mode = Mode::Edit;
                }
            },
            _ => {}
        }
    }

    fn handle_color_picker(&mut self, key: KeyEvent) {
        // Presets followed by the custom entry.
        let total = PRESET_COLORS.len() + 1;
        match key.code {
            KeyCode::Esc => self.mode = Mode::Settings,
            KeyCode::Up => self.color_selected = self.color_selected.saturating_sub(1),
            KeyCode::Down => self.color_selected = (self.color_selected + 1).min(total - 1),
            KeyCode::Enter => match PRESET_COLORS.get(self.color_selected) {
                Some(color) => {
                    self.set_background_color(color);
                    self.mode = Mode::Settings;
                }
                None => self.start_prompt(Prompt::CustomColor),
            },
            _ => {}
        }
    }

    /// Loads a batch file into the buffer and binds the project to it.
    pub fn open_project(&mut self, path: &Path) {
        match project::read_project_file(path) {
            Ok(content) => {
                self.editor.set_text(&content);
                self.project.bind(path.to_path_buf());
                self.edit_scroll = 0;
                self.rehighlight();
                self.status = Some("Loaded".to_string());
                tracing::info!(path = %path.display(), "project opened");
            }
            Err(err) => {
                tracing::error!(path = %path.display(), "open failed: {err:#}");
                self.status = Some(format!("Open failed: {err:#}"));
            }
        }
    }

    /// Empty input is a cancelled picker and leaves no project bound.
    pub fn new_project(&mut self, input: &str) {
        match project::new_project_target(input) {
            Some(path) => {
                self.editor.set_text("");
                self.edit_scroll = 0;
                tracing::info!(path = %path.display(), "new project");
                self.project.bind(path);
                self.rehighlight();
            }
            None => self.project.unbind(),
        }
    }

    /// Writes the artifact for the bound project. Without a project this does nothing.
    pub fn save_project(&mut self, auto: bool) {
        let Some(path) = self.project.path().map(Path::to_path_buf) else {
            return;
        };
        let text = self.editor.text();
        let output = self.store.resolve_output_folder(&self.settings.output_folder);
        match project::save_artifact(&output, &path, &text) {
            Ok(target) => {
                self.editor.mark_saved();
                tracing::info!(target = %target.display(), auto, "project saved");
                if auto {
                    self.status = Some("Autosaved".to_string());
                } else {
                    self.notice = Some(format!("Project saved as {}", target.display()));
                    self.mode = Mode::Notice;
                }
            }
            Err(err) => {
                tracing::error!(project = %path.display(), auto, "save failed: {err:#}");
                self.status = Some(format!("Save failed: {err:#}"));
            }
        }
    }

    fn set_background_color(&mut self, color: &str) {
        if parse_color(color).is_none() {
            self.status = Some(format!("Unknown color: {color}"));
            return;
        }
        self.settings.background_color = color.to_string();
        self.ui = UiPalette::from_background(color);
        self.base_style = base_style(self.ui);
        self.editor_cache_dirty = true;
        self.persist_settings();
    }

    fn set_output_folder(&mut self, folder: PathBuf) {
        if let Err(err) = project::ensure_output_folder(&self.store.resolve_output_folder(&folder)) {
            tracing::error!("output folder rejected: {err:#}");
            self.status = Some(format!("{err:#}"));
            return;
        }
        self.settings.output_folder = folder;
        self.persist_settings();
    }

    fn persist_settings(&mut self) {
        match self.store.save(&self.settings) {
            Ok(()) => self.status = Some("Settings saved".to_string()),
            Err(err) => {
                tracing::error!("settings write failed: {err:#}");
                self.status = Some(format!("Settings not saved: {err:#}"));
            }
        }
    }

    fn ensure_cursor_visible(&mut self, height: u16) {
        let (line, _) = self.editor.cursor_line_col();
        let height = height.max(1) as usize;
        if line < self.edit_scroll {
            self.edit_scroll = line;
        } else if line >= self.edit_scroll + height {
            self.edit_scroll = line + 1 - height;
        }
    }
}

fn base_style(ui: UiPalette) -> Style {
    Style::default().fg(ui.base_fg).bg(ui.base_bg)
}

fn ui(f: &mut ratatui::Frame, app: &mut App, layout: &LayoutInfo) {
    let highlight_style = Style::default().bg(app.ui.accent).fg(app.ui.base_bg);
    let muted = Style::default().fg(app.ui.muted);

    let title = if app.editor.is_dirty() && app.project.path().is_some() {
        format!(" *{} ", app.project.filename_label())
    } else {
        format!(" {} ", app.project.filename_label())
    };
    let editor_text = app.editor_text();
    let editor_paragraph = Paragraph::new(editor_text)
        .block(
            Block::bordered()
                .title(title)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(app.ui.border))
                .style(app.base_style),
        )
        .style(app.base_style)
        .scroll(app.editor_scroll_offset());
    f.render_widget(editor_paragraph, layout.editor);

    f.render_widget(Paragraph::new(app.status_line()), layout.status);
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "^S Save Project  ^N New Project  ^O Load Project  ^T Settings  ^Z Undo  ^Y Redo  ^Q Quit",
            muted,
        ))),
        layout.hints,
    );

    match app.mode {
        Mode::Settings => render_settings(f, app, layout.main, highlight_style),
        Mode::ColorPicker => {
            let popup = centered_rect(40, 60, layout.main);
            f.render_widget(Clear, popup);
            let items: Vec<ListItem> = PRESET_COLORS
                .iter()
                .copied()
                .chain(std::iter::once(CUSTOM_COLOR_ITEM))
                .map(|name| {
                    let swatch = parse_color(name).unwrap_or(app.ui.base_bg);
                    ListItem::new(Line::from(vec![
                        Span::styled("  ", Style::default().bg(swatch)),
                        Span::raw(format!(" {name}")),
                    ]))
                })
                .collect();
            let mut state = ListState::default();
            state.select(Some(app.color_selected));
            let list = List::new(items)
                .block(popup_block(" Background Color ", app))
                .style(app.base_style)
                .highlight_style(highlight_style);
            f.render_stateful_widget(list, popup, &mut state);
        }
        Mode::Notice => {
            if let Some(notice) = &app.notice {
                let popup = centered_rect(60, 20, layout.main);
                f.render_widget(Clear, popup);
                let body = Text::from(vec![
                    Line::from(notice.clone()),
                    Line::from(""),
                    Line::from(Span::styled("Enter to dismiss", muted)),
                ]);
                f.render_widget(
                    Paragraph::new(body)
                        .block(popup_block(" Save ", app))
                        .style(app.base_style),
                    popup,
                );
            }
        }
        Mode::Prompt(Prompt::OutputFolder | Prompt::CustomColor) => {
            render_settings(f, app, layout.main, highlight_style)
        }
        Mode::Edit | Mode::Prompt(_) => {}
    }

    if let Some((x, y)) = app.cursor_screen_position(layout) {
        f.set_cursor(x, y);
    }
}

fn render_settings(f: &mut ratatui::Frame, app: &App, area: Rect, highlight_style: Style) {
    let popup = centered_rect(50, 50, area);
    f.render_widget(Clear, popup);
    let block = popup_block(" Settings ", app);
    let inner = block.inner(popup);
    f.render_widget(block, popup);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(inner);

    let info = Text::from(vec![
        Line::from(format!("Background Color: {}", app.settings.background_color)),
        Line::from("Current Folder:"),
        Line::from(app.settings.output_folder.display().to_string()),
    ]);
    f.render_widget(Paragraph::new(info).style(app.base_style), parts[0]);

    let items: Vec<ListItem> = SETTINGS_ITEMS.iter().map(|s| ListItem::new(*s)).collect();
    let mut state = ListState::default();
    state.select(Some(app.settings_selected));
    let list = List::new(items)
        .style(app.base_style)
        .highlight_style(highlight_style);
    f.render_stateful_widget(list, parts[1], &mut state);
}

fn popup_block<'a>(title: &'a str, app: &App) -> Block<'a> {
    Block::bordered()
        .title(title)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(app.ui.border))
        .style(app.base_style)
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

impl App {
    fn status_line(&self) -> Line<'static> {
        if let Mode::Prompt(prompt) = self.mode {
            return Line::from(vec![
                Span::styled(prompt.label(), Style::default().fg(self.ui.accent)),
                Span::raw(self.input.clone()),
            ]);
        }

        let separator = || Span::styled(" | ", Style::default().fg(self.ui.muted));
        let mut parts = vec![
            Span::styled(
                "batchpad",
                Style::default().fg(self.ui.accent).add_modifier(Modifier::BOLD),
            ),
            separator(),
            Span::raw(self.project.filename_label()),
            separator(),
            Span::raw(self.countdown.clone()),
        ];
        if let Some(msg) = &self.status {
            parts.push(separator());
            parts.push(Span::styled(msg.clone(), Style::default().fg(self.ui.accent)));
        }
        Line::from(parts)
    }

    fn ensure_editor_cache(&mut self) {
        if !self.editor_cache_dirty && !self.editor_lines.is_empty() {
            return;
        }
        self.editor_lines = self.build_editor_cache();
        self.editor_cache_dirty = false;
    }

    fn build_editor_cache(&self) -> Vec<Line<'static>> {
        let keyword_style = self.base_style.fg(KEYWORD_COLOR);
        let mut lines = Vec::new();
        let mut line_start = 0usize;
        for line in self.editor.rope().lines() {
            let raw = line.to_string();
            let visible = raw.trim_end_matches(is_line_break);
            let mut spans = Vec::new();
            let mut pos = 0;
            for range in self
                .highlighter
                .line_ranges(line_start, line_start + visible.len())
            {
                if range.start > pos {
                    spans.push(Span::styled(visible[pos..range.start].to_string(), self.base_style));
                }
                spans.push(Span::styled(visible[range.clone()].to_string(), keyword_style));
                pos = range.end;
            }
            if pos < visible.len() {
                spans.push(Span::styled(visible[pos..].to_string(), self.base_style));
            }
            lines.push(Line::from(spans));
            line_start += raw.len();
        }
        if lines.is_empty() {
            lines.push(Line::from(Span::styled("", self.base_style)));
        }
        lines
    }

    fn editor_scroll_offset(&self) -> (u16, u16) {
        (u16::try_from(self.edit_scroll).unwrap_or(u16::MAX), 0)
    }

    fn editor_text(&mut self) -> Text<'static> {
        self.ensure_editor_cache();
        Text::from(self.editor_lines.clone())
    }

    fn cursor_screen_position(&self, layout: &LayoutInfo) -> Option<(u16, u16)> {
        if self.mode != Mode::Edit {
            return None;
        }
        let (line, col) = self.editor.cursor_line_col();
        if line < self.edit_scroll {
            return None;
        }
        let visible_line = line - self.edit_scroll;
        if visible_line >= layout.editor_height as usize {
            return None;
        }

        let mut width = 0usize;
        for ch in self.editor.rope().line(line).chars().take(col) {
            width += UnicodeWidthChar::width(ch).unwrap_or(0);
        }
        let x = layout
            .editor
            .x
            .saturating_add(1)
            .saturating_add(width.min(layout.editor_width as usize).try_into().ok()?);
        let y = layout
            .editor
            .y
            .saturating_add(1)
            .saturating_add(visible_line.try_into().ok()?);
        Some((x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            let code = if c == '\n' { KeyCode::Enter } else { KeyCode::Char(c) };
            app.handle_key(key(code), 20);
        }
    }

    fn test_app(dir: &TempDir) -> (App, PathBuf, Instant) {
        let output = dir.path().join("output");
        let store = SettingsStore::new(dir.path().join("config.json"));
        store
            .save(&Settings {
                background_color: "white".to_string(),
                output_folder: output.clone(),
            })
            .unwrap();
        let now = Instant::now();
        let app = App::new(store, Duration::from_secs(30), now).unwrap();
        (app, output, now)
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn typing_rehighlights_every_keystroke() {
        let dir = TempDir::new().unwrap();
        let (mut app, _, _) = test_app(&dir);

        type_text(&mut app, "ech");
        assert_eq!(app.highlighter.count_for("echo"), 0);
        type_text(&mut app, "o");
        assert_eq!(app.highlighter.count_for("echo"), 1);
    }

    #[test]
    fn manual_save_twice_keeps_one_artifact_and_confirms() {
        let dir = TempDir::new().unwrap();
        let (mut app, output, _) = test_app(&dir);

        app.new_project(dir.path().join("deploy.bat").to_str().unwrap());
        type_text(&mut app, "@echo off\necho hi");

        app.handle_key(ctrl('s'), 20);
        assert_eq!(app.mode, Mode::Notice);
        let expected = format!("Project saved as {}", output.join("deploy.bat").display());
        assert_eq!(app.notice.as_deref(), Some(expected.as_str()));
        app.handle_key(key(KeyCode::Enter), 20);
        assert_eq!(app.mode, Mode::Edit);

        app.handle_key(ctrl('s'), 20);
        assert_eq!(files_in(&output), vec!["deploy.bat"]);
        assert_eq!(
            fs::read_to_string(output.join("deploy.bat")).unwrap(),
            "@echo off\necho hi"
        );
    }

    #[test]
    fn save_without_project_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let (mut app, output, _) = test_app(&dir);

        type_text(&mut app, "cls");
        app.handle_key(ctrl('s'), 20);

        assert_eq!(app.mode, Mode::Edit);
        assert!(files_in(&output).is_empty());
    }

    #[test]
    fn autosave_fires_from_the_clock_without_notice() {
        let dir = TempDir::new().unwrap();
        let (mut app, output, start) = test_app(&dir);
        app.new_project(dir.path().join("job.bat").to_str().unwrap());
        type_text(&mut app, "pause");

        app.tick(start + Duration::from_secs(29));
        assert!(files_in(&output).is_empty());
        assert_eq!(app.countdown, "Next autosave in: 1 seconds");

        app.tick(start + Duration::from_secs(30));
        assert_eq!(files_in(&output), vec!["job.bat"]);
        assert_eq!(app.mode, Mode::Edit);
        assert!(app.notice.is_none());
        assert_eq!(app.countdown, "Next autosave in: 30 seconds");
    }

    #[test]
    fn open_replaces_buffer_and_updates_label() {
        let dir = TempDir::new().unwrap();
        let (mut app, _, _) = test_app(&dir);
        let file = dir.path().join("build.bat");
        fs::write(&file, "setlocal\r\ncall make.bat\r\n").unwrap();
        type_text(&mut app, "scratch");

        app.handle_key(ctrl('o'), 20);
        type_text(&mut app, file.to_str().unwrap());
        app.handle_key(key(KeyCode::Enter), 20);

        assert_eq!(app.editor.text(), "setlocal\r\ncall make.bat\r\n");
        assert_eq!(app.project.filename_label(), "Editing: build.bat");
        assert_eq!(app.highlighter.count_for("call"), 1);
    }

    #[test]
    fn pasted_text_is_inserted_and_highlighted() {
        let dir = TempDir::new().unwrap();
        let (mut app, _, _) = test_app(&dir);

        app.paste("goto end\n:end");

        assert_eq!(app.editor.text(), "goto end\n:end");
        assert_eq!(app.highlighter.count_for("goto"), 1);
    }

    #[test]
    fn opening_a_non_batch_file_keeps_state() {
        let dir = TempDir::new().unwrap();
        let (mut app, _, _) = test_app(&dir);
        let file = dir.path().join("notes.txt");
        fs::write(&file, "hello").unwrap();

        app.open_project(&file);

        assert!(app.project.path().is_none());
        assert_eq!(app.editor.text(), "");
        assert!(app.status.as_deref().unwrap().starts_with("Open failed"));
    }

    #[test]
    fn cancelling_new_project_unbinds_but_keeps_buffer() {
        let dir = TempDir::new().unwrap();
        let (mut app, _, _) = test_app(&dir);
        app.new_project(dir.path().join("a.bat").to_str().unwrap());
        type_text(&mut app, "echo keep");

        app.handle_key(ctrl('n'), 20);
        app.handle_key(key(KeyCode::Esc), 20);

        assert!(app.project.path().is_none());
        assert_eq!(app.editor.text(), "echo keep");
        assert_eq!(app.project.filename_label(), "No project loaded");
    }

    #[test]
    fn new_project_clears_buffer_and_binds_path() {
        let dir = TempDir::new().unwrap();
        let (mut app, _, _) = test_app(&dir);
        type_text(&mut app, "old text");

        app.handle_key(ctrl('n'), 20);
        type_text(&mut app, dir.path().join("fresh").to_str().unwrap());
        app.handle_key(key(KeyCode::Enter), 20);

        assert_eq!(app.editor.text(), "");
        assert_eq!(app.project.filename_label(), "Editing: fresh.bat");
    }

    #[test]
    fn settings_changes_persist_immediately() {
        let dir = TempDir::new().unwrap();
        let (mut app, _, _) = test_app(&dir);
        let new_output = dir.path().join("scripts");

        app.handle_key(ctrl('t'), 20);
        app.handle_key(key(KeyCode::Enter), 20);
        assert_eq!(app.mode, Mode::ColorPicker);
        app.handle_key(key(KeyCode::Down), 20);
        app.handle_key(key(KeyCode::Enter), 20);
        assert_eq!(app.mode, Mode::Settings);

        app.handle_key(key(KeyCode::Down), 20);
        app.handle_key(key(KeyCode::Enter), 20);
        type_text(&mut app, new_output.to_str().unwrap());
        app.handle_key(key(KeyCode::Enter), 20);
        assert_eq!(app.mode, Mode::Settings);

        let reloaded = SettingsStore::new(dir.path().join("config.json")).load().unwrap();
        assert_eq!(reloaded.background_color, PRESET_COLORS[1]);
        assert_eq!(reloaded.output_folder, new_output);
        assert!(new_output.is_dir());
    }

    #[test]
    fn custom_color_must_parse() {
        let dir = TempDir::new().unwrap();
        let (mut app, _, _) = test_app(&dir);

        app.set_background_color("sunset");
        assert_eq!(app.settings.background_color, "white");

        app.set_background_color("#102030");
        assert_eq!(app.settings.background_color, "#102030");
        assert_eq!(app.base_style.bg, Some(ratatui::style::Color::Rgb(0x10, 0x20, 0x30)));
    }

    #[test]
    fn editor_lines_split_keyword_spans() {
        let dir = TempDir::new().unwrap();
        let (mut app, _, _) = test_app(&dir);
        type_text(&mut app, "x cls\ny");

        let lines = app.build_editor_cache();
        assert_eq!(lines.len(), 2);
        let spans = &lines[0].spans;
        assert_eq!(spans[0].content, "x ");
        assert_eq!(spans[1].content, "cls");
        assert_eq!(spans[1].style.fg, Some(KEYWORD_COLOR));
    }

    #[test]
    fn autosave_without_project_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let (mut app, output, start) = test_app(&dir);
        type_text(&mut app, "echo unsaved");

        app.tick(start + Duration::from_secs(30));
        app.tick(start + Duration::from_secs(60));

        assert!(files_in(&output).is_empty());
        assert!(app.status.is_none());
        assert_eq!(app.editor.text(), "echo unsaved");
    }

    #[test]
    fn first_start_writes_and_applies_default_settings() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("config.json"));

        let app = App::new(store, Duration::from_secs(30), Instant::now()).unwrap();

        assert!(dir.path().join("config.json").is_file());
        assert!(dir.path().join("output").is_dir());
        assert_eq!(app.settings, Settings::default());
        assert_eq!(app.ui, UiPalette::from_background("white"));
        assert_eq!(app.base_style.bg, Some(ratatui::style::Color::White));
        assert_eq!(app.base_style.fg, Some(ratatui::style::Color::Black));
    }

    #[test]
    fn altgr_characters_are_typed_not_treated_as_shortcuts() {
        let dir = TempDir::new().unwrap();
        let (mut app, _, _) = test_app(&dir);
        let altgr = KeyModifiers::CONTROL | KeyModifiers::ALT;

        for c in ['@', '\\', 's', 'q'] {
            assert!(!app.handle_key(KeyEvent::new(KeyCode::Char(c), altgr), 20));
        }

        assert_eq!(app.mode, Mode::Edit);
        assert_eq!(app.editor.text(), "@\\sq");
    }

    #[test]
    fn crlf_lines_render_without_break_chars() {
        let dir = TempDir::new().unwrap();
        let (mut app, _, _) = test_app(&dir);
        let file = dir.path().join("mixed.bat");
        fs::write(&file, "cls\r\npause\u{000C}echo").unwrap();
        app.open_project(&file);

        let lines = app.build_editor_cache();
        let rendered: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(rendered, vec!["cls", "pause", "echo"]);
    }

    #[test]
    fn scroll_offset_saturates_past_u16() {
        let dir = TempDir::new().unwrap();
        let (mut app, _, _) = test_app(&dir);

        app.edit_scroll = 1_000;
        assert_eq!(app.editor_scroll_offset(), (1_000, 0));
        app.edit_scroll = 70_000;
        assert_eq!(app.editor_scroll_offset(), (u16::MAX, 0));
    }
}
