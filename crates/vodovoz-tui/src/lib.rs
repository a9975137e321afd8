// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap};
use std::io;
use std::ops::Range;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, info, warn};
use vodovoz_app::{
    CURRENCY_SUFFIX, CatalogResponse, Product, ScreenCommand, ScreenEvent, ScreenState, TabKind,
};
use vodovoz_client::FetchError;

const CARD_WIDTH: u16 = 28;
const IMAGE_PLACEHOLDER: &str = "[нет фото]";
const FAVORITE_ON: &str = "♥";
const FAVORITE_OFF: &str = "♡";
const APP_TITLE: &str = "vodovoz";

pub trait CatalogRuntime {
    fn fetch_catalog(&mut self) -> Result<CatalogResponse, FetchError>;
    fn image_url(&self, product: &Product) -> Option<String>;
    /// Starts a fetch tagged with `request_id`; the outcome must arrive on
    /// `tx` as [`InternalEvent::CatalogFetched`]. The default runs inline.
    fn spawn_fetch(&mut self, request_id: u64, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self.fetch_catalog();
        tx.send(InternalEvent::CatalogFetched { request_id, result })
            .map_err(|_| anyhow::anyhow!("catalog event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    CatalogFetched {
        request_id: u64,
        result: Result<CatalogResponse, FetchError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct FetchUiState {
    next_request_id: u64,
    in_flight: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ViewData {
    fetch: FetchUiState,
    loaded_at: Option<OffsetDateTime>,
    last_error: Option<FetchError>,
    help_visible: bool,
    status_token: u64,
}

pub fn run_app<R: CatalogRuntime>(state: &mut ScreenState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    start_fetch(state, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, runtime, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut ScreenState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(ScreenCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::CatalogFetched { request_id, result } => {
                handle_catalog_fetched(state, view_data, tx, request_id, result);
            }
        }
    }
}

fn start_fetch<R: CatalogRuntime>(
    state: &mut ScreenState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if view_data.fetch.in_flight.is_some() {
        emit_status(
            state,
            view_data,
            internal_tx,
            "catalog request already in flight",
        );
        return;
    }

    view_data.fetch.next_request_id = view_data.fetch.next_request_id.saturating_add(1);
    let request_id = view_data.fetch.next_request_id;
    view_data.fetch.in_flight = Some(request_id);
    state.dispatch(ScreenCommand::SetStatus("loading catalog".to_owned()));
    debug!(request_id, "catalog fetch started");

    if let Err(error) = runtime.spawn_fetch(request_id, internal_tx.clone()) {
        view_data.fetch.in_flight = None;
        warn!(request_id, error = %error, "catalog fetch could not start");
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("catalog fetch could not start: {error}"),
        );
    }
}

fn handle_catalog_fetched(
    state: &mut ScreenState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    request_id: u64,
    result: Result<CatalogResponse, FetchError>,
) {
    if view_data.fetch.in_flight != Some(request_id) {
        debug!(request_id, "dropping superseded catalog result");
        return;
    }
    view_data.fetch.in_flight = None;

    match result {
        Ok(catalog) => {
            let events = state.dispatch(ScreenCommand::LoadCatalog(catalog.categories));
            view_data.loaded_at = Some(OffsetDateTime::now_utc());
            view_data.last_error = None;
            if let Some(ScreenEvent::CatalogLoaded {
                categories,
                products,
            }) = events.first()
            {
                info!(request_id, categories, products, "catalog loaded");
                emit_status(
                    state,
                    view_data,
                    tx,
                    format!("catalog loaded: {categories} categories, {products} products"),
                );
            }
        }
        Err(error) => {
            warn!(request_id, kind = error.kind(), %error, "keeping previous catalog");
            emit_status(state, view_data, tx, format!("{error}; press r to retry"));
            view_data.last_error = Some(error);
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut ScreenState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(ScreenCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: CatalogRuntime>(
    state: &mut ScreenState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
    {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    let on_home = state.active_tab == TabKind::Home;
    let on_catalog = state.active_tab == TabKind::Catalog;
    let command = match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('?') => {
            view_data.help_visible = true;
            return false;
        }
        KeyCode::Char('r') => {
            start_fetch(state, runtime, view_data, internal_tx);
            return false;
        }
        KeyCode::Tab => ScreenCommand::NextTab,
        KeyCode::BackTab => ScreenCommand::PrevTab,
        KeyCode::Char(']') if on_home || on_catalog => ScreenCommand::NextCategory,
        KeyCode::Char('[') if on_home || on_catalog => ScreenCommand::PrevCategory,
        KeyCode::Char(digit @ '1'..='9') if on_home || on_catalog => {
            ScreenCommand::SelectCategory(digit as usize - '1' as usize)
        }
        KeyCode::Right | KeyCode::Char('l') if on_home => ScreenCommand::NextProduct,
        KeyCode::Left | KeyCode::Char('h') if on_home => ScreenCommand::PrevProduct,
        KeyCode::Char('f') | KeyCode::Char(' ') if on_home => ScreenCommand::ToggleFavorite,
        _ => return false,
    };

    let selecting = matches!(command, ScreenCommand::SelectCategory(_));
    let events = state.dispatch(command);
    let selected = events
        .iter()
        .any(|event| matches!(event, ScreenEvent::CategorySelected { .. }));
    report_events(state, view_data, internal_tx, events);

    if on_catalog && selecting && selected {
        state.dispatch(ScreenCommand::SelectTab(TabKind::Home));
    }
    false
}

fn report_events(
    state: &mut ScreenState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    events: Vec<ScreenEvent>,
) {
    for event in events {
        match event {
            ScreenEvent::SelectionRejected(error) => {
                debug!(%error, "category selection rejected");
                emit_status(state, view_data, internal_tx, error.to_string());
            }
            ScreenEvent::FavoriteToggled { product, favorite } => {
                let message = if favorite {
                    format!("favorite added: {product}")
                } else {
                    format!("favorite removed: {product}")
                };
                emit_status(state, view_data, internal_tx, message);
            }
            ScreenEvent::CategorySelected { index, products } => {
                debug!(index, products, "category selected");
            }
            ScreenEvent::TabChanged(_)
            | ScreenEvent::CatalogLoaded { .. }
            | ScreenEvent::ProductFocused(_)
            | ScreenEvent::StatusUpdated(_)
            | ScreenEvent::StatusCleared => {}
        }
    }
}

fn render<R: CatalogRuntime>(
    frame: &mut ratatui::Frame<'_>,
    state: &ScreenState,
    runtime: &R,
    view_data: &ViewData,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_category_buttons(frame, layout[0], state, view_data);

    match state.active_tab {
        TabKind::Home => render_product_grid(frame, layout[1], state, runtime),
        TabKind::Catalog => {
            let body = Paragraph::new(catalog_overview_text(state)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(TabKind::Catalog.label()),
            );
            frame.render_widget(body, layout[1]);
        }
        TabKind::Favorites => {
            let body = Paragraph::new(favorites_text(state)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(TabKind::Favorites.label()),
            );
            frame.render_widget(body, layout[1]);
        }
        TabKind::Cart | TabKind::Profile => {
            let body = Paragraph::new("раздел недоступен").block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(state.active_tab.label()),
            );
            frame.render_widget(body, layout[1]);
        }
    }

    let selected = TabKind::ALL
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let tab_titles = TabKind::ALL
        .iter()
        .map(|tab| format!(" {} ", tab.label()))
        .collect::<Vec<String>>();
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[2]);

    let status_widget = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[3]);

    if view_data.help_visible {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_category_buttons(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &ScreenState,
    view_data: &ViewData,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(header_title(view_data));

    let names = state.catalog.category_names();
    if names.is_empty() {
        let empty = if view_data.fetch.in_flight.is_some() {
            "загрузка…"
        } else {
            "категории не загружены"
        };
        frame.render_widget(Paragraph::new(empty).block(block), area);
        return;
    }

    let titles = names
        .iter()
        .enumerate()
        .map(|(index, name)| format!(" {} {name} ", index + 1))
        .collect::<Vec<String>>();
    let buttons = Tabs::new(titles)
        .block(block)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
        )
        .select(state.catalog.selected_index().unwrap_or(0));
    frame.render_widget(buttons, area);
}

fn render_product_grid<R: CatalogRuntime>(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &ScreenState,
    runtime: &R,
) {
    let title = state
        .catalog
        .selected_category()
        .map_or_else(|| "товары".to_owned(), |category| category.name.clone());
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let products = state.catalog.current_products();
    if products.is_empty() {
        frame.render_widget(Paragraph::new("нет товаров"), inner);
        return;
    }

    let visible = usize::from((inner.width / CARD_WIDTH).max(1));
    let window = visible_window(products.len(), state.product_cursor, visible);
    let constraints = window
        .clone()
        .map(|_| Constraint::Length(CARD_WIDTH))
        .collect::<Vec<_>>();
    let slots = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(inner);

    for (slot, index) in window.enumerate() {
        let product = &products[index];
        let focused = index == state.product_cursor;
        let border_style = if focused {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let marker = if state.is_favorite(&product.id) {
            Span::styled(FAVORITE_ON, Style::default().fg(Color::Red))
        } else {
            Span::raw(FAVORITE_OFF)
        };
        let card = Paragraph::new(product_card_lines(
            product,
            runtime.image_url(product).as_deref(),
        ))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(format!(" {} ", index + 1))
                .title(Line::from(marker).right_aligned()),
        );
        frame.render_widget(card, slots[slot]);
    }
}

/// Indices of the cards that fit on screen, scrolled so the cursor stays
/// visible at the right edge.
fn visible_window(count: usize, cursor: usize, visible: usize) -> Range<usize> {
    if count == 0 {
        return 0..0;
    }
    let visible = visible.clamp(1, count);
    let cursor = cursor.min(count - 1);
    let start = (cursor + 1).saturating_sub(visible);
    start..start + visible
}

fn product_card_lines(product: &Product, image_url: Option<&str>) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(product.display_name().to_owned()),
        Line::from(match image_url {
            Some(url) => format!("[img] {url}"),
            None => IMAGE_PLACEHOLDER.to_owned(),
        }),
        Line::from(Span::styled(
            product.price_label(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    if let Some(old_price) = product
        .price_tiers()
        .first()
        .and_then(|tier| tier.old_price)
    {
        lines.push(Line::from(Span::styled(
            format!("было {} {CURRENCY_SUFFIX}", old_price.round() as i64),
            Style::default().add_modifier(Modifier::CROSSED_OUT),
        )));
    }
    lines.push(Line::from(format!("★ {:.1}", product.rating)));
    lines.push(Line::from(if product.in_stock() {
        format!("в наличии: {}", product.catalog_quantity)
    } else {
        "нет в наличии".to_owned()
    }));
    let extra = product.extra_photos().len();
    if extra > 0 {
        lines.push(Line::from(format!("+{extra} фото")));
    }
    lines
}

fn catalog_overview_text(state: &ScreenState) -> String {
    let categories = state.catalog.categories();
    if categories.is_empty() {
        return "категории не загружены".to_owned();
    }
    let selected = state.catalog.selected_index();
    categories
        .iter()
        .enumerate()
        .map(|(index, category)| {
            let marker = if selected == Some(index) { ">" } else { " " };
            format!(
                "{marker} {}. {} ({})",
                index + 1,
                category.name,
                category.products.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn favorites_text(state: &ScreenState) -> String {
    let favorites = state.favorite_products();
    if favorites.is_empty() {
        return "в избранном пусто".to_owned();
    }
    favorites
        .iter()
        .map(|product| {
            format!(
                "{FAVORITE_ON} {} | {}",
                product.display_name(),
                product.price_label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn header_title(view_data: &ViewData) -> String {
    if view_data.fetch.in_flight.is_some() {
        return format!("{APP_TITLE} | загрузка…");
    }
    if let Some(loaded_at) = view_data.loaded_at {
        return format!("{APP_TITLE} | обновлено {} UTC", format_clock(loaded_at));
    }
    if view_data.last_error.is_some() {
        return format!("{APP_TITLE} | ошибка загрузки");
    }
    APP_TITLE.to_owned()
}

fn format_clock(at: OffsetDateTime) -> String {
    at.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| "--:--:--".to_owned())
}

fn status_text(state: &ScreenState) -> String {
    let hints = match state.active_tab {
        TabKind::Home => {
            "tab sections | 1-9 [/] category | h/l product | f favorite | r reload | ? help | q"
        }
        TabKind::Catalog => "tab sections | 1-9 [/] category | r reload | ? help | q",
        TabKind::Cart | TabKind::Favorites | TabKind::Profile => {
            "tab sections | r reload | ? help | q"
        }
    };
    match &state.status_line {
        Some(status) => format!("{status} | {hints}"),
        None => hints.to_owned(),
    }
}

fn help_overlay_text() -> &'static str {
    "global: q or ctrl+q quit | tab/shift+tab sections | r reload catalog | ? help\n\
home: 1-9 pick category | [/] previous/next category | h/l or left/right product | f or space favorite\n\
catalog: 1-9 pick category and show its products\n\
help: esc or ? close"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
