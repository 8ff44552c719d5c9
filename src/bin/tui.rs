mod tui_app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, Tabs},
    Frame, Terminal,
};

use mention_scanner::config::Config;
use tui_app::{
    axis_bounds, count_points, format_hour_label, format_pct, format_price, marker_points,
    price_points, truncate, AppState, InputField, Screen,
};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let mut app = AppState::new(cfg);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.screen {
            Screen::Input => match key.code {
                KeyCode::Esc => return Ok(()),
                KeyCode::Tab => app.toggle_field(),
                KeyCode::Up | KeyCode::Down if app.field == InputField::Username => {
                    app.toggle_field();
                }
                KeyCode::Up => app.adjust_hours(1),
                KeyCode::Down => app.adjust_hours(-1),
                KeyCode::Left if app.field == InputField::Hours => app.adjust_hours(-1),
                KeyCode::Right if app.field == InputField::Hours => app.adjust_hours(1),
                KeyCode::Backspace if app.field == InputField::Username => {
                    app.username.pop();
                }
                KeyCode::Char(c) if app.field == InputField::Username => {
                    app.username.push(c);
                }
                KeyCode::Enter => {
                    // Show the loading screen before the awaits begin —
                    // the pipeline blocks this loop until it finishes.
                    app.screen = Screen::Loading;
                    terminal.draw(|f| render(f, app))?;
                    app.run_pipeline().await;
                }
                _ => {}
            },
            Screen::Loading => {
                if key.code == KeyCode::Esc {
                    return Ok(());
                }
            }
            Screen::Results => match key.code {
                KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(()),
                KeyCode::Right | KeyCode::Tab | KeyCode::Char('l') => app.next_tab(),
                KeyCode::Left | KeyCode::Char('h') => app.prev_tab(),
                KeyCode::Char('n') | KeyCode::Char('N') => app.reset_to_input(),
                _ => {}
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    match app.screen {
        Screen::Input => render_input(f, app, chunks[1]),
        Screen::Loading => render_loading(f, app, chunks[1]),
        Screen::Results => render_results(f, app, chunks[1]),
    }
    render_footer(f, app, chunks[2]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let mut spans = vec![Span::styled(
        " Solana Mention Tracker  ",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    match app.screen {
        Screen::Results => {
            spans.push(Span::styled(
                format!(
                    "@{}  │  last {}h  │  {} addresses",
                    app.username.trim(),
                    app.hours,
                    app.tabs.len()
                ),
                Style::default().fg(Color::White),
            ));
        }
        _ => {
            spans.push(Span::styled(
                "track token mentions and their price impact",
                Style::default().fg(Color::DarkGray),
            ));
        }
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(paragraph, area);
}

fn render_input(f: &mut Frame, app: &AppState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // username
            Constraint::Length(3), // hours
            Constraint::Length(2), // status
            Constraint::Min(0),
        ])
        .split(area);

    let field_style = |active: bool| {
        if active {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let username = Paragraph::new(app.username.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(field_style(app.field == InputField::Username))
            .title(" Username (without @) "),
    );
    f.render_widget(username, chunks[0]);

    let hours_line = Line::from(vec![
        Span::styled(
            format!(" {} ", app.hours),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled("hours  (←/→ to adjust, 1-24)", Style::default().fg(Color::DarkGray)),
    ]);
    let hours = Paragraph::new(hours_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(field_style(app.field == InputField::Hours))
            .title(" Timeframe "),
    );
    f.render_widget(hours, chunks[1]);

    if let Some(status) = &app.status {
        let msg = Paragraph::new(Span::styled(
            format!(" {status}"),
            Style::default().fg(Color::Red),
        ));
        f.render_widget(msg, chunks[2]);
    }
}

fn render_loading(f: &mut Frame, app: &AppState, area: Rect) {
    let text = format!(
        "Analyzing posts from @{} over the last {} hours...\n\nFetching timeline, scanning for addresses and querying swap data.\nThis runs one warehouse query per address and can take a while.",
        app.username.trim(),
        app.hours
    );
    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Working "),
        );
    f.render_widget(paragraph, area);
}

fn render_results(f: &mut Frame, app: &AppState, area: Rect) {
    let table_height = (app.records.len() as u16 + 3).min(10);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(table_height), // mention table
            Constraint::Length(1),            // tabs
            Constraint::Min(8),               // charts
            Constraint::Length(4),            // metrics
        ])
        .split(area);

    render_mentions_table(f, app, chunks[0]);
    render_address_tabs(f, app, chunks[1]);

    if let Some(tab) = app.tabs.get(app.selected_tab) {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[2]);

        if tab.report.rows.is_empty() {
            let empty = Paragraph::new("No swap data found in the queried window.")
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().borders(Borders::ALL).title(" Charts "));
            f.render_widget(empty, chunks[2]);
        } else {
            render_series_chart(
                f,
                halves[0],
                " Hourly Price (USD) ",
                &price_points(&tab.report),
                &tab.report,
                Color::Green,
            );
            render_series_chart(
                f,
                halves[1],
                " Hourly Swap Count ",
                &count_points(&tab.report),
                &tab.report,
                Color::Magenta,
            );
        }

        render_metrics(f, tab, chunks[3]);
    }
}

fn render_mentions_table(f: &mut Frame, app: &AppState, area: Rect) {
    let header_cells = ["First Seen", "Address", "Post"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .records
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.earliest_at.format("%m-%d %H:%M").to_string())
                    .style(Style::default().fg(Color::DarkGray)),
                Cell::from(r.address.clone()).style(Style::default().fg(Color::Cyan)),
                Cell::from(truncate(&r.source_text.replace('\n', " "), 60)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(45),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " ADDRESSES FOUND ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );

    f.render_widget(table, area);
}

fn render_address_tabs(f: &mut Frame, app: &AppState, area: Rect) {
    let titles: Vec<Line> = app
        .tabs
        .iter()
        .map(|t| {
            let label = t
                .report
                .rows
                .iter()
                .find_map(|r| r.token_symbol.clone())
                .unwrap_or_else(|| truncate(&t.report.address, 8));
            Line::from(label)
        })
        .collect();

    let tabs = Tabs::new(titles)
        .select(app.selected_tab)
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(tabs, area);
}

fn render_series_chart(
    f: &mut Frame,
    area: Rect,
    title: &str,
    points: &[(f64, f64)],
    report: &mention_scanner::types::AddressReport,
    color: Color,
) {
    let marker_x = report.mentioned_at.timestamp() as f64;
    let (x_bounds, y_bounds) = axis_bounds(points, marker_x);
    let marker = marker_points(report, y_bounds);

    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(color))
            .data(points),
        // Vertical line at the first-mention instant.
        Dataset::default()
            .marker(symbols::Marker::Bar)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Red))
            .data(&marker),
    ];

    let x_labels = vec![
        Line::from(format_hour_label(x_bounds[0])),
        Line::from(format_hour_label(marker_x)),
        Line::from(format_hour_label(x_bounds[1])),
    ];
    let y_labels = vec![
        Line::from(format!("{:.6}", y_bounds[0])),
        Line::from(format!("{:.6}", (y_bounds[0] + y_bounds[1]) / 2.0)),
        Line::from(format!("{:.6}", y_bounds[1])),
    ];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(
                    title.to_string(),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds(x_bounds)
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds(y_bounds)
                .labels(y_labels),
        );

    f.render_widget(chart, area);
}

fn render_metrics(f: &mut Frame, tab: &tui_app::AddressTab, area: Rect) {
    let lines = match &tab.summary {
        Some(s) => vec![
            Line::from(vec![
                Span::styled("before: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!("${:.6}", s.price_before),
                    Style::default().fg(Color::White),
                ),
                Span::raw("   "),
                Span::styled("first after: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format_price(s.price_at_first_post_after),
                    Style::default().fg(Color::White),
                ),
                Span::raw("   "),
                Span::styled("latest: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format_price(s.price_latest_in_window),
                    Style::default().fg(Color::White),
                ),
            ]),
            Line::from(vec![
                Span::styled("short-term: ", Style::default().fg(Color::DarkGray)),
                Span::styled(format_pct(s.pct_change_short), pct_style(s.pct_change_short)),
                Span::raw("   "),
                Span::styled("window: ", Style::default().fg(Color::DarkGray)),
                Span::styled(format_pct(s.pct_change_long), pct_style(s.pct_change_long)),
            ]),
        ],
        None => vec![Line::from(Span::styled(
            "No pre-mention price data — impact not computed.",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Impact "),
    );
    f.render_widget(paragraph, area);
}

fn pct_style(v: Option<f64>) -> Style {
    match v {
        Some(p) if p > 0.0 => Style::default().fg(Color::Green),
        Some(p) if p < 0.0 => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    }
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let line = match app.screen {
        Screen::Input => Line::from(vec![
            Span::styled(" [Tab] ", Style::default().fg(Color::Yellow)),
            Span::raw("switch field  "),
            Span::styled("[Enter] ", Style::default().fg(Color::Yellow)),
            Span::raw("analyze  "),
            Span::styled("[Esc] ", Style::default().fg(Color::Yellow)),
            Span::raw("quit"),
        ]),
        Screen::Loading => Line::from(Span::styled(
            " working...",
            Style::default().fg(Color::DarkGray),
        )),
        Screen::Results => Line::from(vec![
            Span::styled(" [←→ / h l] ", Style::default().fg(Color::Yellow)),
            Span::raw("switch address  "),
            Span::styled("[n] ", Style::default().fg(Color::Yellow)),
            Span::raw("new search  "),
            Span::styled("[q] ", Style::default().fg(Color::Yellow)),
            Span::raw("quit"),
        ]),
    };
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
