mod app;
mod render;

pub use app::{App, Command};

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Gauge, Paragraph, Row, Table},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::warn;

use crate::client::AuroraClient;
use crate::config::DashboardConfig;
use crate::controls::{Controls, OrderOutcome};
use crate::poller::Poller;
use crate::types::{PanelData, PanelKind, PanelUpdate, PositionsSnapshot, TradeRecord};

pub async fn run(cfg: &DashboardConfig, client: Arc<AuroraClient>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, cfg, client).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    cfg: &DashboardConfig,
    client: Arc<AuroraClient>,
) -> Result<()> {
    let (panel_tx, mut panel_rx) = mpsc::unbounded_channel();
    let (order_tx, mut order_rx) = mpsc::unbounded_channel();

    let tasks = Poller::staggered_tasks(Duration::from_millis(cfg.polling.stagger_ms));
    let poller = Poller::new(
        Arc::clone(&client) as Arc<dyn crate::client::PanelSource>,
        tasks,
        Duration::from_millis(cfg.polling.period_ms),
        panel_tx.clone(),
    );
    let _poller = poller.spawn();

    let controls = Arc::new(Controls::new(client, panel_tx));
    let mut app = App::new(&cfg.controls);

    loop {
        terminal.draw(|f| draw(f, &app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match app.handle_key(key.code) {
                        Some(Command::Quit) => app.should_quit = true,
                        Some(cmd) => dispatch(cmd, Arc::clone(&controls), order_tx.clone()),
                        None => {}
                    }
                }
            }
        }

        while let Ok(update) = panel_rx.try_recv() {
            app.apply_update(update);
        }
        while let Ok(outcome) = order_rx.try_recv() {
            app.set_order_outcome(outcome);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Control actions run on their own tasks so a slow backend never freezes
/// the draw loop. Failures are logged and leave the view untouched.
fn dispatch(cmd: Command, controls: Arc<Controls>, order_tx: mpsc::UnboundedSender<OrderOutcome>) {
    tokio::spawn(async move {
        let result = match cmd {
            Command::Quit => return,
            Command::StartLoop(interval) => controls.start_loop(interval).await.map(|_| None),
            Command::StopLoop => controls.stop_loop().await.map(|_| None),
            Command::TickOnce => controls.tick_once().await.map(|_| None),
            Command::SetEps(eps) => controls.set_eps(eps).await.map(|_| None),
            Command::SetStake(stake) => controls.set_stake(stake).await.map(|_| None),
            Command::PreviewOrder(side, fraction) => {
                controls.preview_order(side, fraction).await.map(Some)
            }
            Command::SubmitOrder(side, fraction) => {
                controls.submit_order(side, fraction).await.map(Some)
            }
            Command::ApplyRisk(cap) => controls.apply_risk(cap).await.map(|_| None),
        };
        match result {
            Ok(Some(outcome)) => {
                let _ = order_tx.send(outcome);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "control action failed"),
        }
    });
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(10),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_body(f, app, chunks[1]);
    draw_trades(f, app, chunks[2]);
    draw_footer(f, app, chunks[3]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let status = app.status_line();
    let style = if status == "OK" {
        Style::default().fg(Color::Green)
    } else if status == "connecting..." {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Red)
    };
    let header = Paragraph::new(format!("Aurora Dash  [{}]", status))
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_body(f: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Min(4),
        ])
        .split(columns[0]);
    draw_text_panel(f, app, left[0], PanelKind::Health, "Health", |data| match data {
        PanelData::Health(h) => render::health_lines(h),
        _ => Vec::new(),
    });
    draw_text_panel(f, app, left[1], PanelKind::TickCfg, "Auto tick", |data| match data {
        PanelData::TickCfg(c) => render::tick_cfg_lines(c),
        _ => Vec::new(),
    });
    draw_text_panel(f, app, left[2], PanelKind::Risk, "Risk", |data| match data {
        PanelData::Risk(r) => render::risk_lines(r),
        _ => Vec::new(),
    });

    let middle = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(3)])
        .split(columns[1]);
    draw_positions(f, app, middle[0]);
    draw_readiness(f, app, middle[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(4)])
        .split(columns[2]);
    draw_text_panel(f, app, right[0], PanelKind::Ai, "AI", |data| match data {
        PanelData::Ai(s) => render::ai_lines(s),
        _ => Vec::new(),
    });
    draw_orders(f, app, right[1]);
}

fn draw_text_panel(
    f: &mut Frame,
    app: &App,
    area: Rect,
    kind: PanelKind,
    title: &str,
    lines: impl Fn(&PanelData) -> Vec<String>,
) {
    let (body, failed) = panel_body(app.panel(kind), lines);
    let style = if failed {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    let widget = Paragraph::new(body)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(widget, area);
}

fn panel_body(
    update: Option<&PanelUpdate>,
    lines: impl Fn(&PanelData) -> Vec<String>,
) -> (String, bool) {
    match update {
        None => ("loading...".to_string(), false),
        Some(update) => match &update.result {
            Ok(data) => (lines(data).join("\n"), false),
            Err(message) => (message.clone(), true),
        },
    }
}

fn draw_positions(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Positions");
    match app.panel(PanelKind::Positions) {
        Some(update) => match &update.result {
            Ok(PanelData::Positions(snapshot)) => {
                render_positions_table(f, snapshot, area, block)
            }
            Ok(_) => {}
            Err(message) => {
                let widget = Paragraph::new(message.clone())
                    .style(Style::default().fg(Color::Red))
                    .block(block);
                f.render_widget(widget, area);
            }
        },
        None => {
            f.render_widget(Paragraph::new("loading...").block(block), area);
        }
    }
}

fn render_positions_table(f: &mut Frame, snapshot: &PositionsSnapshot, area: Rect, block: Block) {
    let rows = render::position_rows(snapshot);
    if rows.is_empty() {
        let body = format!(
            "{}\n{}",
            render::positions_summary(snapshot),
            render::NO_POSITIONS
        );
        f.render_widget(Paragraph::new(body).block(block), area);
        return;
    }

    let table_rows: Vec<Row> = rows.into_iter().map(|r| Row::new(r.to_vec())).collect();
    let table = Table::new(
        table_rows,
        [
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ],
    )
    .header(
        Row::new(vec!["symbol", "qty", "avg_price"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block.title_bottom(render::positions_summary(snapshot)));
    f.render_widget(table, area);
}

fn draw_readiness(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Signal");
    match app.panel(PanelKind::Readiness) {
        Some(update) => match &update.result {
            Ok(PanelData::Readiness(readiness)) => {
                let gauge = Gauge::default()
                    .block(block)
                    .gauge_style(Style::default().fg(Color::Cyan))
                    .ratio(render::readiness_ratio(readiness))
                    .label(render::readiness_line(readiness));
                f.render_widget(gauge, area);
            }
            Ok(_) => {}
            Err(_) => {
                f.render_widget(Paragraph::new("Signal unavailable").block(block), area);
            }
        },
        None => {
            f.render_widget(Paragraph::new("loading...").block(block), area);
        }
    }
}

fn draw_orders(f: &mut Frame, app: &App, area: Rect) {
    let body = match app.order_outcome() {
        Some(outcome) => render::order_lines(outcome).join("\n"),
        None => format!(
            "side: {}  fraction: {}\n('b' toggles side, 'f' edits fraction)",
            app.form.side, app.form.fraction
        ),
    };
    let widget =
        Paragraph::new(body).block(Block::default().borders(Borders::ALL).title("Order"));
    f.render_widget(widget, area);
}

fn draw_trades(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Trades");
    match app.panel(PanelKind::Trades) {
        Some(update) => match &update.result {
            Ok(PanelData::Trades(trades)) => render_trades_table(f, trades, area, block),
            Ok(_) => {}
            Err(message) => {
                let widget = Paragraph::new(message.clone())
                    .style(Style::default().fg(Color::Red))
                    .block(block);
                f.render_widget(widget, area);
            }
        },
        None => {
            f.render_widget(Paragraph::new("loading...").block(block), area);
        }
    }
}

fn render_trades_table(f: &mut Frame, trades: &[TradeRecord], area: Rect, block: Block) {
    let rows = render::trade_rows(trades, render::TRADE_DISPLAY_CAP);
    if rows.is_empty() {
        f.render_widget(Paragraph::new(render::NO_TRADES).block(block), area);
        return;
    }

    let table_rows: Vec<Row> = rows.into_iter().map(|r| Row::new(r.to_vec())).collect();
    let widths = [
        Constraint::Length(19),
        Constraint::Length(8),
        Constraint::Length(12),
        Constraint::Length(5),
        Constraint::Length(10),
        Constraint::Length(11),
        Constraint::Length(11),
        Constraint::Length(13),
        Constraint::Length(13),
        Constraint::Length(15),
    ];
    let table = Table::new(table_rows, widths)
        .header(
            Row::new(render::TRADE_COLUMNS.to_vec())
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(block);
    f.render_widget(table, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let text = match &app.prompt {
        Some(prompt) => format!("{}> {}_", prompt.field.label(), prompt.buffer),
        None => format!(
            "s start  x stop  t tick  b side({})  f fraction  p preview  o submit  e eps  k stake  r risk cap  q quit",
            app.form.side
        ),
    };
    f.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::Gray)),
        area,
    );
}
