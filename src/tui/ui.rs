//! UI rendering for the front panel.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph},
    style::{Color, Modifier, Style},
};

use super::app::DebuggerApp;
use crate::computer::Phase;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(frame.area());

    // Left side: code, lamps and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(9),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: memory and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(4)])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_help(frame, right_chunks[1]);
}

fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let text = format!("{}{:02x}: {}", prefix, addr, instr);

            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };

            ListItem::new(format!("{} {}", bp, text)).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Program ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(list, area);
}

/// A row of lamps, most significant bit first.
fn lamps(value: u64, width: usize) -> Span<'static> {
    let text: String = (0..width)
        .rev()
        .map(|i| if (value >> i) & 1 == 1 { '●' } else { '○' })
        .collect();
    Span::styled(text, Style::default().fg(Color::Red))
}

fn flag(name: &'static str, on: bool) -> Span<'static> {
    let style = if on {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled(name, style)
}

fn register_line(name: &'static str, value: u64, width: usize) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!("{name:<8}")),
        lamps(value, width),
        Span::raw(format!("  {value:02x}")),
    ])
}

fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let computer = &app.computer;
    let config = computer.config();
    let phase = computer.phase();

    let content = vec![
        register_line("PC", computer.program_counter(), config.address_width),
        register_line("Code", computer.code(), config.data_width),
        register_line("Address", computer.address(), config.data_width),
        register_line("Data", computer.data(), config.data_width),
        Line::from(vec![
            Span::raw("Phase   "),
            flag("CODE ", phase == Some(Phase::Code)),
            flag("ADDR ", phase == Some(Phase::Address)),
            flag("DATA", phase == Some(Phase::Data)),
        ]),
        Line::from(vec![
            Span::raw("Flags   "),
            flag("CARRY ", computer.carry()),
            flag("ZERO ", computer.zero()),
            flag("HALT", computer.is_halted()),
        ]),
        Line::from(vec![
            Span::raw("Ticks   "),
            Span::styled(format!("{}", app.ticks), Style::default().fg(Color::Cyan)),
        ]),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .title(" Front Panel ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );

    frame.render_widget(paragraph, area);
}

/// Draw memory view, sixteen words per row.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let words = &app.memory.words;
    let pc = app.computer.program_counter() as usize;

    let items: Vec<ListItem> = words
        .chunks(16)
        .enumerate()
        .skip(app.mem_scroll)
        .take(visible_rows)
        .map(|(row, chunk)| {
            let base = row * 16;
            let mut spans = vec![Span::raw(format!("{base:02x}: "))];
            for (i, word) in chunk.iter().enumerate() {
                let style = if base + i == pc {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else if *word != 0 {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                spans.push(Span::styled(format!("{word:02x} "), style));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );

    frame.render_widget(list, area);
}

fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default().title(" Status ").borders(Borders::ALL));

    frame.render_widget(status, area);
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![Line::from(
        "p: Phase  s: Step  r: Run  space: Pause  b: Breakpoint  x: Reset  ↑↓: Scroll  q: Quit",
    )])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().title(" Help ").borders(Borders::ALL));

    frame.render_widget(help, area);
}
