use std::time::Instant;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::controller::RaceEffects;
use crate::race::{LetterClass, Phase, QuoteStatus, RaceState, WordMark};

const HORIZONTAL_MARGIN: u16 = 5;
const INPUT_PLACEHOLDER: &str = "Type the above text here when the race begins";

impl<E: RaceEffects> Widget for &App<E> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let race = self.race();

        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
        let body = body_text(race);
        let mut body_lines = wrapped_line_count(&body, max_chars_per_line);
        if body_lines > 1 {
            // slack for wrap trimming differences
            body_lines += 1;
        }

        // banner, body, gap, input box, result, author, gap, legend
        let content_height = 1 + body_lines + 1 + 3 + 1 + 1 + 1 + 1;
        let top = area.height.saturating_sub(content_height) / 2;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(top),
                Constraint::Length(1),
                Constraint::Length(body_lines),
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(area);

        if let Some(banner) = race.banner(Instant::now()) {
            Paragraph::new(Span::styled(
                banner,
                Style::default().fg(Color::Cyan).patch(bold_style),
            ))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
        }

        let body_widget = match (race.phase, &race.quote) {
            (_, QuoteStatus::Failed(_)) => {
                Paragraph::new(Span::styled(body, Style::default().fg(Color::Red)))
            }
            (Phase::Idle, _) => Paragraph::new(Span::styled(body, bold_style)),
            (_, QuoteStatus::Loading) => Paragraph::new(Span::styled(body, dim_style)),
            (_, QuoteStatus::Ready(_)) => Paragraph::new(quote_line(race)),
        };
        body_widget
            .alignment(if body_lines == 1 {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);

        if matches!(race.phase, Phase::CountingDown | Phase::Racing) {
            let racing = race.phase == Phase::Racing;
            let (text, style) = if racing {
                (race.current_input.as_str(), bold_style)
            } else {
                (INPUT_PLACEHOLDER, dim_style.patch(italic_style))
            };
            let border = if racing {
                Style::default().fg(Color::Yellow)
            } else {
                dim_style
            };

            Paragraph::new(Span::styled(text.replace(' ', "·"), style))
                .block(Block::default().borders(Borders::ALL).border_style(border))
                .render(chunks[4], buf);
        }

        if race.phase == Phase::Finished {
            let wpm = race
                .wpm()
                .map_or_else(|| "--".to_string(), |wpm| wpm.to_string());
            Paragraph::new(Span::styled(
                format!("Words per minute: {wpm}"),
                Style::default().fg(Color::Yellow).patch(bold_style),
            ))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);

            if let Some(author) = race.ready_quote().and_then(|q| q.author()) {
                Paragraph::new(Span::styled(format!("- {author}"), italic_style))
                    .alignment(Alignment::Center)
                    .render(chunks[6], buf);
            }
        }

        Paragraph::new(Span::styled(legend(race.phase), italic_style)).render(chunks[8], buf);
    }
}

/// Plain text used to size the body area and as fallback content.
fn body_text(race: &RaceState) -> String {
    match (race.phase, &race.quote) {
        (_, QuoteStatus::Failed(msg)) => {
            format!("Could not load a quote ({msg}). Press (r) to retry.")
        }
        (Phase::Idle, _) => "Press (enter) to enter a typing race".to_string(),
        (_, QuoteStatus::Loading) => "Loading...".to_string(),
        (_, QuoteStatus::Ready(quote)) => quote.text(),
    }
}

/// Lines `text` occupies when word-wrapped at `width` columns. Words wider
/// than a line are broken across lines.
fn wrapped_line_count(text: &str, width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let mut lines = 1usize;
    let mut used = 0usize;

    for word in text.split(' ').filter(|w| !w.is_empty()) {
        let w = word.width();
        let needed = if used == 0 { w } else { used + 1 + w };
        if needed <= width {
            used = needed;
            continue;
        }
        if used > 0 {
            lines += 1;
        }
        lines += w.saturating_sub(1) / width;
        used = match w % width {
            0 => width,
            rest => rest,
        };
    }

    u16::try_from(lines).unwrap_or(u16::MAX)
}

fn legend(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "(enter) start / (r)efetch quote / (esc)ape",
        Phase::CountingDown => "(r)estart / (esc)ape",
        Phase::Racing => "(tab) restart / (ctrl+u) clear / (esc)ape",
        Phase::Finished => "(r)estart / (esc)ape",
    }
}

/// The quote with cleared, current and pending words styled apart.
pub fn quote_line(race: &RaceState) -> Line<'_> {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let cleared_style = Style::default().patch(bold_style).fg(Color::Yellow);
    let pending_style = Style::default().patch(bold_style).add_modifier(Modifier::DIM);
    let current_style = Style::default().patch(bold_style).add_modifier(Modifier::UNDERLINED);

    let mut spans = Vec::new();
    for (idx, mark) in race.word_marks().into_iter().enumerate() {
        if idx > 0 {
            spans.push(Span::raw(" "));
        }
        match mark {
            WordMark::Cleared(word) => spans.push(Span::styled(word, cleared_style)),
            WordMark::Pending(word) => spans.push(Span::styled(word, pending_style)),
            WordMark::Current(letters) => {
                spans.extend(letters.into_iter().map(|(letter, class)| {
                    let style = match class {
                        LetterClass::Correct => current_style.fg(Color::Yellow),
                        LetterClass::Incorrect => current_style.fg(Color::White).bg(Color::Red),
                        LetterClass::Untouched => current_style,
                    };
                    Span::styled(letter.to_string(), style)
                }));
            }
        }
    }

    Line::from(spans)
}
