//! Terminal presentation of engine snapshots.
//!
//! Frames are drawn with ANSI escape codes: the glyph and background colors
//! become truecolor SGR sequences and a non-zero glow renders bold. Each
//! frame redraws from the home position so the previous one is overwritten
//! in place.

use std::io::Write;

use crate::config::Rgb;
use crate::engine::{Snapshot, Style};
use crate::playback::{PlaybackState, LOADING_TEXT};

const HOME: &str = "\x1b[H";
const RESET: &str = "\x1b[0m";
const CLEAR_TO_EOL: &str = "\x1b[K";
const CLEAR_BELOW: &str = "\x1b[J";

/// Text shown in place of a frame, if there is no frame to show.
pub fn placeholder(snapshot: &Snapshot) -> Option<String> {
    if snapshot.ready {
        return None;
    }
    let text = match &snapshot.state {
        PlaybackState::Idle => "NO MEDIA".to_string(),
        PlaybackState::Failed { reason } => format!("FAILED TO LOAD: {}", reason),
        PlaybackState::Loading | PlaybackState::Ready { .. } => LOADING_TEXT.to_string(),
    };
    Some(text)
}

fn style_prefix(style: &Style) -> String {
    let mut out = String::new();
    out.push_str(&fg(style.glyph_color));
    out.push_str(&bg(style.background_color));
    if style.glow_intensity > 0.0 {
        out.push_str("\x1b[1m");
    }
    out
}

fn fg(c: Rgb) -> String {
    format!("\x1b[38;2;{};{};{}m", c.r, c.g, c.b)
}

fn bg(c: Rgb) -> String {
    format!("\x1b[48;2;{};{};{}m", c.r, c.g, c.b)
}

/// Build the escape sequence that draws `snapshot` over the previous frame.
pub fn render_frame(snapshot: &Snapshot) -> String {
    let mut output = String::new();
    output.push_str(HOME);
    output.push_str(&style_prefix(&snapshot.style));

    match (&snapshot.current_grid, placeholder(snapshot)) {
        (Some(grid), None) => {
            for row in grid.rows() {
                output.push_str(row);
                output.push_str(CLEAR_TO_EOL);
                output.push_str("\r\n");
            }
        }
        (_, Some(text)) => {
            output.push_str(&text);
            output.push_str(CLEAR_TO_EOL);
            output.push_str("\r\n");
        }
        (None, None) => {}
    }

    output.push_str(RESET);
    output.push_str(CLEAR_BELOW);
    output
}

/// One-line status: frame position and rebuild state.
pub fn render_status(snapshot: &Snapshot) -> String {
    let mut status = format!(
        "frame {}/{}",
        if snapshot.frame_count == 0 {
            0
        } else {
            snapshot.frame_index + 1
        },
        snapshot.frame_count
    );
    if snapshot.rebuilding {
        status.push_str(" (rebuilding)");
    }
    status
}

/// Switch to the alternate screen and hide the cursor.
pub fn enter_screen<W: Write>(out: &mut W) -> std::io::Result<()> {
    out.write_all(b"\x1b[?1049h\x1b[?25l\x1b[2J")?;
    out.flush()
}

/// Restore the cursor and the primary screen.
pub fn leave_screen<W: Write>(out: &mut W) -> std::io::Result<()> {
    out.write_all(b"\x1b[0m\x1b[?25h\x1b[?1049l")?;
    out.flush()
}

/// Draw one snapshot plus its status line.
pub fn draw<W: Write>(out: &mut W, snapshot: &Snapshot, show_status: bool) -> std::io::Result<()> {
    let mut frame = render_frame(snapshot);
    if show_status {
        frame.push_str(&render_status(snapshot));
        frame.push_str(CLEAR_TO_EOL);
    }
    out.write_all(frame.as_bytes())?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::raster::GlyphGrid;

    fn snapshot(grid: Option<GlyphGrid>, state: PlaybackState) -> Snapshot {
        Snapshot {
            ready: grid.is_some(),
            current_grid: grid,
            frame_index: 0,
            frame_count: 1,
            state,
            rebuilding: false,
            cache_generation: None,
            style: Style::from_config(&Config::default()),
        }
    }

    #[test]
    fn test_loading_placeholder() {
        let snap = snapshot(None, PlaybackState::Loading);
        assert_eq!(placeholder(&snap).as_deref(), Some("LOADING..."));
        assert!(render_frame(&snap).contains("LOADING..."));
    }

    #[test]
    fn test_failed_placeholder_carries_reason() {
        let snap = snapshot(
            None,
            PlaybackState::Failed {
                reason: "404".to_string(),
            },
        );
        assert!(render_frame(&snap).contains("FAILED TO LOAD: 404"));
    }

    #[test]
    fn test_frame_rows_and_colors() {
        let grid = GlyphGrid::from_text("ab\ncd".to_string(), 2, 2);
        let snap = snapshot(Some(grid), PlaybackState::Ready { frame_index: 0 });
        let out = render_frame(&snap);
        assert!(out.starts_with(HOME));
        assert!(out.contains("\x1b[38;2;74;222;128m"));
        assert!(out.contains("\x1b[48;2;0;0;0m"));
        assert!(out.contains("\x1b[1m"));
        assert!(out.contains("ab\x1b[K\r\ncd\x1b[K\r\n"));
        assert!(out.ends_with("\x1b[0m\x1b[J"));
    }

    #[test]
    fn test_no_bold_without_glow() {
        let mut snap = snapshot(None, PlaybackState::Idle);
        snap.style.glow_intensity = 0.0;
        assert!(!render_frame(&snap).contains("\x1b[1m"));
    }

    #[test]
    fn test_status_line() {
        let mut snap = snapshot(None, PlaybackState::Loading);
        snap.frame_count = 0;
        assert_eq!(render_status(&snap), "frame 0/0");
        snap.frame_count = 12;
        snap.frame_index = 4;
        snap.rebuilding = true;
        assert_eq!(render_status(&snap), "frame 5/12 (rebuilding)");
    }

    #[test]
    fn test_draw_writes_to_buffer() {
        let snap = snapshot(None, PlaybackState::Idle);
        let mut buf = Vec::new();
        draw(&mut buf, &snap, true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("NO MEDIA"));
        assert!(text.contains("frame 1/1"));
    }
}
