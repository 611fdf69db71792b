use std::io::{self, Write};

use chip8_core::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use chip8_core::FrameBuffer;
use crossterm::cursor::MoveTo;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, queue};

/// Terminal characters per Chip-8 pixel; terminal cells are roughly twice as tall as they are wide
const SCALE: usize = 2;

const PIXEL_ON: char = '█';
const PIXEL_OFF: char = ' ';

/// # Display
/// The Chip-8 display is composed of 64x32 black/white pixels.
/// The on/off state of these pixels is encoded as 1/0 respectively in the FrameBuffer.
/// The display only gets a call to `render` when the Chip-8 FrameBuffer is updated.
///
/// Frames are drawn as text to any writer, normally stdout.
pub struct Display<W: Write> {
    out: W,
}

impl<W: Write> Display<W> {
    /// Creates a new display and clears the terminal behind it.
    ///
    /// # Arguments
    /// * `out` where frames are written
    pub fn new(mut out: W) -> io::Result<Self> {
        execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;
        Ok(Display { out })
    }

    /// Formats a Chip-8 FrameBuffer as text.
    ///
    /// Each row of the frame becomes a line; each pixel is repeated `SCALE` times.
    ///
    /// # Arguments
    /// * `frame` a Chip-8 FrameBuffer
    fn frame_to_text(frame: &FrameBuffer) -> String {
        frame
            .chunks(DISPLAY_WIDTH)
            .map(|row| {
                row.iter()
                    .flat_map(|&pixel| {
                        let c = if pixel == 1 { PIXEL_ON } else { PIXEL_OFF };
                        std::iter::repeat(c).take(SCALE)
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Formats the Chip-8 FrameBuffer as text and writes it over the previous frame.
    ///
    /// Every row is placed with its own cursor move, so frames line up in raw mode too.
    ///
    /// # Arguments
    /// * `frame` a Chip-8 FrameBuffer
    pub fn render(&mut self, frame: &FrameBuffer) -> io::Result<()> {
        let text = Display::<W>::frame_to_text(frame);
        for (row, line) in text.lines().enumerate() {
            queue!(self.out, MoveTo(0, row as u16), Print(line))?;
        }
        self.out.flush()
    }

    /// Reports a beep on the line beneath the frame
    pub fn beep(&mut self) -> io::Result<()> {
        execute!(self.out, MoveTo(0, DISPLAY_HEIGHT as u16), Print("BEEP!"))
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::Command;

    fn ansi(command: impl Command) -> String {
        let mut out = String::new();
        command.write_ansi(&mut out).unwrap();
        out
    }

    #[test]
    fn test_frame_to_text() {
        let mut frame: FrameBuffer = [0; DISPLAY_WIDTH * DISPLAY_HEIGHT];
        frame[0..2].copy_from_slice(&[0, 1]);
        frame[DISPLAY_WIDTH..DISPLAY_WIDTH + 2].copy_from_slice(&[1, 0]);
        let text = Display::<Vec<u8>>::frame_to_text(&frame);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), DISPLAY_HEIGHT);
        assert!(lines[0].starts_with("  ██  "));
        assert!(lines[1].starts_with("██    "));
        assert_eq!(lines[2].chars().count(), DISPLAY_WIDTH * SCALE);
        assert!(lines[2].chars().all(|c| c == PIXEL_OFF));
    }

    #[test]
    fn test_new_clears_terminal() {
        let display = Display::new(Vec::new()).unwrap();
        let out = String::from_utf8(display.into_inner()).unwrap();
        assert_eq!(out, ansi(Clear(ClearType::All)) + &ansi(MoveTo(0, 0)));
    }

    #[test]
    fn test_render_places_every_row() {
        let mut frame: FrameBuffer = [0; DISPLAY_WIDTH * DISPLAY_HEIGHT];
        frame[DISPLAY_WIDTH * (DISPLAY_HEIGHT - 1)] = 1;
        let mut display = Display::new(Vec::new()).unwrap();
        let cleared = display.out.len();
        display.render(&frame).unwrap();
        let out = String::from_utf8(display.into_inner()).unwrap();
        let out = &out[cleared..];

        assert!(out.starts_with(&ansi(MoveTo(0, 0))));
        for row in 0..DISPLAY_HEIGHT {
            assert!(out.contains(&ansi(MoveTo(0, row as u16))));
        }
        let last_row = ansi(MoveTo(0, DISPLAY_HEIGHT as u16 - 1));
        let last_line = &out[out.find(&last_row).unwrap() + last_row.len()..];
        assert!(last_line.starts_with("██  "));
    }

    #[test]
    fn test_beep() {
        let mut display = Display::new(Vec::new()).unwrap();
        display.beep().unwrap();
        let out = String::from_utf8(display.into_inner()).unwrap();
        let beep_line = ansi(MoveTo(0, DISPLAY_HEIGHT as u16));
        assert!(out.ends_with(&format!("{}BEEP!", beep_line)));
    }
}
