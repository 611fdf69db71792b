use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use chip8_core::constants::KEY_COUNT;
use chip8_core::{Chip8, Chip8Error, Quirks, StepStatus};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal;
use display::Display;
use log::{info, warn};

use crate::keymap::keymap;

/// Instructions per second, close to the speed of the original interpreters
pub const DEFAULT_CLOCK_SPEED: u64 = 500;

/// How long a key stays down after it's pressed; terminals report presses but not releases
const KEY_HOLD_MILLIS: u64 = 100;

/// A key pressed at a given cycle, written as `<key>@<cycle>` (e.g. `w@120`).
/// Keys use the QWERTY layout described in `keymap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: u8,
    pub at: u64,
}

impl FromStr for KeyPress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, at) = s
            .split_once('@')
            .ok_or_else(|| format!("expected <key>@<cycle> but got {:?}", s))?;
        let mut chars = key.chars();
        let key = match (chars.next(), chars.next()) {
            (Some(c), None) => keymap(c).ok_or_else(|| format!("{:?} is not a keypad key", c))?,
            _ => return Err(format!("expected a single key but got {:?}", key)),
        };
        let at = at
            .parse()
            .map_err(|e| format!("invalid cycle {:?}: {}", at, e))?;
        Ok(KeyPress { key, at })
    }
}

pub struct Settings {
    pub rom: PathBuf,
    pub clock_speed: u64,
    pub cycles: Option<u64>,
    pub fast_forward: bool,
    pub presses: Vec<KeyPress>,
    pub keyboard: bool,
    pub quirks: Quirks,
}

/// What a terminal event means to the run loop
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Key(u8),
    Quit,
    Ignored,
}

/// Maps a terminal event onto the keypad; Esc and Ctrl-C quit
fn translate(event: &Event) -> Input {
    match event {
        Event::Key(KeyEvent {
            code: KeyCode::Esc, ..
        }) => Input::Quit,
        Event::Key(KeyEvent {
            code: KeyCode::Char('c'),
            modifiers,
            ..
        }) if modifiers.contains(KeyModifiers::CONTROL) => Input::Quit,
        Event::Key(KeyEvent {
            code: KeyCode::Char(c),
            ..
        }) => keymap(*c).map_or(Input::Ignored, Input::Key),
        _ => Input::Ignored,
    }
}

/// Number of cycles that make up `KEY_HOLD_MILLIS` at the given clock speed
fn hold_cycles(clock_speed: u64) -> u64 {
    (clock_speed.saturating_mul(KEY_HOLD_MILLIS) / 1000).max(1)
}

/// Keys held down by the host, each released a fixed number of cycles after its last press
struct Keypad {
    hold: u64,
    release_at: [Option<u64>; KEY_COUNT],
}

impl Keypad {
    fn new(hold: u64) -> Self {
        Keypad {
            hold,
            release_at: [None; KEY_COUNT],
        }
    }

    /// Presses `key`, or keeps it down for longer if it already is
    fn press(&mut self, chip8: &mut Chip8, key: u8, cycle: u64) {
        if let Some(release_at) = self.release_at.get_mut(key as usize) {
            *release_at = Some(cycle.saturating_add(self.hold));
            chip8.key_press(key);
        }
    }

    /// Releases every key whose hold has run out by `cycle`
    fn release_expired(&mut self, chip8: &mut Chip8, cycle: u64) {
        for (key, release_at) in self.release_at.iter_mut().enumerate() {
            if release_at.map_or(false, |at| at <= cycle) {
                *release_at = None;
                chip8.key_release(key as u8);
            }
        }
    }
}

/// Applies the scripted key presses that start on `cycle`
fn update_keys(chip8: &mut Chip8, keypad: &mut Keypad, presses: &[KeyPress], cycle: u64) {
    keypad.release_expired(chip8, cycle);
    for press in presses.iter().filter(|press| press.at == cycle) {
        keypad.press(chip8, press.key, cycle);
    }
}

/// Puts the terminal in raw mode so key presses arrive as they happen; restored on drop
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("failed to restore the terminal: {}", e);
        }
    }
}

pub fn run(settings: Settings) -> Result<(), Box<dyn Error>> {
    let mut chip8 = Chip8::new().with_quirks(settings.quirks);

    // Load ROM
    let file = File::open(&settings.rom).map_err(Chip8Error::SourceUnavailable)?;
    let mut reader = BufReader::new(file);
    chip8.load_rom(&mut reader)?;
    info!("loaded {}", settings.rom.display());

    let _raw_mode = if settings.keyboard {
        Some(RawMode::enable()?)
    } else {
        None
    };
    let mut display = Display::new(io::stdout())?;
    let mut keypad = Keypad::new(hold_cycles(settings.clock_speed));

    // Set initial timing
    let cycle_time = Duration::from_nanos(1_000_000_000 / settings.clock_speed.max(1));
    let mut last_cycle = Instant::now();

    let mut cycle: u64 = 0;
    'running: loop {
        if settings.cycles.map_or(false, |limit| cycle >= limit) {
            info!("stopping after {} cycles", cycle);
            break;
        }

        // Handle input
        update_keys(&mut chip8, &mut keypad, &settings.presses, cycle);
        while settings.keyboard && event::poll(Duration::from_millis(0))? {
            match translate(&event::read()?) {
                Input::Key(key) => keypad.press(&mut chip8, key, cycle),
                Input::Quit => break 'running,
                Input::Ignored => {}
            }
        }
        cycle += 1;

        // Update state; unknown opcodes are logged by the interpreter and skipped
        match chip8.step() {
            Ok(StepStatus::Halted) => break,
            Ok(_) => {}
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(_) => {}
        }

        // If the draw flag is set, unset it and render the current frame
        if let Some(frame) = chip8.take_frame() {
            display.render(&frame)?;
        }
        if chip8.beep() {
            display.beep()?;
        }

        // Handle timing
        let current_time = Instant::now();
        let elapsed_cycle_time = current_time - last_cycle;
        if !settings.fast_forward && cycle_time > elapsed_cycle_time {
            std::thread::sleep(cycle_time - elapsed_cycle_time);
        }
        last_cycle = Instant::now();
    }

    Ok(())
}
