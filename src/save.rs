use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::prelude::*;
use chrono::TimeDelta;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Well-known auto-save slot file, next to the executable like the desktop
/// app's quick-save.
pub const AUTOSAVE_FILE: &str = "quicksave.ini";

/// Serialized form of a whole session.
///
/// The durable layout is INI-style text: `[game]` for the configuration,
/// `[session]` for state and counters, and `[board]` with one string per row,
/// one character per cell (see `encode_cell`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub width: Coord,
    pub height: Coord,
    pub mines: CellCount,
    pub state: SessionState,
    pub elapsed_secs: u32,
    pub revealed: CellCount,
    pub flagged: CellCount,
    pub rows: Vec<String>,
}

impl SaveRecord {
    /// Total for any session, finished games included.
    pub fn from_session(session: &GameSession) -> Self {
        let board = session.board();
        let mut rows = Vec::with_capacity(board.height() as usize);
        for r in 0..board.height() {
            let mut row = String::with_capacity(board.width() as usize);
            for c in 0..board.width() {
                row.push(encode_cell(board.cell((r, c)), board.is_mine((r, c))));
            }
            rows.push(row);
        }
        Self {
            width: board.width(),
            height: board.height(),
            mines: board.mine_count(),
            state: session.state(),
            elapsed_secs: session.elapsed_secs(),
            revealed: session.revealed_count(),
            flagged: session.flagged_count(),
            rows,
        }
    }

    pub fn to_ini_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "[game]");
        let _ = writeln!(out, "width = {}", self.width);
        let _ = writeln!(out, "height = {}", self.height);
        let _ = writeln!(out, "mines = {}", self.mines);
        let _ = writeln!(out);
        let _ = writeln!(out, "[session]");
        let _ = writeln!(out, "state = {}", state_token(self.state));
        let _ = writeln!(out, "elapsed = {}", self.elapsed_secs);
        let _ = writeln!(out, "revealed = {}", self.revealed);
        let _ = writeln!(out, "flags = {}", self.flagged);
        let _ = writeln!(out);
        let _ = writeln!(out, "[board]");
        for (r, row) in self.rows.iter().enumerate() {
            let _ = writeln!(out, "row{r} = {row}");
        }
        out
    }

    pub fn from_ini_str(text: &str) -> Result<Self> {
        let doc = IniDoc::parse(text)?;

        let width: Coord = parse_num("game", "width", doc.require("game", "width")?)?;
        let height: Coord = parse_num("game", "height", doc.require("game", "height")?)?;
        let mines: CellCount = parse_num("game", "mines", doc.require("game", "mines")?)?;

        let state_raw = doc.require("session", "state")?;
        let state = parse_state(state_raw).ok_or_else(|| {
            GameError::CorruptSave(format!("unknown session state `{state_raw}`"))
        })?;
        let elapsed_secs = match doc.get("session", "elapsed") {
            Some(value) => parse_num("session", "elapsed", value)?,
            None => 0,
        };
        let revealed = match doc.get("session", "revealed") {
            Some(value) => parse_num("session", "revealed", value)?,
            None => 0,
        };
        let flagged = match doc.get("session", "flags") {
            Some(value) => parse_num("session", "flags", value)?,
            None => 0,
        };

        let mut rows = Vec::with_capacity(height as usize);
        for r in 0..height {
            rows.push(doc.require("board", &format!("row{r}"))?.to_string());
        }

        Ok(Self {
            width,
            height,
            mines,
            state,
            elapsed_secs,
            revealed,
            flagged,
            rows,
        })
    }

    /// Rebuilds a session, with mines already placed for started games.
    ///
    /// Counters are always recomputed from the cell grid; stored counters
    /// that disagree are discarded with a warning rather than failing, so a
    /// record with a stale mine or flag count still loads. Structural
    /// problems (wrong row sizes, unknown characters, impossible states) are
    /// `CorruptSave`.
    pub fn into_session(self) -> Result<GameSession> {
        if self.rows.len() != self.height as usize {
            return Err(GameError::CorruptSave(format!(
                "expected {} board rows, found {}",
                self.height,
                self.rows.len()
            )));
        }

        let dim = [self.height as usize, self.width as usize];
        let mut markers: Array2<CellState> = Array2::default(dim);
        let mut mask: Array2<bool> = Array2::default(dim);
        for (r, row) in self.rows.iter().enumerate() {
            if row.chars().count() != self.width as usize {
                return Err(GameError::CorruptSave(format!(
                    "row {r} has {} cells, expected {}",
                    row.chars().count(),
                    self.width
                )));
            }
            for (c, ch) in row.chars().enumerate() {
                let (marker, mine) = decode_cell(ch).ok_or_else(|| {
                    GameError::CorruptSave(format!("unknown cell character `{ch}` in row {r}"))
                })?;
                markers[[r, c]] = marker;
                mask[[r, c]] = mine;
            }
        }

        let counted_mines = mask.iter().filter(|&&mine| mine).count() as CellCount;
        let revealed_mines = markers
            .iter()
            .zip(mask.iter())
            .any(|(marker, &mine)| mine && marker.is_revealed());
        if revealed_mines && self.state != SessionState::Lost {
            return Err(GameError::CorruptSave(
                "revealed mine in a game that was not lost".into(),
            ));
        }

        let mines = if self.state.is_initial() {
            if counted_mines > 0 {
                return Err(GameError::CorruptSave(
                    "mine layout recorded for a game that has not started".into(),
                ));
            }
            if markers.iter().any(|marker| marker.is_revealed()) {
                return Err(GameError::CorruptSave(
                    "revealed cells recorded for a game that has not started".into(),
                ));
            }
            self.mines
        } else {
            if counted_mines != self.mines {
                log::warn!(
                    "stored mine count {} disagrees with the board, using {}",
                    self.mines,
                    counted_mines
                );
            }
            counted_mines
        };

        let config = GameConfig::new(self.width, self.height, mines).map_err(|_| {
            GameError::CorruptSave(format!(
                "impossible configuration: {}x{} with {} mines",
                self.width, self.height, mines
            ))
        })?;

        let mut board = Board::new(config)?;
        if !self.state.is_initial() {
            board.place_mines_from_mask(mask);
        }
        let mut revealed_count: CellCount = 0;
        let mut flagged_count: CellCount = 0;
        for pos in board.iter_coords() {
            match markers[pos.nd()] {
                CellState::Hidden => {}
                CellState::Flagged => {
                    board.set_cell(pos, CellState::Flagged);
                    flagged_count += 1;
                }
                CellState::Question => board.set_cell(pos, CellState::Question),
                CellState::Revealed(_) => {
                    board.set_cell(pos, CellState::Revealed(board.adjacent_mines(pos)));
                    if !board.is_mine(pos) {
                        revealed_count += 1;
                    }
                }
            }
        }

        if revealed_count != self.revealed {
            log::warn!(
                "stored revealed count {} disagrees with the board, using {}",
                self.revealed,
                revealed_count
            );
        }
        if flagged_count != self.flagged {
            log::warn!(
                "stored flag count {} disagrees with the board, using {}",
                self.flagged,
                flagged_count
            );
        }

        let now = Utc::now();
        let (started_at, ended_at) = match self.state {
            SessionState::NotStarted => (None, None),
            SessionState::InProgress => {
                (Some(now - TimeDelta::seconds(self.elapsed_secs.into())), None)
            }
            SessionState::Won | SessionState::Lost => (
                Some(now - TimeDelta::seconds(self.elapsed_secs.into())),
                Some(now),
            ),
        };

        Ok(GameSession::from_parts(
            board,
            self.state,
            revealed_count,
            flagged_count,
            started_at,
            ended_at,
        ))
    }
}

pub fn save_game<P: AsRef<Path>>(path: P, session: &GameSession) -> Result<()> {
    let text = SaveRecord::from_session(session).to_ini_string();
    fs::write(path, text)?;
    Ok(())
}

pub fn load_game<P: AsRef<Path>>(path: P) -> Result<GameSession> {
    let text = fs::read_to_string(path)?;
    SaveRecord::from_ini_str(&text)?.into_session()
}

/// Fixed-path auto-save, updated after every state-changing action and
/// consulted at startup to offer resuming the interrupted game.
#[derive(Clone, Debug)]
pub struct AutosaveSlot {
    path: PathBuf,
}

impl AutosaveSlot {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Callers persist only after the action is fully applied in memory.
    pub fn store(&self, session: &GameSession) -> Result<()> {
        save_game(&self.path, session)
    }

    /// `Ok(None)` when no auto-save exists.
    pub fn restore(&self) -> Result<Option<GameSession>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        SaveRecord::from_ini_str(&text)?.into_session().map(Some)
    }

    /// Drops the slot, used when a new game starts. Missing files are fine.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl Default for AutosaveSlot {
    fn default() -> Self {
        Self::at(AUTOSAVE_FILE)
    }
}

/// One character per cell: mine, marker, and revealed bits folded together.
fn encode_cell(state: CellState, mine: bool) -> char {
    match (state, mine) {
        (CellState::Hidden, false) => '.',
        (CellState::Hidden, true) => '*',
        (CellState::Flagged, false) => 'F',
        (CellState::Flagged, true) => 'M',
        (CellState::Question, false) => '?',
        (CellState::Question, true) => 'Q',
        (CellState::Revealed(_), false) => 'o',
        (CellState::Revealed(_), true) => 'x',
    }
}

fn decode_cell(ch: char) -> Option<(CellState, bool)> {
    // Revealed counts are not stored, they are recomputed from the layout.
    Some(match ch {
        '.' => (CellState::Hidden, false),
        '*' => (CellState::Hidden, true),
        'F' => (CellState::Flagged, false),
        'M' => (CellState::Flagged, true),
        '?' => (CellState::Question, false),
        'Q' => (CellState::Question, true),
        'o' => (CellState::Revealed(0), false),
        'x' => (CellState::Revealed(0), true),
        _ => return None,
    })
}

fn state_token(state: SessionState) -> &'static str {
    match state {
        SessionState::NotStarted => "not-started",
        SessionState::InProgress => "in-progress",
        SessionState::Won => "won",
        SessionState::Lost => "lost",
    }
}

fn parse_state(token: &str) -> Option<SessionState> {
    Some(match token {
        "not-started" => SessionState::NotStarted,
        "in-progress" => SessionState::InProgress,
        "won" => SessionState::Won,
        "lost" => SessionState::Lost,
        _ => return None,
    })
}

fn parse_num<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        GameError::CorruptSave(format!("[{section}] {key}: `{value}` is not a valid number"))
    })
}

/// Minimal INI reader: sections, `key = value` lines, `;`/`#` comments.
/// Unknown sections and keys are ignored by the callers.
#[derive(Default)]
struct IniDoc {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl IniDoc {
    fn parse(text: &str) -> Result<Self> {
        let mut doc = Self::default();
        let mut current = String::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current = name.trim().to_ascii_lowercase();
                doc.sections.entry(current.clone()).or_default();
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(GameError::CorruptSave(format!(
                    "line {}: expected `key = value`",
                    lineno + 1
                )));
            };
            doc.sections
                .entry(current.clone())
                .or_default()
                .insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
        Ok(doc)
    }

    fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    fn require(&self, section: &str, key: &str) -> Result<&str> {
        self.get(section, key)
            .ok_or_else(|| GameError::CorruptSave(format!("missing key [{section}] {key}")))
    }
}
