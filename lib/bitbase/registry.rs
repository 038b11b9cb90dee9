use crate::bitbase::{Bitbase, Layout, Roster, Signature};
use crate::chess::{Board, Color, Flip};
use derive_more::with_trait::Display;
use log::{info, warn};
use rustc_hash::FxHashMap;
use std::io;
use std::path::{Path, PathBuf};

/// The result of a bitbase probe, from the probing side's perspective.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Value {
    /// No bitbase covers the position.
    #[display("unknown")]
    Unknown,
    /// The side to move loses.
    #[display("loss")]
    Loss,
    /// Neither side wins.
    #[display("draw")]
    Draw,
    /// The side to move does not win; a draw cannot be told from a loss.
    #[display("draw or loss")]
    DrawOrLoss,
    /// The side to move wins.
    #[display("win")]
    Win,
}

/// The registry of loaded bitbases, keyed by piece signature.
///
/// An explicit owner object: the engine holds one, tests hold their own.
/// Bitbases live here for the lifetime of the set; probes borrow.
#[derive(Debug, Default)]
pub struct BitbaseSet {
    bitbases: FxHashMap<Signature, Entry>,
    directory: PathBuf,
}

#[derive(Debug)]
struct Entry {
    layout: Layout,
    bitbase: Bitbase,
}

impl BitbaseSet {
    /// An empty set loading files from `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        BitbaseSet {
            bitbases: FxHashMap::default(),
            directory: directory.into(),
        }
    }

    /// The directory searched for `.btb` files.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The file a roster's bitbase is stored at.
    pub fn path_for(&self, roster: &Roster) -> PathBuf {
        self.directory.join(format!("{roster}.btb"))
    }

    /// Whether the bitbase named `name` is loaded.
    pub fn is_available(&self, name: &str) -> bool {
        match name.parse::<Roster>() {
            Ok(roster) => self.bitbases.contains_key(&roster.signature()),
            Err(_) => false,
        }
    }

    /// Attaches the bitbase named `name`, e.g. `"KPK"`, from the directory.
    ///
    /// Loading twice is a no-op.
    pub fn load(&mut self, name: &str) -> io::Result<()> {
        let roster: Roster = name
            .parse()
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;

        let signature = roster.signature();
        if self.bitbases.contains_key(&signature) {
            return Ok(());
        }

        let layout = Layout::new(roster.clone());
        let bitbase = Bitbase::attach(&self.path_for(&roster), signature)?;

        if bitbase.size_in_bits() != layout.size() {
            return Err(io::Error::from(io::ErrorKind::InvalidData));
        }

        info!("attached bitbase {roster}, {} positions", layout.size());
        self.bitbases.insert(signature, Entry { layout, bitbase });
        Ok(())
    }

    /// Expands `*` over Q, R, B, N, P and loads every match.
    ///
    /// Files that are missing or rejected are skipped with a log line.
    pub fn load_wildcard(&mut self, name: &str) {
        match name.find('*') {
            Some(i) => {
                for piece in ["Q", "R", "B", "N", "P"] {
                    let mut expanded = name.to_string();
                    expanded.replace_range(i..=i, piece);
                    self.load_wildcard(&expanded);
                }
            }

            None => {
                if let Err(e) = self.load(name) {
                    warn!("skipping bitbase {name}, {e}");
                }
            }
        }
    }

    /// Registers a bitbase built from an embedded file image.
    pub fn register_image(&mut self, name: &str, image: &[u8]) -> io::Result<()> {
        let roster: Roster = name
            .parse()
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;

        let bitbase =
            Bitbase::from_image(image).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        self.insert(&roster, bitbase);
        Ok(())
    }

    /// Registers a freshly generated bitbase.
    pub fn insert(&mut self, roster: &Roster, bitbase: Bitbase) {
        let layout = Layout::new(roster.clone());
        debug_assert_eq!(bitbase.size_in_bits(), layout.size());
        self.bitbases.insert(roster.signature(), Entry { layout, bitbase });
    }

    /// Probes the position on `board` from White's point of view.
    ///
    /// `Win` means White wins; everything else means White does not,
    /// unresolved probes are `Unknown`.
    pub fn value_from_single(&self, board: &Board) -> Value {
        let signature = Signature::from_board(board);
        if !signature.has_pieces(Color::White) {
            return Value::DrawOrLoss;
        }

        let Some(entry) = self.bitbases.get(&signature) else {
            return Value::Unknown;
        };

        let Some(index) = entry.layout.encode_board(board) else {
            return Value::Unknown;
        };

        match entry.bitbase.get(index) {
            Some(true) => Value::Win,
            Some(false) => Value::DrawOrLoss,
            None => Value::Unknown,
        }
    }

    /// Probes the position on `board` from the side to move's perspective.
    ///
    /// The bitbase stores wins for White only; the mirrored signature is
    /// probed for Black through the color-swapped index. A draw is only
    /// reported once both sides are known not to win.
    pub fn value(&self, board: &Board) -> Value {
        let signature = Signature::from_board(board);
        let turn = board.turn();

        // White's side of the story.
        let white_resolved = if !signature.has_mating_material(Color::White) {
            true
        } else {
            match self.probe_white(&signature, board) {
                Some(true) => {
                    return match turn {
                        Color::White => Value::Win,
                        Color::Black => Value::Loss,
                    };
                }
                Some(false) => true,
                None => false,
            }
        };

        // Black's, through the mirrored signature.
        let black_resolved = if !signature.has_mating_material(Color::Black) {
            true
        } else {
            match self.probe_black(&signature, board) {
                Some(true) => {
                    return match turn {
                        Color::White => Value::Loss,
                        Color::Black => Value::Win,
                    };
                }
                Some(false) => true,
                None => false,
            }
        };

        if white_resolved && black_resolved {
            Value::Draw
        } else {
            Value::Unknown
        }
    }

    fn probe_white(&self, signature: &Signature, board: &Board) -> Option<bool> {
        let entry = self.bitbases.get(signature)?;
        let index = entry.layout.encode_board(board)?;
        entry.bitbase.get(index)
    }

    fn probe_black(&self, signature: &Signature, board: &Board) -> Option<bool> {
        let entry = self.bitbases.get(&signature.flip())?;
        let index = entry.layout.encode_board_swapped(board)?;
        entry.bitbase.get(index)
    }
}
