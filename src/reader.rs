use std::collections::HashMap;

/// Opaque handle to a captured stream position.
///
/// Obtained from [`CharReader::get_restore_state`]; consumed by
/// [`CharReader::restore_state`] or discarded with
/// [`CharReader::clear_restore_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RestoreState(u64);

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    position: usize,
    line: u32,
    column: u32,
    after_cr: bool,
    limit: Option<usize>,
}

/// A character reader with line/column tracking and multiple concurrently
/// outstanding restore points.
///
/// The whole input is buffered up front (expressions are short strings), so
/// a restore point is a plain snapshot of the read position. Rolling back to
/// an older restore point never disturbs newer ones.
///
/// Line and column are 1-based. `\r`, `\n` and `\r\n` each count as a single
/// line break.
///
/// Restore-state misuse (restoring a handle twice, restoring past a bounded
/// handle's limit, resetting without a mark) is a caller bug and panics.
pub struct CharReader {
    chars: Vec<char>,
    position: usize,
    line: u32,
    column: u32,
    after_cr: bool,
    states: HashMap<u64, Snapshot>,
    next_id: u64,
    mark_slot: Option<Snapshot>,
}

impl CharReader {
    pub fn new(input: &str) -> Self {
        CharReader {
            chars: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            after_cr: false,
            states: HashMap::new(),
            next_id: 0,
            mark_slot: None,
        }
    }

    /// Absolute position of the next character to be read, in characters.
    pub fn position(&self) -> usize {
        self.position
    }

    /// 1-based line of the next character to be read.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-based column of the next character to be read.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Read one character, or `None` at end of input.
    pub fn read(&mut self) -> Option<char> {
        let ch = *self.chars.get(self.position)?;
        self.position += 1;
        match ch {
            '\r' => {
                self.line += 1;
                self.column = 1;
                self.after_cr = true;
            }
            '\n' if self.after_cr => {
                // Second half of a \r\n break; the line was already counted.
                self.after_cr = false;
            }
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            _ => {
                self.column += 1;
                self.after_cr = false;
            }
        }
        Some(ch)
    }

    /// Raw text between two absolute positions, for token echo.
    pub fn lexeme(&self, from: usize, to: usize) -> String {
        self.chars[from..to].iter().collect()
    }

    /// Capture the current position with unbounded look-back.
    pub fn get_restore_state(&mut self) -> RestoreState {
        self.register(None)
    }

    /// Capture the current position with bounded look-back: restoring after
    /// consuming more than `limit` characters is a contract violation.
    pub fn get_restore_state_limited(&mut self, limit: usize) -> RestoreState {
        self.register(Some(limit))
    }

    fn register(&mut self, limit: Option<usize>) -> RestoreState {
        let id = self.next_id;
        self.next_id += 1;
        self.states.insert(
            id,
            Snapshot {
                position: self.position,
                line: self.line,
                column: self.column,
                after_cr: self.after_cr,
                limit,
            },
        );
        RestoreState(id)
    }

    /// Rewind to a captured position, consuming the handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle was already restored or cleared, or if a bounded
    /// handle's look-back limit was exceeded.
    pub fn restore_state(&mut self, state: RestoreState) {
        let snap = self
            .states
            .remove(&state.0)
            .expect("restore state already consumed or never issued");
        if let Some(limit) = snap.limit {
            let consumed = self.position - snap.position;
            if consumed > limit {
                panic!(
                    "restore state overflow: {} characters consumed, limit was {}",
                    consumed, limit
                );
            }
        }
        self.apply(snap);
    }

    /// Discard a handle without rewinding.
    ///
    /// # Panics
    ///
    /// Panics if the handle was already restored or cleared.
    pub fn clear_restore_state(&mut self, state: RestoreState) {
        self.states
            .remove(&state.0)
            .expect("restore state already consumed or never issued");
    }

    /// Single-slot variant of [`get_restore_state_limited`], for interop
    /// with generic reader contracts. A second `mark` replaces the first.
    ///
    /// [`get_restore_state_limited`]: CharReader::get_restore_state_limited
    pub fn mark(&mut self, limit: usize) {
        self.mark_slot = Some(Snapshot {
            position: self.position,
            line: self.line,
            column: self.column,
            after_cr: self.after_cr,
            limit: Some(limit),
        });
    }

    /// Rewind to the position captured by [`mark`], consuming it.
    ///
    /// # Panics
    ///
    /// Panics without a prior `mark`, or if the mark's limit was exceeded.
    ///
    /// [`mark`]: CharReader::mark
    pub fn reset(&mut self) {
        let snap = self.mark_slot.take().expect("reset without a mark");
        if let Some(limit) = snap.limit {
            let consumed = self.position - snap.position;
            if consumed > limit {
                panic!(
                    "mark overflow: {} characters consumed, limit was {}",
                    consumed, limit
                );
            }
        }
        self.apply(snap);
    }

    fn apply(&mut self, snap: Snapshot) {
        self.position = snap.position;
        self.line = snap.line;
        self.column = snap.column;
        self.after_cr = snap.after_cr;
    }
}

#[test]
fn test_read_tracks_position() {
    let mut reader = CharReader::new("ab");
    assert_eq!((reader.line(), reader.column()), (1, 1));
    assert_eq!(reader.read(), Some('a'));
    assert_eq!((reader.line(), reader.column()), (1, 2));
    assert_eq!(reader.read(), Some('b'));
    assert_eq!(reader.read(), None);
    assert_eq!(reader.position(), 2);
}

#[test]
fn test_crlf_is_one_line_break() {
    let mut reader = CharReader::new("a\r\nb\nc\rd");
    for _ in 0..2 {
        reader.read();
    }
    // after "a\r"
    assert_eq!((reader.line(), reader.column()), (2, 1));
    reader.read(); // \n completes the same break
    assert_eq!((reader.line(), reader.column()), (2, 1));
    reader.read(); // b
    reader.read(); // \n
    assert_eq!((reader.line(), reader.column()), (3, 1));
    reader.read(); // c
    reader.read(); // \r
    assert_eq!((reader.line(), reader.column()), (4, 1));
    assert_eq!(reader.read(), Some('d'));
    assert_eq!((reader.line(), reader.column()), (4, 2));
}
