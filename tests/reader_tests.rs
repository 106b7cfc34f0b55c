// tests/reader_tests.rs

use sorrel::reader::CharReader;

// ============================================================================
// Reading and position tracking
// ============================================================================

#[test]
fn test_read_to_end() {
    let mut reader = CharReader::new("ab");
    assert_eq!(reader.read(), Some('a'));
    assert_eq!(reader.read(), Some('b'));
    assert_eq!(reader.read(), None);
    assert_eq!(reader.read(), None);
}

#[test]
fn test_positions_start_at_one() {
    let reader = CharReader::new("abc");
    assert_eq!(reader.line(), 1);
    assert_eq!(reader.column(), 1);
    assert_eq!(reader.position(), 0);
}

#[test]
fn test_column_advances_per_char() {
    let mut reader = CharReader::new("abc");
    reader.read();
    reader.read();
    assert_eq!((reader.line(), reader.column(), reader.position()), (1, 3, 2));
}

#[test]
fn test_newline_variants_each_count_once() {
    // \n, \r and \r\n are each a single line break
    let mut reader = CharReader::new("a\nb\rc\r\nd");
    reader.read(); // a
    reader.read(); // \n
    assert_eq!((reader.line(), reader.column()), (2, 1));
    reader.read(); // b
    reader.read(); // \r
    assert_eq!((reader.line(), reader.column()), (3, 1));
    reader.read(); // c
    reader.read(); // \r
    assert_eq!((reader.line(), reader.column()), (4, 1));
    reader.read(); // \n of \r\n: same break, no double increment
    assert_eq!((reader.line(), reader.column()), (4, 1));
    assert_eq!(reader.read(), Some('d'));
    assert_eq!((reader.line(), reader.column()), (4, 2));
}

#[test]
fn test_lexeme() {
    let mut reader = CharReader::new("hello world");
    for _ in 0..5 {
        reader.read();
    }
    assert_eq!(reader.lexeme(0, 5), "hello");
    assert_eq!(reader.lexeme(6, 11), "world");
}

// ============================================================================
// Restore states
// ============================================================================

#[test]
fn test_restore_rewinds_position() {
    let mut reader = CharReader::new("abc\ndef");
    reader.read();
    let state = reader.get_restore_state();
    for _ in 0..5 {
        reader.read();
    }
    assert_eq!((reader.line(), reader.column()), (2, 3));
    reader.restore_state(state);
    assert_eq!((reader.line(), reader.column(), reader.position()), (1, 2, 1));
    assert_eq!(reader.read(), Some('b'));
}

#[test]
fn test_outer_restore_leaves_inner_consistent() {
    // Two nested restore points; rolling back the outer one first must
    // leave the stream exactly at the outer capture, and the inner handle
    // must still restore correctly afterwards.
    let mut reader = CharReader::new("one\ntwo\nthree");
    reader.read(); // o
    let outer = reader.get_restore_state();
    let outer_pos = (reader.line(), reader.column(), reader.position());
    for _ in 0..5 {
        reader.read();
    }
    let inner = reader.get_restore_state();
    let inner_pos = (reader.line(), reader.column(), reader.position());
    for _ in 0..4 {
        reader.read();
    }

    reader.restore_state(outer);
    assert_eq!((reader.line(), reader.column(), reader.position()), outer_pos);

    reader.restore_state(inner);
    assert_eq!((reader.line(), reader.column(), reader.position()), inner_pos);
}

#[test]
fn test_restore_preserves_pending_crlf_state() {
    // Restoring between the \r and \n of a \r\n pair must not turn the \n
    // into a second line break.
    let mut reader = CharReader::new("a\r\nb");
    reader.read(); // a
    reader.read(); // \r
    let state = reader.get_restore_state();
    reader.read(); // \n
    reader.read(); // b
    reader.restore_state(state);
    assert_eq!((reader.line(), reader.column()), (2, 1));
    reader.read(); // \n again
    assert_eq!((reader.line(), reader.column()), (2, 1));
}

#[test]
fn test_clear_then_read_on() {
    let mut reader = CharReader::new("abcd");
    let state = reader.get_restore_state();
    reader.read();
    reader.clear_restore_state(state);
    assert_eq!(reader.read(), Some('b'));
}

#[test]
fn test_bounded_restore_within_limit() {
    let mut reader = CharReader::new("abcdef");
    let state = reader.get_restore_state_limited(3);
    reader.read();
    reader.read();
    reader.restore_state(state);
    assert_eq!(reader.read(), Some('a'));
}

#[test]
#[should_panic(expected = "overflow")]
fn test_bounded_restore_overflow_panics() {
    let mut reader = CharReader::new("abcdef");
    let state = reader.get_restore_state_limited(2);
    for _ in 0..4 {
        reader.read();
    }
    reader.restore_state(state);
}

#[test]
#[should_panic(expected = "already consumed")]
fn test_double_restore_panics() {
    let mut reader = CharReader::new("abc");
    let state = reader.get_restore_state();
    reader.read();
    reader.restore_state(state);
    reader.restore_state(state);
}

#[test]
#[should_panic(expected = "already consumed")]
fn test_restore_after_clear_panics() {
    let mut reader = CharReader::new("abc");
    let state = reader.get_restore_state();
    reader.clear_restore_state(state);
    reader.restore_state(state);
}

// ============================================================================
// mark/reset single-slot variant
// ============================================================================

#[test]
fn test_mark_reset() {
    let mut reader = CharReader::new("abc");
    reader.read();
    reader.mark(5);
    reader.read();
    reader.read();
    reader.reset();
    assert_eq!(reader.read(), Some('b'));
}

#[test]
#[should_panic(expected = "without a mark")]
fn test_reset_without_mark_panics() {
    let mut reader = CharReader::new("abc");
    reader.reset();
}

#[test]
#[should_panic(expected = "overflow")]
fn test_reset_past_limit_panics() {
    let mut reader = CharReader::new("abcdef");
    reader.mark(1);
    reader.read();
    reader.read();
    reader.reset();
}
