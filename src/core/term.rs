//! Terminal size query

/// Conventional fallback when the terminal cannot be queried
pub const DEFAULT_TERM_SIZE: (usize, usize) = (80, 24);

/// Return the terminal `(width, height)`, falling back to 80x24.
pub fn term_size() -> (usize, usize) {
    match terminal_size::terminal_size() {
        Some((w, h)) => (w.0 as usize, h.0 as usize),
        None => DEFAULT_TERM_SIZE,
    }
}
