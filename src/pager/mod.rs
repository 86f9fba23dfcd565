//! Interactive pager
//!
//! A `more`-style state machine over a lazily materialized line buffer.
//! Logical lines are wrapped to terminal width (ANSI escape sequences do
//! not count toward the width budget) and streamed in chunks; at each chunk
//! boundary a small command language drives the viewport. Callers bypass
//! the pager entirely when output is not an interactive terminal.

use std::io::{BufRead, Write};

/// How a paging run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerOutcome {
    /// Source exhausted
    Finished,
    /// User asked for the next file
    NextFile,
    /// User quit; remaining output is suppressed
    Quit,
    /// End-of-input at the prompt; abort the whole multi-file operation
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PagerState {
    Loading,
    Displaying,
    AwaitingCommand,
    Done,
}

/// A monotonically growing line buffer over a forward-only producer.
///
/// A request for index `i` pulls from the producer until the buffer holds
/// at least `i + 1` lines or the producer is exhausted; the buffer never
/// shrinks.
pub struct LazyLines {
    source: Option<Box<dyn Iterator<Item = String>>>,
    buffer: Vec<String>,
}

impl LazyLines {
    pub fn from_vec(lines: Vec<String>) -> Self {
        Self {
            source: None,
            buffer: lines,
        }
    }

    pub fn from_iter(source: impl Iterator<Item = String> + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
            buffer: Vec::new(),
        }
    }

    /// Number of lines materialized so far
    pub fn loaded(&self) -> usize {
        self.buffer.len()
    }

    pub fn get(&mut self, index: usize) -> Option<&str> {
        while self.buffer.len() <= index {
            match self.source.as_mut().and_then(|s| s.next()) {
                Some(line) => self.buffer.push(line),
                None => {
                    self.source = None;
                    break;
                }
            }
        }
        self.buffer.get(index).map(|s| s.as_str())
    }

    /// Drain the producer completely; needed to resolve negative offsets.
    pub fn materialize_all(&mut self) -> usize {
        if let Some(source) = self.source.take() {
            self.buffer.extend(source);
        }
        self.buffer.len()
    }
}

enum Action {
    /// Start a fresh chunk with the given budget
    Resume(usize),
    /// Re-enter the display loop without resetting the chunk counter
    Bounce,
    Reprompt,
    Next,
    Quit,
}

/// The pager state machine
pub struct Pager {
    lines: LazyLines,
    width: usize,
    height: usize,
    /// Index of the next line to render
    cursor: usize,
    /// Pending sub-line renders to suppress
    skip: usize,
}

impl Pager {
    pub fn new(lines: LazyLines, term: (usize, usize)) -> Self {
        Self {
            lines,
            width: term.0.max(1),
            height: term.1.max(1),
            cursor: 0,
            skip: 0,
        }
    }

    /// Run the state machine until the source is exhausted or the user
    /// leaves. Commands are read from `input`, one per prompt.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: &mut R,
        out: &mut W,
    ) -> std::io::Result<PagerOutcome> {
        let mut state = PagerState::Loading;
        let mut budget = self.height;
        let mut rendered = 0usize;

        loop {
            match state {
                PagerState::Loading => {
                    // Initial fill commits to the terminal-height chunk
                    budget = self.height;
                    rendered = 0;
                    state = PagerState::Displaying;
                }
                PagerState::Displaying => {
                    if rendered >= budget {
                        state = PagerState::AwaitingCommand;
                        continue;
                    }
                    let line = match self.lines.get(self.cursor) {
                        Some(line) => line.to_string(),
                        None => {
                            state = PagerState::Done;
                            continue;
                        }
                    };
                    self.cursor += 1;
                    for sub in wrap_line(&line, self.width) {
                        if self.skip > 0 {
                            self.skip -= 1;
                            continue;
                        }
                        writeln!(out, "{}", sub)?;
                        rendered += 1;
                    }
                }
                PagerState::AwaitingCommand => {
                    write!(out, "-- More -- ")?;
                    out.flush()?;
                    let mut command = String::new();
                    if input.read_line(&mut command)? == 0 {
                        // End-of-input at the prompt cancels the operation
                        return Ok(PagerOutcome::Cancelled);
                    }
                    match self.interpret(command.trim(), out)? {
                        Action::Resume(new_budget) => {
                            budget = new_budget.max(1);
                            rendered = 0;
                            state = PagerState::Displaying;
                        }
                        Action::Bounce => state = PagerState::Displaying,
                        Action::Reprompt => {}
                        Action::Next => return Ok(PagerOutcome::NextFile),
                        Action::Quit => return Ok(PagerOutcome::Quit),
                    }
                }
                PagerState::Done => return Ok(PagerOutcome::Finished),
            }
        }
    }

    fn interpret<W: Write>(&mut self, command: &str, out: &mut W) -> std::io::Result<Action> {
        if command.contains('\u{11}') {
            return Ok(Action::Quit);
        }
        if command.is_empty() {
            return Ok(Action::Resume(self.height));
        }
        if command == "?" {
            self.print_help(out)?;
            return Ok(Action::Reprompt);
        }

        let word: String = command
            .chars()
            .take_while(|c| c.is_alphabetic())
            .collect::<String>()
            .to_uppercase();
        let rest = command[word.len()..].trim();
        let number: Option<i64> = if rest.is_empty() {
            None
        } else {
            match rest.parse() {
                Ok(n) => Some(n),
                Err(_) => {
                    writeln!(out, "invalid command: {}", command)?;
                    return Ok(Action::Reprompt);
                }
            }
        };

        match word.as_str() {
            "H" | "HELP" => {
                self.print_help(out)?;
                Ok(Action::Reprompt)
            }
            "Q" | "QUIT" => Ok(Action::Quit),
            "N" | "NEXT" => Ok(Action::Next),
            "L" | "LINE" => {
                writeln!(out, "line {}", self.cursor)?;
                Ok(Action::Reprompt)
            }
            "D" | "DOWN" => {
                let n = number.unwrap_or(1);
                if n >= 0 {
                    // One-shot step: the next chunk is sized n (0 = auto),
                    // after which the terminal-height convention returns
                    let step = if n == 0 { self.height } else { n as usize };
                    Ok(Action::Resume(step))
                } else {
                    let delta = n + self.height as i64;
                    let cursor = self.cursor as i64 - delta;
                    self.cursor = cursor.max(0) as usize;
                    Ok(Action::Resume(self.height))
                }
            }
            "S" | "SKIP" => {
                self.skip = number.unwrap_or(1).max(0) as usize;
                Ok(Action::Bounce)
            }
            "J" | "JUMP" => {
                let n = number.unwrap_or(self.cursor as i64 + 1);
                if n < 0 {
                    // Negative offsets count from end-of-file and force
                    // full materialization of the lazy source
                    let total = self.lines.materialize_all() as i64;
                    self.cursor = (total + n).max(0) as usize;
                } else if n <= 1 {
                    // 0 and 1 both mean the first line
                    self.cursor = 0;
                } else {
                    self.cursor = n as usize;
                }
                Ok(Action::Bounce)
            }
            _ => {
                writeln!(out, "invalid command: {}", command)?;
                Ok(Action::Reprompt)
            }
        }
    }

    fn print_help<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "pager commands:")?;
        writeln!(out, "  <enter>      show the next page")?;
        writeln!(out, "  h, help, ?   show this help")?;
        writeln!(out, "  q, quit      stop all output")?;
        writeln!(out, "  n, next      skip to the next file")?;
        writeln!(out, "  l, line      show the current line number")?;
        writeln!(out, "  d, down [n]  show n lines (negative: move back)")?;
        writeln!(out, "  s, skip [n]  suppress the next n lines")?;
        writeln!(out, "  j, jump [n]  jump to line n (negative: from end)")?;
        Ok(())
    }
}

/// Split a logical line into chunks of at most `width` visible characters.
///
/// An escape sequence is `ESC` followed by a run of non-alphabetic
/// characters terminated by an alphabetic one; it is passed through without
/// counting toward the width budget.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut visible = 0usize;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            current.push(c);
            for follow in chars.by_ref() {
                current.push(follow);
                if follow.is_alphabetic() {
                    break;
                }
            }
            continue;
        }
        if visible == width {
            chunks.push(std::mem::take(&mut current));
            visible = 0;
        }
        current.push(c);
        visible += 1;
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Visible width of a line, escape sequences excluded.
pub fn visible_width(line: &str) -> usize {
    let mut count = 0usize;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for follow in chars.by_ref() {
                if follow.is_alphabetic() {
                    break;
                }
            }
            continue;
        }
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn numbered_lines(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("line {}", i)).collect()
    }

    fn run_pager(lines: Vec<String>, term: (usize, usize), input: &str) -> (PagerOutcome, String) {
        let mut pager = Pager::new(LazyLines::from_vec(lines), term);
        let mut out = Vec::new();
        let outcome = pager
            .run(&mut Cursor::new(input.as_bytes().to_vec()), &mut out)
            .unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_short_source_finishes_without_prompt() {
        let (outcome, output) = run_pager(numbered_lines(3), (80, 24), "");
        assert_eq!(outcome, PagerOutcome::Finished);
        assert!(output.contains("line 3"));
        assert!(!output.contains("-- More --"));
    }

    #[test]
    fn test_chunk_boundary_prompts() {
        let (outcome, output) = run_pager(numbered_lines(30), (80, 10), "\n\n\n");
        assert_eq!(outcome, PagerOutcome::Finished);
        assert!(output.contains("-- More --"));
        assert!(output.contains("line 30"));
    }

    #[test]
    fn test_quit_suppresses_remaining() {
        let (outcome, output) = run_pager(numbered_lines(30), (80, 10), "q\n");
        assert_eq!(outcome, PagerOutcome::Quit);
        assert!(output.contains("line 10"));
        assert!(!output.contains("line 11"));
    }

    #[test]
    fn test_next_abandons_source() {
        let (outcome, _) = run_pager(numbered_lines(30), (80, 10), "next\n");
        assert_eq!(outcome, PagerOutcome::NextFile);
    }

    #[test]
    fn test_eof_at_prompt_cancels() {
        let (outcome, _) = run_pager(numbered_lines(30), (80, 10), "");
        assert_eq!(outcome, PagerOutcome::Cancelled);
    }

    #[test]
    fn test_jump_skip_blank_scenario() {
        // 500 lines, height 28: J100, S5, blank; the next rendered line
        // after the resumed chunk boundary is line 106
        let (outcome, output) = run_pager(numbered_lines(500), (120, 28), "J100\nS5\n\nq\n");
        assert_eq!(outcome, PagerOutcome::Quit);

        let after_jump = output.split("-- More --").nth(3).unwrap();
        let first_rendered = after_jump
            .lines()
            .map(|l| l.trim_start())
            .find(|l| l.starts_with("line "))
            .unwrap();
        assert_eq!(first_rendered, "line 106");
        assert!(!output.contains("line 105\n"));
    }

    #[test]
    fn test_down_sets_one_shot_step() {
        // First chunk of 10, then D3 shows exactly 3 lines before prompting
        let (_, output) = run_pager(numbered_lines(40), (80, 10), "d3\nq\n");
        assert!(output.contains("line 13"));
        assert!(!output.contains("line 14"));
    }

    #[test]
    fn test_down_negative_moves_back() {
        // After 10 lines, D-8 moves the cursor back by (-8 + 10) = 2
        let (_, output) = run_pager(numbered_lines(40), (80, 10), "d-8\nq\n");
        let repeats = output.matches("line 9\n").count();
        assert_eq!(repeats, 2);
    }

    #[test]
    fn test_jump_zero_and_one_mean_first_line() {
        let (_, output) = run_pager(numbered_lines(40), (80, 10), "j1\n\nq\n");
        let repeats = output.matches("line 1\n").count();
        assert_eq!(repeats, 2);
    }

    #[test]
    fn test_negative_jump_counts_from_end() {
        let mut pager = Pager::new(
            LazyLines::from_iter(numbered_lines(50).into_iter()),
            (80, 10),
        );
        let mut out = Vec::new();
        let outcome = pager
            .run(&mut Cursor::new(b"j-3\n\nq\n".to_vec()), &mut out)
            .unwrap();
        // Forced materialization resolves the offset; the last 3 lines show
        assert_eq!(outcome, PagerOutcome::Finished);
        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("line 48"));
        assert!(output.contains("line 50"));
    }

    #[test]
    fn test_line_command_reports_position() {
        let (_, output) = run_pager(numbered_lines(40), (80, 10), "l\nq\n");
        assert!(output.contains("line 10\n-- More -- line 10"));
    }

    #[test]
    fn test_invalid_command_reprompts() {
        let (outcome, output) = run_pager(numbered_lines(40), (80, 10), "wat\nq\n");
        assert_eq!(outcome, PagerOutcome::Quit);
        assert!(output.contains("invalid command: wat"));
    }

    #[test]
    fn test_lazy_buffer_grows_monotonically() {
        let mut lines = LazyLines::from_iter((0..10).map(|i| i.to_string()));
        assert_eq!(lines.loaded(), 0);
        assert_eq!(lines.get(3), Some("3"));
        assert_eq!(lines.loaded(), 4);
        assert_eq!(lines.get(1), Some("1"));
        assert_eq!(lines.loaded(), 4);
        assert_eq!(lines.materialize_all(), 10);
        assert_eq!(lines.get(20), None);
        assert_eq!(lines.loaded(), 10);
    }

    #[test]
    fn test_wrap_line_plain() {
        assert_eq!(wrap_line("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_line("", 4), vec![""]);
        assert_eq!(wrap_line("abcd", 4), vec!["abcd"]);
    }

    #[test]
    fn test_wrap_line_ignores_escape_sequences() {
        let line = "\x1b[1;31mabcd\x1b[0mef";
        let chunks = wrap_line(line, 4);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "\x1b[1;31mabcd\x1b[0m");
        assert_eq!(chunks[1], "ef");
        assert_eq!(visible_width(line), 6);
    }
}
