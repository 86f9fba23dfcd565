//! CLI module - the session driver
//!
//! Owns the active argument set, query set and file list; dispatches a
//! parsed token sequence to help/version output, visualization runs, or
//! the line pipeline, and prints summaries. The token grammar itself is
//! the program's interface; no declarative CLI layer sits in front of it.
//! The session is single-threaded and not reentrant: a second concurrent
//! run needs its own instance.

use anyhow::Result;
use colored::Colorize;
use encoding_rs::Encoding;
use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::path::{Path, PathBuf};

use crate::args::diff;
use crate::args::parser::{self, Parsed};
use crate::backends::encode;
use crate::cache::BoundedCache;
use crate::core::colors::ColorScheme;
use crate::core::error::CatxError;
use crate::core::lines::{self, read_lines, stdin_lines};
use crate::core::model::{
    ArgKind, Argument, FileEntry, FileStats, Query, Section, TruncSpec, FLAG_TABLE,
};
use crate::core::render::Pipeline;
use crate::core::term::term_size;
use crate::core::util::{count_words, human_size};
use crate::pager::{visible_width, LazyLines, Pager, PagerOutcome};
use crate::viz::{self, VizMode};

/// How one source's flow ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
    Cancelled,
}

/// Per-source counts for the summary section
struct SummaryRow {
    label: String,
    words: usize,
    chars: usize,
}

/// The active state of one run: argument set, queries, resolved files and
/// the memoization cache. Owned exclusively by the driving pipeline.
pub struct Session {
    pub args: Vec<Argument>,
    pub queries: Vec<Query>,
    pub files: Vec<FileEntry>,
    pub dirs: Vec<PathBuf>,
    pub unknown_args: Vec<String>,
    pub unknown_globs: Vec<String>,
    pub unknown_files: Vec<String>,
    pub echo: Vec<String>,
    pub encoding: Option<&'static Encoding>,
    pub trunc: TruncSpec,
    pub replacements: HashMap<String, (String, String)>,
    stats: BoundedCache<PathBuf, FileStats>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            args: Vec::new(),
            queries: Vec::new(),
            files: Vec::new(),
            dirs: Vec::new(),
            unknown_args: Vec::new(),
            unknown_globs: Vec::new(),
            unknown_files: Vec::new(),
            echo: Vec::new(),
            encoding: None,
            trunc: TruncSpec::default(),
            replacements: HashMap::new(),
            stats: BoundedCache::default(),
        }
    }

    pub fn has(&self, kind: ArgKind) -> bool {
        self.args.iter().any(|a| a.kind == kind)
    }

    pub fn unescape_enabled(&self) -> bool {
        !self.has(ArgKind::NoUnescape)
    }

    /// Merge one parser invocation into the active state. In delete mode
    /// recognized arguments and queries are removed instead of added, and
    /// file tokens are not appended.
    pub fn apply(&mut self, parsed: Parsed) {
        if parsed.delete {
            diff::diff_args(&mut self.args, &parsed.args);
            diff::diff_queries(&mut self.queries, &parsed.queries);
        } else {
            diff::add_args(&mut self.args, &parsed.args);
            diff::add_queries(&mut self.queries, &parsed.queries);
            for file in parsed.files {
                if !self.files.iter().any(|f| f.path == file.path) {
                    self.files.push(file);
                }
            }
            self.dirs.extend(parsed.dirs);
            self.echo.extend(parsed.echo);
        }
        if let Some(encoding) = parsed.encoding {
            self.encoding = Some(encoding);
        }
        if let Some(trunc) = parsed.trunc {
            self.trunc = trunc;
        }
        for (token, pair) in parsed.replacements {
            self.replacements.insert(token, pair);
        }
        self.unknown_args.extend(parsed.unknown_args);
        self.unknown_globs.extend(parsed.unknown_globs);
        self.unknown_files.extend(parsed.unknown_files);
    }

    /// Memoized line count / max line length for a file.
    pub fn file_stats(&mut self, path: &Path) -> FileStats {
        if let Some(stats) = self.stats.get(&path.to_path_buf()) {
            return *stats;
        }
        let file_lines = read_lines(path, self.encoding);
        let stats = FileStats {
            line_count: file_lines.len(),
            max_line_length: file_lines.iter().map(|l| l.chars().count()).max().unwrap_or(0),
        };
        self.stats.insert(path.to_path_buf(), stats);
        stats
    }

    fn viz_mode(&self) -> Option<VizMode> {
        self.args.iter().find_map(|a| match a.kind {
            ArgKind::VisScan => Some(VizMode::Scan),
            ArgKind::VisZorder => Some(VizMode::Zorder),
            ArgKind::VisHilbert => Some(VizMode::Hilbert),
            ArgKind::VisEntropy => Some(VizMode::Entropy),
            _ => None,
        })
    }
}

/// Entry point: classify the tokens and drive the pipeline. Regex
/// compilation failures and prompt-boundary cancellation propagate as
/// fatal errors; everything else completes with exit code 0.
pub fn run(tokens: Vec<String>) -> Result<()> {
    let parsed = parser::parse_tokens(&tokens, false, true)?;
    let mut session = Session::new();
    session.apply(parsed);

    let stdout_tty = io::stdout().is_terminal();
    let plain = session.has(ArgKind::Raw) || session.has(ArgKind::NoColor) || !stdout_tty;
    if plain {
        colored::control::set_override(false);
    }
    let colors = if plain {
        ColorScheme::plain()
    } else {
        ColorScheme::ansi()
    };

    if session.has(ArgKind::Help) {
        print_help(&colors);
        return Ok(());
    }
    if session.has(ArgKind::Version) {
        println!("catx {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if session.has(ArgKind::Debug) {
        debug_dump(&session);
    }
    if session.has(ArgKind::Clip) {
        eprintln!("{} clipboard integration is unavailable here", "catx:".yellow());
    }

    report_unknown(&session);

    let term = term_size();

    if let Some(mode) = session.viz_mode() {
        return run_visualizers(&session, mode, &colors, term);
    }

    run_text_flow(&mut session, &colors, term, stdout_tty)
}

#[derive(Debug, Clone, Copy)]
enum SourceKind {
    Echo,
    File(usize),
    Stdin,
}

fn run_text_flow(
    session: &mut Session,
    colors: &ColorScheme,
    term: (usize, usize),
    stdout_tty: bool,
) -> Result<()> {
    let mut sources = Vec::new();
    if !session.echo.is_empty() {
        sources.push(SourceKind::Echo);
    }
    for index in 0..session.files.len() {
        sources.push(SourceKind::File(index));
    }
    if session.has(ArgKind::Stdin) || sources.is_empty() {
        sources.push(SourceKind::Stdin);
    }

    let mut summaries = Vec::new();

    for source in sources {
        let flow = match source {
            SourceKind::Echo => {
                let content = vec![session.echo.join(" ")];
                run_source(session, None, "<echo>", content, colors, term, stdout_tty, &mut summaries)?
            }
            SourceKind::File(index) => {
                let path = session.files[index].path.clone();
                let label = session.files[index].display_name.clone();
                let content = read_lines(&path, session.encoding);
                run_source(
                    session,
                    Some(index),
                    &label,
                    content,
                    colors,
                    term,
                    stdout_tty,
                    &mut summaries,
                )?
            }
            SourceKind::Stdin => {
                if io::stdin().is_terminal() {
                    run_stdin_repl(session, colors)?
                } else if session.has(ArgKind::More) && stdout_tty {
                    run_stdin_stream(session, colors, term)?
                } else {
                    let content: Vec<String> = stdin_lines().collect();
                    run_source(session, None, "<stdin>", content, colors, term, stdout_tty, &mut summaries)?
                }
            }
        };
        match flow {
            Flow::Continue => {}
            Flow::Quit => return Ok(()),
            Flow::Cancelled => return Err(CatxError::Cancelled.into()),
        }
    }

    print_summaries(session, &summaries, colors)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_source(
    session: &mut Session,
    file_index: Option<usize>,
    label: &str,
    raw_lines: Vec<String>,
    colors: &ColorScheme,
    term: (usize, usize),
    stdout_tty: bool,
    summaries: &mut Vec<SummaryRow>,
) -> Result<Flow> {
    let args = session.args.clone();
    let queries = session.queries.clone();
    let replacements = session.replacements.clone();
    let pipeline = Pipeline::new(&args, &queries, &replacements, session.trunc, colors);

    let (rendered, any_hit) = pipeline.process(raw_lines);
    if let Some(index) = file_index {
        session.files[index].mark_queried(any_hit);
    }

    summaries.push(SummaryRow {
        label: label.to_string(),
        words: rendered.iter().map(|r| count_words(&r.text)).sum(),
        chars: rendered.iter().map(|r| visible_width(&r.text)).sum(),
    });

    let decorated = pipeline.decorate(&rendered, Some(label));

    let flow = if session.has(ArgKind::More) && stdout_tty {
        let mut pager = Pager::new(LazyLines::from_vec(decorated), term);
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let stdout = io::stdout();
        let mut out = stdout.lock();
        match pager.run(&mut input, &mut out).map_err(CatxError::PagerIo)? {
            PagerOutcome::Finished | PagerOutcome::NextFile => Flow::Continue,
            PagerOutcome::Quit => Flow::Quit,
            PagerOutcome::Cancelled => Flow::Cancelled,
        }
    } else {
        let pause = stdout_tty && !session.has(ArgKind::NoBreak) && !session.queries.is_empty();
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let mut flow = Flow::Continue;
        for (text, line) in decorated.iter().zip(rendered.iter()) {
            writeln!(out, "{}", text)?;
            if pause && line.hit {
                write!(out, "-- keyword found; press enter --")?;
                out.flush()?;
                let mut ack = String::new();
                if io::stdin().read_line(&mut ack)? == 0 {
                    flow = Flow::Cancelled;
                    break;
                }
            }
        }
        flow
    };

    if flow == Flow::Continue {
        if let Some(index) = file_index {
            let wants_sums = session.has(ArgKind::Checksum) || session.has(ArgKind::Crc32);
            if wants_sums {
                let crc_only = !session.has(ArgKind::Checksum);
                print_checksums(&session.files[index], crc_only, colors)?;
            }
        }
    }

    Ok(flow)
}

/// Interactive stdin: each input line runs through the per-line pipeline;
/// `!add <tokens>` and `!del <tokens>` re-enter the parser to modify the
/// active set live.
fn run_stdin_repl(session: &mut Session, colors: &ColorScheme) -> Result<Flow> {
    let stdin = io::stdin();
    let stdout = io::stdout();

    for input in stdin.lock().lines() {
        let input = input?;

        let command = input
            .strip_prefix("!add")
            .map(|rest| (false, rest))
            .or_else(|| input.strip_prefix("!del").map(|rest| (true, rest)));
        if let Some((delete, rest)) = command {
            let tokens: Vec<String> = rest.split_whitespace().map(String::from).collect();
            match parser::parse_tokens(&tokens, delete, session.unescape_enabled()) {
                Ok(parsed) => session.apply(parsed),
                Err(err) => eprintln!("{} {}", "catx:".red(), err),
            }
            continue;
        }

        let args = session.args.clone();
        let queries = session.queries.clone();
        let replacements = session.replacements.clone();
        let pipeline = Pipeline::new(&args, &queries, &replacements, TruncSpec::default(), colors);
        if let Some(line) = pipeline.stream_line(&input) {
            let mut out = stdout.lock();
            writeln!(out, "{}", line.text)?;
        }
    }

    Ok(Flow::Continue)
}

/// Piped stdin under the pager: lines materialize lazily while commands
/// come from the controlling terminal. List-level stages need the whole
/// source and do not apply in stream mode.
fn run_stdin_stream(session: &Session, colors: &ColorScheme, term: (usize, usize)) -> Result<Flow> {
    let tty = match fs::File::open("/dev/tty") {
        Ok(file) => file,
        Err(_) => {
            // No controlling terminal: dump directly
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let args = session.args.clone();
            let queries = session.queries.clone();
            let replacements = session.replacements.clone();
            let pipeline =
                Pipeline::new(&args, &queries, &replacements, TruncSpec::default(), colors);
            for input in stdin_lines() {
                if let Some(line) = pipeline.stream_line(&input) {
                    writeln!(out, "{}", line.text)?;
                }
            }
            return Ok(Flow::Continue);
        }
    };

    let args = session.args.clone();
    let queries = session.queries.clone();
    let replacements = session.replacements.clone();
    let colors = colors.clone();
    let source = stdin_lines().filter_map(move |input| {
        let pipeline = Pipeline::new(&args, &queries, &replacements, TruncSpec::default(), &colors);
        pipeline.stream_line(&input).map(|line| line.text)
    });

    let mut pager = Pager::new(LazyLines::from_iter(source), term);
    let mut input = BufReader::new(tty);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match pager.run(&mut input, &mut out).map_err(CatxError::PagerIo)? {
        PagerOutcome::Quit => Ok(Flow::Quit),
        PagerOutcome::Cancelled => Ok(Flow::Cancelled),
        _ => Ok(Flow::Continue),
    }
}

fn run_visualizers(
    session: &Session,
    mode: VizMode,
    colors: &ColorScheme,
    term: (usize, usize),
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for file in &session.files {
        match fs::read(&file.path) {
            Ok(bytes) => {
                if session.files.len() > 1 {
                    writeln!(out, "{}{}{}", colors.header, file.display_name, colors.reset)?;
                }
                viz::render(&bytes, mode, term.0, colors, &mut out)?;
            }
            Err(err) => {
                eprintln!("{} {}", "catx:".red(), lines::error_line(&file.display_name, &err));
            }
        }
    }
    Ok(())
}

fn print_summaries(
    session: &mut Session,
    rows: &[SummaryRow],
    colors: &ColorScheme,
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if session.has(ArgKind::Files) || session.has(ArgKind::FileSizes) {
        writeln!(out, "{}files:{}", colors.header, colors.reset)?;
        for file in &session.files {
            let mark = if file.contains_queried {
                format!("{}*{}", colors.found, colors.found_reset)
            } else {
                " ".to_string()
            };
            let kind = if file.plaintext { "" } else { " (binary)" };
            if session.has(ArgKind::FileSizes) {
                writeln!(
                    out,
                    "  {} {} [{}]{}",
                    mark,
                    file.display_name,
                    human_size(file.size),
                    kind
                )?;
            } else {
                writeln!(out, "  {} {}{}", mark, file.display_name, kind)?;
            }
        }
    }

    if session.has(ArgKind::Count) {
        let paths: Vec<(PathBuf, String)> = session
            .files
            .iter()
            .map(|f| (f.path.clone(), f.display_name.clone()))
            .collect();
        for (path, name) in paths {
            let stats = session.file_stats(&path);
            writeln!(
                out,
                "{}: {} lines (longest {})",
                name, stats.line_count, stats.max_line_length
            )?;
        }
    }

    if session.has(ArgKind::WordCount) {
        for row in rows {
            writeln!(out, "{}: {} words", row.label, row.words)?;
        }
    }
    if session.has(ArgKind::CharCount) {
        for row in rows {
            writeln!(out, "{}: {} chars", row.label, row.chars)?;
        }
    }

    Ok(())
}

fn print_checksums(file: &FileEntry, crc_only: bool, colors: &ColorScheme) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match encode::file_checksums(&file.path) {
        Ok(sums) => {
            writeln!(out, "{}{}{}:", colors.header, file.display_name, colors.reset)?;
            writeln!(out, "  crc32   {}", sums.crc32)?;
            if !crc_only {
                writeln!(out, "  sha1    {}", sums.sha1)?;
                writeln!(out, "  sha256  {}", sums.sha256)?;
            }
        }
        Err(err) => {
            eprintln!("{} cannot checksum {}: {}", "catx:".red(), file.display_name, err);
        }
    }
    Ok(())
}

fn report_unknown(session: &Session) {
    if !session.unknown_args.is_empty() {
        eprintln!(
            "{} unknown arguments: {}",
            "catx:".yellow(),
            session.unknown_args.join(", ")
        );
    }
    if !session.unknown_globs.is_empty() {
        eprintln!(
            "{} patterns matched nothing: {}",
            "catx:".yellow(),
            session.unknown_globs.join(", ")
        );
    }
    if !session.unknown_files.is_empty() {
        eprintln!(
            "{} no such files: {}",
            "catx:".yellow(),
            session.unknown_files.join(", ")
        );
    }
}

fn debug_dump(session: &Session) {
    eprintln!("{}", "catx session".bold());
    eprintln!(
        "  args: {:?}",
        session.args.iter().map(|a| a.kind).collect::<Vec<_>>()
    );
    eprintln!(
        "  queries: {:?} ({} case-insensitive)",
        session.queries,
        session.queries.iter().filter(|q| q.ignore_case()).count()
    );
    eprintln!("  dirs: {}", session.dirs.len());
    eprintln!(
        "  files: {:?}",
        session
            .files
            .iter()
            .map(|f| f.display_name.as_str())
            .collect::<Vec<_>>()
    );
    eprintln!("  trunc: {:?}", session.trunc);
    eprintln!("  encoding: {:?}", session.encoding.map(|e| e.name()));
    eprintln!("  replacements: {:?}", session.replacements);
}

fn print_help(colors: &ColorScheme) {
    println!("catx - an enhanced cat");
    println!();
    println!("usage: catx [tokens ...]");
    println!();
    println!("Tokens are parsed positionally: flags (single or concatenated short");
    println!("forms, long forms), directives (enc=, find=, match=, trunc=),");
    println!("bracketed cut/replace expressions, file paths and glob patterns.");
    println!("-E captures everything after it as literal text.");
    println!();
    for section in Section::all() {
        println!("{}{}{}", colors.header, section.title(), colors.reset);
        for spec in FLAG_TABLE.iter().filter(|s| s.section == *section) {
            println!(
                "  {:>6} {:<20} {}",
                spec.short.unwrap_or(""),
                spec.long,
                spec.help
            );
        }
        if *section == Section::Transforms {
            println!("  {:>6} {:<20} {}", "", "[start:stop:step]", "cut each line to a character slice");
            println!("  {:>6} {:<20} {}", "", "[this,that]", "replace text (escape commas with \\,)");
        }
        println!();
    }
    println!("directives:");
    println!("  enc=LABEL            set the file encoding (also enc:LABEL)");
    println!("  find=TEXT, f=TEXT    literal query (uppercase prefix: ignore case)");
    println!("  match=RE, m=RE       regex query (uppercase prefix: ignore case)");
    println!("  trunc=A:B:C          slice the line list (arithmetic fields)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_session_add_then_delete_query() {
        let mut session = Session::new();
        session.apply(parser::parse_tokens(&tokens(&["find=hello", "find=hello", "FIND=x"]), false, true).unwrap());
        assert_eq!(session.queries.len(), 3);

        // Delete removes exactly one ('hello', case-sensitive) entry
        session.apply(parser::parse_tokens(&tokens(&["find=hello"]), true, true).unwrap());
        assert_eq!(
            session.queries,
            vec![
                Query::Literal {
                    text: "hello".into(),
                    ignore_case: false
                },
                Query::Literal {
                    text: "x".into(),
                    ignore_case: true
                },
            ]
        );
    }

    #[test]
    fn test_session_delete_arg_by_kind() {
        let mut session = Session::new();
        session.apply(parser::parse_tokens(&tokens(&["-n", "-e"]), false, true).unwrap());
        session.apply(parser::parse_tokens(&tokens(&["--number"]), true, true).unwrap());
        let kinds: Vec<ArgKind> = session.args.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ArgKind::Ends]);
    }

    #[test]
    fn test_session_dedups_files_across_applies() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        let token = dir.path().join("a.txt").display().to_string();

        let mut session = Session::new();
        session.apply(parser::parse_tokens(&tokens(&[token.as_str()]), false, true).unwrap());
        session.apply(parser::parse_tokens(&tokens(&[token.as_str()]), false, true).unwrap());
        assert_eq!(session.files.len(), 1);
    }

    #[test]
    fn test_file_stats_cached() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("x.txt");
        std::fs::write(&path, "one\nlonger line\n").unwrap();

        let mut session = Session::new();
        let stats = session.file_stats(&path);
        assert_eq!(stats.line_count, 2);
        assert_eq!(stats.max_line_length, 11);

        // Second lookup hits the cache even if the file changed
        std::fs::write(&path, "now only one line\n").unwrap();
        assert_eq!(session.file_stats(&path), stats);
    }

    #[test]
    fn test_viz_mode_from_args() {
        let mut session = Session::new();
        session.apply(parser::parse_tokens(&tokens(&["--vish"]), false, true).unwrap());
        assert_eq!(session.viz_mode(), Some(VizMode::Hilbert));
        assert_eq!(Session::new().viz_mode(), None);
    }
}
