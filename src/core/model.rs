//! Session data model
//!
//! Closed enumeration of recognized argument kinds with the static flag
//! table driving classification and help output, plus the value types the
//! pipeline passes around: queries, file entries and truncation specs.

use regex::Regex;
use std::path::PathBuf;

use crate::core::util::eval_expr;

/// Help sections, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Help,
    General,
    Numbering,
    Filters,
    Search,
    Transforms,
    Case,
    Numeric,
    Bytes,
    Format,
    Visual,
    Paging,
    Summary,
}

impl Section {
    pub fn title(&self) -> &'static str {
        match self {
            Section::Help => "Help & diagnostics",
            Section::General => "General",
            Section::Numbering => "Numbering & decoration",
            Section::Filters => "Line filters",
            Section::Search => "Search",
            Section::Transforms => "Transforms",
            Section::Case => "Case conversion",
            Section::Numeric => "Numeric conversion",
            Section::Bytes => "Byte services",
            Section::Format => "Formatting services",
            Section::Visual => "Visualization",
            Section::Paging => "Paging",
            Section::Summary => "Summaries",
        }
    }

    /// All sections in display order
    pub fn all() -> &'static [Section] {
        &[
            Section::Help,
            Section::General,
            Section::Numbering,
            Section::Filters,
            Section::Search,
            Section::Transforms,
            Section::Case,
            Section::Numeric,
            Section::Bytes,
            Section::Format,
            Section::Visual,
            Section::Paging,
            Section::Summary,
        ]
    }
}

/// The kind of a recognized argument
///
/// `Cut` and `Replace` are differentiable: each occurrence carries distinct
/// payload in its raw token, so deduplication keeps every instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Help,
    Version,
    Debug,
    Echo,
    Raw,
    NoColor,
    Stdin,
    Clip,
    NoBreak,
    OneLine,
    Peek,
    Number,
    LineLength,
    Ends,
    Tabs,
    Chr,
    FilePrefix,
    Blank,
    Squeeze,
    Unique,
    Grep,
    GrepOnly,
    NoKeyword,
    NoUnescape,
    Strip,
    Reverse,
    Sort,
    SortLength,
    Upper,
    Lower,
    Swap,
    Capitalize,
    Title,
    EvalNumbers,
    Hex,
    Dec,
    Oct,
    Bin,
    B64Encode,
    B64Decode,
    Crc32,
    Checksum,
    PrettyJson,
    VisScan,
    VisZorder,
    VisHilbert,
    VisEntropy,
    More,
    Files,
    FileSizes,
    WordCount,
    CharCount,
    Count,
    Cut,
    Replace,
}

impl ArgKind {
    /// Differentiable kinds keep every literal occurrence in the active set
    pub fn is_differentiable(&self) -> bool {
        matches!(self, ArgKind::Cut | ArgKind::Replace)
    }
}

/// One row of the static flag table
#[derive(Debug, Clone, Copy)]
pub struct FlagSpec {
    pub kind: ArgKind,
    pub short: Option<&'static str>,
    pub long: &'static str,
    pub section: Section,
    pub help: &'static str,
}

/// The static table of recognized flags, grouped by help section.
pub static FLAG_TABLE: &[FlagSpec] = &[
    FlagSpec { kind: ArgKind::Help, short: Some("-h"), long: "--help", section: Section::Help, help: "show this help and exit" },
    FlagSpec { kind: ArgKind::Version, short: Some("-v"), long: "--version", section: Section::Help, help: "show version and exit" },
    FlagSpec { kind: ArgKind::Debug, short: Some("--dbg"), long: "--debug", section: Section::Help, help: "dump the parsed session state to stderr" },
    FlagSpec { kind: ArgKind::Echo, short: Some("-E"), long: "--echo", section: Section::General, help: "treat every following token as literal input text" },
    FlagSpec { kind: ArgKind::Raw, short: None, long: "--raw", section: Section::General, help: "plain output, no colors or decorations" },
    FlagSpec { kind: ArgKind::NoColor, short: Some("--nc"), long: "--nocolor", section: Section::General, help: "disable colored output" },
    FlagSpec { kind: ArgKind::Stdin, short: Some("-i"), long: "--stdin", section: Section::General, help: "read from standard input" },
    FlagSpec { kind: ArgKind::Clip, short: Some("-c"), long: "--clip", section: Section::General, help: "copy output to the clipboard (when available)" },
    FlagSpec { kind: ArgKind::NoBreak, short: Some("--nb"), long: "--nobreak", section: Section::General, help: "do not pause when a keyword is found" },
    FlagSpec { kind: ArgKind::OneLine, short: Some("-o"), long: "--oneline", section: Section::General, help: "join all output into a single line" },
    FlagSpec { kind: ArgKind::Peek, short: Some("-p"), long: "--peek", section: Section::General, help: "show only the first and last lines" },
    FlagSpec { kind: ArgKind::Number, short: Some("-n"), long: "--number", section: Section::Numbering, help: "number all output lines" },
    FlagSpec { kind: ArgKind::LineLength, short: Some("-l"), long: "--length", section: Section::Numbering, help: "prefix each line with its length" },
    FlagSpec { kind: ArgKind::Ends, short: Some("-e"), long: "--ends", section: Section::Numbering, help: "mark line ends with $" },
    FlagSpec { kind: ArgKind::Tabs, short: Some("-t"), long: "--tabs", section: Section::Numbering, help: "show tabs as ^I" },
    FlagSpec { kind: ArgKind::Chr, short: None, long: "--chr", section: Section::Numbering, help: "show control characters in caret notation" },
    FlagSpec { kind: ArgKind::FilePrefix, short: Some("--fp"), long: "--file-prefix", section: Section::Numbering, help: "prefix each line with its file name" },
    FlagSpec { kind: ArgKind::Blank, short: Some("-b"), long: "--blank", section: Section::Filters, help: "remove empty lines" },
    FlagSpec { kind: ArgKind::Squeeze, short: Some("--sq"), long: "--squeeze", section: Section::Filters, help: "squeeze runs of empty lines into one" },
    FlagSpec { kind: ArgKind::Unique, short: Some("-u"), long: "--unique", section: Section::Filters, help: "suppress repeated consecutive lines" },
    FlagSpec { kind: ArgKind::Grep, short: Some("-g"), long: "--grep", section: Section::Search, help: "show only lines containing a query" },
    FlagSpec { kind: ArgKind::GrepOnly, short: Some("--go"), long: "--grep-only", section: Section::Search, help: "show only the matched substrings" },
    FlagSpec { kind: ArgKind::NoKeyword, short: Some("--nk"), long: "--nokeyword", section: Section::Search, help: "show only lines without a query match" },
    FlagSpec { kind: ArgKind::NoUnescape, short: Some("--nu"), long: "--nounescape", section: Section::Search, help: "do not interpret escape sequences in find= queries" },
    FlagSpec { kind: ArgKind::Strip, short: None, long: "--strip", section: Section::Transforms, help: "strip leading and trailing whitespace" },
    FlagSpec { kind: ArgKind::Reverse, short: Some("-r"), long: "--reverse", section: Section::Transforms, help: "reverse the line order" },
    FlagSpec { kind: ArgKind::Sort, short: None, long: "--sort", section: Section::Transforms, help: "sort lines alphabetically" },
    FlagSpec { kind: ArgKind::SortLength, short: Some("--sortl"), long: "--sort-length", section: Section::Transforms, help: "sort lines by length" },
    FlagSpec { kind: ArgKind::Upper, short: Some("--up"), long: "--upper", section: Section::Case, help: "convert to upper case" },
    FlagSpec { kind: ArgKind::Lower, short: Some("--low"), long: "--lower", section: Section::Case, help: "convert to lower case" },
    FlagSpec { kind: ArgKind::Swap, short: None, long: "--swap", section: Section::Case, help: "swap character case" },
    FlagSpec { kind: ArgKind::Capitalize, short: Some("--cap"), long: "--capitalize", section: Section::Case, help: "capitalize each line" },
    FlagSpec { kind: ArgKind::Title, short: None, long: "--title", section: Section::Case, help: "convert each line to title case" },
    FlagSpec { kind: ArgKind::EvalNumbers, short: None, long: "--eval", section: Section::Numeric, help: "evaluate arithmetic expressions found in lines" },
    FlagSpec { kind: ArgKind::Hex, short: None, long: "--hex", section: Section::Numeric, help: "rewrite decimal numbers in hexadecimal" },
    FlagSpec { kind: ArgKind::Dec, short: None, long: "--dec", section: Section::Numeric, help: "rewrite hexadecimal/octal/binary numbers in decimal" },
    FlagSpec { kind: ArgKind::Oct, short: None, long: "--oct", section: Section::Numeric, help: "rewrite decimal numbers in octal" },
    FlagSpec { kind: ArgKind::Bin, short: None, long: "--bin", section: Section::Numeric, help: "rewrite decimal numbers in binary" },
    FlagSpec { kind: ArgKind::B64Encode, short: Some("--b64e"), long: "--base64-encode", section: Section::Bytes, help: "base64-encode the content" },
    FlagSpec { kind: ArgKind::B64Decode, short: Some("--b64d"), long: "--base64-decode", section: Section::Bytes, help: "base64-decode the content" },
    FlagSpec { kind: ArgKind::Crc32, short: None, long: "--crc32", section: Section::Bytes, help: "print the CRC32 checksum of each file" },
    FlagSpec { kind: ArgKind::Checksum, short: Some("-m"), long: "--checksum", section: Section::Bytes, help: "print CRC32, SHA-1 and SHA-256 checksums of each file" },
    FlagSpec { kind: ArgKind::PrettyJson, short: None, long: "--json", section: Section::Format, help: "pretty-print JSON content" },
    FlagSpec { kind: ArgKind::VisScan, short: Some("--vis"), long: "--visualize", section: Section::Visual, help: "visualize file bytes in scan order" },
    FlagSpec { kind: ArgKind::VisZorder, short: Some("--visz"), long: "--visualize-zorder", section: Section::Visual, help: "visualize file bytes along the Z-order curve" },
    FlagSpec { kind: ArgKind::VisHilbert, short: Some("--vish"), long: "--visualize-hilbert", section: Section::Visual, help: "visualize file bytes along the Hilbert curve" },
    FlagSpec { kind: ArgKind::VisEntropy, short: Some("--vise"), long: "--entropy", section: Section::Visual, help: "visualize file bytes colored by local entropy" },
    FlagSpec { kind: ArgKind::More, short: None, long: "--more", section: Section::Paging, help: "page the output interactively" },
    FlagSpec { kind: ArgKind::Files, short: Some("-F"), long: "--files", section: Section::Summary, help: "list the processed files" },
    FlagSpec { kind: ArgKind::FileSizes, short: Some("--fs"), long: "--file-sizes", section: Section::Summary, help: "list the processed files with their sizes" },
    FlagSpec { kind: ArgKind::WordCount, short: Some("-W"), long: "--wordcount", section: Section::Summary, help: "print a word count summary" },
    FlagSpec { kind: ArgKind::CharCount, short: Some("--cc"), long: "--charcount", section: Section::Summary, help: "print a character count summary" },
    FlagSpec { kind: ArgKind::Count, short: None, long: "--count", section: Section::Summary, help: "print a line count summary" },
];

/// Look up a token in the flag table (exact short or long form).
pub fn lookup_flag(token: &str) -> Option<&'static FlagSpec> {
    FLAG_TABLE
        .iter()
        .find(|spec| spec.short == Some(token) || spec.long == token)
}

/// A recognized argument: its kind plus the raw token it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub kind: ArgKind,
    pub token: String,
}

impl Argument {
    pub fn new(kind: ArgKind, token: impl Into<String>) -> Self {
        Self {
            kind,
            token: token.into(),
        }
    }
}

/// A search query: literal text or a compiled pattern.
///
/// Identity is value-based (text or pattern source plus the case flag) so
/// add/remove-by-value works across parser invocations.
#[derive(Debug, Clone)]
pub enum Query {
    Literal { text: String, ignore_case: bool },
    Pattern {
        regex: Regex,
        source: String,
        ignore_case: bool,
    },
}

impl Query {
    pub fn ignore_case(&self) -> bool {
        match self {
            Query::Literal { ignore_case, .. } => *ignore_case,
            Query::Pattern { ignore_case, .. } => *ignore_case,
        }
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Query::Literal { text: a, ignore_case: ai },
                Query::Literal { text: b, ignore_case: bi },
            ) => a == b && ai == bi,
            (
                Query::Pattern { source: a, ignore_case: ai, .. },
                Query::Pattern { source: b, ignore_case: bi, .. },
            ) => a == b && ai == bi,
            _ => false,
        }
    }
}

impl Eq for Query {}

/// A resolved input file
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub display_name: String,
    pub size: u64,
    /// OR-accumulated across scanning passes, never reset
    pub contains_queried: bool,
    pub plaintext: bool,
}

impl FileEntry {
    pub fn new(path: PathBuf, display_name: impl Into<String>, size: u64, plaintext: bool) -> Self {
        Self {
            path,
            display_name: display_name.into(),
            size,
            contains_queried: false,
            plaintext,
        }
    }

    /// Monotonic: once a query hit is seen the mark never clears
    pub fn mark_queried(&mut self, hit: bool) {
        self.contains_queried |= hit;
    }
}

/// Slice-style truncation spec: `(start, stop, step)`, each optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TruncSpec {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl TruncSpec {
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.stop.is_none() && self.step.is_none()
    }

    /// Parse up to three `:`-separated arithmetic-expression fields.
    ///
    /// Invalid expressions silently default to unbounded, never erroring.
    pub fn parse(fields: &str) -> Self {
        let mut parts = fields.splitn(3, ':');
        let start = parts.next().and_then(eval_expr);
        let stop = parts.next().and_then(eval_expr);
        let step = parts.next().and_then(eval_expr);
        Self { start, stop, step }
    }

    /// Resolve to the index sequence over a collection of `len` items,
    /// mirroring slice semantics: negative indices count from the end,
    /// a negative step walks backwards, step 0 is treated as unbounded.
    pub fn indices(&self, len: usize) -> Vec<usize> {
        let len = len as i64;
        let step = match self.step {
            Some(0) | None => 1,
            Some(s) => s,
        };

        let (default_start, default_stop) = if step > 0 { (0, len) } else { (len - 1, -1) };

        let clamp = |value: i64, low: i64, high: i64| value.max(low).min(high);
        let resolve = |field: Option<i64>, default: i64| -> i64 {
            match field {
                None => default,
                Some(v) if v < 0 => {
                    if step > 0 {
                        clamp(len + v, 0, len)
                    } else {
                        clamp(len + v, -1, len - 1)
                    }
                }
                Some(v) => {
                    if step > 0 {
                        clamp(v, 0, len)
                    } else {
                        clamp(v, -1, len - 1)
                    }
                }
            }
        };

        let start = resolve(self.start, default_start);
        let stop = resolve(self.stop, default_stop);

        let mut out = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            if (0..len).contains(&i) {
                out.push(i as usize);
            }
            i += step;
        }
        out
    }

    /// Apply the spec to a list, cloning the selected items in order.
    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        if self.is_unbounded() {
            return items.to_vec();
        }
        self.indices(items.len())
            .into_iter()
            .map(|i| items[i].clone())
            .collect()
    }

    /// Apply the spec to the characters of a line.
    pub fn apply_chars(&self, line: &str) -> String {
        if self.is_unbounded() {
            return line.to_string();
        }
        let chars: Vec<char> = line.chars().collect();
        self.indices(chars.len())
            .into_iter()
            .map(|i| chars[i])
            .collect()
    }
}

/// Memoized per-file statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    pub line_count: usize,
    pub max_line_length: usize,
}
