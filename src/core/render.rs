//! Line pipeline
//!
//! Turns a file's raw lines into final output lines: truncation slice,
//! per-line transforms, sequence filters, list-level services, query
//! annotation with highlight splicing, and decoration. Color strings are
//! opaque and spliced right-to-left at the merged interval boundaries so
//! earlier offsets stay valid.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::args::parser::cut_spec;
use crate::backends::{encode, pretty};
use crate::core::colors::ColorScheme;
use crate::core::model::{ArgKind, Argument, Query, TruncSpec};
use crate::core::util::eval_expr;
use crate::pager::visible_width;
use crate::search::finder::{MarkerRole, StringFinder};

/// Standalone decimal numbers
static DEC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[0-9]+\b").expect("invalid DEC_RE"));

/// Hex/octal/binary literals
static RADIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b0[xX][0-9a-fA-F]+\b|\b0[oO][0-7]+\b|\b0[bB][01]+\b").expect("invalid RADIX_RE")
});

/// Flat arithmetic expressions inside a line
static EXPR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+(?:\s*[-+*/]\s*[0-9]+)+").expect("invalid EXPR_RE"));

/// Number of context lines kept at each end by the peek view
const PEEK_LINES: usize = 5;

pub fn has_kind(args: &[Argument], kind: ArgKind) -> bool {
    args.iter().any(|a| a.kind == kind)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    Upper,
    Lower,
    Swap,
    Capitalize,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericMode {
    Hex,
    Dec,
    Oct,
    Bin,
}

/// Per-line transforms, precomputed from the active argument set
#[derive(Debug, Clone, Default)]
pub struct LineOps {
    pub cuts: Vec<TruncSpec>,
    pub replaces: Vec<(String, String)>,
    pub strip: bool,
    pub case: Option<CaseMode>,
    pub eval: bool,
    pub numeric: Option<NumericMode>,
    pub tabs: bool,
    pub chr: bool,
}

impl LineOps {
    pub fn from_args(args: &[Argument], replacements: &HashMap<String, (String, String)>) -> Self {
        let mut ops = LineOps::default();
        for arg in args {
            match arg.kind {
                ArgKind::Cut => ops.cuts.push(cut_spec(&arg.token)),
                ArgKind::Replace => {
                    if let Some(pair) = replacements.get(&arg.token) {
                        ops.replaces.push(pair.clone());
                    }
                }
                ArgKind::Strip => ops.strip = true,
                ArgKind::Upper => ops.case = Some(CaseMode::Upper),
                ArgKind::Lower => ops.case = Some(CaseMode::Lower),
                ArgKind::Swap => ops.case = Some(CaseMode::Swap),
                ArgKind::Capitalize => ops.case = Some(CaseMode::Capitalize),
                ArgKind::Title => ops.case = Some(CaseMode::Title),
                ArgKind::EvalNumbers => ops.eval = true,
                ArgKind::Hex => ops.numeric = Some(NumericMode::Hex),
                ArgKind::Dec => ops.numeric = Some(NumericMode::Dec),
                ArgKind::Oct => ops.numeric = Some(NumericMode::Oct),
                ArgKind::Bin => ops.numeric = Some(NumericMode::Bin),
                ArgKind::Tabs => ops.tabs = true,
                ArgKind::Chr => ops.chr = true,
                _ => {}
            }
        }
        ops
    }

    /// Apply all per-line transforms in fixed order.
    pub fn apply(&self, line: &str) -> String {
        let mut text = line.to_string();
        for cut in &self.cuts {
            text = cut.apply_chars(&text);
        }
        for (from, to) in &self.replaces {
            if !from.is_empty() {
                text = text.replace(from.as_str(), to);
            }
        }
        if self.strip {
            text = text.trim().to_string();
        }
        if let Some(mode) = self.case {
            text = apply_case(&text, mode);
        }
        if self.eval {
            text = eval_in_line(&text);
        }
        if let Some(mode) = self.numeric {
            text = convert_numbers(&text, mode);
        }
        if self.tabs {
            text = text.replace('\t', "^I");
        }
        if self.chr {
            text = caret_controls(&text);
        }
        text
    }
}

fn apply_case(text: &str, mode: CaseMode) -> String {
    match mode {
        CaseMode::Upper => text.to_uppercase(),
        CaseMode::Lower => text.to_lowercase(),
        CaseMode::Swap => text
            .chars()
            .flat_map(|c| {
                if c.is_uppercase() {
                    c.to_lowercase().collect::<Vec<_>>()
                } else {
                    c.to_uppercase().collect::<Vec<_>>()
                }
            })
            .collect(),
        CaseMode::Capitalize => capitalize(text),
        CaseMode::Title => text
            .split(' ')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Replace flat arithmetic expressions with their value.
fn eval_in_line(text: &str) -> String {
    EXPR_RE
        .replace_all(text, |caps: &regex::Captures| {
            let expr = caps.get(0).unwrap().as_str();
            match eval_expr(expr) {
                Some(value) => value.to_string(),
                None => expr.to_string(),
            }
        })
        .into_owned()
}

/// Rewrite numbers into the target base; unparseable tokens stay as-is.
fn convert_numbers(text: &str, mode: NumericMode) -> String {
    match mode {
        NumericMode::Dec => RADIX_RE
            .replace_all(text, |caps: &regex::Captures| {
                let token = caps.get(0).unwrap().as_str();
                let (radix, digits) = match &token[..2] {
                    "0x" | "0X" => (16, &token[2..]),
                    "0o" | "0O" => (8, &token[2..]),
                    _ => (2, &token[2..]),
                };
                match i64::from_str_radix(digits, radix) {
                    Ok(value) => value.to_string(),
                    Err(_) => token.to_string(),
                }
            })
            .into_owned(),
        _ => DEC_RE
            .replace_all(text, |caps: &regex::Captures| {
                let token = caps.get(0).unwrap().as_str();
                match token.parse::<i64>() {
                    Ok(value) => match mode {
                        NumericMode::Hex => format!("0x{:x}", value),
                        NumericMode::Oct => format!("0o{:o}", value),
                        NumericMode::Bin => format!("0b{:b}", value),
                        NumericMode::Dec => unreachable!(),
                    },
                    Err(_) => token.to_string(),
                }
            })
            .into_owned(),
    }
}

/// Caret notation for control characters (after tab handling).
fn caret_controls(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\x7f' => out.push_str("^?"),
            c if (c as u32) < 0x20 => {
                out.push('^');
                out.push((c as u8 + 64) as char);
            }
            c => out.push(c),
        }
    }
    out
}

/// One output line plus whether a query hit it
#[derive(Debug, Clone)]
pub struct RenderedLine {
    pub text: String,
    pub hit: bool,
}

/// The sequence-level pipeline for one source
pub struct Pipeline<'a> {
    args: &'a [Argument],
    finder: StringFinder<'a>,
    trunc: TruncSpec,
    colors: &'a ColorScheme,
    pub ops: LineOps,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        args: &'a [Argument],
        queries: &'a [Query],
        replacements: &HashMap<String, (String, String)>,
        trunc: TruncSpec,
        colors: &'a ColorScheme,
    ) -> Self {
        Self {
            args,
            finder: StringFinder::new(queries),
            trunc,
            colors,
            ops: LineOps::from_args(args, replacements),
        }
    }

    pub fn has(&self, kind: ArgKind) -> bool {
        has_kind(self.args, kind)
    }

    /// Run the whole pipeline over a source's raw lines. Returns the
    /// rendered lines and whether any query matched anywhere.
    pub fn process(&self, raw_lines: Vec<String>) -> (Vec<RenderedLine>, bool) {
        let lines = self.trunc.apply(&raw_lines);
        let mut lines: Vec<String> = lines.iter().map(|l| self.ops.apply(l)).collect();

        if self.has(ArgKind::Blank) {
            lines.retain(|l| !l.trim().is_empty());
        }
        if self.has(ArgKind::Squeeze) {
            lines = squeeze_blanks(lines);
        }
        if self.has(ArgKind::Unique) {
            lines.dedup();
        }

        if self.has(ArgKind::B64Decode) {
            lines = encode::decode_lines(&lines);
        }
        if self.has(ArgKind::B64Encode) {
            lines = encode::encode_lines(&lines);
        }
        if self.has(ArgKind::PrettyJson) {
            lines = pretty::pretty_json_lines(&lines);
        }

        if self.has(ArgKind::Sort) {
            lines.sort();
        }
        if self.has(ArgKind::SortLength) {
            lines.sort_by_key(|l| l.chars().count());
        }
        if self.has(ArgKind::Reverse) {
            lines.reverse();
        }

        let mut any_hit = false;
        let mut rendered = Vec::with_capacity(lines.len());
        let grep = self.has(ArgKind::Grep);
        let grep_only = self.has(ArgKind::GrepOnly);
        let no_keyword = self.has(ArgKind::NoKeyword);

        for line in &lines {
            let hits = self.finder.find_in_line(line);
            let hit = hits.any();
            any_hit |= hit;

            if grep_only {
                for (text, _) in hits.found.iter().chain(hits.matched.iter()) {
                    rendered.push(RenderedLine {
                        text: text.clone(),
                        hit: true,
                    });
                }
                continue;
            }
            if grep && !hit {
                continue;
            }
            if no_keyword && hit {
                continue;
            }

            rendered.push(RenderedLine {
                text: splice_markers(line, &hits.markers, self.colors),
                hit,
            });
        }

        if self.has(ArgKind::Peek) && rendered.len() > 2 * PEEK_LINES {
            let omitted = rendered.len() - 2 * PEEK_LINES;
            let tail = rendered.split_off(rendered.len() - PEEK_LINES);
            rendered.truncate(PEEK_LINES);
            rendered.push(RenderedLine {
                text: format!("{}... {} lines ...{}", self.colors.decoration, omitted, self.colors.reset),
                hit: false,
            });
            rendered.extend(tail);
        }

        if self.has(ArgKind::OneLine) {
            let joined = rendered
                .iter()
                .map(|r| r.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            rendered = vec![RenderedLine {
                text: joined,
                hit: any_hit,
            }];
        }

        (rendered, any_hit)
    }

    /// Per-line path for streamed sources: transforms plus annotation,
    /// without the list-level stages.
    pub fn stream_line(&self, line: &str) -> Option<RenderedLine> {
        let text = self.ops.apply(line);
        let hits = self.finder.find_in_line(&text);
        let hit = hits.any();
        if self.has(ArgKind::Blank) && text.trim().is_empty() {
            return None;
        }
        if self.has(ArgKind::Grep) && !hit {
            return None;
        }
        if self.has(ArgKind::NoKeyword) && hit {
            return None;
        }
        Some(RenderedLine {
            text: splice_markers(&text, &hits.markers, self.colors),
            hit,
        })
    }

    /// Final decoration pass: file prefix, line numbers, lengths, ends.
    pub fn decorate(&self, rendered: &[RenderedLine], label: Option<&str>) -> Vec<String> {
        let number = self.has(ArgKind::Number);
        let lengths = self.has(ArgKind::LineLength);
        let ends = self.has(ArgKind::Ends);
        let prefix = if self.has(ArgKind::FilePrefix) { label } else { None };
        let width = rendered.len().max(1).to_string().len();

        rendered
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let mut out = String::new();
                if let Some(name) = prefix {
                    out.push_str(&format!(
                        "{}{}:{}",
                        self.colors.decoration, name, self.colors.reset
                    ));
                }
                if number {
                    out.push_str(&format!(
                        "{}{:>width$}{} ",
                        self.colors.number,
                        index + 1,
                        self.colors.reset,
                        width = width
                    ));
                }
                if lengths {
                    out.push_str(&format!(
                        "{}[{:>4}]{} ",
                        self.colors.decoration,
                        visible_width(&line.text),
                        self.colors.reset
                    ));
                }
                out.push_str(&line.text);
                if ends {
                    out.push_str(&format!("{}${}", self.colors.ends, self.colors.reset));
                }
                out
            })
            .collect()
    }
}

fn squeeze_blanks(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut previous_blank = false;
    for line in lines {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        previous_blank = blank;
        out.push(line);
    }
    out
}

/// Insert color strings at marker boundaries, right-to-left so earlier
/// offsets stay valid. Positions are character positions.
pub fn splice_markers(
    line: &str,
    markers: &[(usize, MarkerRole)],
    colors: &ColorScheme,
) -> String {
    if markers.is_empty() {
        return line.to_string();
    }
    let mut bounds: Vec<usize> = line.char_indices().map(|(i, _)| i).collect();
    bounds.push(line.len());

    let mut out = line.to_string();
    for (position, role) in markers {
        let insert = match role {
            MarkerRole::Found => &colors.found,
            MarkerRole::FoundReset => &colors.found_reset,
            MarkerRole::Matched => &colors.matched,
            MarkerRole::MatchedReset => &colors.matched_reset,
        };
        if insert.is_empty() {
            continue;
        }
        out.insert_str(bounds[*position], insert);
    }
    out
}
