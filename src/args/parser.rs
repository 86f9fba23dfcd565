//! Token classification
//!
//! Classifies every raw command token exactly once into a directive, a
//! recognized flag, an unrecognized flag, a known file or directory, an
//! unknown glob pattern, an unknown file reference, or echo-captured text.
//!
//! Priority order per token: directives, bracketed cut/replace expressions,
//! the static flag table, path resolution (including glob expansion),
//! concatenated short flags, then the unknown fallbacks. Classification
//! never fails except for regex compilation, which is a user input error.

use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::core::error::CatxError;
use crate::core::lines::resolve_encoding;
use crate::core::model::{lookup_flag, ArgKind, Argument, FileEntry, Query, TruncSpec};
use crate::core::util::{looks_binary, unescape_or_raw};

/// `enc=utf-8` / `enc:utf-8` (prefix case-insensitive)
static ENC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)enc[=:](.*)$").expect("invalid ENC_RE"));

/// `match=…` / `m=…`; an uppercase prefix selects case-insensitive matching
static MATCH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(match|m|MATCH|M)=(.*)$").expect("invalid MATCH_RE"));

/// `find=…` / `f=…`; an uppercase prefix selects case-insensitive matching
static FIND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(find|f|FIND|F)=(.*)$").expect("invalid FIND_RE"));

/// `trunc=start:stop:step` (prefix case-insensitive)
static TRUNC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)trunc=(.*)$").expect("invalid TRUNC_RE"));

/// Everything one parser invocation classified
#[derive(Debug, Default)]
pub struct Parsed {
    pub delete: bool,
    pub args: Vec<Argument>,
    pub queries: Vec<Query>,
    pub files: Vec<FileEntry>,
    pub dirs: Vec<PathBuf>,
    pub unknown_args: Vec<String>,
    pub unknown_globs: Vec<String>,
    pub unknown_files: Vec<String>,
    pub echo: Vec<String>,
    pub encoding: Option<&'static Encoding>,
    pub trunc: Option<TruncSpec>,
    pub replacements: Vec<(String, (String, String))>,
}

/// Classify a raw token sequence.
///
/// `delete` is recorded for the session to apply removals instead of
/// additions; classification itself is identical in both modes.
/// `unescape_queries` seeds the escape handling for `find=` payloads and is
/// switched off for the rest of the sequence once a `NoUnescape` flag is
/// seen.
pub fn parse_tokens(
    tokens: &[String],
    delete: bool,
    unescape_queries: bool,
) -> Result<Parsed, CatxError> {
    let mut parser = ArgParser {
        unescape_queries,
        out: Parsed {
            delete,
            ..Parsed::default()
        },
    };
    let mut echo_mode = false;

    for token in tokens {
        if echo_mode {
            parser.out.echo.push(token.clone());
            continue;
        }
        echo_mode = parser.classify(token)?;
    }

    Ok(parser.out)
}

/// Parse a cut token (`[start:stop:step]`) into its slice spec.
///
/// Invalid fields default to unbounded, like the `trunc=` directive.
pub fn cut_spec(token: &str) -> TruncSpec {
    match token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        Some(inner) => TruncSpec::parse(inner),
        None => TruncSpec::default(),
    }
}

struct ArgParser {
    unescape_queries: bool,
    out: Parsed,
}

impl ArgParser {
    /// Classify one token. Returns true when the token switched the parser
    /// into echo capture.
    fn classify(&mut self, token: &str) -> Result<bool, CatxError> {
        if self.try_directive(token)? {
            return Ok(false);
        }
        if self.try_bracket(token) {
            return Ok(false);
        }
        if let Some(spec) = lookup_flag(token) {
            self.push_arg(spec.kind, token);
            return Ok(spec.kind == ArgKind::Echo);
        }
        if self.try_path(token) {
            return Ok(false);
        }
        if is_concat_short(token) {
            return self.explode_short(token);
        }
        if token.starts_with('-') {
            self.out.unknown_args.push(token.to_string());
        } else {
            self.out.unknown_files.push(token.to_string());
        }
        Ok(false)
    }

    fn push_arg(&mut self, kind: ArgKind, token: &str) {
        if kind == ArgKind::NoUnescape {
            self.unescape_queries = false;
        }
        self.out.args.push(Argument::new(kind, token));
    }

    fn try_directive(&mut self, token: &str) -> Result<bool, CatxError> {
        if let Some(caps) = ENC_RE.captures(token) {
            match resolve_encoding(&caps[1]) {
                Some(enc) => self.out.encoding = Some(enc),
                // Unknown labels are reported, never fatal
                None => self.out.unknown_args.push(token.to_string()),
            }
            return Ok(true);
        }

        if let Some(caps) = MATCH_RE.captures(token) {
            let ignore_case = caps[1].chars().all(|c| c.is_uppercase());
            let source = caps[2].to_string();
            let regex = RegexBuilder::new(&source)
                .case_insensitive(ignore_case)
                .build()
                .map_err(|e| CatxError::InvalidPattern {
                    pattern: source.clone(),
                    source: e,
                })?;
            self.out.queries.push(Query::Pattern {
                regex,
                source,
                ignore_case,
            });
            return Ok(true);
        }

        if let Some(caps) = FIND_RE.captures(token) {
            let ignore_case = caps[1].chars().all(|c| c.is_uppercase());
            let raw = &caps[2];
            let text = if self.unescape_queries {
                unescape_or_raw(raw)
            } else {
                raw.to_string()
            };
            self.out.queries.push(Query::Literal { text, ignore_case });
            return Ok(true);
        }

        if let Some(caps) = TRUNC_RE.captures(token) {
            self.out.trunc = Some(TruncSpec::parse(&caps[1]));
            return Ok(true);
        }

        Ok(false)
    }

    fn try_bracket(&mut self, token: &str) -> bool {
        let inner = match token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            Some(inner) if !inner.is_empty() => inner,
            _ => return false,
        };

        if let Some((left, right)) = split_unescaped_comma(inner) {
            let pair = (unescape_or_raw(&left), unescape_or_raw(&right));
            self.out.replacements.push((token.to_string(), pair));
            self.push_arg(ArgKind::Replace, token);
            return true;
        }

        if inner.contains(':') {
            // Token kept verbatim; the slice is parsed at application time
            self.push_arg(ArgKind::Cut, token);
            return true;
        }

        false
    }

    fn try_path(&mut self, token: &str) -> bool {
        if let Ok(canonical) = fs::canonicalize(token) {
            if canonical.is_file() {
                self.push_file(canonical, token);
                return true;
            }
            if canonical.is_dir() {
                self.out.dirs.push(canonical.clone());
                self.expand_dir(&canonical);
                return true;
            }
        }

        if token.contains(['*', '?', '[']) {
            let mut matched = false;
            if let Ok(paths) = glob::glob(token) {
                for entry in paths.flatten() {
                    if entry.is_dir() {
                        matched = true;
                        self.out.dirs.push(entry.clone());
                        self.expand_dir(&entry);
                    } else if entry.is_file() {
                        matched = true;
                        let display = entry.display().to_string();
                        self.push_file(entry, &display);
                    }
                }
            }
            if !matched {
                self.out.unknown_globs.push(token.to_string());
            }
            return true;
        }

        false
    }

    /// Directory contents: `dir/*`, non-recursive, files only.
    fn expand_dir(&mut self, dir: &Path) {
        let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
            Ok(iter) => iter
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect(),
            Err(_) => return,
        };
        entries.sort();
        for path in entries {
            let display = path.display().to_string();
            self.push_file(path, &display);
        }
    }

    fn push_file(&mut self, path: PathBuf, display: &str) {
        let path = fs::canonicalize(&path).unwrap_or(path);
        if self.out.files.iter().any(|f| f.path == path) {
            return;
        }
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let plaintext = probe_plaintext(&path);
        self.out
            .files
            .push(FileEntry::new(path, display, size, plaintext));
    }

    /// Explode `-abc` into `-a -b -c` via an explicit work-list, each
    /// re-classified on its own. An echo trigger stops the work-list
    /// immediately: the remaining characters of this token are dropped
    /// rather than parsed (observed behavior, pinned by test).
    fn explode_short(&mut self, token: &str) -> Result<bool, CatxError> {
        let mut pending: Vec<char> = token.chars().skip(1).collect();
        pending.reverse();
        while let Some(c) = pending.pop() {
            let single = format!("-{}", c);
            if self.classify(&single)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// A short-flag cluster: `-abc`, but not `--long` and not a bare `-x`.
fn is_concat_short(token: &str) -> bool {
    token.len() > 2 && token.starts_with('-') && !token.starts_with("--")
}

/// Split at the first unescaped comma; `\,` becomes a literal comma.
/// Other escapes pass through untouched for the later unescape step.
fn split_unescaped_comma(inner: &str) -> Option<(String, String)> {
    let mut left = String::new();
    let mut right = String::new();
    let mut in_right = false;
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        let target = if in_right { &mut right } else { &mut left };
        if c == '\\' {
            match chars.next() {
                Some(',') => target.push(','),
                Some(other) => {
                    target.push('\\');
                    target.push(other);
                }
                None => target.push('\\'),
            }
        } else if c == ',' && !in_right {
            in_right = true;
        } else {
            target.push(c);
        }
    }

    if in_right {
        Some((left, right))
    } else {
        None
    }
}

fn probe_plaintext(path: &Path) -> bool {
    let mut head = [0u8; 8192];
    match fs::File::open(path) {
        Ok(mut file) => match file.read(&mut head) {
            Ok(n) => !looks_binary(&head[..n]),
            Err(_) => false,
        },
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::diff::add_args;
    use std::fs;
    use tempfile::TempDir;

    fn parse(tokens: &[&str]) -> Parsed {
        let owned: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        parse_tokens(&owned, false, true).unwrap()
    }

    #[test]
    fn test_duplicate_flags_reduce_by_kind() {
        let parsed = parse(&["-n", "-n", "-c"]);
        let mut active = Vec::new();
        add_args(&mut active, &parsed.args);
        let kinds: Vec<ArgKind> = active.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ArgKind::Number, ArgKind::Clip]);
    }

    #[test]
    fn test_concat_short_explodes() {
        let parsed = parse(&["-abcef"]);
        let kinds: Vec<ArgKind> = parsed.args.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ArgKind::Blank, ArgKind::Clip, ArgKind::Ends]);
        assert_eq!(parsed.unknown_args, vec!["-a", "-f"]);
    }

    #[test]
    fn test_concat_echo_trigger_drops_rest_of_token() {
        // 'E' switches into echo capture; the trailing 'b' of the same
        // token is dropped, only following whole tokens are captured.
        let parsed = parse(&["-nEb", "hello", "-c"]);
        let kinds: Vec<ArgKind> = parsed.args.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ArgKind::Number, ArgKind::Echo]);
        assert_eq!(parsed.echo, vec!["hello", "-c"]);
        assert!(parsed.unknown_args.is_empty());
    }

    #[test]
    fn test_echo_captures_following_tokens_verbatim() {
        let parsed = parse(&["-E", "find=x", "[1:2]", "--help"]);
        assert_eq!(parsed.echo, vec!["find=x", "[1:2]", "--help"]);
        assert!(parsed.queries.is_empty());
        let kinds: Vec<ArgKind> = parsed.args.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ArgKind::Echo]);
    }

    #[test]
    fn test_find_directive_literal() {
        let parsed = parse(&["find=a\\tb"]);
        assert_eq!(
            parsed.queries,
            vec![Query::Literal {
                text: "a\tb".into(),
                ignore_case: false
            }]
        );
    }

    #[test]
    fn test_find_uppercase_prefix_is_case_insensitive() {
        let parsed = parse(&["FIND=Hello", "F=x"]);
        assert!(parsed.queries.iter().all(|q| q.ignore_case()));
    }

    #[test]
    fn test_find_unescape_disabled_by_flag() {
        let parsed = parse(&["--nu", "find=a\\tb"]);
        assert_eq!(
            parsed.queries,
            vec![Query::Literal {
                text: "a\\tb".into(),
                ignore_case: false
            }]
        );
    }

    #[test]
    fn test_match_directive_compiles_pattern() {
        let parsed = parse(&["m=[0-9]+"]);
        match &parsed.queries[0] {
            Query::Pattern {
                source,
                ignore_case,
                ..
            } => {
                assert_eq!(source, "[0-9]+");
                assert!(!ignore_case);
            }
            other => panic!("expected pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_match_invalid_pattern_is_fatal() {
        let tokens = vec!["match=[unclosed".to_string()];
        let err = parse_tokens(&tokens, false, true).unwrap_err();
        assert!(matches!(err, CatxError::InvalidPattern { .. }));
    }

    #[test]
    fn test_enc_directive() {
        let parsed = parse(&["enc=latin1"]);
        assert!(parsed.encoding.is_some());

        let parsed = parse(&["ENC:shift_jis"]);
        assert!(parsed.encoding.is_some());

        // Unknown labels are reported, not fatal
        let parsed = parse(&["enc=wat"]);
        assert!(parsed.encoding.is_none());
        assert_eq!(parsed.unknown_args, vec!["enc=wat"]);
    }

    #[test]
    fn test_trunc_directive_with_expressions() {
        let parsed = parse(&["trunc=2*2:10+1:2"]);
        let spec = parsed.trunc.unwrap();
        assert_eq!(spec.start, Some(4));
        assert_eq!(spec.stop, Some(11));
        assert_eq!(spec.step, Some(2));

        // Malformed fields fall back to unbounded
        let parsed = parse(&["trunc=oops:5"]);
        let spec = parsed.trunc.unwrap();
        assert_eq!(spec.start, None);
        assert_eq!(spec.stop, Some(5));
    }

    #[test]
    fn test_cut_bracket_kept_verbatim() {
        let parsed = parse(&["[1:3]", "[0:-1:2]"]);
        let tokens: Vec<&str> = parsed.args.iter().map(|a| a.token.as_str()).collect();
        assert_eq!(tokens, vec!["[1:3]", "[0:-1:2]"]);
        assert!(parsed.args.iter().all(|a| a.kind == ArgKind::Cut));

        let spec = cut_spec("[1:3]");
        assert_eq!(spec.start, Some(1));
        assert_eq!(spec.stop, Some(3));
    }

    #[test]
    fn test_replace_bracket_with_escaped_comma() {
        let parsed = parse(&["[a\\,b,c]"]);
        assert_eq!(parsed.args[0].kind, ArgKind::Replace);
        assert_eq!(
            parsed.replacements,
            vec![("[a\\,b,c]".to_string(), ("a,b".to_string(), "c".to_string()))]
        );
    }

    #[test]
    fn test_replace_sides_unescaped_independently() {
        let parsed = parse(&["[a\\tb,x\\ny]"]);
        let (_, (left, right)) = &parsed.replacements[0];
        assert_eq!(left, "a\tb");
        assert_eq!(right, "x\ny");
    }

    #[test]
    fn test_known_file_and_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/c.txt"), "c").unwrap();

        let file_token = dir.path().join("a.txt").display().to_string();
        let parsed = parse(&[file_token.as_str()]);
        assert_eq!(parsed.files.len(), 1);
        assert!(parsed.files[0].plaintext);

        // Directory: the dir itself plus its files, non-recursive
        let dir_token = dir.path().display().to_string();
        let parsed = parse(&[dir_token.as_str()]);
        assert_eq!(parsed.dirs.len(), 1);
        let names: Vec<&str> = parsed
            .files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_glob_expansion() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x1.log"), "1").unwrap();
        fs::write(dir.path().join("x2.log"), "2").unwrap();
        fs::write(dir.path().join("y.txt"), "y").unwrap();

        let pattern = dir.path().join("*.log").display().to_string();
        let parsed = parse(&[pattern.as_str()]);
        assert_eq!(parsed.files.len(), 2);
        assert!(parsed.unknown_globs.is_empty());

        let pattern = dir.path().join("*.missing").display().to_string();
        let parsed = parse(&[pattern.as_str()]);
        assert!(parsed.files.is_empty());
        assert_eq!(parsed.unknown_globs, vec![pattern]);
    }

    #[test]
    fn test_dir_token_matches_glob_expansion() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();

        let dir_token = dir.path().display().to_string();
        let glob_token = dir.path().join("*").display().to_string();

        let by_dir = parse(&[dir_token.as_str()]);
        let by_glob = parse(&[glob_token.as_str()]);

        let dir_paths: Vec<_> = by_dir.files.iter().map(|f| f.path.clone()).collect();
        let glob_paths: Vec<_> = by_glob.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(dir_paths, glob_paths);
    }

    #[test]
    fn test_unknown_fallbacks() {
        let parsed = parse(&["--wat", "no-such-file.txt"]);
        assert_eq!(parsed.unknown_args, vec!["--wat"]);
        assert_eq!(parsed.unknown_files, vec!["no-such-file.txt"]);
    }

    #[test]
    fn test_binary_file_not_plaintext() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.dat");
        fs::write(&path, [0x7f, 0x00, 0x01, 0x02]).unwrap();

        let token = path.display().to_string();
        let parsed = parse(&[token.as_str()]);
        assert!(!parsed.files[0].plaintext);
    }
}
