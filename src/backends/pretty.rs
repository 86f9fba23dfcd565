//! JSON pretty-printing service
//!
//! Re-indents JSON content; anything that does not parse as JSON is
//! returned untouched.

use serde_json::Value;

/// Pretty-print the content when it parses as JSON.
pub fn pretty_json_lines(lines: &[String]) -> Vec<String> {
    let joined = lines.join("\n");
    match serde_json::from_str::<Value>(&joined) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => pretty.lines().map(|l| l.to_string()).collect(),
            Err(_) => lines.to_vec(),
        },
        Err(_) => lines.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_prints_json() {
        let input = vec![r#"{"b":1,"a":[1,2]}"#.to_string()];
        let output = pretty_json_lines(&input);
        assert!(output.len() > 1);
        assert_eq!(output[0], "{");
        assert!(output.iter().any(|l| l.contains("\"a\": [")));
    }

    #[test]
    fn test_non_json_untouched() {
        let input = vec!["plain text".to_string(), "more".to_string()];
        assert_eq!(pretty_json_lines(&input), input);
    }

    #[test]
    fn test_multiline_json() {
        let input = vec!["{".to_string(), "\"k\": 2}".to_string()];
        let output = pretty_json_lines(&input);
        assert_eq!(output, vec!["{", "  \"k\": 2", "}"]);
    }
}
