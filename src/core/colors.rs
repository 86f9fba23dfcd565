//! Color scheme
//!
//! An immutable set of ANSI escape strings for every semantic role the
//! renderer splices into output. Constructed once at startup and passed by
//! reference; a plain scheme (all roles empty) disables coloring entirely.

/// ANSI escape strings per semantic role
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub found: String,
    pub found_reset: String,
    pub matched: String,
    pub matched_reset: String,
    pub number: String,
    pub decoration: String,
    pub ends: String,
    pub header: String,
    pub reset: String,
    pub viz_null: String,
    pub viz_printable: String,
    pub viz_space: String,
    pub viz_control: String,
    pub viz_high: String,
    pub entropy_low: String,
    pub entropy_mid: String,
    pub entropy_high: String,
    pub entropy_max: String,
}

impl ColorScheme {
    /// The default ANSI palette
    pub fn ansi() -> Self {
        Self {
            found: "\x1b[1;31m".into(),
            found_reset: "\x1b[0m".into(),
            matched: "\x1b[1;34m".into(),
            matched_reset: "\x1b[0m".into(),
            number: "\x1b[32m".into(),
            decoration: "\x1b[90m".into(),
            ends: "\x1b[33m".into(),
            header: "\x1b[1;36m".into(),
            reset: "\x1b[0m".into(),
            viz_null: "\x1b[90m".into(),
            viz_printable: "\x1b[36m".into(),
            viz_space: "\x1b[32m".into(),
            viz_control: "\x1b[33m".into(),
            viz_high: "\x1b[35m".into(),
            entropy_low: "\x1b[34m".into(),
            entropy_mid: "\x1b[32m".into(),
            entropy_high: "\x1b[33m".into(),
            entropy_max: "\x1b[31m".into(),
        }
    }

    /// All roles empty; splicing becomes a no-op
    pub fn plain() -> Self {
        Self {
            found: String::new(),
            found_reset: String::new(),
            matched: String::new(),
            matched_reset: String::new(),
            number: String::new(),
            decoration: String::new(),
            ends: String::new(),
            header: String::new(),
            reset: String::new(),
            viz_null: String::new(),
            viz_printable: String::new(),
            viz_space: String::new(),
            viz_control: String::new(),
            viz_high: String::new(),
            entropy_low: String::new(),
            entropy_mid: String::new(),
            entropy_high: String::new(),
            entropy_max: String::new(),
        }
    }

    /// Color for a visualized byte, by byte class.
    pub fn byte_color(&self, byte: u8) -> &str {
        match byte {
            0 => &self.viz_null,
            b'\t' | b'\n' | b'\r' | b' ' => &self.viz_space,
            0x21..=0x7e => &self.viz_printable,
            0x80..=0xff => &self.viz_high,
            _ => &self.viz_control,
        }
    }

    /// Color for an entropy estimate on the 0-100 scale.
    pub fn entropy_color(&self, value: f64) -> &str {
        if value < 25.0 {
            &self.entropy_low
        } else if value < 50.0 {
            &self.entropy_mid
        } else if value < 75.0 {
            &self.entropy_high
        } else {
            &self.entropy_max
        }
    }
}
