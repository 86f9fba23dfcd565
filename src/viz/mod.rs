//! Visualization module - 2-D byte views and entropy rendering
//!
//! Turns the curve/entropy generators into terminal output: every cell is
//! a two-character hex pair colored by byte class (or by the local entropy
//! estimate), sentinel cells render as blanks.

pub mod curves;
pub mod entropy;

use std::io::{self, Write};

use crate::core::colors::ColorScheme;
use crate::viz::curves::{fit_terminal_square, HilbertRows, ScanRows, ZorderRows};
use crate::viz::entropy::EntropyScan;

/// Which 2-D view to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VizMode {
    Scan,
    Zorder,
    Hilbert,
    Entropy,
}

/// Render a byte sequence as a 2-D hex view.
pub fn render<W: Write>(
    data: &[u8],
    mode: VizMode,
    width_budget: usize,
    colors: &ColorScheme,
    out: &mut W,
) -> io::Result<()> {
    let width = fit_terminal_square(data.len(), width_budget);
    match mode {
        VizMode::Scan => render_rows(ScanRows::new(data, width), colors, out),
        VizMode::Zorder => render_rows(ZorderRows::new(data, width), colors, out),
        VizMode::Hilbert => render_rows(HilbertRows::new(data, width), colors, out),
        VizMode::Entropy => render_entropy(data, width, colors, out),
    }
}

/// Paint generator rows: hex pairs colored by byte class.
fn render_rows<W: Write>(
    rows: impl Iterator<Item = Vec<i16>>,
    colors: &ColorScheme,
    out: &mut W,
) -> io::Result<()> {
    for row in rows {
        let mut line = String::new();
        for cell in row {
            if cell < 0 {
                line.push_str("  ");
            } else {
                let byte = cell as u8;
                line.push_str(colors.byte_color(byte));
                line.push_str(&format!("{:02x}", byte));
                line.push_str(&colors.reset);
            }
        }
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

/// Row-major hex view colored by the sliding-window entropy at each
/// byte position.
fn render_entropy<W: Write>(
    data: &[u8],
    width: usize,
    colors: &ColorScheme,
    out: &mut W,
) -> io::Result<()> {
    let values: Vec<f64> = EntropyScan::new(data).collect();
    for (chunk_index, chunk) in data.chunks(width.max(1)).enumerate() {
        let mut line = String::new();
        for (offset, &byte) in chunk.iter().enumerate() {
            let position = chunk_index * width + offset;
            line.push_str(colors.entropy_color(values[position]));
            line.push_str(&format!("{:02x}", byte));
            line.push_str(&colors.reset);
        }
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_scan_plain() {
        let data: Vec<u8> = (0..8).collect();
        let mut out = Vec::new();
        render(&data, VizMode::Scan, 80, &ColorScheme::plain(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        // fit(8, 80) = 2: two bytes per row, odd rows reversed
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows[0], "0001");
        assert_eq!(rows[1], "0302");
        assert_eq!(rows[3], "0706");
    }

    #[test]
    fn test_render_sentinel_as_blank() {
        let data: Vec<u8> = (0..10).collect();
        let mut out = Vec::new();
        render_rows(ScanRows::new(&data, 4), &ColorScheme::plain(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows[2], "0809    ");
    }

    #[test]
    fn test_render_entropy_shape() {
        let data = vec![0x41u8; 32];
        let mut out = Vec::new();
        render(&data, VizMode::Entropy, 80, &ColorScheme::plain(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        // fit(32, 80) = 4: eight rows of four cells
        assert_eq!(text.lines().count(), 8);
        assert!(text.lines().all(|l| l == "41414141"));
    }

    #[test]
    fn test_colored_cells_carry_escapes() {
        let data = vec![0x00u8, 0x41];
        let mut out = Vec::new();
        render_rows(
            ScanRows::new(&data, 2),
            &ColorScheme::ansi(),
            &mut out,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\x1b["));
        assert!(text.contains("00"));
        assert!(text.contains("41"));
    }
}
