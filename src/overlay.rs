use crate::config::CaptionStyle;
use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

impl Rgba {
    pub const WHITE: Rgba = Rgba(255, 255, 255, 255);
    pub const BLACK: Rgba = Rgba(0, 0, 0, 255);

    /// `0xRRGGBB@alpha`, the colour syntax ffmpeg filters accept.
    pub fn to_ffmpeg(self) -> String {
        format!(
            "0x{:02X}{:02X}{:02X}@{:.3}",
            self.0,
            self.1,
            self.2,
            self.3 as f64 / 255.0
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: u32,
    pub padding: u32,
    pub line_height: u32,
    pub foreground: Rgba,
    pub background: Option<Rgba>,
    pub border: Option<(Rgba, u32)>,
}

/// Wrapped text plus the pixel box it occupies. Position is decided by the
/// timeline, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub style: TextStyle,
}

/// Lays text out into an overlay block. Implementations differ in look only.
pub trait TextRenderer: Send + Sync {
    fn name(&self) -> &'static str;
    fn render(&self, text: &str, width: u32, font_size: u32) -> Result<TextBlock>;
}

/// White text on a translucent black box.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoxedText;

/// White text with a black outline and no box.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutlinedText;

impl TextRenderer for BoxedText {
    fn name(&self) -> &'static str {
        "boxed"
    }

    fn render(&self, text: &str, width: u32, font_size: u32) -> Result<TextBlock> {
        let style = TextStyle {
            font_size,
            padding: 24,
            line_height: (font_size as f64 * 1.6) as u32,
            foreground: Rgba::WHITE,
            background: Some(Rgba(0, 0, 0, 160)),
            border: None,
        };
        layout(text, width, style)
    }
}

impl TextRenderer for OutlinedText {
    fn name(&self) -> &'static str {
        "outlined"
    }

    fn render(&self, text: &str, width: u32, font_size: u32) -> Result<TextBlock> {
        let style = TextStyle {
            font_size,
            padding: 12,
            line_height: (font_size as f64 * 1.3) as u32,
            foreground: Rgba::WHITE,
            background: None,
            border: Some((Rgba::BLACK, 2)),
        };
        layout(text, width, style)
    }
}

pub fn renderer_for(style: CaptionStyle) -> Box<dyn TextRenderer> {
    match style {
        CaptionStyle::Boxed => Box::new(BoxedText),
        CaptionStyle::Outlined => Box::new(OutlinedText),
    }
}

/// Characters per line for a glyph width of roughly half the font size.
pub fn max_chars_per_line(width: u32, font_size: u32) -> usize {
    let glyph = (font_size / 2).max(1);
    ((width / glyph) as usize).max(10)
}

fn layout(text: &str, width: u32, style: TextStyle) -> Result<TextBlock> {
    if text.trim().is_empty() {
        anyhow::bail!("nothing to draw");
    }
    if style.font_size == 0 {
        anyhow::bail!("font size must be positive");
    }
    if width <= style.padding * 2 {
        anyhow::bail!("overlay width {}px leaves no room for text", width);
    }

    let lines = wrap_text(text, max_chars_per_line(width, style.font_size));
    let height = style.padding * 2 + style.line_height * lines.len() as u32;
    Ok(TextBlock {
        lines,
        width,
        height,
        style,
    })
}

/// Greedy word wrap per paragraph. Words longer than a line are split; blank
/// paragraphs keep an empty line.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut out = Vec::new();

    for para in text.lines() {
        let mut current = String::new();
        let mut current_len = 0usize;
        let mut para_lines = Vec::new();

        for word in para.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();
            while chars.len() > max_chars {
                if current_len > 0 {
                    para_lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = chars.split_off(max_chars);
                para_lines.push(chars.into_iter().collect());
                chars = rest;
            }
            if chars.is_empty() {
                continue;
            }

            let needed = if current_len == 0 { chars.len() } else { current_len + 1 + chars.len() };
            if needed > max_chars && current_len > 0 {
                para_lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(chars.iter());
            current_len += chars.len();
        }
        if current_len > 0 {
            para_lines.push(current);
        }

        if para_lines.is_empty() {
            out.push(String::new());
        } else {
            out.extend(para_lines);
        }
    }

    if out.is_empty() {
        out.push(String::new());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_line_width() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
    }

    #[test]
    fn wrap_keeps_paragraphs_and_blank_lines() {
        let lines = wrap_text("first\n\nsecond", 20);
        assert_eq!(lines, vec!["first", "", "second"]);
    }

    #[test]
    fn wrap_splits_overlong_words() {
        let lines = wrap_text("a supercalifragilistic word", 10);
        assert_eq!(lines, vec!["a", "supercalif", "ragilistic", "word"]);
    }

    #[test]
    fn chars_per_line_has_floor() {
        assert_eq!(max_chars_per_line(1728, 32), 108);
        assert_eq!(max_chars_per_line(60, 32), 10);
    }

    #[test]
    fn boxed_block_geometry() {
        let block = BoxedText.render("DMAIC meets Process Intelligence", 1000, 42).unwrap();
        assert_eq!(block.lines, vec!["DMAIC meets Process Intelligence"]);
        assert_eq!(block.style.line_height, 67);
        assert_eq!(block.height, 24 * 2 + 67);
        assert_eq!(block.style.background, Some(Rgba(0, 0, 0, 160)));
    }

    #[test]
    fn outlined_block_has_border_and_no_box() {
        let block = OutlinedText.render("hello", 400, 32).unwrap();
        assert!(block.style.background.is_none());
        assert_eq!(block.style.border, Some((Rgba::BLACK, 2)));
    }

    #[test]
    fn empty_or_narrow_overlays_are_rejected() {
        assert!(BoxedText.render("  ", 800, 32).is_err());
        assert!(BoxedText.render("text", 40, 32).is_err());
    }

    #[test]
    fn ffmpeg_colour_syntax() {
        assert_eq!(Rgba(0, 0, 0, 160).to_ffmpeg(), "0x000000@0.627");
        assert_eq!(Rgba::WHITE.to_ffmpeg(), "0xFFFFFF@1.000");
    }
}
