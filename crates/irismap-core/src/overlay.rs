//! Grid overlay handling: sanitization, recoloring, and overlay state.
//!
//! Grid files are SVG line drawings overlaid on the photograph. Built-in
//! grids are trusted, but users can upload their own, so every grid
//! passes through [`sanitize_svg`] before it is stored. Recoloring
//! rewrites stroke and fill attributes so the grid matches the chosen
//! map color without touching its geometry.

use std::borrow::Cow;
use std::io::Cursor;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// Default map color applied to grids.
pub const DEFAULT_MAP_COLOR: &str = "#000000";
/// Default overlay opacity.
pub const DEFAULT_OPACITY: f32 = 0.7;

/// Built-in iris map catalog. Each entry names a pair of grid files,
/// one per eye, following the [`grid_file_name`] convention.
pub const DEFAULT_MAPS: [&str; 8] = [
    "Angerer_DE_01",
    "Bourdil_FR_01",
    "IrisLAB_EN_02",
    "IrisLAB_FR_02",
    "Jaussas_FR_01",
    "Jensen_EN_01",
    "Jensen_FR_01",
    "Roux_FR_01",
];

/// Resource name of one eye's grid file for a named map.
pub fn grid_file_name(map_name: &str, eye_id: &str) -> String {
    format!("{}_{}.svg", map_name, eye_id)
}

/// Errors from overlay parsing and rewriting.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// The markup could not be parsed as XML.
    #[error("Failed to parse SVG markup: {0}")]
    Parse(#[from] quick_xml::Error),

    /// A malformed attribute inside the markup.
    #[error("Malformed SVG attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// Serialization of the rewritten markup failed.
    #[error("Failed to serialize SVG markup: {0}")]
    Serialize(#[from] std::io::Error),

    /// The document's root element is not `<svg>`.
    #[error("Document is not an SVG")]
    NotSvg,

    /// A map color that is not a `#rgb` or `#rrggbb` hex string.
    #[error("Invalid map color: {0:?}")]
    InvalidColor(String),
}

/// Elements allowed through sanitization. Anything else is dropped
/// together with its subtree.
const ALLOWED_ELEMENTS: &[&[u8]] = &[
    b"svg",
    b"g",
    b"defs",
    b"title",
    b"desc",
    b"path",
    b"rect",
    b"circle",
    b"ellipse",
    b"line",
    b"polyline",
    b"polygon",
    b"text",
    b"tspan",
    b"use",
    b"symbol",
    b"marker",
    b"clipPath",
    b"mask",
    b"pattern",
    b"linearGradient",
    b"radialGradient",
    b"stop",
];

/// Drawable elements that receive the map color on their stroke.
const SHAPE_ELEMENTS: &[&[u8]] = &[
    b"path",
    b"rect",
    b"circle",
    b"ellipse",
    b"line",
    b"polyline",
    b"polygon",
];

/// Elements whose fill is always recolored.
const TEXT_ELEMENTS: &[&[u8]] = &[b"text", b"tspan"];

fn is_allowed(name: &[u8]) -> bool {
    ALLOWED_ELEMENTS.contains(&name)
}

/// True for attributes that could execute script: `on*` event handlers
/// and `javascript:` hyperlink targets.
fn is_scripting_attribute(key: &[u8], value: &[u8]) -> bool {
    if key.len() >= 2 && key[..2].eq_ignore_ascii_case(b"on") {
        return true;
    }
    let is_href = key == b"href" || key.ends_with(b":href");
    if is_href {
        let trimmed: Vec<u8> = value
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        if trimmed.len() >= 11 && trimmed[..11].eq_ignore_ascii_case(b"javascript:") {
            return true;
        }
    }
    false
}

/// Copy an element, dropping scripting attributes.
fn sanitize_element(element: &BytesStart<'_>) -> Result<BytesStart<'static>, OverlayError> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    for attribute in element.attributes() {
        let attribute = attribute?;
        let key = attribute.key.as_ref().to_vec();
        let value = attribute.value.into_owned();
        if is_scripting_attribute(&key, &value) {
            continue;
        }
        out.push_attribute(Attribute {
            key: QName(&key),
            value: Cow::Borrowed(value.as_slice()),
        });
    }
    Ok(out)
}

/// Neutralize untrusted SVG markup.
///
/// Keeps only allowlisted elements (dropping disallowed subtrees whole,
/// so script bodies never survive as text), strips event-handler
/// attributes and `javascript:` targets, and rejects documents whose
/// root element is not `<svg>`.
pub fn sanitize_svg(markup: &str) -> Result<String, OverlayError> {
    let mut reader = Reader::from_str(markup);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut root_seen = false;
    let mut skip_depth: u32 = 0;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(element) => {
                if skip_depth > 0 {
                    skip_depth += 1;
                    continue;
                }
                let name = element.name();
                if !root_seen {
                    if name.as_ref() != b"svg" {
                        return Err(OverlayError::NotSvg);
                    }
                    root_seen = true;
                }
                if is_allowed(name.as_ref()) {
                    writer.write_event(Event::Start(sanitize_element(&element)?))?;
                } else {
                    skip_depth = 1;
                }
            }
            Event::End(element) => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                    continue;
                }
                writer.write_event(Event::End(element))?;
            }
            Event::Empty(element) => {
                if skip_depth > 0 {
                    continue;
                }
                let name = element.name();
                if !root_seen {
                    if name.as_ref() != b"svg" {
                        return Err(OverlayError::NotSvg);
                    }
                    root_seen = true;
                }
                if is_allowed(name.as_ref()) {
                    writer.write_event(Event::Empty(sanitize_element(&element)?))?;
                }
            }
            // Stray content before the root element is dropped along
            // with anything inside a disallowed subtree.
            Event::Text(text) => {
                if skip_depth == 0 && root_seen {
                    writer.write_event(Event::Text(text))?;
                }
            }
            Event::CData(cdata) => {
                if skip_depth == 0 && root_seen {
                    writer.write_event(Event::CData(cdata))?;
                }
            }
            Event::Comment(comment) => {
                if skip_depth == 0 && root_seen {
                    writer.write_event(Event::Comment(comment))?;
                }
            }
            Event::Decl(decl) => writer.write_event(Event::Decl(decl))?,
            Event::DocType(doctype) => writer.write_event(Event::DocType(doctype))?,
            // Processing instructions can pull in external resources.
            Event::PI(_) => {}
        }
    }

    if !root_seen {
        return Err(OverlayError::NotSvg);
    }

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Rewrite an element's paint attributes with the map color.
///
/// Shapes get the color on their stroke, and on their fill only when an
/// explicit fill other than "none" is already present. Grid windows rely
/// on `fill="none"` staying transparent. Text elements always get the
/// color as fill so labels remain legible.
fn recolor_element(
    element: &BytesStart<'_>,
    color: &str,
) -> Result<BytesStart<'static>, OverlayError> {
    let name = element.name().as_ref().to_vec();
    let is_shape = SHAPE_ELEMENTS.contains(&name.as_slice());
    let is_text = TEXT_ELEMENTS.contains(&name.as_slice());

    let mut out = BytesStart::new(String::from_utf8_lossy(&name).into_owned());
    let mut fill_written = false;
    for attribute in element.attributes() {
        let attribute = attribute?;
        let key = attribute.key.as_ref().to_vec();
        let value = attribute.value.into_owned();

        if is_shape && key == b"stroke" {
            // Replaced by the single stroke pushed below.
            continue;
        }
        if key == b"fill" {
            if is_text || (is_shape && value != b"none") {
                out.push_attribute(("fill", color));
            } else {
                out.push_attribute(Attribute {
                    key: QName(b"fill"),
                    value: Cow::Borrowed(value.as_slice()),
                });
            }
            fill_written = true;
            continue;
        }
        out.push_attribute(Attribute {
            key: QName(&key),
            value: Cow::Borrowed(value.as_slice()),
        });
    }
    if is_shape {
        out.push_attribute(("stroke", color));
    }
    if is_text && !fill_written {
        out.push_attribute(("fill", color));
    }
    Ok(out)
}

/// Apply a map color to every drawable element of a grid.
pub fn recolor_svg(markup: &str, color: &str) -> Result<String, OverlayError> {
    parse_hex_color(color)?;

    let mut reader = Reader::from_str(markup);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(element) => {
                writer.write_event(Event::Start(recolor_element(&element, color)?))?;
            }
            Event::Empty(element) => {
                writer.write_event(Event::Empty(recolor_element(&element, color)?))?;
            }
            event => writer.write_event(event)?,
        }
    }

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse a `#rgb` or `#rrggbb` hex color into RGB bytes.
pub fn parse_hex_color(color: &str) -> Result<[u8; 3], OverlayError> {
    let invalid = || OverlayError::InvalidColor(color.to_string());
    let digits = color.strip_prefix('#').ok_or_else(invalid)?;

    match digits.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in digits.chars().enumerate() {
                let nibble = c.to_digit(16).ok_or_else(invalid)? as u8;
                rgb[i] = nibble * 16 + nibble;
            }
            Ok(rgb)
        }
        6 => {
            let mut rgb = [0u8; 3];
            for (i, slot) in rgb.iter_mut().enumerate() {
                *slot = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
                    .map_err(|_| invalid())?;
            }
            Ok(rgb)
        }
        _ => Err(invalid()),
    }
}

/// The grid overlay attached to one eye's viewport.
///
/// Content is stored sanitized. Setting new content that fails to parse
/// leaves the previous overlay in place.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OverlayState {
    content: Option<String>,
    color: String,
    opacity: f32,
}

impl Default for OverlayState {
    fn default() -> Self {
        Self {
            content: None,
            color: DEFAULT_MAP_COLOR.to_string(),
            opacity: DEFAULT_OPACITY,
        }
    }
}

impl OverlayState {
    /// Create a new overlay with no grid loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitize and store new grid markup.
    ///
    /// # Errors
    /// Returns the sanitization failure without touching the currently
    /// stored grid.
    pub fn set_content(&mut self, markup: &str) -> Result<(), OverlayError> {
        let sanitized = sanitize_svg(markup)?;
        self.content = Some(sanitized);
        Ok(())
    }

    /// Remove the current grid.
    pub fn clear(&mut self) {
        self.content = None;
    }

    /// The sanitized grid markup, if a grid is loaded.
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// True if a grid is currently loaded.
    pub fn has_grid(&self) -> bool {
        self.content.is_some()
    }

    /// The current map color as a hex string.
    pub fn color(&self) -> &str {
        &self.color
    }

    /// Set the map color.
    ///
    /// # Errors
    /// Rejects strings that are not valid hex colors, keeping the
    /// previous color.
    pub fn set_color(&mut self, color: &str) -> Result<(), OverlayError> {
        parse_hex_color(color)?;
        self.color = color.to_string();
        Ok(())
    }

    /// Overlay opacity in [0, 1].
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Set the overlay opacity, clamping into [0, 1].
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_nan() {
            DEFAULT_OPACITY
        } else {
            opacity.clamp(0.0, 1.0)
        };
    }

    /// The grid markup recolored with the current map color, ready for
    /// display or rasterization.
    pub fn display_content(&self) -> Result<Option<String>, OverlayError> {
        match &self.content {
            Some(markup) => Ok(Some(recolor_svg(markup, &self.color)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_GRID: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><circle cx="50" cy="50" r="40" fill="none"/><path d="M0 50 H100"/></svg>"##;

    // ===== Sanitization =====

    #[test]
    fn test_sanitize_passes_clean_grid() {
        let out = sanitize_svg(SIMPLE_GRID).unwrap();
        assert!(out.contains("<circle"));
        assert!(out.contains("<path"));
        assert!(out.contains("viewBox=\"0 0 100 100\""));
    }

    #[test]
    fn test_sanitize_strips_script_subtree() {
        let markup = r#"<svg><script>alert("x")</script><path d="M0 0"/></svg>"#;
        let out = sanitize_svg(markup).unwrap();
        assert!(!out.contains("script"));
        assert!(!out.contains("alert"));
        assert!(out.contains("<path"));
    }

    #[test]
    fn test_sanitize_strips_nested_disallowed_subtree() {
        let markup =
            r#"<svg><foreignObject><body><script>x()</script></body></foreignObject></svg>"#;
        let out = sanitize_svg(markup).unwrap();
        assert!(!out.contains("foreignObject"));
        assert!(!out.contains("body"));
        assert_eq!(out, "<svg></svg>");
    }

    #[test]
    fn test_sanitize_strips_event_handlers() {
        let markup = r#"<svg onload="evil()"><circle onclick="evil()" r="5"/></svg>"#;
        let out = sanitize_svg(markup).unwrap();
        assert!(!out.contains("onload"));
        assert!(!out.contains("onclick"));
        assert!(out.contains("r=\"5\""));
    }

    #[test]
    fn test_sanitize_strips_javascript_href() {
        let markup = r##"<svg><use href="javascript:evil()"/><use href="#a"/></svg>"##;
        let out = sanitize_svg(markup).unwrap();
        assert!(!out.contains("javascript"));
        assert!(out.contains("href=\"#a\""));
    }

    #[test]
    fn test_sanitize_drops_content_before_root() {
        let markup = "<!-- header -->\nstray text\n<svg><path d=\"M0 0\"/></svg>";
        let out = sanitize_svg(markup).unwrap();
        assert!(out.starts_with("<svg>"));
        assert!(!out.contains("header"));
        assert!(!out.contains("stray"));
    }

    #[test]
    fn test_sanitize_rejects_non_svg_root() {
        assert!(matches!(
            sanitize_svg("<html><body/></html>"),
            Err(OverlayError::NotSvg)
        ));
        assert!(matches!(sanitize_svg("just text"), Err(OverlayError::NotSvg)));
    }

    // ===== Recoloring =====

    #[test]
    fn test_recolor_sets_stroke_on_shapes() {
        let out = recolor_svg(SIMPLE_GRID, "#ff0000").unwrap();
        assert!(out.contains(r##"<path d="M0 50 H100" stroke="#ff0000""##));
    }

    #[test]
    fn test_recolor_preserves_fill_none() {
        // Grid windows must stay transparent.
        let out = recolor_svg(SIMPLE_GRID, "#ff0000").unwrap();
        assert!(out.contains(r#"fill="none""#));
    }

    #[test]
    fn test_recolor_replaces_existing_fill() {
        let markup = r##"<svg><rect fill="#abcdef" width="10" height="10"/></svg>"##;
        let out = recolor_svg(markup, "#00ff00").unwrap();
        assert!(out.contains(r##"fill="#00ff00""##));
        assert!(!out.contains("#abcdef"));
    }

    #[test]
    fn test_recolor_leaves_absent_fill_absent() {
        let markup = r#"<svg><path d="M0 0"/></svg>"#;
        let out = recolor_svg(markup, "#00ff00").unwrap();
        assert!(!out.contains("fill"));
        assert!(out.contains(r##"stroke="#00ff00""##));
    }

    #[test]
    fn test_recolor_always_fills_text() {
        let markup = r#"<svg><text x="1" y="2">zone</text></svg>"#;
        let out = recolor_svg(markup, "#0000ff").unwrap();
        assert!(out.contains(r##"<text x="1" y="2" fill="#0000ff">zone</text>"##));
    }

    #[test]
    fn test_recolor_ignores_structural_elements() {
        let markup = r#"<svg><g transform="rotate(3)"><path d="M0 0"/></g></svg>"#;
        let out = recolor_svg(markup, "#123456").unwrap();
        assert!(out.contains(r#"<g transform="rotate(3)">"#));
    }

    #[test]
    fn test_recolor_rejects_bad_color() {
        assert!(recolor_svg(SIMPLE_GRID, "red").is_err());
    }

    // ===== Colors =====

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#000000").unwrap(), [0, 0, 0]);
        assert_eq!(parse_hex_color("#ff8000").unwrap(), [255, 128, 0]);
        assert_eq!(parse_hex_color("#fff").unwrap(), [255, 255, 255]);
        assert!(parse_hex_color("ff8000").is_err());
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#zzzzzz").is_err());
    }

    // ===== OverlayState =====

    #[test]
    fn test_state_defaults() {
        let state = OverlayState::new();
        assert!(!state.has_grid());
        assert_eq!(state.color(), DEFAULT_MAP_COLOR);
        assert_eq!(state.opacity(), DEFAULT_OPACITY);
        assert!(state.display_content().unwrap().is_none());
    }

    #[test]
    fn test_state_stores_sanitized_content() {
        let mut state = OverlayState::new();
        state
            .set_content(r#"<svg onload="x()"><path d="M0 0"/></svg>"#)
            .unwrap();
        let stored = state.content().unwrap();
        assert!(!stored.contains("onload"));
        assert!(stored.contains("<path"));
    }

    #[test]
    fn test_state_keeps_prior_grid_on_bad_content() {
        let mut state = OverlayState::new();
        state.set_content(SIMPLE_GRID).unwrap();
        let before = state.content().unwrap().to_string();

        assert!(state.set_content("<html/>").is_err());
        assert_eq!(state.content().unwrap(), before);
    }

    #[test]
    fn test_state_opacity_clamps() {
        let mut state = OverlayState::new();
        state.set_opacity(2.0);
        assert_eq!(state.opacity(), 1.0);
        state.set_opacity(-1.0);
        assert_eq!(state.opacity(), 0.0);
        state.set_opacity(f32::NAN);
        assert_eq!(state.opacity(), DEFAULT_OPACITY);
    }

    #[test]
    fn test_state_rejects_bad_color() {
        let mut state = OverlayState::new();
        assert!(state.set_color("blue").is_err());
        assert_eq!(state.color(), DEFAULT_MAP_COLOR);
        state.set_color("#336699").unwrap();
        assert_eq!(state.color(), "#336699");
    }

    #[test]
    fn test_display_content_applies_color() {
        let mut state = OverlayState::new();
        state.set_content(SIMPLE_GRID).unwrap();
        state.set_color("#aa0011").unwrap();
        let display = state.display_content().unwrap().unwrap();
        assert!(display.contains(r##"stroke="#aa0011""##));
    }

    // ===== Catalog =====

    #[test]
    fn test_grid_file_name() {
        assert_eq!(grid_file_name("Jensen_EN_01", "L"), "Jensen_EN_01_L.svg");
        assert_eq!(grid_file_name("Roux_FR_01", "R"), "Roux_FR_01_R.svg");
    }

    #[test]
    fn test_default_catalog() {
        assert_eq!(DEFAULT_MAPS.len(), 8);
        assert!(DEFAULT_MAPS.contains(&"IrisLAB_FR_02"));
    }
}
