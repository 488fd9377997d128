//! The options strip on the bottom screen row.
//!
//! ```text
//! ⟬ colors: ██████████████████████████████ ⟭ ⟬ tips: ░  ▒  ▓  ■  ⬤     .  ◌  ⟭ ⟬ selected: ░ ⟭ ⟬ clear    erase    move 0x0 ⟭ ⟬ save ⟭
//! ```
//!
//! The strip is built as a list of [`Span`]s, and clicks are resolved by
//! walking the same spans. The offset readout before `save` grows and
//! shrinks with the pan offset, which moves the save button; because the
//! hit boxes come from the rendered spans, they always agree with what the
//! user sees.

use std::borrow::Cow;
use std::ops::RangeInclusive;

use tp_term::buffer::string_width;
use tp_term::cell::Attr;
use tp_term::color::CellColor;

use crate::palette::PaletteIndex;
use crate::plane::Point;
use crate::tool::{Mode, TIPS, ToolState};

/// What a click on the strip asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripAction {
    SelectColor(PaletteIndex),
    SelectTip(usize),
    Clear,
    ToggleErase,
    TogglePan,
    Save,
}

/// A run of strip text in one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: Cow<'static, str>,
    pub fg: CellColor,
    pub bg: CellColor,
    pub attrs: Attr,
    /// What clicking anywhere on this span does.
    pub action: Option<StripAction>,
}

impl Span {
    fn plain(text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            text: text.into(),
            fg: CellColor::Default,
            bg: CellColor::Default,
            attrs: Attr::empty(),
            action: None,
        }
    }

    fn button(text: &'static str, action: StripAction) -> Self {
        Self {
            action: Some(action),
            ..Self::plain(text)
        }
    }

    fn fg(mut self, color: CellColor) -> Self {
        self.fg = color;
        self
    }

    fn bg(mut self, color: CellColor) -> Self {
        self.bg = color;
        self
    }

    fn attrs(mut self, attrs: Attr) -> Self {
        self.attrs = attrs;
        self
    }

    /// Display width in terminal columns.
    #[must_use]
    pub fn width(&self) -> u16 {
        u16::try_from(string_width(&self.text)).unwrap_or(u16::MAX)
    }
}

const ACTIVE: Attr = Attr::BOLD.union(Attr::UNDERLINE);

fn toggle_attrs(active: bool) -> Attr {
    if active { ACTIVE } else { Attr::empty() }
}

/// The strip for the given tool state and pan offset, with an optional
/// status message at the end.
#[must_use]
pub fn spans(tools: &ToolState, offset: Point, status: Option<&str>) -> Vec<Span> {
    let selected = tools.color().cell_color();
    let mut out = Vec::with_capacity(48);

    out.push(Span::plain("⟬ colors: "));
    for color in PaletteIndex::all() {
        out.push(Span::button("  ", StripAction::SelectColor(color)).bg(color.cell_color()));
    }
    out.push(Span::plain(" ⟭ "));

    out.push(Span::plain("⟬ tips: "));
    for (i, tip) in TIPS.iter().enumerate() {
        let button = Span::plain(tip.glyph.unwrap_or(' ').to_string());
        let button = Span {
            action: Some(StripAction::SelectTip(i)),
            ..button
        };
        out.push(if tip.is_solid() {
            button.bg(selected)
        } else {
            button.fg(selected)
        });
        out.push(Span::plain("  "));
    }
    out.push(Span::plain("⟭ "));

    out.push(Span::plain("⟬ selected: "));
    let tip = tools.tip();
    let preview = Span::plain(tip.glyph.unwrap_or(' ').to_string());
    out.push(if tip.is_solid() {
        preview.bg(selected)
    } else {
        preview.fg(selected)
    });

    out.push(Span::plain(" ⟭ ⟬ "));
    out.push(Span::button("clear", StripAction::Clear));
    out.push(Span::plain("    "));
    out.push(
        Span::button("erase", StripAction::ToggleErase)
            .attrs(toggle_attrs(tools.mode() == Mode::Erase)),
    );
    out.push(Span::plain("    "));
    out.push(
        Span::button("move", StripAction::TogglePan).attrs(toggle_attrs(tools.mode() == Mode::Pan)),
    );
    out.push(Span::plain(" "));
    out.push(Span::plain(offset_readout(offset)));
    out.push(Span::plain(" ⟭ ⟬ "));
    out.push(Span::button("save", StripAction::Save));
    out.push(Span::plain(" ⟭"));

    if let Some(status) = status {
        out.push(Span::plain(format!(" {status}")));
    }
    out
}

/// The pan offset as shown on the strip, e.g. `-2x0`.
#[must_use]
pub fn offset_readout(offset: Point) -> String {
    format!("{}x{}", offset.x, offset.y)
}

/// The action under screen column `x`, if any.
#[must_use]
pub fn hit_test(spans: &[Span], x: u16) -> Option<StripAction> {
    let mut col: u16 = 0;
    for span in spans {
        let end = col.saturating_add(span.width());
        if x < end {
            return span.action;
        }
        col = end;
    }
    None
}

/// Screen columns covered by the first span carrying `action`.
#[must_use]
pub fn columns_of(spans: &[Span], action: StripAction) -> Option<RangeInclusive<u16>> {
    let mut col: u16 = 0;
    for span in spans {
        let width = span.width();
        if span.action == Some(action) && width > 0 {
            return Some(col..=col + width - 1);
        }
        col = col.saturating_add(width);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn default_spans(offset: Point) -> Vec<Span> {
        spans(&ToolState::new(), offset, None)
    }

    fn color(i: u8) -> PaletteIndex {
        PaletteIndex::new(i).unwrap()
    }

    fn save_start(offset: Point) -> u16 {
        *columns_of(&default_spans(offset), StripAction::Save).unwrap().start()
    }

    #[test]
    fn color_ramp_maps_linearly() {
        let s = default_spans(Point::ORIGIN);
        for x in 10..=39u16 {
            let expected = color(u8::try_from((x - 10) * 15 / 30).unwrap());
            assert_eq!(hit_test(&s, x), Some(StripAction::SelectColor(expected)), "x={x}");
        }
        assert_eq!(hit_test(&s, 9), None);
        assert_eq!(hit_test(&s, 40), None);
    }

    #[test]
    fn tip_buttons_sit_on_catalog_columns() {
        let s = default_spans(Point::ORIGIN);
        for (i, tip) in TIPS.iter().enumerate() {
            assert_eq!(hit_test(&s, tip.column), Some(StripAction::SelectTip(i)));
            assert_eq!(hit_test(&s, tip.column + 1), None);
        }
    }

    #[test]
    fn fixed_buttons() {
        let s = default_spans(Point::ORIGIN);
        assert_eq!(columns_of(&s, StripAction::Clear), Some(95..=99));
        assert_eq!(columns_of(&s, StripAction::ToggleErase), Some(104..=108));
        assert_eq!(columns_of(&s, StripAction::TogglePan), Some(113..=116));
        assert_eq!(hit_test(&s, 94), None);
        assert_eq!(hit_test(&s, 100), None);
        assert_eq!(hit_test(&s, 117), None);
    }

    #[test]
    fn save_follows_offset_digits() {
        for (x, y) in [(0, 0), (-2, 0), (150, -37), (-1000, 12345)] {
            let digits = |n: i32| u16::try_from(n.to_string().len()).unwrap();
            let expected = 126 + digits(x) + digits(y) - 2;
            let offset = Point::new(x, y);
            assert_eq!(save_start(offset), expected, "offset {x}x{y}");
            assert_eq!(
                columns_of(&default_spans(offset), StripAction::Save),
                Some(expected..=expected + 3)
            );
        }
    }

    #[test]
    fn offset_readout_is_not_clickable() {
        let s = default_spans(Point::ORIGIN);
        assert_eq!(hit_test(&s, 118), None);
    }

    #[test]
    fn past_the_end_hits_nothing() {
        let s = spans(&ToolState::new(), Point::ORIGIN, Some("saved images/1.txt"));
        assert_eq!(hit_test(&s, 500), None);
        assert_eq!(hit_test(&s, 135), None);
    }

    #[test]
    fn active_mode_is_bold_underlined() {
        let mut tools = ToolState::new();
        tools.toggle_erase();
        let s = spans(&tools, Point::ORIGIN, None);
        let erase = s.iter().find(|sp| sp.action == Some(StripAction::ToggleErase)).unwrap();
        let pan = s.iter().find(|sp| sp.action == Some(StripAction::TogglePan)).unwrap();
        assert_eq!(erase.attrs, Attr::BOLD | Attr::UNDERLINE);
        assert!(pan.attrs.is_empty());
    }

    #[test]
    fn tips_render_in_selected_color() {
        let mut tools = ToolState::new();
        tools.select_color(color(6));
        let s = spans(&tools, Point::ORIGIN, None);
        let solid = s.iter().find(|sp| sp.action == Some(StripAction::SelectTip(5))).unwrap();
        let shade = s.iter().find(|sp| sp.action == Some(StripAction::SelectTip(0))).unwrap();
        assert_eq!(solid.bg, CellColor::Ansi256(6));
        assert_eq!(shade.fg, CellColor::Ansi256(6));
        assert_eq!(shade.text, "░");
    }

    #[test]
    fn status_is_appended() {
        let s = spans(&ToolState::new(), Point::ORIGIN, Some("export failed"));
        assert_eq!(s.last().map(|sp| sp.text.as_ref()), Some(" export failed"));
    }
}
