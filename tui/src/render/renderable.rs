use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::widgets::WidgetRef;

/// A widget that can report how tall it wants to be and where the terminal cursor belongs.
pub trait Renderable {
    fn render(&self, area: Rect, buf: &mut Buffer);
    fn desired_height(&self, width: u16) -> u16;
    fn cursor_pos(&self, _area: Rect) -> Option<(u16, u16)> {
        None
    }
}

pub type RenderableItem<'a> = Box<dyn Renderable + 'a>;

impl<'a, R> From<R> for Box<dyn Renderable + 'a>
where
    R: Renderable + 'a,
{
    fn from(value: R) -> Self {
        Box::new(value)
    }
}

impl<'a> Renderable for Line<'a> {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        WidgetRef::render_ref(self, area, buf);
    }
    fn desired_height(&self, _width: u16) -> u16 {
        1
    }
}

impl<'a> Renderable for Paragraph<'a> {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        self.render_ref(area, buf);
    }
    fn desired_height(&self, width: u16) -> u16 {
        u16::try_from(self.line_count(width)).unwrap_or(u16::MAX)
    }
}

impl<R: Renderable> Renderable for &R {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        (*self).render(area, buf);
    }
    fn desired_height(&self, width: u16) -> u16 {
        (*self).desired_height(width)
    }
    fn cursor_pos(&self, area: Rect) -> Option<(u16, u16)> {
        (*self).cursor_pos(area)
    }
}

/// Children stacked top to bottom, each given its desired height.
pub struct ColumnRenderable<'a> {
    children: Vec<RenderableItem<'a>>,
}

impl Renderable for ColumnRenderable<'_> {
    fn render(&self, area: Rect, buf: &mut Buffer) {
        let mut y = area.y;
        for child in &self.children {
            let child_area = child_area(area, y, child.desired_height(area.width));
            if !child_area.is_empty() {
                child.render(child_area, buf);
            }
            y = y.saturating_add(child_area.height);
        }
    }

    fn desired_height(&self, width: u16) -> u16 {
        self.children
            .iter()
            .fold(0u16, |total, child| total.saturating_add(child.desired_height(width)))
    }

    /// Cursor of the first child that reports one, offset by the child's row.
    fn cursor_pos(&self, area: Rect) -> Option<(u16, u16)> {
        let mut y = area.y;
        for child in &self.children {
            let child_area = child_area(area, y, child.desired_height(area.width));
            if !child_area.is_empty()
                && let Some(pos) = child.cursor_pos(child_area)
            {
                return Some(pos);
            }
            y = y.saturating_add(child_area.height);
        }
        None
    }
}

/// The slice of `area` starting at row `y`, at most `height` rows tall.
fn child_area(area: Rect, y: u16, height: u16) -> Rect {
    Rect {
        x: area.x,
        y,
        width: area.width,
        height: height.min(area.bottom().saturating_sub(y)),
    }
}

impl<'a> ColumnRenderable<'a> {
    pub fn with<I, T>(children: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RenderableItem<'a>>,
    {
        Self {
            children: children.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Rows(u16);

    impl Renderable for Rows {
        fn render(&self, _area: Rect, _buf: &mut Buffer) {}

        fn desired_height(&self, _width: u16) -> u16 {
            self.0
        }

        fn cursor_pos(&self, area: Rect) -> Option<(u16, u16)> {
            Some((area.x, area.bottom().saturating_sub(1)))
        }
    }

    #[test]
    fn column_height_saturates() {
        let column = ColumnRenderable::with([Rows(u16::MAX), Rows(1)]);
        assert_eq!(column.desired_height(80), u16::MAX);
    }

    #[test]
    fn oversized_child_is_clipped_to_area() {
        let column = ColumnRenderable::with([Rows(u16::MAX), Rows(1)]);
        assert_eq!(column.cursor_pos(Rect::new(0, 3, 80, 10)), Some((0, 12)));
    }
}
