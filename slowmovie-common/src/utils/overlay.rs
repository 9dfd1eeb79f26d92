//! Caption rendering on top of grayscale frames. Meant to run before
//! dithering so the text survives with crisp edges on a 1-bit panel.

use std::convert::Infallible;

use embedded_graphics::{
    mono_font::{ascii::FONT_10X20, MonoTextStyleBuilder},
    pixelcolor::Gray8,
    prelude::*,
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use image::{GrayImage, Luma};

const MARGIN: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    BottomCenter,
    BottomRight,
}

/// Draw white-on-black text onto the image at the given anchor. Text wider
/// than the image is wrapped, embedded newlines are respected.
pub fn draw_caption(image: &mut GrayImage, text: &str, anchor: Anchor) {
    if image.width() == 0 || image.height() == 0 || text.is_empty() {
        return;
    }

    let char_width = FONT_10X20.character_size.width as usize;
    let max_chars = ((image.width() as i32 - 2 * MARGIN).max(0) as usize / char_width)
        .max(1);
    let wrapped = wrap_text(text, max_chars);

    let character_style = MonoTextStyleBuilder::new()
        .font(&FONT_10X20)
        .text_color(Gray8::WHITE)
        .background_color(Gray8::BLACK)
        .build();

    // the baseline anchors the first line, lift it so the last line is the
    // one sitting on the margin
    let extra_lines = wrapped.lines().count().saturating_sub(1) as i32;
    let line_height = FONT_10X20.character_size.height as i32;
    let bottom = image.height() as i32 - MARGIN - extra_lines * line_height;

    let (position, alignment) = match anchor {
        Anchor::BottomCenter => {
            (Point::new(image.width() as i32 / 2, bottom), Alignment::Center)
        }
        Anchor::BottomRight => (
            Point::new(image.width() as i32 - MARGIN, bottom),
            Alignment::Right,
        ),
    };

    let text_style = TextStyleBuilder::new()
        .alignment(alignment)
        .baseline(Baseline::Bottom)
        .build();

    let mut canvas = Canvas(image);
    Text::with_text_style(&wrapped, position, character_style, text_style)
        .draw(&mut canvas)
        .expect("drawing on a memory canvas cannot fail");
}

fn wrap_text(text: &str, max_chars: usize) -> String {
    let mut lines = Vec::new();

    for line in text.lines() {
        let mut current = String::new();
        for word in line.split_whitespace() {
            let needed = if current.is_empty() {
                word.len()
            } else {
                current.len() + 1 + word.len()
            };
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }

    lines.join("\n")
}

/// Adapter exposing a [`GrayImage`] as an embedded-graphics draw target.
struct Canvas<'a>(&'a mut GrayImage);

impl OriginDimensions for Canvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.0.width(), self.0.height())
    }
}

impl DrawTarget for Canvas<'_> {
    type Color = Gray8;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = self.0.dimensions();
        for Pixel(point, color) in pixels {
            if point.x >= 0
                && point.y >= 0
                && (point.x as u32) < width
                && (point.y as u32) < height
            {
                self.0
                    .put_pixel(point.x as u32, point.y as u32, Luma([color.luma()]));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wrapping_respects_width() {
        let wrapped = wrap_text("the quick brown fox jumps", 11);
        assert_eq!("the quick\nbrown fox\njumps", wrapped);
    }

    #[test]
    fn wrapping_keeps_short_lines() {
        assert_eq!("hi there", wrap_text("hi there", 20));
        assert_eq!("one\ntwo", wrap_text("one\ntwo", 20));
    }

    #[test]
    fn overlong_word_gets_its_own_line() {
        let wrapped = wrap_text("a incomprehensibilities b", 10);
        assert_eq!("a\nincomprehensibilities\nb", wrapped);
    }

    #[test]
    fn caption_touches_the_image() {
        let mut img = GrayImage::from_pixel(200, 100, Luma([128]));
        draw_caption(&mut img, "hello", Anchor::BottomCenter);
        assert!(img.pixels().any(|p| p[0] == 255));
        assert!(img.pixels().any(|p| p[0] == 0));
    }

    #[test]
    fn caption_on_empty_text_is_a_noop() {
        let mut img = GrayImage::from_pixel(20, 20, Luma([128]));
        draw_caption(&mut img, "", Anchor::BottomRight);
        assert!(img.pixels().all(|p| p[0] == 128));
    }
}
