use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use anyhow::{Context, Result, anyhow, bail};
use reach_cache::{LabelId, label_text};
use reach_core::{Element, Point, Scene, SceneTransform};
use reach_timing::Timer;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::{
    Color, ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Paint, PathBuilder, Pixmap,
    PixmapPaint, PremultipliedColorU8, Stroke, Transform,
};
use tracing::{debug, info};

struct TextCache {
    font: FontVec,
    size_px: f32,
    map: HashMap<LabelId, Arc<Pixmap>>,
}

impl TextCache {
    fn new(font: FontVec, size_px: f32) -> Self {
        Self {
            font,
            size_px,
            map: HashMap::new(),
        }
    }

    fn get_or_render(&mut self, label: LabelId) -> Option<Arc<Pixmap>> {
        if let Some(p) = self.map.get(&label) {
            return Some(Arc::clone(p));
        }
        let text = label_text(label)?;
        let pm = Arc::new(render_text_pixmap(
            &text,
            self.size_px,
            &self.font,
            Color::from_rgba8(255, 255, 255, 255),
        )?);
        self.map.insert(label, Arc::clone(&pm));
        Some(pm)
    }
}

/// Rasterises `text` onto a tight transparent pixmap, baseline at the ascent
pub fn render_text_pixmap<F: Font>(
    text: &str,
    font_size: f32,
    font: &F,
    color: Color,
) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for g in &glyphs {
        if let Some(out) = font.outline_glyph(g.clone()) {
            let b = out.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }
    }

    // whitespace only
    if min_x == f32::INFINITY {
        return Pixmap::new(1, 1);
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;
    let stride = pm.width() as usize;
    let dst = pm.pixels_mut();

    let cu = color.to_color_u8();
    let (cr, cg, cb, ca) = (cu.red(), cu.green(), cu.blue(), cu.alpha());

    for g in &glyphs {
        let Some(out) = font.outline_glyph(g.clone()) else {
            continue;
        };
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            // premultiplied source-over
            let a_lin = (cov * ca as f32 / 255.0).clamp(0.0, 1.0);
            let sr = (cr as f32 * a_lin) as u8;
            let sg = (cg as f32 * a_lin) as u8;
            let sb = (cb as f32 * a_lin) as u8;
            let sa = (a_lin * 255.0) as u8;
            let bg = dst[i];
            let inv = 1.0 - (sa as f32 / 255.0);
            let blended = PremultipliedColorU8::from_rgba(
                sr.saturating_add((bg.red() as f32 * inv) as u8),
                sg.saturating_add((bg.green() as f32 * inv) as u8),
                sb.saturating_add((bg.blue() as f32 * inv) as u8),
                sa.saturating_add((bg.alpha() as f32 * inv) as u8),
            );
            if let Some(px) = blended {
                dst[i] = px;
            }
        });
    }

    Some(pm)
}

fn to_color(c: [u8; 4]) -> Color {
    Color::from_rgba8(c[0], c[1], c[2], c[3])
}

fn solid(c: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(to_color(c));
    paint.anti_alias = true;
    paint
}

pub struct FrameStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub elements: usize,
}

/// Presentation backend: composites a [`Scene`] into an RGBA frame buffer
pub trait Renderer {
    fn resize(&mut self, width: u32, height: u32);
    fn render_scene<T: Timer<Timestamp = u64>>(
        &mut self,
        scene: &Scene,
        frame_buffer: &mut [u8],
        timer: &mut T,
    ) -> Result<FrameStats>;
}

pub struct SkiaRenderer {
    width: u32,
    height: u32,
    transform: SceneTransform,
    canvas: Pixmap,
    text_cache: Option<TextCache>,
    decoration: Option<Pixmap>,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let canvas = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("invalid canvas size {width}x{height}"))?;
        Ok(Self {
            width,
            height,
            transform: SceneTransform::new(width, height),
            canvas,
            text_cache: None,
            decoration: None,
        })
    }

    /// Enables text labels using the font at `path`
    pub fn load_font(&mut self, path: &Path, size_px: f32) -> Result<()> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        self.set_font(bytes, size_px)
    }

    pub fn set_font(&mut self, bytes: Vec<u8>, size_px: f32) -> Result<()> {
        let font = FontVec::try_from_vec(bytes).map_err(|e| anyhow!("invalid font: {e}"))?;
        self.text_cache = Some(TextCache::new(font, size_px));
        Ok(())
    }

    /// Loads the image drawn for [`Element::Decoration`]
    pub fn load_decoration(&mut self, path: &Path) -> Result<()> {
        let image = image::open(path)
            .with_context(|| format!("loading decoration {}", path.display()))?
            .into_rgba8();
        let (w, h) = image.dimensions();
        let mut pm = Pixmap::new(w, h).ok_or_else(|| anyhow!("decoration image is empty"))?;
        for (dst, src) in pm.pixels_mut().iter_mut().zip(image.pixels()) {
            *dst = ColorU8::from_rgba(src[0], src[1], src[2], src[3]).premultiply();
        }
        info!(width = w, height = h, "decoration loaded");
        self.decoration = Some(pm);
        Ok(())
    }

    pub fn has_text(&self) -> bool {
        self.text_cache.is_some()
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    fn draw_element(&mut self, element: &Element) {
        match element {
            Element::Circle {
                center,
                radius,
                fill,
                stroke,
            } => self.draw_circle(*center, *radius, *fill, *stroke),
            Element::Path {
                points,
                color,
                width,
            } => self.draw_path(points, *color, *width),
            Element::Decoration { center, size } => self.draw_decoration(*center, *size),
            Element::Text { label, position } => self.draw_text(*label, *position),
        }
    }

    fn draw_circle(
        &mut self,
        center: Point,
        radius: f32,
        fill: Option<[u8; 4]>,
        stroke: Option<([u8; 4], f32)>,
    ) {
        let (cx, cy) = self.transform.to_window(center);
        let Some(path) = PathBuilder::from_circle(cx, cy, radius) else {
            return;
        };
        if let Some(c) = fill {
            self.canvas.fill_path(
                &path,
                &solid(c),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
        if let Some((c, width)) = stroke {
            let stroke = Stroke {
                width,
                ..Stroke::default()
            };
            self.canvas
                .stroke_path(&path, &solid(c), &stroke, Transform::identity(), None);
        }
    }

    fn draw_path(&mut self, points: &[Point], color: [u8; 4], width: f32) {
        let mut iter = points.iter().map(|p| self.transform.to_window(*p));
        let Some((x0, y0)) = iter.next() else {
            return;
        };
        let mut pb = PathBuilder::new();
        pb.move_to(x0, y0);
        for (x, y) in iter {
            pb.line_to(x, y);
        }
        let Some(path) = pb.finish() else {
            return;
        };
        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.canvas
            .stroke_path(&path, &solid(color), &stroke, Transform::identity(), None);
    }

    fn draw_decoration(&mut self, center: Point, size: f32) {
        let Some(image) = &self.decoration else {
            return;
        };
        let scale = size / image.width().max(image.height()) as f32;
        let (cx, cy) = self.transform.to_window(center);
        let left = cx - image.width() as f32 * scale * 0.5;
        let top = cy - image.height() as f32 * scale * 0.5;
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.canvas.draw_pixmap(
            0,
            0,
            image.as_ref(),
            &paint,
            Transform::from_row(scale, 0.0, 0.0, scale, left, top),
            None,
        );
    }

    fn draw_text(&mut self, label: LabelId, position: Point) {
        let Some(cache) = self.text_cache.as_mut() else {
            return;
        };
        let Some(pm) = cache.get_or_render(label) else {
            return;
        };
        let (cx, cy) = self.transform.to_window(position);
        let x = (cx - pm.width() as f32 * 0.5) as i32;
        let y = (cy - pm.height() as f32 * 0.5) as i32;
        self.canvas.draw_pixmap(
            x,
            y,
            tiny_skia::Pixmap::as_ref(&pm),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}

impl Renderer for SkiaRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        let Some(canvas) = Pixmap::new(width, height) else {
            debug!(width, height, "ignoring resize to an empty surface");
            return;
        };
        self.width = width;
        self.height = height;
        self.transform = SceneTransform::new(width, height);
        self.canvas = canvas;
    }

    fn render_scene<T: Timer<Timestamp = u64>>(
        &mut self,
        scene: &Scene,
        frame_buffer: &mut [u8],
        timer: &mut T,
    ) -> Result<FrameStats> {
        let expected = (self.width * self.height * 4) as usize;
        if frame_buffer.len() != expected {
            bail!(
                "frame buffer holds {} bytes, canvas needs {}",
                frame_buffer.len(),
                expected
            );
        }

        let t_clear = {
            let t = timer.now();
            self.canvas.fill(to_color(scene.background));
            timer.elapsed(t)
        };

        let t_draw = {
            let t = timer.now();
            for element in scene.iter() {
                self.draw_element(element);
            }
            timer.elapsed(t)
        };

        let t_copy = {
            let t = timer.now();
            frame_buffer.copy_from_slice(self.canvas.data());
            timer.elapsed(t)
        };

        let total = t_clear + t_draw + t_copy;
        timer.record_frame(total);

        Ok(FrameStats {
            clear: t_clear,
            draw: t_draw,
            copy: t_copy,
            total,
            elements: scene.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reach_cache::intern_label;
    use reach_core::scene::palette;
    use reach_timing::ManualTimer;

    fn pixel(r: &SkiaRenderer, scene_pt: Point) -> [u8; 4] {
        let (x, y) = r.transform.to_window(scene_pt);
        let c = r.canvas.pixel(x as u32, y as u32).unwrap().demultiply();
        [c.red(), c.green(), c.blue(), c.alpha()]
    }

    fn frame(r: &SkiaRenderer) -> Vec<u8> {
        vec![0u8; (r.width * r.height * 4) as usize]
    }

    #[test]
    fn circle_is_drawn_at_scene_position() {
        let mut r = SkiaRenderer::new(400, 300).unwrap();
        let mut scene = Scene::default();
        scene.push(Element::Circle {
            center: (100.0, 50.0),
            radius: 20.0,
            fill: Some(palette::CORRECT),
            stroke: None,
        });
        let mut fb = frame(&r);
        let stats = r
            .render_scene(&scene, &mut fb, &mut ManualTimer::new())
            .unwrap();
        assert_eq!(stats.elements, 1);
        assert_eq!(pixel(&r, (100.0, 50.0)), palette::CORRECT);
        assert_eq!(pixel(&r, (-100.0, -50.0)), palette::BACKGROUND);
    }

    #[test]
    fn path_stroke_covers_its_points() {
        let mut r = SkiaRenderer::new(400, 300).unwrap();
        let mut scene = Scene::default();
        scene.push(Element::Path {
            points: vec![(-100.0, 0.0), (0.0, 0.0), (100.0, 0.0)],
            color: palette::INCORRECT,
            width: 10.0,
        });
        let mut fb = frame(&r);
        r.render_scene(&scene, &mut fb, &mut ManualTimer::new())
            .unwrap();
        assert_eq!(pixel(&r, (50.0, 0.0)), palette::INCORRECT);
        assert_eq!(pixel(&r, (50.0, 40.0)), palette::BACKGROUND);
    }

    #[test]
    fn frame_buffer_receives_the_canvas() {
        let mut r = SkiaRenderer::new(64, 64).unwrap();
        let mut fb = frame(&r);
        r.render_scene(&Scene::new([10, 20, 30, 255]), &mut fb, &mut ManualTimer::new())
            .unwrap();
        assert_eq!(&fb[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn mismatched_frame_buffer_is_an_error() {
        let mut r = SkiaRenderer::new(64, 64).unwrap();
        let mut fb = vec![0u8; 16];
        assert!(
            r.render_scene(&Scene::default(), &mut fb, &mut ManualTimer::new())
                .is_err()
        );
    }

    #[test]
    fn text_without_a_font_is_skipped() {
        let mut r = SkiaRenderer::new(64, 64).unwrap();
        let mut scene = Scene::default();
        scene.push(Element::Text {
            label: intern_label("Touch the screen to start"),
            position: (0.0, 0.0),
        });
        let mut fb = frame(&r);
        r.render_scene(&scene, &mut fb, &mut ManualTimer::new())
            .unwrap();
        assert!(!r.has_text());
        assert_eq!(pixel(&r, (0.0, 0.0)), palette::BACKGROUND);
    }

    #[test]
    fn resize_rebuilds_canvas() {
        let mut r = SkiaRenderer::new(64, 64).unwrap();
        r.resize(128, 32);
        assert_eq!((r.canvas().width(), r.canvas().height()), (128, 32));
        r.resize(0, 0);
        assert_eq!((r.canvas().width(), r.canvas().height()), (128, 32));
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        let mut r = SkiaRenderer::new(64, 64).unwrap();
        assert!(r.set_font(vec![1, 2, 3], 24.0).is_err());
    }

    #[test]
    fn frames_are_recorded_on_the_timer() {
        let mut r = SkiaRenderer::new(32, 32).unwrap();
        let mut timer = ManualTimer::new();
        let mut fb = frame(&r);
        for _ in 0..3 {
            r.render_scene(&Scene::default(), &mut fb, &mut timer).unwrap();
        }
        assert_eq!(timer.frame_count(), 3);
    }
}
