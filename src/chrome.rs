//! Rendu GPU de la barre d'outils (boutons + champ d'adresse).
//!
//! `glow` pour les appels OpenGL, `fontdue` pour la rastérisation CPU des
//! glyphes. Les glyphes ASCII sont pré-rendus dans un atlas texture au
//! démarrage puis dessinés comme des quads texturés à chaque frame. La
//! géométrie vient de [`crate::toolbar::ToolbarLayout`].

use std::collections::HashMap;
use std::sync::Arc;

use glow::HasContext;

use crate::config::{ChromeColors, ChromeConfig};
use crate::error::{BrowserError, Result};
use crate::privacy::PrivacyMode;
use crate::toolbar::{Rect, ToolbarAction, ToolbarLayout};

const VERTEX_SHADER: &str = r#"#version 300 es
precision mediump float;
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec2 a_uv;
uniform mat4 u_projection;
out vec2 v_uv;
void main() {
    gl_Position = u_projection * vec4(a_position, 0.0, 1.0);
    v_uv = a_uv;
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;
in vec2 v_uv;
uniform sampler2D u_texture;
uniform vec4 u_color;
uniform bool u_use_texture;
out vec4 fragColor;
void main() {
    if (u_use_texture) {
        float alpha = texture(u_texture, v_uv).r;
        fragColor = vec4(u_color.rgb, u_color.a * alpha);
    } else {
        fragColor = u_color;
    }
}
"#;

const ATLAS_WIDTH: u32 = 512;

// ─────────────────────────────────────────────────────────────────────────────
// Atlas de glyphes
// ─────────────────────────────────────────────────────────────────────────────

/// Glyphe rastérisé, avant placement.
struct RasterGlyph {
    c: char,
    width: u32,
    height: u32,
    advance_x: f32,
    xmin: f32,
    ymin: f32,
    bitmap: Vec<u8>,
}

struct GlyphInfo {
    atlas_x: u32,
    atlas_y: u32,
    width: u32,
    height: u32,
    advance_x: f32,
    offset_x: f32,
    /// Bord bas relatif à la ligne de base (positif = vers le haut).
    offset_y: f32,
}

struct GlyphAtlas {
    width: u32,
    height: u32,
    glyphs: HashMap<char, GlyphInfo>,
    pixels: Vec<u8>,
}

impl GlyphAtlas {
    fn build(font: &fontdue::Font, font_size: f32) -> Self {
        let rasterized = (32u8..=126)
            .map(|b| {
                let c = b as char;
                let (metrics, bitmap) = font.rasterize(c, font_size);
                RasterGlyph {
                    c,
                    width: metrics.width as u32,
                    height: metrics.height as u32,
                    advance_x: metrics.advance_width,
                    xmin: metrics.xmin as f32,
                    ymin: metrics.ymin as f32,
                    bitmap,
                }
            })
            .collect();
        Self::pack(rasterized)
    }

    /// Rangées de gauche à droite, 1px d'espacement.
    fn pack(rasterized: Vec<RasterGlyph>) -> Self {
        let mut glyphs = HashMap::with_capacity(rasterized.len());
        let (mut x, mut y, mut row_height) = (0u32, 0u32, 0u32);

        for g in &rasterized {
            if x + g.width > ATLAS_WIDTH {
                x = 0;
                y += row_height + 1;
                row_height = 0;
            }
            row_height = row_height.max(g.height);
            glyphs.insert(
                g.c,
                GlyphInfo {
                    atlas_x: x,
                    atlas_y: y,
                    width: g.width,
                    height: g.height,
                    advance_x: g.advance_x,
                    offset_x: g.xmin,
                    offset_y: g.ymin,
                },
            );
            x += g.width + 1;
        }

        let height = (y + row_height + 1).next_power_of_two().max(64);
        let mut pixels = vec![0u8; (ATLAS_WIDTH * height) as usize];
        for g in &rasterized {
            let info = &glyphs[&g.c];
            for row in 0..info.height {
                let src = (row * info.width) as usize;
                let dst = ((info.atlas_y + row) * ATLAS_WIDTH + info.atlas_x) as usize;
                let len = info.width as usize;
                if let (Some(s), Some(d)) = (g.bitmap.get(src..src + len), pixels.get_mut(dst..dst + len)) {
                    d.copy_from_slice(s);
                }
            }
        }

        Self {
            width: ATLAS_WIDTH,
            height,
            glyphs,
            pixels,
        }
    }

    /// Avance d'un caractère ; hors atlas, celle de l'espace.
    fn advance(&self, c: char, fallback: f32) -> f32 {
        self.glyphs
            .get(&c)
            .or_else(|| self.glyphs.get(&' '))
            .map_or(fallback, |g| g.advance_x)
    }

    fn measure(&self, text: &str, fallback: f32) -> f32 {
        text.chars().map(|c| self.advance(c, fallback)).sum()
    }
}

pub fn load_font(bytes: &[u8]) -> Result<fontdue::Font> {
    fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()).map_err(BrowserError::Font)
}

// ─────────────────────────────────────────────────────────────────────────────
// Renderer
// ─────────────────────────────────────────────────────────────────────────────

/// Tout ce qu'il faut pour dessiner une frame du chrome.
pub struct ChromeFrame<'a> {
    pub window_width: u32,
    pub window_height: u32,
    pub layout: &'a ToolbarLayout,
    pub address_text: &'a str,
    pub focused: bool,
    pub cursor_char_offset: Option<usize>,
    pub privacy: PrivacyMode,
}

pub struct ChromeRenderer {
    gl: Arc<glow::Context>,
    program: glow::Program,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    atlas_texture: glow::Texture,
    atlas: GlyphAtlas,
    u_projection: glow::UniformLocation,
    u_color: glow::UniformLocation,
    u_use_texture: glow::UniformLocation,
    u_texture: glow::UniformLocation,
    colors: ChromeColors,
    text_left_pad: f32,
    font_size: f32,
}

fn uniform(gl: &glow::Context, program: glow::Program, name: &str) -> Result<glow::UniformLocation> {
    unsafe { gl.get_uniform_location(program, name) }
        .ok_or_else(|| BrowserError::Rendering(format!("missing uniform {name}")))
}

#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn compile_shader(gl: &glow::Context, kind: u32, source: &str) -> Result<glow::Shader> {
    let shader = gl.create_shader(kind).map_err(BrowserError::Rendering)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);
    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(BrowserError::Rendering(format!("shader compilation: {log}")));
    }
    Ok(shader)
}

#[allow(unsafe_op_in_unsafe_fn)]
impl ChromeRenderer {
    /// Crée le renderer. Doit être appelé avec un contexte GL actif.
    ///
    /// # Safety
    /// Appelle des fonctions OpenGL.
    pub unsafe fn new(gl: Arc<glow::Context>, config: &ChromeConfig, font_bytes: &[u8]) -> Result<Self> {
        let font = load_font(font_bytes)?;

        // ── Shaders ──────────────────────────────────────────────────────
        let vs = compile_shader(&gl, glow::VERTEX_SHADER, VERTEX_SHADER)?;
        let fs = compile_shader(&gl, glow::FRAGMENT_SHADER, FRAGMENT_SHADER)?;
        let program = gl.create_program().map_err(BrowserError::Rendering)?;
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
        if !gl.get_program_link_status(program) {
            return Err(BrowserError::Rendering(format!(
                "shader link: {}",
                gl.get_program_info_log(program)
            )));
        }

        let u_projection = uniform(&gl, program, "u_projection")?;
        let u_color = uniform(&gl, program, "u_color")?;
        let u_use_texture = uniform(&gl, program, "u_use_texture")?;
        let u_texture = uniform(&gl, program, "u_texture")?;

        // ── VAO / VBO : [x, y, u, v] x 6 ─────────────────────────────────
        let vao = gl.create_vertex_array().map_err(BrowserError::Rendering)?;
        gl.bind_vertex_array(Some(vao));
        let vbo = gl.create_buffer().map_err(BrowserError::Rendering)?;
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        let float = std::mem::size_of::<f32>() as i32;
        gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, 4 * float, 0);
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, 4 * float, 2 * float);
        gl.enable_vertex_attrib_array(1);
        gl.bind_vertex_array(None);

        // ── Atlas ────────────────────────────────────────────────────────
        let atlas = GlyphAtlas::build(&font, config.font_size);
        let atlas_texture = gl.create_texture().map_err(BrowserError::Rendering)?;
        gl.bind_texture(glow::TEXTURE_2D, Some(atlas_texture));
        for (param, value) in [
            (glow::TEXTURE_MIN_FILTER, glow::LINEAR),
            (glow::TEXTURE_MAG_FILTER, glow::LINEAR),
            (glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE),
            (glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE),
        ] {
            gl.tex_parameter_i32(glow::TEXTURE_2D, param, value as i32);
        }
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::R8 as i32,
            atlas.width as i32,
            atlas.height as i32,
            0,
            glow::RED,
            glow::UNSIGNED_BYTE,
            glow::PixelUnpackData::Slice(Some(&atlas.pixels)),
        );

        Ok(Self {
            gl,
            program,
            vao,
            vbo,
            atlas_texture,
            atlas,
            u_projection,
            u_color,
            u_use_texture,
            u_texture,
            colors: config.colors.clone(),
            text_left_pad: config.text_left_pad,
            font_size: config.font_size,
        })
    }

    /// Dessine la barre d'outils dans la bande du haut.
    ///
    /// # Safety
    /// Appelle des fonctions OpenGL.
    pub unsafe fn draw(&self, frame: &ChromeFrame<'_>) {
        let gl = &self.gl;
        let w = frame.window_width as f32;
        let h = frame.window_height as f32;
        let ch = frame.layout.height();

        let prev_blend = gl.is_enabled(glow::BLEND);
        let prev_depth = gl.is_enabled(glow::DEPTH_TEST);
        let prev_scissor = gl.is_enabled(glow::SCISSOR_TEST);

        gl.viewport(0, 0, frame.window_width as i32, frame.window_height as i32);
        gl.disable(glow::DEPTH_TEST);
        gl.disable(glow::SCISSOR_TEST);
        gl.enable(glow::BLEND);
        gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
        gl.use_program(Some(self.program));

        // (0,0) en haut à gauche.
        #[rustfmt::skip]
        let projection: [f32; 16] = [
            2.0 / w,  0.0,       0.0, 0.0,
            0.0,     -2.0 / h,   0.0, 0.0,
            0.0,      0.0,      -1.0, 0.0,
           -1.0,      1.0,       0.0, 1.0,
        ];
        gl.uniform_matrix_4_f32_slice(Some(&self.u_projection), false, &projection);
        gl.uniform_1_i32(Some(&self.u_texture), 0);
        gl.active_texture(glow::TEXTURE0);
        gl.bind_texture(glow::TEXTURE_2D, Some(self.atlas_texture));
        gl.bind_vertex_array(Some(self.vao));

        let bg = if frame.focused {
            self.colors.background_focused
        } else {
            self.colors.background
        };
        self.draw_rect(0.0, 0.0, w, ch, bg);

        let baseline = ch / 2.0 + self.font_size / 3.0;

        // ── Boutons ──────────────────────────────────────────────────────
        for (action, rect) in frame.layout.buttons() {
            let color = match (action, frame.privacy) {
                (ToolbarAction::Privacy, PrivacyMode::Enabled) => self.colors.privacy_on,
                (ToolbarAction::Privacy, PrivacyMode::Disabled) => self.colors.privacy_off,
                _ => self.colors.button,
            };
            self.draw_rect(rect.x + 1.0, rect.y + 1.0, rect.w - 2.0, rect.h - 2.0, color);
            let label = action.label(frame.privacy);
            let label_w = self.atlas.measure(label, self.font_size * 0.5);
            let x = rect.x + ((rect.w - label_w) / 2.0).max(0.0);
            self.draw_text(label, x, baseline, rect.x + rect.w, None);
        }

        // ── Champ d'adresse ──────────────────────────────────────────────
        let Rect { x, y, w: bw, h: bh } = frame.layout.address_field();
        if bw > 2.0 {
            self.draw_rect(x, y, bw, bh, self.colors.bar_border);
            self.draw_rect(x + 1.0, y + 1.0, bw - 2.0, bh - 2.0, self.colors.bar_background);

            let cursor = frame.cursor_char_offset.filter(|_| frame.focused);
            let cursor_x =
                self.draw_text(frame.address_text, x + self.text_left_pad, baseline, x + bw, cursor);
            if let Some(cx) = cursor_x {
                let cursor_h = self.font_size + 4.0;
                self.draw_rect(cx, (ch - cursor_h) / 2.0, 2.0, cursor_h, self.colors.cursor);
            }
        }

        gl.bind_vertex_array(None);
        gl.use_program(None);
        if prev_depth {
            gl.enable(glow::DEPTH_TEST);
        }
        if !prev_blend {
            gl.disable(glow::BLEND);
        }
        if prev_scissor {
            gl.enable(glow::SCISSOR_TEST);
        }
    }

    /// Dessine `text` à partir de `x` jusqu'à `max_x`. Retourne la position
    /// X du curseur si `cursor` est atteint.
    unsafe fn draw_text(&self, text: &str, x: f32, baseline: f32, max_x: f32, cursor: Option<usize>) -> Option<f32> {
        let mut pen_x = x;
        let mut cursor_x = (cursor == Some(0)).then_some(pen_x);

        for (idx, c) in text.chars().enumerate() {
            if pen_x > max_x {
                break;
            }
            if let Some(glyph) = self.atlas.glyphs.get(&c)
                && glyph.width > 0
                && glyph.height > 0
            {
                let gx = pen_x + glyph.offset_x;
                let gy = baseline - glyph.offset_y - glyph.height as f32;
                self.draw_glyph(gx, gy, glyph);
            }
            pen_x += self.atlas.advance(c, self.font_size * 0.5);
            if cursor == Some(idx + 1) {
                cursor_x = Some(pen_x);
            }
        }
        cursor_x
    }

    unsafe fn draw_rect(&self, x: f32, y: f32, w: f32, h: f32, color: [f32; 4]) {
        self.gl.uniform_1_i32(Some(&self.u_use_texture), 0);
        self.gl.uniform_4_f32_slice(Some(&self.u_color), &color);
        self.upload_quad(quad(x, y, w, h, [0.0; 4]));
    }

    unsafe fn draw_glyph(&self, x: f32, y: f32, glyph: &GlyphInfo) {
        self.gl.uniform_1_i32(Some(&self.u_use_texture), 1);
        self.gl.uniform_4_f32_slice(Some(&self.u_color), &self.colors.text);
        let aw = self.atlas.width as f32;
        let ah = self.atlas.height as f32;
        let uv = [
            glyph.atlas_x as f32 / aw,
            glyph.atlas_y as f32 / ah,
            (glyph.atlas_x + glyph.width) as f32 / aw,
            (glyph.atlas_y + glyph.height) as f32 / ah,
        ];
        self.upload_quad(quad(x, y, glyph.width as f32, glyph.height as f32, uv));
    }

    unsafe fn upload_quad(&self, vertices: [f32; 24]) {
        self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
        self.gl
            .buffer_data_u8_slice(glow::ARRAY_BUFFER, f32_bytes(&vertices), glow::DYNAMIC_DRAW);
        self.gl.draw_arrays(glow::TRIANGLES, 0, 6);
    }
}

/// Deux triangles ; `uv` = [u0, v0, u1, v1].
fn quad(x: f32, y: f32, w: f32, h: f32, uv: [f32; 4]) -> [f32; 24] {
    let [u0, v0, u1, v1] = uv;
    #[rustfmt::skip]
    let vertices = [
        x,     y,     u0, v0,
        x + w, y,     u1, v0,
        x + w, y + h, u1, v1,
        x,     y,     u0, v0,
        x + w, y + h, u1, v1,
        x,     y + h, u0, v1,
    ];
    vertices
}

fn f32_bytes(data: &[f32]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(data.as_ptr() as *const u8, std::mem::size_of_val(data)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(c: char, width: u32, height: u32) -> RasterGlyph {
        RasterGlyph {
            c,
            width,
            height,
            advance_x: width as f32 + 2.0,
            xmin: 0.0,
            ymin: 0.0,
            bitmap: vec![255; (width * height) as usize],
        }
    }

    #[test]
    fn test_pack_wraps_rows_without_overlap() {
        let atlas = GlyphAtlas::pack((0..26u8).map(|i| glyph((b'A' + i) as char, 30, 10)).collect());

        assert_eq!(atlas.width, ATLAS_WIDTH);
        assert_eq!(atlas.pixels.len(), (atlas.width * atlas.height) as usize);
        let placed: Vec<_> = atlas.glyphs.values().collect();
        for (i, a) in placed.iter().enumerate() {
            assert!(a.atlas_x + a.width <= atlas.width);
            assert!(a.atlas_y + a.height <= atlas.height);
            for b in &placed[i + 1..] {
                let overlap_x = a.atlas_x < b.atlas_x + b.width && b.atlas_x < a.atlas_x + a.width;
                let overlap_y = a.atlas_y < b.atlas_y + b.height && b.atlas_y < a.atlas_y + a.height;
                assert!(!(overlap_x && overlap_y));
            }
        }
        // 26 x 31px > 512px : au moins deux rangées.
        assert!(atlas.glyphs.values().any(|g| g.atlas_y > 0));
    }

    #[test]
    fn test_pack_copies_bitmaps() {
        let atlas = GlyphAtlas::pack(vec![glyph(' ', 0, 0), glyph('x', 3, 2)]);
        let x = &atlas.glyphs[&'x'];
        let idx = (x.atlas_y * atlas.width + x.atlas_x) as usize;
        assert_eq!(&atlas.pixels[idx..idx + 3], &[255, 255, 255]);
        assert_eq!(atlas.height, 64);
    }

    #[test]
    fn test_measure_uses_space_for_unknown_chars() {
        let atlas = GlyphAtlas::pack(vec![glyph(' ', 0, 0), glyph('a', 4, 4)]);
        assert_eq!(atlas.measure("aa", 8.0), 12.0);
        assert_eq!(atlas.measure("é", 8.0), 2.0);
        let empty = GlyphAtlas::pack(Vec::new());
        assert_eq!(empty.measure("é", 8.0), 8.0);
    }

    #[test]
    fn test_quad_layout() {
        let v = quad(1.0, 2.0, 3.0, 4.0, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(&v[0..4], &[1.0, 2.0, 0.0, 0.0]);
        assert_eq!(&v[8..12], &[4.0, 6.0, 1.0, 1.0]);
    }

    #[test]
    fn test_f32_bytes_length() {
        assert_eq!(f32_bytes(&[1.0, 2.0]).len(), 8);
    }

    #[test]
    fn test_invalid_font_is_error() {
        assert!(matches!(load_font(b"not a font"), Err(BrowserError::Font(_))));
    }
}
