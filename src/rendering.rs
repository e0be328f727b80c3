//! Contextes de rendu GPU.
//!
//! La fenêtre porte un `WindowRenderingContext` (surfman/OpenGL) où l'on
//! dessine la barre d'outils ; Servo peint dans un contexte offscreen de la
//! taille de la zone de contenu, blitté sous la barre à chaque frame.

use std::rc::Rc;

use servo::{OffscreenRenderingContext, RenderingContext, WindowRenderingContext};
use winit::dpi::PhysicalSize;
use winit::raw_window_handle::{DisplayHandle, WindowHandle};

use crate::error::{BrowserError, Result};

/// Crée le contexte fenêtre et le rend courant, ce que `WebViewBuilder` exige.
pub fn create_rendering_context(
    display_handle: DisplayHandle<'_>,
    window_handle: WindowHandle<'_>,
    size: PhysicalSize<u32>,
) -> Result<Rc<WindowRenderingContext>> {
    let rendering_context = WindowRenderingContext::new(display_handle, window_handle, size)
        .map_err(|e| BrowserError::Rendering(format!("{e:?}")))?;
    rendering_context
        .make_current()
        .map_err(|e| BrowserError::Rendering(format!("{e:?}")))?;
    Ok(Rc::new(rendering_context))
}

pub fn create_offscreen_context(
    window_context: &WindowRenderingContext,
    size: PhysicalSize<u32>,
) -> Rc<OffscreenRenderingContext> {
    Rc::new(window_context.offscreen_context(size))
}

/// Taille de la zone de contenu sous une barre de `chrome_height` pixels.
pub fn content_size(window_size: PhysicalSize<u32>, chrome_height: u32) -> PhysicalSize<u32> {
    PhysicalSize::new(window_size.width, window_size.height.saturating_sub(chrome_height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_size_subtracts_chrome() {
        assert_eq!(
            content_size(PhysicalSize::new(1280, 800), 40),
            PhysicalSize::new(1280, 760)
        );
    }

    #[test]
    fn test_content_size_never_underflows() {
        assert_eq!(content_size(PhysicalSize::new(300, 20), 40).height, 0);
    }
}
