//! Boucle d'événements Winit et cycle de vie du navigateur.
//!
//! ## Pattern "Two-Phase App"
//!
//! Winit 0.30 impose que les fenêtres soient créées dans `resumed()`, mais
//! Servo a besoin d'un handle de fenêtre pour son contexte de rendu :
//!
//! ```text
//! App::Initial(Startup)  →  [resumed()]  →  App::Running(Rc<AppState>)
//! ```
//!
//! ## Événements utilisateur
//!
//! ```text
//! Threads Servo ── wake() ──────────────┐
//!                                       ▼
//! Thread probe-N ── ProbeFinished ─► EventLoopProxy<BrowserEvent>
//!                                       ▼
//!                         user_event() (thread principal)
//!                           ├─ Wake          → servo.spin_event_loop()
//!                           └─ ProbeFinished → Navigator::on_probe_finished()
//! ```
//!
//! ## Disposition
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ Barre d'outils : GL direct (fenêtre) │
//! ├──────────────────────────────────────┤
//! │ WebView : OffscreenRenderingContext  │
//! │ blitté dans la zone restante         │
//! └──────────────────────────────────────┘
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use euclid::Scale;
use servo::{InputEvent, WheelDelta, WheelEvent, WheelMode};
use servo::{MouseButton as ServoMouseButton, MouseButtonAction, MouseButtonEvent};
use servo::{MouseLeftViewportEvent, MouseMoveEvent};
use servo::{
    OffscreenRenderingContext, RenderingContext, Servo, ServoBuilder, WebView, WebViewBuilder,
    WindowRenderingContext,
};
use tracing::{error, info, warn};
use url::Url;
use webrender_api::units::DevicePoint;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::Window;

use crate::chrome::{ChromeFrame, ChromeRenderer};
use crate::config::Config;
use crate::error::{BrowserError, Result};
use crate::keyutils::{self, Shortcut};
use crate::navigation::Navigator;
use crate::pages;
use crate::preferences;
use crate::privacy::AdblockEngine;
use crate::probe::{BackgroundProber, HttpProber};
use crate::rendering;
use crate::resources;
use crate::servo_glue::{BrowserEvent, ServoView, Waker};
use crate::toolbar::{ToolbarAction, ToolbarLayout};
use crate::view::{BrowserView, Capabilities, ViewEvent};

// ─────────────────────────────────────────────────────────────────────────────
// AppState : état partagé entre Winit et Servo
// ─────────────────────────────────────────────────────────────────────────────

/// Créé dans `resumed()`. Dans un `Rc` car Servo attend un
/// `Rc<dyn WebViewDelegate>` et tout vit sur le thread principal.
pub struct AppState {
    pub window: Window,
    pub servo: Servo,
    /// Surface fenêtre : barre d'outils et blit du FBO.
    pub window_rendering_context: Rc<WindowRenderingContext>,
    /// FBO où Servo peint via `webview.paint()`.
    pub offscreen_context: Rc<OffscreenRenderingContext>,
    pub webviews: RefCell<Vec<WebView>>,
    pub cursor_position: Cell<DevicePoint>,
    pub modifiers: Cell<ModifiersState>,
    /// `None` sans listes de filtres.
    pub adblock_engine: Option<AdblockEngine>,
    pub current_url: RefCell<Option<Url>>,
    /// Capacités appliquées à la vue par le mode privé.
    pub capabilities: Cell<Capabilities>,
    pub navigator: RefCell<Navigator>,
    pub config: RefCell<Config>,
    pub chrome: ChromeRenderer,
    pub toolbar: RefCell<ToolbarLayout>,
}

impl AppState {
    fn chrome_height(&self) -> f32 {
        self.toolbar.borrow().height()
    }

    pub fn set_window_title(&self, page: &str) {
        let base = &self.config.borrow().general.window_title;
        self.window.set_title(&format!("{page} - {base}"));
    }

    pub fn view<'a>(&'a self, webview: &'a WebView) -> ServoView<'a> {
        ServoView {
            servo: &self.servo,
            webview,
            capabilities: &self.capabilities,
        }
    }

    /// Exécute `f` avec le navigateur et la vue active.
    fn with_navigator(&self, f: impl FnOnce(&mut Navigator, &dyn BrowserView)) {
        let Some(webview) = self.webviews.borrow().last().cloned() else {
            return;
        };
        let view = self.view(&webview);
        match self.navigator.try_borrow_mut() {
            Ok(mut navigator) => f(&mut navigator, &view),
            Err(_) => warn!("Navigator busy, action dropped"),
        }
        self.window.request_redraw();
    }

    pub fn dispatch_view_event(&self, webview: &WebView, event: ViewEvent) {
        let view = self.view(webview);
        match self.navigator.try_borrow_mut() {
            Ok(mut navigator) => navigator.handle_view_event(&view, event),
            Err(_) => warn!(?event, "Navigator busy, view event dropped"),
        }
    }

    /// Enregistre la config envoyée par la page de réglages et applique le
    /// mode privé immédiatement. Si le mode change, la page d'avant les
    /// réglages est rechargée ; sinon la confirmation s'affiche.
    pub fn apply_settings(&self, webview: &WebView, url: &str) {
        let Some(new_config) = pages::parse_settings_url(url, &self.config.borrow()) else {
            warn!(url, "Settings save URL without query");
            return;
        };
        if let Err(e) = new_config.save() {
            error!(error = %e, "Cannot save settings");
        }
        let enabled = new_config.privacy.start_enabled;
        *self.config.borrow_mut() = new_config;

        let view = self.view(webview);
        if let Ok(mut navigator) = self.navigator.try_borrow_mut() {
            if !navigator.set_privacy(&view, enabled) {
                navigator.show_page(&view, &pages::generate_saved_html());
            }
        }
        self.window.request_redraw();
    }

    fn open_settings(&self) {
        let config = self.config.borrow().clone();
        self.with_navigator(|nav, view| {
            let markup = pages::generate_settings_html(&config, nav.privacy().is_enabled());
            nav.show_page(view, &markup);
        });
    }

    fn run_toolbar_action(&self, action: ToolbarAction) {
        match action {
            ToolbarAction::Back => self.with_navigator(|nav, view| nav.back(view)),
            ToolbarAction::Forward => self.with_navigator(|nav, view| nav.forward(view)),
            ToolbarAction::Reload => self.with_navigator(|nav, view| nav.reload(view)),
            ToolbarAction::Home => self.with_navigator(|nav, view| nav.navigate_home(view)),
            ToolbarAction::Privacy => self.with_navigator(|nav, view| {
                nav.toggle_privacy(view);
            }),
            ToolbarAction::Settings => self.open_settings(),
            ToolbarAction::AddressField => {
                self.navigator.borrow_mut().urlbar_mut().focus();
                self.window.request_redraw();
            }
        }
    }

    fn run_shortcut(&self, shortcut: Shortcut) {
        let action = match shortcut {
            Shortcut::FocusAddress => ToolbarAction::AddressField,
            Shortcut::Reload => ToolbarAction::Reload,
            Shortcut::Back => ToolbarAction::Back,
            Shortcut::Forward => ToolbarAction::Forward,
            Shortcut::Home => ToolbarAction::Home,
        };
        self.run_toolbar_action(action);
    }

    /// Touches consommées par la barre d'adresse focusée.
    fn edit_address(&self, event: &KeyEvent, mods: ModifiersState) {
        if let Key::Named(NamedKey::Enter) = event.logical_key {
            self.with_navigator(|nav, view| {
                nav.submit(view);
            });
            return;
        }

        {
            let mut navigator = self.navigator.borrow_mut();
            let urlbar = navigator.urlbar_mut();
            match &event.logical_key {
                Key::Named(NamedKey::Escape) => urlbar.unfocus(),
                Key::Named(NamedKey::Backspace) => urlbar.backspace(),
                Key::Named(NamedKey::Delete) => urlbar.delete(),
                Key::Named(NamedKey::ArrowLeft) => urlbar.move_cursor_left(),
                Key::Named(NamedKey::ArrowRight) => urlbar.move_cursor_right(),
                Key::Named(NamedKey::Home) => urlbar.home(),
                Key::Named(NamedKey::End) => urlbar.end(),
                Key::Character(c) if mods.control_key() && c.eq_ignore_ascii_case("a") => {
                    urlbar.select_all()
                }
                key if !mods.control_key() && !mods.alt_key() => {
                    if let Some(text) = keyutils::typed_text(key) {
                        text.chars().for_each(|ch| urlbar.insert_char(ch));
                    }
                }
                _ => {}
            }
        }
        self.window.request_redraw();
    }

    fn redraw(&self) {
        let inner_size = self.window.inner_size();
        let chrome_h = self.chrome_height() as u32;

        if let Some(webview) = self.webviews.borrow().last() {
            webview.paint();
        }
        self.window_rendering_context.prepare_for_rendering();

        if let Some(blit) = self.offscreen_context.render_to_parent_callback() {
            let gl = self.window_rendering_context.glow_gl_api();
            // GL : (0,0) en bas à gauche, la barre reste en haut.
            let content = rendering::content_size(inner_size, chrome_h);
            let target_rect = euclid::default::Rect::new(
                euclid::default::Point2D::new(0, 0),
                euclid::default::Size2D::new(content.width as i32, content.height as i32),
            );
            blit(&gl, target_rect);
        }

        let navigator = self.navigator.borrow();
        let urlbar = navigator.urlbar();
        let toolbar = self.toolbar.borrow();
        let frame = ChromeFrame {
            window_width: inner_size.width,
            window_height: inner_size.height,
            layout: &toolbar,
            address_text: urlbar.display_text(),
            focused: urlbar.is_focused(),
            cursor_char_offset: urlbar.is_focused().then(|| urlbar.cursor_char_offset()),
            privacy: navigator.privacy(),
        };
        unsafe {
            self.chrome.draw(&frame);
        }

        self.window_rendering_context.present();
    }

    fn active_webview(&self) -> Option<WebView> {
        self.webviews.borrow().last().cloned()
    }

    /// Position relative à la zone de contenu, `None` dans la barre.
    fn content_point(&self, pos: DevicePoint) -> Option<DevicePoint> {
        let chrome_h = self.chrome_height();
        (pos.y >= chrome_h).then(|| DevicePoint::new(pos.x, pos.y - chrome_h))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// App : enum deux phases
// ─────────────────────────────────────────────────────────────────────────────

/// Ce qui est prêt avant la création de la fenêtre.
pub struct Startup {
    waker: Waker,
    config: Config,
    navigator: Navigator,
    /// Argument CLI, soumis comme une saisie dans la barre.
    initial_input: Option<String>,
}

pub enum App {
    Initial(Box<Startup>),
    Running(Rc<AppState>),
    /// Échec au démarrage ou transition en cours.
    Stopped,
}

impl App {
    pub fn new(
        event_loop: &EventLoop<BrowserEvent>,
        config: Config,
        initial_input: Option<String>,
    ) -> Result<Self> {
        let prober = HttpProber::new(
            &config.probe.user_agent,
            config.probe.timeout(),
            config.probe.follow_redirects,
        )?;
        let proxy = event_loop.create_proxy();
        let launcher = BackgroundProber::new(Arc::new(prober), move |report| {
            if let Err(error) = proxy.send_event(BrowserEvent::ProbeFinished(report)) {
                warn!(?error, "Event loop closed, probe report dropped");
            }
        });
        let navigator = Navigator::new(&config, Box::new(launcher))?;

        Ok(Self::Initial(Box::new(Startup {
            waker: Waker::new(event_loop),
            config,
            navigator,
            initial_input,
        })))
    }
}

fn start(startup: Startup, event_loop: &ActiveEventLoop) -> Result<Rc<AppState>> {
    let Startup {
        waker,
        config,
        navigator,
        initial_input,
    } = startup;

    // ── 1. Fenêtre ───────────────────────────────────────────────────────
    let display_handle = event_loop
        .display_handle()
        .map_err(|e| BrowserError::Window(e.to_string()))?;
    let window_attributes = Window::default_attributes()
        .with_title(&config.general.window_title)
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ));
    let window = event_loop
        .create_window(window_attributes)
        .map_err(|e| BrowserError::Window(e.to_string()))?;
    let window_handle = window
        .window_handle()
        .map_err(|e| BrowserError::Window(e.to_string()))?;

    // ── 2. Contextes de rendu ────────────────────────────────────────────
    let inner_size = window.inner_size();
    let window_rendering_context =
        rendering::create_rendering_context(display_handle, window_handle, inner_size)?;
    let offscreen_context = rendering::create_offscreen_context(
        &window_rendering_context,
        rendering::content_size(inner_size, config.chrome.height),
    );

    // ── 3. Barre d'outils ────────────────────────────────────────────────
    let font_bytes = resources::read(&config.chrome.font_path)?;
    let chrome = unsafe {
        ChromeRenderer::new(window_rendering_context.glow_gl_api(), &config.chrome, &font_bytes)?
    };
    let toolbar = ToolbarLayout::compute(inner_size.width as f32, &config.chrome);

    // ── 4. Servo ─────────────────────────────────────────────────────────
    let servo = ServoBuilder::default()
        .opts(preferences::build_servo_opts(&config))
        .preferences(preferences::build_servo_preferences(&config))
        .event_loop_waker(Box::new(waker))
        .build();

    let adblock_engine = resources::filters_dir().and_then(|dir| AdblockEngine::load(&dir));
    let capabilities = navigator.privacy().capabilities();

    let state = Rc::new(AppState {
        window,
        servo,
        window_rendering_context,
        offscreen_context: offscreen_context.clone(),
        webviews: RefCell::new(Vec::new()),
        cursor_position: Cell::new(DevicePoint::zero()),
        modifiers: Cell::new(ModifiersState::default()),
        adblock_engine,
        current_url: RefCell::new(None),
        capabilities: Cell::new(capabilities),
        navigator: RefCell::new(navigator),
        config: RefCell::new(config),
        chrome,
        toolbar: RefCell::new(toolbar),
    });

    // ── 5. WebView, puis première navigation ─────────────────────────────
    let blank = Url::parse("about:blank")?;
    let webview = WebViewBuilder::new(&state.servo, offscreen_context as Rc<dyn RenderingContext>)
        .url(blank)
        .hidpi_scale_factor(Scale::new(state.window.scale_factor() as f32))
        .delegate(state.clone())
        .build();
    state.webviews.borrow_mut().push(webview);

    state.with_navigator(|nav, view| {
        nav.apply_privacy(view);
        match initial_input.as_deref() {
            Some(input) if !input.is_empty() => nav.navigate_to_url(view, input),
            _ => nav.navigate_home(view),
        }
    });

    info!("Browser window ready");
    Ok(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// ApplicationHandler : dispatch des événements Winit
// ─────────────────────────────────────────────────────────────────────────────

impl ApplicationHandler<BrowserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self, Self::Initial(_)) {
            return;
        }
        let Self::Initial(startup) = std::mem::replace(self, Self::Stopped) else {
            return;
        };
        match start(*startup, event_loop) {
            Ok(state) => *self = Self::Running(state),
            Err(e) => {
                error!(error = %e, "Browser startup failed");
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: BrowserEvent) {
        let Self::Running(state) = self else { return };
        match event {
            BrowserEvent::Wake => state.servo.spin_event_loop(),
            BrowserEvent::ProbeFinished(report) => {
                state.with_navigator(|nav, view| nav.on_probe_finished(view, report));
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Self::Running(state) = self else {
            if let WindowEvent::CloseRequested = event {
                event_loop.exit();
            }
            return;
        };
        state.servo.spin_event_loop();

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::RedrawRequested => state.redraw(),

            WindowEvent::Resized(new_size) => {
                state.window_rendering_context.resize(new_size);
                let chrome_h = state.chrome_height() as u32;
                state
                    .offscreen_context
                    .resize(rendering::content_size(new_size, chrome_h));
                let layout = ToolbarLayout::compute(new_size.width as f32, &state.config.borrow().chrome);
                *state.toolbar.borrow_mut() = layout;
                state.window.request_redraw();
            }

            WindowEvent::ModifiersChanged(new_modifiers) => {
                state.modifiers.set(new_modifiers.state());
            }

            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(point) = state.content_point(state.cursor_position.get())
                    && let Some(webview) = state.active_webview()
                {
                    let (x, y, mode) = match delta {
                        MouseScrollDelta::LineDelta(dx, dy) => {
                            ((dx * 76.0) as f64, (dy * 76.0) as f64, WheelMode::DeltaLine)
                        }
                        MouseScrollDelta::PixelDelta(d) => (d.x, d.y, WheelMode::DeltaPixel),
                    };
                    webview.notify_input_event(InputEvent::Wheel(WheelEvent::new(
                        WheelDelta { x, y, z: 0.0, mode },
                        point.into(),
                    )));
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                let point = DevicePoint::new(position.x as f32, position.y as f32);
                state.cursor_position.set(point);
                if let Some(point) = state.content_point(point)
                    && let Some(webview) = state.active_webview()
                {
                    webview.notify_input_event(InputEvent::MouseMove(MouseMoveEvent::new(point.into())));
                }
            }

            WindowEvent::CursorLeft { .. } => {
                if let Some(webview) = state.active_webview() {
                    webview.notify_input_event(InputEvent::MouseLeftViewport(
                        MouseLeftViewportEvent::default(),
                    ));
                }
            }

            WindowEvent::MouseInput {
                state: btn_state,
                button,
                ..
            } => {
                let pos = state.cursor_position.get();
                match state.content_point(pos) {
                    None => {
                        if btn_state == ElementState::Pressed && button == WinitMouseButton::Left {
                            let hit = state.toolbar.borrow().hit_test(pos.x, pos.y);
                            if let Some(action) = hit {
                                state.run_toolbar_action(action);
                            }
                        }
                    }
                    Some(point) => {
                        if btn_state == ElementState::Pressed {
                            let mut navigator = state.navigator.borrow_mut();
                            if navigator.urlbar().is_focused() {
                                navigator.urlbar_mut().unfocus();
                                state.window.request_redraw();
                            }
                        }
                        if let Some(webview) = state.active_webview() {
                            let servo_button = match button {
                                WinitMouseButton::Left => ServoMouseButton::Left,
                                WinitMouseButton::Right => ServoMouseButton::Right,
                                WinitMouseButton::Middle => ServoMouseButton::Middle,
                                WinitMouseButton::Back => ServoMouseButton::Back,
                                WinitMouseButton::Forward => ServoMouseButton::Forward,
                                WinitMouseButton::Other(id) => ServoMouseButton::Other(id),
                            };
                            let action = match btn_state {
                                ElementState::Pressed => MouseButtonAction::Down,
                                ElementState::Released => MouseButtonAction::Up,
                            };
                            webview.notify_input_event(InputEvent::MouseButton(MouseButtonEvent::new(
                                action,
                                servo_button,
                                point.into(),
                            )));
                        }
                    }
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                let mods = state.modifiers.get();
                let pressed = event.state == ElementState::Pressed;

                if pressed && let Some(shortcut) = keyutils::shortcut_for(&event.logical_key, mods) {
                    state.run_shortcut(shortcut);
                    return;
                }

                if pressed && state.navigator.borrow().urlbar().is_focused() {
                    state.edit_address(&event, mods);
                    return;
                }

                if let Some(webview) = state.active_webview() {
                    let keyboard_event = keyutils::keyboard_event_from_winit(&event, mods);
                    webview.notify_input_event(InputEvent::Keyboard(keyboard_event));
                }
            }

            _ => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn test_content_area_below_default_toolbar() {
        let config = Config::default();
        let size = rendering::content_size(
            PhysicalSize::new(config.window.width, config.window.height),
            config.chrome.height,
        );
        assert_eq!(size, PhysicalSize::new(1280, 760));
    }
}
