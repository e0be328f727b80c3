//! Disposition de la barre d'outils et hit-testing.
//!
//! ```text
//! ┌───┬───┬───┬───┬──────────────────────────────────────┬───┬───┐
//! │ < │ > │ R │ H │ adresse                              │ P │ S │
//! └───┴───┴───┴───┴──────────────────────────────────────┴───┴───┘
//! ```
//!
//! Purement géométrique : le rendu est fait par [`crate::chrome`], les
//! actions par [`crate::browser`].

use crate::config::ChromeConfig;
use crate::privacy::PrivacyMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    Back,
    Forward,
    Reload,
    Home,
    Privacy,
    Settings,
    AddressField,
}

impl ToolbarAction {
    const LEADING: [ToolbarAction; 4] = [Self::Back, Self::Forward, Self::Reload, Self::Home];
    const TRAILING: [ToolbarAction; 2] = [Self::Privacy, Self::Settings];

    /// Libellé du bouton. Le bouton Privacy affiche l'état courant.
    pub fn label(self, privacy: PrivacyMode) -> &'static str {
        match self {
            Self::Back => "<",
            Self::Forward => ">",
            Self::Reload => "R",
            Self::Home => "H",
            Self::Privacy => privacy.label(),
            Self::Settings => "S",
            Self::AddressField => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }
}

/// Rectangles de chaque élément pour une largeur de fenêtre donnée.
#[derive(Debug, Clone)]
pub struct ToolbarLayout {
    buttons: Vec<(ToolbarAction, Rect)>,
    address: Rect,
    height: f32,
}

impl ToolbarLayout {
    pub fn compute(window_width: f32, config: &ChromeConfig) -> Self {
        let h = config.height as f32;
        let bw = config.button_width;
        let mut buttons = Vec::with_capacity(6);

        for (i, action) in ToolbarAction::LEADING.iter().enumerate() {
            buttons.push((*action, Rect { x: i as f32 * bw, y: 0.0, w: bw, h }));
        }
        let trailing_start = (window_width - bw * ToolbarAction::TRAILING.len() as f32).max(0.0);
        for (i, action) in ToolbarAction::TRAILING.iter().enumerate() {
            buttons.push((
                *action,
                Rect { x: trailing_start + i as f32 * bw, y: 0.0, w: bw, h },
            ));
        }

        let left = bw * ToolbarAction::LEADING.len() as f32 + config.bar_margin;
        let right = trailing_start - config.bar_margin;
        let address = Rect {
            x: left,
            y: config.bar_margin,
            w: (right - left).max(0.0),
            h: (h - config.bar_margin * 2.0).max(0.0),
        };

        Self { buttons, address, height: h }
    }

    pub fn buttons(&self) -> &[(ToolbarAction, Rect)] {
        &self.buttons
    }

    pub fn address_field(&self) -> Rect {
        self.address
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Élément sous le point `(x, y)` (pixels physiques, origine en haut à gauche).
    pub fn hit_test(&self, x: f32, y: f32) -> Option<ToolbarAction> {
        if y < 0.0 || y >= self.height {
            return None;
        }
        if let Some((action, _)) = self.buttons.iter().find(|(_, r)| r.contains(x, y)) {
            return Some(*action);
        }
        // Toute la bande entre les boutons focus la barre, marges comprises.
        let left = self.buttons.get(ToolbarAction::LEADING.len() - 1).map_or(0.0, |(_, r)| r.x + r.w);
        let right = self
            .buttons
            .get(ToolbarAction::LEADING.len())
            .map_or(f32::MAX, |(_, r)| r.x);
        (x >= left && x < right).then_some(ToolbarAction::AddressField)
    }
}
