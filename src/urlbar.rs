//! Barre d'adresse : machine à états pour l'édition de texte.
//!
//! Le texte reflète toujours l'emplacement réel de la vue : chaque
//! changement d'URL l'écrase, même en cours d'édition. La décision
//! URL / recherche n'est pas prise ici mais dans [`crate::address`].
//!
//! Aucune dépendance graphique, ce module est purement logique.

use url::Url;

/// État du focus de la barre d'adresse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlBarFocus {
    /// La barre n'a pas le focus : les événements clavier vont à la page.
    Unfocused,
    /// Vient d'être focusée (Ctrl+L ou clic), tout le texte est sélectionné.
    /// La prochaine frappe remplace tout le contenu.
    Focused,
    /// L'utilisateur est en train de taper.
    Editing,
}

/// Machine à états de la barre d'adresse.
#[derive(Debug)]
pub struct UrlBar {
    /// Texte affiché / édité.
    text: String,
    /// Position du curseur en offset d'octets dans `text`.
    cursor: usize,
    focus: UrlBarFocus,
    /// Dernier emplacement signalé par la vue.
    current_url: Option<Url>,
}

impl Default for UrlBar {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlBar {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            cursor: 0,
            focus: UrlBarFocus::Unfocused,
            current_url: None,
        }
    }

    /// Écrase le texte avec la forme textuelle de `url`.
    /// Une édition en cours est abandonnée.
    pub fn set_location(&mut self, url: &Url) {
        self.current_url = Some(url.clone());
        self.text = url.as_str().to_string();
        self.cursor = self.text.len();
        self.focus = UrlBarFocus::Unfocused;
    }

    /// Vide la barre (page d'erreur affichée).
    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
        self.current_url = None;
        self.focus = UrlBarFocus::Unfocused;
    }

    /// Focus la barre (Ctrl+L ou clic). Sélectionne tout le texte.
    pub fn focus(&mut self) {
        self.focus = UrlBarFocus::Focused;
        self.cursor = self.text.len();
    }

    /// Retire le focus (Escape). Restaure l'emplacement courant.
    pub fn unfocus(&mut self) {
        self.focus = UrlBarFocus::Unfocused;
        self.text = self
            .current_url
            .as_ref()
            .map(|url| url.as_str().to_string())
            .unwrap_or_default();
        self.cursor = self.text.len();
    }

    /// Si on est en mode Focused (select-all), la saisie remplace tout.
    fn take_selection(&mut self) -> bool {
        if self.focus == UrlBarFocus::Focused {
            self.text.clear();
            self.cursor = 0;
            self.focus = UrlBarFocus::Editing;
            return true;
        }
        false
    }

    pub fn insert_char(&mut self, c: char) {
        self.take_selection();
        self.focus = UrlBarFocus::Editing;
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Backspace.
    pub fn backspace(&mut self) {
        if self.take_selection() {
            return;
        }
        if let Some(prev) = self.prev_boundary() {
            self.text.drain(prev..self.cursor);
            self.cursor = prev;
        }
    }

    /// Delete.
    pub fn delete(&mut self) {
        if self.take_selection() {
            return;
        }
        if let Some(next) = self.next_boundary() {
            self.text.drain(self.cursor..next);
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.focus == UrlBarFocus::Focused {
            self.focus = UrlBarFocus::Editing;
            self.cursor = 0;
            return;
        }
        if let Some(prev) = self.prev_boundary() {
            self.cursor = prev;
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.focus == UrlBarFocus::Focused {
            self.focus = UrlBarFocus::Editing;
            return;
        }
        if let Some(next) = self.next_boundary() {
            self.cursor = next;
        }
    }

    pub fn home(&mut self) {
        if self.focus == UrlBarFocus::Focused {
            self.focus = UrlBarFocus::Editing;
        }
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        if self.focus == UrlBarFocus::Focused {
            self.focus = UrlBarFocus::Editing;
        }
        self.cursor = self.text.len();
    }

    /// Ctrl+A.
    pub fn select_all(&mut self) {
        self.focus = UrlBarFocus::Focused;
        self.cursor = self.text.len();
    }

    /// Valide la saisie (Enter). Retourne le texte brut, sans `trim()`,
    /// même vide : le classifieur décide.
    pub fn submit(&mut self) -> String {
        self.focus = UrlBarFocus::Unfocused;
        self.text.clone()
    }

    pub fn is_focused(&self) -> bool {
        self.focus != UrlBarFocus::Unfocused
    }

    pub fn display_text(&self) -> &str {
        &self.text
    }

    pub fn cursor_pos(&self) -> usize {
        self.cursor
    }

    /// Nombre de caractères avant le curseur (pour le rendu).
    pub fn cursor_char_offset(&self) -> usize {
        self.text[..self.cursor].chars().count()
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.text[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        if self.cursor >= self.text.len() {
            return None;
        }
        Some(
            self.text[self.cursor..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| self.cursor + i)
                .unwrap_or(self.text.len()),
        )
    }
}
