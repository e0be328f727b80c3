//! Clavier : conversion Winit → Servo et raccourcis du navigateur.
//!
//! Servo utilise les types de `keyboard_types` (ré-exportés depuis `servo::`),
//! Winit les siens dans `winit::keyboard`. Seules les touches utiles à une
//! page web sont traduites ; les autres deviennent `Unidentified`.

use servo::{Code, Key, KeyState, KeyboardEvent, Location, Modifiers, NamedKey};
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{
    Key as WinitKey, KeyCode, KeyLocation as WinitKeyLocation, ModifiersState,
    NamedKey as WinitNamedKey, PhysicalKey,
};

/// Variantes de même nom des deux côtés.
macro_rules! map_same {
    ($value:expr, $from:ident => $to:ident, [$($name:ident),* $(,)?], $default:expr) => {
        match $value {
            $($from::$name => $to::$name,)*
            _ => $default,
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Raccourcis
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    FocusAddress,
    Reload,
    Back,
    Forward,
    Home,
}

/// Raccourci global associé à une touche pressée, quel que soit le focus.
pub fn shortcut_for(key: &WinitKey, mods: ModifiersState) -> Option<Shortcut> {
    match key {
        WinitKey::Character(c) if mods.control_key() => match c.to_ascii_lowercase().as_str() {
            "l" => Some(Shortcut::FocusAddress),
            "r" => Some(Shortcut::Reload),
            _ => None,
        },
        WinitKey::Named(WinitNamedKey::F5) => Some(Shortcut::Reload),
        WinitKey::Named(WinitNamedKey::ArrowLeft) if mods.alt_key() => Some(Shortcut::Back),
        WinitKey::Named(WinitNamedKey::ArrowRight) if mods.alt_key() => Some(Shortcut::Forward),
        WinitKey::Named(WinitNamedKey::Home) if mods.alt_key() => Some(Shortcut::Home),
        WinitKey::Named(WinitNamedKey::BrowserBack) => Some(Shortcut::Back),
        WinitKey::Named(WinitNamedKey::BrowserForward) => Some(Shortcut::Forward),
        WinitKey::Named(WinitNamedKey::BrowserRefresh) => Some(Shortcut::Reload),
        WinitKey::Named(WinitNamedKey::BrowserHome) => Some(Shortcut::Home),
        _ => None,
    }
}

/// Texte à insérer dans la barre d'adresse. Winit livre l'espace comme
/// touche nommée.
pub fn typed_text(key: &WinitKey) -> Option<&str> {
    match key {
        WinitKey::Character(c) => Some(c.as_str()),
        WinitKey::Named(WinitNamedKey::Space) => Some(" "),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Winit → Servo
// ─────────────────────────────────────────────────────────────────────────────

pub fn keyboard_event_from_winit(key_event: &KeyEvent, state: ModifiersState) -> KeyboardEvent {
    KeyboardEvent::new_without_event(
        key_state_from_winit(key_event.state),
        key_from_winit(&key_event.logical_key),
        code_from_winit(&key_event.physical_key),
        location_from_winit(key_event.location),
        modifiers_from_winit(state),
        false,
        false,
    )
}

fn key_state_from_winit(state: ElementState) -> KeyState {
    match state {
        ElementState::Pressed => KeyState::Down,
        ElementState::Released => KeyState::Up,
    }
}

fn key_from_winit(logical_key: &WinitKey) -> Key {
    match logical_key {
        WinitKey::Character(s) => Key::Character(s.to_string()),
        WinitKey::Named(WinitNamedKey::Space) => Key::Character(" ".to_string()),
        WinitKey::Named(named) => Key::Named(map_same!(
            named,
            WinitNamedKey => NamedKey,
            [
                Alt, AltGraph, CapsLock, Control, Fn, FnLock, Meta, NumLock, ScrollLock,
                Shift, Symbol, SymbolLock, Hyper, Super,
                Enter, Tab, Backspace, Delete, Insert, Escape, ContextMenu,
                ArrowDown, ArrowLeft, ArrowRight, ArrowUp, End, Home, PageDown, PageUp,
                Copy, Cut, Paste, Undo, Redo, Find, Help, Pause, PrintScreen,
                BrowserBack, BrowserForward, BrowserHome, BrowserRefresh, BrowserSearch,
                BrowserStop, BrowserFavorites,
                MediaPlayPause, MediaStop, MediaTrackNext, MediaTrackPrevious,
                AudioVolumeDown, AudioVolumeUp, AudioVolumeMute,
                F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
            ],
            NamedKey::Unidentified
        )),
        WinitKey::Unidentified(_) | WinitKey::Dead(_) => Key::Named(NamedKey::Unidentified),
    }
}

fn location_from_winit(location: WinitKeyLocation) -> Location {
    match location {
        WinitKeyLocation::Left => Location::Left,
        WinitKeyLocation::Numpad => Location::Numpad,
        WinitKeyLocation::Right => Location::Right,
        WinitKeyLocation::Standard => Location::Standard,
    }
}

fn code_from_winit(physical_key: &PhysicalKey) -> Code {
    let key_code = match physical_key {
        PhysicalKey::Code(code) => *code,
        PhysicalKey::Unidentified(_) => return Code::Unidentified,
    };
    match key_code {
        KeyCode::SuperLeft => Code::MetaLeft,
        KeyCode::SuperRight => Code::MetaRight,
        other => map_same!(
            other,
            KeyCode => Code,
            [
                KeyA, KeyB, KeyC, KeyD, KeyE, KeyF, KeyG, KeyH, KeyI, KeyJ, KeyK, KeyL, KeyM,
                KeyN, KeyO, KeyP, KeyQ, KeyR, KeyS, KeyT, KeyU, KeyV, KeyW, KeyX, KeyY, KeyZ,
                Digit0, Digit1, Digit2, Digit3, Digit4, Digit5, Digit6, Digit7, Digit8, Digit9,
                Backquote, Backslash, BracketLeft, BracketRight, Comma, Equal, Minus, Period,
                Quote, Semicolon, Slash, IntlBackslash,
                AltLeft, AltRight, ControlLeft, ControlRight, ShiftLeft, ShiftRight, CapsLock,
                Backspace, Enter, Space, Tab, Escape, Delete, Insert, ContextMenu,
                ArrowDown, ArrowLeft, ArrowRight, ArrowUp, End, Home, PageDown, PageUp,
                NumLock, Numpad0, Numpad1, Numpad2, Numpad3, Numpad4, Numpad5, Numpad6,
                Numpad7, Numpad8, Numpad9, NumpadAdd, NumpadDecimal, NumpadDivide,
                NumpadEnter, NumpadMultiply, NumpadSubtract,
                F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
                PrintScreen, ScrollLock, Pause,
            ],
            Code::Unidentified
        ),
    }
}

fn modifiers_from_winit(mods: ModifiersState) -> Modifiers {
    let mut modifiers = Modifiers::empty();
    modifiers.set(Modifiers::CONTROL, mods.control_key());
    modifiers.set(Modifiers::SHIFT, mods.shift_key());
    modifiers.set(Modifiers::ALT, mods.alt_key());
    modifiers.set(Modifiers::META, mods.super_key());
    modifiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::SmolStr;

    fn ch(s: &str) -> WinitKey {
        WinitKey::Character(SmolStr::new(s))
    }

    // ── Raccourcis ───────────────────────────────────────────────────────

    #[test]
    fn test_ctrl_l_and_ctrl_r() {
        let ctrl = ModifiersState::CONTROL;
        assert_eq!(shortcut_for(&ch("l"), ctrl), Some(Shortcut::FocusAddress));
        assert_eq!(shortcut_for(&ch("L"), ctrl), Some(Shortcut::FocusAddress));
        assert_eq!(shortcut_for(&ch("r"), ctrl), Some(Shortcut::Reload));
        assert_eq!(shortcut_for(&ch("l"), ModifiersState::empty()), None);
    }

    #[test]
    fn test_alt_arrows_and_home() {
        let alt = ModifiersState::ALT;
        let named = |k| WinitKey::Named(k);
        assert_eq!(shortcut_for(&named(WinitNamedKey::ArrowLeft), alt), Some(Shortcut::Back));
        assert_eq!(shortcut_for(&named(WinitNamedKey::ArrowRight), alt), Some(Shortcut::Forward));
        assert_eq!(shortcut_for(&named(WinitNamedKey::Home), alt), Some(Shortcut::Home));
        assert_eq!(shortcut_for(&named(WinitNamedKey::ArrowLeft), ModifiersState::empty()), None);
        assert_eq!(
            shortcut_for(&named(WinitNamedKey::F5), ModifiersState::empty()),
            Some(Shortcut::Reload)
        );
    }

    #[test]
    fn test_typed_text() {
        assert_eq!(typed_text(&ch("é")), Some("é"));
        assert_eq!(typed_text(&WinitKey::Named(WinitNamedKey::Space)), Some(" "));
        assert_eq!(typed_text(&WinitKey::Named(WinitNamedKey::Enter)), None);
    }

    // ── Conversion ───────────────────────────────────────────────────────

    #[test]
    fn test_key_state() {
        assert_eq!(key_state_from_winit(ElementState::Pressed), KeyState::Down);
        assert_eq!(key_state_from_winit(ElementState::Released), KeyState::Up);
    }

    #[test]
    fn test_named_keys() {
        assert_eq!(key_from_winit(&WinitKey::Named(WinitNamedKey::Enter)), Key::Named(NamedKey::Enter));
        assert_eq!(key_from_winit(&WinitKey::Named(WinitNamedKey::F12)), Key::Named(NamedKey::F12));
        assert_eq!(
            key_from_winit(&WinitKey::Named(WinitNamedKey::Space)),
            Key::Character(" ".to_string())
        );
        assert_eq!(
            key_from_winit(&WinitKey::Named(WinitNamedKey::TVPower)),
            Key::Named(NamedKey::Unidentified)
        );
    }

    #[test]
    fn test_character_key() {
        assert_eq!(key_from_winit(&ch("a")), Key::Character("a".to_string()));
    }

    #[test]
    fn test_codes() {
        assert_eq!(code_from_winit(&PhysicalKey::Code(KeyCode::KeyA)), Code::KeyA);
        assert_eq!(code_from_winit(&PhysicalKey::Code(KeyCode::Numpad7)), Code::Numpad7);
        assert_eq!(code_from_winit(&PhysicalKey::Code(KeyCode::SuperLeft)), Code::MetaLeft);
        assert_eq!(code_from_winit(&PhysicalKey::Code(KeyCode::F24)), Code::Unidentified);
    }

    #[test]
    fn test_location() {
        assert_eq!(location_from_winit(WinitKeyLocation::Numpad), Location::Numpad);
        assert_eq!(location_from_winit(WinitKeyLocation::Left), Location::Left);
    }

    #[test]
    fn test_modifiers() {
        let m = modifiers_from_winit(ModifiersState::CONTROL | ModifiersState::SUPER);
        assert!(m.contains(Modifiers::CONTROL));
        assert!(m.contains(Modifiers::META));
        assert!(!m.contains(Modifiers::SHIFT));
        assert!(modifiers_from_winit(ModifiersState::empty()).is_empty());
    }
}
