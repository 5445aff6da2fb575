//! Stateful translation from raw `KEY` transitions to keysym + UTF-8 text
//! (spec.md §4.7), backed by `xkbcommon`.
//!
//! The interpreter is entirely optional and separately addressable: the raw
//! `KEY` stream a caller already receives from `core-input` is unaffected by
//! whether a [`KeymapInterpreter`] is attached at all.

use core_events::{Event, EventKind, KeyModifiers, KeyRecord, KeyText};
use xkbcommon::xkb;

pub const DEFAULT_RULES: &str = "";
pub const DEFAULT_MODEL: &str = "pc105";
pub const DEFAULT_LAYOUT: &str = "us";
pub const DEFAULT_VARIANT: &str = "";
pub const DEFAULT_OPTIONS: &str = "";

/// evdev keycodes start at 0; X11/xkb keycodes reserve 0-7 for historical
/// reasons, so every evdev code is shifted by this bias before xkbcommon
/// will recognize it.
const EVDEV_XKB_KEYCODE_BIAS: u32 = 8;

/// The five identifier strings that select a keymap, in `xkb_rule_names`
/// order (spec.md §4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeymapNames {
    pub rules: String,
    pub model: String,
    pub layout: String,
    pub variant: String,
    pub options: String,
}

impl Default for KeymapNames {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.to_string(),
            model: DEFAULT_MODEL.to_string(),
            layout: DEFAULT_LAYOUT.to_string(),
            variant: DEFAULT_VARIANT.to_string(),
            options: DEFAULT_OPTIONS.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeymapError {
    #[error("xkbcommon could not compile a keymap from {names:?}")]
    Compile { names: KeymapNames },
}

/// Owns a live xkbcommon keymap/state pair and turns raw `KEY` Event
/// Records into [`KeyRecord`]s. Callers that want the layer disabled simply
/// hold an `Option<KeymapInterpreter>` and skip calling [`Self::translate`].
pub struct KeymapInterpreter {
    // Kept alive alongside `state`; xkbcommon's `State` is built from a
    // `Keymap` which is itself built from a `Context`.
    _context: xkb::Context,
    _keymap: xkb::Keymap,
    state: xkb::State,
    names: KeymapNames,
}

impl KeymapInterpreter {
    /// Compiles keymap state from `names`. A compile failure (malformed
    /// identifiers xkbcommon rejects) is reported as `Err` without
    /// constructing anything — callers satisfy the spec's "a build failure
    /// leaves the previous state intact" requirement for free, by simply
    /// keeping their existing interpreter when this returns `Err`.
    pub fn new(names: KeymapNames) -> Result<Self, KeymapError> {
        let context = xkb::Context::new(xkb::ContextFlags::NO_FLAGS);
        let rule_names = xkb::RuleNames {
            rules: names.rules.clone(),
            model: names.model.clone(),
            layout: names.layout.clone(),
            variant: names.variant.clone(),
            options: Some(names.options.clone()),
        };
        let keymap = xkb::Keymap::new_from_names(&context, &rule_names, xkb::KeymapCompileFlags::NO_FLAGS)
            .ok_or_else(|| KeymapError::Compile { names: names.clone() })?;
        let state = xkb::State::new(&keymap);
        Ok(Self { _context: context, _keymap: keymap, state, names })
    }

    pub fn names(&self) -> &KeymapNames {
        &self.names
    }

    /// Atomically rebuilds state from `names`: on success `self` now
    /// reflects the new keymap; on failure `self` is left completely
    /// untouched and the caller's engine keeps dispatching with the
    /// previous keymap (spec.md §4.7).
    pub fn rebuild(&mut self, names: KeymapNames) -> Result<(), KeymapError> {
        let rebuilt = Self::new(names)?;
        *self = rebuilt;
        Ok(())
    }

    /// Translates one raw `KEY` [`Event`] into a [`KeyRecord`], updating the
    /// modifier/lock state as a side effect. Returns `None` for non-`KEY`
    /// events and for `value`s other than press (`1`) or release (`0`) —
    /// auto-repeat (`value >= 2`) does not produce a distinct edge here,
    /// mirroring the raw stream's own press/release semantics.
    pub fn translate(&mut self, event: &Event) -> Option<KeyRecord> {
        if event.kind != EventKind::Key {
            return None;
        }
        let down = match event.value {
            0 => false,
            1 => true,
            _ => return None,
        };

        let keycode = xkb::Keycode::new(u32::from(event.code) + EVDEV_XKB_KEYCODE_BIAS);
        let direction = if down { xkb::KeyDirection::Down } else { xkb::KeyDirection::Up };
        self.state.update_key(keycode, direction);

        let keysym = self.state.key_get_one_sym(keycode);
        let mods = self.active_modifiers();
        let text = if down { KeyText::from_str_truncating(&self.state.key_get_utf8(keycode)) } else { KeyText::empty() };

        Some(KeyRecord {
            device_id: event.device_id,
            timestamp_ns: event.timestamp_ns,
            down,
            keysym: keysym.raw(),
            mods,
            text,
        })
    }

    fn active_modifiers(&self) -> KeyModifiers {
        let mut mods = KeyModifiers::empty();
        let active = |name: &str| self.state.mod_name_is_active(name, xkb::StateComponent::MODS_EFFECTIVE);
        if active(xkb::MOD_NAME_SHIFT) {
            mods |= KeyModifiers::SHIFT;
        }
        if active(xkb::MOD_NAME_CTRL) {
            mods |= KeyModifiers::CONTROL;
        }
        if active(xkb::MOD_NAME_ALT) {
            mods |= KeyModifiers::ALT;
        }
        if active(xkb::MOD_NAME_LOGO) {
            mods |= KeyModifiers::SUPER;
        }
        mods
    }
}
