//! X11 keysym lookup by human key name.
//!
//! Names are matched case-insensitively. Single letters and digits map to
//! their Latin-1 keysyms; everything else comes from [`NAMED`], which lists
//! the canonical X11 name first and common aliases after it.

use crate::KeyId;

/// First function-key keysym (`F1`).
const XK_F1: u32 = 0xffbe;
/// Highest supported function key number.
const MAX_FUNCTION_KEY: u32 = 24;

/// Canonical names and aliases, canonical first.
const NAMED: &[(u32, &[&str])] = &[
    (0x0020, &["space", "spc"]),
    (0xff0d, &["Return", "enter", "ret"]),
    (0xff09, &["Tab"]),
    (0xff1b, &["Escape", "esc"]),
    (0xff08, &["BackSpace", "bksp"]),
    (0xffff, &["Delete", "del"]),
    (0xff63, &["Insert", "ins"]),
    (0xff50, &["Home"]),
    (0xff57, &["End"]),
    (0xff55, &["Page_Up", "pageup", "pgup", "prior"]),
    (0xff56, &["Page_Down", "pagedown", "pgdn", "next"]),
    (0xff51, &["Left", "arrowleft"]),
    (0xff52, &["Up", "arrowup"]),
    (0xff53, &["Right", "arrowright"]),
    (0xff54, &["Down", "arrowdown"]),
    (0xffe1, &["Shift_L", "shift", "lshift"]),
    (0xffe2, &["Shift_R", "rshift"]),
    (0xffe3, &["Control_L", "ctrl", "control", "lctrl"]),
    (0xffe4, &["Control_R", "rctrl"]),
    (0xffe9, &["Alt_L", "alt", "lalt"]),
    (0xffea, &["Alt_R", "ralt", "altgr"]),
    (0xffeb, &["Super_L", "super", "meta", "win", "cmd"]),
    (0xffec, &["Super_R", "rsuper"]),
    (0xffe5, &["Caps_Lock", "capslock", "caps"]),
    (0xff7f, &["Num_Lock", "numlock"]),
    (0xff14, &["Scroll_Lock", "scrolllock"]),
    (0xff61, &["Print", "printscreen", "prtsc"]),
    (0xff13, &["Pause", "break"]),
    (0xff67, &["Menu", "apps"]),
    (0xff8d, &["KP_Enter", "kpenter"]),
    (0x002d, &["minus", "-"]),
    (0x003d, &["equal", "="]),
    (0x002c, &["comma", ","]),
    (0x002e, &["period", "."]),
    (0x002f, &["slash", "/"]),
    (0x005c, &["backslash", "\\"]),
    (0x003b, &["semicolon", ";"]),
    (0x0027, &["apostrophe", "'"]),
    (0x0060, &["grave", "`"]),
    (0x005b, &["bracketleft", "["]),
    (0x005d, &["bracketright", "]"]),
];

/// Resolve a key name to its keysym.
///
/// Returns `None` for empty or unknown names.
pub fn from_name(name: &str) -> Option<KeyId> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next())
        && c.is_ascii_alphanumeric()
    {
        return Some(KeyId(u32::from(c.to_ascii_lowercase())));
    }

    if let Some(n) = function_key_number(name) {
        return Some(KeyId(XK_F1 + n - 1));
    }

    NAMED
        .iter()
        .find(|(_, names)| names.iter().any(|n| n.eq_ignore_ascii_case(name)))
        .map(|(sym, _)| KeyId(*sym))
}

/// Canonical name for a keysym, if it is one we know.
pub fn to_name(id: KeyId) -> Option<&'static str> {
    const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";
    const DIGITS: &str = "0123456789";
    const FKEYS: [&str; MAX_FUNCTION_KEY as usize] = [
        "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12", "F13", "F14",
        "F15", "F16", "F17", "F18", "F19", "F20", "F21", "F22", "F23", "F24",
    ];

    let sym = id.0;
    match sym {
        0x61..=0x7a => {
            let i = (sym - 0x61) as usize;
            LETTERS.get(i..=i)
        }
        0x30..=0x39 => {
            let i = (sym - 0x30) as usize;
            DIGITS.get(i..=i)
        }
        s if (XK_F1..XK_F1 + MAX_FUNCTION_KEY).contains(&s) => {
            FKEYS.get((s - XK_F1) as usize).copied()
        }
        _ => NAMED
            .iter()
            .find(|(s, _)| *s == sym)
            .and_then(|(_, names)| names.first().copied()),
    }
}

/// Parse `F1`..`F24` (case-insensitive).
fn function_key_number(name: &str) -> Option<u32> {
    let rest = name.strip_prefix(['f', 'F'])?;
    let n: u32 = rest.parse().ok()?;
    (1..=MAX_FUNCTION_KEY).contains(&n).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_and_digits() {
        assert_eq!(from_name("a"), Some(KeyId(0x61)));
        assert_eq!(from_name("W"), Some(KeyId(0x77)));
        assert_eq!(from_name("7"), Some(KeyId(0x37)));
    }

    #[test]
    fn named_keys_and_aliases() {
        assert_eq!(from_name("space"), Some(KeyId(0x20)));
        assert_eq!(from_name("ENTER"), Some(KeyId(0xff0d)));
        assert_eq!(from_name("esc"), from_name("Escape"));
        assert_eq!(from_name("ctrl"), Some(KeyId(0xffe3)));
        assert_eq!(from_name("/"), Some(KeyId(0x2f)));
    }

    #[test]
    fn function_keys() {
        assert_eq!(from_name("F1"), Some(KeyId(0xffbe)));
        assert_eq!(from_name("f12"), Some(KeyId(0xffc9)));
        assert_eq!(from_name("F24"), Some(KeyId(0xffd5)));
        assert_eq!(from_name("F25"), None);
        assert_eq!(from_name("F0"), None);
    }

    #[test]
    fn rejects_empty_and_unknown() {
        assert_eq!(from_name(""), None);
        assert_eq!(from_name("   "), None);
        assert_eq!(from_name("hyper-x"), None);
    }

    #[test]
    fn canonical_names() {
        assert_eq!(to_name(KeyId(0x61)), Some("a"));
        assert_eq!(to_name(KeyId(0x39)), Some("9"));
        assert_eq!(to_name(KeyId(0xffc9)), Some("F12"));
        assert_eq!(to_name(KeyId(0xff0d)), Some("Return"));
        assert_eq!(to_name(KeyId(0xdead_beef)), None);
    }
}
