// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Value handlers shared by the directives.
//!
//! Every handler takes the whole token line, keyword included, so `tokens[1]` is the first value. Handlers that
//! need an exact number of values leave their target alone when the count is wrong.

use alloc::{borrow::ToOwned, string::String, vec::Vec};
use log::warn;
use tinyvec::ArrayVec;

use crate::config::types::{GraphicsFor, HideUiFlags, NUM_SCAN_OPTIONS, NUM_TOOLS, ToolTag};

/// The last minute of a day, `23:59`.
pub const LAST_MINUTE: u32 = 1439;

/// Parses the leading decimal digits of a token, or 0 if there are none.
#[must_use = "Has no effect if the result is unused"]
pub fn parse_uint(token: &str) -> u32 {
    token
        .trim_start()
        .chars()
        .map_while(|c| c.to_digit(10))
        .fold(0u32, |acc, d| acc.saturating_mul(10).saturating_add(d))
}

/// Parses the leading decimal digits of a token, which may have a leading `-`.
#[must_use = "Has no effect if the result is unused"]
pub fn parse_int(token: &str) -> i32 {
    let token = token.trim_start();
    match token.strip_prefix('-') {
        Some(digits) => 0i32.saturating_sub_unsigned(parse_uint(digits)),
        None => i32::try_from(parse_uint(token)).unwrap_or(i32::MAX),
    }
}

/// Sets an unsigned integer from a directive with exactly one value.
pub fn handle_int(tokens: &[String], target: &mut u32) {
    if let [_, value] = tokens {
        *target = parse_uint(value);
    }
}

/// Sets a signed integer from a directive with exactly one value.
pub fn handle_signed(tokens: &[String], target: &mut i32) {
    if let [_, value] = tokens {
        *target = parse_int(value);
    }
}

/// Replaces a string from a directive with exactly one value.
pub fn handle_string(tokens: &[String], target: &mut Option<String>) {
    if let [_, value] = tokens {
        *target = Some(value.clone());
    }
}

/// Returns true if the values of a list directive should be appended rather than replace the list.
///
/// This is the case when the first value is a lone `+` followed by at least one more value.
fn is_append(tokens: &[String]) -> bool {
    tokens.len() > 2 && tokens[1] == "+"
}

/// Replaces or appends to a list of strings.
///
/// When `clean` is set, every item has its path separators cleaned up with [`clean_path_slashes`].
pub fn handle_strings(tokens: &[String], target: &mut Vec<String>, clean: bool) {
    let append = is_append(tokens);
    if !append {
        target.clear();
    }

    let values = tokens.iter().skip(if append { 2 } else { 1 });
    target.extend(values.map(|x| if clean { clean_path_slashes(x) } else { x.clone() }));
}

/// Replaces or appends to a list of hexadecimal values.
///
/// Values that are not valid hexadecimal, or are larger than `max`, are dropped. An `0x` prefix is accepted.
pub fn handle_hexes(tokens: &[String], max: u32, target: &mut Vec<u32>) {
    let append = is_append(tokens);
    if !append {
        target.clear();
    }

    let values = tokens.iter().skip(if append { 2 } else { 1 });
    target.extend(values.filter_map(|x| parse_hex(x)).filter(|&x| x <= max));
}

/// Parses a hexadecimal token. Only the first eight digits are read.
#[must_use = "Has no effect if the result is unused"]
pub fn parse_hex(token: &str) -> Option<u32> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(&digits[..digits.len().min(8)], 16).ok()
}

/// Reads a boolean directive.
///
/// `0`, `false` and `off` are false. Anything else, including a keyword with no value at all, is true.
#[must_use = "Has no effect if the result is unused"]
pub fn handle_boolean(tokens: &[String]) -> bool {
    !tokens.get(1).is_some_and(|x| {
        x == "0" || x.eq_ignore_ascii_case("false") || x.eq_ignore_ascii_case("off")
    })
}

/// Converts `HH:MM` to minutes past midnight.
///
/// A value without a colon is read as a number of minutes. Results past [`LAST_MINUTE`] are invalid times.
#[must_use = "Has no effect if the result is unused"]
pub fn parse_time(token: &str) -> u32 {
    let (mut hour, mut minute) = (0u32, 0u32);
    for c in token.chars() {
        if c == ':' {
            hour = minute;
            minute = 0;
        }
        if let Some(d) = c.to_digit(10) {
            minute = minute.saturating_mul(10).saturating_add(d);
        }
    }
    hour.saturating_mul(60).saturating_add(minute)
}

/// Checks if a minute of the day lies in a time range. Both ends are inclusive.
///
/// A range whose start is not before its end crosses midnight.
#[must_use = "Has no effect if the result is unused"]
pub const fn in_time_range(start: u32, end: u32, now: u32) -> bool {
    if start < end {
        now >= start && now <= end
    } else {
        now >= start || now <= end
    }
}

/// Accumulates `hideui` flags.
///
/// `all`, `every` and `everything` set every flag. `none` clears every flag and ends the list, wherever it is.
pub fn handle_hideui(tokens: &[String], flags: &mut HideUiFlags) {
    if tokens.iter().skip(1).any(|x| x.eq_ignore_ascii_case("none")) {
        *flags = HideUiFlags::empty();
        return;
    }

    for name in tokens.iter().skip(1) {
        if ["all", "every", "everything"].iter().any(|x| name.eq_ignore_ascii_case(x)) {
            *flags = HideUiFlags::all();
        } else if let Some(flag) = HideUiFlags::from_config_name(name) {
            *flags |= flag;
        } else {
            warn!("Invalid 'hideui' flag: \"{name}\"");
        }
    }
}

/// Sets the loader families that start in graphics mode.
///
/// The set is cleared first, unless the first value is `+` and more values follow it.
pub fn handle_graphics_for(tokens: &[String], flags: &mut GraphicsFor) {
    if !is_append(tokens) {
        *flags = GraphicsFor::empty();
    }
    for flag in tokens.iter().skip(1).filter_map(|x| GraphicsFor::from_config_name(x)) {
        *flags |= flag;
    }
}

/// Replaces the shown tools with the listed ones, in order.
///
/// Returns whether `hidden_tags` was among them. An unknown name is logged and leaves a blank slot in its place, and
/// anything past the available slots is ignored.
pub fn handle_showtools(tokens: &[String], tools: &mut ArrayVec<[Option<ToolTag>; NUM_TOOLS]>) -> bool {
    tools.clear();
    let mut hidden_tags = false;
    for name in tokens.iter().skip(1).take(NUM_TOOLS - 1) {
        let tag = ToolTag::from_name(name);
        match tag {
            Some(tag) => hidden_tags |= tag == ToolTag::Hidden,
            None => warn!("Unknown 'showtools' flag: \"{name}\""),
        }
        tools.push(tag);
    }
    hidden_tags
}

/// Fills the scan target slots from a `scanfor` line.
///
/// Slot `i` takes the first character of token `i`, counting the keyword, and slots without a token are blank.
pub fn handle_scanfor(tokens: &[String], slots: &mut [char; NUM_SCAN_OPTIONS]) {
    for (i, slot) in slots.iter_mut().enumerate() {
        *slot = tokens.get(i).and_then(|x| x.chars().next()).unwrap_or(' ');
    }
}

/// Reads a `resolution` line, with one or two values.
///
/// `max` gives `0x0`, which leaves the resolution as it is.
#[must_use = "Has no effect if the result is unused"]
pub fn handle_resolution(tokens: &[String]) -> Option<(u32, u32)> {
    match tokens {
        [_, max] | [_, max, _] if max.eq_ignore_ascii_case("max") => Some((0, 0)),
        [_, width] => Some((parse_uint(width), 0)),
        [_, width, height] => Some((parse_uint(width), parse_uint(height))),
        _ => None,
    }
}

/// Reads a `screen_rgb` line with exactly three values.
///
/// Returns the components and whether all of them are valid 8-bit values.
#[must_use = "Has no effect if the result is unused"]
pub fn handle_screen_rgb(tokens: &[String]) -> Option<([i32; 3], bool)> {
    let [_, r, g, b] = tokens else {
        return None;
    };
    let rgb = [parse_int(r), parse_int(g), parse_int(b)];
    Some((rgb, rgb.iter().all(|x| (0..=255).contains(x))))
}

/// Cleans up the separators of a path.
///
/// Both `/` and `\` become a single `\`, leading and trailing separators are dropped, and a path with nothing left
/// becomes `\`.
#[must_use = "Has no effect if the result is unused"]
pub fn clean_path_slashes(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let mut cleaned = String::with_capacity(path.len());
    let mut separator = false;
    for c in path.chars() {
        if matches!(c, '/' | '\\') {
            separator = !cleaned.is_empty();
        } else {
            if separator {
                cleaned.push('\\');
                separator = false;
            }
            cleaned.push(c);
        }
    }

    if cleaned.is_empty() { "\\".to_owned() } else { cleaned }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use proptest::prelude::*;

    fn line(str: &str) -> Vec<String> {
        str.split(' ').map(ToOwned::to_owned).collect()
    }

    #[test]
    fn test_ints() {
        assert_eq!(parse_uint("20"), 20);
        assert_eq!(parse_uint("12abc"), 12);
        assert_eq!(parse_uint("abc"), 0);
        assert_eq!(parse_int("-1"), -1);
        assert_eq!(parse_int("-15"), -15);

        let mut value = 5;
        handle_int(&line("scan_delay 3 4"), &mut value);
        assert_eq!(value, 5);
        handle_int(&line("scan_delay 3"), &mut value);
        assert_eq!(value, 3);
    }

    #[test]
    fn test_append() {
        let mut list = Vec::new();
        handle_strings(&line("also_scan_dirs A B"), &mut list, true);
        handle_strings(&line("also_scan_dirs + C D"), &mut list, true);
        assert_eq!(list, ["A", "B", "C", "D"]);
        handle_strings(&line("also_scan_dirs E"), &mut list, true);
        assert_eq!(list, ["E"]);
        handle_strings(&line("also_scan_dirs +"), &mut list, true);
        assert_eq!(list, ["+"]);
    }

    #[test]
    fn test_hexes() {
        let mut values = Vec::new();
        handle_hexes(&line("csr_values 0x10 zzzz 0xFFFFFFFF + 0x20"), 0xFFF, &mut values);
        assert_eq!(values, [0x10, 0x20]);
        handle_hexes(&line("csr_values + 77 877"), 0xFFF, &mut values);
        assert_eq!(values, [0x10, 0x20, 0x77, 0x877]);
        handle_hexes(&line("csr_values 0"), 0xFFF, &mut values);
        assert_eq!(values, [0]);
    }

    #[test]
    fn test_boolean() {
        assert!(handle_boolean(&line("textonly")));
        assert!(handle_boolean(&line("textonly yes")));
        assert!(handle_boolean(&line("textonly 1")));
        assert!(!handle_boolean(&line("textonly 0")));
        assert!(!handle_boolean(&line("textonly OFF")));
        assert!(!handle_boolean(&line("textonly False")));
    }

    #[test]
    fn test_time() {
        assert_eq!(parse_time("00:00"), 0);
        assert_eq!(parse_time("23:59"), LAST_MINUTE);
        assert_eq!(parse_time("7:30"), 450);
        assert_eq!(parse_time("90"), 90);
        assert!(parse_time("24:00") > LAST_MINUTE);

        assert!(in_time_range(480, 1020, 600));
        assert!(!in_time_range(480, 1020, 1100));
        assert!(in_time_range(1320, 360, 1400));
        assert!(in_time_range(1320, 360, 100));
        assert!(!in_time_range(1320, 360, 700));
    }

    #[test]
    fn test_hideui() {
        let mut flags = HideUiFlags::empty();
        handle_hideui(&line("hideui banner none label"), &mut flags);
        assert_eq!(flags, HideUiFlags::empty());

        handle_hideui(&line("hideui banner label"), &mut flags);
        assert_eq!(flags, HideUiFlags::BANNER | HideUiFlags::LABEL);
        handle_hideui(&line("hideui hints frobnicate"), &mut flags);
        assert_eq!(flags, HideUiFlags::BANNER | HideUiFlags::LABEL | HideUiFlags::HINTS);

        handle_hideui(&line("hideui everything"), &mut flags);
        assert_eq!(flags, HideUiFlags::all());
    }

    #[test]
    fn test_graphics_for() {
        let mut flags = GraphicsFor::OSX;
        handle_graphics_for(&line("use_graphics_for + linux"), &mut flags);
        assert_eq!(flags, GraphicsFor::OSX | GraphicsFor::LINUX);
        handle_graphics_for(&line("use_graphics_for grub windows"), &mut flags);
        assert_eq!(flags, GraphicsFor::GRUB | GraphicsFor::WINDOWS);
        handle_graphics_for(&line("use_graphics_for +"), &mut flags);
        assert_eq!(flags, GraphicsFor::empty());
    }

    #[test]
    fn test_showtools() {
        let mut tools = ArrayVec::new();
        assert!(!handle_showtools(&line("showtools shell bogus reboot"), &mut tools));
        assert_eq!(tools.as_slice(), [Some(ToolTag::Shell), None, Some(ToolTag::Reboot)]);
        assert!(handle_showtools(&line("showtools hidden_tags"), &mut tools));
        assert_eq!(tools.as_slice(), [Some(ToolTag::Hidden)]);

        let many = vec!["shell"; 40].join(" ");
        handle_showtools(&line(&alloc::format!("showtools {many}")), &mut tools);
        assert_eq!(tools.len(), NUM_TOOLS - 1);
    }

    #[test]
    fn test_scanfor() {
        let mut slots = [' '; NUM_SCAN_OPTIONS];
        handle_scanfor(&line("scanfor internal external"), &mut slots);
        assert_eq!(slots[..4], ['s', 'i', 'e', ' ']);
    }

    #[test]
    fn test_resolution() {
        assert_eq!(handle_resolution(&line("resolution max")), Some((0, 0)));
        assert_eq!(handle_resolution(&line("resolution 1920 1080")), Some((1920, 1080)));
        assert_eq!(handle_resolution(&line("resolution 3")), Some((3, 0)));
        assert_eq!(handle_resolution(&line("resolution")), None);
        assert_eq!(handle_resolution(&line("resolution 1 2 3")), None);
    }

    #[test]
    fn test_screen_rgb() {
        assert_eq!(handle_screen_rgb(&line("screen_rgb 0 128 255")), Some(([0, 128, 255], true)));
        assert_eq!(handle_screen_rgb(&line("screen_rgb 0 128 256")), Some(([0, 128, 256], false)));
        assert_eq!(handle_screen_rgb(&line("screen_rgb -1 0 0")), Some(([-1, 0, 0], false)));
        assert_eq!(handle_screen_rgb(&line("screen_rgb 0 0")), None);
    }

    #[test]
    fn test_clean_path_slashes() {
        assert_eq!(clean_path_slashes("\\EFI\\tools\\"), "EFI\\tools");
        assert_eq!(clean_path_slashes("ESP:\\EFI//boot"), "ESP:\\EFI\\boot");
        assert_eq!(clean_path_slashes("/"), "\\");
        assert_eq!(clean_path_slashes("vmlinuz"), "vmlinuz");
    }

    proptest! {
        #[test]
        fn doesnt_panic(token in "\\PC*") {
            let _ = parse_int(&token);
            let _ = parse_hex(&token);
            let _ = parse_time(&token);
            let _ = clean_path_slashes(&token);
        }
    }
}
