// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The table of global directives.
//!
//! Every directive is one [`Directive`] entry: its name, its deprecated aliases, how many tokens it takes, and what it
//! does with them. Lookup is case insensitive. `include` and `menuentry` are not in the table, since they need the
//! reader itself rather than just the settings.
//!
//! Most directives fall into a generic [`Kind`] that points at a field of [`Settings`]. Everything else is a
//! [`Kind::Custom`] function.

use alloc::string::String;
use log::{debug, warn};

use crate::config::{
    ParseContext, Settings,
    handlers::{
        LAST_MINUTE, handle_boolean, handle_graphics_for, handle_hexes, handle_hideui, handle_int, handle_resolution,
        handle_scanfor, handle_screen_rgb, handle_showtools, handle_signed, handle_string, handle_strings, in_time_range,
        parse_time, parse_uint,
    },
    types::{BannerScale, CSR_MAX_LEGAL_VALUE, DEFAULT_MOUSE_SIZE},
};

/// The smallest accepted icon size.
const MIN_ICON_SIZE: u32 = 32;

/// The fastest mouse speed.
const MAX_MOUSE_SPEED: u32 = 32;

/// Another name a directive may be written as.
#[derive(Clone, Copy, Debug)]
pub struct Alias {
    /// The alternative keyword.
    pub name: &'static str,

    /// If the boolean value is inverted, as with the `decline_*` forms.
    pub inverted: bool,
}

/// How many tokens a directive takes, keyword included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    /// Any number.
    Any,

    /// Exactly this many. Lines with any other count are ignored.
    Exactly(usize),
}

/// What a directive does with its values.
#[derive(Clone, Copy)]
pub enum Kind {
    /// A signed integer with exactly one value.
    Signed(fn(&mut Settings) -> &mut i32),

    /// An unsigned integer with exactly one value.
    Unsigned(fn(&mut Settings) -> &mut u32),

    /// A string with exactly one value.
    Str(fn(&mut Settings) -> &mut Option<String>),

    /// A list of paths, which may be appended to with `+`.
    Paths(fn(&mut Settings) -> &mut alloc::vec::Vec<String>),

    /// A boolean.
    Bool(fn(&mut Settings) -> &mut bool),

    /// Anything else.
    Custom(fn(&mut Settings, &[String], &ParseContext)),
}

/// A global directive.
#[derive(Clone, Copy)]
pub struct Directive {
    /// The canonical keyword.
    pub name: &'static str,

    /// Deprecated keywords that still work.
    pub aliases: &'static [Alias],

    /// How many tokens the directive takes.
    pub arity: Arity,

    /// What the directive does.
    pub kind: Kind,
}

impl Directive {
    /// A directive without aliases.
    const fn new(name: &'static str, arity: Arity, kind: Kind) -> Self {
        Self {
            name,
            aliases: &[],
            arity,
            kind,
        }
    }

    /// A directive with aliases.
    const fn aliased(name: &'static str, aliases: &'static [Alias], arity: Arity, kind: Kind) -> Self {
        Self {
            name,
            aliases,
            arity,
            kind,
        }
    }
}

/// A plain alias.
const fn alias(name: &'static str) -> Alias {
    Alias { name, inverted: false }
}

/// An alias whose boolean value is inverted.
const fn decline(name: &'static str) -> Alias {
    Alias { name, inverted: true }
}

use Arity::{Any, Exactly};

/// Every global directive.
pub static DIRECTIVES: &[Directive] = &[
    // integers
    Directive::new("timeout", Exactly(2), Kind::Custom(timeout)),
    Directive::new("screensaver", Exactly(2), Kind::Signed(|s| &mut s.screensaver)),
    Directive::new("scale_ui", Exactly(2), Kind::Signed(|s| &mut s.scale_ui)),
    Directive::new("active_csr", Exactly(2), Kind::Signed(|s| &mut s.active_csr)),
    Directive::new("log_level", Exactly(2), Kind::Custom(log_level)),
    Directive::new("scan_delay", Exactly(2), Kind::Unsigned(|s| &mut s.scan_delay)),
    Directive::new("textmode", Exactly(2), Kind::Unsigned(|s| &mut s.text_mode)),
    Directive::new("max_tags", Exactly(2), Kind::Unsigned(|s| &mut s.max_tags)),
    Directive::new("mouse_speed", Exactly(2), Kind::Custom(mouse_speed)),
    Directive::new("small_icon_size", Exactly(2), Kind::Custom(small_icon_size)),
    Directive::new("big_icon_size", Exactly(2), Kind::Custom(big_icon_size)),
    Directive::new("mouse_size", Exactly(2), Kind::Custom(mouse_size)),
    // strings
    Directive::new("icons_dir", Exactly(2), Kind::Str(|s| &mut s.icons_dir)),
    Directive::new("set_boot_args", Exactly(2), Kind::Str(|s| &mut s.set_boot_args)),
    Directive::new("banner", Exactly(2), Kind::Str(|s| &mut s.banner)),
    Directive::new("selection_small", Exactly(2), Kind::Str(|s| &mut s.selection_small)),
    Directive::new("selection_big", Exactly(2), Kind::Str(|s| &mut s.selection_big)),
    Directive::new("default_selection", Any, Kind::Custom(default_selection)),
    Directive::new("spoof_osx_version", Exactly(2), Kind::Str(|s| &mut s.spoof_osx_version)),
    Directive::new("font", Exactly(2), Kind::Str(|s| &mut s.font)),
    // lists
    Directive::new("also_scan_dirs", Any, Kind::Paths(|s| &mut s.also_scan_dirs)),
    Directive::aliased("dont_scan_dirs", &[alias("don't_scan_dirs")], Any, Kind::Paths(|s| &mut s.dont_scan_dirs)),
    Directive::aliased("dont_scan_files", &[alias("don't_scan_files")], Any, Kind::Paths(|s| &mut s.dont_scan_files)),
    Directive::aliased("dont_scan_tools", &[alias("don't_scan_tools")], Any, Kind::Paths(|s| &mut s.dont_scan_tools)),
    Directive::aliased(
        "dont_scan_firmware",
        &[alias("don't_scan_firmware")],
        Any,
        Kind::Paths(|s| &mut s.dont_scan_firmware),
    ),
    Directive::aliased("dont_scan_volumes", &[alias("don't_scan_volumes")], Any, Kind::Custom(dont_scan_volumes)),
    Directive::new("windows_recovery_files", Any, Kind::Paths(|s| &mut s.windows_recovery_files)),
    Directive::new("macos_recovery_files", Any, Kind::Paths(|s| &mut s.macos_recovery_files)),
    Directive::new("scan_driver_dirs", Any, Kind::Paths(|s| &mut s.scan_driver_dirs)),
    Directive::new("extra_kernel_version_strings", Any, Kind::Paths(|s| &mut s.extra_kernel_version_strings)),
    Directive::new("linux_prefixes", Any, Kind::Paths(|s| &mut s.linux_prefixes)),
    Directive::new("csr_values", Any, Kind::Custom(csr_values)),
    // booleans
    Directive::new("shutdown_after_timeout", Any, Kind::Bool(|s| &mut s.shutdown_after_timeout)),
    Directive::new("use_nvram", Any, Kind::Bool(|s| &mut s.use_nvram)),
    Directive::new("uefi_deep_legacy_scan", Any, Kind::Bool(|s| &mut s.deep_legacy_scan)),
    Directive::new("textonly", Any, Kind::Bool(|s| &mut s.text_only)),
    Directive::new("scan_all_linux_kernels", Any, Kind::Bool(|s| &mut s.scan_all_linux)),
    Directive::new("fold_linux_kernels", Any, Kind::Bool(|s| &mut s.fold_linux_kernels)),
    Directive::new("enable_and_lock_vmx", Any, Kind::Bool(|s| &mut s.enable_and_lock_vmx)),
    Directive::new("write_systemd_vars", Any, Kind::Bool(|s| &mut s.write_systemd_vars)),
    Directive::new("enable_mouse", Any, Kind::Custom(enable_mouse)),
    Directive::new("enable_touch", Any, Kind::Custom(enable_touch)),
    Directive::new("transient_boot", Any, Kind::Bool(|s| &mut s.transient_boot)),
    Directive::new("ignore_hidden_icons", Any, Kind::Bool(|s| &mut s.ignore_hidden_icons)),
    Directive::new("external_hidden_icons", Any, Kind::Bool(|s| &mut s.external_hidden_icons)),
    Directive::new("prefer_hidden_icons", Any, Kind::Bool(|s| &mut s.prefer_hidden_icons)),
    Directive::aliased("renderer_text", &[alias("text_renderer")], Any, Kind::Bool(|s| &mut s.text_renderer)),
    Directive::aliased("pass_uga_through", &[alias("uga_pass_through")], Any, Kind::Bool(|s| &mut s.uga_pass_through)),
    Directive::new("provide_console_gop", Any, Kind::Bool(|s| &mut s.provide_console_gop)),
    Directive::aliased(
        "renderer_direct_gop",
        &[alias("direct_gop_renderer")],
        Any,
        Kind::Bool(|s| &mut s.use_direct_gop),
    ),
    Directive::new("continue_on_warning", Any, Kind::Bool(|s| &mut s.continue_on_warning)),
    Directive::new("force_trim", Any, Kind::Bool(|s| &mut s.force_trim)),
    Directive::new("disable_compat_check", Any, Kind::Bool(|s| &mut s.disable_compat_check)),
    Directive::new("disable_amfi", Any, Kind::Bool(|s| &mut s.disable_amfi)),
    Directive::new("normalise_csr", Any, Kind::Bool(|s| &mut s.normalise_csr)),
    Directive::aliased("reload_gop", &[decline("decline_reloadgop")], Any, Kind::Bool(|s| &mut s.reload_gop)),
    Directive::aliased("supply_nvme", &[decline("decline_nvmeload")], Any, Kind::Bool(|s| &mut s.supply_nvme)),
    Directive::aliased("supply_apfs", &[decline("decline_apfsload")], Any, Kind::Bool(|s| &mut s.supply_apfs)),
    Directive::aliased("supply_uefi", &[decline("decline_uefiemulate")], Any, Kind::Bool(|s| &mut s.supply_uefi)),
    Directive::aliased("silence_apfs", &[decline("decline_apfsmute")], Any, Kind::Bool(|s| &mut s.silence_apfs)),
    Directive::aliased("sync_apfs", &[decline("decline_apfssync")], Any, Kind::Bool(|s| &mut s.sync_apfs)),
    Directive::aliased("protect_nvram", &[decline("decline_nvramprotect")], Any, Kind::Bool(|s| &mut s.protect_nvram)),
    Directive::aliased("scan_other_esp", &[decline("decline_espfilter")], Any, Kind::Bool(|s| &mut s.scan_other_esp)),
    Directive::aliased("tags_help", &[decline("decline_tagshelp")], Any, Kind::Bool(|s| &mut s.tags_help)),
    // everything else
    Directive::new("hideui", Any, Kind::Custom(|s, tokens, _| handle_hideui(tokens, &mut s.hide_ui))),
    Directive::new("use_graphics_for", Any, Kind::Custom(|s, tokens, _| handle_graphics_for(tokens, &mut s.graphics_for))),
    Directive::new("banner_scale", Exactly(2), Kind::Custom(banner_scale)),
    Directive::new("scanfor", Any, Kind::Custom(|s, tokens, _| handle_scanfor(tokens, &mut s.scan_for))),
    Directive::new("showtools", Any, Kind::Custom(showtools)),
    Directive::new("resolution", Any, Kind::Custom(resolution)),
    Directive::new("screen_rgb", Exactly(4), Kind::Custom(screen_rgb)),
];

/// A directive found by [`lookup`].
#[derive(Clone, Copy)]
pub struct Found {
    /// The directive.
    pub directive: &'static Directive,

    /// If it was written as an alias whose value is inverted.
    pub inverted: bool,

    /// If it was written as an alias.
    pub deprecated: bool,
}

/// Finds the directive for a keyword, ignoring case.
#[must_use = "Has no effect if the result is unused"]
pub fn lookup(keyword: &str) -> Option<Found> {
    DIRECTIVES.iter().find_map(|directive| {
        if directive.name.eq_ignore_ascii_case(keyword) {
            return Some(Found {
                directive,
                inverted: false,
                deprecated: false,
            });
        }
        directive
            .aliases
            .iter()
            .find(|x| x.name.eq_ignore_ascii_case(keyword))
            .map(|x| Found {
                directive,
                inverted: x.inverted,
                deprecated: true,
            })
    })
}

/// Applies one line of tokens to the settings.
///
/// Returns false if the keyword is not a known directive. A known directive with the wrong number of tokens is
/// ignored, but still counts as known.
pub fn dispatch(settings: &mut Settings, tokens: &[String], ctx: &ParseContext) -> bool {
    let Some(keyword) = tokens.first() else {
        return false;
    };
    let Some(found) = lookup(keyword) else {
        warn!("Unknown configuration token: \"{keyword}\"");
        return false;
    };

    let directive = found.directive;
    if found.deprecated {
        debug!("\"{keyword}\" is deprecated, avoid deprecated token and use \"{}\"", directive.name);
    }
    if let Arity::Exactly(n) = directive.arity
        && tokens.len() != n
    {
        debug!("\"{}\" takes {} values but {} were given, ignoring", directive.name, n - 1, tokens.len() - 1);
        return true;
    }

    match directive.kind {
        Kind::Signed(field) => handle_signed(tokens, field(settings)),
        Kind::Unsigned(field) => handle_int(tokens, field(settings)),
        Kind::Str(field) => handle_string(tokens, field(settings)),
        Kind::Paths(field) => handle_strings(tokens, field(settings), true),
        Kind::Bool(field) => *field(settings) = handle_boolean(tokens) != found.inverted,
        Kind::Custom(handler) => handler(settings, tokens, ctx),
    }
    true
}

/// `timeout`, which boots directly when it is negative.
fn timeout(settings: &mut Settings, tokens: &[String], _: &ParseContext) {
    handle_signed(tokens, &mut settings.timeout);
    settings.direct_boot = settings.timeout < 0;
}

/// `log_level`, which is clamped to the supported levels.
fn log_level(settings: &mut Settings, tokens: &[String], _: &ParseContext) {
    handle_signed(tokens, &mut settings.log_level);
    settings.log_level = settings
        .log_level
        .clamp(0, crate::system::log_backend::MAX_LOG_LEVEL);
}

/// `mouse_speed`, which is clamped to 1 to 32.
fn mouse_speed(settings: &mut Settings, tokens: &[String], _: &ParseContext) {
    settings.mouse_speed = parse_uint(&tokens[1]).clamp(1, MAX_MOUSE_SPEED);
}

/// `small_icon_size`, ignored when too small.
fn small_icon_size(settings: &mut Settings, tokens: &[String], _: &ParseContext) {
    let size = parse_uint(&tokens[1]);
    if size >= MIN_ICON_SIZE {
        settings.icon_sizes.small = size;
    }
}

/// `big_icon_size`, ignored when too small. Badges are a quarter of the size.
fn big_icon_size(settings: &mut Settings, tokens: &[String], _: &ParseContext) {
    let size = parse_uint(&tokens[1]);
    if size >= MIN_ICON_SIZE {
        settings.icon_sizes.big = size;
        settings.icon_sizes.badge = size / 4;
    }
}

/// `mouse_size`, ignored when smaller than the default.
fn mouse_size(settings: &mut Settings, tokens: &[String], _: &ParseContext) {
    let size = parse_uint(&tokens[1]);
    if size >= DEFAULT_MOUSE_SIZE {
        settings.icon_sizes.mouse = size;
    }
}

/// `default_selection`, with an optional time range.
///
/// `default_selection NAME START END` only takes effect when the current time lies between `START` and `END`.
fn default_selection(settings: &mut Settings, tokens: &[String], ctx: &ParseContext) {
    let [_, name, start, end] = tokens else {
        handle_string(tokens, &mut settings.default_selection);
        return;
    };

    let (start, end) = (parse_time(start), parse_time(end));
    if start > LAST_MINUTE || end > LAST_MINUTE {
        warn!("Invalid time range for 'default_selection' \"{name}\"");
        return;
    }
    match ctx.minute_of_day {
        Some(now) if in_time_range(start, end, now) => settings.default_selection = Some(name.clone()),
        Some(_) => (),
        None => warn!("The current time is unknown, ignoring timed 'default_selection' \"{name}\""),
    }
}

/// `dont_scan_volumes`, which keeps slashes since volume names may contain them.
fn dont_scan_volumes(settings: &mut Settings, tokens: &[String], _: &ParseContext) {
    settings.dont_scan_volumes = tokens[1..].to_vec();
}

/// `csr_values`.
fn csr_values(settings: &mut Settings, tokens: &[String], _: &ParseContext) {
    handle_hexes(tokens, CSR_MAX_LEGAL_VALUE, &mut settings.csr_values);
}

/// `enable_mouse`, which turns touch off.
fn enable_mouse(settings: &mut Settings, tokens: &[String], _: &ParseContext) {
    settings.enable_mouse = handle_boolean(tokens);
    if settings.enable_mouse {
        settings.enable_touch = false;
    }
}

/// `enable_touch`, which turns the mouse off.
fn enable_touch(settings: &mut Settings, tokens: &[String], _: &ParseContext) {
    settings.enable_touch = handle_boolean(tokens);
    if settings.enable_touch {
        settings.enable_mouse = false;
    }
}

/// `banner_scale`.
fn banner_scale(settings: &mut Settings, tokens: &[String], _: &ParseContext) {
    let value = &tokens[1];
    if value.eq_ignore_ascii_case("noscale") {
        settings.banner_scale = BannerScale::NoScale;
    } else if value.eq_ignore_ascii_case("fillscreen") || value.eq_ignore_ascii_case("fullscreen") {
        settings.banner_scale = BannerScale::FillScreen;
    } else {
        warn!("Invalid 'banner_scale' flag: \"{value}\"");
    }
}

/// `showtools`.
fn showtools(settings: &mut Settings, tokens: &[String], _: &ParseContext) {
    settings.hidden_tags = handle_showtools(tokens, &mut settings.show_tools);
}

/// `resolution`.
fn resolution(settings: &mut Settings, tokens: &[String], _: &ParseContext) {
    if let Some((width, height)) = handle_resolution(tokens) {
        settings.requested_width = width;
        settings.requested_height = height;
    }
}

/// `screen_rgb`.
fn screen_rgb(settings: &mut Settings, tokens: &[String], _: &ParseContext) {
    if let Some((rgb, valid)) = handle_screen_rgb(tokens) {
        settings.screen_rgb = rgb;
        settings.custom_screen_bg = valid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{tokenizer::tokenize_line, types::HideUiFlags};
    use alloc::vec::Vec;

    fn apply(settings: &mut Settings, ctx: &ParseContext, line: &str) -> bool {
        dispatch(settings, &tokenize_line(line), ctx)
    }

    fn parse(lines: &[&str]) -> Settings {
        let ctx = ParseContext::default();
        let mut settings = Settings::default();
        for line in lines {
            apply(&mut settings, &ctx, line);
        }
        settings
    }

    #[test]
    fn test_names_unique() {
        let mut names: Vec<&str> = DIRECTIVES
            .iter()
            .flat_map(|x| core::iter::once(x.name).chain(x.aliases.iter().map(|a| a.name)))
            .collect();
        let len = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), len);
    }

    #[test]
    fn test_lookup() {
        assert!(lookup("TIMEOUT").is_some());
        let found = lookup("don't_scan_dirs").map(|x| (x.directive.name, x.deprecated, x.inverted));
        assert_eq!(found, Some(("dont_scan_dirs", true, false)));
        let found = lookup("decline_apfssync").map(|x| (x.directive.name, x.inverted));
        assert_eq!(found, Some(("sync_apfs", true)));
        assert!(lookup("frobnicate").is_none());
    }

    #[test]
    fn test_timeout() {
        let settings = parse(&["timeout -1"]);
        assert_eq!(settings.timeout, -1);
        assert!(settings.direct_boot);

        let settings = parse(&["timeout -1", "timeout 10"]);
        assert!(!settings.direct_boot);
        assert_eq!(parse(&["timeout 10 20"]).timeout, 0);
    }

    #[test]
    fn test_unknown() {
        let ctx = ParseContext::default();
        let mut settings = Settings::default();
        assert!(!apply(&mut settings, &ctx, "frobnicate 1"));
        assert!(apply(&mut settings, &ctx, "log_level 1 2"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_append() {
        let settings = parse(&["also_scan_dirs boot", "also_scan_dirs + /extra//dir/"]);
        assert_eq!(settings.also_scan_dirs, ["boot", "extra\\dir"]);
        let settings = parse(&["also_scan_dirs boot", "also_scan_dirs other"]);
        assert_eq!(settings.also_scan_dirs, ["other"]);
    }

    #[test]
    fn test_dont_scan_volumes_keeps_slashes() {
        let settings = parse(&["dont_scan_volumes \"Data/Backup\" Recovery"]);
        assert_eq!(settings.dont_scan_volumes, ["Data/Backup", "Recovery"]);
    }

    #[test]
    fn test_csr_values() {
        let settings = parse(&["csr_values 10,77,0x67,zz,1000"]);
        assert_eq!(settings.csr_values, [0x10, 0x77, 0x67]);
        let settings = parse(&["csr_values 10", "csr_values + 77"]);
        assert_eq!(settings.csr_values, [0x10, 0x77]);
    }

    #[test]
    fn test_hideui_none() {
        let settings = parse(&["hideui banner label none hints"]);
        assert_eq!(settings.hide_ui, HideUiFlags::empty());
        let settings = parse(&["hideui banner", "hideui hints"]);
        assert_eq!(settings.hide_ui, HideUiFlags::BANNER | HideUiFlags::HINTS);
        assert_eq!(parse(&["hideui all"]).hide_ui, HideUiFlags::all());
    }

    #[test]
    fn test_declines() {
        let settings = parse(&["decline_apfssync", "decline_nvmeload false", "scan_other_esp"]);
        assert!(!settings.sync_apfs);
        assert!(settings.supply_nvme);
        assert!(settings.scan_other_esp);
    }

    #[test]
    fn test_mouse_touch() {
        let settings = parse(&["enable_mouse", "enable_touch"]);
        assert!(settings.enable_touch && !settings.enable_mouse);
        let settings = parse(&["enable_touch", "enable_mouse"]);
        assert!(settings.enable_mouse && !settings.enable_touch);
    }

    #[test]
    fn test_clamps() {
        let settings = parse(&["log_level 9", "mouse_speed 0", "small_icon_size 16", "big_icon_size 256"]);
        assert_eq!(settings.log_level, 4);
        assert_eq!(settings.mouse_speed, 1);
        assert_eq!(settings.icon_sizes.small, 48);
        assert_eq!(settings.icon_sizes.big, 256);
        assert_eq!(settings.icon_sizes.badge, 64);
        assert_eq!(parse(&["log_level -3"]).log_level, 0);
        assert_eq!(parse(&["mouse_speed 99"]).mouse_speed, 32);
    }

    #[test]
    fn test_resolution() {
        let settings = parse(&["resolution 1024 768", "resolution max"]);
        assert_eq!((settings.requested_width, settings.requested_height), (0, 0));
        let settings = parse(&["resolution 1920"]);
        assert_eq!((settings.requested_width, settings.requested_height), (1920, 0));
    }

    #[test]
    fn test_screen_rgb() {
        let settings = parse(&["screen_rgb 10 20 30"]);
        assert_eq!(settings.screen_rgb, [10, 20, 30]);
        assert!(settings.custom_screen_bg);
        assert!(!parse(&["screen_rgb 10 20 300"]).custom_screen_bg);
    }

    #[test]
    fn test_default_selection_by_time() {
        let ctx = ParseContext {
            minute_of_day: Some(23 * 60 + 30),
            ..ParseContext::default()
        };
        let mut settings = Settings::default();
        apply(&mut settings, &ctx, "default_selection Linux");
        apply(&mut settings, &ctx, "default_selection Windows 22:00 06:00");
        assert_eq!(settings.default_selection.as_deref(), Some("Windows"));
        apply(&mut settings, &ctx, "default_selection macOS 08:00 17:00");
        assert_eq!(settings.default_selection.as_deref(), Some("Windows"));
        apply(&mut settings, &ctx, "default_selection macOS 08:00 25:00");
        assert_eq!(settings.default_selection.as_deref(), Some("Windows"));
    }

    #[test]
    fn test_showtools() {
        let settings = parse(&["showtools shell, reboot, frobnicate"]);
        assert_eq!(settings.show_tools.as_slice(), [
            Some(crate::config::types::ToolTag::Shell),
            Some(crate::config::types::ToolTag::Reboot),
            None
        ]);
        assert!(!settings.hidden_tags);
        assert!(parse(&["showtools hidden_tags"]).hidden_tags);
    }

    #[test]
    fn test_scanfor() {
        let settings = parse(&["scanfor internal,external,optical"]);
        assert_eq!(settings.scan_for(), "sieo");
    }

    #[test]
    fn test_banner_scale() {
        assert_eq!(parse(&["banner_scale fullscreen"]).banner_scale, BannerScale::FillScreen);
        assert_eq!(parse(&["banner_scale fillscreen", "banner_scale stretch"]).banner_scale, BannerScale::FillScreen);
    }
}
