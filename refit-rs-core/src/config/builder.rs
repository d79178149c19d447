// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Settings builder.

use alloc::string::String;
use log::{debug, warn};

use crate::config::{
    ParseContext, Settings, defaults,
    directives::dispatch,
    types::ToolTag,
};

/// A builder that accumulates directives into [`Settings`].
///
/// Directives are applied in file order, across the primary file and anything it includes. The settings only become
/// available through [`SettingsBuilder::finalize`], which fills in the defaults that depend on the whole file.
///
/// # Example
///
/// ```
/// use refit_rs_core::config::{ParseContext, builder::SettingsBuilder, tokenizer::tokenize_line};
///
/// let ctx = ParseContext::default();
/// let mut builder = SettingsBuilder::new(ctx.apple_firmware);
/// builder.apply(&tokenize_line("timeout 10"), &ctx);
/// builder.apply(&tokenize_line("enable_touch"), &ctx);
///
/// let settings = builder.finalize(&ctx, true);
/// assert_eq!(settings.timeout, 10);
/// assert!(settings.enable_touch);
/// ```
#[must_use = "Has no effect if the result is unused"]
pub struct SettingsBuilder {
    /// The settings being built.
    settings: Settings,
}

impl SettingsBuilder {
    /// Constructs a new [`SettingsBuilder`] with the firmware dependent defaults.
    pub fn new(apple_firmware: bool) -> Self {
        Self {
            settings: Settings::new(apple_firmware),
        }
    }

    /// Applies the defaults of a primary configuration file.
    pub fn main_defaults(&mut self, ctx: &ParseContext) -> &mut Self {
        defaults::apply_main_defaults(&mut self.settings, ctx);
        self
    }

    /// Applies one tokenized line.
    ///
    /// Returns `false` if the keyword is not a known directive.
    pub fn apply(&mut self, tokens: &[String], ctx: &ParseContext) -> bool {
        dispatch(&mut self.settings, tokens, ctx)
    }

    /// The settings so far.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Applies the rules that depend on the configuration as a whole, and returns the finished [`Settings`].
    ///
    /// `has_icons` is whether an icons directory could be found, either `icons` next to the boot manager or the
    /// configured `icons_dir`.
    pub fn finalize(mut self, ctx: &ParseContext, has_icons: bool) -> Settings {
        let settings = &mut self.settings;

        if settings.tags_help && !settings.show_tools.contains(&Some(ToolTag::Hidden)) {
            if let Some(slot) = settings.show_tools.iter_mut().find(|x| x.is_none()) {
                *slot = Some(ToolTag::Hidden);
                settings.hidden_tags = true;
            } else if settings.show_tools.try_push(Some(ToolTag::Hidden)).is_some() {
                warn!("No room left for hidden_tags in showtools");
            } else {
                settings.hidden_tags = true;
            }
        }

        for file in &settings.windows_recovery_files {
            if !settings.dont_scan_files.contains(file) {
                settings.dont_scan_files.push(file.clone());
            }
        }

        if settings.linux_prefixes.is_empty() {
            settings.linux_prefixes = defaults::LINUX_PREFIXES.map(String::from).into();
        }

        if !has_icons && !settings.text_only {
            debug!("No icons directory found, using text mode");
            settings.text_only = true;
        }

        if !ctx.apple_firmware {
            settings.protect_nvram = false;
        }

        if settings.enable_touch {
            settings.enable_mouse = false;
        }

        self.settings
    }
}
