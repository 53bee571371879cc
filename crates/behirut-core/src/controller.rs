//! Per-document controller: the content script's only piece of state.
//!
//! Owns the [`MutationWatcher`] and the font catalog, and turns startup and
//! incoming [`Message`]s into full passes, re-arms and toggle-offs.

use crate::config::{FontCatalog, Settings};
use crate::error::TreeError;
use crate::fonts::inject_custom_fonts;
use crate::message::Message;
use crate::style::StyleParameters;
use crate::transform::{PassReport, apply_all, clear_all};
use crate::tree::TextTree;
use crate::watcher::{MutationWatcher, WatchHost};

/// Id of the marker element placed in `head` after the first full pass.
pub const DOCUMENT_MARKER_ID: &str = "behirutMetaElement";

/// What a [`PageController`] call ended up doing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Full pass ran and the watcher is armed with `params`.
    Applied {
        params: StyleParameters,
        report: PassReport,
    },
    /// Styles were cleared from `cleared` wrappers and the watcher disarmed.
    ToggledOff { cleared: usize },
    /// Custom font rules were (re)injected.
    FontsInjected { count: usize },
    /// Disabled, or whitelisted on a page never touched.
    Idle,
}

/// Controller for one document.
pub struct PageController<H: WatchHost> {
    watcher: MutationWatcher<H::Subscription>,
    fonts: FontCatalog,
}

impl<H: WatchHost> Default for PageController<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: WatchHost> PageController<H> {
    pub fn new() -> Self {
        Self {
            watcher: MutationWatcher::new(),
            fonts: FontCatalog::new(),
        }
    }

    pub fn watcher(&self) -> &MutationWatcher<H::Subscription> {
        &self.watcher
    }

    pub fn fonts(&self) -> &FontCatalog {
        &self.fonts
    }

    /// Startup and full-reapply.
    ///
    /// When enabled and not whitelisted: inject fonts, style the whole body
    /// with the effective parameters, arm the watcher, mark the document.
    /// When whitelisted on a document that was styled before: toggle off.
    pub fn run(
        &mut self,
        host: &mut H,
        settings: &Settings,
        hostname: &str,
    ) -> Result<Outcome, TreeError> {
        let whitelisted = settings.is_whitelisted(hostname);

        if settings.enabled && !whitelisted {
            self.register_fonts(host, &settings.custom_fonts);
            let params = settings.effective_params(hostname);
            if !self.fonts.contains(&params.font_name) {
                tracing::warn!(font = %params.font_name, "font is neither built in nor registered");
            }
            let report = self.full_pass(host, &params)?;
            self.watcher.arm(host, params.clone())?;
            mark_document(host)?;
            return Ok(Outcome::Applied { params, report });
        }

        if whitelisted && is_document_marked(host) {
            let cleared = self.toggle_off(host)?;
            return Ok(Outcome::ToggledOff { cleared });
        }

        Ok(Outcome::Idle)
    }

    /// Dispatch one message. `settings` is the current storage snapshot,
    /// used by full-reapply.
    pub fn handle(
        &mut self,
        host: &mut H,
        message: &Message,
        settings: &Settings,
        hostname: &str,
    ) -> Result<Outcome, TreeError> {
        tracing::debug!(reason = message.reason(), "handling message");
        match message {
            Message::UpdateAllText => self.run(host, settings, hostname),
            Message::InjectCustomFonts { custom_fonts } => {
                inject_custom_fonts(host, custom_fonts)?;
                self.fonts.register(custom_fonts);
                Ok(Outcome::FontsInjected {
                    count: custom_fonts.len(),
                })
            }
            Message::ToggleOff => {
                let cleared = self.toggle_off(host)?;
                Ok(Outcome::ToggledOff { cleared })
            }
        }
    }

    /// Style every Hebrew unit in `body`.
    pub fn full_pass(
        &self,
        host: &mut H,
        params: &StyleParameters,
    ) -> Result<PassReport, TreeError> {
        let body = host.body().ok_or(TreeError::MissingAnchor("body"))?;
        let report = apply_all(host, &body, params);
        tracing::debug!(
            wrapped = report.wrapped,
            restyled = report.restyled,
            skipped = report.skipped,
            failed = report.failed,
            "full pass complete"
        );
        Ok(report)
    }

    /// Disarm, then clear the style of every transformed unit. Markers stay.
    pub fn toggle_off(&mut self, host: &mut H) -> Result<usize, TreeError> {
        self.watcher.disarm();
        let body = host.body().ok_or(TreeError::MissingAnchor("body"))?;
        let cleared = clear_all(host, &body);
        tracing::debug!(cleared, "toggled off");
        Ok(cleared)
    }

    /// Font injection never blocks rewriting; failures are logged.
    fn register_fonts(&mut self, host: &mut H, fonts: &[crate::CustomFont]) {
        if let Err(e) = inject_custom_fonts(host, fonts) {
            tracing::warn!(error = %e, "failed to inject custom fonts");
        }
        self.fonts.register(fonts);
    }
}

/// True once the first full pass has run on this document.
pub fn is_document_marked<T: TextTree>(tree: &T) -> bool {
    tree.element_by_id(DOCUMENT_MARKER_ID).is_some()
}

/// Add the document marker unless it is already there.
pub fn mark_document<T: TextTree>(tree: &mut T) -> Result<(), TreeError> {
    if is_document_marked(tree) {
        return Ok(());
    }
    let head = tree.head().ok_or(TreeError::MissingAnchor("head"))?;
    let meta = tree.create_element("meta")?;
    tree.set_attribute(&meta, "id", DOCUMENT_MARKER_ID)?;
    tree.set_attribute(&meta, crate::TRANSFORM_MARKER, "true")?;
    tree.insert_before(&head, &meta, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::ORIGINAL_FONT;
    use crate::{ArenaTree, CustomFont, CustomSetting, NodeId, collect_target_text_units};

    type Controller = PageController<ArenaTree>;

    const HOST: &str = "news.example";

    fn settings(font: &str) -> Settings {
        Settings {
            text_size: 125,
            line_height: 145,
            font: font.to_string(),
            ..Settings::default()
        }
    }

    fn page(text: &str) -> (ArenaTree, NodeId) {
        let mut tree = ArenaTree::new();
        let body = tree.body_id();
        let p = tree.append_element(body, "p");
        tree.append_text_node(p, text);
        (tree, p)
    }

    fn pump(controller: &Controller, tree: &mut ArenaTree) -> PassReport {
        let mut report = PassReport::default();
        for (_, batch) in tree.take_batches() {
            report.merge(controller.watcher().on_batch(tree, batch));
        }
        report
    }

    #[test]
    fn test_first_pass_wraps_hebrew_run() {
        let (mut tree, p) = page("שלום world");
        let mut controller = Controller::new();

        let outcome = controller
            .run(&mut tree, &settings(ORIGINAL_FONT), HOST)
            .unwrap();
        assert!(matches!(outcome, Outcome::Applied { report, .. } if report.wrapped == 1));
        insta::assert_snapshot!(
            tree.inner_html(p),
            @r#"<span behirut="true" style="font-size:1.25em;line-height:1.45em;">שלום</span> world"#
        );
        assert!(controller.watcher().is_armed());
        assert!(is_document_marked(&tree));
    }

    #[test]
    fn test_font_change_restyles_in_place() {
        let (mut tree, p) = page("שלום world");
        let mut controller = Controller::new();
        controller
            .run(&mut tree, &settings(ORIGINAL_FONT), HOST)
            .unwrap();
        let wrapper = tree.children(&p)[0];

        let outcome = controller
            .handle(&mut tree, &Message::UpdateAllText, &settings("Arial"), HOST)
            .unwrap();
        assert!(matches!(outcome, Outcome::Applied { report, .. } if report.restyled == 1 && report.wrapped == 0));
        assert_eq!(tree.children(&p)[0], wrapper);
        insta::assert_snapshot!(
            tree.inner_html(p),
            @r#"<span behirut="true" style="font-size:1.25em;line-height:1.45em;font-family:&quot;Arial&quot;;">שלום</span> world"#
        );
    }

    #[test]
    fn test_insertion_while_armed_is_wrapped() {
        let (mut tree, _) = page("english only");
        let mut controller = Controller::new();
        controller
            .run(&mut tree, &settings(ORIGINAL_FONT), HOST)
            .unwrap();
        pump(&controller, &mut tree);

        let body = tree.body_id();
        let section = tree.create_element("section").unwrap();
        let h1 = tree.append_element(section, "h1");
        tree.append_text_node(h1, "תורה");
        tree.insert_before(&body, &section, None).unwrap();

        let report = pump(&controller, &mut tree);
        assert_eq!(report.wrapped, 1);
        pump(&controller, &mut tree);

        insta::assert_snapshot!(
            tree.inner_html(h1),
            @r#"<span behirut="true" style="font-size:1.25em;line-height:1.45em;">תורה</span>"#
        );
    }

    #[test]
    fn test_toggle_off_keeps_markers() {
        let (mut tree, p) = page("שלום world");
        let mut controller = Controller::new();
        controller
            .run(&mut tree, &settings(ORIGINAL_FONT), HOST)
            .unwrap();

        let outcome = controller
            .handle(&mut tree, &Message::ToggleOff, &settings(ORIGINAL_FONT), HOST)
            .unwrap();
        assert_eq!(outcome, Outcome::ToggledOff { cleared: 1 });
        assert!(!controller.watcher().is_armed());
        assert_eq!(tree.inner_html(p), r#"<span behirut="true">שלום</span> world"#);

        // Re-enable restyles rather than re-wrapping.
        let outcome = controller
            .run(&mut tree, &settings(ORIGINAL_FONT), HOST)
            .unwrap();
        assert!(matches!(outcome, Outcome::Applied { report, .. } if report.restyled == 1 && report.wrapped == 0));
        assert_eq!(tree.inner_html(p).matches("<span").count(), 1);
    }

    #[test]
    fn test_whitelisting_a_styled_site_clears_it() {
        let (mut tree, p) = page("שלום world");
        let mut controller = Controller::new();
        controller
            .run(&mut tree, &settings(ORIGINAL_FONT), HOST)
            .unwrap();

        let mut listed = settings(ORIGINAL_FONT);
        listed.whitelisted.push(HOST.to_string());
        let outcome = controller
            .handle(&mut tree, &Message::UpdateAllText, &listed, HOST)
            .unwrap();
        assert_eq!(outcome, Outcome::ToggledOff { cleared: 1 });
        assert!(!controller.watcher().is_armed());
        assert_eq!(tree.active_subscriptions(), 0);
        assert!(!tree.inner_html(p).contains("style="));
    }

    #[test]
    fn test_whitelisted_fresh_page_is_left_alone() {
        let (mut tree, p) = page("שלום");
        let mut controller = Controller::new();
        let mut listed = settings(ORIGINAL_FONT);
        listed.whitelisted.push(HOST.to_string());

        let outcome = controller.run(&mut tree, &listed, HOST).unwrap();
        assert_eq!(outcome, Outcome::Idle);
        assert_eq!(tree.inner_html(p), "שלום");
        assert!(!is_document_marked(&tree));
    }

    #[test]
    fn test_disabled_does_nothing() {
        let (mut tree, p) = page("שלום");
        let mut controller = Controller::new();
        let off = Settings {
            enabled: false,
            ..settings(ORIGINAL_FONT)
        };
        assert_eq!(controller.run(&mut tree, &off, HOST).unwrap(), Outcome::Idle);
        assert_eq!(tree.inner_html(p), "שלום");
        assert_eq!(tree.active_subscriptions(), 0);
    }

    #[test]
    fn test_per_site_override_and_rearm() {
        let (mut tree, p) = page("שלום");
        let mut controller = Controller::new();
        let mut custom = settings("Keter");
        custom.custom_settings.push(CustomSetting {
            url: HOST.to_string(),
            text_size: 200,
            line_height: 250,
            font: ORIGINAL_FONT.to_string(),
        });

        controller.run(&mut tree, &custom, HOST).unwrap();
        controller.run(&mut tree, &custom, HOST).unwrap();
        assert_eq!(tree.active_subscriptions(), 1);
        assert_eq!(
            controller.watcher().params(),
            Some(&StyleParameters::new(200, 250, ORIGINAL_FONT))
        );
        assert_eq!(
            tree.inner_html(p),
            r#"<span behirut="true" style="font-size:2em;line-height:2.5em;">שלום</span>"#
        );
    }

    #[test]
    fn test_document_marker_is_added_once() {
        let (mut tree, _) = page("שלום");
        let mut controller = Controller::new();
        controller
            .run(&mut tree, &settings(ORIGINAL_FONT), HOST)
            .unwrap();
        controller
            .run(&mut tree, &settings(ORIGINAL_FONT), HOST)
            .unwrap();
        let head = tree.head_id();
        assert_eq!(tree.inner_html(head).matches(DOCUMENT_MARKER_ID).count(), 1);
    }

    #[test]
    fn test_font_messages_register_fonts() {
        let (mut tree, _) = page("שלום");
        let mut controller = Controller::new();
        let message = Message::InjectCustomFonts {
            custom_fonts: vec![CustomFont::new("Taamey").with_url("https://f.example/t.woff2")],
        };

        let outcome = controller
            .handle(&mut tree, &message, &Settings::default(), HOST)
            .unwrap();
        assert_eq!(outcome, Outcome::FontsInjected { count: 1 });
        assert!(controller.fonts().contains("Taamey"));
        assert!(tree.inner_html(tree.head_id()).contains("font-family: 'Taamey'"));
    }

    #[test]
    fn test_editable_regions_survive_full_pass() {
        let mut tree = ArenaTree::new();
        let body = tree.body_id();
        let input = tree.append_element(body, "textarea");
        tree.append_text_node(input, "שלום");
        tree.append_comment(body, "שלום");
        let mut controller = Controller::new();

        let outcome = controller
            .run(&mut tree, &settings(ORIGINAL_FONT), HOST)
            .unwrap();
        assert!(matches!(outcome, Outcome::Applied { report, .. } if report.skipped == 1));
        assert_eq!(
            tree.inner_html(body),
            "<textarea>שלום</textarea><!--שלום-->"
        );
        assert_eq!(collect_target_text_units(&tree, &body).len(), 1);
    }
}
