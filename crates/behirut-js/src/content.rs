//! Content-script lifecycle: startup pass, then message dispatch.

use std::cell::RefCell;
use std::rc::Rc;

use behirut_browser::{BrowserDom, Message, Outcome, PageController, Settings, current_hostname};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::error::ContentError;
use crate::extension::{decode_message, on_message, read_settings};

/// Everything the content script keeps for one page.
struct Page {
    dom: BrowserDom,
    controller: PageController<BrowserDom>,
    hostname: String,
    /// Last snapshot read from storage.
    settings: Settings,
}

impl Page {
    fn new(dom: BrowserDom, hostname: String) -> Self {
        Self {
            dom,
            controller: PageController::new(),
            hostname,
            settings: Settings::default(),
        }
    }

    /// Full pass with a fresh snapshot. Without one the page is left exactly
    /// as it is: no pass, no re-arm.
    fn run(&mut self, settings: Option<Settings>) -> Result<Outcome, ContentError> {
        let Some(settings) = settings else {
            tracing::warn!("storage unreadable, leaving the page untouched");
            return Ok(Outcome::Idle);
        };
        self.settings = settings;
        let outcome = self
            .controller
            .run(&mut self.dom, &self.settings, &self.hostname)?;
        log_outcome(&outcome);
        Ok(outcome)
    }

    fn handle(&mut self, message: &Message) {
        match self
            .controller
            .handle(&mut self.dom, message, &self.settings, &self.hostname)
        {
            Ok(outcome) => log_outcome(&outcome),
            Err(e) => {
                tracing::error!(reason = message.reason(), error = %e, "message handling failed")
            }
        }
    }
}

fn log_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Applied { params, report } => tracing::info!(
            font = %params.font_name,
            size = params.text_size_percent,
            wrapped = report.wrapped,
            restyled = report.restyled,
            "hebrew text restyled"
        ),
        Outcome::ToggledOff { cleared } => tracing::info!(cleared, "styles removed"),
        Outcome::FontsInjected { count } => tracing::debug!(count, "custom fonts injected"),
        Outcome::Idle => tracing::debug!("nothing to do on this page"),
    }
}

/// Read storage. `None` when it cannot be read at all.
async fn load_settings() -> Option<Settings> {
    match read_settings().await {
        Ok(settings) => {
            if let Err(problems) = settings.validate() {
                for problem in problems {
                    tracing::warn!(%problem, "questionable stored setting");
                }
            }
            Some(settings)
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not read settings");
            None
        }
    }
}

fn dispatch(page: &Rc<RefCell<Page>>, value: JsValue) {
    let message = match decode_message(value) {
        Ok(message) => message,
        Err(e) => {
            // Other parts of the extension share the channel.
            tracing::trace!(error = %e, "ignoring message");
            return;
        }
    };

    match message {
        // Full reapply works from a fresh storage snapshot.
        Message::UpdateAllText => {
            let page = Rc::clone(page);
            spawn_local(async move {
                let settings = load_settings().await;
                if let Err(e) = page.borrow_mut().run(settings) {
                    tracing::error!(error = %e, "full reapply failed");
                }
            });
        }
        other => page.borrow_mut().handle(&other),
    }
}

/// Content-script entry point.
///
/// Runs the startup pass for the current page, then listens for runtime
/// messages for the rest of the page's life.
#[wasm_bindgen]
pub async fn start() -> Result<(), JsError> {
    let dom = BrowserDom::current().ok_or(ContentError::NoDocument)?;
    let hostname = current_hostname().unwrap_or_default();
    tracing::debug!(%hostname, "content script starting");

    let page = Rc::new(RefCell::new(Page::new(dom, hostname)));
    let settings = load_settings().await;
    page.borrow_mut().run(settings)?;

    let listener = Rc::clone(&page);
    on_message(move |value| dispatch(&listener, value))?;
    Ok(())
}
