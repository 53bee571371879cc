//! `MutationObserver` subscriptions.
//!
//! The observer callback owns a clone of the [`BrowserDom`] and the parameters
//! captured at arm time, and runs [`process_batch`] directly. The page keeps
//! running between batches, so there is nothing to pump.

use behirut_core::{Mutation, StyleParameters, Subscription, TreeError, WatchHost, process_batch};
use js_sys::Array;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{MutationObserver, MutationObserverInit, MutationRecord, Node};

use crate::dom::{BrowserDom, host_error};

type ObserverCallback = Closure<dyn FnMut(Array, MutationObserver)>;

/// A connected `MutationObserver` and the closure it calls.
///
/// The closure must outlive the observer's connection, so both live here.
/// Dropping the subscription disconnects.
pub struct DomSubscription {
    observer: MutationObserver,
    _callback: ObserverCallback,
    active: bool,
}

impl std::fmt::Debug for DomSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomSubscription")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl Subscription for DomSubscription {
    fn cancel(&mut self) {
        if self.active {
            self.observer.disconnect();
            self.active = false;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for DomSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Normalize raw records, in delivery order.
///
/// Each record contributes its added nodes first, then a text change if it is
/// a `characterData` record. Attribute records are not observed.
pub fn records_to_mutations(records: &Array) -> Vec<Mutation<Node>> {
    let mut out = Vec::new();
    for value in records.iter() {
        let Ok(record) = value.dyn_into::<MutationRecord>() else {
            continue;
        };

        let added = record.added_nodes();
        for i in 0..added.length() {
            if let Some(node) = added.item(i) {
                out.push(Mutation::Inserted(node));
            }
        }

        if record.type_() == "characterData" {
            if let Some(target) = record.target() {
                out.push(Mutation::TextChanged {
                    target,
                    old_value: record.old_value(),
                });
            }
        }
    }
    out
}

impl WatchHost for BrowserDom {
    type Subscription = DomSubscription;

    fn observe(&mut self, params: &StyleParameters) -> Result<DomSubscription, TreeError> {
        let body = self
            .document()
            .body()
            .ok_or(TreeError::MissingAnchor("body"))?;

        let mut dom = self.clone();
        let params = params.clone();
        let callback: ObserverCallback = Closure::wrap(Box::new(
            move |records: Array, _observer: MutationObserver| {
                let batch = records_to_mutations(&records);
                tracing::trace!(records = batch.len(), "mutation batch delivered");
                process_batch(&mut dom, &params, batch);
            },
        ) as Box<dyn FnMut(Array, MutationObserver)>);

        let observer =
            MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(host_error)?;

        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        init.set_character_data(true);
        init.set_character_data_old_value(true);
        observer
            .observe_with_options(&body, &init)
            .map_err(host_error)?;

        Ok(DomSubscription {
            observer,
            _callback: callback,
            active: true,
        })
    }
}
