//! Mutation watching.
//!
//! A [`MutationWatcher`] holds at most one live [`Subscription`] to the
//! host's change stream, plus the parameters captured when it was armed.
//! Hosts deliver batches of [`Mutation`] records; [`process_batch`] is the
//! host-independent body of the callback.
//!
//! The transformer's own edits show up as mutations too. They are not
//! filtered: reprocessing a freshly wrapped run takes the restyle path and
//! changes nothing.

use crate::error::TreeError;
use crate::script::collect_target_text_units;
use crate::style::StyleParameters;
use crate::transform::{PassReport, apply_style};
use crate::tree::TextTree;

/// One normalized change record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation<N> {
    /// A node (and its subtree) was inserted.
    Inserted(N),
    /// A text node's character data changed. `old_value` is what it held
    /// before.
    TextChanged { target: N, old_value: Option<String> },
}

/// A live registration with a host's change stream.
pub trait Subscription {
    /// Stop delivery. Idempotent.
    fn cancel(&mut self);

    fn is_active(&self) -> bool;
}

/// A tree that can also report its own mutations.
pub trait WatchHost: TextTree {
    type Subscription: Subscription;

    /// Start delivering batches for the whole body subtree: child insertions
    /// and character-data changes with their old values. Hosts that invoke
    /// a callback themselves (the browser) run [`process_batch`] with
    /// `params`.
    fn observe(&mut self, params: &StyleParameters) -> Result<Self::Subscription, TreeError>;
}

/// Watcher lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatcherState {
    Unarmed,
    Armed,
}

#[derive(Debug)]
struct Armed<S> {
    params: StyleParameters,
    subscription: S,
}

/// Owner of the single active subscription.
#[derive(Debug)]
pub struct MutationWatcher<S: Subscription> {
    armed: Option<Armed<S>>,
}

impl<S: Subscription> Default for MutationWatcher<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Subscription> MutationWatcher<S> {
    pub fn new() -> Self {
        Self { armed: None }
    }

    pub fn state(&self) -> WatcherState {
        if self.armed.is_some() {
            WatcherState::Armed
        } else {
            WatcherState::Unarmed
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Parameters captured by the current subscription.
    pub fn params(&self) -> Option<&StyleParameters> {
        self.armed.as_ref().map(|a| &a.params)
    }

    pub fn subscription(&self) -> Option<&S> {
        self.armed.as_ref().map(|a| &a.subscription)
    }

    /// Tear down any existing subscription, then subscribe with `params`.
    ///
    /// If subscribing fails the watcher is left unarmed.
    pub fn arm<H>(&mut self, host: &mut H, params: StyleParameters) -> Result<(), TreeError>
    where
        H: WatchHost<Subscription = S>,
    {
        self.disarm();
        let subscription = host.observe(&params)?;
        tracing::debug!(?params, "mutation watcher armed");
        self.armed = Some(Armed {
            params,
            subscription,
        });
        Ok(())
    }

    /// Cancel the subscription and forget the parameters. Returns whether
    /// anything was armed.
    pub fn disarm(&mut self) -> bool {
        match self.armed.take() {
            Some(mut armed) => {
                armed.subscription.cancel();
                tracing::debug!("mutation watcher disarmed");
                true
            }
            None => false,
        }
    }

    /// Run one delivered batch with the captured parameters. Does nothing
    /// while unarmed.
    pub fn on_batch<T, I>(&self, tree: &mut T, batch: I) -> PassReport
    where
        T: TextTree,
        I: IntoIterator<Item = Mutation<T::Node>>,
    {
        match &self.armed {
            Some(armed) => process_batch(tree, &armed.params, batch),
            None => PassReport::default(),
        }
    }
}

impl<S: Subscription> Drop for MutationWatcher<S> {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Style everything a batch touched, in delivery order.
///
/// Inserted subtrees are scanned for Hebrew units. A text change that really
/// changed the value rescans the changed node's whole parent. Failures are
/// logged and counted per unit; the batch always runs to the end.
pub fn process_batch<T, I>(tree: &mut T, params: &StyleParameters, batch: I) -> PassReport
where
    T: TextTree,
    I: IntoIterator<Item = Mutation<T::Node>>,
{
    let mut report = PassReport::default();
    let mut records = 0usize;

    for record in batch {
        records += 1;
        let root = match record {
            Mutation::Inserted(node) => node,
            Mutation::TextChanged { target, old_value } => {
                if tree.text(&target) == old_value {
                    continue;
                }
                match tree.parent(&target) {
                    Some(parent) => parent,
                    None => continue,
                }
            }
        };

        for unit in collect_target_text_units(tree, &root) {
            let result = apply_style(tree, &unit, params);
            if let Err(e) = &result {
                tracing::warn!(unit = ?unit, error = %e, "failed to style mutated unit");
            }
            report.record(&result);
        }
    }

    if report.total() > 0 {
        tracing::debug!(
            records,
            wrapped = report.wrapped,
            restyled = report.restyled,
            failed = report.failed,
            "processed mutation batch"
        );
    }
    report
}
