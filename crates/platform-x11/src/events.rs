//! Window-list change watching.
//!
//! X delivers window lifecycle and property events; the watcher selects
//! them on the root window and all current children, then polls the event
//! queue on a fixed interval. All events drained in one poll cycle collapse
//! into at most one [`WindowListChanged`] notification, so consumers
//! refresh once per burst instead of once per event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pipewrench_common::error::{PipewrenchError, PipewrenchResult};
use tokio::sync::mpsc;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    AtomEnum, ChangeWindowAttributesAux, ConnectionExt as _, EventMask,
};
use x11rb::protocol::Event;

use crate::session::{Atoms, DisplaySession};

/// Coalesced notification: the set of capturable windows changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowListChanged;

/// Watches for events that invalidate the window list.
pub struct WindowWatcher {
    session: Arc<DisplaySession>,
    poll_interval: Duration,
    stop_flag: Arc<AtomicBool>,
}

impl WindowWatcher {
    pub fn new(session: Arc<DisplaySession>, poll_interval: Duration) -> Self {
        Self {
            session,
            poll_interval,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Select change events on the root window and every current child.
    ///
    /// Root registration failing is an error (the caller should fall back
    /// to periodic refresh); individual children are best-effort since
    /// they can vanish between the tree query and the request.
    pub fn register(&self) -> PipewrenchResult<usize> {
        let conn = self.session.conn();
        let root = self.session.root();

        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::SUBSTRUCTURE_NOTIFY | EventMask::PROPERTY_CHANGE),
        )
        .map_err(|e| PipewrenchError::display(format!("Root event selection failed: {e}")))?
        .check()
        .map_err(|e| PipewrenchError::display(format!("Root event selection rejected: {e}")))?;

        let tree = conn
            .query_tree(root)
            .map_err(|e| PipewrenchError::display(format!("Window tree request failed: {e}")))?
            .reply()
            .map_err(|e| PipewrenchError::display(format!("Window tree query failed: {e}")))?;

        let mut registered = 0usize;
        for child in tree.children {
            let selected = conn.change_window_attributes(
                child,
                &ChangeWindowAttributesAux::new()
                    .event_mask(EventMask::STRUCTURE_NOTIFY | EventMask::PROPERTY_CHANGE),
            );
            if selected.is_ok() {
                registered += 1;
            }
        }
        conn.flush()
            .map_err(|e| PipewrenchError::display(format!("Event selection flush failed: {e}")))?;

        tracing::debug!(children = registered, "Registered for window events");
        Ok(registered)
    }

    /// Run the poll loop until the stop flag is set, sending one
    /// notification per cycle that observed relevant events.
    ///
    /// Returns the number of notifications delivered.
    pub async fn run(
        &self,
        changes: mpsc::UnboundedSender<WindowListChanged>,
    ) -> PipewrenchResult<u64> {
        tracing::info!(
            poll_ms = self.poll_interval.as_millis() as u64,
            "Window watcher started"
        );

        let mut notifications = 0u64;
        while !self.stop_flag.load(Ordering::Relaxed) {
            if self.drain_pending()? {
                notifications += 1;
                if changes.send(WindowListChanged).is_err() {
                    // Receiver dropped; nobody is listening anymore.
                    break;
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        tracing::info!(notifications, "Window watcher stopped");
        Ok(notifications)
    }

    /// Set the stop flag.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Get the stop flag for external coordination.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Drain every pending event; report whether any of them affects the
    /// window list.
    fn drain_pending(&self) -> PipewrenchResult<bool> {
        let conn = self.session.conn();
        let mut changed = false;
        while let Some(event) = conn
            .poll_for_event()
            .map_err(|e| PipewrenchError::display(format!("Event queue read failed: {e}")))?
        {
            if affects_window_list(self.session.atoms(), &event) {
                changed = true;
            }
        }
        Ok(changed)
    }
}

/// Whether an event means the window list (membership or titles) changed.
fn affects_window_list(atoms: &Atoms, event: &Event) -> bool {
    match event {
        Event::CreateNotify(_)
        | Event::DestroyNotify(_)
        | Event::MapNotify(_)
        | Event::UnmapNotify(_) => true,
        Event::PropertyNotify(e) => {
            e.atom == atoms._NET_WM_NAME || e.atom == u32::from(AtomEnum::WM_NAME)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::xproto::{
        CreateNotifyEvent, ExposeEvent, Property, PropertyNotifyEvent, UnmapNotifyEvent,
    };

    fn test_atoms() -> Atoms {
        Atoms {
            _NET_WM_NAME: 300,
            _NET_CLIENT_LIST: 301,
            UTF8_STRING: 302,
        }
    }

    fn property_event(atom: u32) -> Event {
        Event::PropertyNotify(PropertyNotifyEvent {
            response_type: 28,
            sequence: 0,
            window: 42,
            atom,
            time: 0,
            state: Property::NEW_VALUE,
        })
    }

    fn create_event() -> Event {
        Event::CreateNotify(CreateNotifyEvent {
            response_type: 16,
            sequence: 0,
            parent: 1,
            window: 42,
            x: 0,
            y: 0,
            width: 100,
            height: 100,
            border_width: 0,
            override_redirect: false,
        })
    }

    fn expose_event() -> Event {
        Event::Expose(ExposeEvent {
            response_type: 12,
            sequence: 0,
            window: 42,
            x: 0,
            y: 0,
            width: 100,
            height: 100,
            count: 0,
        })
    }

    #[test]
    fn lifecycle_events_affect_the_list() {
        let atoms = test_atoms();
        assert!(affects_window_list(&atoms, &create_event()));
        assert!(affects_window_list(
            &atoms,
            &Event::UnmapNotify(UnmapNotifyEvent {
                response_type: 18,
                sequence: 0,
                event: 1,
                window: 42,
                from_configure: false,
            })
        ));
    }

    #[test]
    fn only_title_property_changes_count() {
        let atoms = test_atoms();
        assert!(affects_window_list(&atoms, &property_event(atoms._NET_WM_NAME)));
        assert!(affects_window_list(
            &atoms,
            &property_event(u32::from(AtomEnum::WM_NAME))
        ));
        // Unrelated property, e.g. _NET_WM_USER_TIME.
        assert!(!affects_window_list(&atoms, &property_event(999)));
    }

    #[test]
    fn a_burst_of_events_coalesces_to_one_cycle_outcome() {
        let atoms = test_atoms();
        let burst = vec![
            expose_event(),
            create_event(),
            property_event(atoms._NET_WM_NAME),
            create_event(),
        ];

        // The drain reduces a whole cycle's events to a single flag.
        let changed = burst.iter().any(|e| affects_window_list(&atoms, e));
        assert!(changed);

        let quiet = vec![expose_event(), property_event(999)];
        assert!(!quiet.iter().any(|e| affects_window_list(&atoms, e)));
    }
}
