use jiff::{Timestamp, ToSpan};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Load, PreferenceStore, StoreError};

/// How long a pending request may sit unanswered before
/// [`RelayStore::check_timeout`] resolves it to an empty list.
pub const REPLY_TIMEOUT_SECS: i64 = 10;

/// The embedded hidden frame the widget relays preferences through.
///
/// `post` delivers one outbound message to the remote side.  Tearing down
/// whatever resource backs the frame belongs in the implementor's `Drop`.
pub trait Frame {
    fn post(&mut self, message: &Value) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    FrameInjected,
    AwaitingReply,
    Populated,
}

/// Preference backend that delegates persistence to a remote frame over a
/// two-message protocol: outbound `"GET_TIMEZONES"` (bare string) and
/// `{"type":"SET_TIMEZONES","zones"}`, inbound
/// `{"type":"RETURN_TIMEZONES","zones"}`.
///
/// The protocol carries no correlation id, so one store must own one frame;
/// fanning a single frame's messages into several stores is undefined.
/// Inbound messages are not origin-checked, matching the wire contract.
pub struct RelayStore<F: Frame> {
    frame: Option<F>,
    state: RelayState,
    reply_deadline: Option<Timestamp>,
    zones: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Inbound {
    #[serde(rename = "RETURN_TIMEZONES")]
    ReturnTimezones { zones: Vec<String> },
}

impl<F: Frame> RelayStore<F> {
    pub fn new(frame: F) -> RelayStore<F> {
        RelayStore {
            frame: Some(frame),
            state: RelayState::Idle,
            reply_deadline: None,
            zones: None,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Zones received so far, if any reply (or timeout) has resolved.
    pub fn zones(&self) -> Option<&[String]> {
        self.zones.as_deref()
    }

    /// The host signals that the injected frame finished loading.  Posts the
    /// outbound request and starts the reply clock.
    pub fn frame_loaded(&mut self, now: Timestamp) -> Result<(), StoreError> {
        let frame = self
            .frame
            .as_mut()
            .ok_or_else(|| StoreError::Frame("frame not connected".to_string()))?;
        frame.post(&json!("GET_TIMEZONES"))?;
        self.state = RelayState::AwaitingReply;
        // infallible: saturating_add only errors for span units above hours
        self.reply_deadline = Some(now.saturating_add(REPLY_TIMEOUT_SECS.seconds()).unwrap());
        Ok(())
    }

    /// Feed one inbound frame message.  Returns the delivered list when the
    /// message is a `RETURN_TIMEZONES` reply; every other shape is ignored.
    pub fn on_message(&mut self, message: &Value) -> Option<Vec<String>> {
        if self.frame.is_none() {
            return None;
        }
        match serde_json::from_value::<Inbound>(message.clone()) {
            Ok(Inbound::ReturnTimezones { zones }) => {
                info!("received {} zones from remote frame", zones.len());
                self.state = RelayState::Populated;
                self.reply_deadline = None;
                self.zones = Some(zones.clone());
                Some(zones)
            }
            Err(_) => None,
        }
    }

    /// Resolve a stalled wait: once the reply deadline passes with no answer,
    /// settle on an empty list instead of hanging forever.  Returns true when
    /// the wait was resolved.
    pub fn check_timeout(&mut self, now: Timestamp) -> bool {
        match (self.state, self.reply_deadline) {
            (RelayState::AwaitingReply, Some(deadline)) if now >= deadline => {
                warn!("remote frame never replied, settling on an empty zone list");
                self.state = RelayState::Populated;
                self.reply_deadline = None;
                self.zones = Some(Vec::new());
                true
            }
            _ => false,
        }
    }

    /// Tear the frame down.  Runs on every deactivation path; after this the
    /// store ignores inbound messages and rejects saves.
    pub fn disconnect(&mut self) {
        self.frame = None;
        self.state = RelayState::Idle;
        self.reply_deadline = None;
    }
}

impl<F: Frame> PreferenceStore for RelayStore<F> {
    fn load(&mut self) -> Result<Load, StoreError> {
        match self.state {
            RelayState::Idle => {
                if self.frame.is_none() {
                    return Err(StoreError::Frame("frame not connected".to_string()));
                }
                self.state = RelayState::FrameInjected;
                Ok(Load::Pending)
            }
            RelayState::FrameInjected | RelayState::AwaitingReply => Ok(Load::Pending),
            RelayState::Populated => Ok(Load::Ready(
                self.zones.clone().unwrap_or_default(),
            )),
        }
    }

    /// The remote frame owns persistence; nothing is written locally.
    /// Fire-and-forget, no acknowledgement or retry.
    fn save(&mut self, zones: &[String]) -> Result<(), StoreError> {
        let frame = self
            .frame
            .as_mut()
            .ok_or_else(|| StoreError::Frame("frame not connected".to_string()))?;
        frame.post(&json!({"type": "SET_TIMEZONES", "zones": zones}))?;
        self.zones = Some(zones.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use jiff::{Timestamp, ToSpan};
    use serde_json::{json, Value};

    use crate::store::relay::{Frame, RelayState, RelayStore};
    use crate::store::{Load, PreferenceStore, StoreError};

    struct TestFrame {
        posted: Rc<RefCell<Vec<Value>>>,
    }

    impl Frame for TestFrame {
        fn post(&mut self, message: &Value) -> Result<(), StoreError> {
            self.posted.borrow_mut().push(message.clone());
            Ok(())
        }
    }

    fn test_store() -> (RelayStore<TestFrame>, Rc<RefCell<Vec<Value>>>) {
        let posted = Rc::new(RefCell::new(Vec::new()));
        let frame = TestFrame {
            posted: posted.clone(),
        };
        (RelayStore::new(frame), posted)
    }

    fn t0() -> Timestamp {
        "2024-03-10T12:00:00Z".parse::<Timestamp>().unwrap()
    }

    #[test]
    fn test_lifecycle() {
        let (mut store, posted) = test_store();
        assert_eq!(store.state(), RelayState::Idle);

        assert_eq!(store.load().unwrap(), Load::Pending);
        assert_eq!(store.state(), RelayState::FrameInjected);

        store.frame_loaded(t0()).unwrap();
        assert_eq!(store.state(), RelayState::AwaitingReply);
        assert_eq!(*posted.borrow(), vec![json!("GET_TIMEZONES")]);

        let delivered = store.on_message(&json!({
            "type": "RETURN_TIMEZONES",
            "zones": ["Europe/London", "Asia/Tokyo"]
        }));
        assert_eq!(
            delivered,
            Some(vec!["Europe/London".to_string(), "Asia/Tokyo".to_string()])
        );
        assert_eq!(store.state(), RelayState::Populated);
        assert_eq!(
            store.load().unwrap(),
            Load::Ready(vec!["Europe/London".to_string(), "Asia/Tokyo".to_string()])
        );
    }

    #[test]
    fn test_unrelated_messages_ignored() {
        let (mut store, _posted) = test_store();
        store.load().unwrap();
        store.frame_loaded(t0()).unwrap();

        assert_eq!(store.on_message(&json!("PING")), None);
        assert_eq!(
            store.on_message(&json!({"type": "SET_TIMEZONES", "zones": []})),
            None
        );
        assert_eq!(store.on_message(&json!({"zones": ["UTC"]})), None);
        assert_eq!(store.state(), RelayState::AwaitingReply);
        assert_eq!(store.zones(), None);
    }

    #[test]
    fn test_save_posts_set_message() {
        let (mut store, posted) = test_store();
        store
            .save(&["Europe/Paris".to_string(), "UTC".to_string()])
            .unwrap();
        assert_eq!(
            *posted.borrow(),
            vec![json!({"type": "SET_TIMEZONES", "zones": ["Europe/Paris", "UTC"]})]
        );
    }

    #[test]
    fn test_timeout_settles_on_empty_list() {
        let (mut store, _posted) = test_store();
        store.load().unwrap();
        store.frame_loaded(t0()).unwrap();

        assert!(!store.check_timeout(t0().saturating_add(5.seconds()).unwrap()));
        assert_eq!(store.state(), RelayState::AwaitingReply);

        assert!(store.check_timeout(t0().saturating_add(10.seconds()).unwrap()));
        assert_eq!(store.state(), RelayState::Populated);
        assert_eq!(store.load().unwrap(), Load::Ready(vec![]));
    }

    #[test]
    fn test_disconnect_tears_down() {
        let (mut store, posted) = test_store();
        store.load().unwrap();
        store.frame_loaded(t0()).unwrap();
        store.disconnect();

        assert_eq!(store.state(), RelayState::Idle);
        assert_eq!(
            store.on_message(&json!({"type": "RETURN_TIMEZONES", "zones": ["UTC"]})),
            None
        );
        assert!(store.save(&["UTC".to_string()]).is_err());
        // nothing posted after teardown
        assert_eq!(posted.borrow().len(), 1);
    }
}
