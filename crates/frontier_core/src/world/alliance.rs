//! Alliances and pending alliance requests.
//!
//! Alliances are symmetric and stored under the ordered pair `(low, high)`.
//! Requests are directed and keyed `(requestor, recipient)`.

use std::collections::BTreeMap;

use frontier_shared::{AllianceRecord, AllianceRequestRecord, PlayerId};

/// Pair key with the lower id first.
fn pair(a: &PlayerId, b: &PlayerId) -> (PlayerId, PlayerId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// All alliance state of one game.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllianceRegistry {
    alliances: BTreeMap<(PlayerId, PlayerId), u64>,
    requests: BTreeMap<(PlayerId, PlayerId), u64>,
}

impl AllianceRegistry {
    /// Whether two players are allied.
    #[must_use]
    pub fn is_allied(&self, a: &PlayerId, b: &PlayerId) -> bool {
        self.alliances.contains_key(&pair(a, b))
    }

    /// Whether `requestor` has a pending request to `recipient`.
    #[must_use]
    pub fn has_request(&self, requestor: &PlayerId, recipient: &PlayerId) -> bool {
        self.requests
            .contains_key(&(requestor.clone(), recipient.clone()))
    }

    /// Allies of a player, ascending.
    #[must_use]
    pub fn allies_of(&self, player: &PlayerId) -> Vec<PlayerId> {
        self.alliances
            .keys()
            .filter_map(|(a, b)| {
                if a == player {
                    Some(b.clone())
                } else if b == player {
                    Some(a.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    /// Files a request. Returns `false` if one is already pending either way
    /// or the players are already allied.
    pub(crate) fn request(&mut self, requestor: &PlayerId, recipient: &PlayerId, tick: u64) -> bool {
        if self.is_allied(requestor, recipient)
            || self.has_request(requestor, recipient)
            || self.has_request(recipient, requestor)
        {
            return false;
        }
        self.requests
            .insert((requestor.clone(), recipient.clone()), tick);
        true
    }

    /// Removes a pending request, returning the tick it was made.
    pub(crate) fn take_request(&mut self, requestor: &PlayerId, recipient: &PlayerId) -> Option<u64> {
        self.requests
            .remove(&(requestor.clone(), recipient.clone()))
    }

    pub(crate) fn form(&mut self, a: &PlayerId, b: &PlayerId, tick: u64) {
        self.alliances.entry(pair(a, b)).or_insert(tick);
    }

    pub(crate) fn dissolve(&mut self, a: &PlayerId, b: &PlayerId) -> bool {
        self.alliances.remove(&pair(a, b)).is_some()
    }

    /// Removes requests made `ttl` or more ticks before `now`, in key order.
    pub(crate) fn expire(&mut self, now: u64, ttl: u64) -> Vec<(PlayerId, PlayerId)> {
        let expired: Vec<_> = self
            .requests
            .iter()
            .filter(|(_, &created)| now.saturating_sub(created) >= ttl)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.requests.remove(key);
        }
        expired
    }

    /// Snapshot records, sorted.
    #[must_use]
    pub fn alliance_records(&self) -> Vec<AllianceRecord> {
        self.alliances
            .iter()
            .map(|((a, b), &formed_tick)| AllianceRecord {
                a: a.clone(),
                b: b.clone(),
                formed_tick,
            })
            .collect()
    }

    /// Snapshot records, sorted.
    #[must_use]
    pub fn request_records(&self) -> Vec<AllianceRequestRecord> {
        self.requests
            .iter()
            .map(|((requestor, recipient), &created_tick)| AllianceRequestRecord {
                requestor: requestor.clone(),
                recipient: recipient.clone(),
                created_tick,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alliance_is_symmetric() {
        let mut reg = AllianceRegistry::default();
        reg.form(&"P2".into(), &"P1".into(), 3);
        assert!(reg.is_allied(&"P1".into(), &"P2".into()));
        assert_eq!(reg.allies_of(&"P2".into()), vec![PlayerId::from("P1")]);
        assert_eq!(reg.alliance_records()[0].a, PlayerId::from("P1"));
    }

    #[test]
    fn test_duplicate_and_crossed_requests_rejected() {
        let mut reg = AllianceRegistry::default();
        assert!(reg.request(&"P1".into(), &"P2".into(), 0));
        assert!(!reg.request(&"P1".into(), &"P2".into(), 1));
        assert!(!reg.request(&"P2".into(), &"P1".into(), 1));
    }

    #[test]
    fn test_expiry() {
        let mut reg = AllianceRegistry::default();
        reg.request(&"P1".into(), &"P2".into(), 0);
        reg.request(&"P3".into(), &"P2".into(), 5);
        let expired = reg.expire(10, 10);
        assert_eq!(expired, vec![(PlayerId::from("P1"), PlayerId::from("P2"))]);
        assert!(reg.has_request(&"P3".into(), &"P2".into()));
    }
}
