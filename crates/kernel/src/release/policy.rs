use std::collections::HashMap;

use parking_lot::Mutex;

use crate::config::ReleasePolicyKind;
use crate::model::{Instance, InstanceKey};
use crate::release::Burden;

/// Decides which burdens the kernel keeps until they are released
pub trait ReleasePolicy: Send + Sync {
    /// Take ownership of a root burden
    fn track(&self, burden: Burden);

    fn has_track(&self, instance: &Instance) -> bool;

    /// Release the burden tracked for `instance`; returns `false` if none was tracked
    fn release(&self, instance: &Instance) -> bool;

    fn tracked_count(&self) -> usize;

    /// Release everything still tracked, newest first
    fn dispose(&self);
}

#[derive(Default)]
struct TrackedBurdens {
    next: u64,
    by_instance: HashMap<InstanceKey, (u64, Burden)>,
}

/// Tracks every burden that requires release until it is released or the
/// policy is disposed
#[derive(Default)]
pub struct LifecycledReleasePolicy {
    tracked: Mutex<TrackedBurdens>,
}

impl LifecycledReleasePolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReleasePolicy for LifecycledReleasePolicy {
    fn track(&self, burden: Burden) {
        if !burden.requires_policy_release() {
            return;
        }
        let Some(key) = burden.instance().map(InstanceKey::of) else {
            return;
        };

        let mut tracked = self.tracked.lock();
        if tracked.by_instance.contains_key(&key) {
            return;
        }
        let seq = tracked.next;
        tracked.next += 1;
        tracked.by_instance.insert(key, (seq, burden));
    }

    fn has_track(&self, instance: &Instance) -> bool {
        self.tracked
            .lock()
            .by_instance
            .contains_key(&InstanceKey::of(instance))
    }

    fn release(&self, instance: &Instance) -> bool {
        let removed = self
            .tracked
            .lock()
            .by_instance
            .remove(&InstanceKey::of(instance));

        match removed {
            Some((_, burden)) => {
                burden.release();
                true
            }
            None => false,
        }
    }

    fn tracked_count(&self) -> usize {
        self.tracked.lock().by_instance.len()
    }

    fn dispose(&self) {
        let mut burdens: Vec<(u64, Burden)> =
            self.tracked.lock().by_instance.drain().map(|(_, b)| b).collect();
        burdens.sort_by(|a, b| b.0.cmp(&a.0));

        tracing::debug!("Releasing {} tracked burden(s)", burdens.len());
        for (_, burden) in burdens {
            burden.release();
        }
    }
}

impl std::fmt::Debug for LifecycledReleasePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycledReleasePolicy")
            .field("tracked", &self.tracked_count())
            .finish()
    }
}

/// Tracks nothing; whoever resolves an instance owns it
#[derive(Debug, Default)]
pub struct NoTrackingReleasePolicy;

impl ReleasePolicy for NoTrackingReleasePolicy {
    fn track(&self, _burden: Burden) {}

    fn has_track(&self, _instance: &Instance) -> bool {
        false
    }

    fn release(&self, _instance: &Instance) -> bool {
        false
    }

    fn tracked_count(&self) -> usize {
        0
    }

    fn dispose(&self) {}
}

/// Build the policy selected in configuration
pub fn create_policy(kind: ReleasePolicyKind) -> Box<dyn ReleasePolicy> {
    match kind {
        ReleasePolicyKind::Lifecycled => Box::new(LifecycledReleasePolicy::new()),
        ReleasePolicyKind::NoTracking => Box::new(NoTrackingReleasePolicy),
    }
}
