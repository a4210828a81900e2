use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::session::{CameraIndexPolicy, DeviceType, Session};

/// Client devices that registered with the dashboard, keyed by device id.
///
/// Eviction is lazy: callers invoke [`SessionRegistry::sweep`] from the
/// status and listing paths, there is no timer task.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
    policy: CameraIndexPolicy,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new(policy: CameraIndexPolicy, idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            policy,
            idle_timeout,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a device, generating an id when none is supplied. An
    /// existing id is refreshed and re-typed rather than duplicated.
    pub fn register(&self, device_type: DeviceType, user_agent: &str, device_id: Option<&str>) -> Session {
        let now = Utc::now();
        let device_id = device_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let preferred_camera_index = self.policy.index_for(device_type);

        let mut sessions = self.sessions();
        let session = sessions
            .entry(device_id.clone())
            .and_modify(|s| {
                s.device_type = device_type;
                s.user_agent = user_agent.to_string();
                s.preferred_camera_index = preferred_camera_index;
                s.last_activity_at = now;
            })
            .or_insert_with(|| Session {
                device_id: device_id.clone(),
                device_type,
                user_agent: user_agent.to_string(),
                preferred_camera_index,
                created_at: now,
                last_activity_at: now,
            })
            .clone();

        info!(
            "Device {} registered as {:?} (camera index {})",
            session.device_id, session.device_type, session.preferred_camera_index
        );
        session
    }

    /// Finds a session and marks it active.
    pub fn lookup(&self, device_id: &str) -> Option<Session> {
        let mut sessions = self.sessions();
        let session = sessions.get_mut(device_id)?;
        session.last_activity_at = Utc::now();
        Some(session.clone())
    }

    /// Drops sessions idle longer than the configured timeout.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let timeout = self.idle_timeout;
        let mut sessions = self.sessions();
        let before = sessions.len();
        // A negative idle time (clock skew) counts as active.
        sessions.retain(|_, s| {
            now.signed_duration_since(s.last_activity_at)
                .to_std()
                .map(|idle| idle <= timeout)
                .unwrap_or(true)
        });
        let removed = before - sessions.len();
        if removed > 0 {
            debug!("Evicted {} idle device sessions", removed);
        }
        removed
    }

    /// All live sessions, oldest first.
    pub fn list(&self) -> Vec<Session> {
        self.sweep();
        let mut out: Vec<Session> = self.sessions().values().cloned().collect();
        out.sort_by_key(|s| s.created_at);
        out
    }

    pub fn active_count(&self) -> usize {
        self.sweep();
        self.sessions().len()
    }

    pub fn policy(&self) -> CameraIndexPolicy {
        self.policy
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(CameraIndexPolicy::default(), Self::DEFAULT_IDLE_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desktop_and_mobile_get_distinct_indices() {
        let registry = SessionRegistry::default();
        let desktop = registry.register(DeviceType::Desktop, "Mozilla/5.0 (X11)", None);
        let mobile = registry.register(DeviceType::Mobile, "Mozilla/5.0 (iPhone)", None);

        assert_ne!(desktop.device_id, mobile.device_id);
        assert_eq!(desktop.preferred_camera_index, 1);
        assert_eq!(mobile.preferred_camera_index, 0);
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn reregistering_keeps_a_single_session() {
        let registry = SessionRegistry::default();
        let first = registry.register(DeviceType::Desktop, "ua", Some("dev-1"));
        let second = registry.register(DeviceType::Tablet, "ua2", Some("dev-1"));

        assert_eq!(first.device_id, "dev-1");
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.preferred_camera_index, 0);
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn sweep_removes_only_idle_sessions() {
        let registry = SessionRegistry::new(CameraIndexPolicy::default(), Duration::from_secs(300));
        registry.register(DeviceType::Desktop, "ua", Some("old"));
        registry.register(DeviceType::Mobile, "ua", Some("fresh"));

        let later = Utc::now() + chrono::Duration::seconds(200);
        assert_eq!(registry.sweep_at(later), 0);

        // Touch "fresh" so only "old" goes stale.
        {
            let mut sessions = registry.sessions();
            let fresh = sessions.get_mut("fresh").unwrap();
            fresh.last_activity_at = later;
        }
        let much_later = Utc::now() + chrono::Duration::seconds(400);
        assert_eq!(registry.sweep_at(much_later), 1);
        assert!(registry.lookup("old").is_none());
        assert!(registry.lookup("fresh").is_some());
    }

    #[test]
    fn policy_is_configurable() {
        let policy = CameraIndexPolicy { desktop: 2, mobile: 5, tablet: 5 };
        let registry = SessionRegistry::new(policy, Duration::from_secs(60));
        assert_eq!(registry.register(DeviceType::Desktop, "", None).preferred_camera_index, 2);
        assert_eq!(registry.register(DeviceType::Mobile, "", None).preferred_camera_index, 5);
    }
}
