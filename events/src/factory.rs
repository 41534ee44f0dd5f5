//! Typed constructors, one per [`EventKind`].
//!
//! Domain mutation handlers call exactly one of these after committing a state
//! change and hand the result to the real-time manager. The payload keys built
//! here are part of the wire contract with the panel clients.

use crate::{Event, EventKind};
use serde_json::{json, Value};

/// Acknowledgement for a newly admitted connection, addressed to its owner.
pub fn connected(user_id: &str, display_name: &str, role: &str) -> Event {
    Event::targeted(
        EventKind::Connected,
        json!({
            "message": "Connected to real-time updates",
            "userId": user_id,
            "displayName": display_name,
            "role": role,
        }),
        user_id,
    )
}

pub fn device_online(device_id: &str, device: Value) -> Event {
    Event::new(
        EventKind::DeviceOnline,
        json!({ "deviceId": device_id, "device": device }),
    )
}

pub fn device_offline(device_id: &str) -> Event {
    Event::new(EventKind::DeviceOffline, json!({ "deviceId": device_id }))
}

pub fn device_error(device_id: &str, error: &str) -> Event {
    Event::new(
        EventKind::DeviceError,
        json!({ "deviceId": device_id, "error": error }),
    )
}

pub fn lamp_toggled(lamp_id: &str, is_on: bool) -> Event {
    Event::new(
        EventKind::LampToggled,
        json!({ "lampId": lamp_id, "isOn": is_on }),
    )
}

/// `brightness` is a percentage in `0..=100`; larger values are clamped.
pub fn lamp_brightness_changed(lamp_id: &str, brightness: u8) -> Event {
    Event::new(
        EventKind::LampBrightnessChanged,
        json!({ "lampId": lamp_id, "brightness": brightness.min(100) }),
    )
}

pub fn permission_granted(user_id: &str, permission: Value) -> Event {
    Event::targeted(
        EventKind::PermissionGranted,
        json!({ "userId": user_id, "permission": permission }),
        user_id,
    )
}

pub fn permission_revoked(user_id: &str, permission: Value) -> Event {
    Event::targeted(
        EventKind::PermissionRevoked,
        json!({ "userId": user_id, "permission": permission }),
        user_id,
    )
}

pub fn user_created(user: Value) -> Event {
    Event::new(EventKind::UserCreated, json!({ "user": user }))
}

/// `target` names the affected user when the update should reach them directly.
pub fn user_updated(user: Value, target: Option<&str>) -> Event {
    let data = json!({ "user": user });
    match target {
        Some(user_id) => Event::targeted(EventKind::UserUpdated, data, user_id),
        None => Event::new(EventKind::UserUpdated, data),
    }
}

pub fn user_deleted(user_id: &str) -> Event {
    Event::new(EventKind::UserDeleted, json!({ "userId": user_id }))
}

pub fn alert_created(alert: Value) -> Event {
    Event::new(EventKind::AlertCreated, json!({ "alert": alert }))
}

pub fn alert_resolved(alert_id: &str, resolved_by: Option<&str>) -> Event {
    Event::new(
        EventKind::AlertResolved,
        json!({ "alertId": alert_id, "resolvedBy": resolved_by }),
    )
}

pub fn maintenance_mode_changed(enabled: bool, message: Option<&str>) -> Event {
    Event::new(
        EventKind::MaintenanceModeChanged,
        json!({ "enabled": enabled, "message": message }),
    )
}

pub fn config_updated(key: &str, value: Value) -> Event {
    Event::new(
        EventKind::ConfigUpdated,
        json!({ "key": key, "value": value }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_is_addressed_to_the_new_connection_owner() {
        let event = connected("u1", "Ada", "admin");

        assert_eq!(event.kind(), EventKind::Connected);
        assert_eq!(event.user_id(), Some("u1"));
        assert_eq!(event.data()["displayName"], "Ada");
        assert_eq!(event.data()["role"], "admin");
    }

    #[test]
    fn test_permission_events_target_the_affected_user() {
        let permission = json!({ "resource": "lamps", "action": "toggle" });

        let granted = permission_granted("u1", permission.clone());
        assert_eq!(granted.kind(), EventKind::PermissionGranted);
        assert_eq!(granted.user_id(), Some("u1"));
        assert_eq!(granted.data()["permission"], permission);

        let revoked = permission_revoked("u2", permission);
        assert_eq!(revoked.kind(), EventKind::PermissionRevoked);
        assert_eq!(revoked.user_id(), Some("u2"));
    }

    #[test]
    fn test_wire_types_are_kebab_case() {
        let granted: Value =
            serde_json::from_str(&permission_granted("u1", json!({})).to_json().unwrap()).unwrap();
        assert_eq!(granted["type"], "permission-granted");
        assert_eq!(granted["userId"], "u1");

        let brightness: Value =
            serde_json::to_value(lamp_brightness_changed("l1", 40)).unwrap();
        assert_eq!(brightness["type"], "lamp-brightness-changed");

        let ack: Value = serde_json::to_value(connected("u1", "Ada", "user")).unwrap();
        assert_eq!(ack["type"], "connected");
    }

    #[test]
    fn test_broadcast_style_events_have_no_target() {
        assert_eq!(device_offline("d1").user_id(), None);
        assert_eq!(lamp_toggled("l1", true).user_id(), None);
        assert_eq!(alert_created(json!({ "id": "a1" })).user_id(), None);
        assert_eq!(maintenance_mode_changed(true, None).user_id(), None);
    }

    #[test]
    fn test_user_updated_target_is_optional() {
        let user = json!({ "id": "u3", "username": "grace" });

        assert_eq!(user_updated(user.clone(), None).user_id(), None);
        assert_eq!(user_updated(user, Some("u3")).user_id(), Some("u3"));
    }

    #[test]
    fn test_lamp_payloads_use_fixed_keys() {
        let toggled = lamp_toggled("l1", false);
        assert_eq!(toggled.data(), &json!({ "lampId": "l1", "isOn": false }));

        let brightness = lamp_brightness_changed("l1", 250);
        assert_eq!(brightness.data()["brightness"], 100);
    }

    #[test]
    fn test_optional_fields_serialize_as_null() {
        let resolved = alert_resolved("a1", None);
        assert!(resolved.data()["resolvedBy"].is_null());

        let maintenance = maintenance_mode_changed(false, Some("back online"));
        assert_eq!(maintenance.data()["message"], "back online");
    }
}
