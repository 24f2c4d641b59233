use uuid::Uuid;

/// Identifier the backend uses to drop replayed events.
pub fn generate_event_id() -> String {
    Uuid::new_v4().to_string()
}

/// Short, human-readable id for a person created on this client, e.g. `P3FA9C1`.
pub fn generate_person_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("P{}", hex[..6].to_uppercase())
}
