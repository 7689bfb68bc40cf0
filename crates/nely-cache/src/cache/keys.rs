//! Logical cache keys, one builder per resource kind.
//!
//! Keys are `<tag>_<id>` (or `<tag>_<id>_<period>` for history queries). The
//! namespace prefix is added later by the cache, not here. To cache a new kind
//! of resource, add a tag and a builder following the same pattern.

const SEPARATOR: char = '_';

const ELDERLY_PROFILES: &str = "elderly_profiles";
const VITAL_SIGNS: &str = "vital_signs";
const VITAL_SIGNS_HISTORY: &str = "vital_signs_history";
const MEDICATIONS: &str = "medications";
const APPOINTMENTS: &str = "appointments";
const UPCOMING_APPOINTMENTS: &str = "upcoming_appointments";
const CARE_NOTES: &str = "care_notes";
const FAMILY_MEMBERS: &str = "family_members";
const USER_PROFILE: &str = "user_profile";

/// Joins `tag` and `parts` with `_`. Ids are backend UUIDs and must not
/// contain `_`, otherwise keys of different kinds can coincide
/// (`vital_signs("history_e1_7d")` equals `vital_signs_history("e1", "7d")`).
fn build(tag: &str, parts: &[&str]) -> String {
    let mut key = String::from(tag);
    for part in parts {
        key.push(SEPARATOR);
        key.push_str(part);
    }
    key
}

pub fn elderly_profiles(family_id: &str) -> String {
    build(ELDERLY_PROFILES, &[family_id])
}

pub fn vital_signs(elderly_id: &str) -> String {
    build(VITAL_SIGNS, &[elderly_id])
}

/// Vitals history for one elderly relative over a period such as `7d`.
pub fn vital_signs_history(elderly_id: &str, period: &str) -> String {
    build(VITAL_SIGNS_HISTORY, &[elderly_id, period])
}

pub fn medications(elderly_id: &str) -> String {
    build(MEDICATIONS, &[elderly_id])
}

pub fn appointments(elderly_id: &str) -> String {
    build(APPOINTMENTS, &[elderly_id])
}

pub fn upcoming_appointments(elderly_id: &str) -> String {
    build(UPCOMING_APPOINTMENTS, &[elderly_id])
}

pub fn care_notes(elderly_id: &str) -> String {
    build(CARE_NOTES, &[elderly_id])
}

pub fn family_members(family_id: &str) -> String {
    build(FAMILY_MEMBERS, &[family_id])
}

pub fn user_profile(user_id: &str) -> String {
    build(USER_PROFILE, &[user_id])
}
