use chrono::Utc;
use uuid::Uuid;

/// Request ids.
pub const REQUEST_PREFIX: &str = "REQ";
/// Audit trail entries.
pub const HISTORY_PREFIX: &str = "HIST";
/// Comments.
pub const COMMENT_PREFIX: &str = "CMT";
/// User accounts.
pub const USER_PREFIX: &str = "USR";

/// Build `<prefix>-<unix millis>-<random suffix>`.
pub fn generate_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), &suffix[..8])
}
