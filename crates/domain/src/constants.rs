//! API constants
//!
//! Endpoints, method names and protocol defaults for the Remember The Milk
//! REST API.

use std::time::Duration;

// Endpoints
pub const REST_URL: &str = "https://api.rememberthemilk.com/services/rest/";
pub const AUTH_URL: &str = "https://www.rememberthemilk.com/services/auth/";

// Request pacing and retry
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(1000);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);
pub const MAX_RETRIES: u32 = 3;

// Timeline handling
pub const TIMELINE_TTL: Duration = Duration::from_secs(30 * 60);
pub const TIMELINE_TIMEOUT: Duration = Duration::from_secs(10);
pub const TIMELINE_MAX_ATTEMPTS: u32 = 3;
pub const TIMELINE_BACKOFF_STEP: Duration = Duration::from_secs(1);

/// Error code the API returns when a timeline is unknown or expired.
pub const INVALID_TIMELINE_CODE: &str = "300";

/// Response format requested on every call.
pub const FORMAT_JSON: &str = "json";

/// Permission level requested during authorization (highest tier).
pub const PERMS_DELETE: &str = "delete";

/// Remote method names
pub mod methods {
    pub const AUTH_GET_FROB: &str = "rtm.auth.getFrob";
    pub const AUTH_GET_TOKEN: &str = "rtm.auth.getToken";
    pub const TIMELINES_CREATE: &str = "rtm.timelines.create";
    pub const TASKS_ADD: &str = "rtm.tasks.add";
    pub const TASKS_GET_LIST: &str = "rtm.tasks.getList";
    pub const TASKS_DELETE: &str = "rtm.tasks.delete";
    pub const TASKS_COMPLETE: &str = "rtm.tasks.complete";
    pub const TASKS_UNCOMPLETE: &str = "rtm.tasks.uncomplete";
    pub const TASKS_SET_NAME: &str = "rtm.tasks.setName";
    pub const TASKS_SET_PRIORITY: &str = "rtm.tasks.setPriority";
    pub const TASKS_SET_DUE_DATE: &str = "rtm.tasks.setDueDate";
}
