use chrono::{DateTime, TimeDelta, Utc};

/// RFC 1123 date, e.g. `Mon, 02 Jan 2006 15:04:05 GMT`.
pub const RFC1123: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub fn greeting(now: DateTime<Utc>) -> String {
    let later = now + TimeDelta::minutes(5);
    format!(
        "Hello World!\nCurrent Time: {}\nFuture Time (after 5 mins): {}",
        now.format(RFC1123),
        later.format(RFC1123)
    )
}
