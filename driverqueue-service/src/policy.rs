use crate::types::DriverEntry;

/// Number of call notifications an entry may receive before a recall marks it `NO_SHOW`.
pub const MAX_CALL_ATTEMPTS: u32 = 2;

pub const DEFAULT_COUNTRY_CODE: &str = "55";

pub const DEFAULT_CALL_MESSAGE: &str =
    "Hello {name}, it's your turn in the queue! Please proceed to the indicated location.";

pub const DEFAULT_RECALL_MESSAGE: &str =
    "Hello {name}, this is call {attempt} of {max}: it's your turn in the queue! Please proceed to the indicated location.";

/// Tunables of the queue. Templates accept `{name}`, `{plate}`, `{attempt}` and `{max}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuePolicy {
    pub max_call_attempts: u32,
    pub default_country_code: String,
    pub name_min_chars: usize,
    pub name_max_chars: usize,
    pub call_message: String,
    pub recall_message: String,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            max_call_attempts: MAX_CALL_ATTEMPTS,
            default_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            name_min_chars: 3,
            name_max_chars: 100,
            call_message: DEFAULT_CALL_MESSAGE.to_string(),
            recall_message: DEFAULT_RECALL_MESSAGE.to_string(),
        }
    }
}

impl QueuePolicy {
    pub fn call_message_for(&self, entry: &DriverEntry) -> String {
        self.render(&self.call_message, entry)
    }

    pub fn recall_message_for(&self, entry: &DriverEntry) -> String {
        self.render(&self.recall_message, entry)
    }

    fn render(&self, template: &str, entry: &DriverEntry) -> String {
        template
            .replace("{name}", &entry.name)
            .replace("{plate}", &entry.plate)
            .replace("{attempt}", &entry.call_attempts.to_string())
            .replace("{max}", &self.max_call_attempts.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DriverStatus;
    use chrono::Utc;

    #[test]
    fn renders_placeholders() {
        let entry = DriverEntry {
            id: 1,
            plate: "ABC1234".into(),
            name: "Alice".into(),
            phone_number: "+5511999990000".into(),
            entry_time: Utc::now(),
            called_time: Some(Utc::now()),
            status: DriverStatus::Called,
            call_attempts: 2,
        };
        let policy = QueuePolicy::default();
        assert_eq!(
            policy.call_message_for(&entry),
            "Hello Alice, it's your turn in the queue! Please proceed to the indicated location."
        );
        assert!(policy.recall_message_for(&entry).contains("call 2 of 2"));
    }
}
