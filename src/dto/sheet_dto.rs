use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SheetSettingsPayload {
    pub auto_sync: bool,
    #[validate(range(min = 10, max = 86400))]
    pub interval_seconds: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub synced: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_has_a_floor() {
        let too_fast = SheetSettingsPayload {
            auto_sync: true,
            interval_seconds: 5,
        };
        assert!(too_fast.validate().is_err());
        let ok = SheetSettingsPayload {
            auto_sync: true,
            interval_seconds: 10,
        };
        assert!(ok.validate().is_ok());
    }
}
