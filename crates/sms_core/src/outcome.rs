use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Success,
    Error,
}

/// Result of processing one contact. One per contact, in contact order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub name: String,
    pub phone: String,
    pub status: SendStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SendOutcome {
    pub fn success(name: impl Into<String>, phone: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            status: SendStatus::Success,
            message: Some(message.into()),
        }
    }

    pub fn error(name: impl Into<String>, phone: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            status: SendStatus::Error,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SendStatus::Success
    }
}
