use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Acknowledgement body for operations that return no document.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub const OK: Ack = Ack { ok: true };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_serializes_as_ok_true() {
        let body = serde_json::to_value(Ack::OK).unwrap();
        assert_eq!(body, serde_json::json!({"ok": true}));
    }
}
