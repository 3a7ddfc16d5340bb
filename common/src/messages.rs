use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Status codes carried in the `status` field of every [`Response`].
pub mod status {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_FOUND: u16 = 404;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    StartSearch,
    FinishSearch,
    Confirm,
    Reject,
    // Any action the server does not know about. Kept as a value instead of a
    // decode failure so that an unexpected answer is a protocol error and not
    // a malformed request.
    #[serde(other)]
    Unknown,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub squad_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<i64>,
}

impl Request {
    pub fn new(action: Action) -> Self {
        Request {
            action,
            squad_id: None,
            wallet_address: None,
            nonce: None,
        }
    }

    pub fn start_search(squad_id: Uuid) -> Self {
        Request {
            squad_id: Some(squad_id),
            ..Request::new(Action::StartSearch)
        }
    }

    pub fn wallet(&self) -> Option<Wallet> {
        self.wallet_address.as_ref().map(|address| Wallet {
            address: address.clone(),
            nonce: self.nonce.unwrap_or_default(),
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Wallet {
    pub address: String,
    pub nonce: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub message: Value,
}

impl Response {
    pub fn new(status: u16, message: impl Into<Value>) -> Self {
        Response {
            status,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == status::OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_value};

    #[test]
    fn test_parse_start_search() {
        let squad_id = Uuid::new_v4();
        let raw = format!(
            "{{\"action\":\"startSearch\",\"squadId\":\"{}\",\"walletAddress\":\"0xabc\",\"nonce\":7}}",
            squad_id
        );
        let request: Request = from_str(&raw).unwrap();
        assert_eq!(request.action, Action::StartSearch);
        assert_eq!(request.squad_id, Some(squad_id));
        assert_eq!(
            request.wallet(),
            Some(Wallet {
                address: "0xabc".to_string(),
                nonce: 7
            })
        );
    }

    #[test]
    fn test_parse_confirmation_without_squad() {
        let request: Request = from_str("{\"action\":\"confirm\"}").unwrap();
        assert_eq!(request, Request::new(Action::Confirm));
        assert_eq!(request.wallet(), None);
    }

    #[test]
    fn test_unknown_action_is_not_a_decode_error() {
        let request: Request = from_str("{\"action\":\"dance\"}").unwrap();
        assert_eq!(request.action, Action::Unknown);
    }

    #[test]
    fn test_missing_action_is_a_decode_error() {
        assert!(from_str::<Request>("{\"squadId\":null}").is_err());
        assert!(from_str::<Request>("foo").is_err());
    }

    #[test]
    fn test_response_envelope() {
        let response = Response::new(status::OK, "you confirm play?");
        assert!(response.is_ok());
        assert_eq!(
            to_value(&response).unwrap(),
            json!({"status": 200, "message": "you confirm play?"})
        );
    }
}
