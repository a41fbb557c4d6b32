//! Player actions submitted for one turn.
//!
//! Parsing is lenient about content and strict about shape: unknown satellite
//! ids and unknown action values fall back to [`SatAction::None`], while a
//! payload that is not an object is rejected.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{EngineError, SatelliteId};

/// What the player asks one satellite to do this turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum SatAction {
    /// Hold position; risk keeps growing.
    #[default]
    None,
    /// Planned end-of-life retirement.
    Eol,
    /// Shared collision-avoidance maneuver, needs at least two participants.
    Group,
}

impl SatAction {
    /// Wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            SatAction::None => "NONE",
            SatAction::Eol => "EOL",
            SatAction::Group => "GROUP",
        }
    }
}

impl From<String> for SatAction {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "EOL" => SatAction::Eol,
            "GROUP" => SatAction::Group,
            _ => SatAction::None,
        }
    }
}

/// Any value other than a known action name reads as [`SatAction::None`].
impl<'de> Deserialize<'de> for SatAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => SatAction::from(s),
            _ => SatAction::None,
        })
    }
}

impl From<SatAction> for &'static str {
    fn from(a: SatAction) -> Self {
        a.as_str()
    }
}

/// Actions that apply to the whole constellation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalActions {
    /// Buy extra ground monitoring this turn.
    #[serde(default)]
    pub monitoring: bool,
}

/// Complete set of player decisions for one turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnActions {
    /// Per-satellite orders; missing satellites hold position.
    #[serde(default)]
    pub sat_actions: BTreeMap<SatelliteId, SatAction>,
    /// Constellation-wide orders.
    #[serde(default)]
    pub global: GlobalActions,
}

impl TurnActions {
    /// A turn where nobody acts.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Builder: order satellite `id` to perform `action`.
    pub fn with(mut self, id: &str, action: SatAction) -> Self {
        self.sat_actions.insert(SatelliteId(id.to_string()), action);
        self
    }

    /// Builder: toggle monitoring.
    pub fn monitoring(mut self, on: bool) -> Self {
        self.global.monitoring = on;
        self
    }

    /// Order for `id`, defaulting to [`SatAction::None`].
    pub fn action_for(&self, id: &SatelliteId) -> SatAction {
        self.sat_actions.get(id).copied().unwrap_or_default()
    }

    /// Parse a bare actions object.
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| EngineError::MalformedActions(e.to_string()))?;
        Self::from_value(value)
    }

    pub(crate) fn from_value(value: serde_json::Value) -> Result<Self, EngineError> {
        if !value.is_object() {
            return Err(EngineError::MalformedActions(
                "actions must be a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| EngineError::MalformedActions(e.to_string()))
    }
}

/// Body of a step request: `{"actions": {...}}`.
///
/// `assignments` and `advance` are accepted for compatibility and ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StepRequest {
    /// Decisions for the turn.
    pub actions: TurnActions,
}

impl StepRequest {
    /// Parse a step request body. A missing `actions` key means an idle turn.
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| EngineError::MalformedActions(e.to_string()))?;
        let serde_json::Value::Object(mut body) = value else {
            return Err(EngineError::MalformedActions(
                "step body must be a JSON object".to_string(),
            ));
        };
        let actions = match body.remove("actions") {
            Some(v) => TurnActions::from_value(v)?,
            None => TurnActions::idle(),
        };
        Ok(StepRequest { actions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_step_payload() {
        let a = TurnActions::from_json(
            r#"{"satActions":{"SAT-01":"EOL","SAT-02":"group","SAT-03":"NONE"},"global":{"monitoring":true}}"#,
        )
        .unwrap();
        assert_eq!(a.action_for(&SatelliteId("SAT-01".into())), SatAction::Eol);
        assert_eq!(a.action_for(&SatelliteId("SAT-02".into())), SatAction::Group);
        assert_eq!(a.action_for(&SatelliteId("SAT-03".into())), SatAction::None);
        assert_eq!(a.action_for(&SatelliteId("SAT-09".into())), SatAction::None);
        assert!(a.global.monitoring);
    }

    #[test]
    fn unknown_action_defaults_to_none() {
        let a = TurnActions::from_json(r#"{"satActions":{"SAT-01":"LASER"}}"#).unwrap();
        assert_eq!(a.action_for(&SatelliteId("SAT-01".into())), SatAction::None);
        assert!(!a.global.monitoring);
    }

    #[test]
    fn non_string_action_values_default_to_none() {
        let a = TurnActions::from_json(
            r#"{"satActions":{"SAT-01":5,"SAT-02":null,"SAT-03":{"x":1},"SAT-04":["EOL"],"SAT-05":"eol"}}"#,
        )
        .unwrap();
        for id in ["SAT-01", "SAT-02", "SAT-03", "SAT-04"] {
            assert_eq!(a.action_for(&SatelliteId(id.into())), SatAction::None, "{id}");
        }
        assert_eq!(a.action_for(&SatelliteId("SAT-05".into())), SatAction::Eol);
        assert!(StepRequest::from_json(r#"{"actions":{"satActions":{"SAT-01":true}}}"#).is_ok());
    }

    #[test]
    fn empty_object_is_idle() {
        assert_eq!(TurnActions::from_json("{}").unwrap(), TurnActions::idle());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        for bad in ["[]", "null", "42", "\"EOL\"", "{not json"] {
            assert!(
                matches!(
                    TurnActions::from_json(bad),
                    Err(EngineError::MalformedActions(_))
                ),
                "accepted {bad}"
            );
        }
        assert!(TurnActions::from_json(r#"{"satActions":[1,2]}"#).is_err());
    }

    #[test]
    fn step_envelope_ignores_extra_keys() {
        let req = StepRequest::from_json(
            r#"{"actions":{"satActions":{"SAT-02":"EOL"},"assignments":{"x":1},"advance":true}}"#,
        )
        .unwrap();
        assert_eq!(
            req.actions.action_for(&SatelliteId("SAT-02".into())),
            SatAction::Eol
        );
        assert_eq!(StepRequest::from_json("{}").unwrap().actions, TurnActions::idle());
        assert!(StepRequest::from_json("[]").is_err());
    }

    #[test]
    fn actions_serialize_with_wire_names() {
        let a = TurnActions::idle().with("SAT-01", SatAction::Group).monitoring(true);
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["satActions"]["SAT-01"], "GROUP");
        assert_eq!(v["global"]["monitoring"], true);
    }
}
